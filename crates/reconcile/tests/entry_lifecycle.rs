//! Entry writes and lifecycle transitions against the in-memory remote

use cmakit::{MemoryBackend, RemoteError};
use reconcile::diagnostic::format_path;
use reconcile::resource::{
    ContentTypeDriver, ContentTypeSpec, Driver, EntryDriver, EntryFieldSpec, EntrySpec,
};
use reconcile::{FieldSpec, ReadOutcome, ReconcileContext};

fn setup() -> MemoryBackend {
    let backend = MemoryBackend::new();
    backend.seed_space("space1", "Test");
    let ct = ContentTypeSpec {
        space_id: "space1".to_string(),
        env_id: "master".to_string(),
        content_type_id: Some("post".to_string()),
        name: "Post".to_string(),
        description: None,
        display_field: "title".to_string(),
        fields: vec![FieldSpec::new("title", "Title", "Symbol")],
    };
    ContentTypeDriver::new(&backend, &backend)
        .create(&ReconcileContext::new(), &ct)
        .unwrap();
    backend.clear_calls();
    backend
}

fn entry(published: bool, archived: bool) -> EntrySpec {
    EntrySpec {
        entry_id: "hello".to_string(),
        space_id: "space1".to_string(),
        env_id: "master".to_string(),
        content_type_id: "post".to_string(),
        locale: "en-US".to_string(),
        fields: vec![EntryFieldSpec {
            id: "title".to_string(),
            content: "Hello".to_string(),
            locale: "en-US".to_string(),
        }],
        published,
        archived,
    }
}

#[test]
fn create_publishes_after_rereading() {
    let backend = setup();
    let driver = EntryDriver::new(&backend, &backend);
    let ctx = ReconcileContext::new();

    let state = driver.create(&ctx, &entry(true, false)).unwrap();

    assert!(state.published);
    assert!(!state.archived);
    assert_eq!(state.version, 2);
    assert_eq!(state.fields["title"]["en-US"], "Hello");
    assert_eq!(
        backend.calls(),
        vec!["environment.get", "entry.upsert", "entry.get", "entry.publish"]
    );
}

#[test]
fn unpublish_happens_before_archive() {
    let backend = setup();
    let driver = EntryDriver::new(&backend, &backend);
    let ctx = ReconcileContext::new();
    driver.create(&ctx, &entry(true, false)).unwrap();
    backend.clear_calls();

    let state = driver.update(&ctx, "hello", &entry(false, true)).unwrap();

    assert!(!state.published);
    assert!(state.archived);
    assert_eq!(state.version, 5);
    assert_eq!(
        backend.calls(),
        vec![
            "environment.get",
            "entry.get",
            "entry.upsert",
            "entry.get",
            "entry.unpublish",
            "entry.archive"
        ]
    );
}

#[test]
fn matching_flags_issue_no_lifecycle_calls() {
    let backend = setup();
    let driver = EntryDriver::new(&backend, &backend);
    let ctx = ReconcileContext::new();
    driver.create(&ctx, &entry(false, false)).unwrap();

    let calls = backend.calls();
    assert!(calls.iter().all(|c| c != "entry.publish" && c != "entry.archive"));
}

#[test]
fn failed_archive_reports_unpublished_state() {
    let backend = setup();
    let driver = EntryDriver::new(&backend, &backend);
    let ctx = ReconcileContext::new();
    driver.create(&ctx, &entry(true, false)).unwrap();
    backend.fail_next(
        "entry.archive",
        RemoteError::Other("archive rejected".to_string()),
    );

    let failure = driver
        .update(&ctx, "hello", &entry(false, true))
        .unwrap_err();

    assert_eq!(failure.diagnostics[0].summary, "archive rejected");
    let last_known = failure.last_known.unwrap();
    assert!(!last_known.published);
    assert!(!last_known.archived);
    assert_eq!(last_known.version, 4);
}

#[test]
fn unknown_field_is_addressed() {
    let backend = setup();
    let driver = EntryDriver::new(&backend, &backend);
    let ctx = ReconcileContext::new();
    let mut spec = entry(false, false);
    spec.fields.push(EntryFieldSpec {
        id: "subtitle".to_string(),
        content: "Hi".to_string(),
        locale: "en-US".to_string(),
    });

    let failure = driver.create(&ctx, &spec).unwrap_err();

    assert_eq!(failure.diagnostics.len(), 1);
    assert_eq!(
        format_path(&failure.diagnostics[0].attribute_path),
        "fields.subtitle"
    );
    assert!(failure.last_known.is_none());
}

#[test]
fn read_after_delete_is_gone() {
    let backend = setup();
    let driver = EntryDriver::new(&backend, &backend);
    let ctx = ReconcileContext::new();
    let spec = entry(false, false);
    driver.create(&ctx, &spec).unwrap();

    assert!(matches!(
        driver.read(&ctx, "hello", &spec).unwrap(),
        ReadOutcome::Present(_)
    ));
    driver.delete(&ctx, "hello", &spec).unwrap();
    assert_eq!(driver.read(&ctx, "hello", &spec).unwrap(), ReadOutcome::Gone);
}
