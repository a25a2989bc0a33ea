//! Content-type field migrations against the in-memory remote

use cmakit::{ContentType, ContentTypeClient, Environment, EnvironmentClient, MemoryBackend, Sys};
use reconcile::diagnostic::format_path;
use reconcile::resource::{ContentTypeDriver, ContentTypeSpec, Driver};
use reconcile::{FieldSpec, ReconcileContext, build_fields, plan, translate};

fn setup() -> (MemoryBackend, Environment) {
    let backend = MemoryBackend::new();
    backend.seed_space("space1", "Test");
    let env = EnvironmentClient::get(&backend, "space1", "master").unwrap();
    backend.clear_calls();
    (backend, env)
}

fn spec(fields: Vec<FieldSpec>) -> ContentTypeSpec {
    ContentTypeSpec {
        space_id: "space1".to_string(),
        env_id: "master".to_string(),
        content_type_id: Some("post".to_string()),
        name: "Post".to_string(),
        description: None,
        display_field: "title".to_string(),
        fields,
    }
}

fn title() -> FieldSpec {
    FieldSpec::new("title", "Title", "Symbol")
}

fn body() -> FieldSpec {
    FieldSpec::new("body", "Body", "Text")
}

fn count(field_type: &str) -> FieldSpec {
    FieldSpec::new("count", "Count", field_type)
}

#[test]
fn removal_only_plan_round_trips_through_the_remote() {
    let (backend, env) = setup();
    let old = build_fields(&[title(), body()]).unwrap();
    let new = build_fields(&[title()]).unwrap();

    let draft = ContentType {
        sys: Sys::with_id("post"),
        name: "Post".to_string(),
        display_field: "title".to_string(),
        fields: old.clone(),
        ..ContentType::default()
    };
    let created = ContentTypeClient::upsert(&backend, &env, &draft).unwrap();
    let mut current = backend.activate(&env, &created).unwrap();

    let plan = plan(&old, &new);
    assert!(plan.needs_second_pass);
    for fields in [plan.first_pass, plan.second_pass] {
        let next = ContentType {
            fields,
            ..current.clone()
        };
        let upserted = ContentTypeClient::upsert(&backend, &env, &next).unwrap();
        current = backend.activate(&env, &upserted).unwrap();
    }

    assert_eq!(backend.active_fields(&env, "post").unwrap(), new);
}

#[test]
fn removing_a_field_runs_three_passes() {
    let (backend, env) = setup();
    let driver = ContentTypeDriver::new(&backend, &backend);
    let ctx = ReconcileContext::new();
    driver.create(&ctx, &spec(vec![title(), body()])).unwrap();
    backend.clear_calls();

    let state = driver.update(&ctx, "post", &spec(vec![title()])).unwrap();

    assert_eq!(state.fields, build_fields(&[title()]).unwrap());
    assert_eq!(backend.active_fields(&env, "post").unwrap(), state.fields);
    // create: 2 writes, update: 3 passes of 2 writes each
    assert_eq!(state.version, 8);
    assert_eq!(
        backend.calls(),
        vec![
            "environment.get",
            "content_type.get",
            "content_type.upsert",
            "content_type.activate",
            "content_type.upsert",
            "content_type.activate",
            "content_type.upsert",
            "content_type.activate",
        ]
    );
}

#[test]
fn retyping_a_field_deletes_and_recreates_it() {
    let (backend, env) = setup();
    let driver = ContentTypeDriver::new(&backend, &backend);
    let ctx = ReconcileContext::new();
    driver
        .create(&ctx, &spec(vec![title(), count("Symbol")]))
        .unwrap();

    let state = driver
        .update(&ctx, "post", &spec(vec![title(), count("Integer")]))
        .unwrap();

    let active = backend.active_fields(&env, "post").unwrap();
    assert_eq!(active.len(), 2);
    assert_eq!(active[1].field_type, "Integer");
    assert!(!active[1].omitted);
    assert_eq!(state.fields, active);
}

#[test]
fn retyping_in_place_is_rejected_with_an_addressed_diagnostic() {
    let (backend, env) = setup();
    let driver = ContentTypeDriver::new(&backend, &backend);
    let ctx = ReconcileContext::new();
    driver
        .create(&ctx, &spec(vec![title(), count("Symbol")]))
        .unwrap();

    let mut live = ContentTypeClient::get(&backend, &env, "post").unwrap();
    live.fields[1].field_type = "Integer".to_string();
    let err = ContentTypeClient::upsert(&backend, &env, &live).unwrap_err();

    let diagnostics = translate(&err);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(format_path(&diagnostics[0].attribute_path), "fields[1].type");
}

#[test]
fn unchanged_fields_still_write_the_final_pass() {
    let (backend, _env) = setup();
    let driver = ContentTypeDriver::new(&backend, &backend);
    let ctx = ReconcileContext::new();
    driver.create(&ctx, &spec(vec![title()])).unwrap();
    backend.clear_calls();

    let mut renamed = spec(vec![title()]);
    renamed.name = "Article".to_string();
    let state = driver.update(&ctx, "post", &renamed).unwrap();

    assert_eq!(state.name, "Article");
    assert_eq!(state.version, 4);
    assert_eq!(backend.calls().len(), 4);
}

#[test]
fn cancelled_update_makes_no_calls() {
    let (backend, _env) = setup();
    let driver = ContentTypeDriver::new(&backend, &backend);
    let ctx = ReconcileContext::new();
    driver.create(&ctx, &spec(vec![title()])).unwrap();
    backend.clear_calls();

    let handle = ctx.cancel_handle();
    handle.cancel();
    let failure = driver
        .update(&ctx, "post", &spec(vec![title(), body()]))
        .unwrap_err();

    assert_eq!(failure.diagnostics[0].summary, "operation cancelled");
    assert!(failure.last_known.is_none());
    assert!(backend.calls().is_empty());
}
