use anyhow::{Result, bail};
use cmakit::{Field, MemoryBackend};
use colored::Colorize;
use reconcile::resource::{ContentTypeDriver, ContentTypeSpec, Driver};
use reconcile::{Diagnostic, FieldSpec, Pass, PassKind, ReconcileContext, build_fields, schedule};
use serde::Serialize;
use std::path::Path;

use super::{load_fields, print_diagnostics, print_json};
use crate::Context;
use crate::cli::PlanArgs;
use crate::config::OutputFormat;
use crate::ui;

const SIMULATED_SPACE: &str = "simulation";
const SIMULATED_TYPE: &str = "simulated";

/// Remote calls and outcome of a simulated update
#[derive(Debug, Serialize)]
struct Simulation {
    calls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    diagnostics: Vec<Diagnostic>,
}

#[derive(Serialize)]
struct PlanReport<'a> {
    passes: &'a [Pass],
    #[serde(skip_serializing_if = "Option::is_none")]
    simulation: Option<&'a Simulation>,
}

pub fn run(ctx: &Context, args: &PlanArgs) -> Result<()> {
    let current = load_fields(&args.current)?;
    let desired = load_fields(&args.desired)?;
    let live = build(ctx, &args.current, &current)?;
    let target = build(ctx, &args.desired, &desired)?;

    let passes = schedule(&live, &target);
    let simulation = args.simulate.then(|| simulate(&current, &desired));

    match ctx.format {
        OutputFormat::Json => print_json(&PlanReport {
            passes: &passes,
            simulation: simulation.as_ref(),
        })?,
        OutputFormat::Text => {
            print_passes(ctx, &live, &passes);
            if let Some(simulation) = &simulation {
                print_simulation(simulation);
            }
        }
    }

    if simulation.is_some_and(|s| !s.diagnostics.is_empty()) {
        bail!("Simulated update failed");
    }
    Ok(())
}

fn build(ctx: &Context, path: &Path, specs: &[FieldSpec]) -> Result<Vec<Field>> {
    match build_fields(specs) {
        Ok(fields) => Ok(fields),
        Err(diagnostics) => {
            if ctx.format == OutputFormat::Text {
                ui::section(&path.display().to_string());
            }
            print_diagnostics(ctx, &diagnostics)?;
            bail!(
                "{} invalid field declaration(s) in {}",
                diagnostics.len(),
                path.display()
            )
        }
    }
}

/// Run the update against a fresh in-memory remote holding `current`.
fn simulate(current: &[FieldSpec], desired: &[FieldSpec]) -> Simulation {
    let backend = MemoryBackend::new();
    backend.seed_space(SIMULATED_SPACE, "Simulation");
    let driver = ContentTypeDriver::new(&backend, &backend);
    let rctx = ReconcileContext::new();

    if let Err(failure) = driver.create(&rctx, &simulated_spec(current)) {
        return Simulation {
            calls: backend.calls(),
            version: None,
            diagnostics: failure.diagnostics,
        };
    }
    backend.clear_calls();

    let outcome = driver.update(&rctx, SIMULATED_TYPE, &simulated_spec(desired));
    let calls = backend.calls();
    match outcome {
        Ok(state) => Simulation {
            calls,
            version: Some(state.version),
            diagnostics: Vec::new(),
        },
        Err(failure) => Simulation {
            calls,
            version: failure.last_known.map(|s| s.version),
            diagnostics: failure.diagnostics,
        },
    }
}

fn simulated_spec(fields: &[FieldSpec]) -> ContentTypeSpec {
    ContentTypeSpec {
        space_id: SIMULATED_SPACE.to_string(),
        env_id: cmakit::backend::memory::DEFAULT_ENVIRONMENT.to_string(),
        content_type_id: Some(SIMULATED_TYPE.to_string()),
        name: "Simulated".to_string(),
        description: None,
        display_field: fields.first().map(|f| f.id.clone()).unwrap_or_default(),
        fields: fields.to_vec(),
    }
}

fn print_passes(ctx: &Context, live: &[Field], passes: &[Pass]) {
    ui::header("Content type update");
    for (i, pass) in passes.iter().enumerate() {
        ui::step(
            i + 1,
            passes.len(),
            &format!("{} pass ({} fields)", pass.kind, pass.fields.len()),
        );
        for field in &pass.fields {
            println!("    {}", describe(ctx, field, live));
        }
    }
    if !removes_fields(passes) {
        println!();
        ui::success("No field is removed or retyped");
    }
}

fn removes_fields(passes: &[Pass]) -> bool {
    passes.iter().any(|pass| pass.kind == PassKind::Removal)
}

/// One-line summary of a field, marked against the live list
fn describe(ctx: &Context, field: &Field, live: &[Field]) -> String {
    let marker = match live.iter().find(|f| f.id == field.id) {
        None => "+".green(),
        Some(old) if old.field_type != field.field_type => "~".yellow(),
        Some(_) => " ".normal(),
    };
    let mut line = format!("{marker} {} {}", field.id, field.field_type.dimmed());
    if field.omitted {
        line.push_str(&format!(" {}", "omitted".yellow()));
    }
    if ctx.verbose > 0 {
        line.push_str(&format!(" {}", format!("\"{}\"", field.name).dimmed()));
        if field.required {
            line.push_str(" required");
        }
        if field.localized {
            line.push_str(" localized");
        }
    }
    line
}

fn print_simulation(simulation: &Simulation) {
    ui::section("Simulated remote calls");
    ui::info("Replayed against an in-memory remote holding the current fields");
    for call in &simulation.calls {
        ui::dim(call);
    }
    if let Some(version) = simulation.version {
        ui::kv("Final version", &version.to_string());
    }
    for diagnostic in &simulation.diagnostics {
        ui::diagnostic(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(id: &str, field_type: &str) -> FieldSpec {
        FieldSpec::new(id, id, field_type)
    }

    #[test]
    fn test_attribute_only_edit_removes_nothing() {
        let live = build_fields(&[spec("title", "Symbol")]).unwrap();
        let mut renamed = spec("title", "Symbol");
        renamed.name = "Headline".to_string();
        let desired = build_fields(&[renamed]).unwrap();

        let passes = schedule(&live, &desired);

        assert_eq!(passes.len(), 2);
        assert!(!removes_fields(&passes));

        let passes = schedule(&live, &build_fields(&[spec("body", "Text")]).unwrap());
        assert!(removes_fields(&passes));
    }

    #[test]
    fn test_simulate_removal_runs_three_passes() {
        let simulation = simulate(
            &[spec("title", "Symbol"), spec("body", "Text")],
            &[spec("title", "Symbol")],
        );

        assert!(simulation.diagnostics.is_empty());
        let activations = simulation
            .calls
            .iter()
            .filter(|c| *c == "content_type.activate")
            .count();
        assert_eq!(activations, 3);
    }

    #[test]
    fn test_simulate_from_empty_type_writes_final_pass_only() {
        let simulation = simulate(&[], &[spec("title", "Symbol")]);

        assert!(simulation.diagnostics.is_empty());
        assert_eq!(
            simulation.calls,
            vec![
                "environment.get",
                "content_type.get",
                "content_type.upsert",
                "content_type.activate"
            ]
        );
    }
}
