use anyhow::Result;
use reconcile::{LifecycleState, Transition, plan_transitions};
use serde::Serialize;

use super::print_json;
use crate::Context;
use crate::cli::LifecycleArgs;
use crate::config::OutputFormat;
use crate::ui;

#[derive(Serialize)]
struct LifecycleReport {
    current: LifecycleState,
    desired: LifecycleState,
    transitions: Vec<Transition>,
}

pub fn run(ctx: &Context, args: &LifecycleArgs) -> Result<()> {
    let current = LifecycleState::new(args.published, args.archived);
    let desired = LifecycleState::new(args.want_published, args.want_archived);
    let transitions = plan_transitions(current, desired);

    match ctx.format {
        OutputFormat::Json => print_json(&LifecycleReport {
            current,
            desired,
            transitions,
        }),
        OutputFormat::Text => {
            ui::header("Lifecycle");
            ui::kv("Current", &describe(current));
            ui::kv("Desired", &describe(desired));
            println!();
            if transitions.is_empty() {
                ui::success("Already in the desired state");
            }
            for (i, transition) in transitions.iter().enumerate() {
                ui::step(i + 1, transitions.len(), &transition.to_string());
            }
            Ok(())
        }
    }
}

fn describe(state: LifecycleState) -> String {
    let published = if state.published { "published" } else { "draft" };
    if state.archived {
        format!("{published}, archived")
    } else {
        published.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        assert_eq!(describe(LifecycleState::new(false, false)), "draft");
        assert_eq!(describe(LifecycleState::new(true, true)), "published, archived");
    }
}
