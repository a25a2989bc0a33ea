use crate::config::OutputFormat;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cmsync")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Plan and inspect content model reconciliation", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format (overrides the config file)
    #[arg(long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the field lists a content-type update writes
    Plan(PlanArgs),

    /// Translate a remote error payload into diagnostics
    Diagnose {
        /// JSON error payload
        file: PathBuf,
    },

    /// Show the calls that move an entry or asset between lifecycle states
    Lifecycle(LifecycleArgs),

    /// Manage the cmsync config file
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Plan
// ============================================================================

#[derive(Args)]
pub struct PlanArgs {
    /// Field list currently on the remote (.json or .toml)
    #[arg(long)]
    pub current: PathBuf,

    /// Desired field list (.json or .toml)
    #[arg(long)]
    pub desired: PathBuf,

    /// Run the update against an in-memory remote and report its calls
    #[arg(long)]
    pub simulate: bool,
}

// ============================================================================
// Lifecycle
// ============================================================================

#[derive(Args)]
pub struct LifecycleArgs {
    /// Object is currently published
    #[arg(long)]
    pub published: bool,

    /// Object is currently archived
    #[arg(long)]
    pub archived: bool,

    /// Object should end up published
    #[arg(long)]
    pub want_published: bool,

    /// Object should end up archived
    #[arg(long)]
    pub want_archived: bool,
}

// ============================================================================
// Config Commands
// ============================================================================

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the active configuration
    Show,

    /// Print the config file path
    Path,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_plan_with_global_format() {
        let cli = Cli::try_parse_from([
            "cmsync", "plan", "--current", "a.json", "--desired", "b.toml", "--format", "json",
        ])
        .unwrap();
        assert_eq!(cli.format, Some(OutputFormat::Json));
        match cli.command {
            Command::Plan(args) => {
                assert_eq!(args.desired, PathBuf::from("b.toml"));
                assert!(!args.simulate);
            }
            _ => panic!("expected plan"),
        }
    }
}
