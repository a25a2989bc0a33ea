mod cli;
mod commands;
mod config;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::{Config, OutputFormat};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub format: OutputFormat,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let config = Config::load()?;
    if !config.output.color {
        colored::control::set_override(false);
    }

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        format: cli.format.unwrap_or(config.output.format),
    };

    match cli.command {
        Command::Plan(args) => commands::plan::run(&ctx, &args),
        Command::Diagnose { file } => commands::diagnose::run(&ctx, &file),
        Command::Lifecycle(args) => commands::lifecycle::run(&ctx, &args),
        Command::Config(cmd) => commands::config::run(&ctx, cmd),
        Command::Completions { shell } => {
            generate(shell, &mut Cli::command(), "cmsync", &mut io::stdout());
            Ok(())
        }
    }
}
