use anyhow::Result;

use crate::Context;
use crate::cli::ConfigCommand;
use crate::config::{Config, config_path};
use crate::ui;

pub fn run(ctx: &Context, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => show(),
        ConfigCommand::Path => {
            println!("{}", config_path()?.display());
            Ok(())
        }
        ConfigCommand::Init { force } => init(ctx, force),
    }
}

fn show() -> Result<()> {
    let path = config_path()?;
    let config = Config::load_from(&path)?;

    ui::header("Configuration");
    ui::kv("File", &path.display().to_string());
    if !path.exists() {
        ui::dim("Not found, using defaults");
    }
    println!();
    print!("{}", config.to_toml()?);
    Ok(())
}

fn init(ctx: &Context, force: bool) -> Result<()> {
    let path = config_path()?;
    if path.exists() && !force {
        ui::warn(&format!("{} already exists", path.display()));
        ui::dim("Use --force to overwrite it.");
        return Ok(());
    }

    Config::default().save_to(&path)?;
    if !ctx.quiet {
        ui::success(&format!("Wrote {}", path.display()));
    }
    Ok(())
}
