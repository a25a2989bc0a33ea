use anyhow::{Context as _, Result};
use cmakit::{ErrorResponse, RemoteError};
use reconcile::translate;
use std::fs;
use std::path::Path;

use super::print_diagnostics;
use crate::Context;
use crate::config::OutputFormat;
use crate::ui;

pub fn run(ctx: &Context, file: &Path) -> Result<()> {
    let content = fs::read_to_string(file)
        .with_context(|| format!("Could not read {}", file.display()))?;
    let response: ErrorResponse = serde_json::from_str(&content)
        .with_context(|| format!("{} is not an error payload", file.display()))?;

    let error = RemoteError::from_response(response);
    let diagnostics = translate(&error);

    if ctx.format == OutputFormat::Text {
        ui::header("Remote error");
        ui::kv("Category", error.category().description());
        println!();
    }
    print_diagnostics(ctx, &diagnostics)
}
