use colored::Colorize;
use reconcile::diagnostic::{Diagnostic, Severity, format_path};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print a step indicator
pub fn step(num: usize, total: usize, msg: &str) {
    println!("{} {}", format!("[{num}/{total}]").blue().bold(), msg);
}

/// Print one diagnostic with its attribute path and detail
pub fn diagnostic(diag: &Diagnostic) {
    let location = if diag.attribute_path.is_empty() {
        String::new()
    } else {
        format!(" {}", format!("at {}", format_path(&diag.attribute_path)).dimmed())
    };
    match diag.severity {
        Severity::Error => error(&format!("{}{location}", diag.summary)),
        Severity::Warning => warn(&format!("{}{location}", diag.summary)),
    }
    if let Some(detail) = &diag.detail {
        dim(detail);
    }
}
