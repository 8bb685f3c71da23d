//! `regionhop check-config`

use std::path::Path;

use anyhow::Result;

use regionhop_config::{load_and_prepare, ValidationReport};

use crate::output::{note_error, note_success, note_warn};

/// Validate the config at `path`. Returns `false` when it has errors.
pub async fn run(path: &Path) -> Result<bool> {
    if !path.exists() {
        note_warn(&format!("{} does not exist; built-in defaults apply", path.display()));
    }
    let (config, report) = load_and_prepare(path).await?;
    print_report(&report);

    let regions = config.grid.as_ref().map(|g| g.regions.len()).unwrap_or(0);
    let handoff = config.handoff_settings();
    if report.is_valid() {
        note_success(&format!(
            "{}: {regions} region(s), callback timeout {} ms, {} concurrent handoffs",
            path.display(),
            handoff.callback_timeout().as_millis(),
            handoff.max_concurrent_handoffs(),
        ));
    }
    Ok(report.is_valid())
}

fn print_report(report: &ValidationReport) {
    for warning in &report.warnings {
        note_warn(&format!("{}: {}", warning.path, warning.message));
    }
    for error in &report.errors {
        note_error(&format!("{}: {}", error.path, error.message));
    }
}
