//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::Path;

use chrono::{DateTime, Local, Utc};

use vigil_core::{CoreError, PageHint, PageSize, PaginationController};

use crate::cli::{GlobalOpts, PageArgs};
use crate::error::CliError;
use crate::output;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(prompt_err)?;
    Ok(confirmed)
}

/// Read and parse a JSON file for `--from-file` flags.
pub fn read_json_file(path: &Path) -> Result<serde_json::Value, CliError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| CliError::Validation {
        field: "from-file".into(),
        reason: format!("invalid JSON in {}: {e}", path.display()),
    })
}

/// Map a dialoguer / rpassword failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Position a pager from `--page` (1-based) and `--page-size`.
pub fn pager(args: &PageArgs, default_size: PageSize) -> Result<PaginationController, CliError> {
    let size = args
        .page_size
        .map(PageSize::try_from)
        .transpose()
        .map_err(|e| CliError::Validation {
            field: "page-size".into(),
            reason: match e {
                CoreError::ValidationFailed { message } => message,
                other => other.to_string(),
            },
        })?
        .unwrap_or(default_size);
    Ok(PaginationController::at(args.page.saturating_sub(1), size))
}

/// Tell the user whether another page is likely, after a table render.
pub fn page_hint(pager: &PaginationController, received: usize, list_command: &str, global: &GlobalOpts) {
    if !matches!(global.output, crate::cli::OutputFormat::Table) {
        return;
    }
    let page = pager.page_index() + 1;
    let message = match pager.observe(received) {
        PageHint::ProbablyLast if received == 0 && page > 1 => {
            format!("Page {page} is empty.")
        }
        PageHint::ProbablyLast => format!("Page {page} (last)."),
        PageHint::MaybeMore => format!(
            "Page {page}. Next: vigil {list_command} --page {} --page-size {}",
            page + 1,
            pager.page_size()
        ),
    };
    output::hint(&message, &global.color, global.quiet);
}

/// Local-time rendering for table cells.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn format_optional_timestamp(ts: Option<&DateTime<Utc>>) -> String {
    ts.map_or_else(|| "-".into(), format_timestamp)
}

/// Render a score in [0, 1] as a percentage.
pub fn format_ratio(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}
