//! Rendering for `--output`.
//!
//! Lists become `tabled` tables, single records use a hand-written
//! detail view, and the machine formats go through serde. Status lines
//! and hints go to stderr so stdout stays parseable.

use std::io::{IsTerminal, Write as _};

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

/// Color on stderr: forced by `--color`, otherwise only on a TTY
/// without `NO_COLOR`.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Auto => std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
        ColorMode::Always => true,
        ColorMode::Never => false,
    }
}

/// Success line on stderr.
pub fn notice(message: &str, color: &ColorMode, quiet: bool) {
    if quiet {
        return;
    }
    if should_color(color) {
        eprintln!("{} {message}", "✓".green());
    } else {
        eprintln!("✓ {message}");
    }
}

/// Dimmed follow-up hint on stderr.
pub fn hint(message: &str, color: &ColorMode, quiet: bool) {
    if quiet {
        return;
    }
    if should_color(color) {
        eprintln!("{}", message.dimmed());
    } else {
        eprintln!("{message}");
    }
}

/// A collection: `to_row` feeds the table, `key` feeds `plain`.
pub fn render_list<T, R>(
    format: &OutputFormat,
    items: &[T],
    to_row: impl Fn(&T) -> R,
    key: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize,
    R: Tabled,
{
    if let Some(rendered) = structured(format, items)? {
        return Ok(rendered);
    }
    Ok(match format {
        OutputFormat::Plain => items.iter().map(key).collect::<Vec<_>>().join("\n"),
        _ => render_table(&items.iter().map(to_row).collect::<Vec<_>>()),
    })
}

/// One record: `detail` feeds the table view, `key` feeds `plain`.
pub fn render_single<T>(
    format: &OutputFormat,
    item: &T,
    detail: impl Fn(&T) -> String,
    key: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize + ?Sized,
{
    if let Some(rendered) = structured(format, item)? {
        return Ok(rendered);
    }
    Ok(match format {
        OutputFormat::Plain => key(item),
        _ => detail(item),
    })
}

pub fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

pub(crate) fn render_json_pretty<T: Serialize + ?Sized>(value: &T) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// JSON and YAML renderings; `None` for the human formats.
fn structured<T: Serialize + ?Sized>(
    format: &OutputFormat,
    value: &T,
) -> Result<Option<String>, CliError> {
    let rendered = match format {
        OutputFormat::Json => render_json_pretty(value)?,
        OutputFormat::JsonCompact => serde_json::to_string(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
        OutputFormat::Table | OutputFormat::Plain => return Ok(None),
    };
    Ok(Some(rendered))
}

/// Write to stdout unless quiet or empty. A closed pipe is not an error.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let _ = writeln!(std::io::stdout().lock(), "{output}");
}
