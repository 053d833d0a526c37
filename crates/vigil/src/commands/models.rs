//! Model command handlers.

use std::fmt::Write as _;

use tabled::Tabled;
use vigil_core::{ActionReceipt, CoreError, Dashboard, Model, Prediction, PredictionInput};

use crate::cli::{GlobalOpts, ModelsArgs, ModelsCommand, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct ModelRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    model_type: String,
    #[tabled(rename = "Accuracy")]
    accuracy: String,
    #[tabled(rename = "Last trained")]
    last_trained: String,
}

impl From<&Model> for ModelRow {
    fn from(m: &Model) -> Self {
        Self {
            name: m.name.clone(),
            model_type: m.model_type.clone(),
            accuracy: m.accuracy.map_or_else(|| "-".into(), util::format_ratio),
            last_trained: util::format_optional_timestamp(m.last_training_time.as_ref()),
        }
    }
}

#[derive(Tabled)]
struct PredictionRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Prediction")]
    prediction: String,
    #[tabled(rename = "Probability")]
    probability: String,
}

fn prediction_rows(p: &Prediction) -> Vec<PredictionRow> {
    p.predictions
        .iter()
        .enumerate()
        .map(|(index, value)| PredictionRow {
            index,
            prediction: scalar(value),
            probability: p.probabilities.get(index).map_or_else(String::new, scalar),
        })
        .collect()
}

fn scalar(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn detail(m: &Model) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Name:          {}", m.name);
    let _ = writeln!(out, "Type:          {}", m.model_type);
    let _ = writeln!(
        out,
        "Accuracy:      {}",
        m.accuracy.map_or_else(|| "-".into(), util::format_ratio)
    );
    let _ = write!(
        out,
        "Last trained:  {}",
        util::format_optional_timestamp(m.last_training_time.as_ref())
    );
    out
}

fn print_receipt(receipt: &ActionReceipt, done: &str, global: &GlobalOpts) -> Result<(), CliError> {
    match global.output {
        OutputFormat::Table | OutputFormat::Plain => {
            let message = receipt.message.as_deref().unwrap_or(done);
            output::notice(message, &global.color, global.quiet);
        }
        _ => {
            let out = output::render_single(&global.output, receipt, |_| String::new(), |r| {
                r.status.clone()
            })?;
            output::print_output(&out, global.quiet);
        }
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    dashboard: &Dashboard,
    args: ModelsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ModelsCommand::List => {
            let models = dashboard.models().await?;
            let out = output::render_list(
                &global.output,
                models.as_slice(),
                |m| ModelRow::from(m),
                |m| m.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ModelsCommand::Get { name } => {
            let model = dashboard.model(&name).await?;
            let out = output::render_single(&global.output, model.as_ref(), detail, |m| {
                m.name.clone()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ModelsCommand::Train { name, from_file } => {
            let raw = std::fs::read_to_string(&from_file)?;
            let receipt = dashboard.train_model_json(&name, &raw).await?;
            print_receipt(&receipt, &format!("Training started for model '{name}'"), global)
        }

        ModelsCommand::Predict { name, from_file } => {
            let raw = std::fs::read_to_string(&from_file)?;
            let input = PredictionInput::from_json_str(&raw).map_err(CoreError::from)?;
            let prediction = dashboard.predict(&name, &input).await?;
            let out = match global.output {
                OutputFormat::Table => output::render_table(&prediction_rows(&prediction)),
                OutputFormat::Plain => prediction
                    .predictions
                    .iter()
                    .map(scalar)
                    .collect::<Vec<_>>()
                    .join("\n"),
                _ => output::render_single(&global.output, &prediction, |_| String::new(), |_| {
                    String::new()
                })?,
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ModelsCommand::Save { name, path } => {
            let receipt = dashboard.save_model(&name, &path).await?;
            print_receipt(&receipt, &format!("Model '{name}' saved to {path}"), global)
        }

        ModelsCommand::Load { name, path } => {
            let receipt = dashboard.load_model(&name, &path).await?;
            print_receipt(&receipt, &format!("Model '{name}' loaded from {path}"), global)
        }
    }
}
