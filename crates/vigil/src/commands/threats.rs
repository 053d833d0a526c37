//! Threat command handlers.

use std::fmt::Write as _;

use tabled::Tabled;
use vigil_core::{AnalysisRequest, Dashboard, EntityId, PageSize, ResponseAction, Threat};

use crate::cli::{GlobalOpts, ThreatsArgs, ThreatsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ThreatRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Type")]
    threat_type: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Destination")]
    destination: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Detected")]
    detected: String,
}

impl From<&Threat> for ThreatRow {
    fn from(t: &Threat) -> Self {
        Self {
            id: t.id.to_string(),
            threat_type: t.threat_type.clone(),
            severity: util::format_ratio(t.severity),
            source: t.source_ip.clone(),
            destination: t.destination_ip.clone(),
            status: t.status.to_string(),
            detected: util::format_timestamp(&t.timestamp),
        }
    }
}

fn detail(t: &Threat) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "ID:           {}", t.id);
    let _ = writeln!(out, "Type:         {}", t.threat_type);
    let _ = writeln!(out, "Severity:     {}", util::format_ratio(t.severity));
    if let Some(confidence) = t.confidence_score {
        let _ = writeln!(out, "Confidence:   {}", util::format_ratio(confidence));
    }
    let _ = writeln!(out, "Source:       {}", t.source_ip);
    let _ = writeln!(out, "Destination:  {}", t.destination_ip);
    let _ = writeln!(out, "Status:       {}", t.status);
    let _ = write!(out, "Detected:     {}", util::format_timestamp(&t.timestamp));
    if !t.raw_data.is_null() {
        let raw = serde_json::to_string_pretty(&t.raw_data).unwrap_or_default();
        let _ = write!(out, "\nRaw data:\n{raw}");
    }
    out
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    dashboard: &Dashboard,
    args: ThreatsArgs,
    page_size: PageSize,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ThreatsCommand::List(page) => {
            let pager = util::pager(&page, page_size)?;
            let threats = dashboard.threats(pager.request()).await?;
            let out = output::render_list(
                &global.output,
                threats.as_slice(),
                |t| ThreatRow::from(t),
                |t| t.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            util::page_hint(&pager, threats.len(), "threats list", global);
            Ok(())
        }

        ThreatsCommand::Get { id } => {
            let id: EntityId = id.into();
            let threat = dashboard.threat(&id).await?;
            let out = output::render_single(&global.output, threat.as_ref(), detail, |t| {
                t.id.to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ThreatsCommand::Analyze { from_file } => {
            let request = AnalysisRequest::from_value(util::read_json_file(&from_file)?)
                .map_err(vigil_core::CoreError::from)?;
            let receipt = dashboard.analyze_threat(&request).await?;
            let out = output::render_json_pretty(&receipt)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ThreatsCommand::Respond {
            id,
            from_file,
            action,
        } => {
            let response = match (from_file, action) {
                (Some(path), _) => ResponseAction::from_value(util::read_json_file(&path)?)
                    .map_err(vigil_core::CoreError::from)?,
                (None, Some(action)) => ResponseAction::named(&action),
                (None, None) => {
                    return Err(CliError::Validation {
                        field: "action".into(),
                        reason: "either --action or --from-file is required".into(),
                    });
                }
            };
            if !util::confirm(&format!("Trigger a response on threat {id}?"), global.yes)? {
                return Ok(());
            }
            let id: EntityId = id.into();
            let receipt = dashboard.respond_to_threat(&id, &response).await?;
            let out = output::render_json_pretty(&receipt)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
