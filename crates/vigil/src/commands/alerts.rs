//! Alert command handlers.

use std::fmt::Write as _;

use tabled::Tabled;
use vigil_core::{Alert, AlertStatistics, Dashboard, EntityId, PageSize, StatusUpdate};

use crate::cli::{AlertsArgs, AlertsCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Type")]
    alert_type: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Comments")]
    comments: usize,
    #[tabled(rename = "Raised")]
    raised: String,
}

impl From<&Alert> for AlertRow {
    fn from(a: &Alert) -> Self {
        Self {
            id: a.id.to_string(),
            alert_type: a.alert_type.clone(),
            status: a.status.to_string(),
            message: a.message.clone(),
            comments: a.comments.len(),
            raised: util::format_timestamp(&a.timestamp),
        }
    }
}

#[derive(Tabled)]
struct StatRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn detail(a: &Alert) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "ID:       {}", a.id);
    let _ = writeln!(out, "Type:     {}", a.alert_type);
    let _ = writeln!(out, "Status:   {}", a.status);
    let _ = writeln!(out, "Message:  {}", a.message);
    if let Some(ref threat) = a.threat_id {
        let _ = writeln!(out, "Threat:   {threat}");
    }
    let _ = write!(out, "Raised:   {}", util::format_timestamp(&a.timestamp));
    if !a.comments.is_empty() {
        let _ = write!(out, "\n\nComments:");
        for c in &a.comments {
            let who = c.user.as_deref().unwrap_or("anonymous");
            let _ = write!(
                out,
                "\n  [{}] {who}: {}",
                util::format_timestamp(&c.timestamp),
                c.text
            );
        }
    }
    out
}

/// One row per top-level statistic; nested values are shown as JSON.
fn stat_rows(stats: &AlertStatistics) -> Vec<StatRow> {
    match stats.0.as_object() {
        Some(map) => map
            .iter()
            .map(|(k, v)| StatRow {
                metric: k.clone(),
                value: match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                },
            })
            .collect(),
        None => vec![StatRow {
            metric: "value".into(),
            value: stats.0.to_string(),
        }],
    }
}

fn print_update(update: &StatusUpdate, global: &GlobalOpts) -> Result<(), CliError> {
    match global.output {
        OutputFormat::Table | OutputFormat::Plain => {
            output::notice(
                &format!("Alert {} is now {}", update.id, update.status),
                &global.color,
                global.quiet,
            );
        }
        _ => {
            let out = output::render_single(&global.output, update, |_| String::new(), |u| {
                u.id.to_string()
            })?;
            output::print_output(&out, global.quiet);
        }
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    dashboard: &Dashboard,
    args: AlertsArgs,
    page_size: PageSize,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        AlertsCommand::List(page) => {
            let pager = util::pager(&page, page_size)?;
            let alerts = dashboard.alerts(pager.request()).await?;
            let out = output::render_list(
                &global.output,
                alerts.as_slice(),
                |a| AlertRow::from(a),
                |a| a.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            util::page_hint(&pager, alerts.len(), "alerts list", global);
            Ok(())
        }

        AlertsCommand::Get { id } => {
            let id: EntityId = id.into();
            let alert = dashboard.alert(&id).await?;
            let out = output::render_single(&global.output, alert.as_ref(), detail, |a| {
                a.id.to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AlertsCommand::Ack { id } => {
            let update = dashboard.acknowledge_alert(&id.into()).await?;
            print_update(&update, global)
        }

        AlertsCommand::Resolve { id } => {
            let update = dashboard.resolve_alert(&id.into()).await?;
            print_update(&update, global)
        }

        AlertsCommand::Comment { id, text } => {
            let id: EntityId = id.into();
            let receipt = dashboard.add_comment(&id, &text).await?;
            match global.output {
                OutputFormat::Table | OutputFormat::Plain => {
                    output::notice(
                        &format!("Comment added to alert {}", receipt.id),
                        &global.color,
                        global.quiet,
                    );
                }
                _ => {
                    let out = output::render_single(
                        &global.output,
                        &receipt,
                        |_| String::new(),
                        |r| r.id.to_string(),
                    )?;
                    output::print_output(&out, global.quiet);
                }
            }
            Ok(())
        }

        AlertsCommand::Stats => {
            let stats = dashboard.alert_statistics().await?;
            let out = match global.output {
                OutputFormat::Table | OutputFormat::Plain => output::render_table(&stat_rows(&stats)),
                _ => output::render_single(&global.output, stats.as_ref(), |_| String::new(), |_| {
                    String::new()
                })?,
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
