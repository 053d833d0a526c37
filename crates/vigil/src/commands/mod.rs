//! Command dispatch: routes parsed CLI commands to their handlers.

pub mod auth;
pub mod config_cmd;
pub mod util;

mod alerts;
mod models;
mod threats;

use std::sync::Arc;

use vigil_core::Dashboard;

use crate::cli::{Command, GlobalOpts};
use crate::config::Resolved;
use crate::error::CliError;

/// Build a dashboard for the resolved profile and run one command on it.
pub async fn dispatch(cmd: Command, resolved: Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    let Resolved {
        profile_name,
        dashboard,
        page_size,
        token_source,
    } = resolved;
    let redirect = auth::CliRedirect::for_source(profile_name.clone(), token_source);
    let dashboard = Dashboard::new(dashboard, Arc::new(redirect))?;

    let result = match cmd {
        Command::Threats(args) => threats::handle(&dashboard, args, page_size, global).await,
        Command::Alerts(args) => alerts::handle(&dashboard, args, page_size, global).await,
        Command::Models(args) => models::handle(&dashboard, args, global).await,
        // Handled before dispatch
        Command::Auth(_) | Command::Config(_) | Command::Completions(_) => unreachable!(),
    };
    result.map_err(|e| e.for_profile(&profile_name))
}
