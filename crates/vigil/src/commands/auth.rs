//! Token management: login, logout, status.
//!
//! Tokens are issued by the backend's own login flow; these commands only
//! store, remove and report the one the CLI sends.

use secrecy::SecretString;
use serde::Serialize;
use tracing::debug;

use vigil_core::LoginRedirect;

use crate::cli::{AuthArgs, AuthCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

/// Login entry point for the CLI: drops the stored token that the
/// backend rejected and points the user at `vigil auth login`.
pub struct CliRedirect {
    profile: String,
    /// Set only for keyring tokens; env, flag and plaintext tokens are
    /// never deleted.
    forget_stored: bool,
}

impl CliRedirect {
    pub fn for_source(profile: impl Into<String>, source: Option<config::TokenSource>) -> Self {
        Self {
            profile: profile.into(),
            forget_stored: source.is_some_and(config::TokenSource::is_stored),
        }
    }
}

impl LoginRedirect for CliRedirect {
    fn redirect_to_login(&self) {
        if self.forget_stored {
            match vigil_config::forget_token(&self.profile) {
                Ok(removed) => debug!(profile = %self.profile, removed, "stored token forgotten"),
                Err(e) => debug!(profile = %self.profile, error = %e, "could not forget stored token"),
            }
        }
        eprintln!(
            "Session rejected by the backend. Run: vigil auth login --profile {}",
            self.profile
        );
    }
}

#[derive(Serialize)]
struct AuthStatus {
    profile: String,
    api_url: String,
    authenticated: bool,
}

pub fn handle(args: AuthArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load_config_or_default();
    let profile_name = config::active_profile_name(global, &cfg);

    match args.command {
        AuthCommand::Login => {
            let token = match global.token {
                Some(ref token) => token.clone(),
                None => rpassword::prompt_password("Token: ").map_err(util::prompt_err)?,
            };
            let token = token.trim();
            if token.is_empty() {
                return Err(CliError::Validation {
                    field: "token".into(),
                    reason: "token cannot be empty".into(),
                });
            }
            vigil_config::store_token(&profile_name, &SecretString::from(token.to_owned()))?;
            output::notice(
                &format!("Token stored in system keyring for profile '{profile_name}'"),
                &global.color,
                global.quiet,
            );
            Ok(())
        }

        AuthCommand::Logout => {
            let message = if vigil_config::forget_token(&profile_name)? {
                format!("Token removed for profile '{profile_name}'")
            } else {
                format!("No stored token for profile '{profile_name}'")
            };
            output::notice(&message, &global.color, global.quiet);
            Ok(())
        }

        AuthCommand::Status => {
            let resolved = config::resolve(global)?;
            let status = AuthStatus {
                profile: resolved.profile_name,
                api_url: resolved.dashboard.api_url.to_string(),
                authenticated: resolved.dashboard.token.is_some(),
            };
            let out = output::render_single(
                &global.output,
                &status,
                |s| {
                    let state = if s.authenticated {
                        "token available"
                    } else {
                        "anonymous (run: vigil auth login)"
                    };
                    format!("Profile:  {}\nAPI URL:  {}\nSession:  {state}", s.profile, s.api_url)
                },
                |s| s.authenticated.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
