//! CLI configuration: thin wrapper around `vigil_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--api-url, --token, --insecure, --timeout) and settles the display
//! defaults (--output, --color).

use std::time::Duration;

use clap::ValueEnum;
use secrecy::SecretString;
use tracing::warn;

use vigil_core::{DashboardConfig, PageSize, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use vigil_config::{
    Config, Defaults, Profile, TokenSource, config_path, load_config_or_default, save_config,
};

/// Everything a command needs to talk to the backend.
#[derive(Debug)]
pub struct Resolved {
    pub profile_name: String,
    pub dashboard: DashboardConfig,
    pub page_size: PageSize,
    /// `None` when no token was found and the session is anonymous.
    pub token_source: Option<TokenSource>,
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

/// Settle the effective output format and color mode. A flag or env var
/// wins; otherwise `[defaults]` from the config file applies. An
/// unrecognized configured value falls back to the built-in default so
/// `vigil config` can still repair the file.
pub fn apply_display_defaults(global: &mut GlobalOpts, defaults: &Defaults) {
    global.output = match global.output_flag {
        Some(ref format) => format.clone(),
        None => parse_default("defaults.output", &defaults.output),
    };
    global.color = match global.color_flag {
        Some(ref mode) => mode.clone(),
        None => parse_default("defaults.color", &defaults.color),
    };
}

fn parse_default<T: ValueEnum + Default>(field: &str, raw: &str) -> T {
    <T as ValueEnum>::from_str(raw, true).unwrap_or_else(|reason| {
        warn!(field, value = raw, %reason, "ignoring configured default");
        T::default()
    })
}

/// Build the dashboard configuration from the config file, the active
/// profile and CLI overrides. Flags win over profile values.
///
/// A profile requested with `--profile` must exist. When the implicit
/// default profile is absent, built-in defaults are used.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(&cfg),
            });
        }
        None => Profile::default(),
    };

    let (dashboard, token_source) = resolve_profile(&profile, &profile_name, &cfg, global)?;
    let page_size = PageSize::try_from(profile.page_size.unwrap_or(cfg.defaults.page_size))?;

    Ok(Resolved {
        profile_name,
        dashboard,
        page_size,
        token_source,
    })
}

/// Translate a `Profile` plus global flags into a `DashboardConfig`,
/// reporting where its token came from.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<(DashboardConfig, Option<TokenSource>), CliError> {
    // 1. Token (flag > profile env > VIGIL_TOKEN > keyring > plaintext)
    let (token, token_source) = match global.token {
        Some(ref token) => (
            Some(SecretString::from(token.clone())),
            Some(TokenSource::Explicit),
        ),
        None => vigil_config::resolve_token_with_source(profile, profile_name)
            .map_or((None, None), |(token, source)| (Some(token), Some(source))),
    };

    let mut dashboard = vigil_config::dashboard_config_with_token(profile, &cfg.defaults, token)?;

    // 2. API URL (flag > env > profile)
    if let Some(ref raw) = global.api_url {
        dashboard.api_url = raw.parse().map_err(|_| CliError::Validation {
            field: "api-url".into(),
            reason: format!("invalid URL: {raw}"),
        })?;
    }

    // 3. TLS verification
    if global.insecure {
        dashboard.tls = TlsVerification::DangerAcceptInvalid;
    }

    // 4. Timeout
    if let Some(secs) = global.timeout {
        dashboard.timeout = Duration::from_secs(secs);
    }

    Ok((dashboard, token_source))
}

pub fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}
