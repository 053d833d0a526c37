//! Shared configuration for the vigil CLI.
//!
//! TOML profiles, token resolution (env + keyring + plaintext), and
//! translation to `vigil_core::DashboardConfig`. The CLI layers its
//! `GlobalOpts` overrides on top of what this crate resolves.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use vigil_core::{DashboardConfig, TlsVerification};

/// Backend address used when a profile does not name one.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";

/// Environment variable consulted for a token after the profile's own.
pub const TOKEN_ENV: &str = "VIGIL_TOKEN";

const KEYRING_SERVICE: &str = "vigil";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("unknown profile '{profile}'")]
    UnknownProfile { profile: String },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl From<keyring::Error> for ConfigError {
    fn from(err: keyring::Error) -> Self {
        Self::Keyring(err.to_string())
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Profile name to use: explicit override, then `default_profile`,
    /// then `"default"`.
    pub fn active_profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
            page_size: default_page_size(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_page_size() -> u32 {
    10
}
fn default_api_url() -> String {
    DEFAULT_API_URL.into()
}

/// A named backend profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// API base URL (e.g., "http://localhost:8000/api/v1").
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Bearer token in plaintext. Prefer the keyring or an env var.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Environment variable name containing the token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,

    /// Path to custom CA certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Override list page size (5, 10 or 25).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,

    /// Refetch cached reads older than this many seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_max_age_secs: Option<u64>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: None,
            token_env: None,
            ca_cert: None,
            insecure: None,
            timeout: None,
            page_size: None,
            cache_max_age_secs: None,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "vigil", "vigil").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("vigil");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment. A missing file
/// yields the defaults.
///
/// Environment keys nest on `__`, e.g.
/// `VIGIL_PROFILES__DEFAULT__API_URL`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("VIGIL_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it cannot be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Token resolution ────────────────────────────────────────────────

/// Where a resolved token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// Handed in by the caller, e.g. `--token`.
    Explicit,
    /// The variable named by the profile's `token_env`.
    ProfileEnv,
    /// `VIGIL_TOKEN`.
    GlobalEnv,
    Keyring,
    /// `token` in the config file.
    Plaintext,
}

impl TokenSource {
    /// Only a keyring token is ours to delete when the backend rejects it.
    pub fn is_stored(self) -> bool {
        matches!(self, Self::Keyring)
    }
}

/// Resolve the session token for a profile (no CLI flag step).
///
/// Chain: profile's `token_env` → `VIGIL_TOKEN` → system keyring →
/// plaintext in config. `None` means the session starts anonymous.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    resolve_token_with_source(profile, profile_name).map(|(token, _)| token)
}

/// Like [`resolve_token`], also reporting which link of the chain matched.
pub fn resolve_token_with_source(
    profile: &Profile,
    profile_name: &str,
) -> Option<(SecretString, TokenSource)> {
    resolve_token_with(
        profile,
        |name| std::env::var(name).ok(),
        || keyring_entry(profile_name).ok()?.get_password().ok(),
    )
}

fn resolve_token_with(
    profile: &Profile,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl FnOnce() -> Option<String>,
) -> Option<(SecretString, TokenSource)> {
    // 1. Profile's token_env → env var lookup
    if let Some(value) = profile.token_env.as_deref().and_then(&env) {
        return Some((SecretString::from(value), TokenSource::ProfileEnv));
    }

    // 2. Global env var
    if let Some(value) = env(TOKEN_ENV) {
        return Some((SecretString::from(value), TokenSource::GlobalEnv));
    }

    // 3. System keyring
    if let Some(value) = keyring() {
        return Some((SecretString::from(value), TokenSource::Keyring));
    }

    // 4. Plaintext in config
    profile
        .token
        .clone()
        .map(|value| (SecretString::from(value), TokenSource::Plaintext))
}

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/token"))
}

/// Persist a token in the system keyring for `profile_name`.
pub fn store_token(profile_name: &str, token: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(token.expose_secret())?;
    Ok(())
}

/// Remove the keyring token for `profile_name`. Returns `false` if none
/// was stored.
pub fn forget_token(profile_name: &str) -> Result<bool, ConfigError> {
    match keyring_entry(profile_name)?.delete_credential() {
        Ok(()) => Ok(true),
        Err(keyring::Error::NoEntry) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `DashboardConfig` from a profile alone, without CLI flag overrides.
pub fn profile_to_dashboard_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<DashboardConfig, ConfigError> {
    let token = resolve_token(profile, profile_name);
    dashboard_config_with_token(profile, defaults, token)
}

/// Build a `DashboardConfig` with an already-resolved token.
pub fn dashboard_config_with_token(
    profile: &Profile,
    defaults: &Defaults,
    token: Option<SecretString>,
) -> Result<DashboardConfig, ConfigError> {
    let api_url: url::Url = profile
        .api_url
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "api_url".into(),
            reason: format!("invalid URL: {}", profile.api_url),
        })?;

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let mut config = DashboardConfig::new(api_url);
    config.token = token;
    config.tls = tls;
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.cache_max_age = profile.cache_max_age_secs.map(Duration::from_secs);
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    const SAMPLE: &str = r#"
default_profile = "lab"

[defaults]
timeout = 15

[profiles.lab]
api_url = "https://soc.lab.internal/api/v1"
token_env = "LAB_TOKEN"
page_size = 25
cache_max_age_secs = 120

[profiles.local]
"#;

    fn write_sample() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_profiles_and_defaults_from_file() {
        let (_dir, path) = write_sample();
        let config = load_config_from(&path).unwrap();

        assert_eq!(config.active_profile_name(None), "lab");
        assert_eq!(config.active_profile_name(Some("local")), "local");
        assert_eq!(config.defaults.timeout, 15);
        assert_eq!(config.defaults.output, "table");

        let lab = config.profile("lab").unwrap();
        assert_eq!(lab.page_size, Some(25));
        assert_eq!(config.profile("local").unwrap().api_url, DEFAULT_API_URL);
        assert!(matches!(
            config.profile("prod"),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.default_profile.as_deref(), Some("default"));
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn save_then_load_preserves_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.profiles.insert(
            "default".into(),
            Profile {
                insecure: Some(true),
                ..Profile::default()
            },
        );
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        let profile = loaded.profile("default").unwrap();
        assert_eq!(profile.api_url, DEFAULT_API_URL);
        assert_eq!(profile.insecure, Some(true));
        assert!(profile.token.is_none());
    }

    #[test]
    fn token_chain_prefers_profile_env_then_global_env() {
        let profile = Profile {
            token_env: Some("LAB_TOKEN".into()),
            token: Some("plain".into()),
            ..Profile::default()
        };

        let env = |name: &str| match name {
            "LAB_TOKEN" => Some("from-profile-env".to_string()),
            TOKEN_ENV => Some("from-global-env".to_string()),
            _ => None,
        };
        let (token, source) =
            resolve_token_with(&profile, env, || Some("from-keyring".into())).unwrap();
        assert_eq!(token.expose_secret(), "from-profile-env");
        assert_eq!(source, TokenSource::ProfileEnv);

        let only_global = |name: &str| (name == TOKEN_ENV).then(|| "from-global-env".to_string());
        let (token, source) =
            resolve_token_with(&profile, only_global, || Some("from-keyring".into())).unwrap();
        assert_eq!(token.expose_secret(), "from-global-env");
        assert_eq!(source, TokenSource::GlobalEnv);
        assert!(!source.is_stored());
    }

    #[test]
    fn token_chain_falls_back_to_keyring_then_plaintext() {
        let profile = Profile {
            token: Some("plain".into()),
            ..Profile::default()
        };

        let (token, source) =
            resolve_token_with(&profile, |_| None, || Some("from-keyring".into())).unwrap();
        assert_eq!(token.expose_secret(), "from-keyring");
        assert_eq!(source, TokenSource::Keyring);
        assert!(source.is_stored());

        let (token, source) = resolve_token_with(&profile, |_| None, || None).unwrap();
        assert_eq!(token.expose_secret(), "plain");
        assert_eq!(source, TokenSource::Plaintext);
        assert!(!source.is_stored());

        assert!(resolve_token_with(&Profile::default(), |_| None, || None).is_none());
    }

    #[test]
    fn dashboard_config_reflects_profile_and_defaults() {
        let (_dir, path) = write_sample();
        let config = load_config_from(&path).unwrap();
        let lab = config.profile("lab").unwrap();

        let dashboard = dashboard_config_with_token(lab, &config.defaults, None).unwrap();
        assert_eq!(dashboard.api_url.as_str(), "https://soc.lab.internal/api/v1");
        assert_eq!(dashboard.timeout, Duration::from_secs(15));
        assert_eq!(dashboard.cache_max_age, Some(Duration::from_secs(120)));
        assert_eq!(dashboard.tls, TlsVerification::SystemDefaults);
        assert!(dashboard.token.is_none());
    }

    #[test]
    fn invalid_api_url_is_a_validation_error() {
        let profile = Profile {
            api_url: "not a url".into(),
            ..Profile::default()
        };
        let result = dashboard_config_with_token(&profile, &Defaults::default(), None);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }
}
