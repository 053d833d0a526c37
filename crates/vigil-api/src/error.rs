use thiserror::Error;

/// Longest body excerpt carried in error messages.
const PREVIEW_LEN: usize = 200;

/// Top-level error type for the `vigil-api` crate.
///
/// Covers every failure mode of a backend round-trip: transport,
/// non-success HTTP status, session expiry, client-side validation, and
/// response decoding. `vigil-core` maps these into user-facing errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Session ─────────────────────────────────────────────────────
    /// The backend answered 401. By the time the caller sees this the
    /// session store has been cleared and the login redirect has fired.
    #[error("Session expired -- re-authentication required")]
    AuthExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// No response was received (connection refused, DNS, timeout, or
    /// the body could not be read).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS configuration or client construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── HTTP ────────────────────────────────────────────────────────
    /// Any non-success response other than 401.
    #[error("HTTP {status}: {}", preview(.body))]
    Http { status: u16, body: String },

    // ── Client-side ─────────────────────────────────────────────────
    /// A request precondition failed before anything was sent.
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Returns `true` if the backend rejected the session credentials.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired)
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Http { status: 404, .. })
    }

    /// Returns `true` if the request never left the client.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Returns `true` if the backend answered 2xx but the body did not
    /// decode. The request itself took effect.
    pub fn was_accepted(&self) -> bool {
        matches!(self, Self::Deserialization { .. })
    }

    /// HTTP status of the failed response, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::AuthExpired => Some(401),
            _ => None,
        }
    }
}

/// Truncate a response body for display without splitting a character.
pub(crate) fn preview(body: &str) -> &str {
    match body.char_indices().nth(PREVIEW_LEN) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
