// Session store
//
// Holds the bearer token for the current session. Written by the login
// flow (outside this crate) and by the gateway when the backend rejects
// the token; read once per outgoing request.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use secrecy::SecretString;
use tokio::sync::watch;

/// Whether a token is currently held.
///
/// Authenticated → Anonymous happens on a 401 (or an explicit logout).
/// Nothing in this crate moves back to Authenticated; only `set()` does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Authenticated,
    Anonymous,
}

/// Process-wide holder of at most one bearer token.
///
/// Reads are lock-free (`ArcSwapOption`), so any number of in-flight
/// requests can load the token while a single writer swaps it out.
pub struct SessionStore {
    token: ArcSwapOption<SecretString>,
    state: watch::Sender<SessionState>,
}

impl SessionStore {
    /// An empty (anonymous) session.
    pub fn new() -> Self {
        Self::from_token(None)
    }

    /// A session pre-populated from persisted storage.
    pub fn with_token(token: SecretString) -> Self {
        Self::from_token(Some(token))
    }

    fn from_token(token: Option<SecretString>) -> Self {
        let initial = if token.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        };
        let (state, _) = watch::channel(initial);
        Self {
            token: ArcSwapOption::from(token.map(Arc::new)),
            state,
        }
    }

    /// The current token, if any.
    pub fn get(&self) -> Option<Arc<SecretString>> {
        self.token.load_full()
    }

    /// Replace the current token.
    pub fn set(&self, token: SecretString) {
        self.token.store(Some(Arc::new(token)));
        self.state.send_replace(SessionState::Authenticated);
    }

    /// Drop the current token. Returns `true` if one was held.
    pub fn clear(&self) -> bool {
        let previous = self.token.swap(None);
        self.state.send_replace(SessionState::Anonymous);
        previous.is_some()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.load().is_some()
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Subscribe to session state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
