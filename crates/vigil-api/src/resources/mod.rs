// Per-resource request translators.
//
// Each client borrows the gateway and maps one logical operation onto
// exactly one HTTP call. Preconditions are enforced by the payload types
// in `crate::types` (and by `Alerts::update_status` for the target
// status), so nothing here can send a request the backend would reject
// on shape alone.

mod alerts;
mod models;
mod threats;

pub use alerts::Alerts;
pub use models::Models;
pub use threats::Threats;

use crate::error::Error;

/// Reject blank path identifiers before they reach the URL builder.
fn require_name<'n>(what: &str, name: &'n str) -> Result<&'n str, Error> {
    if name.trim().is_empty() {
        return Err(Error::validation(format!("{what} must not be blank")));
    }
    Ok(name)
}
