// vigil-api: Async Rust client for the threat-detection dashboard REST API
//
// Session store, HTTP gateway, and the per-domain resource clients
// (threats, alerts, models) that sit on top of it.

pub mod error;
pub mod gateway;
pub mod resources;
pub mod session;
pub mod transport;
pub mod types;

pub use error::Error;
pub use gateway::{Gateway, LoginRedirect, TracingRedirect};
pub use resources::{Alerts, Models, Threats};
pub use session::{SessionState, SessionStore};
pub use transport::{TlsMode, TransportConfig};
