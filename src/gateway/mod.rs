//! Gateway request pipeline: preflight, gatekeeper, forwarder

pub mod auth;
pub mod forward;
pub mod preflight;
mod router;
mod server;

pub use auth::{Authorized, ProxySecrets, auth_middleware};
pub use forward::{Forwarder, build_http_client};
pub use router::{AppState, create_router};
pub use server::Gateway;
