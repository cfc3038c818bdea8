//! HTTP surface of the diagnosis gateway.
//!
//! Routes are nested under `/api/`. The proxy endpoint authenticates from
//! the session cookie itself; there is no separate auth middleware.
//!
//! The router is composable: `gateway_router()` returns a `Router`
//! that can be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod session;
pub mod types;
pub mod upstream;

pub use error::ApiError;
pub use router::gateway_router;
pub use server::{start_gateway_server, GatewayServer, GatewaySession, ServerError};
pub use session::AuthContext;
pub use types::ApiContext;
pub use upstream::{DiagnosisUpstream, HttpDiagnosisUpstream, UpstreamError, UpstreamResponse};
