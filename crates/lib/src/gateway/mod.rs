//! Gateway: HTTP server for the platform webhook and the health check.
//!
//! Single port. `POST /callback` verifies and dispatches webhook events; `GET /` answers
//! liveness checks.

mod server;

pub use server::{router, run_gateway, GatewayState};
