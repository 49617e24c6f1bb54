//! UI layer: axum router, WebSocket and HTTP handlers.

mod handler;
mod server;
mod signal;
pub mod state;

pub use handler::{AUTH_FAILED_CLOSE_CODE, AUTH_FAILED_REASON};
pub use server::Server;
