//! Request handlers.

pub mod http;
pub mod websocket;

pub use http::{get_chat_history, get_collaborators, health_check};
pub use websocket::{AUTH_FAILED_CLOSE_CODE, AUTH_FAILED_REASON, websocket_handler};
