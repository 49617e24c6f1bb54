//! Message delivery implementations.
//!
//! - `websocket`: delivers through the outbound channels held in the
//!   [`SessionRegistry`](crate::domain::SessionRegistry).

pub mod websocket;

pub use websocket::WebSocketMessagePusher;
