//! Domain layer: value objects, entities, the session registry, the
//! per-connection state machine, and the ports implemented by infrastructure.

pub mod auth;
pub mod entity;
pub mod error;
pub mod message_pusher;
pub mod presence_bus;
pub mod registry;
pub mod repository;
pub mod session;
pub mod value_object;

pub use auth::TokenVerifier;
pub use entity::{ChatEntry, Collaborator, Identity, PresenceEvent, PresenceKind};
pub use error::{
    AuthError, BusError, HistoryError, MessagePushError, SessionStateError, ValueObjectError,
};
pub use message_pusher::MessagePusher;
pub use presence_bus::PresenceBus;
pub use registry::{ConnectionHandle, PusherChannel, Registration, SessionRegistry};
pub use repository::ChatHistoryStore;
pub use session::{CollaborationSession, SessionEffect, SessionEvent, SessionState};
pub use value_object::{ChatText, Color, ConnectionId, Cursor, DocumentId, UserId};

#[cfg(test)]
pub use auth::MockTokenVerifier;
#[cfg(test)]
pub use presence_bus::MockPresenceBus;
#[cfg(test)]
pub use repository::MockChatHistoryStore;
