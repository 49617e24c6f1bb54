//! Shared fan-out bus port.

use async_trait::async_trait;

use super::{entity::PresenceEvent, error::BusError};

/// Process-external publish/subscribe channel keyed by topic.
///
/// Publishing is at-least-once; callers do not wait for subscribers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PresenceBus: Send + Sync {
    async fn publish(&self, topic: &str, event: &PresenceEvent) -> Result<(), BusError>;
}
