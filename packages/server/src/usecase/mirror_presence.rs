//! Cross-instance presence mirroring.
//!
//! Connections hand presence events to a single background worker through an
//! unbounded channel, so enqueueing never waits on the bus and events leave
//! this instance in the order they were produced. Each event is retried with
//! its original `event_id`.

use std::{sync::Arc, time::Duration};

use tokio::{sync::mpsc, task::JoinHandle};

use crate::domain::{BusError, PresenceBus, PresenceEvent};

/// Base delay between publish attempts; grows linearly with the attempt number.
const RETRY_BACKOFF: Duration = Duration::from_millis(50);

pub struct PresenceMirror {
    tx: mpsc::UnboundedSender<PresenceEvent>,
}

impl PresenceMirror {
    /// Start the publishing worker.
    ///
    /// The worker stops once every `PresenceMirror` handle has been dropped
    /// and the queue is drained.
    pub fn spawn(bus: Arc<dyn PresenceBus>, max_attempts: u32) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run(bus, rx, max_attempts.max(1)));
        (Self { tx }, worker)
    }

    /// Queue `event` for publication.
    pub fn mirror(&self, event: PresenceEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::error!(
                "Presence worker is gone, dropping event {}",
                e.0.event_id
            );
        }
    }
}

async fn run(
    bus: Arc<dyn PresenceBus>,
    mut rx: mpsc::UnboundedReceiver<PresenceEvent>,
    max_attempts: u32,
) {
    while let Some(event) = rx.recv().await {
        if let Err(e) = publish_with_retry(bus.as_ref(), &event, max_attempts).await {
            tracing::error!(
                "Giving up on presence event {} ({:?} '{}' on '{}'): {}",
                event.event_id,
                event.kind,
                event.user_id,
                event.document_id,
                e
            );
        }
    }
    tracing::debug!("Presence worker stopped");
}

/// Publish `event`, retrying up to `max_attempts` times. Returns the attempt
/// that succeeded.
pub(crate) async fn publish_with_retry(
    bus: &dyn PresenceBus,
    event: &PresenceEvent,
    max_attempts: u32,
) -> Result<u32, BusError> {
    let topic = event.topic();
    let mut attempt = 1;
    loop {
        match bus.publish(&topic, event).await {
            Ok(()) => {
                tracing::debug!(
                    "Published presence event {} on '{}' (attempt {})",
                    event.event_id,
                    topic,
                    attempt
                );
                return Ok(attempt);
            }
            Err(e) if attempt < max_attempts => {
                tracing::warn!(
                    "Presence publish attempt {} for {} failed: {}",
                    attempt,
                    event.event_id,
                    e
                );
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
