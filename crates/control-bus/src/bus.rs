//! Broadcast Bus Implementation

use crate::message::{ControlMessage, WorkerId};
use tokio::sync::mpsc;
use tracing::{debug, warn};

struct Subscriber {
    id: WorkerId,
    tx: mpsc::UnboundedSender<ControlMessage>,
}

/// Broadcast-by-copy distribution of control messages
///
/// One private unbounded queue per subscriber keeps a slow display from
/// ever dropping a button press meant for someone else. Per-subscriber
/// delivery order equals global publish order.
#[derive(Default)]
pub struct ControlBus {
    subscribers: Vec<Subscriber>,
}

impl ControlBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a worker; returns its private inbox
    pub fn subscribe(&mut self, id: WorkerId) -> ControlInbox {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(Subscriber { id, tx });
        debug!(worker = ?id, "subscribed to control bus");
        ControlInbox { rx }
    }

    /// Copy the message into every subscriber inbox, in registration order
    ///
    /// Returns how many inboxes accepted it. A closed inbox just means the
    /// worker is gone; it is skipped, not an error.
    pub fn publish(&self, message: &ControlMessage) -> usize {
        let mut delivered = 0;
        for subscriber in &self.subscribers {
            if subscriber.tx.send(message.clone()).is_ok() {
                delivered += 1;
            } else {
                warn!(worker = ?subscriber.id, "control inbox closed, skipping");
            }
        }
        delivered
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

/// A worker's private inbound queue of control messages
pub struct ControlInbox {
    rx: mpsc::UnboundedReceiver<ControlMessage>,
}

impl ControlInbox {
    /// Non-blocking poll for the next message
    pub fn try_next(&mut self) -> Option<ControlMessage> {
        self.rx.try_recv().ok()
    }
}
