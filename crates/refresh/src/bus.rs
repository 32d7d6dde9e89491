use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Subscribers that fall this far behind miss signals and get a lag notice instead.
pub const DEFAULT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshReason {
    Manual,
    Poll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSignal {
    pub reason: RefreshReason,
}

impl RefreshSignal {
    pub fn manual() -> Self {
        Self {
            reason: RefreshReason::Manual,
        }
    }
}

/// Publish/subscribe channel asking every refresh job to run a pass now.
#[derive(Debug, Clone)]
pub struct RefreshBus {
    tx: broadcast::Sender<RefreshSignal>,
}

impl Default for RefreshBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RefreshBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Returns how many subscribers received the signal.
    pub fn publish(&self, signal: RefreshSignal) -> usize {
        match self.tx.send(signal) {
            Ok(n) => {
                tracing::debug!(reason = ?signal.reason, subscribers = n, "Refresh signal published");
                n
            }
            Err(_) => {
                tracing::debug!(reason = ?signal.reason, "Refresh signal published with no subscribers");
                0
            }
        }
    }

    pub fn request_refresh(&self) -> usize {
        self.publish(RefreshSignal::manual())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RefreshSignal> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
