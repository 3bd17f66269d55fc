use std::sync::Mutex;

use tokio::sync::{broadcast, mpsc};

use crate::types::EngineEvent;

/// Event bus using tokio broadcast channel.
/// All subscribers receive all events.
///
/// Broadcast subscribers may lag and skip events under load; they suit
/// progress display. Consumers that must see every event (the execution
/// journal) take an unbounded feed from [`EventBus::subscribe_unbounded`].
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
    feeds: Mutex<Vec<mpsc::UnboundedSender<EngineEvent>>>,
}

impl EventBus {
    /// `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            feeds: Mutex::new(Vec::new()),
        }
    }

    pub fn publish(&self, event: EngineEvent) {
        if let Ok(mut feeds) = self.feeds.lock() {
            feeds.retain(|feed| feed.send(event.clone()).is_ok());
        }
        // No receivers is fine
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    /// Lossless subscription. The receiver yields `None` once the bus is
    /// dropped and every queued event has been read.
    pub fn subscribe_unbounded(&self) -> mpsc::UnboundedReceiver<EngineEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut feeds) = self.feeds.lock() {
            feeds.push(tx);
        }
        rx
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
