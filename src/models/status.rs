use std::sync::Arc;

use tokio::sync::watch;

/// The single last-value-wins status message.
///
/// Cloning yields another publisher for the same slot. The slot closes once
/// every publisher is dropped.
#[derive(Debug, Clone)]
pub struct StatusSlot {
    sender: Arc<watch::Sender<String>>,
}

impl StatusSlot {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(String::new());
        Self { sender: Arc::new(sender) }
    }

    /// Overwrites the current value, waking subscribers.
    pub fn publish(&self, message: impl Into<String>) {
        self.sender.send_replace(message.into());
    }

    pub fn current(&self) -> String {
        self.sender.borrow().clone()
    }

    /// Subscribes to values published from now on.
    pub fn subscribe(&self) -> StatusSubscription {
        StatusSubscription { receiver: self.sender.subscribe() }
    }
}

impl Default for StatusSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct StatusSubscription {
    receiver: watch::Receiver<String>,
}

impl StatusSubscription {
    /// Waits for a value newer than the last one seen. Values published in
    /// between are skipped. Returns `None` once the slot is closed.
    pub async fn next(&mut self) -> Option<String> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }
}
