use std::{
    io::{self, Write},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread,
    time::{Duration, Instant},
};

use futures::executor::block_on;
use log::debug;

use crate::models::status::StatusSubscription;

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub text: String,
    shown_at: Instant,
}

impl Notification {
    fn new(text: String, shown_at: Instant) -> Self {
        Self { text, shown_at }
    }

    pub fn is_expired(&self, now: Instant, duration: Duration) -> bool {
        now.saturating_duration_since(self.shown_at) >= duration
    }
}

/// Turns status slot values into transient notifications. At most one is
/// showing; a newer value replaces it.
#[derive(Debug, Clone)]
pub struct Notifier {
    current: Arc<Mutex<Option<Notification>>>,
    duration: Duration,
}

impl Notifier {
    pub fn new(duration: Duration) -> Self {
        Self {
            current: Arc::new(Mutex::new(None)),
            duration,
        }
    }

    /// Starts the subscriber thread. It ends when the slot closes.
    pub fn start(&self, mut subscription: StatusSubscription) -> io::Result<thread::JoinHandle<()>> {
        let notifier = self.clone();
        thread::Builder::new().name("notifier".to_string()).spawn(move || {
            while let Some(message) = block_on(subscription.next()) {
                if let Some(notification) = notifier.show(message, Instant::now()) {
                    render(&notification);
                }
            }
            debug!("Status slot closed, notifier exiting");
        })
    }

    /// Empty values are not shown.
    pub fn show(&self, text: String, now: Instant) -> Option<Notification> {
        if text.is_empty() {
            return None;
        }
        let notification = Notification::new(text, now);
        *self.lock() = Some(notification.clone());
        Some(notification)
    }

    pub fn current(&self) -> Option<Notification> {
        self.current_at(Instant::now())
    }

    pub fn current_at(&self, now: Instant) -> Option<Notification> {
        let mut current = self.lock();
        if current.as_ref().is_some_and(|n| n.is_expired(now, self.duration)) {
            *current = None;
        }
        current.clone()
    }

    /// Dismisses the showing notification. Returns whether there was one.
    pub fn acknowledge(&self) -> bool {
        self.lock().take().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Notification>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn render(notification: &Notification) {
    let mut stdout = io::stdout();
    let _ = write!(stdout, "\r\n[notice] {}   [Ok]\r\n>>> ", notification.text);
    let _ = stdout.flush();
}
