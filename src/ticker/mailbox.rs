//! Single-slot coalescing queue

use std::sync::Mutex;
use tokio::sync::Notify;

/// Outcome of a [`Mailbox::push`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Slot was empty
    Stored,
    /// An undelivered value was dropped in favour of the new one
    Replaced,
}

/// Bounded queue of capacity one where the newest value wins
///
/// `push` never waits: when the slot is occupied the stale value is
/// dropped and replaced. `pop` waits for a value.
#[derive(Debug)]
pub struct Mailbox<T> {
    slot: Mutex<Option<T>>,
    notify: Notify,
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            notify: Notify::new(),
        }
    }

    /// Store `value`, replacing any value not yet taken
    pub fn push(&self, value: T) -> Delivery {
        let replaced = {
            let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
            slot.replace(value).is_some()
        };
        self.notify.notify_one();
        if replaced {
            Delivery::Replaced
        } else {
            Delivery::Stored
        }
    }

    /// Take the pending value, if any
    pub fn try_pop(&self) -> Option<T> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    /// Wait for the next value
    pub async fn pop(&self) -> T {
        loop {
            if let Some(value) = self.try_pop() {
                return value;
            }
            self.notify.notified().await;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).is_none()
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}
