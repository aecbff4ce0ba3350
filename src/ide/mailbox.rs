//! Single-slot mailbox with overwrite-on-post semantics.

use parking_lot::{Condvar, Mutex};
use tokio_util::sync::CancellationToken;

/// Holds at most one pending value. Posting replaces whatever is waiting, so
/// a slow consumer only ever sees the latest request.
///
/// Cancelling wakes every blocked [`Mailbox::take`] and makes it return
/// `None` from then on.
pub struct Mailbox<T> {
    slot: Mutex<Option<T>>,
    ready: Condvar,
    cancel: CancellationToken,
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Mailbox<T> {
    /// An empty, live mailbox.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            ready: Condvar::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Store `value`, returning the pending value it displaced.
    pub fn post(&self, value: T) -> Option<T> {
        let mut slot = self.slot.lock();
        let displaced = slot.replace(value);
        self.ready.notify_one();
        displaced
    }

    /// Block until a value is posted or the mailbox is cancelled.
    pub fn take(&self) -> Option<T> {
        let mut slot = self.slot.lock();
        loop {
            if self.cancel.is_cancelled() {
                return None;
            }
            if let Some(value) = slot.take() {
                return Some(value);
            }
            self.ready.wait(&mut slot);
        }
    }

    /// Take the pending value without blocking.
    pub fn try_take(&self) -> Option<T> {
        if self.cancel.is_cancelled() {
            return None;
        }
        self.slot.lock().take()
    }

    /// A newer value is waiting.
    pub fn has_pending(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Cancel for good and wake every blocked `take`.
    pub fn cancel(&self) {
        self.cancel.cancel();
        let _slot = self.slot.lock();
        self.ready.notify_all();
    }

    /// Whether [`Mailbox::cancel`] was called.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token cancelled together with the mailbox.
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_post_overwrites_pending_value() {
        let mailbox = Mailbox::new();
        assert_eq!(mailbox.post(1), None);
        assert_eq!(mailbox.post(2), Some(1));
        assert!(mailbox.has_pending());
        assert_eq!(mailbox.take(), Some(2));
        assert!(!mailbox.has_pending());
        assert_eq!(mailbox.try_take(), None);
    }

    #[test]
    fn test_cancel_wakes_blocked_taker() {
        let mailbox: Arc<Mailbox<u32>> = Arc::new(Mailbox::new());
        let taker = {
            let mailbox = mailbox.clone();
            thread::spawn(move || mailbox.take())
        };
        thread::sleep(Duration::from_millis(20));
        mailbox.cancel();
        assert_eq!(taker.join().unwrap(), None);
        mailbox.post(3);
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn test_take_blocks_until_post() {
        let mailbox: Arc<Mailbox<&'static str>> = Arc::new(Mailbox::new());
        let taker = {
            let mailbox = mailbox.clone();
            thread::spawn(move || mailbox.take())
        };
        thread::sleep(Duration::from_millis(20));
        mailbox.post("go");
        assert_eq!(taker.join().unwrap(), Some("go"));
    }
}
