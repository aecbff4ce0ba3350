//! Transient background searches where only the latest request counts.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::references::Usage;

/// Result of one search, tagged with the sequence number of its request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub sequence: u64,
    pub usages: Vec<Usage>,
}

/// Runs searches on the rayon pool. Starting a search cancels the previous
/// one; a cancelled search never delivers.
pub struct UsageSearch {
    sequence: AtomicU64,
    current: Mutex<CancellationToken>,
    sender: Sender<SearchResult>,
    receiver: Receiver<SearchResult>,
}

impl Default for UsageSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageSearch {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sequence: AtomicU64::new(0),
            current: Mutex::new(CancellationToken::new()),
            sender,
            receiver,
        }
    }

    /// Start `job` in the background and return its sequence number.
    pub fn start<F>(&self, job: F) -> u64
    where
        F: FnOnce(&CancellationToken) -> Vec<Usage> + Send + 'static,
    {
        let token = CancellationToken::new();
        let sequence = {
            let mut current = self.current.lock();
            current.cancel();
            *current = token.clone();
            self.sequence.fetch_add(1, Ordering::AcqRel) + 1
        };
        let sender = self.sender.clone();
        rayon::spawn(move || {
            let usages = job(&token);
            if token.is_cancelled() {
                trace!(sequence, "usage search superseded");
                return;
            }
            let _ = sender.send(SearchResult { sequence, usages });
        });
        sequence
    }

    /// Cancel whatever is running.
    pub fn cancel(&self) {
        self.current.lock().cancel();
    }

    /// Sequence number of the most recent request.
    pub fn latest(&self) -> u64 {
        self.sequence.load(Ordering::Acquire)
    }

    pub fn is_current(&self, result: &SearchResult) -> bool {
        result.sequence == self.latest()
    }

    pub fn results(&self) -> &Receiver<SearchResult> {
        &self.receiver
    }

    /// Wait for the result of the latest request, dropping stale ones.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<SearchResult> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            let result = self.receiver.recv_timeout(remaining).ok()?;
            if self.is_current(&result) {
                return Some(result);
            }
        }
    }
}
