//! Background semantic highlighter.
//!
//! One thread per editor. Requests go through a [`Mailbox`], so a burst of
//! keystrokes collapses into a single computation of the latest text. Results
//! are published on a channel; the consumer compares the published revision
//! with its own and drops anything stale.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use tracing::{debug, trace};

use super::mailbox::Mailbox;
use super::semantic_info::{SemanticInfo, SemanticInfoSource};
use crate::base::Position;
use crate::hir::{LocalSymbols, LookupContext, function_at};
use crate::project::{ModelError, Result, SourceCache};

/// Handle to the worker thread.
pub struct SemanticHighlighter {
    shared: Arc<Shared>,
    results: Receiver<SemanticInfo>,
    thread: Option<JoinHandle<()>>,
}

struct Shared {
    cache: Arc<SourceCache>,
    mailbox: Mailbox<SemanticInfoSource>,
    /// The last published result; reused when the revision has not moved.
    last: Mutex<Option<SemanticInfo>>,
    computations: AtomicUsize,
    parses: AtomicUsize,
}

impl SemanticHighlighter {
    /// Spawn the worker thread.
    pub fn start(cache: Arc<SourceCache>) -> Result<Self> {
        let name = cache.config().worker_thread_name.clone();
        let stack_size = cache.config().worker_stack_size;
        let shared = Arc::new(Shared {
            cache,
            mailbox: Mailbox::new(),
            last: Mutex::new(None),
            computations: AtomicUsize::new(0),
            parses: AtomicUsize::new(0),
        });
        let (sender, results) = unbounded();
        let worker = shared.clone();
        let thread = std::thread::Builder::new()
            .name(name.clone())
            .stack_size(stack_size)
            .spawn(move || worker.run(sender))
            .map_err(ModelError::Spawn)?;
        debug!(thread = %name, "semantic highlighter started");
        Ok(Self {
            shared,
            results,
            thread: Some(thread),
        })
    }

    /// Queue `source`, replacing any request that has not been picked up.
    pub fn rehighlight(&self, source: SemanticInfoSource) -> Result<()> {
        if self.shared.mailbox.is_cancelled() {
            return Err(ModelError::WorkerShutdown);
        }
        if let Some(dropped) = self.shared.mailbox.post(source) {
            trace!(revision = dropped.revision, "collapsed pending highlight request");
        }
        Ok(())
    }

    /// Published results, oldest first.
    pub fn results(&self) -> &Receiver<SemanticInfo> {
        &self.results
    }

    /// Compute synchronously on the calling thread without publishing.
    pub fn semantic_info(&self, source: &SemanticInfoSource) -> SemanticInfo {
        self.shared.compute(source)
    }

    /// Number of computations the worker has started.
    pub fn computations(&self) -> usize {
        self.shared.computations.load(Ordering::Acquire)
    }

    /// Number of times a document was parsed instead of reused.
    pub fn parses(&self) -> usize {
        self.shared.parses.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        !self.shared.mailbox.is_cancelled()
    }

    /// Stop the worker. Nothing is published after this returns.
    pub fn abort(&mut self) {
        self.shared.mailbox.cancel();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                debug!("semantic highlighter panicked");
            }
            debug!("semantic highlighter stopped");
        }
    }
}

impl Drop for SemanticHighlighter {
    fn drop(&mut self) {
        self.abort();
    }
}

impl Shared {
    fn run(&self, sender: Sender<SemanticInfo>) {
        while let Some(source) = self.mailbox.take() {
            if self.is_outdated() {
                trace!(revision = source.revision, "highlight request superseded before start");
                continue;
            }
            self.computations.fetch_add(1, Ordering::AcqRel);
            let Some(info) = self.compute_checked(&source) else {
                trace!(revision = source.revision, "discarded stale highlight");
                continue;
            };
            *self.last.lock() = Some(info.clone());
            if sender.send(info).is_err() {
                break;
            }
        }
        trace!("semantic highlighter loop finished");
    }

    /// A newer request is waiting or the worker is shutting down.
    fn is_outdated(&self) -> bool {
        self.mailbox.has_pending() || self.mailbox.is_cancelled()
    }

    fn compute(&self, source: &SemanticInfoSource) -> SemanticInfo {
        self.compute_inner(source, false).unwrap_or_else(|| SemanticInfo::empty(source.path.clone()))
    }

    fn compute_checked(&self, source: &SemanticInfoSource) -> Option<SemanticInfo> {
        self.compute_inner(source, true)
    }

    fn compute_inner(&self, source: &SemanticInfoSource, checked: bool) -> Option<SemanticInfo> {
        let reusable = if source.force {
            None
        } else {
            self.last
                .lock()
                .as_ref()
                .filter(|last| last.revision == source.revision && last.path == source.path)
                .and_then(|last| {
                    let document = last.document.clone()?;
                    Some((last.snapshot.clone(), document, last.diagnostics.clone()))
                })
        };

        let (snapshot, document, diagnostics) = match reusable {
            Some(cached) => cached,
            None => {
                self.parses.fetch_add(1, Ordering::AcqRel);
                let predefined = &self.cache.config().predefined_macros;
                let preprocessed = source
                    .snapshot
                    .preprocessed_code(&source.text, &source.path, predefined);
                let document = Arc::new(
                    source
                        .snapshot
                        .document_from_source(preprocessed, source.revision),
                );
                let diagnostics = document.diagnostics().to_vec();
                (source.snapshot.insert(document.clone()), document, diagnostics)
            }
        };
        if checked && self.is_outdated() {
            return None;
        }

        let context = LookupContext::new(document.clone(), &snapshot);
        let position = Position::new(source.line, source.column);
        let table = function_at(document.translation_unit(), position)
            .map(|function| LocalSymbols::new(&context, function))
            .unwrap_or_default();
        if checked && self.is_outdated() {
            return None;
        }

        Some(SemanticInfo {
            revision: source.revision,
            path: source.path.clone(),
            snapshot,
            document: Some(document),
            local_uses: table.uses,
            has_q: table.has_q,
            has_d: table.has_d,
            forced: source.force,
            diagnostics,
        })
    }
}
