//! Glue between the transport layer and the core state machines.
//!
//! The engine owns the API client, the batch coordinator, and a registry of
//! active per-paper streams. Everything it learns is forwarded as
//! [`EngineEvent`]s over an unbounded channel; the owning UI applies them to
//! its own [`crate::session::PaperSession`]s and [`crate::store::PaperStore`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use paperwatch_api::{ApiClient, FetchEvent, Paper, ProcessEvent};

use crate::coordinator::{BatchCoordinator, SessionLauncher, MAX_CONCURRENT};

/// Events flowing from the engine to the owning UI.
#[derive(Debug)]
pub enum EngineEvent {
    /// A client-side batch was seeded with this many papers.
    BatchStarted { total: usize },
    /// A stream event for one paper's active session.
    Session { paper_id: i64, event: ProcessEvent },
    /// The stream died at the transport level (no `error` event arrived).
    SessionFailed {
        paper_id: i64,
        kind: String,
        message: String,
    },
    /// The session's task finished; `success` means the stream reached `done`.
    SessionClosed { paper_id: i64, success: bool },
    /// Authoritative record refetched after a completed stream (point-update).
    PaperRefreshed { paper: Box<Paper> },
    /// Queue and in-flight set both drained. The UI should reload the store.
    BatchComplete,
    /// Progress of the arXiv fetch stream.
    Fetch(FetchEvent),
    /// The fetch stream died at the transport level.
    FetchFailed { message: String },
}

/// Launches admitted papers by spawning their stream tasks.
struct BatchLauncher {
    engine: Weak<Engine>,
}

impl SessionLauncher for BatchLauncher {
    fn launch(&self, paper_id: i64) {
        if let Some(engine) = self.engine.upgrade() {
            engine.spawn_session(paper_id, true);
        }
    }
}

pub struct Engine {
    api: ApiClient,
    events: mpsc::UnboundedSender<EngineEvent>,
    coordinator: BatchCoordinator,
    /// Active sessions keyed by paper id; presence is the
    /// at-most-one-session-per-paper guard, the value aborts the stream.
    sessions: DashMap<i64, CancellationToken>,
    cancel: CancellationToken,
    fetching: AtomicBool,
}

impl Engine {
    pub fn new(api: ApiClient, events: mpsc::UnboundedSender<EngineEvent>) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Engine>| {
            let launcher = Arc::new(BatchLauncher {
                engine: weak.clone(),
            });
            let complete_tx = events.clone();
            let coordinator = BatchCoordinator::new(
                MAX_CONCURRENT,
                launcher,
                Arc::new(move || {
                    let _ = complete_tx.send(EngineEvent::BatchComplete);
                }),
            );
            Engine {
                api,
                events,
                coordinator,
                sessions: DashMap::new(),
                cancel: CancellationToken::new(),
                fetching: AtomicBool::new(false),
            }
        })
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn is_batch_running(&self) -> bool {
        self.coordinator.is_running()
    }

    /// (queued, in-flight) for display.
    pub fn batch_snapshot(&self) -> (usize, usize) {
        self.coordinator.snapshot()
    }

    /// Start a client-side batch over the given papers. No-op while a batch
    /// is already running or when there is nothing to do.
    pub fn start_batch(self: &Arc<Self>, ids: Vec<i64>) -> bool {
        if ids.is_empty() || self.coordinator.is_running() {
            return false;
        }
        let _ = self.events.send(EngineEvent::BatchStarted { total: ids.len() });
        self.coordinator.start_batch(ids)
    }

    /// Re-enter one failed/pending paper. Ignored while that paper already
    /// has an active stream.
    pub fn retry_paper(self: &Arc<Self>, paper_id: i64) {
        self.spawn_session(paper_id, false);
    }

    /// Recovery scan entry point: batch the papers a previous session left
    /// mid-processing. No-op when a batch is running or the list is empty.
    pub fn recover_stuck(self: &Arc<Self>, ids: Vec<i64>) -> bool {
        if ids.is_empty() {
            return false;
        }
        log::info!("recovering {} paper(s) stuck in processing", ids.len());
        self.start_batch(ids)
    }

    /// Abort one paper's stream. State is left as-is; the paper becomes
    /// retry-eligible.
    pub fn abort_paper(&self, paper_id: i64) {
        if let Some(entry) = self.sessions.get(&paper_id) {
            entry.value().cancel();
        }
    }

    /// Abort every stream this engine ever started (shutdown path).
    pub fn abort_all(&self) {
        self.cancel.cancel();
    }

    /// Consume the arXiv fetch stream; at most one at a time. When new papers
    /// were saved, the pending listing is re-read (the server resets stuck
    /// rows there) and a client-side batch starts over it.
    pub fn start_fetch(self: &Arc<Self>) -> bool {
        if self.fetching.swap(true, Ordering::SeqCst) {
            return false;
        }
        let engine = Arc::clone(self);
        tokio::spawn(async move { engine.run_fetch().await });
        true
    }

    fn spawn_session(self: &Arc<Self>, paper_id: i64, from_batch: bool) {
        use dashmap::mapref::entry::Entry;

        let token = self.cancel.child_token();
        match self.sessions.entry(paper_id) {
            Entry::Occupied(_) => {
                // Already streaming. A manual retry is silently dropped; an
                // admission from the coordinator must still free its slot.
                log::debug!("paper {paper_id}: session already active, ignoring start");
                if from_batch {
                    self.coordinator.on_session_done(paper_id, false);
                }
                return;
            }
            Entry::Vacant(vacant) => {
                vacant.insert(token.clone());
            }
        }
        let engine = Arc::clone(self);
        tokio::spawn(async move { engine.run_session(paper_id, token, from_batch).await });
    }

    async fn run_session(
        self: Arc<Self>,
        paper_id: i64,
        cancel: CancellationToken,
        from_batch: bool,
    ) {
        log::debug!("paper {paper_id}: analysis stream opening");
        let events = self.events.clone();
        let mut completed = false;
        let result = self
            .api
            .process_stream(paper_id, &cancel, |event| {
                if matches!(event, ProcessEvent::Done) {
                    completed = true;
                }
                let _ = events.send(EngineEvent::Session { paper_id, event });
            })
            .await;

        let mut success = completed;
        if let Err(err) = &result {
            log::warn!("paper {paper_id}: stream failed: {err}");
            let _ = self.events.send(EngineEvent::SessionFailed {
                paper_id,
                kind: err.kind(),
                message: err.to_string(),
            });
            success = false;
        }

        if completed {
            // Point-update: fetch the authoritative record the stream just
            // finished writing.
            match self.api.get_paper(paper_id).await {
                Ok(paper) => {
                    let _ = self.events.send(EngineEvent::PaperRefreshed {
                        paper: Box::new(paper),
                    });
                }
                Err(err) => log::warn!("paper {paper_id}: point-update fetch failed: {err}"),
            }
        }

        self.sessions.remove(&paper_id);
        let _ = self
            .events
            .send(EngineEvent::SessionClosed { paper_id, success });
        if from_batch {
            self.coordinator.on_session_done(paper_id, success);
        }
    }

    async fn run_fetch(self: Arc<Self>) {
        let events = self.events.clone();
        let cancel = self.cancel.child_token();
        let mut saved = 0u64;
        let result = self
            .api
            .fetch_stream(&cancel, |event| {
                if let FetchEvent::Done { saved: count, .. } = &event {
                    saved = *count;
                }
                let _ = events.send(EngineEvent::Fetch(event));
            })
            .await;
        self.fetching.store(false, Ordering::SeqCst);

        if let Err(err) = result {
            let _ = self.events.send(EngineEvent::FetchFailed {
                message: err.to_string(),
            });
            return;
        }
        if saved > 0 {
            match self.api.pending_ids().await {
                Ok(ids) if !ids.is_empty() => {
                    self.start_batch(ids);
                }
                Ok(_) => {}
                Err(err) => log::warn!("pending listing failed after fetch: {err}"),
            }
        }
    }
}
