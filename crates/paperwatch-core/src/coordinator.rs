//! Bounded-concurrency batch coordinator.
//!
//! The coordinator owns two structures: the FIFO queue of papers waiting for
//! a slot and the set of papers currently streaming. Both are only ever
//! touched inside [`BatchCoordinator::admit_next`] and
//! [`BatchCoordinator::on_session_done`], under the state lock and with no
//! suspension point in between — session completions arrive from independent
//! tasks in any order, including near-simultaneously, and must never observe
//! a half-applied mutation.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

/// Concurrent analysis streams per batch. Matches the server-side batcher.
pub const MAX_CONCURRENT: usize = 3;

/// Fire-and-forget session start. The coordinator never awaits a session;
/// completion is reported back via [`BatchCoordinator::on_session_done`].
pub trait SessionLauncher: Send + Sync {
    fn launch(&self, paper_id: i64);
}

#[derive(Debug, Default)]
struct BatchState {
    queue: VecDeque<i64>,
    in_flight: HashSet<i64>,
    running: bool,
}

pub struct BatchCoordinator {
    state: Mutex<BatchState>,
    limit: usize,
    launcher: Arc<dyn SessionLauncher>,
    on_complete: Arc<dyn Fn() + Send + Sync>,
}

impl BatchCoordinator {
    pub fn new(
        limit: usize,
        launcher: Arc<dyn SessionLauncher>,
        on_complete: Arc<dyn Fn() + Send + Sync>,
    ) -> Self {
        Self {
            state: Mutex::new(BatchState::default()),
            limit: limit.max(1),
            launcher,
            on_complete,
        }
    }

    /// Seed the queue and start admitting. Rejected (returns `false`) while a
    /// batch is already running; duplicate IDs are dropped, order preserved.
    pub fn start_batch(&self, ids: Vec<i64>) -> bool {
        {
            let Ok(mut state) = self.state.lock() else {
                return false;
            };
            if state.running {
                return false;
            }
            state.running = true;
            state.in_flight.clear();
            state.queue.clear();
            let mut seen = HashSet::new();
            for id in ids {
                if seen.insert(id) {
                    state.queue.push_back(id);
                }
            }
        }
        self.admit_next();
        true
    }

    /// A session ended, successfully or not — both free the slot. Failed
    /// papers are not retried within the same batch. Safe to call redundantly.
    pub fn on_session_done(&self, paper_id: i64, success: bool) {
        {
            let Ok(mut state) = self.state.lock() else {
                return;
            };
            if !state.running {
                return;
            }
            if !state.in_flight.remove(&paper_id) {
                return;
            }
            log::debug!(
                "paper {paper_id}: batch slot freed (success={success}), {} queued",
                state.queue.len()
            );
        }
        self.admit_next();
    }

    /// Fill free slots from the queue head. When both structures are empty
    /// the batch is complete: clear the running flag and notify once.
    fn admit_next(&self) {
        let mut to_launch = Vec::new();
        let mut completed = false;
        {
            let Ok(mut state) = self.state.lock() else {
                return;
            };
            if !state.running {
                return;
            }
            while state.in_flight.len() < self.limit {
                let Some(id) = state.queue.pop_front() else {
                    break;
                };
                if state.in_flight.insert(id) {
                    to_launch.push(id);
                }
            }
            if state.in_flight.is_empty() && state.queue.is_empty() {
                state.running = false;
                completed = true;
            }
        }
        for id in to_launch {
            self.launcher.launch(id);
        }
        if completed {
            (self.on_complete)();
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().map(|s| s.running).unwrap_or(false)
    }

    /// (queued, in-flight) sizes for display.
    pub fn snapshot(&self) -> (usize, usize) {
        self.state
            .lock()
            .map(|s| (s.queue.len(), s.in_flight.len()))
            .unwrap_or((0, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records launches without starting anything; completions are driven by
    /// the test, in whatever order it wants.
    #[derive(Default)]
    struct RecordingLauncher {
        launched: Mutex<Vec<i64>>,
    }

    impl SessionLauncher for RecordingLauncher {
        fn launch(&self, paper_id: i64) {
            self.launched.lock().unwrap().push(paper_id);
        }
    }

    fn coordinator(
        limit: usize,
    ) -> (
        Arc<BatchCoordinator>,
        Arc<RecordingLauncher>,
        Arc<AtomicUsize>,
    ) {
        let launcher = Arc::new(RecordingLauncher::default());
        let completions = Arc::new(AtomicUsize::new(0));
        let completions_cb = completions.clone();
        let coordinator = Arc::new(BatchCoordinator::new(
            limit,
            launcher.clone(),
            Arc::new(move || {
                completions_cb.fetch_add(1, Ordering::SeqCst);
            }),
        ));
        (coordinator, launcher, completions)
    }

    #[test]
    fn admits_up_to_limit_in_fifo_order() {
        let (coordinator, launcher, _) = coordinator(3);
        assert!(coordinator.start_batch(vec![10, 20, 30, 40, 50]));
        assert_eq!(*launcher.launched.lock().unwrap(), vec![10, 20, 30]);
        assert_eq!(coordinator.snapshot(), (2, 3));
    }

    #[test]
    fn completion_frees_slot_and_admits_next() {
        let (coordinator, launcher, _) = coordinator(3);
        coordinator.start_batch(vec![1, 2, 3, 4]);
        coordinator.on_session_done(2, true);
        assert_eq!(*launcher.launched.lock().unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(coordinator.snapshot(), (0, 3));
    }

    #[test]
    fn failure_also_frees_slot() {
        let (coordinator, launcher, _) = coordinator(1);
        coordinator.start_batch(vec![1, 2]);
        coordinator.on_session_done(1, false);
        assert_eq!(*launcher.launched.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn in_flight_never_exceeds_limit_for_any_completion_order() {
        // Exercise several completion orders; the in-flight count is checked
        // after every transition.
        let orders: Vec<Vec<i64>> = vec![
            vec![1, 2, 3, 4, 5, 6, 7],
            vec![3, 2, 1, 6, 5, 4, 7],
            vec![3, 1, 2, 4, 6, 5, 7],
        ];
        for order in orders {
            let (coordinator, launcher, _) = coordinator(3);
            coordinator.start_batch(vec![1, 2, 3, 4, 5, 6, 7]);
            for id in order {
                let (_, in_flight) = coordinator.snapshot();
                assert!(in_flight <= 3, "limit exceeded: {in_flight}");
                coordinator.on_session_done(id, true);
            }
            assert_eq!(launcher.launched.lock().unwrap().len(), 7);
            assert!(!coordinator.is_running());
        }
    }

    #[test]
    fn every_id_is_admitted_exactly_once() {
        let (coordinator, launcher, _) = coordinator(2);
        coordinator.start_batch(vec![5, 6, 7, 8]);
        coordinator.on_session_done(5, true);
        coordinator.on_session_done(6, false);
        coordinator.on_session_done(7, true);
        coordinator.on_session_done(8, true);
        let launched = launcher.launched.lock().unwrap().clone();
        assert_eq!(launched, vec![5, 6, 7, 8]);
    }

    #[test]
    fn duplicate_ids_are_admitted_once() {
        let (coordinator, launcher, _) = coordinator(2);
        coordinator.start_batch(vec![1, 1, 2, 1]);
        coordinator.on_session_done(1, true);
        coordinator.on_session_done(2, true);
        assert_eq!(*launcher.launched.lock().unwrap(), vec![1, 2]);
        assert!(!coordinator.is_running());
    }

    #[test]
    fn start_while_running_is_rejected() {
        let (coordinator, launcher, _) = coordinator(3);
        assert!(coordinator.start_batch(vec![1, 2]));
        assert!(!coordinator.start_batch(vec![9, 10]));
        assert_eq!(*launcher.launched.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn redundant_completion_does_not_corrupt_state() {
        let (coordinator, launcher, _) = coordinator(1);
        coordinator.start_batch(vec![1, 2, 3]);
        coordinator.on_session_done(1, true);
        // Stale duplicate completion for 1: must not free 2's slot.
        coordinator.on_session_done(1, true);
        assert_eq!(*launcher.launched.lock().unwrap(), vec![1, 2]);
        assert_eq!(coordinator.snapshot(), (1, 1));
    }

    #[test]
    fn batch_completes_when_queue_and_in_flight_drain() {
        let (coordinator, _, completions) = coordinator(3);
        coordinator.start_batch(vec![1, 2]);
        coordinator.on_session_done(1, true);
        assert_eq!(completions.load(Ordering::SeqCst), 0);
        coordinator.on_session_done(2, false);
        assert_eq!(completions.load(Ordering::SeqCst), 1);
        assert!(!coordinator.is_running());
        // A late stray completion fires nothing further.
        coordinator.on_session_done(2, false);
        assert_eq!(completions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_batch_completes_immediately() {
        let (coordinator, launcher, completions) = coordinator(3);
        assert!(coordinator.start_batch(Vec::new()));
        assert!(launcher.launched.lock().unwrap().is_empty());
        assert_eq!(completions.load(Ordering::SeqCst), 1);
        assert!(!coordinator.is_running());
    }

    #[test]
    fn a_new_batch_can_start_after_completion() {
        let (coordinator, launcher, _) = coordinator(3);
        coordinator.start_batch(vec![1]);
        coordinator.on_session_done(1, true);
        assert!(coordinator.start_batch(vec![2]));
        assert_eq!(*launcher.launched.lock().unwrap(), vec![1, 2]);
    }
}
