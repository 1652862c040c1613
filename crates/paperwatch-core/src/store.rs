//! Shared, ordered in-memory paper list.
//!
//! The server is the system of record; this store is the client cache. Point
//! updates overwrite a record in place without moving it — rendering is
//! position-dependent, so an update must never re-sort the list.

use paperwatch_api::{Paper, Stats};

#[derive(Debug, Default)]
pub struct PaperStore {
    papers: Vec<Paper>,
    stats: Stats,
}

impl PaperStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole list (initial load and the end-of-batch backstop).
    pub fn reload(&mut self, papers: Vec<Paper>) {
        self.papers = papers;
    }

    pub fn set_stats(&mut self, stats: Stats) {
        self.stats = stats;
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn papers(&self) -> &[Paper] {
        &self.papers
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&Paper> {
        self.papers.iter().find(|p| p.id == id)
    }

    pub fn position(&self, id: i64) -> Option<usize> {
        self.papers.iter().position(|p| p.id == id)
    }

    /// Overwrite the record at its current index, preserving list order.
    /// No-op (returns `false`) when the paper is no longer in the list.
    pub fn point_update(&mut self, fresh: Paper) -> bool {
        match self.position(fresh.id) {
            Some(idx) => {
                self.papers[idx] = fresh;
                true
            }
            None => false,
        }
    }

    /// Delete by id, adjusting cached counters without waiting for a stats
    /// refetch. Counters clamp at zero.
    pub fn remove(&mut self, id: i64) -> bool {
        let Some(idx) = self.position(id) else {
            return false;
        };
        let removed = self.papers.remove(idx);
        self.stats.total_papers = self.stats.total_papers.saturating_sub(1);
        if removed.is_processed {
            self.stats.processed_papers = self.stats.processed_papers.saturating_sub(1);
        } else {
            self.stats.pending_processing = self.stats.pending_processing.saturating_sub(1);
        }
        if removed.is_high_relevance() {
            self.stats.high_relevance_papers = self.stats.high_relevance_papers.saturating_sub(1);
        }
        true
    }

    /// Papers left mid-analysis by a dead session (crash/reload): stream
    /// state is gone client-side, so they need to re-enter a batch.
    pub fn recovery_candidates(&self) -> Vec<i64> {
        self.papers
            .iter()
            .filter(|p| p.is_stuck())
            .map(|p| p.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::{BatchCoordinator, SessionLauncher};
    use std::sync::{Arc, Mutex};

    fn paper(id: i64, status: &str, is_processed: bool, score: Option<u8>) -> Paper {
        let mut body = serde_json::json!({
            "id": id,
            "arxiv_id": format!("2501.0000{id}"),
            "title": format!("Paper {id}"),
            "authors": "A. Author",
            "abstract": "…",
            "categories": "cs.LG",
            "published": "2025-01-03T12:00:00",
            "updated": "2025-01-03T12:00:00",
            "pdf_url": "https://arxiv.org/pdf/x",
            "processing_status": status,
            "is_processed": is_processed,
            "created_at": "2025-01-05T00:00:00"
        });
        if let Some(score) = score {
            body["relevance_score"] = score.into();
        }
        serde_json::from_value(body).unwrap()
    }

    fn store_with(papers: Vec<Paper>) -> PaperStore {
        let mut store = PaperStore::new();
        store.reload(papers);
        store
    }

    #[test]
    fn point_update_preserves_position() {
        let mut store = store_with(vec![
            paper(1, "done", true, Some(7)),
            paper(2, "processing", false, None),
            paper(3, "pending", false, None),
        ]);
        let before: Vec<i64> = store.papers().iter().map(|p| p.id).collect();

        let mut fresh = paper(2, "done", true, Some(9));
        fresh.title = "Updated".into();
        assert!(store.point_update(fresh));

        let after: Vec<i64> = store.papers().iter().map(|p| p.id).collect();
        assert_eq!(before, after, "order unchanged");
        assert_eq!(store.papers()[1].title, "Updated");
    }

    #[test]
    fn point_update_for_missing_id_is_a_no_op() {
        let mut store = store_with(vec![paper(1, "pending", false, None)]);
        assert!(!store.point_update(paper(42, "done", true, None)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_decrements_counters_defensively() {
        let mut store = store_with(vec![
            paper(1, "done", true, Some(9)),
            paper(2, "pending", false, None),
        ]);
        store.set_stats(Stats {
            total_papers: 2,
            processed_papers: 1,
            high_relevance_papers: 1,
            pending_processing: 1,
        });

        assert!(store.remove(1));
        let stats = store.stats();
        assert_eq!(stats.total_papers, 1);
        assert_eq!(stats.processed_papers, 0);
        assert_eq!(stats.high_relevance_papers, 0);
        assert_eq!(stats.pending_processing, 1);
    }

    #[test]
    fn remove_clamps_counters_at_zero() {
        let mut store = store_with(vec![paper(1, "done", true, Some(10))]);
        // Stats never loaded: all counters are zero already.
        assert!(store.remove(1));
        let stats = store.stats();
        assert_eq!(stats.total_papers, 0);
        assert_eq!(stats.processed_papers, 0);
        assert_eq!(stats.high_relevance_papers, 0);
    }

    #[test]
    fn remove_missing_id_is_a_no_op() {
        let mut store = store_with(vec![paper(1, "pending", false, None)]);
        assert!(!store.remove(9));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn recovery_scan_finds_only_stuck_papers() {
        let store = store_with(vec![
            paper(1, "processing", false, None), // stuck
            paper(2, "processing", true, None),  // already processed, not stuck
            paper(3, "pending", false, None),
            paper(4, "failed", false, None),
        ]);
        assert_eq!(store.recovery_candidates(), vec![1]);
    }

    #[test]
    fn recovery_candidates_feed_a_batch_with_exactly_those_ids() {
        #[derive(Default)]
        struct Recorder(Mutex<Vec<i64>>);
        impl SessionLauncher for Recorder {
            fn launch(&self, paper_id: i64) {
                self.0.lock().unwrap().push(paper_id);
            }
        }

        let store = store_with(vec![
            paper(1, "processing", false, None),
            paper(2, "done", true, Some(5)),
        ]);
        let launcher = Arc::new(Recorder::default());
        let coordinator = BatchCoordinator::new(3, launcher.clone(), Arc::new(|| {}));

        let candidates = store.recovery_candidates();
        assert!(!coordinator.is_running());
        assert!(coordinator.start_batch(candidates));
        assert_eq!(*launcher.0.lock().unwrap(), vec![1]);
    }
}
