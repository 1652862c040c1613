//! Background I/O tasks owned by the TUI.
//!
//! Each helper spawns a task that performs the HTTP call and reports back
//! over the UI event channel; nothing here blocks the draw loop.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use paperwatch_api::{ApiClient, PaperQuery};
use paperwatch_core::Engine;

use crate::ui_event::UiEvent;

/// Load the paper list and stats together (initial load and full reloads).
pub fn spawn_load(api: ApiClient, query: PaperQuery, tx: UnboundedSender<UiEvent>) {
    tokio::spawn(async move {
        let papers = api.list_papers(&query).await;
        let stats = api.stats().await;
        match (papers, stats) {
            (Ok(papers), Ok(stats)) => {
                let _ = tx.send(UiEvent::Loaded { papers, stats });
            }
            (Err(err), _) | (_, Err(err)) => {
                let _ = tx.send(UiEvent::LoadFailed {
                    message: err.to_string(),
                });
            }
        }
    });
}

pub fn spawn_delete(api: ApiClient, paper_id: i64, tx: UnboundedSender<UiEvent>) {
    tokio::spawn(async move {
        match api.delete_paper(paper_id).await {
            Ok(()) => {
                let _ = tx.send(UiEvent::Deleted { paper_id });
            }
            Err(err) => {
                let _ = tx.send(UiEvent::DeleteFailed {
                    paper_id,
                    message: err.to_string(),
                });
            }
        }
    });
}

/// Read the server's pending listing (which also resets stuck rows) and feed
/// it to the client-side batch coordinator.
pub fn spawn_batch_pending(engine: Arc<Engine>, tx: UnboundedSender<UiEvent>) {
    tokio::spawn(async move {
        match engine.api().pending_ids().await {
            Ok(ids) if ids.is_empty() => {
                let _ = tx.send(UiEvent::Info {
                    message: "No papers pending processing".to_string(),
                });
            }
            Ok(ids) => {
                if !engine.start_batch(ids) {
                    let _ = tx.send(UiEvent::Info {
                        message: "A batch is already running".to_string(),
                    });
                }
            }
            Err(err) => {
                let _ = tx.send(UiEvent::Info {
                    message: format!("Pending listing failed: {err}"),
                });
            }
        }
    });
}
