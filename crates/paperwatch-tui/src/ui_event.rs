use paperwatch_api::{Paper, Stats};

/// Events produced by background I/O tasks the TUI itself spawns (initial
/// load, reloads, deletes). Engine traffic arrives on its own channel.
#[derive(Debug)]
pub enum UiEvent {
    /// Paper list and stats loaded (initial load or full reload).
    Loaded {
        papers: Vec<Paper>,
        stats: Stats,
    },
    LoadFailed {
        message: String,
    },
    /// Server confirmed the delete; remove locally.
    Deleted {
        paper_id: i64,
    },
    DeleteFailed {
        paper_id: i64,
        message: String,
    },
    /// One-line status information for the footer.
    Info {
        message: String,
    },
}
