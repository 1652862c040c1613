/// Actions the TUI can process, mapped from keyboard input or internal events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    NavigateBack,
    DrillIn,
    MoveUp,
    MoveDown,
    PageUp,
    PageDown,
    GoTop,
    GoBottom,
    ToggleHelp,
    /// Re-enter analysis for the selected paper.
    Retry,
    /// Stream a fresh arXiv fetch.
    Fetch,
    /// Batch-process everything the server reports as pending.
    Batch,
    /// Delete the selected paper.
    Delete,
    /// Reload the paper list and stats from the server.
    Reload,
    Tick,
    Resize(u16, u16),
    None,
}
