use std::collections::HashMap;

use paperwatch_api::{FetchEvent, Paper};
use paperwatch_core::{EngineEvent, PaperSession, PaperStore, SessionPhase, StatusTag};

use crate::action::Action;
use crate::theme::Theme;
use crate::ui_event::UiEvent;

/// Which screen is currently displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Dashboard,
    Paper(i64), // paper id (ids survive reloads, indexes do not)
}

/// Main application state.
pub struct App {
    pub screen: Screen,
    pub store: PaperStore,
    /// Live/failed analysis sessions keyed by paper id.
    pub sessions: HashMap<i64, PaperSession>,
    pub cursor: usize,
    pub tick: usize,
    pub theme: Theme,
    pub should_quit: bool,
    pub show_help: bool,
    pub detail_scroll: u16,
    /// Height of the visible table area (set on resize, used for page up/down).
    pub visible_rows: usize,
    /// Transient one-line message for the footer.
    pub status: Option<String>,
    pub batch_running: bool,
    /// (queued, in-flight), refreshed from the engine each tick.
    pub batch_gauge: (usize, usize),
    /// Set when the store should be reloaded from the server (batch backstop).
    pub needs_reload: bool,
    pub initial_loaded: bool,
}

impl App {
    pub fn new() -> Self {
        Self {
            screen: Screen::Dashboard,
            store: PaperStore::new(),
            sessions: HashMap::new(),
            cursor: 0,
            tick: 0,
            theme: Theme::hacker(),
            should_quit: false,
            show_help: false,
            detail_scroll: 0,
            visible_rows: 20,
            status: None,
            batch_running: false,
            batch_gauge: (0, 0),
            needs_reload: false,
            initial_loaded: false,
        }
    }

    /// Paper the cursor (or detail screen) refers to.
    pub fn selected_paper_id(&self) -> Option<i64> {
        match &self.screen {
            Screen::Paper(id) => Some(*id),
            Screen::Dashboard => self.store.papers().get(self.cursor).map(|p| p.id),
        }
    }

    /// Display status for a paper: active stream > local overlay > server.
    pub fn status_tag(&self, paper: &Paper) -> StatusTag {
        self.sessions
            .get(&paper.id)
            .map(|s| s.status_tag(paper.processing_status))
            .unwrap_or_else(|| StatusTag::from_server(paper.processing_status))
    }

    /// Process a user action and update state. Returns true if the app should quit.
    pub fn update(&mut self, action: Action) -> bool {
        // When help overlay is shown, only allow a few actions through
        if self.show_help {
            match action {
                Action::Quit => {
                    self.should_quit = true;
                    return true;
                }
                Action::ToggleHelp | Action::NavigateBack => {
                    self.show_help = false;
                }
                Action::Tick => {
                    self.tick = self.tick.wrapping_add(1);
                }
                Action::Resize(_w, h) => {
                    self.visible_rows = (h as usize).saturating_sub(6);
                }
                _ => {} // swallow everything else
            }
            return false;
        }

        match action {
            Action::Quit => {
                self.should_quit = true;
                return true;
            }
            Action::ToggleHelp => {
                self.show_help = true;
            }
            Action::NavigateBack => {
                self.screen = Screen::Dashboard;
                self.detail_scroll = 0;
            }
            Action::DrillIn => {
                if self.screen == Screen::Dashboard {
                    if let Some(id) = self.selected_paper_id() {
                        self.detail_scroll = 0;
                        self.screen = Screen::Paper(id);
                    }
                }
            }
            Action::MoveDown => match &self.screen {
                Screen::Dashboard => {
                    if self.cursor + 1 < self.store.len() {
                        self.cursor += 1;
                    }
                }
                Screen::Paper(_) => {
                    self.detail_scroll = self.detail_scroll.saturating_add(1);
                }
            },
            Action::MoveUp => match &self.screen {
                Screen::Dashboard => {
                    self.cursor = self.cursor.saturating_sub(1);
                }
                Screen::Paper(_) => {
                    self.detail_scroll = self.detail_scroll.saturating_sub(1);
                }
            },
            Action::PageDown => {
                let page = self.visible_rows.max(1);
                match &self.screen {
                    Screen::Dashboard => {
                        self.cursor = (self.cursor + page).min(self.store.len().saturating_sub(1));
                    }
                    Screen::Paper(_) => {
                        self.detail_scroll = self.detail_scroll.saturating_add(page as u16);
                    }
                }
            }
            Action::PageUp => {
                let page = self.visible_rows.max(1);
                match &self.screen {
                    Screen::Dashboard => {
                        self.cursor = self.cursor.saturating_sub(page);
                    }
                    Screen::Paper(_) => {
                        self.detail_scroll = self.detail_scroll.saturating_sub(page as u16);
                    }
                }
            }
            Action::GoTop => match &self.screen {
                Screen::Dashboard => self.cursor = 0,
                Screen::Paper(_) => self.detail_scroll = 0,
            },
            Action::GoBottom => match &self.screen {
                Screen::Dashboard => {
                    self.cursor = self.store.len().saturating_sub(1);
                }
                Screen::Paper(_) => {
                    self.detail_scroll = u16::MAX; // clamped by Paragraph rendering
                }
            },
            Action::Tick => {
                self.tick = self.tick.wrapping_add(1);
                self.clamp_cursor();
            }
            Action::Resize(_w, h) => {
                // Rough estimate: total height minus header/footer/borders
                self.visible_rows = (h as usize).saturating_sub(6);
            }
            // Effectful actions (Retry/Fetch/Batch/Delete/Reload) are handled
            // by the main loop, which owns the engine.
            _ => {}
        }
        false
    }

    /// Process an engine event and update model state.
    pub fn handle_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::BatchStarted { total } => {
                self.batch_running = true;
                self.status = Some(format!("Batch started over {total} paper(s)"));
            }
            EngineEvent::Session { paper_id, event } => {
                let session = self
                    .sessions
                    .entry(paper_id)
                    .or_insert_with(|| PaperSession::new(paper_id));
                if !session.is_streaming() {
                    session.begin();
                }
                session.apply(&event);
            }
            EngineEvent::SessionFailed {
                paper_id,
                kind,
                message,
            } => {
                let session = self
                    .sessions
                    .entry(paper_id)
                    .or_insert_with(|| PaperSession::new(paper_id));
                session.fail(kind, message);
            }
            EngineEvent::SessionClosed { paper_id, success } => {
                let finished = self
                    .sessions
                    .get(&paper_id)
                    .is_some_and(|s| success && s.phase() == SessionPhase::Done);
                if finished {
                    // Stream finished and the refreshed record is already in
                    // the store; the session has nothing left to show.
                    self.sessions.remove(&paper_id);
                } else if let Some(session) = self.sessions.get_mut(&paper_id) {
                    if !success && session.is_streaming() {
                        session.fail("stream_error", "stream ended before completion");
                    }
                }
            }
            EngineEvent::PaperRefreshed { paper } => {
                self.store.point_update(*paper);
            }
            EngineEvent::BatchComplete => {
                self.batch_running = false;
                self.needs_reload = true;
                self.status = Some("Batch complete".to_string());
            }
            EngineEvent::Fetch(event) => self.handle_fetch_event(event),
            EngineEvent::FetchFailed { message } => {
                self.status = Some(format!("Fetch failed: {message}"));
            }
        }
    }

    fn handle_fetch_event(&mut self, event: FetchEvent) {
        self.status = Some(match event {
            FetchEvent::Started => "Fetching papers from arXiv…".to_string(),
            FetchEvent::Fetching { message } | FetchEvent::Saving { message } => message,
            FetchEvent::Fetched { count, .. } => format!("Fetched {count} paper(s)"),
            FetchEvent::Done { saved, .. } => {
                self.needs_reload = true;
                format!("Fetch done: {saved} new paper(s) saved")
            }
            FetchEvent::Error { error } => format!("Fetch error: {error}"),
        });
    }

    /// Process an event from the TUI's own background I/O tasks.
    pub fn handle_ui_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Loaded { papers, stats } => {
                self.store.reload(papers);
                self.store.set_stats(stats);
                self.initial_loaded = true;
                self.clamp_cursor();
            }
            UiEvent::LoadFailed { message } => {
                self.status = Some(format!("Load failed: {message}"));
            }
            UiEvent::Deleted { paper_id } => {
                self.store.remove(paper_id);
                self.sessions.remove(&paper_id);
                self.clamp_cursor();
                if self.screen == Screen::Paper(paper_id) {
                    self.screen = Screen::Dashboard;
                }
                self.status = Some(format!("Paper {paper_id} deleted"));
            }
            UiEvent::DeleteFailed { paper_id, message } => {
                self.status = Some(format!("Delete of paper {paper_id} failed: {message}"));
            }
            UiEvent::Info { message } => {
                self.status = Some(message);
            }
        }
    }

    fn clamp_cursor(&mut self) {
        if self.cursor >= self.store.len() {
            self.cursor = self.store.len().saturating_sub(1);
        }
    }

    /// Render the current screen.
    pub fn view(&self, f: &mut ratatui::Frame) {
        match &self.screen {
            Screen::Dashboard => crate::view::dashboard::render(f, self),
            Screen::Paper(id) => crate::view::paper::render(f, self, *id),
        }

        if self.show_help {
            crate::view::help::render(f, &self.theme);
        }
    }
}
