use ratatui::style::{Color, Modifier, Style};

use paperwatch_core::{StatusTag, StepStatus};

/// Color theme for the TUI.
pub struct Theme {
    pub done: Color,
    pub failed: Color,
    pub active: Color,
    pub queued: Color,
    pub high_relevance: Color,

    pub header_fg: Color,
    pub header_bg: Color,
    pub border: Color,
    pub text: Color,
    pub dim: Color,
    pub highlight_bg: Color,
    pub spinner: Color,
    pub footer_fg: Color,
    pub footer_bg: Color,
}

impl Theme {
    /// Hacker-green terminal theme.
    pub fn hacker() -> Self {
        Self {
            done: Color::Green,
            failed: Color::Red,
            active: Color::Cyan,
            queued: Color::DarkGray,
            high_relevance: Color::Magenta,

            header_fg: Color::Black,
            header_bg: Color::Green,
            border: Color::DarkGray,
            text: Color::White,
            dim: Color::DarkGray,
            highlight_bg: Color::Rgb(30, 50, 30),
            spinner: Color::Cyan,
            footer_fg: Color::DarkGray,
            footer_bg: Color::Reset,
        }
    }

    pub fn status_color(&self, tag: StatusTag) -> Color {
        match tag {
            StatusTag::Streaming | StatusTag::Processing => self.active,
            StatusTag::Pending => self.queued,
            StatusTag::Done => self.done,
            StatusTag::Failed => self.failed,
        }
    }

    pub fn score_style(&self, score: Option<u8>) -> Style {
        match score {
            Some(s) if s >= 9 => Style::default()
                .fg(self.high_relevance)
                .add_modifier(Modifier::BOLD),
            Some(s) if s >= 5 => Style::default().fg(self.done),
            Some(_) => Style::default().fg(self.dim),
            None => Style::default().fg(self.dim),
        }
    }

    pub fn step_style(&self, status: StepStatus) -> Style {
        match status {
            StepStatus::Pending => Style::default().fg(self.dim),
            StepStatus::Active => Style::default()
                .fg(self.spinner)
                .add_modifier(Modifier::BOLD),
            StepStatus::Done => Style::default().fg(self.done),
            StepStatus::Error => Style::default().fg(self.failed),
        }
    }

    pub fn header_style(&self) -> Style {
        Style::default()
            .fg(self.header_fg)
            .bg(self.header_bg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn highlight_style(&self) -> Style {
        Style::default()
            .bg(self.highlight_bg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }

    pub fn footer_style(&self) -> Style {
        Style::default().fg(self.footer_fg).bg(self.footer_bg)
    }
}
