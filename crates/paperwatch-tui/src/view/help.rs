use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use crate::theme::Theme;

const BINDINGS: &[(&str, &str)] = &[
    ("j/k, ↓/↑", "move / scroll"),
    ("Enter", "open paper detail"),
    ("Esc", "back to dashboard"),
    ("g / G", "jump to top / bottom"),
    ("Ctrl+d / Ctrl+u", "page down / up"),
    ("r", "retry analysis of selected paper"),
    ("f", "fetch new papers from arXiv"),
    ("b", "batch-process pending papers"),
    ("d", "delete selected paper"),
    ("R", "reload list from server"),
    ("?", "toggle this help"),
    ("q, Ctrl+c", "quit"),
];

/// Render the help overlay centered over the current screen.
pub fn render(f: &mut Frame, theme: &Theme) {
    let area = centered(f.area(), 46, BINDINGS.len() as u16 + 4);
    f.render_widget(Clear, area);

    let mut lines = vec![Line::default()];
    for (keys, action) in BINDINGS {
        lines.push(Line::from(vec![
            Span::styled(
                format!(" {keys:<16}"),
                Style::default().fg(theme.active).add_modifier(Modifier::BOLD),
            ),
            Span::styled(*action, Style::default().fg(theme.text)),
        ]));
    }

    let help = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme.border_style())
            .title(" Keys "),
    );
    f.render_widget(help, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [area] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    area
}
