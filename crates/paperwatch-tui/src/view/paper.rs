use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use paperwatch_api::Paper;
use paperwatch_core::{PaperSession, SessionPhase, StepStatus};

use crate::app::App;
use crate::theme::Theme;
use crate::view::{spinner_char, truncate};

/// Render the paper detail screen: metadata, then either the live session
/// (step pipeline + streaming thought) or the stored analysis.
pub fn render(f: &mut Frame, app: &App, paper_id: i64) {
    let area = f.area();
    let Some(paper) = app.store.get(paper_id) else {
        let gone = Paragraph::new("Paper no longer in the list (Esc to go back)")
            .style(Style::default().fg(app.theme.dim));
        f.render_widget(gone, area);
        return;
    };
    let session = app.sessions.get(&paper_id);

    let chunks = Layout::vertical([
        Constraint::Length(1), // header
        Constraint::Length(6), // metadata
        Constraint::Min(5),    // session or analysis
        Constraint::Length(1), // footer
    ])
    .split(area);

    render_header(f, chunks[0], app, paper);
    render_meta(f, chunks[1], app, paper);
    match session {
        Some(session) if !session.steps().is_empty() || session.phase() != SessionPhase::Idle => {
            render_session(f, chunks[2], app, session);
        }
        _ => render_analysis(f, chunks[2], app, paper),
    }
    render_footer(f, chunks[3], &app.theme);
}

fn render_header(f: &mut Frame, area: Rect, app: &App, paper: &Paper) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" PAPERWATCH ", app.theme.header_style()),
        Span::styled(
            format!(" {}", truncate(&paper.title, (area.width as usize).saturating_sub(14))),
            Style::default()
                .fg(app.theme.text)
                .add_modifier(Modifier::BOLD),
        ),
    ]));
    f.render_widget(header, area);
}

fn render_meta(f: &mut Frame, area: Rect, app: &App, paper: &Paper) {
    let theme = &app.theme;
    let tag = app.status_tag(paper);
    let score = match paper.relevance_score {
        Some(s) => format!("{s}/10"),
        None => "unscored".to_string(),
    };
    let lines = vec![
        Line::from(vec![
            Span::styled("arXiv: ", Style::default().fg(theme.dim)),
            Span::raw(paper.arxiv_id.clone()),
            Span::styled("   published: ", Style::default().fg(theme.dim)),
            Span::raw(paper.published.format("%Y-%m-%d").to_string()),
            Span::styled("   status: ", Style::default().fg(theme.dim)),
            Span::styled(tag.label(), Style::default().fg(theme.status_color(tag))),
            Span::styled("   score: ", Style::default().fg(theme.dim)),
            Span::styled(score, theme.score_style(paper.relevance_score)),
        ]),
        Line::from(vec![
            Span::styled("authors: ", Style::default().fg(theme.dim)),
            Span::raw(truncate(&paper.authors, (area.width as usize).saturating_sub(12))),
        ]),
        Line::from(vec![
            Span::styled("categories: ", Style::default().fg(theme.dim)),
            Span::raw(paper.categories.clone()),
        ]),
    ];
    let block = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme.border_style()),
    );
    f.render_widget(block, area);
}

fn render_session(f: &mut Frame, area: Rect, app: &App, session: &PaperSession) {
    let theme = &app.theme;
    let chunks = Layout::horizontal([Constraint::Length(28), Constraint::Min(20)]).split(area);

    // Step pipeline
    let mut lines: Vec<Line> = session
        .steps()
        .steps()
        .iter()
        .map(|step| {
            let glyph = match step.status {
                StepStatus::Pending => '○',
                StepStatus::Active => spinner_char(app.tick),
                StepStatus::Done => '✓',
                StepStatus::Error => '✗',
            };
            Line::from(Span::styled(
                format!(" {glyph} {}", step.label),
                theme.step_style(step.status),
            ))
        })
        .collect();
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            " waiting for workflow…",
            Style::default().fg(theme.dim),
        )));
    }
    if let Some(failure) = session.failure() {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            format!(" {}", failure.display_message()),
            Style::default().fg(theme.failed),
        )));
    }
    let steps = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme.border_style())
            .title(" Pipeline "),
    );
    f.render_widget(steps, chunks[0]);

    // Streaming thought
    let thought = if session.thought().is_empty() {
        "…"
    } else {
        session.thought()
    };
    let thought_panel = Paragraph::new(thought)
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll, 0))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.border_style())
                .title(" Reasoning "),
        );
    f.render_widget(thought_panel, chunks[1]);
}

fn render_analysis(f: &mut Frame, area: Rect, app: &App, paper: &Paper) {
    let theme = &app.theme;
    let mut lines: Vec<Line> = Vec::new();

    let mut section = |label: &str, value: &Option<String>, lines: &mut Vec<Line>| {
        if let Some(text) = value {
            lines.push(Line::from(Span::styled(
                label.to_string(),
                Style::default().fg(theme.active).add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(text.clone()));
            lines.push(Line::default());
        }
    };

    if paper.is_processed {
        section("Essence", &paper.paper_essence, &mut lines);
        section("Relevance", &paper.relevance_reason, &mut lines);
        section("Suggestion", &paper.heuristic_suggestion, &mut lines);
        section("Concept bridging", &paper.concept_bridging, &mut lines);
        section("Visual verification", &paper.visual_verification, &mut lines);
    }
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "Not analyzed yet — press r to run the workflow",
            Style::default().fg(theme.dim),
        )));
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "Abstract",
            Style::default().fg(theme.active).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(paper.abstract_text.clone()));
    }

    let panel = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll, 0))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.border_style())
                .title(" Analysis "),
        );
    f.render_widget(panel, area);
}

fn render_footer(f: &mut Frame, area: Rect, theme: &Theme) {
    let footer = Line::from(Span::styled(
        " j/k:scroll  r:retry  d:delete  Esc:back  q:quit",
        theme.footer_style(),
    ));
    f.render_widget(Paragraph::new(footer), area);
}
