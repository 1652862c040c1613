use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};
use ratatui::Frame;

use paperwatch_core::StatusTag;

use crate::app::App;
use crate::theme::Theme;
use crate::view::{spinner_char, truncate};

/// Render the Dashboard screen.
pub fn render(f: &mut Frame, app: &App) {
    let area = f.area();

    let chunks = Layout::vertical([
        Constraint::Length(1), // header
        Constraint::Min(5),    // table
        Constraint::Length(1), // footer / stats
    ])
    .split(area);

    render_header(f, chunks[0], &app.theme);
    render_table(f, chunks[1], app);
    render_footer(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, theme: &Theme) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" PAPERWATCH ", theme.header_style()),
        Span::styled(
            " Papers",
            Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
        ),
    ]));
    f.render_widget(header, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let wide = area.width >= 100;

    let header_cells = if wide {
        vec!["#", "Score", "Title", "Categories", "Published", "Status"]
    } else {
        vec!["#", "Score", "Title", "Status"]
    };
    let header = Row::new(header_cells.iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(theme.text).add_modifier(Modifier::BOLD))
    }))
    .height(1);

    let rows: Vec<Row> = app
        .store
        .papers()
        .iter()
        .enumerate()
        .map(|(idx, paper)| {
            let num = format!("{}", idx + 1);
            let score = match paper.relevance_score {
                Some(s) => format!("{s}/10"),
                None => "—".to_string(),
            };
            let title_width = if wide {
                (area.width as usize).saturating_sub(60)
            } else {
                (area.width as usize).saturating_sub(30)
            };
            let title = truncate(&paper.title, title_width);

            let tag = app.status_tag(paper);
            let status_text = match tag {
                StatusTag::Streaming | StatusTag::Processing => {
                    format!("{} {}", spinner_char(app.tick), tag.label())
                }
                _ => tag.label().to_string(),
            };
            let status_style = Style::default().fg(theme.status_color(tag));

            if wide {
                Row::new(vec![
                    Cell::from(num),
                    Cell::from(score).style(theme.score_style(paper.relevance_score)),
                    Cell::from(title),
                    Cell::from(truncate(&paper.categories, 18)),
                    Cell::from(paper.published.format("%Y-%m-%d").to_string()),
                    Cell::from(status_text).style(status_style),
                ])
            } else {
                Row::new(vec![
                    Cell::from(num),
                    Cell::from(score).style(theme.score_style(paper.relevance_score)),
                    Cell::from(title),
                    Cell::from(status_text).style(status_style),
                ])
            }
        })
        .collect();

    let widths = if wide {
        vec![
            Constraint::Length(4),
            Constraint::Length(6),
            Constraint::Min(30),
            Constraint::Length(18),
            Constraint::Length(10),
            Constraint::Length(14),
        ]
    } else {
        vec![
            Constraint::Length(4),
            Constraint::Length(6),
            Constraint::Min(20),
            Constraint::Length(14),
        ]
    };

    let (queued, in_flight) = app.batch_gauge;
    let title = if app.batch_running {
        format!(" Batch: {in_flight} streaming, {queued} queued ")
    } else {
        " All papers ".to_string()
    };

    let table = Table::new(rows, &widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.border_style())
                .title(title),
        )
        .row_highlight_style(theme.highlight_style());

    let mut state = TableState::default();
    state.select(Some(app.cursor));
    f.render_stateful_widget(table, area, &mut state);
}

fn render_footer(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let stats = app.store.stats();

    let mut spans = vec![
        Span::styled(
            format!(" {} papers ", stats.total_papers),
            Style::default().fg(theme.text),
        ),
        Span::styled(
            format!("done:{} ", stats.processed_papers),
            Style::default().fg(theme.done),
        ),
        Span::styled(
            format!("hot:{} ", stats.high_relevance_papers),
            Style::default().fg(theme.high_relevance),
        ),
        Span::styled(
            format!("pending:{} ", stats.pending_processing),
            Style::default().fg(theme.queued),
        ),
    ];
    if let Some(status) = &app.status {
        spans.push(Span::styled(
            format!("| {} ", truncate(status, 48)),
            Style::default().fg(theme.active),
        ));
    }
    spans.push(Span::styled(
        "| j/k:nav  Enter:detail  r:retry  f:fetch  b:batch  d:delete  ?:help  q:quit",
        theme.footer_style(),
    ));

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
