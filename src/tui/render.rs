use super::state::{AppState, Tab};
use crate::engine::access::{self, Content, PredictionView, SubscriptionTier, LOCKED_PLACEHOLDER};
use crate::engine::listing::TypeSelector;
use crate::engine::stats;
use crate::model::{Confidence, ConfidenceBand, Outcome, Prediction};
use chrono::{DateTime, FixedOffset};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Tabs, Wrap},
    Frame,
};

pub fn draw(f: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_header(f, state, chunks[0]);
    draw_tabs(f, state, chunks[1]);

    if let Some(ref err) = state.error {
        draw_error(f, err, chunks[2]);
    } else if state.loading {
        let para = Paragraph::new(Line::from(Span::styled(
            "Loading predictions...",
            Style::default().fg(Color::DarkGray),
        )))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
        f.render_widget(para, chunks[2]);
    } else {
        match state.tab {
            Tab::Predictions => draw_predictions(f, state, chunks[2]),
            Tab::Dashboard => draw_dashboard(f, state, chunks[2]),
            Tab::Admin => draw_admin(f, state, chunks[2]),
        }
    }

    draw_footer(f, state, chunks[3]);
}

fn draw_header(f: &mut Frame, state: &AppState, area: Rect) {
    let badge = match state.viewer.tier() {
        None => Span::styled("Guest", Style::default().fg(Color::DarkGray)),
        Some(SubscriptionTier::Premium) => Span::styled(
            format!("{} \u{00b7} Premium Member", state.viewer.display_name()),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Some(SubscriptionTier::Free) => Span::styled(
            format!("{} \u{00b7} Free Member", state.viewer.display_name()),
            Style::default().fg(Color::White),
        ),
    };
    let updated = state
        .updated_at
        .map(|t| format!("Updated {}", t.format("%H:%M")))
        .unwrap_or_default();

    let line = Line::from(vec![
        Span::styled(" Tipster ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
        Span::raw("\u{2502} "),
        badge,
        Span::raw("  "),
        Span::styled(updated, Style::default().fg(Color::DarkGray)),
    ]);
    let para = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    f.render_widget(para, area);
}

fn draw_tabs(f: &mut Frame, state: &AppState, area: Rect) {
    let tabs = state.tabs();
    let selected = tabs.iter().position(|t| *t == state.tab).unwrap_or(0);
    let widget = Tabs::new(tabs.iter().map(|t| t.title()).collect::<Vec<_>>())
        .select(selected)
        .block(Block::default().borders(Borders::ALL))
        .highlight_style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD));
    f.render_widget(widget, area);
}

fn draw_error(f: &mut Frame, err: &str, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Could not load predictions",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(err.to_string(), Style::default().fg(Color::Red))),
        Line::from(""),
        Line::from(Span::styled("[r] to retry", Style::default().fg(Color::DarkGray))),
    ];
    let para = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(para, area);
}

// ── Predictions ──────────────────────────────────────────────────────

fn draw_predictions(f: &mut Frame, state: &AppState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);

    let visible = state.visible();
    draw_filter_bar(f, state, visible.len(), chunks[0]);

    if visible.is_empty() {
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                "No predictions found",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                "Try adjusting your filters or check back later for new predictions",
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(""),
            Line::from(Span::styled("[x] reset filters", Style::default().fg(Color::Green))),
        ];
        let para = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(para, chunks[1]);
        return;
    }

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);

    let offset = state.now.timezone();
    let rows: Vec<Row> = visible
        .iter()
        .map(|p| {
            let lock = if access::can_reveal(&state.viewer, p) { "" } else { "\u{1f512}" };
            Row::new(vec![
                Cell::from(local_time(p, offset, "%a %H:%M")),
                Cell::from(p.matchup()),
                Cell::from(p.league.clone()),
                Cell::from(p.prediction_type.as_str()),
                Cell::from(Span::styled(p.result.as_str(), result_style(p.result))),
                Cell::from(lock),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Min(16),
            Constraint::Length(16),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(3),
        ],
    )
    .header(
        Row::new(vec!["When", "Match", "League", "Type", "Result", ""])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .row_highlight_style(Style::default().bg(Color::DarkGray))
    .block(Block::default().title(" Expert Predictions ").borders(Borders::ALL));
    // Stateful so the table scrolls to keep the selection on screen
    let mut table_state = TableState::default().with_selected(Some(state.selected));
    f.render_stateful_widget(table, body[0], &mut table_state);

    if let Some(view) = state.selected_view() {
        let para = Paragraph::new(card_lines(&view, offset))
            .wrap(Wrap { trim: true })
            .block(Block::default().title(" Tip ").borders(Borders::ALL));
        f.render_widget(para, body[1]);
    }
}

fn draw_filter_bar(f: &mut Frame, state: &AppState, found: usize, area: Rect) {
    let mut type_spans = vec![Span::raw(" ")];
    for sel in TypeSelector::CYCLE {
        let style = if sel == state.types {
            Style::default().fg(Color::Black).bg(Color::Green)
        } else {
            Style::default().fg(Color::Gray)
        };
        type_spans.push(Span::styled(format!(" {} ", sel.label()), style));
        type_spans.push(Span::raw(" "));
    }
    type_spans.push(Span::raw("\u{2502} "));
    type_spans.push(Span::styled(
        state.window.label(),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ));

    let summary = Line::from(vec![
        Span::styled(
            format!(" {} predictions found ", found),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(state.summary(), Style::default().fg(Color::DarkGray)),
    ]);

    let para = Paragraph::new(vec![Line::from(type_spans), summary])
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(para, area);
}

fn card_lines<'a>(view: &PredictionView<'a>, offset: FixedOffset) -> Vec<Line<'a>> {
    let p = view.prediction;
    let mut header = vec![
        Span::styled(
            format!("[{}]", p.prediction_type),
            Style::default().fg(Color::Magenta),
        ),
        Span::raw(" "),
    ];
    if p.is_premium {
        header.push(Span::styled("[Premium] ", Style::default().fg(Color::Yellow)));
    }
    header.push(Span::styled(capitalize(p.result.as_str()), result_style(p.result)));

    let mut lines = vec![
        Line::from(header),
        Line::from(""),
        Line::from(Span::styled(p.matchup(), Style::default().add_modifier(Modifier::BOLD))),
        Line::from(Span::styled(
            format!("{}  \u{00b7}  {}", local_time(p, offset, "%b %d, %Y %H:%M"), p.league),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
    ];

    match &view.content {
        Content::Revealed(c) => {
            lines.push(Line::from(Span::styled("Prediction", Style::default().add_modifier(Modifier::BOLD))));
            lines.push(Line::from(c.pick.to_string()));
            if let Some(conf) = c.confidence {
                lines.push(Line::from(vec![
                    Span::raw("Confidence "),
                    Span::styled(conf.to_string(), confidence_style(conf)),
                ]));
            }
            if let Some(reasoning) = c.reasoning {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled("Analysis", Style::default().fg(Color::Blue))));
                lines.push(Line::from(reasoning.to_string()));
            }
            if !c.odds.is_empty() {
                lines.push(Line::from(""));
                let odds: Vec<Span> = c
                    .odds
                    .iter()
                    .map(|(book, price)| Span::raw(format!("{} {:.2}   ", book, price)))
                    .collect();
                lines.push(Line::from(odds));
            }
        }
        Content::Locked => {
            lines.push(Line::from(Span::styled(
                LOCKED_PLACEHOLDER,
                Style::default().fg(Color::Yellow),
            )));
            lines.push(Line::from(Span::styled(
                "Upgrade to Premium",
                Style::default().fg(Color::Black).bg(Color::Yellow),
            )));
        }
    }
    lines
}

// ── Dashboard ────────────────────────────────────────────────────────

fn draw_dashboard(f: &mut Frame, state: &AppState, area: Rect) {
    let show_upgrade = state.viewer.tier() == Some(SubscriptionTier::Free);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(if show_upgrade { 3 } else { 0 }),
        ])
        .split(area);

    let welcome = vec![
        Line::from(Span::styled(
            format!(" Welcome back, {}!", state.viewer.display_name()),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!(" {}  \u{00b7}  Ready to check today's winning predictions?", state.now.format("%A, %B %d, %Y")),
            Style::default().fg(Color::DarkGray),
        )),
    ];
    f.render_widget(
        Paragraph::new(welcome).block(Block::default().borders(Borders::ALL)),
        chunks[0],
    );

    let rec = &state.dashboard.record;
    let stat = |label: &str, value: String, color: Color| {
        vec![
            Span::styled(format!(" {} ", label), Style::default().fg(Color::DarkGray)),
            Span::styled(value, Style::default().fg(color).add_modifier(Modifier::BOLD)),
            Span::raw("   "),
        ]
    };
    let mut spans = Vec::new();
    spans.extend(stat("Success Rate", stats::format_rate(rec.success_rate), Color::Green));
    spans.extend(stat("Total Tips", rec.total.to_string(), Color::Blue));
    spans.extend(stat("ROI", stats::format_roi(rec.roi), Color::Magenta));
    spans.extend(stat("Win Streak", rec.win_streak.to_string(), Color::Yellow));
    f.render_widget(
        Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL)),
        chunks[1],
    );

    let lists = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[2]);
    let offset = state.now.timezone();
    draw_compact_list(
        f,
        state,
        &state.dashboard.today,
        &format!(" Today's Predictions ({} tips available) ", state.dashboard.today.len()),
        "Check back later for today's expert predictions",
        offset,
        lists[0],
    );
    draw_compact_list(
        f,
        state,
        &state.dashboard.recent,
        " Recent Activity ",
        "Start following predictions to see your activity here",
        offset,
        lists[1],
    );

    if show_upgrade {
        let line = Line::from(vec![
            Span::styled(" Upgrade to Premium ", Style::default().fg(Color::Black).bg(Color::Yellow)),
            Span::raw(" Get access to exclusive predictions, detailed analysis, and multi-bet tips"),
        ]);
        f.render_widget(
            Paragraph::new(line).block(Block::default().borders(Borders::ALL)),
            chunks[3],
        );
    }
}

fn draw_compact_list(
    f: &mut Frame,
    state: &AppState,
    records: &[Prediction],
    title: &str,
    empty: &str,
    offset: FixedOffset,
    area: Rect,
) {
    let block = Block::default().title(title.to_string()).borders(Borders::ALL);
    if records.is_empty() {
        let para = Paragraph::new(Span::styled(empty.to_string(), Style::default().fg(Color::DarkGray)))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(block);
        f.render_widget(para, area);
        return;
    }
    let lines: Vec<Line> = records
        .iter()
        .map(|p| {
            let view = access::present(&state.viewer, p);
            let pick = match view.content {
                Content::Revealed(c) => Span::styled(c.pick.to_string(), Style::default().fg(Color::Green)),
                Content::Locked => Span::styled("\u{1f512} Premium", Style::default().fg(Color::Yellow)),
            };
            Line::from(vec![
                Span::styled(local_time(p, offset, "%H:%M "), Style::default().fg(Color::DarkGray)),
                Span::raw(format!("{}  ", p.matchup())),
                pick,
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(lines).block(block), area);
}

// ── Admin ────────────────────────────────────────────────────────────

fn draw_admin(f: &mut Frame, state: &AppState, area: Rect) {
    let rows: Vec<Row> = state
        .admin_rows
        .iter()
        .map(|p| {
            let (status, status_style) = if p.is_premium {
                ("Premium", Style::default().fg(Color::Yellow))
            } else {
                ("Free", Style::default().fg(Color::Green))
            };
            Row::new(vec![
                Cell::from(format!("{}\n{}", p.matchup(), p.league)),
                Cell::from(p.prediction.clone()),
                Cell::from(p.prediction_type.as_str()),
                Cell::from(p.confidence_score.map(|c| c.to_string()).unwrap_or_else(|| "—".to_string())),
                Cell::from(Span::styled(status, status_style)),
                Cell::from(Span::styled(capitalize(p.result.as_str()), result_style(p.result))),
            ])
            .height(2)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Min(24),
            Constraint::Min(16),
            Constraint::Length(8),
            Constraint::Length(11),
            Constraint::Length(8),
            Constraint::Length(8),
        ],
    )
    .header(
        Row::new(vec!["Match", "Prediction", "Type", "Confidence", "Status", "Result"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(
        Block::default()
            .title(" Recent Predictions (add: `tipster add <draft.toml>`, settle: `tipster settle <id> won|lost`) ")
            .borders(Borders::ALL),
    );
    f.render_widget(table, area);
}

fn draw_footer(f: &mut Frame, state: &AppState, area: Rect) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));
    let mut spans = vec![
        key("  [q]"),
        Span::raw("uit  "),
        key("[Tab]"),
        Span::raw(" switch  "),
        key("[r]"),
        Span::raw("efresh  "),
    ];
    if state.tab == Tab::Predictions {
        spans.extend([
            key("[t]"),
            Span::raw("ype  "),
            key("[d]"),
            Span::raw("ate  "),
            key("[x]"),
            Span::raw(" reset  "),
            key("[j/k]"),
            Span::raw(" select  "),
        ]);
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

// ── helpers ──────────────────────────────────────────────────────────

fn local_time(p: &Prediction, offset: FixedOffset, fmt: &str) -> String {
    let local: DateTime<FixedOffset> = p.match_date.with_timezone(&offset);
    local.format(fmt).to_string()
}

fn result_style(result: Outcome) -> Style {
    match result {
        Outcome::Won => Style::default().fg(Color::Green),
        Outcome::Lost => Style::default().fg(Color::Red),
        Outcome::Pending => Style::default().fg(Color::Yellow),
    }
}

fn confidence_style(c: Confidence) -> Style {
    let color = match c.band() {
        ConfidenceBand::High => Color::Green,
        ConfidenceBand::Medium => Color::Yellow,
        ConfidenceBand::Low => Color::Red,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::access::ViewerContext;
    use crate::engine::listing::DateWindow;
    use crate::model::{fixtures, PredictionType};
    use chrono::{Duration, TimeZone, Utc};
    use ratatui::{backend::TestBackend, Terminal};

    /// Text of columns `0..width` on every row of the buffer.
    fn left_text(terminal: &Terminal<TestBackend>, width: u16) -> String {
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..width.min(buffer.area.width) {
                if let Some(cell) = buffer.cell((x, y)) {
                    out.push_str(cell.symbol());
                }
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn test_selected_row_stays_visible() {
        let kickoff = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let now = kickoff.fixed_offset();
        let mut state = AppState::new(ViewerContext::anonymous(), TypeSelector::All, DateWindow::All, now);
        state.loading = false;
        state.records = (0..20)
            .map(|i| {
                let mut p = fixtures::prediction(&format!("p{}", i), PredictionType::Single, kickoff + Duration::hours(i));
                p.home_team = format!("Side{:02}", i);
                p
            })
            .collect();
        state.selected = 17;

        let mut terminal = Terminal::new(TestBackend::new(160, 20)).unwrap();
        terminal.draw(|f| draw(f, &state)).unwrap();

        // The table is the left 55%; the detail card on the right also names the pick
        let table = left_text(&terminal, 80);
        assert!(table.contains("Side17"));
        assert!(!table.contains("Side00"));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("pending"), "Pending");
        assert_eq!(capitalize(""), "");
    }
}
