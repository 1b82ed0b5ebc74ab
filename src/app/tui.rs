use std::collections::VecDeque;
use std::io::{self, Stdout};
use std::path::Path;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEventKind,
};
use ratatui::Frame;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};
use tokio::sync::mpsc::UnboundedReceiver;

use super::data_io::{DataFormat, export_items};
use super::runtime::{Dispatcher, ReviewEvent, handle_review_event};
use super::session::ReviewSession;
use super::ui_utils::{
    centered_rect, confidence_style, point_in_rect, review_state_style, table_row_index_at,
    truncate,
};
use super::view::{DetailView, QueueBody, ReviewView, project};

const MAX_NOTICES: usize = 6;

#[derive(Default)]
struct TuiState {
    cursor: usize,
    table_state: TableState,
    table_area: Option<Rect>,
    row_ids: Vec<String>,
    help_mode: bool,
    filter_mode: bool,
    filter_input: String,
    editing: bool,
    notices: VecDeque<(String, bool)>,
}

impl TuiState {
    fn push_notice(&mut self, message: String) {
        self.push(message, false);
    }

    fn push_error(&mut self, message: String) {
        self.push(message, true);
    }

    fn push(&mut self, message: String, is_error: bool) {
        self.notices.push_front((message, is_error));
        while self.notices.len() > MAX_NOTICES {
            self.notices.pop_back();
        }
    }

    fn row_at(&self, column: u16, row: u16) -> Option<(usize, String)> {
        let area = self.table_area?;
        if !point_in_rect(column, row, area) {
            return None;
        }
        let index = table_row_index_at(area, row)? + self.table_state.offset();
        self.row_ids.get(index).map(|id| (index, id.clone()))
    }

    fn sync_rows(&mut self, view: &ReviewView) {
        self.row_ids = match &view.body {
            QueueBody::Rows(rows) => rows.iter().map(|row| row.id.clone()).collect(),
            _ => Vec::new(),
        };
        if self.row_ids.is_empty() {
            self.cursor = 0;
            self.table_state.select(None);
        } else {
            self.cursor = self.cursor.min(self.row_ids.len() - 1);
            self.table_state.select(Some(self.cursor));
        }
    }
}

pub fn draw_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    session: &mut ReviewSession,
    dispatcher: &Dispatcher,
    rx: &mut UnboundedReceiver<ReviewEvent>,
    export_target: (&Path, DataFormat),
) -> io::Result<()> {
    let mut state = TuiState::default();
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(120);

    loop {
        while let Ok(event) = rx.try_recv() {
            let failed = matches!(
                &event,
                ReviewEvent::Queue { result: Err(_), .. }
                    | ReviewEvent::Detail { result: Err(_), .. }
                    | ReviewEvent::Submitted { result: Err(_), .. }
            );
            if let Some(message) = handle_review_event(session, dispatcher, event) {
                if failed {
                    state.push_error(message);
                } else {
                    state.push_notice(message);
                }
            }
        }

        let view = project(session);
        state.sync_rows(&view);
        terminal.draw(|f| render(f, &view, session, &mut state))?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) => {
                    if state.help_mode {
                        if matches!(
                            key.code,
                            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('?')
                        ) {
                            state.help_mode = false;
                        }
                    } else if state.filter_mode {
                        handle_filter_key(key, session, dispatcher, &mut state);
                    } else if state.editing {
                        handle_edit_key(key, session, &mut state);
                    } else if !handle_key(key, session, dispatcher, &mut state, export_target) {
                        break;
                    }
                }
                Event::Mouse(mouse) => {
                    if state.help_mode || state.filter_mode || state.editing {
                        continue;
                    }
                    if matches!(mouse.kind, MouseEventKind::Down(MouseButton::Left))
                        && let Some((index, id)) = state.row_at(mouse.column, mouse.row)
                    {
                        state.cursor = index;
                        dispatcher.select(session.begin_select(&id));
                    }
                }
                _ => {}
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    }

    Ok(())
}

fn handle_key(
    key: KeyEvent,
    session: &mut ReviewSession,
    dispatcher: &Dispatcher,
    state: &mut TuiState,
    export_target: (&Path, DataFormat),
) -> bool {
    match key.code {
        KeyCode::Char('q') => return false,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return false,
        KeyCode::Down | KeyCode::Char('j') => {
            if state.cursor + 1 < state.row_ids.len() {
                state.cursor += 1;
            }
        }
        KeyCode::Up | KeyCode::Char('k') => state.cursor = state.cursor.saturating_sub(1),
        KeyCode::Enter => {
            if let Some(id) = state.row_ids.get(state.cursor).cloned() {
                dispatcher.select(session.begin_select(&id));
            }
        }
        KeyCode::Char('n') | KeyCode::PageDown => match session.next_page() {
            Some(ticket) => dispatcher.load(ticket),
            None => state.push_notice("Already on the last page".to_string()),
        },
        KeyCode::Char('p') | KeyCode::PageUp => match session.prev_page() {
            Some(ticket) => dispatcher.load(ticket),
            None => state.push_notice("Already on the first page".to_string()),
        },
        KeyCode::Char('r') => dispatcher.load(session.refresh()),
        KeyCode::Char('a') => dispatcher.load(session.toggle_pending()),
        KeyCode::Char('/') => {
            state.filter_mode = true;
            state.filter_input = session
                .queue()
                .filter()
                .detector_id
                .clone()
                .unwrap_or_default();
        }
        KeyCode::Char('+') | KeyCode::Char('=') => {
            if let Some(ticket) = session.step_limit(true) {
                dispatcher.load(ticket);
            }
        }
        KeyCode::Char('-') | KeyCode::Char('_') => {
            if let Some(ticket) = session.step_limit(false) {
                dispatcher.load(ticket);
            }
        }
        KeyCode::Char(digit @ '1'..='9') => {
            let index = digit as usize - '1' as usize;
            if !session.choose_label(index) {
                state.push_error(format!("No label bound to {digit}"));
            }
        }
        KeyCode::Tab => session.form_mut().focus_next(),
        KeyCode::Char('e') => state.editing = true,
        KeyCode::Char('s') => {
            if session.form().is_submitting() {
                state.push_notice("A label is already being saved".to_string());
            } else {
                match session.begin_submit() {
                    Ok(ticket) => dispatcher.submit(ticket),
                    Err(err) => state.push_error(err.to_string()),
                }
            }
        }
        KeyCode::Char('c') => session.form_mut().clear(),
        KeyCode::Char('x') => {
            let (path, format) = export_target;
            match export_items(path, format, session.queue().items()) {
                Ok(written) => {
                    state.push_notice(format!("Exported {written} items to {}", path.display()))
                }
                Err(err) => state.push_error(format!("Export failed: {err}")),
            }
        }
        KeyCode::Char('?') => state.help_mode = true,
        _ => {}
    }
    true
}

fn handle_filter_key(
    key: KeyEvent,
    session: &mut ReviewSession,
    dispatcher: &Dispatcher,
    state: &mut TuiState,
) {
    match key.code {
        KeyCode::Esc => state.filter_mode = false,
        KeyCode::Enter => {
            state.filter_mode = false;
            let detector = std::mem::take(&mut state.filter_input);
            dispatcher.load(session.set_detector(Some(detector)));
        }
        KeyCode::Backspace => {
            state.filter_input.pop();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            state.filter_input.clear();
        }
        KeyCode::Char(ch) => {
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
            {
                state.filter_input.push(ch);
            }
        }
        _ => {}
    }
}

fn handle_edit_key(key: KeyEvent, session: &mut ReviewSession, state: &mut TuiState) {
    let form = session.form_mut();
    let focus = form.focus();
    match key.code {
        KeyCode::Esc | KeyCode::Enter => state.editing = false,
        KeyCode::Tab => form.focus_next(),
        KeyCode::Backspace => {
            form.field_mut(focus).pop();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            form.field_mut(focus).clear();
        }
        KeyCode::Char(ch) => {
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
            {
                form.field_mut(focus).push(ch);
            }
        }
        _ => {}
    }
}

fn render(f: &mut Frame, view: &ReviewView, session: &ReviewSession, state: &mut TuiState) {
    state.table_area = None;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(12),
            Constraint::Length(5),
        ])
        .split(f.area());

    render_header(f, view, chunks[0]);

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(56), Constraint::Percentage(44)])
        .split(chunks[1]);
    render_queue(f, view, state, main[0]);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(11)])
        .split(main[1]);
    render_detail(f, view, side[0]);
    render_form(f, view, state.editing, side[1]);

    render_footer(f, state, chunks[2]);

    if state.help_mode {
        render_help(f, session);
    } else if state.filter_mode {
        render_filter_prompt(f, view, state);
    }
}

fn render_header(f: &mut Frame, view: &ReviewView, area: Rect) {
    let metric_label = Style::default().fg(Color::Gray);
    let sep_style = Style::default().fg(Color::DarkGray);
    let nav_style = |enabled: bool| {
        if enabled {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    };
    let lines = vec![
        Line::from(vec![
            Span::styled(
                view.meta.clone(),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled("  |  ", sep_style),
            Span::styled(view.filter_summary.clone(), metric_label),
            Span::styled("  |  ", sep_style),
            Span::raw(view.page_label.clone()),
            if view.loading {
                Span::styled(
                    "  loading…",
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                Span::raw("")
            },
        ]),
        Line::from(vec![
            Span::styled("p prev", nav_style(view.prev_enabled)),
            Span::styled("  ", sep_style),
            Span::styled("n next", nav_style(view.next_enabled)),
            Span::styled("  |  ", sep_style),
            Span::styled("? help", metric_label),
        ]),
    ];
    f.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .title("Review Queue")
                .borders(Borders::ALL),
        ),
        area,
    );
}

fn render_queue(f: &mut Frame, view: &ReviewView, state: &mut TuiState, area: Rect) {
    let block = Block::default()
        .title("Items")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let rows = match &view.body {
        QueueBody::Rows(rows) => rows,
        QueueBody::Loading => {
            f.render_widget(Paragraph::new("Loading queue…").block(block), area);
            return;
        }
        QueueBody::Empty => {
            f.render_widget(
                Paragraph::new("Nothing to review for this filter.").block(block),
                area,
            );
            return;
        }
        QueueBody::Failed(detail) => {
            f.render_widget(
                Paragraph::new(vec![
                    Line::styled(
                        "Could not load the queue",
                        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                    ),
                    Line::from(detail.clone()),
                    Line::from("Press r to retry."),
                ])
                .block(block)
                .wrap(Wrap { trim: true }),
                area,
            );
            return;
        }
    };

    let table_rows = rows.iter().map(|row| {
        let marker = if row.selected { "▶" } else { " " };
        Row::new(vec![
            Cell::from(marker),
            Cell::from(truncate(&row.id, 18)),
            Cell::from(truncate(&row.detector, 16)),
            Cell::from(row.model_label.clone()),
            Cell::from(row.confidence.clone()).style(confidence_style(row.model_confidence)),
            Cell::from(row.received.clone()),
            Cell::from(row.status.clone())
                .style(review_state_style(row.human_label.as_deref())),
        ])
    });
    let table = Table::new(
        table_rows,
        [
            Constraint::Length(1),
            Constraint::Length(18),
            Constraint::Length(16),
            Constraint::Length(8),
            Constraint::Length(7),
            Constraint::Length(19),
            Constraint::Min(6),
        ],
    )
    .header(
        Row::new(vec!["", "ID", "Detector", "Model", "Conf", "Received", "Status"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .block(block)
    .column_spacing(1);
    state.table_area = Some(area);
    f.render_stateful_widget(table, area, &mut state.table_state);
}

fn render_detail(f: &mut Frame, view: &ReviewView, area: Rect) {
    match &view.detail {
        DetailView::Placeholder(text) => f.render_widget(
            Paragraph::new(text.clone())
                .style(Style::default().fg(Color::DarkGray))
                .block(Block::default().title("Detail").borders(Borders::ALL))
                .wrap(Wrap { trim: true }),
            area,
        ),
        DetailView::Item { id, fields, error } => {
            let label_style = Style::default().fg(Color::Gray);
            let mut lines: Vec<Line> = fields
                .iter()
                .map(|(title, value)| {
                    Line::from(vec![
                        Span::styled(format!("{title:<17}"), label_style),
                        Span::raw(value.clone()),
                    ])
                })
                .collect();
            if let Some(err) = error {
                lines.push(Line::styled(
                    format!("Last fetch failed: {err}"),
                    Style::default().fg(Color::Red),
                ));
            }
            f.render_widget(
                Paragraph::new(lines)
                    .block(
                        Block::default()
                            .title(format!("Detail {id}"))
                            .borders(Borders::ALL),
                    )
                    .wrap(Wrap { trim: false }),
                area,
            );
        }
    }
}

fn render_form(f: &mut Frame, view: &ReviewView, editing: bool, area: Rect) {
    let form = &view.form;
    let mut choice_spans = Vec::new();
    for choice in &form.choices {
        let style = if choice.chosen {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Yellow)
        };
        choice_spans.push(Span::styled(format!("[{}] {}", choice.key, choice.label), style));
        choice_spans.push(Span::raw("  "));
    }

    let mut lines = vec![Line::from(choice_spans)];
    for field in &form.fields {
        let marker = match (field.focused, editing) {
            (true, true) => "✎ ",
            (true, false) => "› ",
            _ => "  ",
        };
        let style = if field.focused {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{marker}{:<11}", field.title), style),
            Span::raw(field.value.clone()),
        ]));
    }
    if let Some(status) = &form.status {
        let style = if form.status_is_error {
            Style::default().fg(Color::Red)
        } else {
            Style::default().fg(Color::Green)
        };
        lines.push(Line::styled(status.clone(), style));
    }

    let border = if editing {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    f.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .title("Label")
                .borders(Borders::ALL)
                .border_style(border),
        ),
        area,
    );
}

fn render_footer(f: &mut Frame, state: &TuiState, area: Rect) {
    let mut lines: Vec<Line> = state
        .notices
        .iter()
        .take(2)
        .map(|(message, is_error)| {
            let style = if *is_error {
                Style::default().fg(Color::Red)
            } else {
                Style::default().fg(Color::Gray)
            };
            Line::styled(message.clone(), style)
        })
        .collect();
    let mode = if state.filter_mode {
        "FILTER"
    } else if state.editing {
        "EDIT"
    } else {
        "NORMAL"
    };
    lines.push(Line::from(vec![
        Span::styled(
            format!(" {mode} "),
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "  enter select  1-9 label  tab field  e edit  s submit  x export  q quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]));
    f.render_widget(
        Paragraph::new(lines)
            .block(Block::default().title("Status").borders(Borders::ALL))
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn render_help(f: &mut Frame, session: &ReviewSession) {
    let area = centered_rect(64, 60, f.area());
    f.render_widget(Clear, area);
    f.render_widget(
        Block::default()
            .title("Help")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)),
        area,
    );
    let help_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8),
            Constraint::Length(9),
            Constraint::Min(3),
        ])
        .margin(1)
        .split(area);
    f.render_widget(
        Paragraph::new(vec![
            Line::from("  up/down or j/k: move cursor"),
            Line::from("  enter or click: open item detail"),
            Line::from("  n/p: next/previous page"),
            Line::from("  r: reload, a: toggle pending only"),
            Line::from("  /: detector filter, +/-: page size"),
        ])
        .block(Block::default().borders(Borders::ALL).title("Queue"))
        .wrap(Wrap { trim: true }),
        help_chunks[0],
    );
    let labels = session
        .labels()
        .iter()
        .take(9)
        .enumerate()
        .map(|(idx, label)| format!("{}={label}", idx + 1))
        .collect::<Vec<_>>()
        .join("  ");
    f.render_widget(
        Paragraph::new(vec![
            Line::from(format!("  labels: {labels}")),
            Line::from("  tab: next field, e: edit field (enter/esc to finish)"),
            Line::from("  ctrl+u: clear field while editing"),
            Line::from("  s: submit label, c: clear form"),
            Line::from("  x: export current page"),
        ])
        .block(Block::default().borders(Borders::ALL).title("Labeling"))
        .wrap(Wrap { trim: true }),
        help_chunks[1],
    );
    f.render_widget(
        Paragraph::new("Press ? or Esc to close.")
            .block(Block::default().borders(Borders::ALL).title("Close"))
            .wrap(Wrap { trim: true }),
        help_chunks[2],
    );
}

fn render_filter_prompt(f: &mut Frame, view: &ReviewView, state: &TuiState) {
    let area = centered_rect(60, 28, f.area());
    f.render_widget(Clear, area);
    f.render_widget(
        Block::default()
            .title("Detector Filter")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)),
        area,
    );
    let prompt_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(2),
        ])
        .margin(1)
        .split(area);
    f.render_widget(
        Paragraph::new(format!(
            "Detector: {}",
            if state.filter_input.is_empty() {
                "<any>"
            } else {
                &state.filter_input
            }
        ))
        .block(Block::default().borders(Borders::ALL).title("Input")),
        prompt_chunks[0],
    );
    f.render_widget(
        Paragraph::new(view.filter_summary.clone())
            .block(Block::default().borders(Borders::ALL).title("Current")),
        prompt_chunks[1],
    );
    f.render_widget(
        Paragraph::new("Enter to apply, Esc to cancel. Leave empty for every detector.")
            .wrap(Wrap { trim: true }),
        prompt_chunks[2],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::sample_page;
    use crate::app::types::Filter;
    use ratatui::backend::TestBackend;

    fn loaded(count: usize) -> ReviewSession {
        let mut session = ReviewSession::new(
            Filter::default(),
            ["YES", "NO"].map(String::from).to_vec(),
            None,
        );
        let ids: Vec<String> = (0..count).map(|i| format!("iq_{i:02}")).collect();
        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
        let ticket = session.refresh();
        session.on_queue_result(ticket, Ok(sample_page(&ids, count as u64)));
        session
    }

    fn screen_line(terminal: &Terminal<TestBackend>, area: Rect, y: u16) -> String {
        let buffer = terminal.backend().buffer();
        (area.x..area.x + area.width)
            .map(|x| buffer[(x, y)].symbol().to_string())
            .collect()
    }

    #[test]
    fn click_on_scrolled_table_picks_the_row_under_the_pointer() {
        let session = loaded(50);
        let mut state = TuiState {
            cursor: 40,
            ..TuiState::default()
        };
        let view = project(&session);
        state.sync_rows(&view);

        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal
            .draw(|f| render(f, &view, &session, &mut state))
            .unwrap();

        let area = state.table_area.expect("table rendered");
        assert!(state.table_state.offset() > 0);
        let first_data_row = area.y + 2;
        let (index, id) = state.row_at(area.x + 4, first_data_row).unwrap();
        assert_eq!(index, state.table_state.offset());
        assert!(screen_line(&terminal, area, first_data_row).contains(&id));
        assert_ne!(id, "iq_00");
    }

    #[test]
    fn click_outside_the_rows_selects_nothing() {
        let session = loaded(3);
        let mut state = TuiState::default();
        let view = project(&session);
        state.sync_rows(&view);

        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal
            .draw(|f| render(f, &view, &session, &mut state))
            .unwrap();

        let area = state.table_area.unwrap();
        assert_eq!(state.row_at(area.x + 4, area.y + 1), None);
        assert_eq!(state.row_at(area.x + 4, area.y + 2), Some((0, "iq_00".to_string())));
        assert_eq!(state.row_at(area.x + 4, area.y + 5), None);
        assert_eq!(state.row_at(area.x + area.width, area.y + 2), None);
    }
}
