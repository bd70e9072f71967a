use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use crate::models::NoteView;
use crate::output::fit_width;

use super::app::{App, Focus, Mode, View};

/// Render the entire UI into a ratatui frame.
pub fn draw(f: &mut Frame, app: &App) {
    // Top-level vertical split: main area + status bar (+ search bar if in search mode)
    let bottom_height = if app.mode == Mode::Search { 2 } else { 1 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(bottom_height)])
        .split(f.area());

    let main_area = chunks[0];
    let bottom_area = chunks[1];

    match app.view {
        View::Partitioned => {
            let panes = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Percentage(30),
                    Constraint::Percentage(30),
                    Constraint::Percentage(40),
                ])
                .split(main_area);
            draw_list(f, app, Focus::Pinned, &app.notes.pinned(), panes[0]);
            draw_list(f, app, Focus::Others, &app.notes.unpinned(), panes[1]);
            draw_detail(f, app, panes[2]);
        }
        View::Search { .. } => {
            let panes = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(main_area);
            draw_list(f, app, app.focus, &app.visible(), panes[0]);
            draw_detail(f, app, panes[1]);
        }
    }
    draw_bottom(f, app, bottom_area);
}

/// `name  [label, label]` fitted to the pane's inner width.
fn note_line(note: &NoteView, width: usize) -> String {
    let mut text = note.name.clone();
    if let Some(first) = note.labels.first() {
        let more = note.label_array_size.saturating_sub(1);
        if more > 0 {
            text.push_str(&format!("  [{} +{}]", first.name, more));
        } else {
            text.push_str(&format!("  [{}]", first.name));
        }
    }
    fit_width(&text, width)
}

fn draw_list(f: &mut Frame, app: &App, focus: Focus, notes: &[&NoteView], area: Rect) {
    let active = app.view != View::Partitioned || app.focus == focus;
    let border_style = if active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(app.list_title(focus));

    let width = area.width.saturating_sub(2) as usize;
    let items: Vec<ListItem> = notes
        .iter()
        .enumerate()
        .map(|(i, note)| {
            let style = if active && i == app.cursor {
                Style::default()
                    .bg(Color::DarkGray)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(Span::styled(note_line(note, width), style)))
        })
        .collect();

    let list = List::new(items).block(block);
    f.render_widget(list, area);
}

fn draw_detail(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title("Note");

    let lines: Vec<Line> = app.detail_lines().into_iter().map(Line::from).collect();
    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn draw_bottom(f: &mut Frame, app: &App, area: Rect) {
    let hint_text = match app.status {
        Some(ref status) => format!("{}  |  {}", status, app.status_hint()),
        None => app.status_hint().to_string(),
    };
    let hint = Paragraph::new(Line::from(Span::styled(
        hint_text,
        Style::default().fg(Color::DarkGray),
    )));

    if app.mode == Mode::Search {
        // Split bottom area into hint line and search input
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(area);
        f.render_widget(hint, chunks[0]);

        let search_line = format!("/{}", app.search_input);
        let search = Paragraph::new(Line::from(Span::styled(
            search_line,
            Style::default().fg(Color::Yellow),
        )));
        f.render_widget(search, chunks[1]);

        // Position cursor at end of search input
        let input_width = UnicodeWidthStr::width(app.search_input.as_str()) as u16;
        f.set_cursor_position((chunks[1].x + 1 + input_width, chunks[1].y));
    } else {
        f.render_widget(hint, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::notes::tests::sample_note;
    use crate::projection::LabelProjection;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn rendered(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_draw_partitioned_view() {
        let conn = open_in_memory().unwrap();
        sample_note(&conn, "u1", "Groceries");
        let mut app = App::new("u1", 6, LabelProjection::Full);
        app.load(&conn).unwrap();

        let screen = rendered(&app);
        assert!(screen.contains("Pinned"));
        assert!(screen.contains("Others"));
        assert!(screen.contains("Groceries"));
    }

    #[test]
    fn test_draw_search_view() {
        let conn = open_in_memory().unwrap();
        sample_note(&conn, "u1", "Groceries");
        let mut app = App::new("u1", 6, LabelProjection::Full);
        app.search_input = "groc".into();
        app.submit_search(&conn).unwrap();

        let screen = rendered(&app);
        assert!(screen.contains("Search: groc"));
        assert!(!screen.contains("Pinned ["));
    }
}
