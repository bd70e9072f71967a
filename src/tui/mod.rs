pub mod app;
pub mod event;
pub mod ui;

use std::io;
use std::panic;
use std::time::Instant;

use crossterm::event::{self as ct_event, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use rusqlite::Connection;

use crate::db::NotesError;
use crate::projection::LabelProjection;

use self::app::App;
use self::event::{apply_action, map_key, Action};

/// RAII guard that ensures the terminal is restored on drop (including panics).
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

/// Entry point for the TUI browser. Called from main.rs on `browse` subcommand.
pub fn run_browse(
    conn: &Connection,
    author: &str,
    pinned_page_size: u32,
    projection: LabelProjection,
) -> Result<(), NotesError> {
    // Install a panic hook that restores the terminal before printing the panic.
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        let _ = disable_raw_mode();
        original_hook(info);
    }));

    let mut app = App::new(author, pinned_page_size, projection);
    app.load(conn)?;

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    const REFRESH_INTERVAL: std::time::Duration = std::time::Duration::from_secs(2);
    let mut last_refresh = Instant::now();

    loop {
        terminal.draw(|f| ui::draw(f, &app))?;

        if !app.running {
            break;
        }

        if ct_event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = ct_event::read()? {
                // Only handle key press events (not release/repeat)
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                let action = map_key(&app, key);

                // Handle the 'gg' sequence: first 'g' sets pending, second triggers jump
                if key.code == crossterm::event::KeyCode::Char('g')
                    && app.mode == app::Mode::Normal
                    && action == Action::None
                    && !app.pending_g
                {
                    app.pending_g = true;
                    continue;
                }
                app.pending_g = false;

                apply_action(&mut app, action, conn)?;
                last_refresh = Instant::now();
            }
        } else if last_refresh.elapsed() >= REFRESH_INTERVAL && app.mode == app::Mode::Normal {
            // Pick up changes made by other pinboard processes.
            app.load(conn)?;
            last_refresh = Instant::now();
        }
    }

    Ok(())
}
