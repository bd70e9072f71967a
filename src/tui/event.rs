use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::db::NotesError;
use rusqlite::Connection;

use super::app::{App, Mode, View};

/// Semantic actions the TUI can perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    MoveDown,
    MoveUp,
    SwitchList,
    TogglePin,
    NextPage,
    PrevPage,
    JumpToTop,
    JumpToBottom,
    Refresh,
    ClearSearch,
    EnterSearch,
    SubmitSearch,
    CancelSearch,
    SearchInput(char),
    SearchBackspace,
    None,
}

/// Map a key event to a semantic action based on current mode.
pub fn map_key(app: &App, key: KeyEvent) -> Action {
    // Ctrl-C always quits
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Action::Quit;
    }

    match app.mode {
        Mode::Search => map_search_key(key),
        Mode::Normal => map_list_key(app, key),
    }
}

fn map_search_key(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Enter => Action::SubmitSearch,
        KeyCode::Esc => Action::CancelSearch,
        KeyCode::Backspace => Action::SearchBackspace,
        KeyCode::Char(c) => Action::SearchInput(c),
        _ => Action::None,
    }
}

fn map_list_key(app: &App, key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Char('j') | KeyCode::Down => Action::MoveDown,
        KeyCode::Char('k') | KeyCode::Up => Action::MoveUp,
        KeyCode::Tab | KeyCode::Char('h') | KeyCode::Char('l') | KeyCode::Left | KeyCode::Right => {
            Action::SwitchList
        }
        KeyCode::Char('p') => Action::TogglePin,
        KeyCode::Char('n') => Action::NextPage,
        KeyCode::Char('N') => Action::PrevPage,
        KeyCode::Char('r') => Action::Refresh,
        KeyCode::Char('/') => Action::EnterSearch,
        KeyCode::Esc if app.view != View::Partitioned => Action::ClearSearch,
        KeyCode::Char('G') => Action::JumpToBottom,
        KeyCode::Char('g') => {
            if app.pending_g {
                Action::JumpToTop
            } else {
                Action::None // will set pending_g
            }
        }
        _ => Action::None,
    }
}

/// Apply an action to the app state, potentially querying the database.
///
/// A failed pin is reported in the status line rather than ending the
/// session; other store errors propagate.
pub fn apply_action(app: &mut App, action: Action, conn: &Connection) -> Result<(), NotesError> {
    match action {
        Action::Quit => {
            app.running = false;
        }
        Action::MoveDown => app.move_cursor_down(),
        Action::MoveUp => app.move_cursor_up(),
        Action::SwitchList => app.toggle_focus(),
        Action::TogglePin => {
            if let Err(e) = app.toggle_pin(conn) {
                log::warn!("pin failed: {}", e);
                app.status = Some(e.to_string());
                app.load(conn)?;
            }
        }
        Action::NextPage => app.turn_page(conn, true)?,
        Action::PrevPage => app.turn_page(conn, false)?,
        Action::JumpToTop => app.jump_to_top(),
        Action::JumpToBottom => app.jump_to_bottom(),
        Action::Refresh => app.load(conn)?,
        Action::ClearSearch => app.clear_search(conn)?,
        Action::EnterSearch => app.enter_search(),
        Action::SubmitSearch => app.submit_search(conn)?,
        Action::CancelSearch => app.cancel_search(),
        Action::SearchInput(c) => app.search_input.push(c),
        Action::SearchBackspace => {
            app.search_input.pop();
        }
        Action::None => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::notes::tests::sample_note;
    use crate::projection::LabelProjection;
    use crate::tui::app::Focus;
    use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};

    fn make_key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn app() -> App {
        App::new("u1", 6, LabelProjection::Full)
    }

    #[test]
    fn test_ctrl_c_always_quits() {
        let mut app = app();
        let key = KeyEvent {
            modifiers: KeyModifiers::CONTROL,
            ..make_key(KeyCode::Char('c'))
        };
        assert_eq!(map_key(&app, key), Action::Quit);
        app.mode = Mode::Search;
        assert_eq!(map_key(&app, key), Action::Quit);
    }

    #[test]
    fn test_normal_keys() {
        let app = app();
        assert_eq!(map_key(&app, make_key(KeyCode::Char('q'))), Action::Quit);
        assert_eq!(map_key(&app, make_key(KeyCode::Char('j'))), Action::MoveDown);
        assert_eq!(map_key(&app, make_key(KeyCode::Up)), Action::MoveUp);
        assert_eq!(map_key(&app, make_key(KeyCode::Tab)), Action::SwitchList);
        assert_eq!(map_key(&app, make_key(KeyCode::Char('p'))), Action::TogglePin);
        assert_eq!(map_key(&app, make_key(KeyCode::Char('n'))), Action::NextPage);
        assert_eq!(map_key(&app, make_key(KeyCode::Char('N'))), Action::PrevPage);
        assert_eq!(map_key(&app, make_key(KeyCode::Char('/'))), Action::EnterSearch);
        assert_eq!(map_key(&app, make_key(KeyCode::Char('G'))), Action::JumpToBottom);
    }

    #[test]
    fn test_esc_only_clears_an_active_search() {
        let mut app = app();
        assert_eq!(map_key(&app, make_key(KeyCode::Esc)), Action::None);
        app.view = View::Search { term: "x".into() };
        assert_eq!(map_key(&app, make_key(KeyCode::Esc)), Action::ClearSearch);
    }

    #[test]
    fn test_search_mode_keys() {
        let mut app = app();
        app.mode = Mode::Search;
        assert_eq!(map_key(&app, make_key(KeyCode::Enter)), Action::SubmitSearch);
        assert_eq!(map_key(&app, make_key(KeyCode::Esc)), Action::CancelSearch);
        assert_eq!(map_key(&app, make_key(KeyCode::Backspace)), Action::SearchBackspace);
        // Letters that are commands in normal mode are text here.
        assert_eq!(map_key(&app, make_key(KeyCode::Char('p'))), Action::SearchInput('p'));
        assert_eq!(map_key(&app, make_key(KeyCode::F(1))), Action::None);
    }

    #[test]
    fn test_gg_sequence() {
        let mut app = app();
        assert_eq!(map_key(&app, make_key(KeyCode::Char('g'))), Action::None);
        app.pending_g = true;
        assert_eq!(map_key(&app, make_key(KeyCode::Char('g'))), Action::JumpToTop);
    }

    #[test]
    fn test_apply_action_quit() {
        let conn = open_in_memory().unwrap();
        let mut app = app();
        apply_action(&mut app, Action::Quit, &conn).unwrap();
        assert!(!app.running);
    }

    #[test]
    fn test_apply_action_switch_list() {
        let conn = open_in_memory().unwrap();
        let mut app = app();
        apply_action(&mut app, Action::SwitchList, &conn).unwrap();
        assert_eq!(app.focus, Focus::Pinned);
    }

    #[test]
    fn test_apply_action_toggle_pin() {
        let conn = open_in_memory().unwrap();
        sample_note(&conn, "u1", "Pin me");
        let mut app = app();
        app.load(&conn).unwrap();
        apply_action(&mut app, Action::TogglePin, &conn).unwrap();
        assert_eq!(app.notes.pinned().len(), 1);
    }

    #[test]
    fn test_apply_action_pin_failure_goes_to_status() {
        let conn = open_in_memory().unwrap();
        let note = sample_note(&conn, "u1", "Vanishing");
        let mut app = app();
        app.load(&conn).unwrap();
        crate::notes::delete_note(&conn, &note.id).unwrap();

        apply_action(&mut app, Action::TogglePin, &conn).unwrap();
        assert!(app.status.as_deref().unwrap_or("").contains("not found"));
        assert!(app.visible().is_empty());
    }

    #[test]
    fn test_apply_action_search_editing() {
        let conn = open_in_memory().unwrap();
        let mut app = app();
        apply_action(&mut app, Action::EnterSearch, &conn).unwrap();
        assert_eq!(app.mode, Mode::Search);
        apply_action(&mut app, Action::SearchInput('a'), &conn).unwrap();
        apply_action(&mut app, Action::SearchInput('b'), &conn).unwrap();
        apply_action(&mut app, Action::SearchBackspace, &conn).unwrap();
        assert_eq!(app.search_input, "a");
        apply_action(&mut app, Action::CancelSearch, &conn).unwrap();
        assert_eq!(app.mode, Mode::Normal);
        assert!(app.search_input.is_empty());
    }
}
