use crate::db::NotesError;
use crate::models::NoteView;
use crate::pagination::{Page, PageCursor, DEFAULT_PAGE_LIMIT};
use crate::pin::{pin_note, NoteCollection};
use crate::projection::LabelProjection;
use crate::query::{list_notes, ListNotesParams, NotesListing, PinnedNotes};
use rusqlite::Connection;

/// Which partition list has the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Pinned,
    Others,
}

/// Input mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Search,
}

/// What the note lists are currently showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// Pinned and unpinned partitions, each paged on its own.
    Partitioned,
    /// One unified result list for a search term.
    Search { term: String },
}

/// Page position of one list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePosition {
    pub page: u32,
    pub total_pages: u64,
    pub total_docs: u64,
}

impl PagePosition {
    fn first() -> Self {
        Self {
            page: 1,
            total_pages: 0,
            total_docs: 0,
        }
    }

    fn update<T>(&mut self, page: &Page<T>) {
        self.total_pages = page.total_pages;
        self.total_docs = page.total_docs;
    }

    pub fn label(&self) -> String {
        format!("{}/{}", self.page, self.total_pages.max(1))
    }
}

/// The main application state for the TUI browser.
pub struct App {
    pub running: bool,
    pub author: String,
    pub pinned_page_size: u32,
    pub projection: LabelProjection,
    pub focus: Focus,
    pub mode: Mode,
    pub view: View,
    /// Every loaded note; the pinned and unpinned lists are views of it.
    pub notes: NoteCollection,
    /// Result order of the search view.
    pub search_order: Vec<String>,
    pub pinned_pos: PagePosition,
    pub others_pos: PagePosition,
    pub cursor: usize,
    pub search_input: String,
    /// Last error or confirmation shown in the status line.
    pub status: Option<String>,
    /// True if waiting for second 'g' in gg sequence.
    pub pending_g: bool,
}

impl App {
    pub fn new(author: &str, pinned_page_size: u32, projection: LabelProjection) -> Self {
        Self {
            running: true,
            author: author.to_string(),
            pinned_page_size,
            projection,
            focus: Focus::Others,
            mode: Mode::Normal,
            view: View::Partitioned,
            notes: NoteCollection::new(),
            search_order: Vec::new(),
            pinned_pos: PagePosition::first(),
            others_pos: PagePosition::first(),
            cursor: 0,
            search_input: String::new(),
            status: None,
            pending_g: false,
        }
    }

    fn params(&self) -> ListNotesParams {
        let search = match &self.view {
            View::Partitioned => None,
            View::Search { term } => Some(term.clone()),
        };
        ListNotesParams {
            author: self.author.clone(),
            page: self.others_pos.page,
            limit: DEFAULT_PAGE_LIMIT,
            pinned_page: self.pinned_pos.page,
            search,
            projection: self.projection,
        }
    }

    /// Reload the current pages from the database, keeping the cursor where
    /// possible.
    pub fn load(&mut self, conn: &Connection) -> Result<(), NotesError> {
        let listing = list_notes(conn, &self.params(), self.pinned_page_size)?;
        self.apply_listing(&listing);
        Ok(())
    }

    fn apply_listing(&mut self, listing: &NotesListing) {
        self.notes.load(listing);
        self.others_pos.update(&listing.notes);
        if let PinnedNotes::Page(ref pinned) = listing.pinned_notes {
            self.pinned_pos.update(pinned);
        }
        self.search_order = listing.notes.docs.iter().map(|n| n.id.clone()).collect();
        self.clamp_cursor();
    }

    /// Notes in the list that has the cursor, in display order.
    pub fn visible(&self) -> Vec<&NoteView> {
        match self.view {
            View::Search { .. } => self
                .search_order
                .iter()
                .filter_map(|id| self.notes.get(id))
                .collect(),
            View::Partitioned => match self.focus {
                Focus::Pinned => self.notes.pinned(),
                Focus::Others => self.notes.unpinned(),
            },
        }
    }

    pub fn selected(&self) -> Option<&NoteView> {
        self.visible().get(self.cursor).copied()
    }

    fn clamp_cursor(&mut self) {
        let len = self.visible().len();
        if len == 0 {
            self.cursor = 0;
        } else if self.cursor >= len {
            self.cursor = len - 1;
        }
    }

    /// Lines for the detail pane.
    pub fn detail_lines(&self) -> Vec<String> {
        let note = match self.selected() {
            Some(note) => note,
            None => return vec!["(no note selected)".to_string()],
        };
        let mut lines = vec![
            format!("Name:    {}", note.name),
            format!("ID:      {}", note.id),
        ];
        if note.labels.is_empty() {
            lines.push("Labels:  (none)".to_string());
        } else {
            let names: Vec<&str> = note.labels.iter().map(|l| l.name.as_str()).collect();
            lines.push(format!("Labels:  {}", names.join(", ")));
        }
        if note.label_array_size > note.labels.len() {
            lines.push(format!("         {} of {} shown", note.labels.len(), note.label_array_size));
        }
        lines.push(format!("Pinned:  {}", if note.settings.pinned { "yes" } else { "no" }));
        lines.push(format!("Updated: {}", note.updated_at));
        lines.push(String::new());
        lines.extend(note.body.lines().map(str::to_string));
        lines
    }

    // === Navigation ===

    pub fn move_cursor_down(&mut self) {
        let len = self.visible().len();
        if len > 0 && self.cursor < len - 1 {
            self.cursor += 1;
        }
    }

    pub fn move_cursor_up(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    pub fn jump_to_top(&mut self) {
        self.cursor = 0;
    }

    pub fn jump_to_bottom(&mut self) {
        let len = self.visible().len();
        if len > 0 {
            self.cursor = len - 1;
        }
    }

    /// Switch the cursor between the pinned and unpinned lists.
    pub fn toggle_focus(&mut self) {
        if self.view != View::Partitioned {
            return;
        }
        self.focus = match self.focus {
            Focus::Pinned => Focus::Others,
            Focus::Others => Focus::Pinned,
        };
        self.cursor = 0;
    }

    fn focused_pos(&mut self) -> &mut PagePosition {
        match (&self.view, self.focus) {
            (View::Partitioned, Focus::Pinned) => &mut self.pinned_pos,
            _ => &mut self.others_pos,
        }
    }

    /// Move the focused list one page forward (`forward`) or back.
    pub fn turn_page(&mut self, conn: &Connection, forward: bool) -> Result<(), NotesError> {
        let pos = self.focused_pos();
        let target = if forward {
            if u64::from(pos.page) >= pos.total_pages {
                return Ok(());
            }
            pos.page + 1
        } else {
            if pos.page <= 1 {
                return Ok(());
            }
            pos.page - 1
        };
        pos.page = target;
        self.cursor = 0;
        self.load(conn)
    }

    /// Flip the pinned flag of the selected note and refill both partitions.
    ///
    /// The note leaves the list it was in; if that empties the page the list
    /// steps back one page.
    pub fn toggle_pin(&mut self, conn: &Connection) -> Result<(), NotesError> {
        let (id, pinned) = match self.selected() {
            Some(note) => (note.id.clone(), note.settings.pinned),
            None => return Ok(()),
        };
        let record = pin_note(conn, &id, !pinned)?;
        self.notes.apply_record(&record);

        if self.view == View::Partitioned {
            let remaining = self.visible().len();
            let pos = self.focused_pos();
            pos.page = PageCursor::after_removal(pos.page, remaining);
        }
        self.status = Some(format!(
            "{} '{}'",
            if record.settings.pinned { "Pinned" } else { "Unpinned" },
            record.name
        ));
        self.load(conn)
    }

    /// Enter search mode.
    pub fn enter_search(&mut self) {
        self.mode = Mode::Search;
        self.search_input.clear();
    }

    /// Submit the search query. An empty query returns to the partitions.
    pub fn submit_search(&mut self, conn: &Connection) -> Result<(), NotesError> {
        self.mode = Mode::Normal;
        let term = self.search_input.trim().to_string();
        self.view = if term.is_empty() {
            View::Partitioned
        } else {
            View::Search { term }
        };
        self.others_pos = PagePosition::first();
        self.cursor = 0;
        self.load(conn)
    }

    /// Cancel search mode.
    pub fn cancel_search(&mut self) {
        self.mode = Mode::Normal;
        self.search_input.clear();
    }

    /// Leave the search view (Esc in normal mode).
    pub fn clear_search(&mut self, conn: &Connection) -> Result<(), NotesError> {
        if self.view == View::Partitioned {
            return Ok(());
        }
        self.view = View::Partitioned;
        self.others_pos = PagePosition::first();
        self.cursor = 0;
        self.load(conn)
    }

    pub fn list_title(&self, focus: Focus) -> String {
        match (&self.view, focus) {
            (View::Search { term }, _) => {
                format!("Search: {} [{}] ({})", term, self.others_pos.label(), self.others_pos.total_docs)
            }
            (View::Partitioned, Focus::Pinned) => {
                format!("Pinned [{}] ({})", self.pinned_pos.label(), self.pinned_pos.total_docs)
            }
            (View::Partitioned, Focus::Others) => {
                format!("Others [{}] ({})", self.others_pos.label(), self.others_pos.total_docs)
            }
        }
    }

    /// Returns the status line hint text.
    pub fn status_hint(&self) -> &'static str {
        match self.mode {
            Mode::Search => "Type query, Enter:submit, Esc:cancel",
            Mode::Normal => match self.view {
                View::Partitioned => "j/k:nav  Tab:switch list  p:pin  n/N:page  /:search  q:quit",
                View::Search { .. } => "j/k:nav  p:pin  n/N:page  Esc:back  /:search  q:quit",
            },
        }
    }
}
