//! Pin state transitions.
//!
//! On the store side pinning is a single-column update, so the background
//! colour, the sharing flag and permissions survive it. On the client side
//! notes live in one [`NoteCollection`] keyed by id; the pinned and unpinned
//! lists are views derived from it, so a note can never sit in both.

use crate::db::NotesError;
use crate::models::{Note, NoteView};
use crate::notes::get_note_record;
use crate::query::{NotesListing, PinnedNotes};
use rusqlite::Connection;
use std::collections::HashMap;

/// Sets a note's pinned flag and returns the updated record.
pub fn pin_note(conn: &Connection, note_id: &str, pinned: bool) -> Result<Note, NotesError> {
    let now = chrono::Utc::now().to_rfc3339();
    let rows_affected = conn.execute(
        "UPDATE notes SET pinned = ?1, updated_at = ?2 WHERE id = ?3",
        rusqlite::params![pinned, now, note_id],
    )?;
    if rows_affected == 0 {
        return Err(NotesError::NotFound(format!("Note with ID '{}' not found", note_id)));
    }
    log::debug!("note {} pinned={}", note_id, pinned);
    get_note_record(conn, note_id)
}

/// Notes currently loaded by a client, keyed by id.
#[derive(Debug, Default, Clone)]
pub struct NoteCollection {
    notes: HashMap<String, NoteView>,
}

impl NoteCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection from the pages of a listing.
    pub fn from_listing(listing: &NotesListing) -> Self {
        let mut collection = Self::new();
        collection.load(listing);
        collection
    }

    /// Replaces the contents with the pages of a listing.
    pub fn load(&mut self, listing: &NotesListing) {
        self.notes.clear();
        for view in &listing.notes.docs {
            self.upsert(view.clone());
        }
        if let PinnedNotes::Page(page) = &listing.pinned_notes {
            for view in &page.docs {
                self.upsert(view.clone());
            }
        }
    }

    /// Inserts a note, replacing any copy with the same id.
    pub fn upsert(&mut self, view: NoteView) {
        self.notes.insert(view.id.clone(), view);
    }

    pub fn remove(&mut self, id: &str) -> Option<NoteView> {
        self.notes.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&NoteView> {
        self.notes.get(id)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Moves a note between partitions. Returns false if the note is not
    /// loaded or already has that flag.
    pub fn set_pinned(&mut self, id: &str, pinned: bool) -> bool {
        match self.notes.get_mut(id) {
            Some(view) if view.settings.pinned != pinned => {
                view.settings.pinned = pinned;
                true
            }
            _ => false,
        }
    }

    /// Applies a store record returned by [`pin_note`] to the loaded copy.
    pub fn apply_record(&mut self, note: &Note) {
        if let Some(view) = self.notes.get_mut(&note.id) {
            view.settings = note.settings.clone();
            view.updated_at = note.updated_at.clone();
        }
    }

    pub fn pinned(&self) -> Vec<&NoteView> {
        self.partition(true)
    }

    pub fn unpinned(&self) -> Vec<&NoteView> {
        self.partition(false)
    }

    /// Notes with the given flag, most recently updated first.
    fn partition(&self, pinned: bool) -> Vec<&NoteView> {
        let mut views: Vec<&NoteView> = self
            .notes
            .values()
            .filter(|v| v.settings.pinned == pinned)
            .collect();
        views.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        views
    }
}
