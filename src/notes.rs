//! Note and note-state store.
//!
//! A note's editor content lives in a separate `note_states` row. Creating a
//! note writes the state first, then the note pointing at it, then patches
//! the state's back-reference; all three writes share one transaction so a
//! state row without its note is never visible.

use crate::db::NotesError;
use crate::models::{Note, NoteSettings, NoteState};
use rusqlite::{Connection, OptionalExtension};

pub(crate) const NOTE_COLUMNS: &str = "n.id, n.author, n.name, n.body, n.labels, n.image, n.state_id, \
     n.pinned, n.shared, n.permissions, n.background_color, n.created_at, n.updated_at";

/// Input for [`create_note`].
#[derive(Debug, Default, Clone)]
pub struct NewNote {
    pub author: String,
    pub name: String,
    pub body: String,
    pub image: Option<String>,
    /// Opaque serialized editor content.
    pub state: String,
    pub background_color: Option<String>,
}

/// Fields a content edit may change. `None` keeps the stored value.
#[derive(Debug, Default, Clone)]
pub struct NoteEdit {
    pub name: Option<String>,
    pub body: Option<String>,
    pub image: Option<String>,
    pub state: Option<String>,
}

/// Decode a JSON text column, reporting failures as a column conversion error.
pub(crate) fn json_column<T: serde::de::DeserializeOwned>(
    row: &rusqlite::Row,
    idx: usize,
) -> Result<T, rusqlite::Error> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

/// Map a rusqlite Row to a Note. Expects columns in `NOTE_COLUMNS` order.
pub(crate) fn row_to_note(row: &rusqlite::Row) -> Result<Note, rusqlite::Error> {
    Ok(Note {
        id: row.get(0)?,
        author: row.get(1)?,
        name: row.get(2)?,
        body: row.get(3)?,
        labels: json_column(row, 4)?,
        image: row.get(5)?,
        state: row.get(6)?,
        settings: NoteSettings {
            pinned: row.get(7)?,
            shared: row.get(8)?,
            permissions: json_column(row, 9)?,
            note_background_color: row.get(10)?,
        },
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn not_found(id: &str) -> NotesError {
    NotesError::NotFound(format!("Note with ID '{}' not found", id))
}

/// Creates a note together with its state row.
pub fn create_note(conn: &Connection, new: &NewNote) -> Result<Note, NotesError> {
    let note_id = uuid::Uuid::new_v4().to_string();
    let state_id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO note_states (id, state, note_id, created_at, updated_at) VALUES (?1, ?2, NULL, ?3, ?3)",
        rusqlite::params![state_id, new.state, now],
    )?;

    tx.execute(
        "INSERT INTO notes (id, author, name, body, labels, image, state_id, pinned, shared, permissions,
                            background_color, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, '[]', ?5, ?6, 0, 0, '[]', ?7, ?8, ?8)",
        rusqlite::params![
            note_id,
            new.author,
            new.name,
            new.body,
            new.image,
            state_id,
            new.background_color,
            now
        ],
    )?;

    tx.execute(
        "UPDATE note_states SET note_id = ?1 WHERE id = ?2",
        rusqlite::params![note_id, state_id],
    )?;

    tx.commit()?;
    log::debug!("created note {} (state {}) for {}", note_id, state_id, new.author);

    Ok(Note {
        id: note_id,
        author: new.author.clone(),
        name: new.name.clone(),
        body: new.body.clone(),
        labels: vec![],
        image: new.image.clone(),
        state: state_id,
        settings: NoteSettings {
            note_background_color: new.background_color.clone(),
            ..NoteSettings::default()
        },
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Retrieves the stored note record, label ids unresolved.
///
/// # Errors
/// Returns `NotesError::NotFound` if no note with the given id exists.
pub fn get_note_record(conn: &Connection, id: &str) -> Result<Note, NotesError> {
    let sql = format!("SELECT {} FROM notes n WHERE n.id = ?1", NOTE_COLUMNS);
    conn.query_row(&sql, [id], row_to_note)
        .optional()?
        .ok_or_else(|| not_found(id))
}

/// Retrieves the editor state belonging to a note.
pub fn get_note_state(conn: &Connection, note_id: &str) -> Result<NoteState, NotesError> {
    conn.query_row(
        "SELECT s.id, s.state, s.note_id, s.created_at, s.updated_at
         FROM notes n JOIN note_states s ON s.id = n.state_id
         WHERE n.id = ?1",
        [note_id],
        |row| {
            Ok(NoteState {
                id: row.get(0)?,
                state: row.get(1)?,
                note_id: row.get(2)?,
                created_at: row.get(3)?,
                updated_at: row.get(4)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| not_found(note_id))
}

/// Edits note metadata and, when `edit.state` is set, replaces the editor
/// state blob. Both rows change in one transaction.
pub fn update_note_content(conn: &Connection, id: &str, edit: &NoteEdit) -> Result<Note, NotesError> {
    let now = chrono::Utc::now().to_rfc3339();
    let tx = conn.unchecked_transaction()?;

    let rows_affected = tx.execute(
        "UPDATE notes
         SET name = COALESCE(?1, name),
             body = COALESCE(?2, body),
             image = COALESCE(?3, image),
             updated_at = ?4
         WHERE id = ?5",
        rusqlite::params![edit.name, edit.body, edit.image, now, id],
    )?;
    if rows_affected == 0 {
        return Err(not_found(id));
    }

    if let Some(ref state) = edit.state {
        tx.execute(
            "UPDATE note_states
             SET state = ?1, updated_at = ?2
             WHERE id = (SELECT state_id FROM notes WHERE id = ?3)",
            rusqlite::params![state, now, id],
        )?;
    }

    tx.commit()?;
    get_note_record(conn, id)
}

/// Renames a note.
pub fn rename_note(conn: &Connection, id: &str, name: &str) -> Result<Note, NotesError> {
    update_note_content(
        conn,
        id,
        &NoteEdit {
            name: Some(name.to_string()),
            ..Default::default()
        },
    )
}

/// Sets or clears the note background colour, leaving other settings intact.
pub fn set_background_color(conn: &Connection, id: &str, color: Option<&str>) -> Result<Note, NotesError> {
    let now = chrono::Utc::now().to_rfc3339();
    let rows_affected = conn.execute(
        "UPDATE notes SET background_color = ?1, updated_at = ?2 WHERE id = ?3",
        rusqlite::params![color, now, id],
    )?;
    if rows_affected == 0 {
        return Err(not_found(id));
    }
    get_note_record(conn, id)
}

/// Deletes a note and its editor state.
pub fn delete_note(conn: &Connection, id: &str) -> Result<(), NotesError> {
    let tx = conn.unchecked_transaction()?;

    let state_id: String = tx
        .query_row("SELECT state_id FROM notes WHERE id = ?1", [id], |row| row.get(0))
        .optional()?
        .ok_or_else(|| not_found(id))?;

    // Removes the state through its back-reference (ON DELETE CASCADE).
    tx.execute("DELETE FROM notes WHERE id = ?1", [id])?;
    // A state row whose back-reference was never written is removed here.
    tx.execute("DELETE FROM note_states WHERE id = ?1", [&state_id])?;

    tx.commit()?;
    log::debug!("deleted note {} and state {}", id, state_id);
    Ok(())
}

/// Reads a note's stored label id array.
pub(crate) fn read_label_ids(conn: &Connection, note_id: &str) -> Result<Vec<String>, NotesError> {
    let raw: String = conn
        .query_row("SELECT labels FROM notes WHERE id = ?1", [note_id], |row| row.get(0))
        .optional()?
        .ok_or_else(|| not_found(note_id))?;
    Ok(serde_json::from_str(&raw)?)
}

/// Overwrites a note's label id array.
pub(crate) fn write_label_ids(conn: &Connection, note_id: &str, ids: &[String]) -> Result<(), NotesError> {
    let now = chrono::Utc::now().to_rfc3339();
    let encoded = serde_json::to_string(ids)?;
    let rows_affected = conn.execute(
        "UPDATE notes SET labels = ?1, updated_at = ?2 WHERE id = ?3",
        rusqlite::params![encoded, now, note_id],
    )?;
    if rows_affected == 0 {
        return Err(not_found(note_id));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::open_in_memory;

    pub(crate) fn sample_note(conn: &Connection, author: &str, name: &str) -> Note {
        create_note(
            conn,
            &NewNote {
                author: author.to_string(),
                name: name.to_string(),
                state: r#"{"root":{"children":[]}}"#.to_string(),
                ..Default::default()
            },
        )
        .expect("create note")
    }

    #[test]
    fn test_create_note_links_state_both_ways() {
        let conn = open_in_memory().unwrap();
        let note = sample_note(&conn, "u1", "Groceries");

        assert!(note.labels.is_empty());
        assert!(!note.settings.pinned);

        let state = get_note_state(&conn, &note.id).unwrap();
        assert_eq!(state.id, note.state);
        assert_eq!(state.note_id.as_deref(), Some(note.id.as_str()));
        assert_eq!(state.state, r#"{"root":{"children":[]}}"#);
    }

    #[test]
    fn test_failed_create_leaves_no_orphan_state() {
        let conn = open_in_memory().unwrap();
        let first = sample_note(&conn, "u1", "First");

        // Force the note insert to fail after the state insert succeeded.
        conn.execute_batch(
            "CREATE TRIGGER reject_notes BEFORE INSERT ON notes BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .unwrap();
        let result = create_note(
            &conn,
            &NewNote {
                author: "u1".into(),
                name: "Second".into(),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(NotesError::Db(_))));

        let states: Vec<String> = conn
            .prepare("SELECT id FROM note_states")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(states, vec![first.state]);
    }

    #[test]
    fn test_get_note_record_not_found() {
        let conn = open_in_memory().unwrap();
        assert!(matches!(get_note_record(&conn, "nope"), Err(NotesError::NotFound(_))));
        assert!(matches!(get_note_state(&conn, "nope"), Err(NotesError::NotFound(_))));
    }

    #[test]
    fn test_update_note_content_replaces_state() {
        let conn = open_in_memory().unwrap();
        let note = sample_note(&conn, "u1", "Draft");

        let updated = update_note_content(
            &conn,
            &note.id,
            &NoteEdit {
                body: Some("plain text".into()),
                state: Some("{\"v\":2}".into()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(updated.name, "Draft");
        assert_eq!(updated.body, "plain text");
        assert_eq!(get_note_state(&conn, &note.id).unwrap().state, "{\"v\":2}");
    }

    #[test]
    fn test_rename_note() {
        let conn = open_in_memory().unwrap();
        let note = sample_note(&conn, "u1", "Old");
        let renamed = rename_note(&conn, &note.id, "New").unwrap();
        assert_eq!(renamed.name, "New");
        assert!(matches!(rename_note(&conn, "missing", "x"), Err(NotesError::NotFound(_))));
    }

    #[test]
    fn test_set_background_color_keeps_other_settings() {
        let conn = open_in_memory().unwrap();
        let note = sample_note(&conn, "u1", "Colourful");
        conn.execute("UPDATE notes SET pinned = 1, shared = 1 WHERE id = ?1", [&note.id])
            .unwrap();

        let updated = set_background_color(&conn, &note.id, Some("#fafafa")).unwrap();
        assert_eq!(updated.settings.note_background_color.as_deref(), Some("#fafafa"));
        assert!(updated.settings.pinned);
        assert!(updated.settings.shared);

        let cleared = set_background_color(&conn, &note.id, None).unwrap();
        assert_eq!(cleared.settings.note_background_color, None);
    }

    #[test]
    fn test_delete_note_cascades_state() {
        let conn = open_in_memory().unwrap();
        let note = sample_note(&conn, "u1", "Doomed");
        delete_note(&conn, &note.id).unwrap();

        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM note_states WHERE id = ?1", [&note.state], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
        assert!(matches!(delete_note(&conn, &note.id), Err(NotesError::NotFound(_))));
    }

    #[test]
    fn test_label_id_roundtrip_keeps_order_and_duplicates() {
        let conn = open_in_memory().unwrap();
        let note = sample_note(&conn, "u1", "Tagged");
        let ids = vec!["b".to_string(), "a".to_string(), "b".to_string()];
        write_label_ids(&conn, &note.id, &ids).unwrap();
        assert_eq!(read_label_ids(&conn, &note.id).unwrap(), ids);
    }
}
