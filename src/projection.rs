//! Label join and projection: turns stored notes into [`NoteView`]s.
//!
//! A note's `labels` column is a JSON array of label ids. The join expands
//! it with `json_each` and left-joins `labels`, so a note with no labels (or
//! only ids whose label was deleted) still produces exactly one view. Rows
//! come back one per (note, array element) and are folded per note here.

use crate::db::NotesError;
use crate::labels::row_to_label;
use crate::models::{Label, Note, NoteView};
use crate::notes::{row_to_note, NOTE_COLUMNS};
use rusqlite::{Connection, ToSql};

/// How much of the joined label set a listed note embeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelProjection {
    /// Every resolved label once, in order of first appearance.
    #[default]
    Full,
    /// Only the first resolved label. Matches the legacy browse listing,
    /// where `labelArraySize` was the only hint that more labels exist.
    FirstOnly,
}

impl LabelProjection {
    fn apply(self, mut view: NoteView) -> NoteView {
        if self == LabelProjection::FirstOnly {
            view.labels.truncate(1);
        }
        view
    }
}

// Column layout of the joined query: note columns 0..=12, then the
// pre-join array length, the array index, and the label columns.
const ARRAY_SIZE_COL: usize = 13;
const ARRAY_KEY_COL: usize = 14;
const LABEL_COL: usize = 15;

fn joined_query(source: &str) -> String {
    format!(
        "SELECT {note_cols}, json_array_length(n.labels), j.key,
                l.id, l.user_id, l.name, l.color, l.font_color, l.style, l.created_at, l.updated_at
         FROM ({source}) AS p
         JOIN notes n ON n.id = p.id
         LEFT JOIN json_each(n.labels) AS j ON 1
         LEFT JOIN labels l ON l.id = j.value
         ORDER BY p.ord, j.key",
        note_cols = NOTE_COLUMNS,
        source = source,
    )
}

struct JoinedRow {
    note: Note,
    array_size: usize,
    /// Array element present but its label row is gone.
    dangling: bool,
    label: Option<Label>,
}

fn map_joined_row(row: &rusqlite::Row) -> Result<JoinedRow, rusqlite::Error> {
    let note = row_to_note(row)?;
    let array_size: i64 = row.get(ARRAY_SIZE_COL)?;
    let key: Option<i64> = row.get(ARRAY_KEY_COL)?;
    let label_id: Option<String> = row.get(LABEL_COL)?;
    let label = match label_id {
        Some(_) => Some(row_to_label(row, LABEL_COL)?),
        None => None,
    };
    Ok(JoinedRow {
        note,
        array_size: array_size.max(0) as usize,
        dangling: key.is_some() && label.is_none(),
        label,
    })
}

fn start_view(note: Note, array_size: usize) -> NoteView {
    NoteView {
        id: note.id,
        author: note.author,
        name: note.name,
        body: note.body,
        labels: Vec::new(),
        label_array_size: array_size,
        image: note.image,
        state: note.state,
        settings: note.settings,
        created_at: note.created_at,
        updated_at: note.updated_at,
    }
}

/// Folds joined rows, which arrive grouped by note, into one view per note.
fn group_rows(rows: Vec<JoinedRow>) -> Vec<NoteView> {
    let mut views: Vec<NoteView> = Vec::new();
    for row in rows {
        if row.dangling {
            log::warn!("note {} references a label that no longer exists", row.note.id);
        }
        let same_note = views.last().map_or(false, |v| v.id == row.note.id);
        if !same_note {
            views.push(start_view(row.note, row.array_size));
        }
        if let (Some(label), Some(view)) = (row.label, views.last_mut()) {
            // A repeated id in the stored array embeds its label once.
            if !view.labels.iter().any(|l| l.id == label.id) {
                view.labels.push(label);
            }
        }
    }
    views
}

/// Runs the label join over the notes selected by `source` and returns one
/// view per note in `source` order.
///
/// `source` is a query yielding `id` and `ord` columns; it may use the named
/// parameters passed in `params`.
pub(crate) fn fetch_views(
    conn: &Connection,
    source: &str,
    params: &[(&str, &dyn ToSql)],
    projection: LabelProjection,
) -> Result<Vec<NoteView>, NotesError> {
    let sql = joined_query(source);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params, map_joined_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(group_rows(rows)
        .into_iter()
        .map(|view| projection.apply(view))
        .collect())
}

/// Projects a single note with its full label set, or `None` if the note
/// does not exist.
pub fn project_note(conn: &Connection, id: &str) -> Result<Option<NoteView>, NotesError> {
    let views = fetch_views(
        conn,
        "SELECT id, 1 AS ord FROM notes WHERE id = :id",
        rusqlite::named_params! { ":id": id },
        LabelProjection::Full,
    )?;
    Ok(views.into_iter().next())
}
