//! Label store: CRUD over label rows owned by a user.
//!
//! Labels know nothing about notes. Deleting a label leaves every note that
//! references it untouched; the id simply stops resolving during projection.

use crate::db::NotesError;
use crate::models::{Label, LabelStyle};
use crate::pagination::{paginate, Page, PageRequest, Paginated};
use rusqlite::{Connection, OptionalExtension};

const LABEL_COLUMNS: &str = "id, user_id, name, color, font_color, style, created_at, updated_at";

/// Fields a label edit may change. `None` keeps the stored value.
#[derive(Debug, Default, Clone)]
pub struct LabelEdit {
    pub name: Option<String>,
    pub color: Option<String>,
    pub font_color: Option<String>,
    pub style: Option<LabelStyle>,
}

/// Map a rusqlite Row to a Label. Expects columns in `LABEL_COLUMNS` order,
/// starting at `offset`.
pub(crate) fn row_to_label(row: &rusqlite::Row, offset: usize) -> Result<Label, rusqlite::Error> {
    let style_str: String = row.get(offset + 5)?;
    let style = LabelStyle::from_str(&style_str).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(offset + 5, "style".to_string(), rusqlite::types::Type::Text)
    })?;
    Ok(Label {
        id: row.get(offset)?,
        user_id: row.get(offset + 1)?,
        name: row.get(offset + 2)?,
        color: row.get(offset + 3)?,
        font_color: row.get(offset + 4)?,
        style,
        created_at: row.get(offset + 6)?,
        updated_at: row.get(offset + 7)?,
    })
}

/// Creates a label for `user_id` with a generated UUID and current timestamps.
pub fn create_label(
    conn: &Connection,
    user_id: &str,
    name: &str,
    color: &str,
    font_color: &str,
    style: LabelStyle,
) -> Result<Label, NotesError> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO labels (id, user_id, name, color, font_color, style, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        rusqlite::params![id, user_id, name, color, font_color, style.as_str(), now],
    )?;
    log::debug!("created label {} for user {}", id, user_id);

    Ok(Label {
        id,
        user_id: user_id.to_string(),
        name: name.to_string(),
        color: color.to_string(),
        font_color: font_color.to_string(),
        style,
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Retrieves a label by id.
///
/// # Errors
/// Returns `NotesError::NotFound` if no label with the given id exists.
pub fn get_label(conn: &Connection, id: &str) -> Result<Label, NotesError> {
    find_label(conn, id)?.ok_or_else(|| NotesError::NotFound(format!("Label with ID '{}' not found", id)))
}

/// Like [`get_label`] but returns `None` for a missing label.
pub fn find_label(conn: &Connection, id: &str) -> Result<Option<Label>, NotesError> {
    let sql = format!("SELECT {} FROM labels WHERE id = ?1", LABEL_COLUMNS);
    let label = conn
        .query_row(&sql, [id], |row| row_to_label(row, 0))
        .optional()?;
    Ok(label)
}

/// Updates a label owned by `user_id`. Only the fields set in `edit` change.
///
/// # Errors
/// Returns `NotesError::NotFound` if the label does not exist or belongs to
/// another user.
pub fn edit_label(conn: &Connection, user_id: &str, id: &str, edit: &LabelEdit) -> Result<Label, NotesError> {
    let now = chrono::Utc::now().to_rfc3339();
    let rows_affected = conn.execute(
        "UPDATE labels
         SET name = COALESCE(?1, name),
             color = COALESCE(?2, color),
             font_color = COALESCE(?3, font_color),
             style = COALESCE(?4, style),
             updated_at = ?5
         WHERE id = ?6 AND user_id = ?7",
        rusqlite::params![
            edit.name,
            edit.color,
            edit.font_color,
            edit.style.map(|s| s.as_str()),
            now,
            id,
            user_id
        ],
    )?;

    if rows_affected == 0 {
        return Err(NotesError::NotFound(format!(
            "Label with ID '{}' not found for user '{}'",
            id, user_id
        )));
    }

    get_label(conn, id)
}

/// Deletes a label. Notes referencing it keep the id.
pub fn delete_label(conn: &Connection, id: &str) -> Result<(), NotesError> {
    let rows_affected = conn.execute("DELETE FROM labels WHERE id = ?1", [id])?;
    if rows_affected == 0 {
        return Err(NotesError::NotFound(format!("Label with ID '{}' not found", id)));
    }
    log::debug!("deleted label {}", id);
    Ok(())
}

/// Label listing for one user, optionally filtered by a name search.
pub struct LabelQuery {
    user_id: String,
    pattern: Option<String>,
}

impl LabelQuery {
    /// `search` is matched case-insensitively as a literal substring of the
    /// label name. An empty or blank search lists every label.
    pub fn new(user_id: &str, search: Option<&str>) -> Self {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("(?i){}", regex::escape(s)));
        Self {
            user_id: user_id.to_string(),
            pattern,
        }
    }
}

impl Paginated for LabelQuery {
    type Item = Label;

    fn count(&self, conn: &Connection) -> Result<u64, NotesError> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM labels WHERE user_id = ?1 AND (?2 IS NULL OR name REGEXP ?2)",
            rusqlite::params![self.user_id, self.pattern],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn fetch(&self, conn: &Connection, offset: u64, limit: u32) -> Result<Vec<Label>, NotesError> {
        let sql = format!(
            "SELECT {} FROM labels
             WHERE user_id = ?1 AND (?2 IS NULL OR name REGEXP ?2)
             ORDER BY created_at DESC, id
             LIMIT ?3 OFFSET ?4",
            LABEL_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let labels = stmt
            .query_map(
                rusqlite::params![self.user_id, self.pattern, limit, offset as i64],
                |row| row_to_label(row, 0),
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(labels)
    }
}

/// Lists a user's labels, newest first, one page at a time.
pub fn view_labels(
    conn: &Connection,
    user_id: &str,
    search: Option<&str>,
    request: PageRequest,
) -> Result<Page<Label>, NotesError> {
    paginate(conn, &LabelQuery::new(user_id, search), request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    fn work_label(conn: &Connection, user: &str) -> Label {
        create_label(conn, user, "Work", "#ff0000", "#ffffff", LabelStyle::Default).expect("create label")
    }

    #[test]
    fn test_create_and_get_label() {
        let conn = open_in_memory().unwrap();
        let label = work_label(&conn, "u1");

        assert_eq!(label.name, "Work");
        assert_eq!(label.user_id, "u1");
        assert_eq!(label.style, LabelStyle::Default);

        let fetched = get_label(&conn, &label.id).unwrap();
        assert_eq!(fetched, label);
    }

    #[test]
    fn test_get_label_not_found() {
        let conn = open_in_memory().unwrap();
        assert!(matches!(get_label(&conn, "missing"), Err(NotesError::NotFound(_))));
        assert!(find_label(&conn, "missing").unwrap().is_none());
    }

    #[test]
    fn test_edit_label_partial() {
        let conn = open_in_memory().unwrap();
        let label = work_label(&conn, "u1");

        let edit = LabelEdit {
            name: Some("Office".into()),
            style: Some(LabelStyle::Outlined),
            ..Default::default()
        };
        let updated = edit_label(&conn, "u1", &label.id, &edit).unwrap();

        assert_eq!(updated.name, "Office");
        assert_eq!(updated.style, LabelStyle::Outlined);
        assert_eq!(updated.color, "#ff0000");
        assert_eq!(updated.font_color, "#ffffff");
    }

    #[test]
    fn test_edit_label_scoped_to_owner() {
        let conn = open_in_memory().unwrap();
        let label = work_label(&conn, "u1");

        let edit = LabelEdit {
            name: Some("Hijacked".into()),
            ..Default::default()
        };
        let result = edit_label(&conn, "u2", &label.id, &edit);
        assert!(matches!(result, Err(NotesError::NotFound(_))));
        assert_eq!(get_label(&conn, &label.id).unwrap().name, "Work");
    }

    #[test]
    fn test_delete_label() {
        let conn = open_in_memory().unwrap();
        let label = work_label(&conn, "u1");
        delete_label(&conn, &label.id).unwrap();
        assert!(find_label(&conn, &label.id).unwrap().is_none());
        assert!(matches!(delete_label(&conn, &label.id), Err(NotesError::NotFound(_))));
    }

    #[test]
    fn test_view_labels_scoped_and_searchable() {
        let conn = open_in_memory().unwrap();
        work_label(&conn, "u1");
        create_label(&conn, "u1", "Homework", "#00ff00", "#000000", LabelStyle::Outlined).unwrap();
        create_label(&conn, "u1", "Groceries", "#0000ff", "#ffffff", LabelStyle::Default).unwrap();
        create_label(&conn, "u2", "Work", "#ff0000", "#ffffff", LabelStyle::Default).unwrap();

        let all = view_labels(&conn, "u1", None, PageRequest::new(1, 10).unwrap()).unwrap();
        assert_eq!(all.total_docs, 3);

        let found = view_labels(&conn, "u1", Some("WORK"), PageRequest::new(1, 10).unwrap()).unwrap();
        let mut names: Vec<_> = found.docs.iter().map(|l| l.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["Homework", "Work"]);
    }

    #[test]
    fn test_view_labels_search_is_literal() {
        let conn = open_in_memory().unwrap();
        create_label(&conn, "u1", "a.b", "#000", "#fff", LabelStyle::Default).unwrap();
        create_label(&conn, "u1", "axb", "#000", "#fff", LabelStyle::Default).unwrap();

        let found = view_labels(&conn, "u1", Some("a.b"), PageRequest::new(1, 10).unwrap()).unwrap();
        assert_eq!(found.total_docs, 1);
        assert_eq!(found.docs[0].name, "a.b");
    }

    #[test]
    fn test_view_labels_pagination() {
        let conn = open_in_memory().unwrap();
        for i in 0..5 {
            create_label(&conn, "u1", &format!("L{}", i), "#000", "#fff", LabelStyle::Default).unwrap();
        }
        let page = view_labels(&conn, "u1", Some(""), PageRequest::new(2, 2).unwrap()).unwrap();
        assert_eq!(page.docs.len(), 2);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next_page);
        assert!(page.has_prev_page);
    }
}
