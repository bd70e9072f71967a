//! Query planner for note listings.
//!
//! A listing runs in one of two modes:
//!
//! - **Browse** (no search term): two independent pipelines, one per
//!   partition (`pinned = 0` and `pinned = 1`), each paginated on its own.
//!   The pinned partition always uses the configured fixed page size.
//! - **Search** (non-empty term): a single pipeline over all of the author's
//!   notes. A note matches when the term occurs in its name or in the name
//!   of any label it resolves to. Name matches rank first. There is no
//!   partitioning, and the pinned slot of the response is an empty object.

use crate::db::NotesError;
use crate::models::NoteView;
use crate::pagination::{paginate, Page, PageRequest, Paginated};
use crate::projection::{fetch_views, project_note, LabelProjection};
use rusqlite::{Connection, ToSql};
use serde::Serialize;

/// Page size of the pinned partition in browse mode unless configured.
pub const DEFAULT_PINNED_PAGE_SIZE: u32 = 6;

/// Which notes a pipeline selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteFilter {
    Partition { pinned: bool },
    Search { pattern: String },
}

/// One filtered, ordered note query plus the join that projects it.
#[derive(Debug, Clone)]
pub struct NotePipeline {
    author: String,
    filter: NoteFilter,
    projection: LabelProjection,
}

impl NotePipeline {
    pub fn partition(author: &str, pinned: bool, projection: LabelProjection) -> Self {
        Self {
            author: author.to_string(),
            filter: NoteFilter::Partition { pinned },
            projection,
        }
    }

    /// `term` is matched case-insensitively as a literal substring.
    pub fn search(author: &str, term: &str) -> Self {
        Self {
            author: author.to_string(),
            filter: NoteFilter::Search {
                pattern: format!("(?i){}", regex::escape(term)),
            },
            projection: LabelProjection::Full,
        }
    }

    pub fn filter(&self) -> &NoteFilter {
        &self.filter
    }

    fn where_clause(&self) -> &'static str {
        match self.filter {
            NoteFilter::Partition { pinned: false } => "n.author = :author AND n.pinned = 0",
            NoteFilter::Partition { pinned: true } => "n.author = :author AND n.pinned = 1",
            NoteFilter::Search { .. } => {
                "n.author = :author AND (n.name REGEXP :pattern OR EXISTS (
                    SELECT 1 FROM json_each(n.labels) AS sj
                    JOIN labels sl ON sl.id = sj.value
                    WHERE sl.name REGEXP :pattern))"
            }
        }
    }

    fn order_clause(&self) -> &'static str {
        match self.filter {
            NoteFilter::Partition { .. } => "n.updated_at DESC, n.id",
            NoteFilter::Search { .. } => {
                "CASE WHEN n.name REGEXP :pattern THEN 0 ELSE 1 END, n.updated_at DESC, n.id"
            }
        }
    }

    fn params<'a>(&'a self, extra: &[(&'a str, &'a dyn ToSql)]) -> Vec<(&'a str, &'a dyn ToSql)> {
        let mut params: Vec<(&str, &dyn ToSql)> = vec![(":author", &self.author as &dyn ToSql)];
        if let NoteFilter::Search { ref pattern } = self.filter {
            params.push((":pattern", pattern as &dyn ToSql));
        }
        params.extend_from_slice(extra);
        params
    }
}

impl Paginated for NotePipeline {
    type Item = NoteView;

    fn count(&self, conn: &Connection) -> Result<u64, NotesError> {
        let sql = format!("SELECT COUNT(*) FROM notes n WHERE {}", self.where_clause());
        let count: i64 = conn.query_row(&sql, self.params(&[]).as_slice(), |row| row.get(0))?;
        Ok(count as u64)
    }

    fn fetch(&self, conn: &Connection, offset: u64, limit: u32) -> Result<Vec<NoteView>, NotesError> {
        let source = format!(
            "SELECT n.id AS id, ROW_NUMBER() OVER (ORDER BY {order}) AS ord
             FROM notes n
             WHERE {filter}
             ORDER BY {order}
             LIMIT :limit OFFSET :offset",
            order = self.order_clause(),
            filter = self.where_clause(),
        );
        let offset = offset as i64;
        let params = self.params(&[(":limit", &limit as &dyn ToSql), (":offset", &offset as &dyn ToSql)]);
        fetch_views(conn, &source, &params, self.projection)
    }
}

/// The pinned slot of a listing: a page in browse mode, `{}` in search mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PinnedNotes {
    Page(Page<NoteView>),
    Unpartitioned(EmptyObject),
}

/// Serializes as `{}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct EmptyObject {}

/// Response of [`list_notes`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotesListing {
    pub notes: Page<NoteView>,
    pub pinned_notes: PinnedNotes,
}

/// Caller-side parameters of a listing.
#[derive(Debug, Clone)]
pub struct ListNotesParams {
    pub author: String,
    pub page: u32,
    pub limit: u32,
    pub pinned_page: u32,
    pub search: Option<String>,
    /// Embedded label payload for browse mode. Search mode always embeds
    /// the full set.
    pub projection: LabelProjection,
}

/// The pipelines a listing will run.
#[derive(Debug, Clone)]
pub enum QueryPlan {
    Browse {
        unpinned: NotePipeline,
        pinned: NotePipeline,
    },
    Search(NotePipeline),
}

/// Chooses browse or search mode. A blank search term means browse.
pub fn plan(params: &ListNotesParams) -> QueryPlan {
    match params.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(term) => QueryPlan::Search(NotePipeline::search(&params.author, term)),
        None => QueryPlan::Browse {
            unpinned: NotePipeline::partition(&params.author, false, params.projection),
            pinned: NotePipeline::partition(&params.author, true, params.projection),
        },
    }
}

/// Lists an author's notes according to [`plan`].
pub fn list_notes(
    conn: &Connection,
    params: &ListNotesParams,
    pinned_page_size: u32,
) -> Result<NotesListing, NotesError> {
    let request = PageRequest::new(params.page, params.limit)?;

    match plan(params) {
        QueryPlan::Browse { unpinned, pinned } => {
            let pinned_request = PageRequest::new(params.pinned_page, pinned_page_size)?;
            let notes = paginate(conn, &unpinned, request)?;
            let pinned_notes = paginate(conn, &pinned, pinned_request)?;
            Ok(NotesListing {
                notes,
                pinned_notes: PinnedNotes::Page(pinned_notes),
            })
        }
        QueryPlan::Search(pipeline) => {
            log::debug!("search listing for {}", params.author);
            Ok(NotesListing {
                notes: paginate(conn, &pipeline, request)?,
                pinned_notes: PinnedNotes::Unpartitioned(EmptyObject::default()),
            })
        }
    }
}

/// Fetches one note with its full label set.
///
/// # Errors
/// `NotFound` for an unknown id, `OwnershipMismatch` when `author` is not the
/// note's author.
pub fn get_note(conn: &Connection, id: &str, author: &str) -> Result<NoteView, NotesError> {
    let view = project_note(conn, id)?
        .ok_or_else(|| NotesError::NotFound(format!("Note with ID '{}' not found", id)))?;
    if view.author != author {
        log::warn!("user {} requested note {} owned by someone else", author, id);
        return Err(NotesError::OwnershipMismatch {
            author: author.to_string(),
        });
    }
    Ok(view)
}
