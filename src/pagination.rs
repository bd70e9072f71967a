//! Page/limit pagination shared by note partitions and label listings.
//!
//! A query that can be paginated implements [`Paginated`]: it knows how to
//! count its full result set and how to fetch one window of it. [`paginate`]
//! turns a [`PageRequest`] into that window plus the result-set metadata
//! (`totalDocs`, `totalPages`, `hasNextPage`, `hasPrevPage`).

use crate::db::NotesError;
use rusqlite::Connection;
use serde::Serialize;

/// Upper bound for a caller-supplied `limit`.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Default `limit` when the caller does not pass one.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// A validated 1-based page cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Validates `page >= 1` and `1 <= limit <= MAX_PAGE_LIMIT`.
    pub fn new(page: u32, limit: u32) -> Result<Self, NotesError> {
        if page == 0 {
            return Err(NotesError::InvalidInput("Page must be 1 or greater".to_string()));
        }
        if limit == 0 || limit > MAX_PAGE_LIMIT {
            return Err(NotesError::InvalidInput(format!(
                "Limit must be between 1 and {}",
                MAX_PAGE_LIMIT
            )));
        }
        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

/// One page of results plus metadata about the whole result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub docs: Vec<T>,
    pub total_docs: u64,
    pub limit: u32,
    pub page: u32,
    pub total_pages: u64,
    pub has_prev_page: bool,
    pub has_next_page: bool,
    pub prev_page: Option<u32>,
    pub next_page: Option<u32>,
}

impl<T> Page<T> {
    pub fn from_parts(docs: Vec<T>, total_docs: u64, request: PageRequest) -> Self {
        let limit = u64::from(request.limit);
        let total_pages = total_docs.div_ceil(limit);
        let has_prev_page = request.page > 1;
        let has_next_page = u64::from(request.page) < total_pages;
        Self {
            docs,
            total_docs,
            limit: request.limit,
            page: request.page,
            total_pages,
            has_prev_page,
            has_next_page,
            prev_page: has_prev_page.then(|| request.page - 1),
            next_page: has_next_page.then(|| request.page + 1),
        }
    }
}

/// A query whose result set can be counted and windowed.
pub trait Paginated {
    type Item;

    /// Number of rows in the full result set.
    fn count(&self, conn: &Connection) -> Result<u64, NotesError>;

    /// Rows `offset..offset + limit` in the query's stable order.
    fn fetch(&self, conn: &Connection, offset: u64, limit: u32) -> Result<Vec<Self::Item>, NotesError>;
}

/// Executes `query` for the window described by `request`.
pub fn paginate<Q: Paginated>(
    conn: &Connection,
    query: &Q,
    request: PageRequest,
) -> Result<Page<Q::Item>, NotesError> {
    let total_docs = query.count(conn)?;
    let docs = if request.offset() >= total_docs {
        Vec::new()
    } else {
        query.fetch(conn, request.offset(), request.limit)?
    };
    log::debug!(
        "page {} (limit {}): {} of {} docs",
        request.page,
        request.limit,
        docs.len(),
        total_docs
    );
    Ok(Page::from_parts(docs, total_docs, request))
}

/// Client-side cursor bookkeeping for a partition.
pub struct PageCursor;

impl PageCursor {
    /// Page to refetch after an item left the partition currently shown at
    /// `page`. When that page is now empty the cursor steps back by one,
    /// never below the first page. The store never performs this correction.
    pub fn after_removal(page: u32, remaining_on_page: usize) -> u32 {
        if remaining_on_page == 0 && page > 1 {
            page - 1
        } else {
            page
        }
    }
}
