//! Pagination types
//!
//! The cursor is modeled as an explicit three-state type. `NotStarted`
//! forces exactly one request even when the caller supplies no resume point;
//! it is a local marker and is never transmitted to the server.

use serde_json::Value;

/// Continuation state of a paging sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// No request issued yet and no resume point supplied
    NotStarted,
    /// The next request must carry this server-issued token
    Resuming(String),
    /// The server omitted a continuation token; paging is over
    Exhausted,
}

impl Cursor {
    /// Build the starting cursor from an optional bookmark. Empty strings
    /// are treated as absent.
    pub fn resume(token: Option<String>) -> Self {
        match token {
            Some(t) if !t.is_empty() => Cursor::Resuming(t),
            _ => Cursor::NotStarted,
        }
    }

    /// Cursor state after a page whose response carried `next`
    pub fn advance(next: Option<&str>) -> Self {
        match next {
            Some(t) if !t.is_empty() => Cursor::Resuming(t.to_string()),
            _ => Cursor::Exhausted,
        }
    }

    /// True once the server has signalled the end of pagination
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Cursor::Exhausted)
    }
}

/// One page of raw records plus the cursor for the page after it
#[derive(Debug, Clone)]
pub struct Batch {
    /// Raw record objects in server order
    pub records: Vec<Value>,
    /// Continuation token to persist; `None` means this was the last page
    pub cursor: Option<String>,
}
