//! Pagination engines
//!
//! Two pagination idioms exist across the Square API:
//! - v2 endpoints carry an opaque `cursor` in the request/response body
//! - v1 endpoints carry a `batch_token` inside the response `link` header
//!
//! Both pagers yield `Batch` values one page at a time. Persisting the
//! batch's cursor and resuming with it later reproduces the remaining
//! sequence with no gaps or duplicate pages.

mod pagers;
mod types;

pub use pagers::{get_batch_token_from_headers, BatchTokenPager, BodyCursorPager, RequestStyle};
pub use types::{Batch, Cursor};
