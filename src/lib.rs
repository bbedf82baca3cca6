//! # square-tap
//!
//! Extraction connector for the Square commerce APIs.
//!
//! The connector refreshes its OAuth credential when it is within 22 days of
//! expiry, walks each selected stream with cursor-based pagination, retries
//! transient provider failures under a wall-clock budget, and emits
//! `RECORD`/`STATE` messages as JSON lines. Interrupted runs resume from the
//! last committed cursor.
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌─────────────┐   ┌────────────┐
//! │ Credential  │──▶│ SquareClient │──▶│   Pagers    │──▶│ SyncEngine │
//! │ refresh     │   │ retry/jitter │   │ cursor walk │   │ RECORD/STATE│
//! └─────────────┘   └──────────────┘   └─────────────┘   └────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::too_many_lines)]

/// Error types for the connector
pub mod error;

/// Tap configuration file handling
pub mod config;

/// OAuth credential lifecycle
pub mod auth;

/// HTTP client with retry and backoff
pub mod http;

/// Pagination strategies
pub mod pagination;

/// Bookmark state management
pub mod state;

/// Per-stream request builders
pub mod streams;

/// Stream orchestration and message output
pub mod sync;

/// Command-line interface
pub mod cli;

pub use config::{Environment, TapConfig};
pub use error::{Error, Result};
pub use http::{RetryPolicy, SquareClient};
pub use pagination::{Batch, Cursor};
pub use state::StateStore;
pub use sync::SyncEngine;
