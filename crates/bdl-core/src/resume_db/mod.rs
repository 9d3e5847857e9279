//! Per-job resume store (SQLite via sqlx).
//!
//! Maps a local absolute file path to the remote (mtime, size) the controller
//! last decided to pursue for it. Entries are written before a transfer is
//! dispatched and never rolled back, so they are a best-effort hint for the
//! next run, not a record of completed downloads.

pub mod db;
pub mod types;

pub use db::*;
pub use types::*;
