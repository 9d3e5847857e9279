//! Download job controller.
//!
//! Reads the listing snapshot, classifies every object against local files and
//! the resume store, records intent in the store, and feeds transfers to the
//! worker pool: listing -> classify -> resume store -> pool -> transfer.

mod counters;
mod progress;
mod run;

pub use counters::{Counters, DownloadReport};
pub use progress::ObjectProgress;
pub use run::{run_download, JobContext};
