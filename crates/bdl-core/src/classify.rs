//! Per-object decision: skip, download fresh, resume, or promote a finished temp file.
//!
//! `classify` is pure. The controller gathers the local file sizes and the
//! resume entry, and acts on the returned `Decision`.

use crate::listing::ObjectRecord;
use crate::resume_db::ResumeEntry;

/// Key suffix allow-list. Empty means every key is allowed.
#[derive(Debug, Clone, Default)]
pub struct SuffixFilter {
    suffixes: Vec<String>,
}

impl SuffixFilter {
    pub fn new(suffixes: Vec<String>) -> Self {
        SuffixFilter { suffixes }
    }

    pub fn is_empty(&self) -> bool {
        self.suffixes.is_empty()
    }

    pub fn allows(&self, key: &str) -> bool {
        self.suffixes.is_empty() || self.suffixes.iter().any(|s| key.ends_with(s.as_str()))
    }
}

/// Why an object needs no transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SatisfiedReason {
    /// Recorded state and local size both match the listing.
    Unchanged,
    /// No record, but the local size equals the remote size.
    SizeMatch,
}

/// Why an object is downloaded from offset 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshReason {
    NoLocalCopy,
    /// Final file exists but the recorded state or its size differs from the listing.
    RemoteChanged,
    /// Final file exists with no record and a different size.
    SizeMismatch,
    /// Final file exists with no record and size matching is not trusted.
    Unverified,
    /// Temp file exists but the remote mtime differs from the record.
    TempOutdated,
    /// Temp file exists with no record.
    TempUntracked,
    /// Temp file is empty; nothing to resume from.
    TempEmpty,
}

/// What to do with one listed object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    SkipFiltered,
    SkipSatisfied(SatisfiedReason),
    /// Temp file already holds the whole object; rename it into place.
    PromoteTemp,
    Fresh(FreshReason),
    /// Continue the temp file with a byte-range request from `offset`.
    Resume { offset: u64 },
}

impl Decision {
    /// True when the object must go through the worker pool.
    pub fn needs_transfer(&self) -> bool {
        matches!(self, Decision::Fresh(_) | Decision::Resume { .. })
    }
}

/// Rules that are configurable per run.
#[derive(Debug, Clone)]
pub struct ClassifyPolicy {
    pub suffixes: SuffixFilter,
    /// Treat "no record, same size" as satisfied.
    pub trust_size_match: bool,
}

impl Default for ClassifyPolicy {
    fn default() -> Self {
        ClassifyPolicy {
            suffixes: SuffixFilter::default(),
            trust_size_match: true,
        }
    }
}

/// Local facts about one object. Sizes are `None` when the file does not exist.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalState {
    pub final_size: Option<u64>,
    pub temp_size: Option<u64>,
    pub entry: Option<ResumeEntry>,
}

pub fn classify(record: &ObjectRecord, local: &LocalState, policy: &ClassifyPolicy) -> Decision {
    if !policy.suffixes.allows(&record.key) {
        return Decision::SkipFiltered;
    }

    if let Some(final_size) = local.final_size {
        return match local.entry {
            Some(entry) => {
                if entry.mtime == record.mtime
                    && entry.size == record.size
                    && final_size == record.size
                {
                    Decision::SkipSatisfied(SatisfiedReason::Unchanged)
                } else {
                    Decision::Fresh(FreshReason::RemoteChanged)
                }
            }
            None if final_size != record.size => Decision::Fresh(FreshReason::SizeMismatch),
            None if policy.trust_size_match => Decision::SkipSatisfied(SatisfiedReason::SizeMatch),
            None => Decision::Fresh(FreshReason::Unverified),
        };
    }

    if let Some(temp_size) = local.temp_size {
        return match local.entry {
            Some(entry) if entry.mtime == record.mtime => {
                if temp_size >= record.size {
                    Decision::PromoteTemp
                } else if temp_size == 0 {
                    Decision::Fresh(FreshReason::TempEmpty)
                } else {
                    Decision::Resume { offset: temp_size }
                }
            }
            Some(_) => Decision::Fresh(FreshReason::TempOutdated),
            None => Decision::Fresh(FreshReason::TempUntracked),
        };
    }

    Decision::Fresh(FreshReason::NoLocalCopy)
}
