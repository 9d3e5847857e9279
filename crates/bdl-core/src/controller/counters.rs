//! Run-wide counters shared with the workers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters updated by the controller and concurrently by workers.
#[derive(Debug, Default)]
pub struct Counters {
    total: AtomicU64,
    satisfied: AtomicU64,
    success: AtomicU64,
    resumed: AtomicU64,
    failure: AtomicU64,
    filtered: AtomicU64,
}

impl Counters {
    pub fn set_total(&self, n: u64) {
        self.total.store(n, Ordering::Relaxed);
    }

    pub fn add_satisfied(&self) {
        self.satisfied.fetch_add(1, Ordering::Relaxed);
    }

    /// A transfer succeeded; `resumed` when it continued a temp file.
    pub fn add_success(&self, resumed: bool) {
        self.success.fetch_add(1, Ordering::Relaxed);
        if resumed {
            self.resumed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn add_failure(&self) {
        self.failure.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_filtered(&self) {
        self.filtered.fetch_add(1, Ordering::Relaxed);
    }

    /// Read the final values. Only meaningful once every task has finished.
    pub fn report(&self, duration: Duration) -> DownloadReport {
        DownloadReport {
            total: self.total.load(Ordering::Acquire),
            satisfied: self.satisfied.load(Ordering::Acquire),
            success: self.success.load(Ordering::Acquire),
            resumed: self.resumed.load(Ordering::Acquire),
            failure: self.failure.load(Ordering::Acquire),
            filtered: self.filtered.load(Ordering::Acquire),
            duration,
        }
    }
}

/// Final accounting for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    pub total: u64,
    /// Already present locally (including promoted temp files).
    pub satisfied: u64,
    pub success: u64,
    /// Subset of `success` that continued a partial temp file.
    pub resumed: u64,
    pub failure: u64,
    /// Skipped by the suffix allow-list.
    pub filtered: u64,
    pub duration: Duration,
}

impl DownloadReport {
    pub fn has_failures(&self) -> bool {
        self.failure > 0
    }

    pub fn log(&self) {
        tracing::info!("-------Download Result-------");
        tracing::info!("{:>10}{:>10}", "Total:", self.total);
        tracing::info!("{:>10}{:>10}", "Exists:", self.satisfied);
        tracing::info!("{:>10}{:>10}", "Success:", self.success);
        tracing::info!("{:>10}{:>10}", "Update:", self.resumed);
        tracing::info!("{:>10}{:>10}", "Failure:", self.failure);
        tracing::info!("{:>10}{:>10}", "Filtered:", self.filtered);
        tracing::info!("{:>10}{:>15}", "Duration:", format!("{:.3?}", self.duration));
        tracing::info!("-----------------------------");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn counts_from_many_threads() {
        let counters = Arc::new(Counters::default());
        counters.set_total(400);
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let c = Arc::clone(&counters);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        if i % 2 == 0 {
                            c.add_success(i == 0);
                        } else {
                            c.add_failure();
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let report = counters.report(Duration::from_secs(1));
        assert_eq!(report.total, 400);
        assert_eq!(report.success, 200);
        assert_eq!(report.resumed, 100);
        assert_eq!(report.failure, 200);
        assert!(report.has_failures());
    }

    #[test]
    fn clean_report() {
        let counters = Counters::default();
        counters.set_total(3);
        counters.add_satisfied();
        counters.add_filtered();
        counters.add_success(false);
        let report = counters.report(Duration::ZERO);
        assert_eq!(report.satisfied, 1);
        assert_eq!(report.filtered, 1);
        assert_eq!(report.success, 1);
        assert!(!report.has_failures());
    }
}
