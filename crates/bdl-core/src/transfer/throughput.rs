//! Average transfer rate for log lines.

use std::fmt;
use std::time::Duration;

const MIN_ELAPSED: Duration = Duration::from_millis(1);

/// Bytes over wall-clock time. Elapsed is clamped to 1 ms so an instant
/// transfer never divides by zero.
#[derive(Debug, Clone, Copy)]
pub struct Throughput {
    pub bytes: u64,
    pub elapsed: Duration,
}

impl Throughput {
    pub fn new(bytes: u64, elapsed: Duration) -> Self {
        Throughput { bytes, elapsed }
    }

    pub fn bytes_per_sec(&self) -> f64 {
        self.bytes as f64 / self.elapsed.max(MIN_ELAPSED).as_secs_f64()
    }
}

impl fmt::Display for Throughput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}KB/s", self.bytes_per_sec() / 1024.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_over_one_second() {
        let t = Throughput::new(2048, Duration::from_secs(1));
        assert!((t.bytes_per_sec() - 2048.0).abs() < 1e-9);
        assert_eq!(t.to_string(), "2.00KB/s");
    }

    #[test]
    fn zero_elapsed_is_clamped() {
        let t = Throughput::new(1024, Duration::ZERO);
        assert!(t.bytes_per_sec().is_finite());
        assert!((t.bytes_per_sec() - 1_024_000.0).abs() < 1e-6);
    }

    #[test]
    fn zero_bytes() {
        assert_eq!(Throughput::new(0, Duration::ZERO).to_string(), "0.00KB/s");
    }
}
