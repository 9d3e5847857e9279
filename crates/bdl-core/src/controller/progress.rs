//! Per-object progress, reported as objects are classified (not as they finish).

use std::fmt;

#[derive(Debug, Clone)]
pub struct ObjectProgress {
    pub key: String,
    /// 1-based position among valid listing records.
    pub position: u64,
    pub total: u64,
}

impl ObjectProgress {
    /// Percentage of the listing reached, `None` when the total is unknown (0).
    pub fn percent(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(self.position as f64 * 100.0 / self.total as f64)
    }
}

impl fmt::Display for ObjectProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.percent() {
            Some(pct) => write!(
                f,
                "Downloading {} [{}/{}, {:.1}%] ...",
                self.key, self.position, self.total, pct
            ),
            None => write!(f, "Downloading {} ...", self.key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_with_total() {
        let p = ObjectProgress {
            key: "a/b.png".to_string(),
            position: 1,
            total: 3,
        };
        assert_eq!(p.to_string(), "Downloading a/b.png [1/3, 33.3%] ...");
    }

    #[test]
    fn line_without_total() {
        let p = ObjectProgress {
            key: "k".to_string(),
            position: 1,
            total: 0,
        };
        assert!(p.percent().is_none());
        assert_eq!(p.to_string(), "Downloading k ...");
    }
}
