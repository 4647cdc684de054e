//! Progress tracking for folded records.
//!
//! Workers report every finished record together with its length; the tracker logs
//! a line whenever the record count crosses a multiple of the interval. Record
//! lengths vary by orders of magnitude, so the nucleotide total is logged alongside.

use log::info;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::logging::format_count;

/// Thread-safe progress tracker counting records and nucleotides.
///
/// # Example
/// ```
/// use multifold_lib::progress::ProgressTracker;
///
/// let tracker = ProgressTracker::new("Folded").with_interval(2);
/// tracker.record(120); // no log
/// tracker.record(80);  // logs "Folded 2 records (200 nt)"
/// tracker.record(40);
/// tracker.log_final(); // logs "Folded 3 records (240 nt, complete)"
/// assert_eq!(tracker.records(), 3);
/// assert_eq!(tracker.nucleotides(), 240);
/// ```
pub struct ProgressTracker {
    /// Progress is logged when the record count crosses multiples of this.
    interval: u64,
    /// Message prefix for log output.
    message: String,
    records: AtomicU64,
    nucleotides: AtomicU64,
}

impl ProgressTracker {
    /// Create a tracker with the default interval of 1,000 records.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            interval: 1_000,
            message: message.into(),
            records: AtomicU64::new(0),
            nucleotides: AtomicU64::new(0),
        }
    }

    /// Set the logging interval (in records, at least 1).
    #[must_use]
    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = interval.max(1);
        self
    }

    /// Counts one finished record of `length` nucleotides.
    ///
    /// Returns `true` if this record completed an interval and was logged.
    pub fn record(&self, length: u64) -> bool {
        let nucleotides = self.nucleotides.fetch_add(length, Ordering::Relaxed) + length;
        let records = self.records.fetch_add(1, Ordering::Relaxed) + 1;
        if records % self.interval == 0 {
            info!(
                "{} {} records ({} nt)",
                self.message,
                format_count(records),
                format_count(nucleotides)
            );
            return true;
        }
        false
    }

    /// Logs the final count unless the last record already landed on an interval.
    pub fn log_final(&self) {
        let records = self.records();
        if records > 0 && records % self.interval != 0 {
            info!(
                "{} {} records ({} nt, complete)",
                self.message,
                format_count(records),
                format_count(self.nucleotides())
            );
        }
    }

    /// Records counted so far.
    #[must_use]
    pub fn records(&self) -> u64 {
        self.records.load(Ordering::Relaxed)
    }

    /// Nucleotides counted so far.
    #[must_use]
    pub fn nucleotides(&self) -> u64 {
        self.nucleotides.load(Ordering::Relaxed)
    }
}
