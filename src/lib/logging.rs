//! Logging utilities for formatted output.
//!
//! Consistent formatting of counts, durations and rates, an operation timer, and
//! the summary logged at the end of a run.

use std::time::{Duration, Instant};

use crate::dispatch::RunSummary;

/// Formats a count with thousands separators.
///
/// # Examples
///
/// ```
/// use multifold_lib::logging::format_count;
///
/// assert_eq!(format_count(0), "0");
/// assert_eq!(format_count(999), "999");
/// assert_eq!(format_count(1_234_567), "1,234,567");
/// ```
#[must_use]
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Formats a duration in human-readable form.
///
/// # Examples
///
/// ```
/// use multifold_lib::logging::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_millis(250)), "0.25s");
/// assert_eq!(format_duration(Duration::from_secs(45)), "45s");
/// assert_eq!(format_duration(Duration::from_secs(135)), "2m 15s");
/// assert_eq!(format_duration(Duration::from_secs(5400)), "1h 30m");
/// ```
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs == 0 {
        format!("{:.2}s", duration.as_secs_f64())
    } else if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        let mins = secs / 60;
        let remaining_secs = secs % 60;
        if remaining_secs == 0 { format!("{mins}m") } else { format!("{mins}m {remaining_secs}s") }
    } else {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        if mins == 0 { format!("{hours}h") } else { format!("{hours}h {mins}m") }
    }
}

/// Formats a rate of `unit` per second, or per minute for slow rates.
///
/// # Examples
///
/// ```
/// use multifold_lib::logging::format_rate;
/// use std::time::Duration;
///
/// assert_eq!(format_rate(1000, Duration::from_secs(1), "records"), "1,000 records/s");
/// assert_eq!(format_rate(30, Duration::from_secs(60), "records"), "30.0 records/min");
/// ```
#[must_use]
pub fn format_rate(count: u64, duration: Duration, unit: &str) -> String {
    let secs = duration.as_secs_f64();
    if secs < 0.001 {
        return format!("{} {unit}/s", format_count(count));
    }

    let rate = count as f64 / secs;
    if rate >= 1.0 {
        format!("{} {unit}/s", format_count(rate as u64))
    } else {
        let per_min = count as f64 / (secs / 60.0);
        format!("{per_min:.1} {unit}/min")
    }
}

/// Logs the summary of a finished (or aborted) run.
pub fn log_run_summary(summary: &RunSummary) {
    log::info!("Run Summary:");
    log::info!("  Records folded: {}", format_count(summary.records));
    log::info!("  Nucleotides: {}", format_count(summary.nucleotides));
    if summary.malformed > 0 {
        log::info!("  Malformed records skipped: {}", format_count(summary.malformed));
    }
    log::info!("  Outputs written: {}", format_count(summary.flushed));
    log::info!("  Peak concurrent records: {}", summary.peak_in_flight);
    if !summary.skipped_inputs.is_empty() {
        log::info!("  Skipped inputs: {}", summary.skipped_inputs.join(", "));
    }
}

/// Operation timing helper.
///
/// # Examples
///
/// ```no_run
/// use multifold_lib::logging::OperationTimer;
///
/// let timer = OperationTimer::new("Folding records");
///
/// // ... do work ...
///
/// timer.log_completion(10_000);
/// ```
pub struct OperationTimer {
    operation: String,
    start_time: Instant,
}

impl OperationTimer {
    /// Creates a new operation timer and logs the start.
    #[must_use]
    pub fn new(operation: &str) -> Self {
        log::info!("{operation} ...");
        Self { operation: operation.to_string(), start_time: Instant::now() }
    }

    /// Time since the timer was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Logs the completion with record count and rate.
    pub fn log_completion(&self, count: u64) {
        let duration = self.elapsed();
        log::info!(
            "{} completed: {} records in {} ({})",
            self.operation,
            format_count(count),
            format_duration(duration),
            format_rate(count, duration, "records")
        );
    }
}
