//! Per-record output objects and output sinks.
//!
//! A [`RecordOutput`] holds the fully formatted data payload of one record and a
//! separate diagnostic payload (warnings). Sinks only ever receive complete
//! outputs, already ordered by the [`crate::queue::OutputQueue`].

use std::io::{self, BufWriter, Stderr, Stdout, Write};

/// The formatted result of processing one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordOutput {
    /// Sequence number of the originating record.
    pub number: u64,
    /// Data payload, newline terminated lines.
    pub data: String,
    /// Diagnostic payload, newline terminated lines.
    pub diagnostics: String,
}

impl RecordOutput {
    /// An empty output for record `number`.
    #[must_use]
    pub fn new(number: u64) -> Self {
        Self { number, data: String::new(), diagnostics: String::new() }
    }

    /// Appends a line to the data payload.
    pub fn push_line(&mut self, line: &str) {
        self.data.push_str(line);
        self.data.push('\n');
    }

    /// Appends a warning to the diagnostic payload.
    pub fn warn(&mut self, message: &str) {
        self.diagnostics.push_str("WARNING: ");
        self.diagnostics.push_str(message);
        self.diagnostics.push('\n');
    }

    /// Appends an error message to the diagnostic payload.
    pub fn error(&mut self, message: &str) {
        self.diagnostics.push_str("ERROR: ");
        self.diagnostics.push_str(message);
        self.diagnostics.push('\n');
    }

    /// True if neither payload holds anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.diagnostics.is_empty()
    }
}

/// Destination of ordered record outputs.
pub trait OutputSink: Send {
    /// Writes one record output: diagnostics first, then data.
    fn write_output(&mut self, output: &RecordOutput) -> io::Result<()>;

    /// Writes text to the data stream outside of any record (e.g. a table header).
    fn write_preamble(&mut self, text: &str) -> io::Result<()>;

    /// Flushes buffered data.
    fn flush(&mut self) -> io::Result<()>;
}

/// Sink writing data and diagnostics to two separate streams.
pub struct StreamSink<D: Write + Send, E: Write + Send> {
    data: BufWriter<D>,
    diagnostics: E,
}

impl<D: Write + Send, E: Write + Send> StreamSink<D, E> {
    /// Creates a sink over a data and a diagnostic stream.
    pub fn new(data: D, diagnostics: E) -> Self {
        Self { data: BufWriter::new(data), diagnostics }
    }

    /// Flushes and returns the underlying streams.
    ///
    /// # Errors
    ///
    /// Returns an error if buffered data cannot be written.
    pub fn into_inner(self) -> io::Result<(D, E)> {
        let data = self.data.into_inner().map_err(io::IntoInnerError::into_error)?;
        Ok((data, self.diagnostics))
    }
}

impl StreamSink<Stdout, Stderr> {
    /// Data to standard output, diagnostics to standard error.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }
}

impl<D: Write + Send, E: Write + Send> OutputSink for StreamSink<D, E> {
    fn write_output(&mut self, output: &RecordOutput) -> io::Result<()> {
        if !output.diagnostics.is_empty() {
            // Keep diagnostics next to the data they belong to on a terminal.
            self.data.flush()?;
            self.diagnostics.write_all(output.diagnostics.as_bytes())?;
            self.diagnostics.flush()?;
        }
        self.data.write_all(output.data.as_bytes())
    }

    fn write_preamble(&mut self, text: &str) -> io::Result<()> {
        self.data.write_all(text.as_bytes())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.data.flush()?;
        self.diagnostics.flush()
    }
}

/// Sink collecting everything in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySink {
    /// Sequence numbers in the order they were written.
    pub order: Vec<u64>,
    /// Concatenated data payloads (including preambles).
    pub data: String,
    /// Concatenated diagnostic payloads.
    pub diagnostics: String,
}

impl MemorySink {
    /// An empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputSink for MemorySink {
    fn write_output(&mut self, output: &RecordOutput) -> io::Result<()> {
        self.order.push(output.number);
        self.diagnostics.push_str(&output.diagnostics);
        self.data.push_str(&output.data);
        Ok(())
    }

    fn write_preamble(&mut self, text: &str) -> io::Result<()> {
        self.data.push_str(text);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Formats a number the way C's `%g` does: six significant digits, trailing zeros
/// removed, scientific notation for very small or large magnitudes.
///
/// # Examples
///
/// ```
/// use multifold_lib::output::format_general;
///
/// assert_eq!(format_general(1e-5), "1e-05");
/// assert_eq!(format_general(0.25), "0.25");
/// assert_eq!(format_general(-12.5), "-12.5");
/// assert_eq!(format_general(1234567.0), "1.23457e+06");
/// assert_eq!(format_general(0.0), "0");
/// ```
#[must_use]
pub fn format_general(value: f64) -> String {
    const PRECISION: i32 = 6;

    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let scientific = format!("{:.*e}", (PRECISION - 1) as usize, value);
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((&scientific, "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exponent.abs())
    } else {
        let decimals = (PRECISION - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') { text.trim_end_matches('0').trim_end_matches('.') } else { text }
}
