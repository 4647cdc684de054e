//! Custom error types for multifold operations.
//!
//! Errors fall into three groups:
//!
//! - **Parameter / startup errors** raised while assembling the run configuration.
//! - **Run-aborting errors** raised from inside a record's pipeline (constraint
//!   mismatches, empty solution sets). These stop admission of further records.
//! - **Output contract errors** raised by the ordering queue or the sink.
//!
//! Recoverable per-record warnings are not errors; they travel in the record's
//! diagnostic payload (see [`crate::output::RecordOutput`]).

use thiserror::Error;

/// Result type alias for multifold operations
pub type Result<T> = std::result::Result<T, MultifoldError>;

/// Error type for multifold operations
#[derive(Error, Debug)]
pub enum MultifoldError {
    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// File format error
    #[error("Invalid {file_type} file '{path}': {reason}")]
    InvalidFileFormat {
        /// Type of file (e.g., "constraint", "concentration")
        file_type: String,
        /// Path to the file
        path: String,
        /// Explanation of the problem
        reason: String,
    },

    /// A file could not be opened or read
    #[error("Unable to read {file_type} file '{path}': {source}")]
    UnreadableFile {
        /// Type of file
        file_type: String,
        /// Path to the file
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// One or more input files could not be read; their remaining records were skipped
    #[error("Skipped unreadable input file(s): {}", .paths.join(", "))]
    SkippedInputs {
        /// Names of the skipped inputs
        paths: Vec<String>,
    },

    /// The strand separator of the structure constraint does not match the sequence
    #[error(
        "Sequence and structure have different cut points (sequence: {}, structure: {})",
        display_cut(.sequence),
        display_cut(.structure)
    )]
    CutPointMismatch {
        /// Length of the first strand of the sequence, if it has two strands
        sequence: Option<usize>,
        /// Length of the first strand of the constraint, if it has two strands
        structure: Option<usize>,
    },

    /// The structure constraint is longer than the sequence
    #[error("Structure constraint is too long ({constraint} > {sequence} nt)")]
    ConstraintTooLong {
        /// Constraint length
        constraint: usize,
        /// Sequence length
        sequence: usize,
    },

    /// The structure constraint could not be interpreted
    #[error("Invalid structure constraint: {reason}")]
    InvalidConstraint {
        /// Explanation of the problem
        reason: String,
    },

    /// A constraint command addresses a nucleotide outside the sequence
    #[error(
        "Constraint command '{command}' refers to position {position}, beyond sequence length {length}"
    )]
    ConstraintOutOfRange {
        /// The offending command line
        command: String,
        /// The 1-based position
        position: usize,
        /// The sequence length
        length: usize,
    },

    /// Constraints leave no admissible structure
    #[error("Supplied structure constraints create empty solution set for sequence:\n{sequence}")]
    EmptySolutionSet {
        /// The sequence that could not be folded
        sequence: String,
    },

    /// More than two strands were joined in one record
    #[error("Record {number} has {strands} strands; at most two strands are supported")]
    TooManyStrands {
        /// Sequence number of the record
        number: u64,
        /// Number of strands found
        strands: usize,
    },

    /// A concentration row sums to zero so it cannot be normalized
    #[error("Concentration row {row} has zero total mass")]
    ZeroTotalMass {
        /// 1-based row index
        row: usize,
    },

    /// The ordering queue was driven against its contract
    #[error("Sequence number {seq} {reason}")]
    OrderingViolation {
        /// The offending sequence number
        seq: u64,
        /// What went wrong
        reason: String,
    },

    /// The ordering queue was closed while reservations were outstanding
    #[error("Output queue closed with {missing} record(s) never provided (first missing: {first})")]
    IncompleteOutput {
        /// Number of reserved but never provided records
        missing: u64,
        /// The first sequence number that was never provided
        first: u64,
    },

    /// Folding a record panicked; the panic was contained and the run aborted
    #[error("Processing record {number} panicked: {message}")]
    RecordPanicked {
        /// Sequence number of the record
        number: u64,
        /// The panic message
        message: String,
    },

    /// A worker thread terminated abnormally
    #[error("Worker thread '{name}' panicked")]
    WorkerPanicked {
        /// Thread name
        name: String,
    },

    /// Writing to the output sink failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MultifoldError {
    /// True if the error aborted the run; false if only some input was skipped and
    /// everything else was processed.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::SkippedInputs { .. })
    }
}

fn display_cut(cut: &Option<usize>) -> String {
    cut.map_or_else(|| "none".to_string(), |c| (c + 1).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter() {
        let error = MultifoldError::InvalidParameter {
            parameter: "jobs".to_string(),
            reason: "must be >= 0".to_string(),
        };
        let msg = format!("{error}");
        assert!(msg.contains("Invalid parameter 'jobs'"));
        assert!(msg.contains("must be >= 0"));
    }

    #[test]
    fn test_cut_point_mismatch_uses_one_based_positions() {
        let error = MultifoldError::CutPointMismatch { sequence: Some(4), structure: None };
        let msg = format!("{error}");
        assert!(msg.contains("sequence: 5"));
        assert!(msg.contains("structure: none"));
    }

    #[test]
    fn test_empty_solution_set_names_sequence() {
        let error = MultifoldError::EmptySolutionSet { sequence: "GGGAAACCC".to_string() };
        assert!(format!("{error}").contains("GGGAAACCC"));
    }

    #[test]
    fn test_skipped_inputs_lists_paths() {
        let error =
            MultifoldError::SkippedInputs { paths: vec!["a.fa".to_string(), "b.fa".to_string()] };
        assert_eq!(format!("{error}"), "Skipped unreadable input file(s): a.fa, b.fa");
        assert!(!error.is_fatal());
        assert!(MultifoldError::ZeroTotalMass { row: 1 }.is_fatal());
    }

    #[test]
    fn test_record_panicked_is_fatal() {
        let error = MultifoldError::RecordPanicked { number: 3, message: "boom".to_string() };
        assert_eq!(format!("{error}"), "Processing record 3 panicked: boom");
        assert!(error.is_fatal());
    }
}
