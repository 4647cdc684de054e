//! Input validation utilities
//!
//! Common validation functions for command-line parameters and file paths with
//! consistent error messages. All functions return structured errors from
//! [`crate::errors`].

use crate::errors::{MultifoldError, Result};
use std::path::Path;

/// Validate that a file exists
///
/// # Arguments
/// * `path` - Path to validate
/// * `description` - Human-readable description of the file (e.g., "Input", "Constraint")
///
/// # Errors
/// Returns an error if the file does not exist
///
/// # Example
/// ```
/// use multifold_lib::validation::validate_file_exists;
///
/// let result = validate_file_exists("/nonexistent/file.fa", "Input");
/// assert!(result.is_err());
/// ```
pub fn validate_file_exists<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path_ref = path.as_ref();
    if !path_ref.is_file() {
        return Err(MultifoldError::InvalidFileFormat {
            file_type: description.to_string(),
            path: path_ref.display().to_string(),
            reason: "File does not exist".to_string(),
        });
    }
    Ok(())
}

/// Validate that multiple files exist
///
/// # Errors
/// Returns an error for the first file that doesn't exist
pub fn validate_files_exist<P: AsRef<Path>>(files: &[(P, &str)]) -> Result<()> {
    for (path, desc) in files {
        validate_file_exists(path, desc)?;
    }
    Ok(())
}

/// Validate that a delimiter option holds exactly one character
///
/// # Errors
/// Returns an error if the value is empty or longer than one character
///
/// # Example
/// ```
/// use multifold_lib::validation::validate_delimiter;
///
/// assert_eq!(validate_delimiter("\t", "csv-delim").unwrap(), '\t');
/// assert!(validate_delimiter(";;", "csv-delim").is_err());
/// ```
pub fn validate_delimiter(value: &str, name: &str) -> Result<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(MultifoldError::InvalidParameter {
            parameter: name.to_string(),
            reason: format!("Delimiter must be a single character, got: '{value}'"),
        }),
    }
}

/// Validate that a number is finite and not negative
///
/// # Errors
/// Returns an error for negative, infinite or NaN values
///
/// # Example
/// ```
/// use multifold_lib::validation::validate_non_negative;
///
/// validate_non_negative(0.0, "mea").unwrap();
/// assert!(validate_non_negative(-0.5, "mea").is_err());
/// assert!(validate_non_negative(f64::NAN, "mea").is_err());
/// ```
pub fn validate_non_negative(value: f64, name: &str) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(MultifoldError::InvalidParameter {
            parameter: name.to_string(),
            reason: format!("Must be a non-negative number, got: {value}"),
        });
    }
    Ok(())
}
