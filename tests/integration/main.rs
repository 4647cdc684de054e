//! Integration tests for multifold.
//!
//! These tests drive whole runs, from input text to the written output, through
//! the library's batch driver and through the `multifold` binary.

mod helpers;
mod test_concentrations;
mod test_error_paths;
mod test_fold_command;
mod test_ordering;
