//! CLI command implementations for multifold.
//!
//! - [`fold`] - Fold sequence records (MFE, partition function, dimers, concentrations)
//! - [`conc`] - Equilibrium concentrations from known dimer free energies

#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::struct_excessive_bools,
    clippy::uninlined_format_args
)]

pub mod command;
pub mod common;
pub mod conc;
pub mod fold;
