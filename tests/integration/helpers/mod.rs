//! Helper utilities for integration tests.

pub mod delayed_engine;
pub mod fixtures;

pub use delayed_engine::*;
pub use fixtures::*;
