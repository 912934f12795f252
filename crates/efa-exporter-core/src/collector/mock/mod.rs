//! Mock filesystem implementations for testing.
//!
//! This module provides `MockFs` and pre-built scenarios for testing
//! collectors without requiring EFA hardware or a real `/sys`.

mod filesystem;
mod scenarios;

pub use filesystem::MockFs;
