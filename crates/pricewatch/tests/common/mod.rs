//! Shared utilities for pricewatch integration tests.
//!
//! - `TestHarness`: an isolated module root in a temp directory
//! - builders for the worker's output documents

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
