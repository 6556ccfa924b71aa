//! Shared test utilities for udindexer integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs with temporary watch and mount roots
//! - Builders for descriptor files and scripted metadata providers

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
