//! Regression tests for the `eventdoc` binary.
//!
//! Fixture catalogs live under `tests/fixtures/` at the workspace root.

#[cfg(test)]
pub mod cli;
