//! eventdoc library.
//!
//! Exposes the catalog check for testing purposes.
//! The main entry point is the `eventdoc` binary.

pub mod check;

pub use check::{check_catalog, CheckReport};
