//! Sieve Kernel Library
//!
//! Field registry, filter validation and filter-string compilation.
//! The `sieve` binary is a command-line harness over this library.

pub mod error;
pub mod filter;

pub use error::{Error, Result};
