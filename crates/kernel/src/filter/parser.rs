//! Filter parsing
//!
//! Parses the JSON wire form of a filter tree.

use crate::error::{Error, Result};

use super::types::FilterAst;

/// Maximum size of filter JSON in bytes (64KB)
pub const MAX_FILTER_JSON_SIZE: usize = 64 * 1024;

/// Parse a filter tree from JSON.
///
/// Only the shape is checked here; run the validator for field and value checks.
pub fn parse_filter(json_str: &str) -> Result<FilterAst> {
    if json_str.len() > MAX_FILTER_JSON_SIZE {
        return Err(Error::FilterTooLarge {
            max: MAX_FILTER_JSON_SIZE,
        });
    }

    Ok(serde_json::from_str(json_str)?)
}
