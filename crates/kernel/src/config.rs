//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use sieve_kernel::filter::{DEFAULT_MAX_DEPTH, DomainMap};

/// CLI configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// YAML registry to load instead of the builtin one (SIEVE_DOMAIN_MAP).
    pub domain_map: Option<PathBuf>,

    /// Validator nesting limit (SIEVE_MAX_DEPTH, default: 3).
    pub max_depth: usize,

    /// Root table used when none is given (SIEVE_ROOT_TABLE, default: applications).
    pub root_table: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let domain_map = lookup("SIEVE_DOMAIN_MAP")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let max_depth = match lookup("SIEVE_MAX_DEPTH") {
            Some(v) => v
                .trim()
                .parse()
                .context("SIEVE_MAX_DEPTH must be a non-negative integer")?,
            None => DEFAULT_MAX_DEPTH,
        };

        let root_table = lookup("SIEVE_ROOT_TABLE")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "applications".to_string());

        Ok(Self {
            domain_map,
            max_depth,
            root_table,
        })
    }

    /// Load the configured registry, if one was configured.
    pub fn load_domain_map(&self) -> Result<Option<DomainMap>> {
        let Some(path) = &self.domain_map else {
            return Ok(None);
        };
        let map = DomainMap::from_path(path)
            .with_context(|| format!("failed to load domain map {}", path.display()))?;
        Ok(Some(map))
    }
}
