//! Filter query pipeline.
//!
//! Runs validation, relation analysis, selection building and filter
//! compilation for one root table, producing everything the backend client
//! needs to execute the query.

use serde::Serialize;

use super::compiler::FilterCompiler;
use super::domain_map::DomainMap;
use super::relations::analyze;
use super::selection::build_selection;
use super::types::FilterGroup;
use super::validator::{DEFAULT_MAX_DEPTH, ValidationError, Validator};

/// Output of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    /// Relation-aware field selection.
    pub select: String,
    /// Filter string; empty when nothing filters.
    pub filter: String,
    /// Validation diagnostics. The strings above are best-effort when non-empty.
    pub errors: Vec<ValidationError>,
}

impl CompiledQuery {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Request parameters for the backend: `select`, plus `or` when filtering.
    ///
    /// Values are not URL-encoded.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("select", self.select.clone())];
        if !self.filter.is_empty() {
            params.push(("or", format!("({})", self.filter)));
        }
        params
    }
}

/// Builder for compiling filter trees against one root table.
#[derive(Debug, Clone)]
pub struct FilterQuery<'a> {
    map: &'a DomainMap,
    root_table: String,
    extra_fields: Vec<String>,
    max_depth: usize,
}

impl<'a> FilterQuery<'a> {
    pub fn new(map: &'a DomainMap, root_table: impl Into<String>) -> Self {
        Self {
            map,
            root_table: root_table.into(),
            extra_fields: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Extra selection entries appended after the relation embeds.
    pub fn with_extra_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Validate and compile `ast`. Compilation runs even when validation fails.
    pub fn compile(&self, ast: &FilterGroup) -> CompiledQuery {
        let errors = Validator::new(self.map, &self.root_table)
            .with_max_depth(self.max_depth)
            .validate(ast);
        if !errors.is_empty() {
            tracing::warn!(
                root_table = %self.root_table,
                errors = errors.len(),
                "compiling filter that failed validation"
            );
        }

        let required = analyze(self.map, ast, &self.root_table);
        let select = build_selection(&self.root_table, &required, &self.extra_fields);
        let filter = FilterCompiler::new(self.map, &self.root_table).compile(ast);

        CompiledQuery {
            select,
            filter,
            errors,
        }
    }
}
