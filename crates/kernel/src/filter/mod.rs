//! Declarative filter compiler.
//!
//! This module provides:
//! - DomainMap: static registry of filterable fields
//! - parse_filter: JSON wire form of a filter tree
//! - Types: FilterGroup, FilterRule, FilterNode, Operator, FieldType, FilterValue
//! - Validator: structural and type checks with accumulated diagnostics
//! - analyze / build_selection: relation embeds for the backend select
//! - FilterCompiler: lowering to the backend filter-string grammar
//! - FilterQuery: the whole pipeline for one root table

mod builtin;
pub mod compiler;
pub mod domain_map;
mod parser;
pub mod query;
pub mod relations;
pub mod selection;
pub mod types;
pub mod validator;

pub use compiler::{FilterCompiler, compile};
pub use domain_map::{DomainMap, DomainMapError, FieldDefinition};
pub use parser::{MAX_FILTER_JSON_SIZE, parse_filter};
pub use query::{CompiledQuery, FilterQuery};
pub use relations::{RequiredRelations, analyze};
pub use selection::build_selection;
pub use types::{
    Combinator, DateValue, FieldType, FilterAst, FilterGroup, FilterNode, FilterRule, FilterValue,
    Operator,
};
pub use validator::{DEFAULT_MAX_DEPTH, ValidationError, Validator, is_valid, validate};
