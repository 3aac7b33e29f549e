//! Domain map: the field registry.
//!
//! Maps business-facing field identifiers (e.g. `application_status`) to
//! storage metadata: semantic type, storage path, relation chain, root table
//! and legal operators. Identifiers are flat tokens so callers never see the
//! storage layout.
//!
//! A map is immutable once built. Every pass takes `&DomainMap`; the builtin
//! registry lives for the whole process behind [`DomainMap::builtin`].

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::LazyLock;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::builtin;
use super::types::{FieldType, Operator};

/// Errors raised while building or loading a domain map.
#[derive(Debug, Error)]
pub enum DomainMapError {
    #[error("field definition has an empty {0}")]
    EmptyIdentifier(&'static str),

    #[error("field `{0}` allows no operators")]
    NoOperators(String),

    #[error("enum field `{0}` has no enum options")]
    MissingEnumOptions(String),

    #[error("field `{field_id}` of type {field_type} must not declare enum options")]
    UnexpectedEnumOptions {
        field_id: String,
        field_type: FieldType,
    },

    #[error("field `{field_id}` storage path `{storage_path}` does not match its relation chain ({expected})")]
    StoragePathMismatch {
        field_id: String,
        storage_path: String,
        expected: String,
    },

    #[error("field `{field_id}` is defined twice for root table `{root_table}`")]
    Duplicate {
        root_table: String,
        field_id: String,
    },

    #[error("failed to read domain map {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid domain map YAML")]
    Yaml(#[from] serde_yml::Error),
}

/// Static definition of one filterable field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    /// Business-facing identifier.
    pub id: String,

    /// Display label. Not used by compilation.
    pub label: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Dot-separated path from the root table, e.g. `agents.name`.
    pub storage_path: String,

    /// Relation hops from the root table to the owning table.
    #[serde(default)]
    pub relation_chain: Vec<String>,

    /// Entity this field is defined relative to.
    pub root_table: String,

    pub allowed_operators: Vec<Operator>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_options: Option<Vec<String>>,

    #[serde(default = "default_true")]
    pub nullable: bool,
}

fn default_true() -> bool {
    true
}

impl FieldDefinition {
    /// Field on `root_table` with the type's default operators.
    pub fn new(
        id: &str,
        label: &str,
        field_type: FieldType,
        root_table: &str,
        storage_path: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            field_type,
            storage_path: storage_path.to_string(),
            relation_chain: Vec::new(),
            root_table: root_table.to_string(),
            allowed_operators: field_type.default_operators().to_vec(),
            enum_options: None,
            nullable: true,
        }
    }

    /// Set the relation chain leading to the owning table.
    pub fn via(mut self, chain: &[&str]) -> Self {
        self.relation_chain = chain.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Replace the allowed operator set.
    pub fn operators(mut self, ops: &[Operator]) -> Self {
        self.allowed_operators = ops.to_vec();
        self
    }

    pub fn options(mut self, options: &[&str]) -> Self {
        self.enum_options = Some(options.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn allows(&self, op: Operator) -> bool {
        self.allowed_operators.contains(&op)
    }

    /// Whether `value` is one of the enum options.
    pub fn has_option(&self, value: &str) -> bool {
        self.enum_options
            .as_deref()
            .is_some_and(|opts| opts.iter().any(|o| o == value))
    }

    /// Deepest relation in the chain, if any.
    pub fn owning_relation(&self) -> Option<&str> {
        self.relation_chain.last().map(String::as_str)
    }

    fn check(&self) -> Result<(), DomainMapError> {
        if self.id.is_empty() {
            return Err(DomainMapError::EmptyIdentifier("id"));
        }
        if self.root_table.is_empty() {
            return Err(DomainMapError::EmptyIdentifier("root table"));
        }
        if self.storage_path.is_empty() {
            return Err(DomainMapError::EmptyIdentifier("storage path"));
        }
        if self.relation_chain.iter().any(String::is_empty) {
            return Err(DomainMapError::EmptyIdentifier("relation name"));
        }
        if self.allowed_operators.is_empty() {
            return Err(DomainMapError::NoOperators(self.id.clone()));
        }

        match (self.field_type, &self.enum_options) {
            (FieldType::Enum, Some(opts)) if !opts.is_empty() => {}
            (FieldType::Enum, _) => return Err(DomainMapError::MissingEnumOptions(self.id.clone())),
            (_, Some(_)) => {
                return Err(DomainMapError::UnexpectedEnumOptions {
                    field_id: self.id.clone(),
                    field_type: self.field_type,
                });
            }
            (_, None) => {}
        }

        // The path is the chain plus exactly one leaf segment.
        let leaf = if self.relation_chain.is_empty() {
            Some(self.storage_path.as_str())
        } else {
            self.storage_path
                .strip_prefix(&self.relation_chain.join("."))
                .and_then(|rest| rest.strip_prefix('.'))
        };
        match leaf {
            Some(leaf) if !leaf.is_empty() && !leaf.contains('.') => Ok(()),
            _ => Err(DomainMapError::StoragePathMismatch {
                field_id: self.id.clone(),
                storage_path: self.storage_path.clone(),
                expected: if self.relation_chain.is_empty() {
                    "a single column name".to_string()
                } else {
                    format!("`{}.<column>`", self.relation_chain.join("."))
                },
            }),
        }
    }
}

/// On-disk registry entry; operators default to the type's set.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldEntry {
    id: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(rename = "type")]
    field_type: FieldType,
    storage_path: String,
    #[serde(default)]
    relation_chain: Vec<String>,
    root_table: String,
    #[serde(default)]
    allowed_operators: Option<Vec<Operator>>,
    #[serde(default)]
    enum_options: Option<Vec<String>>,
    #[serde(default = "default_true")]
    nullable: bool,
}

impl From<FieldEntry> for FieldDefinition {
    fn from(entry: FieldEntry) -> Self {
        Self {
            label: entry.label.unwrap_or_else(|| entry.id.clone()),
            allowed_operators: entry
                .allowed_operators
                .unwrap_or_else(|| entry.field_type.default_operators().to_vec()),
            id: entry.id,
            field_type: entry.field_type,
            storage_path: entry.storage_path,
            relation_chain: entry.relation_chain,
            root_table: entry.root_table,
            enum_options: entry.enum_options,
            nullable: entry.nullable,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DomainMapFile {
    fields: Vec<FieldEntry>,
}

static BUILTIN: LazyLock<Result<DomainMap, DomainMapError>> =
    LazyLock::new(|| DomainMap::new(builtin::fields()));

static EMPTY: LazyLock<DomainMap> = LazyLock::new(DomainMap::default);

/// Immutable field registry keyed by `(root table, field id)`.
#[derive(Debug, Default)]
pub struct DomainMap {
    tables: IndexMap<String, IndexMap<String, FieldDefinition>>,
    first_root: HashMap<String, String>,
}

impl DomainMap {
    /// Build a registry, enforcing the definition invariants.
    pub fn new(definitions: Vec<FieldDefinition>) -> Result<Self, DomainMapError> {
        let mut tables: IndexMap<String, IndexMap<String, FieldDefinition>> = IndexMap::new();
        let mut first_root = HashMap::new();

        for mut def in definitions {
            def.check()?;
            dedup_operators(&mut def.allowed_operators);

            let table = tables.entry(def.root_table.clone()).or_default();
            if table.contains_key(&def.id) {
                return Err(DomainMapError::Duplicate {
                    root_table: def.root_table,
                    field_id: def.id,
                });
            }
            first_root
                .entry(def.id.clone())
                .or_insert_with(|| def.root_table.clone());
            table.insert(def.id.clone(), def);
        }

        let map = Self { tables, first_root };
        tracing::debug!(
            fields = map.len(),
            root_tables = map.tables.len(),
            "domain map built"
        );
        Ok(map)
    }

    /// The process-wide business registry.
    pub fn builtin() -> &'static DomainMap {
        match Self::try_builtin() {
            Ok(map) => map,
            Err(e) => {
                tracing::error!(error = %e, "builtin domain map is inconsistent");
                &EMPTY
            }
        }
    }

    /// The builtin registry, or the invariant it breaks.
    pub fn try_builtin() -> Result<&'static DomainMap, &'static DomainMapError> {
        BUILTIN.as_ref()
    }

    /// Parse a YAML registry (`fields:` list of entries).
    pub fn from_yaml_str(yaml: &str) -> Result<Self, DomainMapError> {
        let file: DomainMapFile = serde_yml::from_str(yaml)?;
        Self::new(file.fields.into_iter().map(FieldDefinition::from).collect())
    }

    /// Load a YAML registry from disk.
    pub fn from_path(path: &Path) -> Result<Self, DomainMapError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| DomainMapError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// First definition registered under `field_id`, whatever its root table.
    pub fn lookup(&self, field_id: &str) -> Option<&FieldDefinition> {
        let root = self.first_root.get(field_id)?;
        self.resolve(field_id, root)
    }

    /// Definition of `field_id` valid for queries rooted at `root_table`.
    pub fn resolve(&self, field_id: &str, root_table: &str) -> Option<&FieldDefinition> {
        self.tables.get(root_table)?.get(field_id)
    }

    /// Fields defined relative to `root_table`, in registration order.
    pub fn fields_for_table(&self, root_table: &str) -> impl Iterator<Item = &FieldDefinition> {
        self.tables
            .get(root_table)
            .into_iter()
            .flat_map(IndexMap::values)
    }

    pub fn root_tables(&self) -> BTreeSet<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.tables.values().flat_map(IndexMap::values)
    }

    pub fn len(&self) -> usize {
        self.tables.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn dedup_operators(ops: &mut Vec<Operator>) {
    let mut seen = BTreeSet::new();
    ops.retain(|op| seen.insert(*op));
}
