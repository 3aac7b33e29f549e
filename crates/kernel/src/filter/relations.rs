//! Relation analysis.
//!
//! Determines which relation chains a filter tree traverses for a given root
//! table, and which of those relations must be mandatory (inner) joins.
//! Best-effort: rules whose field does not resolve for the root table are
//! skipped, since the tree may not have been validated yet.

use indexmap::IndexSet;

use super::domain_map::DomainMap;
use super::types::FilterGroup;

/// Relations a query must embed, in first-use order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiredRelations {
    /// Every relation named by any used field's chain.
    pub relations: IndexSet<String>,
    /// Relations that must be inner joins (the last hop of each used chain).
    pub inner_joins: IndexSet<String>,
}

impl RequiredRelations {
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub fn is_inner(&self, relation: &str) -> bool {
        self.inner_joins.contains(relation)
    }
}

/// Walk `ast` and collect the relations its rules need.
///
/// Null-check operators get the same inner-join marking as any other
/// operator, so `isNull` on a field behind an optional relation can never
/// match rows where that relation is absent. Known limitation.
pub fn analyze(map: &DomainMap, ast: &FilterGroup, root_table: &str) -> RequiredRelations {
    let mut required = RequiredRelations::default();
    for rule in ast.iter_rules() {
        let Some(def) = map.resolve(&rule.field_id, root_table) else {
            tracing::debug!(
                field_id = %rule.field_id,
                root_table,
                "relation analysis skipped unresolved field"
            );
            continue;
        };
        for relation in &def.relation_chain {
            required.relations.insert(relation.clone());
        }
        if let Some(last) = def.owning_relation() {
            required.inner_joins.insert(last.to_string());
        }
    }
    required
}
