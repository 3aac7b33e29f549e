//! Selection builder.
//!
//! Renders the relation-aware field selection handed to the backend client:
//! `*` for the root table's own columns, one embed per required relation
//! (`rel!inner(*)` for mandatory joins, `rel(*)` otherwise), then any extra
//! fields verbatim. Names come from the domain map and are not escaped.

use super::relations::RequiredRelations;

const SEPARATOR: &str = ", ";

/// Build the select string for a query rooted at `root_table`.
///
/// The root table itself is implied by the query target; it only scopes
/// which relations were collected.
pub fn build_selection(
    root_table: &str,
    required: &RequiredRelations,
    extra_fields: &[String],
) -> String {
    let mut parts = Vec::with_capacity(1 + required.relations.len() + extra_fields.len());
    parts.push("*".to_string());

    for relation in &required.relations {
        if required.is_inner(relation) {
            parts.push(format!("{relation}!inner(*)"));
        } else {
            parts.push(format!("{relation}(*)"));
        }
    }

    parts.extend(extra_fields.iter().cloned());

    tracing::trace!(root_table, embeds = required.relations.len(), "selection built");
    parts.join(SEPARATOR)
}
