//! Sieve test utilities.
//!
//! Helpers for integration testing: filter tree builders, a small registry
//! fixture and assertion utilities for validation diagnostics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value as JsonValue;
use sieve_kernel::filter::{
    Combinator, DomainMap, FieldDefinition, FieldType, FilterGroup, FilterNode, FilterRule,
    FilterValue, Operator, ValidationError,
};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id(prefix: &str) -> String {
    format!("{prefix}{}", NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

/// Create a rule with a fresh id.
pub fn rule(field_id: &str, operator: Operator, value: impl Into<FilterValue>) -> FilterNode {
    FilterNode::Rule(FilterRule::new(next_id("r"), field_id, operator, value))
}

/// Create a value-less rule (`isNull` / `isNotNull`) with a fresh id.
pub fn null_check(field_id: &str, operator: Operator) -> FilterNode {
    FilterNode::Rule(FilterRule::nullary(next_id("r"), field_id, operator))
}

/// Create a group with a fresh id.
pub fn group(combinator: Combinator, rules: impl IntoIterator<Item = FilterNode>) -> FilterGroup {
    FilterGroup {
        id: next_id("g"),
        combinator,
        rules: rules.into_iter().collect(),
    }
}

pub fn and(rules: impl IntoIterator<Item = FilterNode>) -> FilterGroup {
    group(Combinator::And, rules)
}

pub fn or(rules: impl IntoIterator<Item = FilterNode>) -> FilterGroup {
    group(Combinator::Or, rules)
}

/// Wrap a group so it can sit inside another group.
pub fn nested(group: FilterGroup) -> FilterNode {
    FilterNode::Group(group)
}

/// Chain `depth` single-child groups under a root, with one rule at the bottom.
pub fn nested_chain(depth: usize, leaf: FilterNode) -> FilterGroup {
    let mut current = and([leaf]);
    for _ in 0..depth {
        current = and([nested(current)]);
    }
    current
}

/// Parse a filter tree from its JSON wire form.
///
/// Panics on malformed input; meant for fixtures.
pub fn ast_from_json(value: JsonValue) -> FilterGroup {
    match serde_json::from_value(value) {
        Ok(ast) => ast,
        Err(e) => panic!("invalid filter fixture: {e}"),
    }
}

/// A small registry with one field of every type, rooted at `orders`,
/// plus a two-hop relation field and a field on another root table.
pub fn test_domain_map() -> DomainMap {
    let root = "orders";
    let fields = vec![
        FieldDefinition::new("order_ref", "Reference", FieldType::Text, root, "reference"),
        FieldDefinition::new("order_total", "Total", FieldType::Number, root, "total"),
        FieldDefinition::new("order_placed", "Placed", FieldType::Date, root, "placed_at"),
        FieldDefinition::new("order_paid", "Paid", FieldType::Boolean, root, "is_paid"),
        FieldDefinition::new("order_state", "State", FieldType::Enum, root, "state")
            .options(&["OPEN", "SHIPPED", "CLOSED"]),
        FieldDefinition::new(
            "customer_name",
            "Customer",
            FieldType::Text,
            root,
            "customers.name",
        )
        .via(&["customers"]),
        FieldDefinition::new(
            "customer_region",
            "Region",
            FieldType::Text,
            root,
            "customers.regions.code",
        )
        .via(&["customers", "regions"]),
        FieldDefinition::new("customer_email", "Email", FieldType::Text, "customers", "email"),
    ];
    match DomainMap::new(fields) {
        Ok(map) => map,
        Err(e) => panic!("test domain map is inconsistent: {e}"),
    }
}

/// Assert that some diagnostic message contains `needle`.
pub fn assert_has_error(errors: &[ValidationError], needle: &str) {
    assert!(
        errors.iter().any(|e| e.message.contains(needle)),
        "expected an error containing {needle:?}, got: {:?}",
        errors.iter().map(ToString::to_string).collect::<Vec<_>>()
    );
}
