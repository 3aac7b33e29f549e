//! Filter tree validation.
//!
//! Checks structure (non-empty groups, nesting depth), field resolution for
//! the query's root table, operator legality and value shape. Every problem
//! found is reported; nothing short-circuits except that a rule whose field
//! does not resolve is not checked further, and a group past the depth limit
//! is not descended into.

use serde::Serialize;
use thiserror::Error;

use super::domain_map::{DomainMap, FieldDefinition};
use super::types::{FieldType, FilterGroup, FilterNode, FilterRule, FilterValue, parse_date};

/// Default nesting limit. The root group is depth 0.
pub const DEFAULT_MAX_DEPTH: usize = 3;

/// One validation diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("{path}: {message}")]
pub struct ValidationError {
    /// Location in the tree, e.g. `root.rules[1].rules[0]`.
    pub path: String,
    pub message: String,
    /// The offending rule or group.
    pub node: FilterNode,
}

/// Validates filter trees against one root table.
pub struct Validator<'a> {
    map: &'a DomainMap,
    root_table: &'a str,
    max_depth: usize,
}

impl<'a> Validator<'a> {
    pub fn new(map: &'a DomainMap, root_table: &'a str) -> Self {
        Self {
            map,
            root_table,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Collect every problem in `ast`. Empty means valid.
    pub fn validate(&self, ast: &FilterGroup) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        self.validate_group(ast, "root", 0, &mut errors);
        tracing::debug!(
            root_table = self.root_table,
            max_depth = self.max_depth,
            errors = errors.len(),
            "filter validated"
        );
        errors
    }

    pub fn is_valid(&self, ast: &FilterGroup) -> bool {
        self.validate(ast).is_empty()
    }

    fn validate_group(
        &self,
        group: &FilterGroup,
        path: &str,
        depth: usize,
        errors: &mut Vec<ValidationError>,
    ) {
        if depth > self.max_depth {
            errors.push(ValidationError {
                path: path.to_string(),
                message: format!("maximum nesting depth of {} exceeded", self.max_depth),
                node: FilterNode::Group(group.clone()),
            });
            return;
        }

        if group.rules.is_empty() {
            errors.push(ValidationError {
                path: path.to_string(),
                message: "group must contain at least one rule".to_string(),
                node: FilterNode::Group(group.clone()),
            });
        }

        for (i, node) in group.rules.iter().enumerate() {
            let child_path = format!("{path}.rules[{i}]");
            match node {
                FilterNode::Group(child) => {
                    self.validate_group(child, &child_path, depth + 1, errors);
                }
                FilterNode::Rule(rule) => self.validate_rule(rule, &child_path, errors),
            }
        }
    }

    fn validate_rule(&self, rule: &FilterRule, path: &str, errors: &mut Vec<ValidationError>) {
        let mut report = |message: String| {
            errors.push(ValidationError {
                path: path.to_string(),
                message,
                node: FilterNode::Rule(rule.clone()),
            });
        };

        if rule.id.trim().is_empty() {
            report("rule id is required".to_string());
        }
        if rule.field_id.trim().is_empty() {
            report("field is required".to_string());
            return;
        }

        let Some(def) = self.map.resolve(&rule.field_id, self.root_table) else {
            if self.map.lookup(&rule.field_id).is_some() {
                report(format!(
                    "field '{}' is not available on table '{}'",
                    rule.field_id, self.root_table
                ));
            } else {
                report(format!("unknown field '{}'", rule.field_id));
            }
            return;
        };

        if !def.allows(rule.operator) {
            report(format!(
                "operator '{}' is not allowed for field '{}'",
                rule.operator, rule.field_id
            ));
        }

        for message in value_problems(def, rule) {
            report(message);
        }
    }
}

/// Collect every problem in `ast` for `root_table`.
pub fn validate(
    map: &DomainMap,
    ast: &FilterGroup,
    root_table: &str,
    max_depth: usize,
) -> Vec<ValidationError> {
    Validator::new(map, root_table)
        .with_max_depth(max_depth)
        .validate(ast)
}

pub fn is_valid(map: &DomainMap, ast: &FilterGroup, root_table: &str, max_depth: usize) -> bool {
    validate(map, ast, root_table, max_depth).is_empty()
}

/// Arity and type problems of a rule's value.
fn value_problems(def: &FieldDefinition, rule: &FilterRule) -> Vec<String> {
    let op = rule.operator;
    let value = &rule.value;

    if op.is_nullary() {
        return if value.is_absent() {
            Vec::new()
        } else {
            vec![format!("operator '{op}' does not take a value")]
        };
    }
    if value.is_absent() {
        return vec![format!("operator '{op}' requires a value")];
    }

    if op.takes_list() {
        let FilterValue::List(items) = value else {
            return vec![format!("operator '{op}' requires a list of values")];
        };
        if def.field_type == FieldType::Enum {
            // Non-string members are not checked.
            return items
                .iter()
                .filter_map(FilterValue::as_str)
                .filter(|s| !def.has_option(s))
                .map(|s| invalid_option(def, s))
                .collect();
        }
        return items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| scalar_problem(def, item).map(|msg| format!("item {i}: {msg}")))
            .collect();
    }

    if matches!(value, FilterValue::List(_)) {
        return vec![format!("operator '{op}' requires a single value")];
    }
    scalar_problem(def, value).into_iter().collect()
}

fn scalar_problem(def: &FieldDefinition, value: &FilterValue) -> Option<String> {
    let expected = |what: &str| {
        Some(format!(
            "field '{}' expects {what}, got {}",
            def.id,
            value.kind()
        ))
    };

    match (def.field_type, value) {
        (FieldType::Text, FilterValue::String(_)) => None,
        (FieldType::Text, _) => expected("a text value"),

        (FieldType::Number, FilterValue::Number(n)) if n.is_finite() => None,
        (FieldType::Number, FilterValue::Number(_)) => {
            Some(format!("field '{}' expects a finite number", def.id))
        }
        (FieldType::Number, _) => expected("a number"),

        (FieldType::Date, FilterValue::Date(date)) if date.parse().is_some() => None,
        (FieldType::Date, FilterValue::String(s)) if parse_date(s).is_some() => None,
        (FieldType::Date, FilterValue::Date(date)) => Some(invalid_date(def, &date.date)),
        (FieldType::Date, FilterValue::String(s)) => Some(invalid_date(def, s)),
        (FieldType::Date, _) => expected("a date"),

        (FieldType::Boolean, FilterValue::Boolean(_)) => None,
        (FieldType::Boolean, _) => expected("a boolean"),

        (FieldType::Enum, FilterValue::String(s)) if def.has_option(s) => None,
        (FieldType::Enum, FilterValue::String(s)) => Some(invalid_option(def, s)),
        (FieldType::Enum, _) => expected("one of its options"),
    }
}

fn invalid_date(def: &FieldDefinition, text: &str) -> String {
    format!("invalid date '{text}' for field '{}'", def.id)
}

fn invalid_option(def: &FieldDefinition, value: &str) -> String {
    format!("invalid option '{value}' for field '{}'", def.id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::filter::types::{DateValue, Operator};

    fn map() -> DomainMap {
        DomainMap::new(vec![
            FieldDefinition::new("name", "Name", FieldType::Text, "t", "name"),
            FieldDefinition::new("age", "Age", FieldType::Number, "t", "age"),
            FieldDefinition::new("active", "Active", FieldType::Boolean, "t", "active"),
            FieldDefinition::new("born", "Born", FieldType::Date, "t", "born"),
            FieldDefinition::new("kind", "Kind", FieldType::Enum, "t", "kind")
                .options(&["VALID", "OTHER"]),
            FieldDefinition::new("elsewhere", "Elsewhere", FieldType::Text, "u", "x"),
        ])
        .unwrap()
    }

    fn check(rule: FilterRule) -> Vec<ValidationError> {
        let map = map();
        let ast = FilterGroup::and("root").with_rule(rule);
        Validator::new(&map, "t").validate(&ast)
    }

    fn rule(field: &str, op: Operator, value: impl Into<FilterValue>) -> FilterRule {
        FilterRule::new("r", field, op, value)
    }

    #[test]
    fn valid_rules_pass() {
        assert!(check(rule("name", Operator::Contains, "x")).is_empty());
        assert!(check(rule("age", Operator::Gt, 3.0)).is_empty());
        assert!(check(rule("active", Operator::Eq, true)).is_empty());
        assert!(check(rule("born", Operator::Lt, "2024-01-31")).is_empty());
        assert!(check(rule("kind", Operator::Eq, "VALID")).is_empty());
        assert!(check(FilterRule::nullary("r", "name", Operator::IsNull)).is_empty());
        let both = FilterValue::strings(["VALID", "OTHER"]);
        assert!(check(rule("kind", Operator::In, both)).is_empty());
    }

    #[test]
    fn empty_group_reported() {
        let map = map();
        let errors = Validator::new(&map, "t").validate(&FilterGroup::or("root"));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "root");
        assert!(errors[0].message.contains("at least one rule"));
    }

    #[test]
    fn unknown_and_foreign_fields() {
        let errors = check(rule("nope", Operator::Eq, "x"));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("unknown field 'nope'"));

        let errors = check(rule("elsewhere", Operator::Eq, "x"));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("not available on table 't'"));
    }

    #[test]
    fn missing_ids_reported() {
        let errors = check(FilterRule::new("", "name", Operator::Eq, "x"));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("rule id"));

        let errors = check(FilterRule::new("r", " ", Operator::Eq, "x"));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("field is required"));
    }

    #[test]
    fn disallowed_operator_still_checks_value() {
        let errors = check(rule("active", Operator::Contains, "yes"));
        assert_eq!(errors.len(), 2);
        assert!(errors[0].message.contains("operator 'contains' is not allowed"));
        assert!(errors[1].message.contains("expects a boolean"));
    }

    #[test]
    fn arity_checks() {
        let errors = check(rule("name", Operator::IsNotNull, "x"));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("does not take a value"));

        let errors = check(rule("name", Operator::Eq, FilterValue::Absent));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("requires a value"));

        let errors = check(rule("name", Operator::In, "x"));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("requires a list"));

        let errors = check(rule("name", Operator::Eq, FilterValue::strings(["a"])));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("single value"));
    }

    #[test]
    fn number_rejects_nan_and_strings() {
        let errors = check(rule("age", Operator::Eq, f64::NAN));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("finite number"));

        let errors = check(rule("age", Operator::Eq, "12"));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("expects a number, got string"));
    }

    #[test]
    fn date_checks() {
        let ok = FilterValue::Date(DateValue {
            date: "2024-01-31T10:00:00Z".to_string(),
        });
        assert!(check(rule("born", Operator::Gte, ok)).is_empty());

        let errors = check(rule("born", Operator::Gte, "31/01/2024"));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("invalid date '31/01/2024'"));

        let bad = FilterValue::Date(DateValue {
            date: "soon".to_string(),
        });
        assert_eq!(check(rule("born", Operator::Gte, bad)).len(), 1);

        let errors = check(rule("born", Operator::Gte, 5.0));
        assert!(errors[0].message.contains("expects a date"));
    }

    #[test]
    fn enum_membership() {
        let errors = check(rule(
            "kind",
            Operator::In,
            FilterValue::strings(["VALID", "BOGUS"]),
        ));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("'BOGUS'"));

        let errors = check(rule("kind", Operator::Neq, "BOGUS"));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("'BOGUS'"));

        // Non-string members of an enum list are not checked.
        let mixed = FilterValue::List(vec![FilterValue::from("VALID"), FilterValue::from(7.0)]);
        assert!(check(rule("kind", Operator::NotIn, mixed)).is_empty());
    }

    #[test]
    fn list_members_checked_for_non_enum_fields() {
        let errors = check(rule(
            "age",
            Operator::In,
            FilterValue::List(vec![FilterValue::from(1.0), FilterValue::from("two")]),
        ));
        // Number fields do not allow `in`, and member 1 is a string.
        assert_eq!(errors.len(), 2);
        assert!(errors[1].message.starts_with("item 1:"));
    }

    #[test]
    fn depth_limit_flags_once() {
        let map = map();
        let leaf = || rule("name", Operator::Eq, "x");
        // root(0) > g1(1) > g2(2) > g3(3) > g4(4) > g5(5)
        let g5 = FilterGroup::and("g5").with_rule(leaf());
        let g4 = FilterGroup::and("g4").with_rule(leaf()).with_group(g5);
        let g3 = FilterGroup::and("g3").with_rule(leaf()).with_group(g4);
        let g2 = FilterGroup::and("g2").with_rule(leaf()).with_group(g3);
        let g1 = FilterGroup::and("g1").with_rule(leaf()).with_group(g2);
        let root = FilterGroup::and("root").with_rule(leaf()).with_group(g1);

        let errors = Validator::new(&map, "t").validate(&root);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "root.rules[1].rules[1].rules[1].rules[1]");
        assert_eq!(errors[0].node.id(), "g4");

        assert!(is_valid(&map, &root, "t", 5));
        assert_eq!(validate(&map, &root, "t", 0).len(), 1);
    }

    #[test]
    fn errors_accumulate() {
        let map = map();
        let ast = FilterGroup::or("root")
            .with_rule(rule("bad_one", Operator::Eq, "x"))
            .with_rule(rule("bad_two", Operator::Eq, "x"))
            .with_rule(rule("active", Operator::Gt, true))
            .with_group(FilterGroup::and("empty"));

        let errors = Validator::new(&map, "t").validate(&ast);
        assert_eq!(errors.len(), 4);
        assert_eq!(errors[3].path, "root.rules[3]");
    }

    #[test]
    fn error_display_includes_path() {
        let errors = check(rule("nope", Operator::Eq, "x"));
        assert_eq!(errors[0].to_string(), "root.rules[0]: unknown field 'nope'");
    }
}
