//! Filter compiler.
//!
//! Lowers a filter tree into the backend filter-string grammar:
//! - condition: `<path>.<op>.<value>`
//! - OR group: `c1,c2,...` (the flat list is an implicit OR)
//! - AND group: `and(c1,c2,...)`, or `c1` alone when it has one condition
//! - nested group: `(...)`, only when it compiled to something
//!
//! The finished string is applied through the backend's OR-style entry
//! point, which is why OR needs no wrapper and AND does.
//!
//! Compilation never fails. Unresolved fields produce nothing, invalid dates
//! render as `null`, malformed list members are dropped. Run the validator
//! first when the output must be trusted.

use super::domain_map::DomainMap;
use super::types::{
    Combinator, FilterGroup, FilterNode, FilterRule, FilterValue, Operator, format_iso,
};

/// Token emitted for values that cannot be rendered.
const NULL_TOKEN: &str = "null";

/// Compiles filter trees against one root table.
pub struct FilterCompiler<'a> {
    map: &'a DomainMap,
    root_table: &'a str,
}

impl<'a> FilterCompiler<'a> {
    pub fn new(map: &'a DomainMap, root_table: &'a str) -> Self {
        Self { map, root_table }
    }

    /// Compile a whole tree. Empty when no rule produced a condition.
    pub fn compile(&self, ast: &FilterGroup) -> String {
        self.compile_group(ast)
    }

    fn compile_group(&self, group: &FilterGroup) -> String {
        let fragments: Vec<String> = group
            .rules
            .iter()
            .filter_map(|node| match node {
                FilterNode::Group(child) => {
                    let inner = self.compile_group(child);
                    (!inner.is_empty()).then(|| format!("({inner})"))
                }
                FilterNode::Rule(rule) => self.compile_rule(rule),
            })
            .filter(|fragment| !fragment.is_empty())
            .collect();

        match group.combinator {
            Combinator::Or => fragments.join(","),
            Combinator::And if fragments.len() == 1 => fragments.join(","),
            Combinator::And if fragments.is_empty() => String::new(),
            Combinator::And => format!("and({})", fragments.join(",")),
        }
    }

    /// Compile one rule, or `None` when its field does not resolve.
    pub fn compile_rule(&self, rule: &FilterRule) -> Option<String> {
        let Some(def) = self.map.resolve(&rule.field_id, self.root_table) else {
            tracing::debug!(
                field_id = %rule.field_id,
                root_table = self.root_table,
                "compiler skipped unresolved field"
            );
            return None;
        };
        let path = &def.storage_path;

        let condition = match rule.operator {
            Operator::IsNull => format!("{path}.is.null"),
            Operator::IsNotNull => format!("{path}.not.is.null"),
            Operator::Contains => format!("{path}.ilike.*{}*", format_value(&rule.value)),
            Operator::StartsWith => format!("{path}.ilike.{}*", format_value(&rule.value)),
            Operator::EndsWith => format!("{path}.ilike.*{}", format_value(&rule.value)),
            Operator::In | Operator::NotIn => format!(
                "{path}.{}.{}",
                rule.operator.backend_token(),
                format_list(&rule.value)
            ),
            Operator::Eq
            | Operator::Neq
            | Operator::Gt
            | Operator::Gte
            | Operator::Lt
            | Operator::Lte => format!(
                "{path}.{}.{}",
                rule.operator.backend_token(),
                format_value(&rule.value)
            ),
        };
        Some(condition)
    }
}

/// Compile `ast` for `root_table` using `map`.
pub fn compile(map: &DomainMap, ast: &FilterGroup, root_table: &str) -> String {
    FilterCompiler::new(map, root_table).compile(ast)
}

/// Render a scalar value. Lists render in `(a,b)` form.
fn format_value(value: &FilterValue) -> String {
    match value {
        FilterValue::String(s) => escape_value(s),
        FilterValue::Number(n) => format_number(*n),
        FilterValue::Boolean(b) => b.to_string(),
        FilterValue::Date(date) => date
            .parse()
            .map(|dt| format_iso(&dt))
            .unwrap_or_else(|| NULL_TOKEN.to_string()),
        FilterValue::List(_) => format_list(value),
        FilterValue::Absent => NULL_TOKEN.to_string(),
    }
}

/// Render an `in` list, dropping absent and nested-list members.
///
/// A scalar is treated as a one-element list.
fn format_list(value: &FilterValue) -> String {
    let members: Vec<String> = match value {
        FilterValue::List(items) => items
            .iter()
            .filter(|item| !matches!(item, FilterValue::Absent | FilterValue::List(_)))
            .map(format_value)
            .collect(),
        FilterValue::Absent => Vec::new(),
        scalar => vec![format_value(scalar)],
    };
    format!("({})", members.join(","))
}

/// Shortest round-trip form. Exponent notation below `1e-6` and from `1e21`
/// up, written `1e+21` / `1.5e-7`; negative zero renders as `0`.
fn format_number(n: f64) -> String {
    if !n.is_finite() {
        return NULL_TOKEN.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let magnitude = n.abs();
    if !(1e-6..1e21).contains(&magnitude) {
        let text = format!("{n:e}");
        return match text.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{mantissa}e+{exponent}")
            }
            _ => text,
        };
    }
    n.to_string()
}

/// Double backslashes and single quotes. Nothing else is touched; URL
/// encoding belongs to the transport.
fn escape_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "''")
}
