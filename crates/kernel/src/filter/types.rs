//! Filter AST types.
//!
//! Provides the typed intermediate representation shared by every pass:
//! - FilterGroup / FilterRule / FilterNode: nested boolean filter trees
//! - Operator: comparison operators and their backend tokens
//! - FieldType: semantic type of a registry field
//! - FilterValue: the comparison value carried by a rule

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Boolean operator joining a group's children.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    And,
    Or,
}

/// Comparison operators for filter rules.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    /// Exact match.
    Eq,
    /// Not equal.
    Neq,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Case-insensitive substring match (ilike *value*).
    Contains,
    /// Case-insensitive prefix match (ilike value*).
    StartsWith,
    /// Case-insensitive suffix match (ilike *value).
    EndsWith,
    /// Value in list.
    In,
    /// Value not in list.
    NotIn,
    /// Field is NULL.
    IsNull,
    /// Field is not NULL.
    IsNotNull,
}

impl Operator {
    /// Every operator, in declaration order.
    pub const ALL: [Operator; 13] = [
        Operator::Eq,
        Operator::Neq,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::Contains,
        Operator::StartsWith,
        Operator::EndsWith,
        Operator::In,
        Operator::NotIn,
        Operator::IsNull,
        Operator::IsNotNull,
    ];

    /// Wire name used in serialized ASTs and registry files.
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Contains => "contains",
            Operator::StartsWith => "startsWith",
            Operator::EndsWith => "endsWith",
            Operator::In => "in",
            Operator::NotIn => "notIn",
            Operator::IsNull => "isNull",
            Operator::IsNotNull => "isNotNull",
        }
    }

    /// Operator token in the backend filter grammar.
    pub fn backend_token(self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Contains | Operator::StartsWith | Operator::EndsWith => "ilike",
            Operator::In => "in",
            Operator::NotIn => "not.in",
            Operator::IsNull => "is",
            Operator::IsNotNull => "not.is",
        }
    }

    /// Operators that carry no comparison value.
    pub fn is_nullary(self) -> bool {
        matches!(self, Operator::IsNull | Operator::IsNotNull)
    }

    /// Operators whose value is a sequence.
    pub fn takes_list(self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic type of a registry field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Boolean,
    Enum,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Boolean => "boolean",
            FieldType::Enum => "enum",
        }
    }

    /// Conventional operator set for fields of this type.
    pub fn default_operators(self) -> &'static [Operator] {
        match self {
            FieldType::Text => &[
                Operator::Eq,
                Operator::Neq,
                Operator::Contains,
                Operator::StartsWith,
                Operator::EndsWith,
                Operator::In,
                Operator::NotIn,
                Operator::IsNull,
                Operator::IsNotNull,
            ],
            FieldType::Number | FieldType::Date => &[
                Operator::Eq,
                Operator::Neq,
                Operator::Gt,
                Operator::Gte,
                Operator::Lt,
                Operator::Lte,
                Operator::IsNull,
                Operator::IsNotNull,
            ],
            FieldType::Boolean => &[
                Operator::Eq,
                Operator::Neq,
                Operator::IsNull,
                Operator::IsNotNull,
            ],
            FieldType::Enum => &[
                Operator::Eq,
                Operator::Neq,
                Operator::In,
                Operator::NotIn,
                Operator::IsNull,
                Operator::IsNotNull,
            ],
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Date value as captured from the caller.
///
/// Kept as text and parsed on use, so an unparseable date survives until it
/// is validated (rejected) or compiled (rendered as `null`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateValue {
    pub date: String,
}

impl DateValue {
    pub fn parse(&self) -> Option<DateTime<Utc>> {
        parse_date(&self.date)
    }
}

impl From<DateTime<Utc>> for DateValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self {
            date: format_iso(&value),
        }
    }
}

/// Filter value types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Boolean value.
    Boolean(bool),
    /// Numeric value (integers included).
    Number(f64),
    /// String value.
    String(String),
    /// List of values (for In/NotIn operators).
    List(Vec<FilterValue>),
    /// Date or timestamp.
    Date(DateValue),
    /// No value (nullary operators).
    #[default]
    Absent,
}

impl FilterValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, FilterValue::Absent)
    }

    /// Short type name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            FilterValue::Boolean(_) => "boolean",
            FilterValue::Number(_) => "number",
            FilterValue::String(_) => "string",
            FilterValue::List(_) => "list",
            FilterValue::Date(_) => "date",
            FilterValue::Absent => "absent",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FilterValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Build a date value from a UTC timestamp.
    pub fn date(value: DateTime<Utc>) -> Self {
        FilterValue::Date(value.into())
    }

    /// Build a list of string values.
    pub fn strings<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterValue::List(
            items
                .into_iter()
                .map(|s| FilterValue::String(s.into()))
                .collect(),
        )
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::String(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::String(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Number(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Number(value as f64)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        FilterValue::Number(f64::from(value))
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Boolean(value)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(value: DateTime<Utc>) -> Self {
        FilterValue::date(value)
    }
}

/// Leaf node: one comparison against a registry field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterRule {
    /// Caller-supplied identifier, unique within one AST.
    pub id: String,

    /// Registry field identifier.
    pub field_id: String,

    /// Comparison operator.
    pub operator: Operator,

    /// Value to compare against.
    #[serde(default, skip_serializing_if = "FilterValue::is_absent")]
    pub value: FilterValue,
}

impl FilterRule {
    pub fn new(
        id: impl Into<String>,
        field_id: impl Into<String>,
        operator: Operator,
        value: impl Into<FilterValue>,
    ) -> Self {
        Self {
            id: id.into(),
            field_id: field_id.into(),
            operator,
            value: value.into(),
        }
    }

    /// Rule for a nullary operator (`isNull` / `isNotNull`).
    pub fn nullary(id: impl Into<String>, field_id: impl Into<String>, operator: Operator) -> Self {
        Self {
            id: id.into(),
            field_id: field_id.into(),
            operator,
            value: FilterValue::Absent,
        }
    }
}

/// Interior node: children joined by a combinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterGroup {
    pub id: String,
    pub combinator: Combinator,
    #[serde(default)]
    pub rules: Vec<FilterNode>,
}

impl FilterGroup {
    pub fn new(id: impl Into<String>, combinator: Combinator) -> Self {
        Self {
            id: id.into(),
            combinator,
            rules: Vec::new(),
        }
    }

    pub fn and(id: impl Into<String>) -> Self {
        Self::new(id, Combinator::And)
    }

    pub fn or(id: impl Into<String>) -> Self {
        Self::new(id, Combinator::Or)
    }

    pub fn with_rule(mut self, rule: FilterRule) -> Self {
        self.rules.push(FilterNode::Rule(rule));
        self
    }

    pub fn with_group(mut self, group: FilterGroup) -> Self {
        self.rules.push(FilterNode::Group(group));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Depth-first iterator over every rule in the tree.
    pub fn iter_rules(&self) -> impl Iterator<Item = &FilterRule> + '_ {
        let mut stack: Vec<&FilterNode> = self.rules.iter().rev().collect();
        std::iter::from_fn(move || {
            while let Some(node) = stack.pop() {
                match node {
                    FilterNode::Rule(rule) => return Some(rule),
                    FilterNode::Group(group) => stack.extend(group.rules.iter().rev()),
                }
            }
            None
        })
    }
}

/// Either a rule or a nested group.
///
/// On the wire a node carrying a `combinator` key is a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterNode {
    Group(FilterGroup),
    Rule(FilterRule),
}

impl FilterNode {
    pub fn id(&self) -> &str {
        match self {
            FilterNode::Group(group) => &group.id,
            FilterNode::Rule(rule) => &rule.id,
        }
    }
}

impl From<FilterRule> for FilterNode {
    fn from(rule: FilterRule) -> Self {
        FilterNode::Rule(rule)
    }
}

impl From<FilterGroup> for FilterNode {
    fn from(group: FilterGroup) -> Self {
        FilterNode::Group(group)
    }
}

/// Root of a filter tree.
pub type FilterAst = FilterGroup;

/// Date-time layouts without an offset, taken as UTC.
const NAIVE_DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Date-time layouts with a numeric offset.
const OFFSET_DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M%:z",
];

/// Parse a calendar date or timestamp.
///
/// Accepts RFC 3339, ISO-8601 date-times with seconds or minutes, a `T` or
/// space separator and an optional `Z` or `+HH:MM` offset (none means UTC),
/// `YYYY-MM-DD` and `YYYY-MM` (first of the month).
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive_part = value.strip_suffix(['Z', 'z']).unwrap_or(value);
    for format in NAIVE_DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(naive_part, format) {
            return Some(naive.and_utc());
        }
    }
    for format in OFFSET_DATE_TIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d"))
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// ISO-8601 rendering with millisecond precision and a `Z` suffix.
pub fn format_iso(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}
