#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Filter compilation integration tests.
//!
//! Tests for the filter-string grammar, relation-aware selection and the
//! full query pipeline.

use chrono::{TimeZone, Utc};
use serde_json::json;
use sieve_kernel::filter::{
    DomainMap, FilterCompiler, FilterQuery, FilterValue, Operator, analyze, build_selection,
    compile, parse_filter,
};
use sieve_test_utils::{and, ast_from_json, nested, null_check, or, rule, test_domain_map};

const ROOT: &str = "orders";

// -------------------------------------------------------------------------
// Grammar tests
// -------------------------------------------------------------------------

#[test]
fn or_group_is_comma_joined() {
    let map = test_domain_map();
    let ast = or([
        rule("order_ref", Operator::Eq, "A1"),
        rule("order_total", Operator::Gt, 10),
    ]);

    assert_eq!(compile(&map, &ast, ROOT), "reference.eq.A1,total.gt.10");
}

#[test]
fn and_group_is_wrapped() {
    let map = test_domain_map();
    let ast = and([
        rule("order_ref", Operator::Eq, "A1"),
        rule("order_total", Operator::Gt, 10),
    ]);

    assert_eq!(compile(&map, &ast, ROOT), "and(reference.eq.A1,total.gt.10)");
}

#[test]
fn single_condition_and_is_unwrapped() {
    let map = test_domain_map();
    let ast = and([rule("order_paid", Operator::Eq, true)]);

    assert_eq!(compile(&map, &ast, ROOT), "is_paid.eq.true");
}

#[test]
fn nested_group_is_parenthesized() {
    let map = test_domain_map();
    let ast = or([
        rule("order_state", Operator::Eq, "OPEN"),
        nested(and([
            rule("order_total", Operator::Gte, 100),
            rule("order_paid", Operator::Eq, false),
        ])),
    ]);

    assert_eq!(
        compile(&map, &ast, ROOT),
        "state.eq.OPEN,(and(total.gte.100,is_paid.eq.false))"
    );
}

#[test]
fn empty_nested_groups_are_omitted() {
    let map = test_domain_map();
    let ast = and([
        nested(or([])),
        rule("order_ref", Operator::Eq, "A1"),
        nested(and([nested(or([]))])),
    ]);

    assert_eq!(compile(&map, &ast, ROOT), "reference.eq.A1");
}

#[test]
fn empty_tree_compiles_to_empty_string() {
    let map = test_domain_map();
    assert_eq!(compile(&map, &and([]), ROOT), "");
    assert_eq!(compile(&map, &or([]), ROOT), "");
}

#[test]
fn unresolved_fields_are_skipped() {
    let map = test_domain_map();
    let ast = and([
        rule("no_such_field", Operator::Eq, "x"),
        rule("customer_email", Operator::Eq, "a@b.c"),
        rule("order_ref", Operator::Eq, "A1"),
    ]);

    // customer_email belongs to another root table.
    assert_eq!(compile(&map, &ast, ROOT), "reference.eq.A1");
}

// -------------------------------------------------------------------------
// Operator mapping tests
// -------------------------------------------------------------------------

#[test]
fn operator_mapping() {
    let map = test_domain_map();
    let compiler = FilterCompiler::new(&map, ROOT);
    let cases = [
        (rule("order_ref", Operator::Eq, "x"), "reference.eq.x"),
        (rule("order_ref", Operator::Neq, "x"), "reference.neq.x"),
        (rule("order_total", Operator::Gt, 1), "total.gt.1"),
        (rule("order_total", Operator::Gte, 1), "total.gte.1"),
        (rule("order_total", Operator::Lt, 1), "total.lt.1"),
        (rule("order_total", Operator::Lte, 1), "total.lte.1"),
        (rule("order_ref", Operator::Contains, "ab"), "reference.ilike.*ab*"),
        (rule("order_ref", Operator::StartsWith, "ab"), "reference.ilike.ab*"),
        (rule("order_ref", Operator::EndsWith, "ab"), "reference.ilike.*ab"),
        (
            rule("order_state", Operator::In, FilterValue::strings(["OPEN", "CLOSED"])),
            "state.in.(OPEN,CLOSED)",
        ),
        (
            rule("order_state", Operator::NotIn, FilterValue::strings(["OPEN"])),
            "state.not.in.(OPEN)",
        ),
        (null_check("order_placed", Operator::IsNull), "placed_at.is.null"),
        (null_check("order_placed", Operator::IsNotNull), "placed_at.not.is.null"),
    ];

    for (node, expected) in cases {
        let ast = and([node]);
        assert_eq!(compiler.compile(&ast), expected);
    }
}

#[test]
fn relation_fields_use_storage_path() {
    let map = test_domain_map();
    let ast = and([rule("customer_region", Operator::Eq, "EU")]);

    assert_eq!(compile(&map, &ast, ROOT), "customers.regions.code.eq.EU");
}

#[test]
fn dates_render_as_iso_utc() {
    let map = test_domain_map();
    let when = Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap();
    let ast = and([rule("order_placed", Operator::Gte, when)]);

    assert_eq!(
        compile(&map, &ast, ROOT),
        "placed_at.gte.2024-01-15T09:30:00.000Z"
    );
}

#[test]
fn invalid_date_renders_null() {
    let map = test_domain_map();
    let ast = ast_from_json(json!({
        "id": "root",
        "combinator": "and",
        "rules": [
            {"id": "r1", "fieldId": "order_placed", "operator": "lt", "value": {"date": "yesterday"}}
        ]
    }));

    assert_eq!(compile(&map, &ast, ROOT), "placed_at.lt.null");
}

#[test]
fn minute_precision_date_renders_as_iso() {
    let map = test_domain_map();
    let ast = ast_from_json(json!({
        "id": "root",
        "combinator": "or",
        "rules": [
            {"id": "r1", "fieldId": "order_placed", "operator": "gte", "value": {"date": "2024-03-01T10:30"}},
            {"id": "r2", "fieldId": "order_placed", "operator": "lt", "value": {"date": "2024-04"}}
        ]
    }));

    assert_eq!(
        compile(&map, &ast, ROOT),
        "placed_at.gte.2024-03-01T10:30:00.000Z,placed_at.lt.2024-04-01T00:00:00.000Z"
    );
}

#[test]
fn negative_zero_renders_as_zero() {
    let map = test_domain_map();
    let ast = and([rule("order_total", Operator::Gte, -0.0)]);

    assert_eq!(compile(&map, &ast, ROOT), "total.gte.0");
}

#[test]
fn quotes_and_backslashes_are_escaped() {
    let map = test_domain_map();
    let ast = and([rule("order_ref", Operator::Eq, r"O'Brien\01")]);

    assert_eq!(compile(&map, &ast, ROOT), r"reference.eq.O''Brien\\01");
}

#[test]
fn compilation_is_idempotent() {
    let map = test_domain_map();
    let ast = or([
        rule("customer_name", Operator::Contains, "acme"),
        nested(and([
            rule("order_state", Operator::In, FilterValue::strings(["OPEN", "SHIPPED"])),
            null_check("order_placed", Operator::IsNotNull),
        ])),
    ]);

    let first = compile(&map, &ast, ROOT);
    let second = compile(&map, &ast, ROOT);
    assert_eq!(first, second);
    assert_eq!(
        first,
        "customers.name.ilike.*acme*,(and(state.in.(OPEN,SHIPPED),placed_at.not.is.null))"
    );
}

// -------------------------------------------------------------------------
// Relations and selection tests
// -------------------------------------------------------------------------

#[test]
fn selection_without_relations() {
    let map = test_domain_map();
    let ast = and([rule("order_ref", Operator::Eq, "A1")]);

    let required = analyze(&map, &ast, ROOT);
    assert!(required.is_empty());
    assert_eq!(build_selection(ROOT, &required, &[]), "*");
}

#[test]
fn last_hop_is_inner_join() {
    let map = test_domain_map();
    let ast = and([rule("customer_region", Operator::Eq, "EU")]);

    let required = analyze(&map, &ast, ROOT);
    assert!(!required.is_inner("customers"));
    assert!(required.is_inner("regions"));
    assert_eq!(
        build_selection(ROOT, &required, &[]),
        "*, customers(*), regions!inner(*)"
    );
}

#[test]
fn relations_are_deduplicated_in_first_use_order() {
    let map = test_domain_map();
    let ast = or([
        rule("customer_region", Operator::Eq, "EU"),
        rule("customer_name", Operator::Eq, "Acme"),
        rule("customer_region", Operator::Eq, "US"),
    ]);

    let required = analyze(&map, &ast, ROOT);
    let relations: Vec<&str> = required.relations.iter().map(String::as_str).collect();
    assert_eq!(relations, ["customers", "regions"]);
    assert!(required.is_inner("customers"));
    assert!(required.is_inner("regions"));
}

#[test]
fn extra_fields_follow_embeds() {
    let map = test_domain_map();
    let ast = and([rule("customer_name", Operator::Eq, "Acme")]);
    let required = analyze(&map, &ast, ROOT);

    let extras = vec!["lines(count)".to_string()];
    assert_eq!(
        build_selection(ROOT, &required, &extras),
        "*, customers!inner(*), lines(count)"
    );
}

// -------------------------------------------------------------------------
// Pipeline tests
// -------------------------------------------------------------------------

#[test]
fn builtin_application_scenario() {
    let ast = parse_filter(
        &json!({
            "id": "root",
            "combinator": "and",
            "rules": [
                {"id": "r1", "fieldId": "application_status_direct", "operator": "eq", "value": "DRAFT"},
                {
                    "id": "g1",
                    "combinator": "or",
                    "rules": [
                        {"id": "r2", "fieldId": "application_agent_name", "operator": "contains", "value": "Global"},
                        {"id": "r3", "fieldId": "application_program_code", "operator": "eq", "value": "BSB50420"}
                    ]
                }
            ]
        })
        .to_string(),
    )
    .unwrap();

    let compiled = FilterQuery::new(DomainMap::builtin(), "applications").compile(&ast);

    assert!(compiled.is_valid(), "{:?}", compiled.errors);
    assert_eq!(compiled.select, "*, agents!inner(*), programs!inner(*)");
    assert_eq!(
        compiled.filter,
        "and(status.eq.DRAFT,(agents.name.ilike.*Global*,programs.code.eq.BSB50420))"
    );
}

#[test]
fn query_params_wrap_filter() {
    let map = test_domain_map();
    let ast = or([
        rule("order_ref", Operator::Eq, "A1"),
        rule("order_ref", Operator::Eq, "A2"),
    ]);

    let compiled = FilterQuery::new(&map, ROOT).compile(&ast);
    assert_eq!(
        compiled.query_params(),
        vec![
            ("select", "*".to_string()),
            ("or", "(reference.eq.A1,reference.eq.A2)".to_string()),
        ]
    );
}

#[test]
fn query_params_omit_empty_filter() {
    let map = test_domain_map();
    let compiled = FilterQuery::new(&map, ROOT).compile(&and([]));

    assert_eq!(compiled.filter, "");
    assert_eq!(compiled.query_params(), vec![("select", "*".to_string())]);
    assert!(!compiled.is_valid());
}

#[test]
fn invalid_tree_still_compiles() {
    let map = test_domain_map();
    let ast = and([
        rule("order_state", Operator::Eq, "BOGUS"),
        rule("customer_name", Operator::Eq, "Acme"),
    ]);

    let compiled = FilterQuery::new(&map, ROOT).compile(&ast);
    assert_eq!(compiled.errors.len(), 1);
    assert_eq!(compiled.select, "*, customers!inner(*)");
    assert_eq!(compiled.filter, "and(state.eq.BOGUS,customers.name.eq.Acme)");
}

#[test]
fn compiled_query_serializes() {
    let map = test_domain_map();
    let ast = and([rule("order_ref", Operator::Eq, "A1")]);

    let compiled = FilterQuery::new(&map, ROOT)
        .with_extra_fields(["lines(*)"])
        .compile(&ast);
    let value = serde_json::to_value(&compiled).unwrap();

    assert_eq!(value["select"], "*, lines(*)");
    assert_eq!(value["filter"], "reference.eq.A1");
    assert_eq!(value["errors"], json!([]));
}
