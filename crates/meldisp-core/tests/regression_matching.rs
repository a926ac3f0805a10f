// SPDX-License-Identifier: MIT
// Copyright (c) 2026 MCC Tools
//
// Regression tests for work-order matching:
// - Exclusion is checked before matching, not after
// - Lettered reference codes match in both `-A` and `A` spellings
// - Fallback tags resolve to rules where the table allows it
// - Matching the same haystack twice yields identical results

use meldisp_core::matcher::{is_excluded, match_work_order, MatchKind};
use meldisp_core::refcode::extract_refs;
use meldisp_core::{build_fleet, RuleTable, WorkOrderRow};
use std::collections::BTreeSet;

fn table() -> RuleTable {
    RuleTable::from_json(
        r#"{"rules": [
            {"id": "R-TCAS", "title": "TCAS inoperative", "codes": ["34-43-01"],
             "match_keywords": ["TCAS"], "lido": "", "other": ""},
            {"id": "R-ILS", "title": "ILS Category limitation", "codes": ["22-82-01-A"],
             "match_keywords": ["AUTOLAND"], "lido": "", "other": ""}
        ]}"#,
    )
    .unwrap()
}

fn row(tail: &str, wo: &str, desc: &str) -> WorkOrderRow {
    WorkOrderRow {
        tail: tail.to_string(),
        wo: wo.to_string(),
        ata: String::new(),
        description: desc.to_string(),
        due: String::new(),
    }
}

#[test]
fn test_exclusion_beats_dispatch_keyword() {
    // The row carries both an excluded keyword and a dispatch keyword;
    // it must be dropped entirely before matching runs.
    let hay = "GALLEY OVEN NEAR TCAS ANTENNA";
    assert!(is_excluded(hay));

    let report = build_fleet(&[row("HA-LXA", "1", hay)], &table(), None);
    assert!(report.is_empty());
}

#[test]
fn test_lettered_code_spellings_both_match() {
    let t = table();
    for desc in ["PER MEL 22-82-01A DEGRADED", "PER MEL 22-82-01-A DEGRADED"] {
        let codes = extract_refs(desc);
        let out = match_work_order(&t, desc, &codes);
        assert_eq!(out.rules.len(), 1, "desc: {}", desc);
        assert_eq!(out.rules[0].rule.id, "R-ILS");
        assert_eq!(out.rules[0].kind, MatchKind::Code);
    }
}

#[test]
fn test_center_tank_scenario_without_rule() {
    // No rule covers center tank defects: the finding must be a bare
    // keyword with no rule attached.
    let report = build_fleet(
        &[row("HA-LXB", "2", "CENTER TANK TRANSFER VALVE INOP")],
        &table(),
        None,
    );
    let entry = report.tail("HA-LXB").unwrap();
    assert_eq!(entry.findings.len(), 1);
    assert_eq!(entry.findings[0].reason, "KEYWORD: CENTER TANK");
    assert!(entry.findings[0].rule.is_none());
}

#[test]
fn test_match_is_idempotent() {
    let t = table();
    let hay = "TCAS FAIL AND AUTOLAND RESTRICTED";
    let codes = extract_refs(hay);
    let first: Vec<String> = match_work_order(&t, hay, &codes)
        .rules
        .iter()
        .map(|m| m.rule.id.clone())
        .collect();
    let second: Vec<String> = match_work_order(&t, hay, &codes)
        .rules
        .iter()
        .map(|m| m.rule.id.clone())
        .collect();
    assert_eq!(first, second);
    assert_eq!(first, vec!["R-TCAS".to_string(), "R-ILS".to_string()]);
}

#[test]
fn test_empty_rule_table_degrades_to_fallback() {
    let t = RuleTable::empty();
    let out = match_work_order(&t, "RVSM CAPABILITY LOST", &BTreeSet::new());
    assert!(out.rules.is_empty());
    assert_eq!(out.loose_tags, vec!["RVSM".to_string()]);
}

#[test]
fn test_unmatched_row_produces_nothing() {
    let report = build_fleet(
        &[row("HA-LXC", "3", "CARGO NET FRAYED")],
        &table(),
        None,
    );
    assert!(report.is_empty());
}
