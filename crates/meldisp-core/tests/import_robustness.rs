// SPDX-License-Identifier: MIT
// Copyright (c) 2026 MCC Tools
//
// Robustness tests on the import surface: quoting, missing columns,
// header-only files, broken rule tables, and snapshot change detection.

use meldisp_core::snapshot::{snapshot_digest, DeltaStatus, SnapshotStore};
use meldisp_core::{import_csv, import_csv_file, DispatchError, RuleTable};
use std::io::Write;
use tempfile::tempdir;

fn table() -> RuleTable {
    RuleTable::from_json(
        r#"{"rules": [{"id": "R1", "title": "TCAS inoperative",
                       "match_keywords": ["TCAS"], "lido": "", "other": ""}]}"#,
    )
    .unwrap()
}

#[test]
fn test_header_only_is_empty_import() {
    let err = import_csv("A/C,W/O,ATA,Description,Due\n", &table(), None).unwrap_err();
    assert!(matches!(err, DispatchError::EmptyImport));
}

#[test]
fn test_quoted_fields_and_missing_columns() {
    let csv = "A/C,Workorder-description and/or complaint\n\
               HA-LXA,\"TCAS FAIL, INTERMITTENT \"\"HARD\"\" FAULT\"\n";
    let result = import_csv(csv, &table(), None).unwrap();
    let entry = result.report.tail("HA-LXA").unwrap();
    assert_eq!(entry.findings[0].reason, "MATCH: TCAS inoperative");
    // W/O column absent: the work-order key degrades to empty string.
    assert_eq!(entry.findings[0].wo, "");
}

#[test]
fn test_rows_without_tail_skipped() {
    let csv = "A/C,W/O,Workorder-description\n\
               ,1,TCAS FAIL\n\
               HA-LXB,2,TCAS FAIL\n";
    let result = import_csv(csv, &table(), None).unwrap();
    assert_eq!(result.report.tails.len(), 1);
    assert_eq!(result.report.imported_rows, 1);
}

#[test]
fn test_corrupt_rule_table_degrades() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("actions.json");
    std::fs::write(&path, "{ not json").unwrap();
    let table = RuleTable::load_or_empty(&path);
    assert!(table.rules.is_empty());

    // Fallback-only matching still works.
    let csv = "A/C,W/O,Workorder-description\nHA-LXC,3,TCAS FAIL\n";
    let result = import_csv(csv, &table, None).unwrap();
    assert_eq!(
        result.report.tail("HA-LXC").unwrap().findings[0].reason,
        "KEYWORD: TCAS"
    );
}

#[test]
fn test_import_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wo.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "A/C,W/O,Workorder-description").unwrap();
    writeln!(file, "HA-LXD,4,TCAS FAIL").unwrap();
    drop(file);

    let result = import_csv_file(&path, &table(), None).unwrap();
    assert_eq!(result.report.tails.len(), 1);
    assert_eq!(result.digest.len(), 64);
}

#[test]
fn test_snapshot_delta_across_imports() {
    let dir = tempdir().unwrap();
    let store = SnapshotStore::at(dir.path().join("snap"));

    let csv_a = "A/C,W/O,Workorder-description\nHA-LXE,5,TCAS FAIL\n";
    let csv_b = "A/C,W/O,Workorder-description\nHA-LXE,6,TCAS FAIL\n";

    let a = import_csv(csv_a, &table(), None).unwrap();
    assert_eq!(store.compute_delta(&a.digest), DeltaStatus::New);
    let a_again = import_csv(csv_a, &table(), None).unwrap();
    assert_eq!(store.compute_delta(&a_again.digest), DeltaStatus::Unchanged);
    let b = import_csv(csv_b, &table(), None).unwrap();
    assert_eq!(store.compute_delta(&b.digest), DeltaStatus::Changed);
}

#[test]
fn test_digest_ignores_row_order() {
    let rows_ab = import_csv(
        "A/C,W/O,Workorder-description\nHA-LXF,7,TCAS FAIL\nHA-LXG,8,TCAS FAIL\n",
        &table(),
        None,
    )
    .unwrap();
    let rows_ba = import_csv(
        "A/C,W/O,Workorder-description\nHA-LXG,8,TCAS FAIL\nHA-LXF,7,TCAS FAIL\n",
        &table(),
        None,
    )
    .unwrap();
    assert_eq!(rows_ab.digest, rows_ba.digest);
    assert_eq!(
        rows_ab.digest,
        snapshot_digest(&meldisp_core::report::parse_work_orders_str(
            "A/C,W/O,Workorder-description\nHA-LXF,7,TCAS FAIL\nHA-LXG,8,TCAS FAIL\n"
        )
        .unwrap())
    );
}
