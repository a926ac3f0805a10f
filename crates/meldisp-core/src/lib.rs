//! MEL dispatch assistant core.
//!
//! Turns an open work-order CSV export into per-aircraft dispatch
//! checklists by matching each entry against a curated table of MEL
//! limitations and parsing the rules' free-text remediation instructions
//! into structured flight-plan deltas.
//!
//! The pipeline is pure and synchronous: parse the CSV, match and
//! aggregate with [`fleet::build_fleet`], render with [`render`]. File IO
//! and presentation live in the callers.

pub mod fleet;
pub mod instructions;
pub mod matcher;
pub mod melindex;
pub mod refcode;
pub mod render;
pub mod report;
pub mod rules;
pub mod snapshot;

use std::path::Path;
use thiserror::Error;

pub use fleet::{aggregate_tail, build_fleet, FleetReport, TailChecklist, TailEntry};
pub use instructions::{FlightPlanDelta, FplItem, Instruction, Verb};
pub use melindex::{Glossary, MelDocIndex};
pub use report::WorkOrderRow;
pub use rules::{Rule, RuleTable};

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Work-order CSV not readable: {0}")]
    CsvUnreadable(String),
    #[error("CSV contained no data rows")]
    EmptyImport,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything one import produces, ready for presentation.
#[derive(Debug, Clone)]
pub struct ImportResult {
    pub report: FleetReport,
    pub digest: String,
}

/// One-call import pipeline over CSV text. An empty row set is reported
/// as [`DispatchError::EmptyImport`] so callers can show an explicit
/// empty status instead of a blank screen; it is not a parse failure.
pub fn import_csv(
    csv_text: &str,
    table: &RuleTable,
    index: Option<&MelDocIndex>,
) -> Result<ImportResult, DispatchError> {
    let rows = report::parse_work_orders_str(csv_text)
        .map_err(|e| DispatchError::CsvUnreadable(e.to_string()))?;
    if rows.is_empty() {
        return Err(DispatchError::EmptyImport);
    }
    let report = build_fleet(&rows, table, index);
    let digest = snapshot::snapshot_digest(&rows);
    Ok(ImportResult { report, digest })
}

pub fn import_csv_file(
    path: &Path,
    table: &RuleTable,
    index: Option<&MelDocIndex>,
) -> Result<ImportResult, DispatchError> {
    let text = std::fs::read_to_string(path)?;
    import_csv(&text, table, index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_only_import_is_empty_status() {
        let table = RuleTable::empty();
        let err = import_csv("A/C,W/O,ATA,Description,Due\n", &table, None).unwrap_err();
        assert!(matches!(err, DispatchError::EmptyImport));
    }

    #[test]
    fn test_import_with_empty_rule_table_falls_back() {
        let table = RuleTable::empty();
        let csv = "A/C,W/O,Workorder-description\nHA-LXA,1,TCAS FAIL\n";
        let result = import_csv(csv, &table, None).unwrap();
        let entry = result.report.tail("HA-LXA").unwrap();
        assert_eq!(entry.findings[0].reason, "KEYWORD: TCAS");
    }
}
