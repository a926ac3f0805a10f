//! Work-order CSV import.
//!
//! The source is an AMOS "WO Summary" style export: RFC4180 quoting with
//! `""` escapes and a mandatory header row. Column positions vary between
//! export templates, so columns are recognised by case-insensitive header
//! substring instead of fixed indices.

use anyhow::{Context, Result};
use log::debug;
use std::io::Read;
use std::path::Path;

/// One work-order record. Ephemeral: lives for a single import cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkOrderRow {
    pub tail: String,
    pub wo: String,
    pub ata: String,
    pub description: String,
    pub due: String,
}

#[derive(Debug, Clone, Copy, Default)]
struct ColumnMap {
    tail: Option<usize>,
    wo: Option<usize>,
    ata: Option<usize>,
    description: Option<usize>,
    due: Option<usize>,
}

impl ColumnMap {
    fn from_headers<'a, I: IntoIterator<Item = &'a str>>(headers: I) -> Self {
        let mut map = Self::default();
        for (i, h) in headers.into_iter().enumerate() {
            let h = h.trim().to_uppercase();
            if map.tail.is_none() && h.contains("A/C") {
                map.tail = Some(i);
            } else if map.wo.is_none() && h.contains("W/O") {
                map.wo = Some(i);
            } else if map.ata.is_none() && h.contains("ATA") {
                map.ata = Some(i);
            } else if map.description.is_none()
                && (h.contains("DESCRIPTION") || h.contains("COMPLAINT"))
            {
                map.description = Some(i);
            } else if map.due.is_none() && h.contains("DUE") {
                map.due = Some(i);
            }
        }
        map
    }
}

fn field(record: &csv::StringRecord, idx: Option<usize>) -> String {
    idx.and_then(|i| record.get(i)).unwrap_or("").trim().to_string()
}

/// Parses work-order rows from any reader. Rows without an aircraft tail
/// are skipped silently (footer lines, section separators). Missing
/// optional columns degrade to empty strings.
pub fn parse_work_orders<R: Read>(input: R) -> Result<Vec<WorkOrderRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_reader(input);

    let mut rows = Vec::new();
    let mut columns: Option<ColumnMap> = None;
    let mut skipped = 0usize;

    for result in rdr.records() {
        let record = result.context("Failed to read CSV record")?;
        let map = match columns {
            Some(m) => m,
            None => {
                // First non-empty record is the header row.
                if record.iter().all(|f| f.trim().is_empty()) {
                    continue;
                }
                columns = Some(ColumnMap::from_headers(record.iter()));
                continue;
            }
        };

        let tail = field(&record, map.tail);
        if tail.is_empty() {
            skipped += 1;
            continue;
        }
        rows.push(WorkOrderRow {
            tail,
            wo: field(&record, map.wo),
            ata: field(&record, map.ata),
            description: field(&record, map.description),
            due: field(&record, map.due),
        });
    }

    debug!(
        "Parsed work-order CSV — rows={} skipped_no_tail={}",
        rows.len(),
        skipped
    );
    Ok(rows)
}

pub fn parse_work_orders_str(text: &str) -> Result<Vec<WorkOrderRow>> {
    parse_work_orders(text.as_bytes())
}

pub fn parse_work_orders_file<P: AsRef<Path>>(path: P) -> Result<Vec<WorkOrderRow>> {
    let file = std::fs::File::open(&path)
        .with_context(|| format!("Failed to open CSV file: {:?}", path.as_ref()))?;
    parse_work_orders(std::io::BufReader::new(file))
}
