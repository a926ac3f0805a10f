//! Plain-text renditions of the aggregated results: the flight-plan
//! delta, the LIDO step listing, the per-tail checklist and the
//! fleet-wide handover summary. Token ordering is always lexicographic
//! here, regardless of aggregation order.

use crate::fleet::{FleetReport, TailChecklist, TailEntry};
use crate::instructions::{parse_instructions, FplItem, Verb};
use crate::melindex::Glossary;
use chrono::{DateTime, Local};
use std::collections::BTreeSet;
use std::fmt::Write as _;

fn format_set(set: &BTreeSet<String>) -> String {
    if set.is_empty() {
        "-".to_string()
    } else {
        set.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Add/remove listing per flight-plan item.
pub fn format_fpl(delta: &crate::instructions::FlightPlanDelta) -> String {
    let mut out = String::new();
    for &item in &FplItem::ALL {
        let d = delta.item(item);
        let _ = writeln!(out, "{}:", item);
        let _ = writeln!(out, "  ADD:    {}", format_set(&d.add));
        let _ = writeln!(out, "  REMOVE: {}", format_set(&d.remove));
    }
    out.trim_end().to_string()
}

/// Renders one rule's remediation text as display lines. Note clauses are
/// kept verbatim, Overwrite clauses are flagged but not restated as item
/// edits, structured clauses become `VERB: ITEM -> tokens`.
pub fn format_lido_steps(lido: &str) -> String {
    let instructions = parse_instructions(lido);
    if instructions.is_empty() {
        return String::new();
    }

    let mut lines = Vec::new();
    for instr in &instructions {
        match instr.verb {
            Verb::Note => {
                if !instr.raw.is_empty() {
                    lines.push(instr.raw.clone());
                }
            }
            Verb::Overwrite => {
                lines.push(format!("OVERWRITE: {}", instr.raw));
            }
            Verb::Add | Verb::Remove => match instr.item {
                Some(item) if !instr.tokens.is_empty() => {
                    let verb = if instr.verb == Verb::Add { "ADD" } else { "REMOVE" };
                    lines.push(format!("{}: {} -> {}", verb, item, instr.tokens.join(", ")));
                }
                _ => lines.push(instr.raw.clone()),
            },
        }
    }
    lines.join("\n")
}

fn glossary_lines(checklist: &TailChecklist, glossary: &Glossary) -> Vec<String> {
    let mut tokens = BTreeSet::new();
    for &item in &FplItem::ALL {
        let d = checklist.delta.item(item);
        tokens.extend(d.add.iter().cloned());
        tokens.extend(d.remove.iter().cloned());
    }
    tokens
        .iter()
        .filter_map(|t| glossary.explain(t).map(|e| format!("  {} = {}", t, e)))
        .collect()
}

/// Full dispatch checklist for one aircraft, ready for handover or
/// clipboard use.
pub fn tail_checklist_text(
    entry: &TailEntry,
    checklist: &TailChecklist,
    glossary: Option<&Glossary>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "A/C: {}", entry.tail);
    let _ = writeln!(out);

    let _ = writeln!(out, "FINDINGS:");
    for finding in &entry.findings {
        let occurrences = if finding.occurrences > 1 {
            format!(" x{}", finding.occurrences)
        } else {
            String::new()
        };
        let _ = writeln!(
            out,
            "- {} [{}]{} ({})",
            finding.title, finding.reason, occurrences, finding.source
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "FLIGHT PLAN:");
    let _ = writeln!(out, "{}", format_fpl(&checklist.delta));

    if let Some(glossary) = glossary {
        let lines = glossary_lines(checklist, glossary);
        if !lines.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "GLOSSARY:");
            for line in lines {
                let _ = writeln!(out, "{}", line);
            }
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "LIDO / DISPATCH STEPS:");
    if checklist.lido_steps.is_empty() {
        let _ = writeln!(out, "-");
    } else {
        for (i, step) in checklist.lido_steps.iter().enumerate() {
            for (j, line) in step.lines().enumerate() {
                if j == 0 {
                    let _ = writeln!(out, "{}. {}", i + 1, line);
                } else {
                    let _ = writeln!(out, "   {}", line);
                }
            }
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "OPS NOTES:");
    if checklist.ops_notes.is_empty() {
        let _ = writeln!(out, "-");
    } else {
        for note in &checklist.ops_notes {
            let _ = writeln!(out, "- {}", note);
        }
    }

    out.trim_end().to_string()
}

/// Fleet-wide handover summary sorted by severity (the report is already
/// sorted that way).
pub fn handover_text(report: &FleetReport, now: DateTime<Local>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "DISPATCH MEL SUMMARY ({})",
        now.format("%Y-%m-%d %H:%M")
    );
    let _ = writeln!(out, "Impacted A/C: {}", report.tails.len());
    let _ = writeln!(out);

    for entry in &report.tails {
        let top_tags: Vec<&str> = entry
            .tag_counts
            .keys()
            .take(6)
            .map(String::as_str)
            .collect();
        let tags = if top_tags.is_empty() {
            "-".to_string()
        } else {
            top_tags.join(", ")
        };
        let _ = writeln!(
            out,
            "{} | {} item(s) | tags: {}",
            entry.tail,
            entry.findings.len(),
            tags
        );
        let top_rules: Vec<&str> = entry
            .findings
            .iter()
            .take(2)
            .map(|f| f.title.as_str())
            .collect();
        if !top_rules.is_empty() {
            let _ = writeln!(out, "  - {}", top_rules.join(" | "));
        }
    }
    out.trim_end().to_string()
}
