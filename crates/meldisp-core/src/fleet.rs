//! Per-aircraft aggregation of rule matches.
//!
//! Builds the fleet picture from parsed work orders: findings deduplicated
//! per (rule, work-order) pair, per-tail severity scoring, and the merged
//! flight-plan delta / instruction / ops-note checklist for one tail.

use crate::instructions::{delta_from_lido, FlightPlanDelta};
use crate::matcher::{derive_tags, is_excluded, match_work_order, MatchKind};
use crate::melindex::MelDocIndex;
use crate::refcode::extract_refs;
use crate::render::format_lido_steps;
use crate::report::WorkOrderRow;
use crate::rules::{Rule, RuleTable};
use log::{debug, info};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::OnceLock;

/// One dispatch-relevant hit on one aircraft.
#[derive(Debug, Clone)]
pub struct Finding {
    pub tail: String,
    pub title: String,
    /// Matched rule, if any; `None` for bare fallback-tag findings.
    pub rule: Option<Rule>,
    pub kind: MatchKind,
    /// `MATCH: <title>` or `KEYWORD: <tag>`.
    pub reason: String,
    pub tags: Vec<String>,
    /// Human-readable source summary (`W/O ... ATA ... Due ...`).
    pub source: String,
    pub wo: String,
    /// Times this (rule, work order) pair was seen in the import.
    pub occurrences: u32,
}

/// Aggregate state for one aircraft, rebuilt fully on every import.
#[derive(Debug, Clone, Default)]
pub struct TailEntry {
    pub tail: String,
    pub findings: Vec<Finding>,
    pub tag_counts: BTreeMap<String, u32>,
    /// Display heuristic only: `min(5, distinct_rules + tag_diversity/3)`,
    /// monotonically non-decreasing as findings are added.
    pub score: f32,
}

impl TailEntry {
    /// Distinct rule (or fallback-title) count across findings.
    pub fn distinct_rules(&self) -> usize {
        self.findings
            .iter()
            .map(|f| f.rule.as_ref().map(|r| r.key()).unwrap_or_else(|| f.title.clone()))
            .collect::<BTreeSet<_>>()
            .len()
    }

    fn bump_score(&mut self) {
        let distinct = self.distinct_rules() as f32;
        let diversity = self.tag_counts.len() as f32 / 3.0;
        self.score = self.score.max((distinct + diversity).min(5.0));
    }
}

#[derive(Debug, Clone, Default)]
pub struct FleetReport {
    /// Sorted by severity score descending, then tail.
    pub tails: Vec<TailEntry>,
    pub imported_rows: usize,
}

impl FleetReport {
    pub fn tail(&self, tail: &str) -> Option<&TailEntry> {
        self.tails.iter().find(|t| t.tail == tail)
    }

    pub fn is_empty(&self) -> bool {
        self.tails.is_empty()
    }
}

fn re_cat_detail() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)cat\s*(?:iii|3)\s*([ab])").unwrap())
}

fn re_cat_plain() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bcat\s*(III|II|I)\b").unwrap())
}

fn cat_rank(token: &str) -> u8 {
    let t = token.to_uppercase().replace(' ', "");
    if t.contains("3B") || t.contains("IIIB") {
        5
    } else if t.contains("3A") || t.contains("IIIA") {
        4
    } else if t.contains("III") || t.contains("CAT3") {
        3
    } else if t.contains("II") {
        2
    } else if t.contains('I') || t.contains('1') {
        1
    } else {
        0
    }
}

fn cat_label(rank: u8) -> Option<&'static str> {
    match rank {
        5 => Some("CAT3B"),
        4 => Some("CAT3A"),
        3 => Some("CATIII"),
        2 => Some("CATII"),
        1 => Some("CATI"),
        _ => None,
    }
}

/// Most restrictive/specific landing category derivable for a rule:
/// the MEL-document index wins over title text when present.
fn ils_cat_detail(rule: &Rule, index: Option<&MelDocIndex>) -> Option<String> {
    let mut best: u8 = 0;
    if let Some(index) = index {
        for cat in index.cats_for_codes(rule.codes.iter().map(String::as_str)) {
            best = best.max(cat_rank(&cat));
        }
    }
    if best == 0 {
        if let Some(cap) = re_cat_detail().captures(&rule.title) {
            best = if cap[1].eq_ignore_ascii_case("b") { 5 } else { 4 };
        } else if let Some(cap) = re_cat_plain().captures(&rule.title) {
            best = cat_rank(&format!("CAT{}", &cap[1]));
        }
    }
    cat_label(best).map(String::from)
}

/// Refines the generic `ILS CAT` tag with the derivable category detail,
/// e.g. `ILS CAT` -> `ILS CAT3B`. Other tags pass through unchanged.
pub fn decorate_tags(tags: &mut [String], rule: &Rule, index: Option<&MelDocIndex>) {
    for tag in tags.iter_mut() {
        if tag == "ILS CAT" {
            if let Some(detail) = ils_cat_detail(rule, index) {
                *tag = format!("ILS {}", detail);
            }
        }
    }
}

fn re_ils_limitation() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)ILS\s+Category\s+limitation").unwrap())
}

fn re_basic_cat() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)basic:\s*cat\s*3\s*([ab])").unwrap())
}

fn re_autoland_cat() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)autoland\s*cat\s*3\s*([ab])").unwrap())
}

fn re_rvr_map() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)CAT\s*(I{1,3}[AB]?)\s*:\s*(\d+)m").unwrap())
}

/// Synthesizes the explanatory ops note for an ILS-category limitation
/// rule: remaining capability, optional RVR minima extracted from the
/// remediation text, and the fixed landing-capability reminder.
fn derive_ils_cat_note(title: &str, lido: &str) -> String {
    let cat3 = |letter: &str| format!("CAT III{}", letter.to_uppercase());
    let basic_cat = re_basic_cat().captures(title).map(|c| cat3(&c[1]));
    let auto_cat = re_autoland_cat()
        .captures(title)
        .map(|c| cat3(&c[1]))
        .or_else(|| re_cat_detail().captures(title).map(|c| cat3(&c[1])));

    let mut rvr: BTreeMap<String, String> = BTreeMap::new();
    for cap in re_rvr_map().captures_iter(lido) {
        rvr.insert(cap[1].to_uppercase(), format!("{}m", &cap[2]));
    }

    let mut parts = Vec::new();
    match (&basic_cat, &auto_cat) {
        (None, None) => parts.push("ILS CAT - landing capability degraded per MEL.".to_string()),
        _ => {
            let capability = basic_cat.clone().unwrap_or_else(|| "CAT III".to_string());
            let autoland = auto_cat
                .as_ref()
                .map(|a| format!(" (autoland limited to {})", a))
                .unwrap_or_default();
            parts.push(format!("ILS CAT - capability: {}{}.", capability, autoland));
            if let (Some(b), Some(a)) = (&basic_cat, &auto_cat) {
                if b != a {
                    parts.push(format!(
                        "Expected impact: {} not available as autoland; plan with {} minima where applicable.",
                        b, a
                    ));
                }
            }
        }
    }
    if !rvr.is_empty() {
        let line = ["I", "II", "IIIA", "IIIB"]
            .iter()
            .filter_map(|k| rvr.get(*k).map(|v| format!("CAT {}: RVR {}", k, v)))
            .collect::<Vec<_>>()
            .join(" | ");
        parts.push(format!("Reference RVR mapping (ICAO FPL item 18): {}.", line));
    }
    parts.push(
        "Action: update LIDO 4D Landing Capability per MEL; verify DEP/DES/ALT minima/briefing."
            .to_string(),
    );
    parts.join(" ")
}

/// Merged dispatch checklist for one aircraft.
#[derive(Debug, Clone, Default)]
pub struct TailChecklist {
    pub delta: FlightPlanDelta,
    /// Rendered LIDO steps, deduplicated verbatim by rendered form.
    pub lido_steps: Vec<String>,
    /// Ops notes; synthesized ILS capability notes are prepended.
    pub ops_notes: Vec<String>,
}

/// Runs per-rule flight-plan extraction over every finding of one tail
/// and merges the results. Remove-wins conflict resolution is re-applied
/// at the tail level so a token removed by one rule cannot reappear
/// through another rule's add.
pub fn aggregate_tail(entry: &TailEntry) -> TailChecklist {
    let mut checklist = TailChecklist::default();
    let mut seen_steps = BTreeSet::new();
    let mut seen_ops = BTreeSet::new();
    let mut ils_notes = Vec::new();

    for finding in &entry.findings {
        let rule = match &finding.rule {
            Some(r) => r,
            None => continue,
        };
        checklist.delta.merge(&delta_from_lido(&rule.lido));

        if !rule.lido.is_empty() {
            let step = format_lido_steps(&rule.lido);
            if !step.is_empty() && seen_steps.insert(step.clone()) {
                checklist.lido_steps.push(step);
            }
        }
        let op = rule.other.trim();
        if !op.is_empty() && seen_ops.insert(op.to_string()) {
            checklist.ops_notes.push(op.to_string());
        }

        if re_ils_limitation().is_match(&rule.title) {
            let note = derive_ils_cat_note(&rule.title, &rule.lido);
            if seen_ops.insert(note.clone()) {
                ils_notes.push(note);
            }
        }
    }
    for note in ils_notes.into_iter().rev() {
        checklist.ops_notes.insert(0, note);
    }
    checklist.delta.resolve_conflicts();
    checklist
}

fn source_summary(row: &WorkOrderRow) -> String {
    format!(
        "W/O {} | ATA {} | Due {}",
        if row.wo.is_empty() { "-" } else { &row.wo },
        if row.ata.is_empty() { "-" } else { &row.ata },
        if row.due.is_empty() { "-" } else { &row.due },
    )
}

/// Pure import pipeline: work orders + rule table + optional MEL index in,
/// per-tail aggregates out. Retains no references into the inputs.
pub fn build_fleet(
    rows: &[WorkOrderRow],
    table: &RuleTable,
    index: Option<&MelDocIndex>,
) -> FleetReport {
    let mut tails: BTreeMap<String, TailEntry> = BTreeMap::new();
    // (tail, rule-or-title key, work order) -> finding index per tail.
    let mut finding_idx: HashMap<(String, String, String), usize> = HashMap::new();
    let mut excluded = 0usize;

    for row in rows {
        if row.tail.is_empty() {
            continue;
        }
        let hay = format!("{} {} {}", row.description, row.ata, row.wo);
        if is_excluded(&hay) {
            excluded += 1;
            continue;
        }

        let codes = extract_refs(&hay);
        let outcome = match_work_order(table, &hay, &codes);
        if !outcome.is_relevant() {
            continue;
        }

        let entry = tails.entry(row.tail.clone()).or_insert_with(|| TailEntry {
            tail: row.tail.clone(),
            ..TailEntry::default()
        });
        let source = source_summary(row);

        let mut push_finding = |entry: &mut TailEntry,
                                key: String,
                                finding: Finding| {
            let idx_key = (row.tail.clone(), key, row.wo.clone());
            match finding_idx.get(&idx_key) {
                Some(&i) => entry.findings[i].occurrences += 1,
                None => {
                    let primary = finding
                        .tags
                        .first()
                        .cloned()
                        .unwrap_or_else(|| finding.title.clone());
                    *entry.tag_counts.entry(primary).or_insert(0) += 1;
                    finding_idx.insert(idx_key, entry.findings.len());
                    entry.findings.push(finding);
                }
            }
            entry.bump_score();
        };

        for m in &outcome.rules {
            let rule = m.rule;
            let mut tags = derive_tags(&format!("{} {} {}", rule.title, rule.other, rule.lido));
            decorate_tags(&mut tags, rule, index);
            push_finding(
                entry,
                rule.key(),
                Finding {
                    tail: row.tail.clone(),
                    title: rule.title.clone(),
                    rule: Some(rule.clone()),
                    kind: m.kind,
                    reason: format!("MATCH: {}", rule.title),
                    tags,
                    source: source.clone(),
                    wo: row.wo.clone(),
                    occurrences: 1,
                },
            );
        }
        for tag in &outcome.loose_tags {
            let title = format!("{} (fallback)", tag);
            push_finding(
                entry,
                title.clone(),
                Finding {
                    tail: row.tail.clone(),
                    title,
                    rule: None,
                    kind: MatchKind::FallbackTag,
                    reason: format!("KEYWORD: {}", tag),
                    tags: vec![tag.clone()],
                    source: source.clone(),
                    wo: row.wo.clone(),
                    occurrences: 1,
                },
            );
        }
    }

    let mut list: Vec<TailEntry> = tails
        .into_values()
        .filter(|t| !t.findings.is_empty())
        .collect();
    list.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.tail.cmp(&b.tail))
    });

    info!(
        "Fleet built — rows={} excluded={} relevant_tails={}",
        rows.len(),
        excluded,
        list.len()
    );
    debug!(
        "Tail scores — {:?}",
        list.iter().map(|t| (&t.tail, t.score)).collect::<Vec<_>>()
    );

    FleetReport {
        tails: list,
        imported_rows: rows.len(),
    }
}
