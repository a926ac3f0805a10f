//! Work-order to MEL-rule matching.
//!
//! Cabin/cosmetic defects are filtered out first, then every rule in
//! table order is tested by reference-code containment and strict keyword
//! containment. Rows that match no rule fall back to a fixed tag
//! vocabulary; each fallback tag is resolved to a real rule where the
//! table allows it.

use crate::rules::{norm, Rule, RuleTable};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// How a rule (or tag) was matched, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchKind {
    Code,
    Keyword,
    FallbackResolved,
    FallbackTag,
}

#[derive(Debug, Clone)]
pub struct RuleMatch<'a> {
    pub rule: &'a Rule,
    pub kind: MatchKind,
}

/// Outcome of matching one work order against the table.
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome<'a> {
    /// All matching rules in table order, strongest kind recorded per rule.
    pub rules: Vec<RuleMatch<'a>>,
    /// Fallback tags that could not be resolved to any rule.
    pub loose_tags: Vec<String>,
}

impl MatchOutcome<'_> {
    pub fn is_relevant(&self) -> bool {
        !self.rules.is_empty() || !self.loose_tags.is_empty()
    }
}

struct FallbackTag {
    tag: &'static str,
    pattern: &'static str,
    re: OnceLock<Regex>,
}

impl FallbackTag {
    const fn new(tag: &'static str, pattern: &'static str) -> Self {
        Self {
            tag,
            pattern,
            re: OnceLock::new(),
        }
    }

    fn is_match(&self, text: &str) -> bool {
        self.re
            .get_or_init(|| Regex::new(self.pattern).unwrap())
            .is_match(text)
    }
}

/// Dispatch-impact fallback vocabulary, evaluated in order. Kept as data so
/// the table can grow without touching the matching algorithm.
static FALLBACK: [FallbackTag; 15] = [
    FallbackTag::new("TCAS", r"(?i)\bTCAS\b"),
    FallbackTag::new("CPDLC", r"(?i)\bCPDLC\b|\bDATALINK\b|\bDAT/CPDLC"),
    FallbackTag::new("ADS-B", r"(?i)\bADS[\s-]?B\b|\bADSB\b|\bSUR/EUADSBX\b"),
    FallbackTag::new("RVSM", r"(?i)\bRVSM\b"),
    FallbackTag::new("RNP", r"(?i)\bRNP\b|\bPBN:\s*S2\b|\bAPPCH\b"),
    FallbackTag::new("WXR", r"(?i)WX\s*RADAR|\bWXR\b|\bWEATHER RADAR\b"),
    FallbackTag::new("NO ICING", r"(?i)NO\s+ICING|\bICING\b"),
    FallbackTag::new(
        "ILS CAT",
        r"(?i)\bCAT\s*II\b|\bCAT\s*III\b|\bAUTOLAND\b|\bLANDING CAPABILITY\b",
    ),
    FallbackTag::new("NAV DB", r"(?i)NAV\s*DB|DATABASE\s*(OUT|EXPIR)"),
    FallbackTag::new("EGPWS", r"(?i)\bEGPWS\b|\bGPWS\b"),
    FallbackTag::new("MCDU", r"(?i)\bMCDU\b"),
    FallbackTag::new("CENTER TANK", r"(?i)CENTER\s+TANK|TRANSFER\s+VALVE"),
    FallbackTag::new("ADF", r"(?i)\bADF\b"),
    FallbackTag::new("VOR", r"(?i)\bVOR\b"),
    FallbackTag::new("MAX FL", r"(?i)MAX\s*FL\b|FL\s*\d{2,3}\b"),
];

/// Cabin/cosmetic denylist. Checked before matching: an excluded row never
/// reaches the rule table, so ATA-chapter coincidences on cabin defects
/// cannot produce dispatch findings.
static EXCLUDE: &[&str] = &[
    r"(?i)\bLAV(ATORY)?\b",
    r"(?i)\bTOILET\b",
    r"(?i)\bGALLEY\b",
    r"(?i)\bSEAT\b",
    r"(?i)\bIFE\b",
    r"(?i)\bCARPET\b",
    r"(?i)\bODOR\b",
    r"(?i)\bDIRTY SOCKS\b",
    r"(?i)\bCATERING\b",
    r"(?i)\bCOFFEE\b",
];

fn exclude_res() -> &'static Vec<Regex> {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| EXCLUDE.iter().map(|p| Regex::new(p).unwrap()).collect())
}

pub fn is_excluded(text: &str) -> bool {
    exclude_res().iter().any(|re| re.is_match(text))
}

/// Collects every fallback tag whose pattern fires on the text, in table
/// order.
pub fn derive_tags(text: &str) -> Vec<String> {
    FALLBACK
        .iter()
        .filter(|f| f.is_match(text))
        .map(|f| f.tag.to_string())
        .collect()
}

fn rule_matches(rule: &Rule, haystack_norm: &str, codes: &BTreeSet<String>) -> Option<MatchKind> {
    for code in &rule.codes {
        if codes.contains(code) || haystack_norm.contains(code.as_str()) {
            return Some(MatchKind::Code);
        }
    }
    for kw in &rule.match_keywords {
        let k = norm(kw);
        // Very short keywords produce too many false positives.
        if k.len() < 3 {
            continue;
        }
        if haystack_norm.contains(&k) {
            return Some(MatchKind::Keyword);
        }
    }
    None
}

/// Matches one work order's combined text against the table.
///
/// All matching rules are collected in table order. When nothing matches
/// directly, the fallback vocabulary runs; resolved tags count as rule
/// matches, unresolved ones are reported as loose tags.
pub fn match_work_order<'a>(
    table: &'a RuleTable,
    haystack: &str,
    codes: &BTreeSet<String>,
) -> MatchOutcome<'a> {
    let h = norm(haystack);
    let mut outcome = MatchOutcome::default();
    let mut seen_rules = BTreeSet::new();

    for rule in &table.rules {
        if let Some(kind) = rule_matches(rule, &h, codes) {
            if seen_rules.insert(rule.key()) {
                outcome.rules.push(RuleMatch { rule, kind });
            }
        }
    }
    if !outcome.rules.is_empty() {
        return outcome;
    }

    for tag in derive_tags(haystack) {
        match table.find_by_tag(&tag) {
            Some(rule) => {
                if seen_rules.insert(rule.key()) {
                    outcome.rules.push(RuleMatch {
                        rule,
                        kind: MatchKind::FallbackResolved,
                    });
                }
            }
            None => {
                if !outcome.loose_tags.contains(&tag) {
                    outcome.loose_tags.push(tag);
                }
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refcode::extract_refs;

    fn table() -> RuleTable {
        RuleTable::from_json(
            r#"{"rules": [
                {"id": "R1", "title": "TCAS inoperative", "codes": ["34-43-01"],
                 "match_keywords": ["TCAS"]},
                {"id": "R2", "title": "ILS Category limitation", "codes": ["22-82-01"],
                 "match_keywords": ["AUTOLAND"]},
                {"id": "R3", "title": "Weather radar inop", "codes": [],
                 "match_keywords": ["WX RADAR", "WEATHER RADAR"]}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_code_match_beats_keyword() {
        let t = table();
        let hay = "XPDR SYSTEM DEGRADED PER MEL 34-43-01 TCAS";
        let out = match_work_order(&t, hay, &extract_refs(hay));
        assert_eq!(out.rules.len(), 1);
        assert_eq!(out.rules[0].kind, MatchKind::Code);
    }

    #[test]
    fn test_multi_rule_collection() {
        let t = table();
        let hay = "TCAS FAIL AND AUTOLAND RESTRICTED";
        let out = match_work_order(&t, hay, &extract_refs(hay));
        let ids: Vec<_> = out.rules.iter().map(|m| m.rule.id.as_str()).collect();
        assert_eq!(ids, vec!["R1", "R2"]);
    }

    #[test]
    fn test_fallback_resolution_and_loose_tag() {
        let t = table();
        // "ILS CAT" tag resolves to R2 via title substring; CENTER TANK
        // has no rule and stays a loose tag.
        let out = match_work_order(&t, "LANDING CAPABILITY DOWNGRADED", &BTreeSet::new());
        assert_eq!(out.rules.len(), 1);
        assert_eq!(out.rules[0].rule.id, "R2");
        assert_eq!(out.rules[0].kind, MatchKind::FallbackResolved);

        let out = match_work_order(&t, "CENTER TANK TRANSFER VALVE INOP", &BTreeSet::new());
        assert!(out.rules.is_empty());
        assert_eq!(out.loose_tags, vec!["CENTER TANK".to_string()]);
    }

    #[test]
    fn test_exclusion_keywords() {
        assert!(is_excluded("GALLEY OVEN INOP"));
        assert!(is_excluded("Seat 12F recline broken"));
        assert!(!is_excluded("TCAS FAIL"));
    }

    #[test]
    fn test_matching_is_idempotent() {
        let t = table();
        let hay = "TCAS FAIL AND AUTOLAND RESTRICTED";
        let codes = extract_refs(hay);
        let a: Vec<_> = match_work_order(&t, hay, &codes)
            .rules
            .iter()
            .map(|m| m.rule.key())
            .collect();
        let b: Vec<_> = match_work_order(&t, hay, &codes)
            .rules
            .iter()
            .map(|m| m.rule.key())
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_short_keywords_rejected() {
        let t = RuleTable::from_json(
            r#"{"rules": [{"id": "RX", "title": "X", "match_keywords": ["AT"]}]}"#,
        )
        .unwrap();
        let out = match_work_order(&t, "ATA 34 SOMETHING", &BTreeSet::new());
        assert!(out.rules.is_empty());
    }
}
