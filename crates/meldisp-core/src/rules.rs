//! The curated MEL action rule table.
//!
//! Loaded once at startup from `actions.json` and immutable for the
//! session. A load failure is never fatal: matching degrades to the
//! fallback tag vocabulary only.

use crate::refcode::normalize_ref;
use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Rule {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// MEL/CDL reference codes this rule applies to (canonical form).
    #[serde(default)]
    pub codes: Vec<String>,
    /// Keywords matched as substrings of the normalized work-order text.
    #[serde(default)]
    pub match_keywords: Vec<String>,
    /// Free-text LIDO / flight-plan remediation instructions.
    #[serde(default)]
    pub lido: String,
    /// Free-text "other tasks" ops note.
    #[serde(default)]
    pub other: String,
}

impl Rule {
    /// Stable identity key for deduplication across findings.
    pub fn key(&self) -> String {
        if !self.id.is_empty() {
            self.id.clone()
        } else {
            self.title.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RuleTable {
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// Uppercase, collapse whitespace, trim. All containment checks in the
/// matcher run on text normalized this way.
pub fn norm(s: &str) -> String {
    s.to_uppercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

impl RuleTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses a rule table from JSON text and canonicalises every
    /// reference code so that both `-A` and `A` spellings match.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut table: RuleTable =
            serde_json::from_str(json).context("Failed to parse rule table JSON")?;
        for rule in &mut table.rules {
            for code in &mut rule.codes {
                *code = normalize_ref(code);
            }
        }
        Ok(table)
    }

    /// Loads the rule table from disk. Missing or corrupt files degrade to
    /// an empty table with a warning; the dispatch workflow must not stop
    /// on a bad config.
    pub fn load_or_empty(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_json(&content) {
                Ok(table) => table,
                Err(e) => {
                    warn!(
                        "Rule table unreadable, continuing with fallback tags only — path={} error={}",
                        path.display(),
                        e
                    );
                    Self::empty()
                }
            },
            Err(e) => {
                warn!(
                    "Rule table not found, continuing with fallback tags only — path={} error={}",
                    path.display(),
                    e
                );
                Self::empty()
            }
        }
    }

    /// Secondary lookup used to resolve a fallback tag to a real rule:
    /// exact or substring title match first, then exact keyword match.
    pub fn find_by_tag(&self, tag: &str) -> Option<&Rule> {
        let t = norm(tag);
        if t.is_empty() {
            return None;
        }
        for rule in &self.rules {
            let title = norm(&rule.title);
            if !title.is_empty() && (title == t || title.contains(&t)) {
                return Some(rule);
            }
        }
        for rule in &self.rules {
            for kw in &rule.match_keywords {
                if norm(kw) == t {
                    return Some(rule);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RuleTable {
        RuleTable::from_json(
            r#"{"rules": [
                {"id": "R1", "title": "TCAS inoperative", "codes": ["34-43-01"],
                 "match_keywords": ["TCAS"], "lido": "", "other": ""},
                {"id": "R2", "title": "ILS Category limitation",
                 "codes": ["22-82-01-A"], "match_keywords": ["AUTOLAND"],
                 "lido": "", "other": ""}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_codes_canonicalised_on_load() {
        let table = sample();
        assert_eq!(table.rules[1].codes[0], "22-82-01A");
    }

    #[test]
    fn test_find_by_tag_title_then_keyword() {
        let table = sample();
        assert_eq!(table.find_by_tag("TCAS").unwrap().id, "R1");
        assert_eq!(table.find_by_tag("ILS Category").unwrap().id, "R2");
        assert_eq!(table.find_by_tag("AUTOLAND").unwrap().id, "R2");
        assert!(table.find_by_tag("CENTER TANK").is_none());
    }

    #[test]
    fn test_load_missing_is_empty() {
        let table = RuleTable::load_or_empty(Path::new("/nonexistent/actions.json"));
        assert!(table.rules.is_empty());
    }

    #[test]
    fn test_norm_collapses_whitespace() {
        assert_eq!(norm("  tcas   fail\tleft "), "TCAS FAIL LEFT");
    }
}
