//! Optional auxiliary data: the MEL-document index and the token glossary.
//!
//! The index is generated offline from the MEL PDF and keyed by reference
//! code; the core only consumes the per-code landing-category summary.
//! Both files are optional and their absence is never an error.

use crate::refcode::normalize_ref;
use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatSummary {
    /// Category tokens found near this reference code, e.g. `CAT3B`.
    #[serde(default)]
    pub cats: Vec<String>,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MelDocIndex {
    #[serde(default)]
    pub pdf_sha256: String,
    #[serde(default)]
    pub generated_utc: String,
    #[serde(default)]
    pub cat_summary: HashMap<String, CatSummary>,
}

impl MelDocIndex {
    pub fn from_json(json: &str) -> Result<Self> {
        let mut index: MelDocIndex =
            serde_json::from_str(json).context("Failed to parse MEL document index JSON")?;
        // Index keys come from PDF extraction and may carry the `-A`
        // spelling of lettered codes.
        index.cat_summary = index
            .cat_summary
            .into_iter()
            .map(|(k, v)| (normalize_ref(&k), v))
            .collect();
        Ok(index)
    }

    pub fn load(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match Self::from_json(&content) {
            Ok(index) => Some(index),
            Err(e) => {
                warn!(
                    "MEL document index unreadable, ignoring — path={} error={}",
                    path.display(),
                    e
                );
                None
            }
        }
    }

    /// Category tokens recorded for any of the given reference codes.
    pub fn cats_for_codes<'a, I: IntoIterator<Item = &'a str>>(&self, codes: I) -> Vec<String> {
        let mut out = Vec::new();
        for code in codes {
            if let Some(summary) = self.cat_summary.get(&normalize_ref(code)) {
                for cat in &summary.cats {
                    let cat = cat.trim().to_uppercase();
                    if !cat.is_empty() && !out.contains(&cat) {
                        out.push(cat);
                    }
                }
            }
        }
        out
    }
}

/// Capability-token glossary, presentation-only.
#[derive(Debug, Clone, Default)]
pub struct Glossary {
    entries: HashMap<String, String>,
}

impl Glossary {
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: HashMap<String, String> =
            serde_json::from_str(json).context("Failed to parse glossary JSON")?;
        Ok(Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.trim().to_uppercase(), v))
                .collect(),
        })
    }

    pub fn load(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match Self::from_json(&content) {
            Ok(g) => Some(g),
            Err(e) => {
                warn!(
                    "Glossary unreadable, ignoring — path={} error={}",
                    path.display(),
                    e
                );
                None
            }
        }
    }

    pub fn explain(&self, token: &str) -> Option<&str> {
        // Prefixed tokens fall back to their bare code.
        let up = token.trim().to_uppercase();
        if let Some(text) = self.entries.get(&up) {
            return Some(text);
        }
        let bare = up
            .rsplit_once(&[':', '/'][..])
            .map(|(_, b)| b.to_string())
            .unwrap_or(up);
        self.entries.get(&bare).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_keys_normalised() {
        let index = MelDocIndex::from_json(
            r#"{"pdf_sha256": "ab", "cat_summary": {
                "22-82-01-A": {"cats": ["CAT3A", "cat3b"], "page": 12}
            }}"#,
        )
        .unwrap();
        let cats = index.cats_for_codes(["22-82-01A"]);
        assert_eq!(cats, vec!["CAT3A".to_string(), "CAT3B".to_string()]);
    }

    #[test]
    fn test_missing_code_is_empty() {
        let index = MelDocIndex::default();
        assert!(index.cats_for_codes(["31-30-07"]).is_empty());
    }

    #[test]
    fn test_glossary_prefixed_fallback() {
        let g = Glossary::from_json(
            r#"{"TCAS": "Traffic collision avoidance", "CPDLCX": "CPDLC via ATN"}"#,
        )
        .unwrap();
        assert!(g.explain("tcas").is_some());
        assert!(g.explain("DAT/CPDLCX").is_some());
        assert!(g.explain("PBN:A1").is_none());
    }
}
