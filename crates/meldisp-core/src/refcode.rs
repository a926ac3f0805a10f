//! MEL reference-code extraction and canonicalisation.
//!
//! Reference codes look like `31-30-07`, optionally with a sub-revision
//! suffix (`22-82-01/02`) or a trailing capability letter (`31-30-07A`).
//! Maintenance exports write the trailing letter both as `31-30-07A` and
//! `31-30-07-A`; both spellings canonicalise to the former.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

fn re_plain() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{2}-\d{2}-\d{2}(?:/\d{2})?)\b").unwrap())
}

fn re_lettered() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{2}-\d{2}-\d{2}-?[A-Z])\b").unwrap())
}

fn re_fold_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{2}-\d{2}-\d{2}(?:/\d{2})?)-([A-Z])$").unwrap())
}

/// Canonical form of a reference code: uppercase, trailing `-A` folded to `A`.
pub fn normalize_ref(raw: &str) -> String {
    let up = raw.trim().to_uppercase();
    re_fold_suffix().replace(&up, "$1$2").into_owned()
}

/// Scans free text for MEL reference codes. Duplicates (including the two
/// spellings of a lettered code) collapse into one canonical entry.
/// Never fails; text without codes yields an empty set.
pub fn extract_refs(text: &str) -> BTreeSet<String> {
    let mut codes = BTreeSet::new();
    for cap in re_plain().captures_iter(text) {
        codes.insert(normalize_ref(&cap[1]));
    }
    for cap in re_lettered().captures_iter(text) {
        codes.insert(normalize_ref(&cap[1]));
    }
    codes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_and_suffixed() {
        let refs = extract_refs("MEL 31-30-07 and CDL 22-82-01/02 open");
        assert!(refs.contains("31-30-07"));
        assert!(refs.contains("22-82-01/02"));
        assert_eq!(refs.len(), 2);
    }

    #[test]
    fn test_lettered_spellings_collapse() {
        let a = extract_refs("per MEL 31-30-07A");
        let b = extract_refs("per MEL 31-30-07-A");
        assert!(a.contains("31-30-07A"));
        assert!(b.contains("31-30-07A"));
    }

    #[test]
    fn test_normalize_ref() {
        assert_eq!(normalize_ref("31-30-07-a"), "31-30-07A");
        assert_eq!(normalize_ref("31-30-07A"), "31-30-07A");
        assert_eq!(normalize_ref(" 22-82-01/02 "), "22-82-01/02");
    }

    #[test]
    fn test_no_match_is_empty() {
        assert!(extract_refs("TCAS FAIL LEFT SIDE").is_empty());
    }
}
