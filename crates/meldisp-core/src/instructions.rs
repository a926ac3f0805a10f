//! Parser for semi-structured LIDO remediation text.
//!
//! Rule authors write instructions like
//! `"Remove: item 10a: B3, B4 Insert item 18 DAT/CPDLCX"` with no strict
//! delimiters. The parser splits the text into clauses at imperative
//! trigger words, classifies each clause, and extracts capability tokens
//! in several syntaxes (PBN lists, SUR/ and DAT/ prefixes, 10A:/10B: code
//! lists, item-18 free lists, bare letter+digit codes).

use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Remove,
    Add,
    Overwrite,
    /// Unrecognised clause, kept verbatim for display. A parse miss must
    /// never hide text from the dispatcher.
    Note,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FplItem {
    Item10A,
    Item10B,
    Item18,
}

impl FplItem {
    pub const ALL: [FplItem; 3] = [FplItem::Item10A, FplItem::Item10B, FplItem::Item18];
}

impl fmt::Display for FplItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FplItem::Item10A => write!(f, "ITEM 10A"),
            FplItem::Item10B => write!(f, "ITEM 10B"),
            FplItem::Item18 => write!(f, "ITEM 18"),
        }
    }
}

/// One parsed clause of a rule's remediation text.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub verb: Verb,
    pub item: Option<FplItem>,
    pub tokens: Vec<String>,
    pub raw: String,
}

/// Trim, uppercase, strip trailing semicolons/commas/periods.
pub fn clean_token(raw: &str) -> String {
    raw.trim()
        .to_uppercase()
        .trim_end_matches([';', ',', '.'])
        .to_string()
}

macro_rules! static_re {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).unwrap())
        }
    };
}

static_re!(
    re_trigger,
    r"(?i)\b(Remove:|Insert:|Insert\b|Add:|Overwrite:|Overwrit[eo]:|Please\b)"
);
static_re!(re_item10a, r"(?i)item\s*10a|10a:");
static_re!(re_item10b, r"(?i)item\s*10b|10b:");
static_re!(re_item18, r"(?i)item\s*18|\bitem18\b");
static_re!(re_pbn, r"(?i)PBN:\s*([A-Z0-9,]+)");
static_re!(re_sur, r"(?i)SUR/([A-Z0-9]+)");
static_re!(re_dat, r"(?i)DAT/([A-Z0-9]+)");
static_re!(re_code_list, r"(?i)10[AB]:\s*([A-Z0-9, ]+)");
static_re!(re_10a_marker, r"(?i)10a:");
static_re!(re_and, r"(?i)and");
static_re!(re_bare_cap, r"\b([A-Z]\d)\b");
static_re!(re_cap_token, r"^(PBN:)?[A-Z]\d$");
static_re!(re_item18_ok, r"^[A-Z0-9/]+$");
static_re!(re_pbn_code, r"^[A-Z]\d$");

const ITEM18_STOPWORDS: &[&str] = &[
    "REMOVE", "INSERT", "FROM", "ITEM", "ADD", "OVERWRITE", "PLEASE",
];

/// Splits the text at the start of each trigger word without consuming it,
/// keeping any leading text before the first trigger as its own clause.
fn split_clauses(text: &str) -> Vec<String> {
    let mut starts: Vec<usize> = re_trigger().find_iter(text).map(|m| m.start()).collect();
    if starts.first() != Some(&0) {
        starts.insert(0, 0);
    }
    starts.push(text.len());
    starts
        .windows(2)
        .map(|w| text[w[0]..w[1]].trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

fn classify_verb(clause_lower: &str) -> Verb {
    if clause_lower.starts_with("remove:") || clause_lower.starts_with("remove ") {
        Verb::Remove
    } else if clause_lower.starts_with("insert") || clause_lower.starts_with("add:") {
        Verb::Add
    } else if clause_lower.starts_with("overwrit") || clause_lower.starts_with("please overwrite") {
        Verb::Overwrite
    } else {
        Verb::Note
    }
}

/// Explicit item markers in priority order: 10a before 10b before 18,
/// first match wins.
fn detect_item(clause: &str) -> Option<FplItem> {
    if re_item10a().is_match(clause) {
        Some(FplItem::Item10A)
    } else if re_item10b().is_match(clause) {
        Some(FplItem::Item10B)
    } else if re_item18().is_match(clause) {
        Some(FplItem::Item18)
    } else {
        None
    }
}

fn extract_tokens(
    clause: &str,
    verb: Verb,
    item: &mut Option<FplItem>,
) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    // Raw PBN codes already emitted as PBN:<code>; used to suppress
    // re-emission as bare item-18 tokens.
    let mut pbn_codes: BTreeSet<String> = BTreeSet::new();

    if let Some(cap) = re_pbn().captures(clause) {
        for part in cap[1].split(',') {
            let code = clean_token(part);
            if !code.is_empty() {
                pbn_codes.insert(code.clone());
                tokens.push(format!("PBN:{}", code));
            }
        }
    }
    if let Some(cap) = re_sur().captures(clause) {
        tokens.push(format!("SUR/{}", clean_token(&cap[1])));
    }
    if let Some(cap) = re_dat().captures(clause) {
        tokens.push(format!("DAT/{}", clean_token(&cap[1])));
    }

    if let Some(cap) = re_code_list().captures(clause) {
        let list = re_and().replace_all(&cap[1], ",");
        for part in list.split(',') {
            let tok = clean_token(part);
            if !tok.is_empty() {
                tokens.push(tok);
            }
        }
        if item.is_none() {
            *item = Some(if re_10a_marker().is_match(clause) {
                FplItem::Item10A
            } else {
                FplItem::Item10B
            });
        }
    }

    if re_item18().is_match(clause) {
        let after = re_item18()
            .splitn(clause, 2)
            .nth(1)
            .unwrap_or("")
            .replace(':', " ");
        for word in after.split_whitespace() {
            let tok = clean_token(word);
            if tok.is_empty() || tok.len() > 12 {
                continue;
            }
            if ITEM18_STOPWORDS.contains(&tok.as_str()) {
                continue;
            }
            if tok.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            if tok == "10A" || tok == "10B" || tok == "18" {
                continue;
            }
            if tok == "PBN" || tok == "SUR" || tok == "DAT" {
                continue;
            }
            if re_pbn_code().is_match(&tok) && pbn_codes.contains(&tok) {
                continue;
            }
            if re_item18_ok().is_match(&tok) {
                tokens.push(tok);
            }
        }
        if item.is_none() {
            *item = Some(FplItem::Item18);
        }
    }

    // Generic capability list ("Insert: B3, B4 and C4") without any item
    // or prefix syntax. Require at least two distinct codes so a stray
    // "A1" in prose does not fire.
    if tokens.is_empty() && matches!(verb, Verb::Add | Verb::Remove) {
        let uniq: BTreeSet<String> = re_bare_cap()
            .captures_iter(clause)
            .map(|c| clean_token(&c[1]))
            .collect();
        if uniq.len() >= 2 {
            tokens.extend(uniq);
        }
    }

    // Final cleaning pass; the same token can surface through more than
    // one syntax (e.g. DAT/ prefix and the item-18 free list), so dedup
    // while preserving first-seen order.
    let mut seen = BTreeSet::new();
    tokens
        .into_iter()
        .map(|t| clean_token(&t))
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}

/// Parses one rule's remediation field into an ordered clause list.
/// Note and Overwrite clauses are carried through for display even though
/// they never feed the flight-plan delta.
pub fn parse_instructions(lido: &str) -> Vec<Instruction> {
    let text = lido.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut last_item: Option<FplItem> = None;

    for clause in split_clauses(&text) {
        let lower = clause.to_lowercase();
        let verb = classify_verb(&lower);
        let mut item = detect_item(&clause);
        let tokens = extract_tokens(&clause, verb, &mut item);

        // Continuation clauses omit the item reference; inherit it when
        // every token still looks like a capability code.
        if item.is_none() && last_item.is_some() && !tokens.is_empty() {
            let looks_like_caps = tokens
                .iter()
                .all(|t| re_cap_token().is_match(t) || t.starts_with("PBN:"));
            if looks_like_caps {
                item = last_item;
            }
        }
        if item.is_some() {
            last_item = item;
        }

        out.push(Instruction {
            verb,
            item,
            tokens,
            raw: clause,
        });
    }
    out
}

/// Add/remove token sets for one flight-plan item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemDelta {
    pub add: BTreeSet<String>,
    pub remove: BTreeSet<String>,
}

/// Aggregated flight-plan edit across items 10A, 10B and 18.
///
/// Invariant after [`FlightPlanDelta::resolve_conflicts`]: for every item,
/// `add` and `remove` are disjoint, with removal winning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlightPlanDelta {
    pub item10a: ItemDelta,
    pub item10b: ItemDelta,
    pub item18: ItemDelta,
}

impl FlightPlanDelta {
    pub fn item(&self, item: FplItem) -> &ItemDelta {
        match item {
            FplItem::Item10A => &self.item10a,
            FplItem::Item10B => &self.item10b,
            FplItem::Item18 => &self.item18,
        }
    }

    pub fn item_mut(&mut self, item: FplItem) -> &mut ItemDelta {
        match item {
            FplItem::Item10A => &mut self.item10a,
            FplItem::Item10B => &mut self.item10b,
            FplItem::Item18 => &mut self.item18,
        }
    }

    pub fn is_empty(&self) -> bool {
        FplItem::ALL.iter().all(|&i| {
            let d = self.item(i);
            d.add.is_empty() && d.remove.is_empty()
        })
    }

    pub fn merge(&mut self, other: &FlightPlanDelta) {
        for &i in &FplItem::ALL {
            let dst = self.item_mut(i);
            let src = other.item(i);
            dst.add.extend(src.add.iter().cloned());
            dst.remove.extend(src.remove.iter().cloned());
        }
    }

    /// Removal wins: a token requested in both sets stays only in
    /// `remove`, so the conflict remains inspectable there.
    pub fn resolve_conflicts(&mut self) {
        for &i in &FplItem::ALL {
            let d = self.item_mut(i);
            d.add.retain(|t| !d.remove.contains(t));
        }
    }
}

/// Builds one rule's flight-plan delta from its remediation text.
/// Overwrite and Note clauses are display-only and do not mutate the
/// delta.
pub fn delta_from_lido(lido: &str) -> FlightPlanDelta {
    let mut delta = FlightPlanDelta::default();
    for instr in parse_instructions(lido) {
        let item = match instr.item {
            Some(i) if !instr.tokens.is_empty() => i,
            _ => continue,
        };
        let bucket = match instr.verb {
            Verb::Remove => &mut delta.item_mut(item).remove,
            Verb::Add => &mut delta.item_mut(item).add,
            Verb::Overwrite | Verb::Note => continue,
        };
        for tok in &instr.tokens {
            let tok = clean_token(tok);
            if tok.is_empty() || tok == "PBN" || tok == "PBN:" {
                continue;
            }
            bucket.insert(tok);
        }
    }
    delta.resolve_conflicts();
    delta
}
