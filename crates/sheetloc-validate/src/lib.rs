use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use sheetloc_domain::AnomalyEntry;

pub mod checkpoint;
pub mod report;

pub use checkpoint::Checkpoint;
pub use report::{load_report, merge_report, save_report};

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\{\w+\}|\{\d+\}|%s|%d)").unwrap());
static LETTER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{L}").unwrap());

const TAB_ESCAPE: &str = "\\t";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnomalyKind {
    EmptyTranslation,
    TagMismatch,
    PlaceholderMismatch,
    TabEscapeMismatch,
    Untranslated,
    DuplicateKey,
    /// Language-level finding from a reviewer.
    Review,
}

impl AnomalyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AnomalyKind::EmptyTranslation => "empty-translation",
            AnomalyKind::TagMismatch => "tag-mismatch",
            AnomalyKind::PlaceholderMismatch => "placeholder-mismatch",
            AnomalyKind::TabEscapeMismatch => "tab-escape-mismatch",
            AnomalyKind::Untranslated => "untranslated",
            AnomalyKind::DuplicateKey => "duplicate-key",
            AnomalyKind::Review => "review",
        }
    }
}

impl std::fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finding for one stored row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anomaly {
    pub key: String,
    pub kind: AnomalyKind,
    pub message: String,
    pub original: String,
    pub translated: String,
}

impl Anomaly {
    fn new(kind: AnomalyKind, key: &str, original: &str, translated: &str, message: String) -> Self {
        Self {
            key: key.to_string(),
            kind,
            message,
            original: original.to_string(),
            translated: translated.to_string(),
        }
    }

    pub fn to_entry(&self) -> AnomalyEntry {
        AnomalyEntry {
            key: self.key.clone(),
            kind: self.kind.as_str().to_string(),
            message: self.message.clone(),
            original: self.original.clone(),
            translated: self.translated.clone(),
        }
    }
}

/// Rows worth checking: dialogue text (not menu text) with a non-blank original.
pub fn is_candidate(key: &str, original: &str) -> bool {
    !key.ends_with("MenuText") && !original.trim().is_empty()
}

fn counts<'t>(re: &Regex, text: &'t str) -> BTreeMap<&'t str, usize> {
    let mut out = BTreeMap::new();
    for m in re.find_iter(text) {
        *out.entry(m.as_str()).or_insert(0) += 1;
    }
    out
}

fn describe(counts: &BTreeMap<&str, usize>) -> String {
    if counts.is_empty() {
        return "none".into();
    }
    counts
        .iter()
        .map(|(k, n)| if *n == 1 { k.to_string() } else { format!("{k}×{n}") })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run every rule against one row.
///
/// An empty translation is reported alone; the other rules need text to compare.
pub fn check_row(key: &str, original: &str, translated: &str) -> Vec<Anomaly> {
    let mut out = Vec::new();
    if translated.trim().is_empty() {
        out.push(Anomaly::new(
            AnomalyKind::EmptyTranslation,
            key,
            original,
            translated,
            "translation is empty".into(),
        ));
        return out;
    }

    let (src_tags, dst_tags) = (counts(&TAG_RE, original), counts(&TAG_RE, translated));
    if src_tags != dst_tags {
        out.push(Anomaly::new(
            AnomalyKind::TagMismatch,
            key,
            original,
            translated,
            format!("tags {} became {}", describe(&src_tags), describe(&dst_tags)),
        ));
    }

    let (src_ph, dst_ph) = (counts(&PLACEHOLDER_RE, original), counts(&PLACEHOLDER_RE, translated));
    if src_ph != dst_ph {
        out.push(Anomaly::new(
            AnomalyKind::PlaceholderMismatch,
            key,
            original,
            translated,
            format!("placeholders {} became {}", describe(&src_ph), describe(&dst_ph)),
        ));
    }

    let src_tabs = original.matches(TAB_ESCAPE).count();
    let dst_tabs = translated.matches(TAB_ESCAPE).count();
    if translated.contains('\t') {
        out.push(Anomaly::new(
            AnomalyKind::TabEscapeMismatch,
            key,
            original,
            translated,
            "translation holds a literal tab".into(),
        ));
    } else if src_tabs != dst_tabs {
        out.push(Anomaly::new(
            AnomalyKind::TabEscapeMismatch,
            key,
            original,
            translated,
            format!("{src_tabs} tab escapes became {dst_tabs}"),
        ));
    }

    if translated == original && LETTER_RE.is_match(original) {
        out.push(Anomaly::new(
            AnomalyKind::Untranslated,
            key,
            original,
            translated,
            "translation repeats the original".into(),
        ));
    }
    out
}

/// A reviewer's note on one row, kept verbatim.
pub fn review_finding(key: &str, original: &str, translated: &str, note: &str) -> Anomaly {
    Anomaly::new(AnomalyKind::Review, key, original, translated, note.trim().to_string())
}

/// Keys that appeared more than once in the store; only the last row is used.
pub fn check_duplicates(shadowed: &[String]) -> Vec<Anomaly> {
    shadowed
        .iter()
        .map(|key| {
            Anomaly::new(
                AnomalyKind::DuplicateKey,
                key,
                "",
                "",
                "key appears on more than one row; the last one wins".into(),
            )
        })
        .collect()
}
