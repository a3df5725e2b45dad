use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

static MARKUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Drop rich-text tags such as `<color=#fff>` or `</b>`.
pub fn strip_markup(s: &str) -> Cow<'_, str> {
    MARKUP_RE.replace_all(s, "")
}

/// Literal tabs become the two-character escape `\t` for storage.
pub fn escape_tabs(s: &str) -> Cow<'_, str> {
    if s.contains('\t') {
        Cow::Owned(s.replace('\t', "\\t"))
    } else {
        Cow::Borrowed(s)
    }
}

pub fn unescape_tabs(s: &str) -> Cow<'_, str> {
    if s.contains("\\t") {
        Cow::Owned(s.replace("\\t", "\t"))
    } else {
        Cow::Borrowed(s)
    }
}

/// Case-folded form used for key matching.
pub fn fold_key(key: &str) -> String {
    key.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_but_keeps_text() {
        assert_eq!(strip_markup("<color=#ff0>Grace</color>"), "Grace");
        assert_eq!(strip_markup("a < b"), "a < b");
        assert!(matches!(strip_markup("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn tab_escape_round_trip() {
        let raw = "Name\tValue";
        let stored = escape_tabs(raw);
        assert_eq!(stored, "Name\\tValue");
        assert_eq!(unescape_tabs(&stored), raw);
    }
}
