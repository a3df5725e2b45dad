//! The localization term table (`I2Languages.json`) and UI strings table.

use std::collections::HashSet;
use std::path::Path;

use indexmap::IndexMap;
use serde_json::Value;
use sheetloc_core::escape_tabs;

use crate::fields::members;
use crate::tree::read_tree;
use crate::TreeError;

/// Only plain-text terms are localizable.
pub const TEXT_TERM_TYPE: u64 = 0;

pub fn term_list(tree: &Value) -> &[Value] {
    tree.get("mSource")
        .map(|src| members(src, "mTerms"))
        .unwrap_or(&[])
}

pub fn term_list_mut(tree: &mut Value) -> Option<&mut Vec<Value>> {
    tree.get_mut("mSource")?.get_mut("mTerms")?.as_array_mut()
}

pub fn is_text_term(term: &Value) -> bool {
    term.get("TermType").and_then(Value::as_u64) == Some(TEXT_TERM_TYPE)
}

/// Term name -> text at `lang_index`, tabs escaped. Empty texts are skipped.
pub fn extract_terms(tree: &Value, lang_index: usize) -> IndexMap<String, String> {
    let mut out = IndexMap::new();
    for term in term_list(tree) {
        if !is_text_term(term) {
            continue;
        }
        let Some(name) = term.get("Term").and_then(Value::as_str) else {
            continue;
        };
        let text = term
            .get("Languages")
            .and_then(|l| l.get(lang_index))
            .and_then(Value::as_str)
            .unwrap_or_default();
        if text.is_empty() {
            continue;
        }
        out.insert(name.to_string(), escape_tabs(text).into_owned());
    }
    out
}

/// `strings.json`: UI string -> translation, in file order.
pub fn read_strings_table(path: &Path) -> Result<IndexMap<String, Value>, TreeError> {
    strings_table(path, read_tree(path)?)
}

/// The strings table held by an already parsed `tree`; `path` is for errors.
pub fn strings_table(path: &Path, tree: Value) -> Result<IndexMap<String, Value>, TreeError> {
    match tree {
        Value::Object(map) => Ok(map.into_iter().collect()),
        _ => Err(TreeError::Shape {
            path: path.to_path_buf(),
            detail: "strings table must be a JSON object".into(),
        }),
    }
}

fn is_integer(s: &str) -> bool {
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// UI strings worth staging.
///
/// Integers are never staged. A string that is already the text of a system
/// term is staged only when it is a single word.
pub fn stage_strings<'a>(
    strings: impl IntoIterator<Item = &'a str>,
    system_texts: &HashSet<&str>,
) -> Vec<String> {
    strings
        .into_iter()
        .filter(|s| !is_integer(s))
        .filter(|s| !system_texts.contains(s) || !s.contains(' '))
        .map(str::to_string)
        .collect()
}
