//! Reading and writing JSON trees without losing key order or number text.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::Value;
use walkdir::WalkDir;

use crate::TreeError;

pub const TERM_TABLE_FILE: &str = "I2Languages.json";
pub const STRINGS_FILE: &str = "strings.json";
pub const OUTPUT_SUFFIX: &str = "-mod.json";

/// Whitespace conventions of a source file, reproduced when it is written back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLayout {
    /// One indentation level; `None` for single-line JSON.
    pub indent: Option<String>,
    pub bom: bool,
    pub trailing_newline: bool,
}

impl Default for TreeLayout {
    /// The exporter's layout: four-space indent, no BOM, no final newline.
    fn default() -> Self {
        Self {
            indent: Some("    ".into()),
            bom: false,
            trailing_newline: false,
        }
    }
}

impl TreeLayout {
    pub fn detect(text: &str) -> Self {
        let bom = text.starts_with(BOM);
        let body = text.trim_start_matches(BOM);
        let indent = if body.trim_end().contains('\n') {
            // the first indented line sits one level deep
            let level = body.lines().skip(1).find_map(|line| {
                let ws = &line[..line.len() - line.trim_start().len()];
                (!ws.is_empty()).then(|| ws.to_string())
            });
            Some(level.unwrap_or_else(|| "    ".into()))
        } else {
            None
        };
        Self {
            indent,
            bom,
            trailing_newline: body.ends_with('\n'),
        }
    }
}

const BOM: char = '\u{feff}';

pub fn read_tree(path: &Path) -> Result<Value, TreeError> {
    read_tree_with_layout(path).map(|(value, _)| value)
}

pub fn read_tree_with_layout(path: &Path) -> Result<(Value, TreeLayout), TreeError> {
    let text = std::fs::read_to_string(path).map_err(|source| TreeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value = parse_tree(path, &text)?;
    Ok((value, TreeLayout::detect(&text)))
}

pub fn parse_tree(path: &Path, text: &str) -> Result<Value, TreeError> {
    serde_json::from_str(text.trim_start_matches(BOM)).map_err(|source| TreeError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn render_tree(value: &Value, layout: &TreeLayout) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    if layout.bom {
        let mut tmp = [0u8; 4];
        buf.extend_from_slice(BOM.encode_utf8(&mut tmp).as_bytes());
    }
    match layout.indent.as_deref() {
        Some(indent) => {
            let formatter = PrettyFormatter::with_indent(indent.as_bytes());
            let mut ser = Serializer::with_formatter(&mut buf, formatter);
            value.serialize(&mut ser)?;
        }
        None => serde_json::to_writer(&mut buf, value)?,
    }
    if layout.trailing_newline {
        buf.push(b'\n');
    }
    Ok(buf)
}

pub fn write_tree(path: &Path, value: &Value, layout: &TreeLayout) -> Result<(), TreeError> {
    let bytes = render_tree(value, layout).map_err(|source| TreeError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, bytes).map_err(|source| TreeError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// `dir/name.json` -> `dir/name-mod.json`
pub fn output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{stem}{OUTPUT_SUFFIX}"))
}

/// Per-file trees eligible for extraction and re-injection.
pub fn is_tree_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    is_json
        && name != TERM_TABLE_FILE
        && name != STRINGS_FILE
        && !name.starts_with("parsed_")
        && !name.ends_with(OUTPUT_SUFFIX)
}

/// Recursive, sorted by file name at each level.
pub fn discover_tree_files(root: &Path) -> Result<Vec<PathBuf>, TreeError> {
    if !root.is_dir() {
        return Err(TreeError::MissingDir(root.to_path_buf()));
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| TreeError::Walk(e.to_string()))?;
        if entry.file_type().is_file() && is_tree_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Text of a scalar: strings as-is, numbers by their exact source digits.
pub fn value_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
