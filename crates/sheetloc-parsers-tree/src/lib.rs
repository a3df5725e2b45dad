use std::collections::HashSet;
use std::path::{Path, PathBuf};

use color_eyre::eyre::WrapErr;
use sheetloc_core::{Result, StringKey, TextRecord};

pub mod chapters;
pub mod extract;
pub mod fields;
pub mod terms;
pub mod tree;

pub use chapters::ChapterTable;
pub use extract::{extract_file, ExtractOptions, ExtractStats, Extraction, ExtractionSet, FileExtraction};
pub use fields::{FieldKind, FieldLookup, FieldLookupMut, FieldQuery, TitleMatch};
pub use tree::{
    discover_tree_files, output_path, read_tree, read_tree_with_layout, write_tree, TreeLayout, STRINGS_FILE,
    TERM_TABLE_FILE,
};

#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path}: invalid JSON: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("{path}: {detail}")]
    Shape { path: PathBuf, detail: String },
    #[error("chapter definitions {path}: {detail}")]
    Chapters { path: PathBuf, detail: String },
    #[error("tree directory not found: {0}")]
    MissingDir(PathBuf),
    #[error("term table not found at {0}; export the game data first")]
    MissingTermTable(PathBuf),
    #[error("cannot walk tree directory: {0}")]
    Walk(String),
}

/// Everything [`scan_tree_dir`] needs besides the directory.
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions<'a> {
    pub extract: ExtractOptions<'a>,
    /// Column of the base language in the term table.
    pub base_lang_index: usize,
}

/// Extract every tree under `root`, plus its term table and strings table.
///
/// A missing term table is fatal. So is any tree that fails to parse.
pub fn scan_tree_dir(root: &Path, opts: &ScanOptions<'_>) -> Result<Extraction> {
    let term_path = root.join(TERM_TABLE_FILE);
    if !term_path.is_file() {
        return Err(TreeError::MissingTermTable(term_path).into());
    }
    let term_tree = read_tree(&term_path)?;
    let terms: Vec<TextRecord> = terms::extract_terms(&term_tree, opts.base_lang_index)
        .into_iter()
        .map(|(name, text)| TextRecord::new(StringKey::system(name), text))
        .collect();
    tracing::info!(event = "terms_extracted", path = %term_path.display(), count = terms.len());

    let strings_path = root.join(STRINGS_FILE);
    let strings = if strings_path.is_file() {
        let table = terms::read_strings_table(&strings_path)?;
        let system: HashSet<&str> = terms.iter().map(|t| t.original.as_str()).collect();
        let staged = terms::stage_strings(table.keys().map(String::as_str), &system);
        tracing::info!(event = "strings_staged", total = table.len(), staged = staged.len());
        staged
    } else {
        tracing::debug!(event = "strings_table_absent", path = %strings_path.display());
        Vec::new()
    };

    let mut set = ExtractionSet::default();
    for path in discover_tree_files(root)? {
        let tree = read_tree(&path).wrap_err_with(|| format!("extracting {}", path.display()))?;
        set.absorb(extract_file(&path, &tree, &opts.extract));
    }
    let extraction = set.finish(terms, strings);
    tracing::info!(
        event = "scan_finished",
        files = extraction.files,
        actors = extraction.actors.len(),
        quests = extraction.quests.len(),
        dialogues = extraction.dialogues.len(),
        unresolved_chapters = extraction.unresolved_chapters.len(),
    );
    Ok(extraction)
}
