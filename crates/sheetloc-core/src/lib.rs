use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod key;
pub mod table;
pub mod text;

pub use key::{DialoguePart, KeyScheme, StringKey};
pub use table::{Field, RecordPatch, Shape, Table};
pub use text::{escape_tabs, fold_key, strip_markup, unescape_tabs};

/// Workspace-wide result alias.
pub type Result<T> = color_eyre::eyre::Result<T>;

/// One localizable string pulled out of a source tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRecord {
    pub key: StringKey,
    /// Speaker display name, markup stripped. Dialogue records only.
    pub actor: Option<String>,
    pub original: String,
    pub translated: Option<String>,
    /// Chapter frozen for the source file. Dialogue records only.
    pub chapter: Option<u32>,
    pub source_file: Option<PathBuf>,
}

impl TextRecord {
    pub fn new(key: StringKey, original: impl Into<String>) -> Self {
        Self {
            key,
            actor: None,
            original: original.into(),
            translated: None,
            chapter: None,
            source_file: None,
        }
    }

    pub fn with_actor(mut self, actor: Option<String>) -> Self {
        self.actor = actor;
        self
    }

    pub fn with_chapter(mut self, chapter: Option<u32>) -> Self {
        self.chapter = chapter;
        self
    }

    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_file = Some(path.into());
        self
    }

    /// Patch pushed to the store on extraction. The translation is never
    /// part of it so reviewer work survives re-extraction.
    pub fn to_patch(&self) -> RecordPatch {
        RecordPatch {
            value: None,
            actor: self.actor.clone(),
            original: Some(self.original.clone()),
            translated: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum SheetLocError {
    #[error("invalid string key `{0}`")]
    InvalidKey(String),
    #[error("unknown key scheme `{0}` (expected `name-field` or `display-text`)")]
    UnknownKeyScheme(String),
    #[error("{0}")]
    Other(String),
}
