use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::TreeError;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Titles {
    One(String),
    Many(Vec<String>),
}

impl Titles {
    fn contains(&self, title: &str) -> bool {
        match self {
            Titles::One(t) => t == title,
            Titles::Many(ts) => ts.iter().any(|t| t == title),
        }
    }
}

/// Chapter number -> conversation title(s), checked in ascending order.
#[derive(Debug, Clone, Default)]
pub struct ChapterTable {
    entries: Vec<(u32, Titles)>,
}

impl ChapterTable {
    pub fn load(path: &Path) -> Result<Self, TreeError> {
        let text = std::fs::read_to_string(path).map_err(|source| TreeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|e| match e {
            TreeError::Chapters { detail, .. } => TreeError::Chapters {
                path: path.to_path_buf(),
                detail,
            },
            other => other,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, TreeError> {
        let invalid = |detail: String| TreeError::Chapters {
            path: Default::default(),
            detail,
        };
        let raw: IndexMap<String, Titles> =
            serde_json::from_str(text).map_err(|e| invalid(e.to_string()))?;
        let mut entries = Vec::with_capacity(raw.len());
        for (k, titles) in raw {
            let n = k
                .trim()
                .parse::<u32>()
                .map_err(|_| invalid(format!("chapter key `{k}` is not an integer")))?;
            entries.push((n, titles));
        }
        entries.sort_by_key(|(n, _)| *n);
        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, title: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|(_, titles)| titles.contains(title))
            .map(|(n, _)| *n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_and_list_forms() {
        let table = ChapterTable::from_json(
            r#"{ "2": ["Cellar", "Attic"], "10": "Finale", "1": "Intro" }"#,
        )
        .unwrap();
        assert_eq!(table.lookup("Intro"), Some(1));
        assert_eq!(table.lookup("Attic"), Some(2));
        assert_eq!(table.lookup("Finale"), Some(10));
        assert_eq!(table.lookup("intro"), None);
        assert_eq!(table.lookup("Nowhere"), None);
    }

    #[test]
    fn non_numeric_keys_are_rejected() {
        assert!(ChapterTable::from_json(r#"{ "one": "Intro" }"#).is_err());
    }
}
