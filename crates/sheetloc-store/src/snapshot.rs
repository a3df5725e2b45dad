//! In-memory view of one table as read from the store.

use std::collections::HashMap;

use indexmap::IndexMap;
use sheetloc_core::{fold_key, Field, Shape};

/// One data row: its 1-based sheet row number and the cells after the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRow {
    pub row: u32,
    pub cells: Vec<String>,
}

impl StoredRow {
    pub fn get(&self, shape: Shape, field: Field) -> &str {
        shape
            .column(field)
            .and_then(|c| self.cells.get(c - 1))
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// Rows keyed by column A.
///
/// Empty keys are ignored. A repeated key keeps its first position but takes
/// the later row, and is listed in [`Snapshot::shadowed`]. The case-folded
/// index points at the first casing seen.
#[derive(Debug, Clone)]
pub struct Snapshot {
    shape: Shape,
    rows: IndexMap<String, StoredRow>,
    folded: HashMap<String, String>,
    shadowed: Vec<String>,
    last_row: u32,
}

impl Snapshot {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            rows: IndexMap::new(),
            folded: HashMap::new(),
            shadowed: Vec::new(),
            last_row: 1,
        }
    }

    /// Build from raw sheet rows (key first), numbered from sheet row 2.
    pub fn from_values(shape: Shape, values: impl IntoIterator<Item = Vec<String>>) -> Self {
        let mut snap = Self::new(shape);
        for (i, row) in values.into_iter().enumerate() {
            snap.push(i as u32 + 2, row);
        }
        snap
    }

    /// Record sheet row `row` holding `cells` (key first, short rows padded).
    pub fn push(&mut self, row: u32, mut cells: Vec<String>) {
        self.last_row = self.last_row.max(row);
        cells.resize(self.shape.width(), String::new());
        let key = cells.remove(0);
        if key.is_empty() {
            return;
        }
        self.folded.entry(fold_key(&key)).or_insert_with(|| key.clone());
        let stored = StoredRow { row, cells };
        if self.rows.insert(key.clone(), stored).is_some() {
            self.shadowed.push(key);
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Highest sheet row seen, header included.
    pub fn last_row(&self) -> u32 {
        self.last_row
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StoredRow)> {
        self.rows.iter().map(|(k, r)| (k.as_str(), r))
    }

    pub fn get(&self, key: &str) -> Option<&StoredRow> {
        self.rows.get(key)
    }

    /// Case-insensitive lookup returning the stored casing of the key.
    pub fn find(&self, key: &str) -> Option<(&str, &StoredRow)> {
        let stored = self.folded.get(&fold_key(key))?;
        self.rows.get_key_value(stored).map(|(k, r)| (k.as_str(), r))
    }

    pub fn field(&self, key: &str, field: Field) -> Option<&str> {
        self.find(key).map(|(_, r)| r.get(self.shape, field))
    }

    /// Keys that appeared more than once; the later row won.
    pub fn shadowed(&self) -> &[String] {
        &self.shadowed
    }
}
