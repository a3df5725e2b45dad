//! Match-or-append planning of incoming records against a snapshot.

use indexmap::IndexMap;
use sheetloc_core::{fold_key, RecordPatch};

use crate::snapshot::Snapshot;

/// One cell write. `row` is the 1-based sheet row, `column` 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellUpdate {
    pub row: u32,
    pub column: usize,
    pub value: String,
}

impl CellUpdate {
    /// A1 address such as `C5`.
    pub fn a1(&self) -> String {
        format!("{}{}", column_letter(self.column), self.row)
    }
}

/// 0-based column index to its letter(s): 0 -> `A`, 26 -> `AA`.
pub fn column_letter(mut column: usize) -> String {
    let mut out = Vec::new();
    loop {
        out.push(b'A' + (column % 26) as u8);
        if column < 26 {
            break;
        }
        column = column / 26 - 1;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Applied first, as one batch.
    pub updates: Vec<CellUpdate>,
    /// Full rows, applied after the updates as one batch.
    pub appends: Vec<Vec<String>>,
    /// Matched keys that received at least one cell update.
    pub updated: usize,
    /// Matched keys left as they were.
    pub unchanged: usize,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.appends.is_empty()
    }

    pub fn outcome(&self) -> ReplaceOutcome {
        ReplaceOutcome {
            updated: self.updated,
            appended: self.appends.len(),
            unchanged: self.unchanged,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub updated: usize,
    pub appended: usize,
    pub unchanged: usize,
}

/// Plan the writes that bring `snapshot` in line with `records`.
///
/// Matched keys get one cell update per present field whose value differs
/// from the stored one. Unmatched keys become appended rows; keys that differ
/// only in case share one row, first casing kept and later fields overlaid.
pub fn plan(snapshot: &Snapshot, records: &IndexMap<String, RecordPatch>) -> ReconcilePlan {
    let shape = snapshot.shape();
    let mut out = ReconcilePlan::default();
    let mut pending: IndexMap<String, (String, RecordPatch)> = IndexMap::new();

    for (key, patch) in records {
        match snapshot.find(key) {
            Some((_, stored)) => {
                let before = out.updates.len();
                for &field in shape.fields() {
                    let Some(value) = patch.get(field) else {
                        continue;
                    };
                    if stored.get(shape, field) == value {
                        continue;
                    }
                    let Some(column) = shape.column(field) else {
                        continue;
                    };
                    out.updates.push(CellUpdate {
                        row: stored.row,
                        column,
                        value: value.to_string(),
                    });
                }
                if out.updates.len() > before {
                    out.updated += 1;
                } else {
                    out.unchanged += 1;
                }
            }
            None => {
                pending
                    .entry(fold_key(key))
                    .and_modify(|(_, p)| p.overlay(patch.clone()))
                    .or_insert_with(|| (key.clone(), patch.clone()));
            }
        }
    }

    out.appends = pending
        .into_values()
        .map(|(key, patch)| patch.to_row(&key, shape))
        .collect();
    out
}
