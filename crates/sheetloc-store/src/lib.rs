use std::path::PathBuf;

use indexmap::IndexMap;
use sheetloc_config::{SheetNames, StoreSettings};
use sheetloc_core::{Field, RecordPatch, Table};

mod auth;
pub mod local;
pub mod reconcile;
pub mod remote;
pub mod retry;
pub mod snapshot;

pub use local::WorkbookStore;
pub use reconcile::{plan, CellUpdate, ReconcilePlan, ReplaceOutcome};
pub use remote::SheetsStore;
pub use retry::RetryPolicy;
pub use snapshot::{Snapshot, StoredRow};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("credentials {path}: {message}")]
    Credentials { path: PathBuf, message: String },
    #[error("cannot sign token assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error("unexpected response: {0}")]
    Response(String),
    #[error("sheet `{0}` not found")]
    MissingSheet(String),
    #[error("invalid colour `{0}`, expected #rrggbb")]
    Colour(String),
    #[error("workbook {path}: {message}")]
    Workbook { path: PathBuf, message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("no store configured: set `storage` for a local workbook, or `spreadsheet_id` and `credentials_file` for a remote spreadsheet")]
    NotConfigured,
}

impl StoreError {
    /// Rate-limit responses worth retrying.
    pub fn is_quota(&self) -> bool {
        match self {
            StoreError::Http { status, message } => {
                (*status == 429 || *status == 403) && message.contains("Quota exceeded")
            }
            _ => false,
        }
    }
}

/// A spreadsheet-like store of keyed rows, one sheet per [`Table`].
pub trait TabularStore {
    /// Short backend label for logs and summaries.
    fn backend(&self) -> &'static str;

    fn sheet_name(&self, table: &Table) -> String;

    fn get(&self, table: &Table) -> StoreResult<Snapshot>;

    fn append(&self, table: &Table, rows: &[Vec<String>]) -> StoreResult<()>;

    fn update(&self, table: &Table, updates: &[CellUpdate]) -> StoreResult<()>;

    /// Highlight the `field` cell of each matching row. Returns rows marked.
    fn mark(&self, table: &Table, keys: &[String], colour: &str, field: Field) -> StoreResult<usize>;

    /// Reconcile `records` into the table: updates first, then appends.
    fn replace(&self, table: &Table, records: &IndexMap<String, RecordPatch>) -> StoreResult<ReplaceOutcome> {
        let snapshot = self.get(table)?;
        let plan = reconcile::plan(&snapshot, records);
        tracing::debug!(
            event = "store_replace_planned",
            backend = self.backend(),
            table = %table,
            records = records.len(),
            updates = plan.updates.len(),
            appends = plan.appends.len(),
        );
        if !plan.updates.is_empty() {
            self.update(table, &plan.updates)?;
        }
        if !plan.appends.is_empty() {
            self.append(table, &plan.appends)?;
        }
        Ok(plan.outcome())
    }
}

/// Sheet title for `table`; vocabularies get `vocab_prefix` before their name.
pub fn sheet_title(names: &SheetNames, table: &Table, vocab_prefix: &str) -> String {
    match table {
        Table::Actors => names.actors.clone(),
        Table::Quests => names.quests.clone(),
        Table::System => names.system.clone(),
        Table::Dialogues => names.dialogues.clone(),
        Table::Strings => names.strings.clone(),
        Table::Vocab(name) => {
            let name = if name == Table::CHARS {
                &names.vocab_chars
            } else if name == Table::TERMS {
                &names.vocab_terms
            } else {
                name
            };
            format!("{vocab_prefix}{name}")
        }
    }
}

/// Local workbook when `storage` is set, the remote spreadsheet otherwise.
pub fn open_store(settings: &StoreSettings, names: &SheetNames) -> StoreResult<Box<dyn TabularStore>> {
    if let Some(path) = settings.storage.as_ref() {
        tracing::info!(event = "store_selected", backend = "local", path = %path.display());
        return Ok(Box::new(WorkbookStore::new(
            path.clone(),
            settings.template.clone(),
            names.clone(),
        )));
    }
    match (settings.spreadsheet_id.as_deref(), settings.credentials_file.as_deref()) {
        (Some(id), Some(creds)) if !id.trim().is_empty() => {
            tracing::info!(event = "store_selected", backend = "remote", spreadsheet = id);
            Ok(Box::new(SheetsStore::new(id, creds, names.clone())?))
        }
        _ => Err(StoreError::NotConfigured),
    }
}
