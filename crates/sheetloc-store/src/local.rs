//! Local `.xlsx` workbook backend.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::OnceCell;
use sheetloc_config::SheetNames;
use sheetloc_core::{Field, Shape, Table};
use umya_spreadsheet::{Spreadsheet, Worksheet};

use crate::reconcile::CellUpdate;
use crate::snapshot::Snapshot;
use crate::{sheet_title, StoreError, StoreResult, TabularStore};

const VOCAB_PREFIX: &str = "VOCAB-";

/// One workbook file, loaded on first use and rewritten after every change.
pub struct WorkbookStore {
    path: PathBuf,
    template: Option<PathBuf>,
    names: SheetNames,
    book: OnceCell<Mutex<Spreadsheet>>,
}

impl WorkbookStore {
    pub fn new(path: PathBuf, template: Option<PathBuf>, names: SheetNames) -> Self {
        Self {
            path,
            template,
            names,
            book: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn workbook_err(&self, message: impl ToString) -> StoreError {
        StoreError::Workbook {
            path: self.path.clone(),
            message: message.to_string(),
        }
    }

    fn all_tables() -> [Table; 7] {
        [
            Table::Actors,
            Table::Quests,
            Table::System,
            Table::Dialogues,
            Table::Strings,
            Table::chars(),
            Table::terms(),
        ]
    }

    /// Create the file from the template, or a fresh workbook with headers.
    fn seed(&self) -> StoreResult<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        if let Some(tpl) = self.template.as_deref().filter(|t| t.is_file()) {
            std::fs::copy(tpl, &self.path)?;
            tracing::info!(event = "workbook_seeded", path = %self.path.display(), template = %tpl.display());
            return Ok(());
        }
        let mut book = umya_spreadsheet::new_file_empty_worksheet();
        for table in Self::all_tables() {
            let name = self.sheet_name(&table);
            let sheet = book.new_sheet(name.as_str()).map_err(|e| self.workbook_err(e))?;
            write_header(sheet, table.shape());
        }
        self.persist(&book)?;
        tracing::info!(event = "workbook_created", path = %self.path.display());
        Ok(())
    }

    fn book(&self) -> StoreResult<MutexGuard<'_, Spreadsheet>> {
        let cell = self.book.get_or_try_init(|| -> StoreResult<_> {
            if !self.path.exists() {
                self.seed()?;
            }
            let book = umya_spreadsheet::reader::xlsx::read(&self.path).map_err(|e| self.workbook_err(e))?;
            tracing::debug!(event = "workbook_loaded", path = %self.path.display());
            Ok(Mutex::new(book))
        })?;
        cell.lock().map_err(|_| self.workbook_err("workbook lock poisoned"))
    }

    fn persist(&self, book: &Spreadsheet) -> StoreResult<()> {
        umya_spreadsheet::writer::xlsx::write(book, &self.path).map_err(|e| self.workbook_err(e))
    }

    /// The sheet for `table`, created with its header row when missing.
    fn sheet_mut<'b>(&self, book: &'b mut Spreadsheet, table: &Table) -> StoreResult<&'b mut Worksheet> {
        let name = self.sheet_name(table);
        if book.get_sheet_by_name(&name).is_none() {
            let sheet = book.new_sheet(name.as_str()).map_err(|e| self.workbook_err(e))?;
            write_header(sheet, table.shape());
            tracing::debug!(event = "workbook_sheet_created", sheet = %name);
        }
        book.get_sheet_by_name_mut(&name)
            .ok_or(StoreError::MissingSheet(name))
    }
}

fn write_header(sheet: &mut Worksheet, shape: Shape) {
    for (i, title) in shape.header().iter().enumerate() {
        sheet.get_cell_mut((i as u32 + 1, 1)).set_value_string(*title);
    }
}

impl TabularStore for WorkbookStore {
    fn backend(&self) -> &'static str {
        "local"
    }

    fn sheet_name(&self, table: &Table) -> String {
        sheet_title(&self.names, table, VOCAB_PREFIX)
    }

    fn get(&self, table: &Table) -> StoreResult<Snapshot> {
        let book = self.book()?;
        let shape = table.shape();
        let name = self.sheet_name(table);
        let mut snapshot = Snapshot::new(shape);
        let Some(sheet) = book.get_sheet_by_name(&name) else {
            tracing::debug!(event = "workbook_sheet_absent", sheet = %name);
            return Ok(snapshot);
        };
        for row in 2..=sheet.get_highest_row() {
            let cells = (1..=shape.width() as u32)
                .map(|col| sheet.get_value((col, row)))
                .collect();
            snapshot.push(row, cells);
        }
        tracing::debug!(event = "store_get", backend = "local", sheet = %name, rows = snapshot.len());
        Ok(snapshot)
    }

    fn append(&self, table: &Table, rows: &[Vec<String>]) -> StoreResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut book = self.book()?;
        let sheet = self.sheet_mut(&mut book, table)?;
        let mut next = sheet.get_highest_row().max(1) + 1;
        for row in rows {
            for (i, value) in row.iter().enumerate() {
                sheet.get_cell_mut((i as u32 + 1, next)).set_value_string(value.as_str());
            }
            next += 1;
        }
        self.persist(&book)?;
        tracing::info!(event = "store_append", backend = "local", table = %table, rows = rows.len());
        Ok(())
    }

    fn update(&self, table: &Table, updates: &[CellUpdate]) -> StoreResult<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let mut book = self.book()?;
        let sheet = self.sheet_mut(&mut book, table)?;
        for u in updates {
            sheet
                .get_cell_mut((u.column as u32 + 1, u.row))
                .set_value_string(u.value.as_str());
        }
        self.persist(&book)?;
        tracing::info!(event = "store_update", backend = "local", table = %table, cells = updates.len());
        Ok(())
    }

    /// Workbooks carry no review colours.
    fn mark(&self, table: &Table, keys: &[String], _colour: &str, _field: Field) -> StoreResult<usize> {
        tracing::debug!(event = "store_mark_skipped", backend = "local", table = %table, keys = keys.len());
        Ok(0)
    }
}
