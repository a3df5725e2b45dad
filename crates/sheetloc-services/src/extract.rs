//! Extract-and-push: walk the trees, then merge every table into the store.

use std::path::Path;

use color_eyre::eyre::{eyre, WrapErr};
use indexmap::IndexMap;
use sheetloc_config::Settings;
use sheetloc_core::{RecordPatch, Table, TextRecord};
use sheetloc_domain::{ExtractSummary, ExtractWarnings, TablePushStat, SCHEMA_VERSION};
use sheetloc_parsers_tree::{scan_tree_dir, ChapterTable, ExtractOptions, ScanOptions};
use sheetloc_store::{plan, TabularStore};

use crate::{Result, Throttle};

fn batch(records: &[TextRecord]) -> IndexMap<String, RecordPatch> {
    records.iter().map(|r| (r.key.to_string(), r.to_patch())).collect()
}

/// Keys only; the value column belongs to reviewers and is never overwritten.
fn key_batch<'a>(keys: impl IntoIterator<Item = &'a String>) -> IndexMap<String, RecordPatch> {
    keys.into_iter()
        .map(|k| (k.clone(), RecordPatch::default()))
        .collect()
}

pub fn extract_and_push(
    settings: &Settings,
    store: &dyn TabularStore,
    res_dir: &Path,
    dry_run: bool,
) -> Result<ExtractSummary> {
    let chapters = match settings.chapter_definitions.as_deref() {
        Some(path) => ChapterTable::load(path)?,
        None => {
            tracing::warn!(event = "chapters_unconfigured", "no chapter definitions; every dialogue sorts last");
            ChapterTable::default()
        }
    };
    let base_lang_index = settings
        .language_index(&settings.base_lang)
        .ok_or_else(|| eyre!("no term table column for base language `{}`", settings.base_lang))?;
    let opts = ScanOptions {
        extract: ExtractOptions {
            base_lang: &settings.base_lang,
            scheme: settings.key_scheme,
            chapters: &chapters,
        },
        base_lang_index,
    };
    let ex = scan_tree_dir(res_dir, &opts).wrap_err_with(|| format!("scanning {}", res_dir.display()))?;

    let tables: Vec<(Table, usize, IndexMap<String, RecordPatch>)> = vec![
        (Table::Actors, ex.actors.len(), batch(&ex.actors)),
        (Table::Quests, ex.quests.len(), batch(&ex.quests)),
        (Table::System, ex.terms.len(), batch(&ex.terms)),
        (Table::Dialogues, ex.dialogues.len(), batch(&ex.dialogues)),
        (Table::chars(), ex.vocabulary.len(), key_batch(&ex.vocabulary)),
        (Table::Strings, ex.strings.len(), key_batch(&ex.strings)),
    ];

    let mut throttle = Throttle::new(settings.store.cooldown);
    let mut stats = Vec::with_capacity(tables.len());
    for (table, extracted, records) in tables {
        let outcome = if dry_run {
            plan(&store.get(&table)?, &records).outcome()
        } else {
            throttle.before_write(&table.to_string());
            store
                .replace(&table, &records)
                .wrap_err_with(|| format!("pushing {table} to {}", store.sheet_name(&table)))?
        };
        tracing::info!(
            event = "table_pushed",
            table = %table,
            dry_run = dry_run,
            extracted = extracted,
            updated = outcome.updated,
            appended = outcome.appended,
            unchanged = outcome.unchanged,
        );
        stats.push(TablePushStat {
            table: table.to_string(),
            extracted,
            updated: outcome.updated,
            appended: outcome.appended,
            unchanged: outcome.unchanged,
        });
    }

    Ok(ExtractSummary {
        schema_version: SCHEMA_VERSION,
        files: ex.files,
        dry_run,
        tables: stats,
        warnings: ExtractWarnings {
            unresolved_chapter_files: ex
                .unresolved_chapters
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            display_name_fallbacks: ex.stats.display_name_fallbacks,
            missing_display_name: ex.stats.missing_display_name,
            dropped_entries: ex.stats.dropped_entries,
            skipped_items: ex.stats.skipped_items,
        },
    })
}
