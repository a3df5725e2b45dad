//! Pull every table and write translated `-mod.json` siblings of the trees.

use std::path::Path;

use color_eyre::eyre::{bail, WrapErr};
use sheetloc_config::Settings;
use sheetloc_core::Table;
use sheetloc_domain::{ReinjectSummary, SCHEMA_VERSION};
use sheetloc_inject::{reinject_dir, InjectOptions, StoreTables};
use sheetloc_store::TabularStore;

use crate::Result;

pub fn reinject(settings: &Settings, store: &dyn TabularStore, res_dir: &Path) -> Result<ReinjectSummary> {
    let target = settings.target_lang.as_str();
    if target.is_empty() {
        bail!("TARGET_LANG is not set");
    }
    let target_index = settings.language_index(target);
    if target_index.is_none() {
        tracing::warn!(event = "target_lang_unindexed", target_lang = target, "term table will not be translated");
    }

    // sequential reads, one table at a time
    let tables = StoreTables {
        actors: store.get(&Table::Actors)?,
        quests: store.get(&Table::Quests)?,
        system: store.get(&Table::System)?,
        dialogues: store.get(&Table::Dialogues)?,
        strings: store.get(&Table::Strings)?,
    };
    let opts = InjectOptions {
        base_lang: &settings.base_lang,
        target_lang: target,
        scheme: settings.key_scheme,
        target_index,
    };
    let run = reinject_dir(res_dir, &tables, opts)
        .wrap_err_with(|| format!("re-injecting into {}", res_dir.display()))?;

    Ok(ReinjectSummary {
        schema_version: SCHEMA_VERSION,
        target_lang: target.to_string(),
        written: run.written.iter().map(|p| p.display().to_string()).collect(),
        tables: run.tallies.iter().map(|t| t.to_stat()).collect(),
    })
}
