//! Batched, resumable quality checks over staged dialogue.

use std::collections::HashSet;

use indexmap::IndexMap;
use sheetloc_config::Settings;
use sheetloc_core::{Field, Table};
use sheetloc_domain::{AnomalyEntry, CheckSummary, SCHEMA_VERSION};
use sheetloc_store::TabularStore;
use sheetloc_validate::{
    check_duplicates, check_row, is_candidate, load_report, merge_report, review_finding, save_report, Checkpoint,
};

use crate::review::Reviewer;
use crate::Result;

#[derive(Debug, Clone, Copy, Default)]
pub struct CheckOptions {
    /// Forget the checkpoint and the report first.
    pub restart: bool,
    /// Overrides the configured batch size.
    pub batch_size: Option<usize>,
}

/// Reviewer notes for one batch; rows without a translation are not sent.
fn review_batch(reviewer: &dyn Reviewer, batch: &[&(&str, &str, &str)]) -> Result<Vec<AnomalyEntry>> {
    let sent: IndexMap<String, String> = batch
        .iter()
        .filter(|(_, _, translated)| !translated.trim().is_empty())
        .map(|(k, _, translated)| (k.to_string(), translated.to_string()))
        .collect();
    if sent.is_empty() {
        return Ok(Vec::new());
    }
    let notes = reviewer.review(&sent)?;
    Ok(batch
        .iter()
        .filter_map(|(key, original, translated)| {
            notes
                .get(*key)
                .map(|note| review_finding(key, original, translated, note).to_entry())
        })
        .collect())
}

pub fn run_check(
    settings: &Settings,
    store: &dyn TabularStore,
    reviewer: &dyn Reviewer,
    opts: CheckOptions,
) -> Result<CheckSummary> {
    let cfg = &settings.check;
    let batch_size = opts.batch_size.filter(|n| *n > 0).unwrap_or(cfg.batch_size);

    let mut checkpoint = Checkpoint::load(&cfg.checkpoint)?;
    if opts.restart {
        checkpoint.clear()?;
        if cfg.report.exists() {
            std::fs::remove_file(&cfg.report)?;
        }
        tracing::info!(event = "check_restarted", checkpoint = %cfg.checkpoint.display());
    } else if !checkpoint.is_empty() {
        tracing::info!(event = "check_resumed", processed = checkpoint.len());
    }
    let mut report = load_report(&cfg.report)?;

    let dialogues = store.get(&Table::Dialogues)?;
    let shape = dialogues.shape();
    let candidates: Vec<(&str, &str, &str)> = dialogues
        .iter()
        .map(|(k, row)| (k, row.get(shape, Field::Original), row.get(shape, Field::Translated)))
        .filter(|(k, original, _)| is_candidate(k, original))
        .collect();
    let pending: Vec<_> = candidates
        .iter()
        .filter(|(k, _, _)| !checkpoint.contains(k))
        .collect();

    let mut summary = CheckSummary {
        schema_version: SCHEMA_VERSION,
        candidates: candidates.len(),
        skipped_processed: candidates.len() - pending.len(),
        report_path: cfg.report.display().to_string(),
        checkpoint_path: cfg.checkpoint.display().to_string(),
        reviewer: reviewer.name().to_string(),
        ..CheckSummary::default()
    };

    // duplicates are a property of the whole sheet, reported once per fresh run
    if checkpoint.is_empty() {
        let dups: Vec<_> = check_duplicates(dialogues.shadowed())
            .iter()
            .map(|a| a.to_entry())
            .collect();
        if !dups.is_empty() {
            tracing::warn!(event = "check_duplicate_keys", count = dups.len());
            summary.anomalies += dups.len();
            let keys: HashSet<&str> = dialogues.shadowed().iter().map(String::as_str).collect();
            merge_report(&mut report, &keys, dups);
        }
    }

    for batch in pending.chunks(batch_size) {
        let mut found = Vec::new();
        for (key, original, translated) in batch.iter().copied() {
            found.extend(check_row(key, original, translated).iter().map(|a| a.to_entry()));
        }
        let reviewed = match review_batch(reviewer, batch) {
            Ok(notes) => {
                found.extend(notes);
                true
            }
            Err(e) => {
                tracing::warn!(event = "check_review_failed", n = summary.batches + 1, error = %e);
                summary.review_failures += 1;
                false
            }
        };
        let checked: HashSet<&str> = batch.iter().map(|(k, _, _)| *k).collect();
        tracing::info!(
            event = "check_batch",
            n = summary.batches + 1,
            rows = batch.len(),
            anomalies = found.len(),
            reviewed = reviewed,
        );
        summary.anomalies += found.len();
        merge_report(&mut report, &checked, found);
        save_report(&cfg.report, &report)?;
        // an unreviewed batch is checked again on the next run
        if reviewed {
            checkpoint.extend(checked.iter().map(|k| k.to_string()));
            checkpoint.save()?;
        }
        summary.batches += 1;
        summary.checked += batch.len();
    }
    if pending.is_empty() {
        save_report(&cfg.report, &report)?;
    }

    tracing::info!(
        event = "check_finished",
        checked = summary.checked,
        skipped = summary.skipped_processed,
        anomalies = summary.anomalies,
        review_failures = summary.review_failures,
        report = %cfg.report.display(),
    );
    Ok(summary)
}
