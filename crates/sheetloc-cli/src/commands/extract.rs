use color_eyre::eyre::Result;
use sheetloc_config::{Settings, Stage};
use sheetloc_domain::ExtractSummary;
use sheetloc_services::extract_and_push;

use super::{ensure_env, header, open, print_json, row};

pub fn run_extract(settings: &Settings, dry_run: bool, format: &str, use_color: bool) -> Result<()> {
    tracing::debug!(event = "extract_args", res_dir = %settings.res_dir.display(), dry_run = dry_run, format = format);
    ensure_env(settings, Stage::Extract)?;
    let store = open(settings)?;
    let summary = extract_and_push(settings, store.as_ref(), &settings.res_dir, dry_run)?;

    if format == "json" {
        return print_json(&summary);
    }
    print_text(&summary, store.backend(), use_color);
    Ok(())
}

fn print_text(summary: &ExtractSummary, backend: &str, use_color: bool) {
    crate::ui_out!(
        "{}",
        header("table", &["extracted", "updated", "appended", "unchanged"], use_color)
    );
    for t in &summary.tables {
        crate::ui_out!(
            "{}",
            row(&t.table, &[t.extracted, t.updated, t.appended, t.unchanged])
        );
    }

    let w = &summary.warnings;
    for path in &w.unresolved_chapter_files {
        crate::ui_warn!("No chapter matched any conversation in {path}");
    }
    if w.display_name_fallbacks > 0 {
        crate::ui_warn!("{} actor(s) fell back to the plain display name", w.display_name_fallbacks);
    }
    if w.missing_display_name > 0 {
        crate::ui_warn!("{} actor(s) have no display name", w.missing_display_name);
    }
    if w.dropped_entries > 0 {
        crate::ui_warn!("{} dialogue entr(ies) had no text and were dropped", w.dropped_entries);
    }
    if w.skipped_items > 0 {
        crate::ui_warn!("{} actor/quest item(s) lacked a key field", w.skipped_items);
    }

    if summary.dry_run {
        crate::ui_info!("Dry run: {} file(s) scanned, {backend} store left untouched", summary.files);
    } else {
        crate::ui_ok!("Extracted {} file(s) into the {backend} store", summary.files);
    }
}
