use color_eyre::eyre::Result;
use owo_colors::OwoColorize;
use sheetloc_config::{Settings, Stage};
use sheetloc_domain::ReinjectSummary;

use super::{ensure_env, header, open, print_json, row};

/// How many unmatched keys to list per table before summarising.
const UNMATCHED_PREVIEW: usize = 5;

pub fn run_reinject(settings: &Settings, format: &str, use_color: bool) -> Result<()> {
    ensure_env(settings, Stage::Reinject)?;
    let store = open(settings)?;
    let summary = sheetloc_services::reinject(settings, store.as_ref(), &settings.res_dir)?;

    if format == "json" {
        return print_json(&summary);
    }
    print_text(&summary, use_color);
    Ok(())
}

fn print_text(summary: &ReinjectSummary, use_color: bool) {
    crate::ui_out!(
        "{}",
        header("table", &["rows", "replaced", "fallbacks", "no field", "unmatched"], use_color)
    );
    for t in &summary.tables {
        crate::ui_out!(
            "{}",
            row(
                &t.table,
                &[t.store_rows, t.replaced, t.empty_fallbacks, t.missing_fields, t.unmatched.len()]
            )
        );
    }
    for t in summary.tables.iter().filter(|t| !t.unmatched.is_empty()) {
        crate::ui_warn!("{}: {} key(s) matched no tree entry", t.table, t.unmatched.len());
        for key in t.unmatched.iter().take(UNMATCHED_PREVIEW) {
            if use_color {
                crate::ui_out!("    {}", key.yellow());
            } else {
                crate::ui_out!("    {key}");
            }
        }
        if t.unmatched.len() > UNMATCHED_PREVIEW {
            crate::ui_out!("    … and {} more", t.unmatched.len() - UNMATCHED_PREVIEW);
        }
    }
    for path in &summary.written {
        if use_color {
            crate::ui_ok!("{}", path.green());
        } else {
            crate::ui_ok!("{path}");
        }
    }
}
