use color_eyre::eyre::Result;
use sheetloc_config::{Settings, Stage};
use sheetloc_services::{ChatReviewer, CheckOptions, PassthroughReviewer, Reviewer};

use super::{ensure_env, header, open, print_json, row};

pub fn run_check(
    settings: &Settings,
    restart: bool,
    batch_size: Option<usize>,
    no_review: bool,
    format: &str,
    use_color: bool,
) -> Result<()> {
    ensure_env(settings, Stage::Check)?;
    let store = open(settings)?;

    let reviewer: Box<dyn Reviewer> = if no_review {
        Box::new(PassthroughReviewer)
    } else {
        match ChatReviewer::from_settings(&settings.translate) {
            Ok(r) => Box::new(r),
            Err(e) => {
                crate::ui_warn!("Language review skipped: {e}");
                Box::new(PassthroughReviewer)
            }
        }
    };
    let opts = CheckOptions { restart, batch_size };
    let summary = sheetloc_services::run_check(settings, store.as_ref(), reviewer.as_ref(), opts)?;

    if format == "json" {
        return print_json(&summary);
    }
    crate::ui_out!(
        "{}",
        header("dialogues", &["candidates", "skipped", "checked", "anomalies"], use_color)
    );
    crate::ui_out!(
        "{}",
        row(
            "total",
            &[summary.candidates, summary.skipped_processed, summary.checked, summary.anomalies]
        )
    );
    if summary.review_failures > 0 {
        crate::ui_warn!(
            "Review failed for {} batch(es); they stay unprocessed and are checked again next run",
            summary.review_failures
        );
    }
    if summary.anomalies > 0 {
        crate::ui_warn!("{} anomal(ies) found, see {}", summary.anomalies, summary.report_path);
    } else {
        crate::ui_ok!("No anomalies in {} batch(es)", summary.batches);
    }
    Ok(())
}
