use color_eyre::eyre::Result;
use sheetloc_config::{Settings, Stage};
use sheetloc_services::{ChatTranslator, PassthroughTranslator, TranslateOptions, Translator};

use super::{ensure_env, open, print_json};

#[allow(clippy::too_many_arguments)]
pub fn run_translate(
    settings: &Settings,
    filter: &str,
    force: bool,
    context: Option<&str>,
    dry_run: bool,
    format: &str,
    use_color: bool,
) -> Result<()> {
    tracing::debug!(event = "translate_args", filter = filter, force = force, dry_run = dry_run);
    ensure_env(settings, Stage::Translate)?;
    let store = open(settings)?;

    let translator: Box<dyn Translator> = if dry_run {
        Box::new(PassthroughTranslator)
    } else {
        Box::new(ChatTranslator::from_settings(&settings.translate)?)
    };
    let opts = TranslateOptions {
        filter,
        force,
        context,
        dry_run,
    };
    let summary = sheetloc_services::run_translate(settings, store.as_ref(), translator.as_ref(), &opts)?;

    if format == "json" {
        return print_json(&summary);
    }
    crate::ui_out!(
        "{}",
        super::header("filter", &["rows", "blocks", "done", "written"], use_color)
    );
    crate::ui_out!(
        "{}",
        super::row(
            &summary.filter,
            &[summary.candidates, summary.blocks, summary.translated_blocks, summary.translated_rows]
        )
    );
    for path in &summary.failed_blocks {
        crate::ui_err!("Block failed: {path}");
    }
    if summary.dry_run {
        crate::ui_info!("Dry run with the {} translator: nothing was written", translator.name());
    } else if summary.failed_blocks.is_empty() {
        crate::ui_ok!("Translated {} row(s)", summary.translated_rows);
    } else {
        crate::ui_warn!(
            "Translated {} row(s); {} block(s) failed and can be retried",
            summary.translated_rows,
            summary.failed_blocks.len()
        );
    }
    Ok(())
}
