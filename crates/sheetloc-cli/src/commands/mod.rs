pub mod check;
pub mod check_env;
pub mod extract;
pub mod reinject;
pub mod schema;
pub mod translate;

use color_eyre::eyre::{bail, Result};
use sheetloc_config::{check_environment, Settings, Severity, Stage};
use sheetloc_store::{open_store, TabularStore};

/// Fail before any work when a critical setting is broken; surface warnings.
pub(crate) fn ensure_env(settings: &Settings, stage: Stage) -> Result<()> {
    let report = check_environment(settings, stage);
    for c in report.checks.iter().filter(|c| !c.ok) {
        match c.severity {
            Severity::Critical => crate::ui_err!("{}: {}", c.name, c.message),
            Severity::Warning => crate::ui_warn!("{}: {}", c.name, c.message),
        }
    }
    if report.has_critical() {
        bail!(
            "{} critical setting(s) failed; run `sheetloc check-env` for details",
            report.critical()
        );
    }
    Ok(())
}

pub(crate) fn open(settings: &Settings) -> Result<Box<dyn TabularStore>> {
    Ok(open_store(&settings.store, &settings.sheets)?)
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let stdout = std::io::stdout();
    serde_json::to_writer_pretty(stdout.lock(), value)?;
    println!();
    Ok(())
}

/// Left-aligned first column, right-aligned counts.
pub(crate) fn row(name: &str, counts: &[usize]) -> String {
    let mut line = format!("{name:<22}");
    for n in counts {
        line.push_str(&format!("{n:>11}"));
    }
    line
}

pub(crate) fn header(name: &str, columns: &[&str], use_color: bool) -> String {
    let mut line = format!("{name:<22}");
    for c in columns {
        line.push_str(&format!("{c:>11}"));
    }
    if use_color {
        use owo_colors::OwoColorize;
        format!("{}", line.bold())
    } else {
        line
    }
}
