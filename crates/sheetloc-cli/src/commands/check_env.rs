use color_eyre::eyre::{bail, Result};
use owo_colors::OwoColorize;
use sheetloc_config::{check_environment, Settings, Severity, Stage};

pub fn run_check_env(settings: &Settings, use_color: bool) -> Result<()> {
    let report = check_environment(settings, Stage::All);

    for c in &report.checks {
        let status = match (c.ok, c.severity) {
            (true, _) => "ok",
            (false, Severity::Critical) => "FAIL",
            (false, Severity::Warning) => "warn",
        };
        let status = if use_color {
            match (c.ok, c.severity) {
                (true, _) => format!("{:<5}", status.green()),
                (false, Severity::Critical) => format!("{:<5}", status.red()),
                (false, Severity::Warning) => format!("{:<5}", status.yellow()),
            }
        } else {
            format!("{status:<5}")
        };
        let detail = if c.ok { String::new() } else { format!("  ({})", c.message) };
        crate::ui_out!("{status} {:<24} {}{detail}", c.name, c.value);
    }

    tracing::info!(
        event = "env_checked",
        checks = report.checks.len(),
        critical = report.critical(),
        warnings = report.warnings(),
    );
    if report.has_critical() {
        bail!("{} critical setting(s) failed", report.critical());
    }
    crate::ui_ok!("Environment ready ({} warning(s))", report.warnings());
    Ok(())
}
