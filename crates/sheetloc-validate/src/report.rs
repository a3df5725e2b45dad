//! The JSON anomaly report, merged batch by batch.

use std::collections::HashSet;
use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};
use sheetloc_domain::{AnomalyEntry, CheckReport, SCHEMA_VERSION};

pub fn load_report(path: &Path) -> Result<CheckReport> {
    if !path.is_file() {
        return Ok(CheckReport {
            schema_version: SCHEMA_VERSION,
            anomalies: Vec::new(),
        });
    }
    let text = std::fs::read_to_string(path).wrap_err_with(|| format!("reading report {}", path.display()))?;
    serde_json::from_str(&text).wrap_err_with(|| format!("parsing report {}", path.display()))
}

/// Replace whatever the report held for `checked` keys with `fresh`.
pub fn merge_report(report: &mut CheckReport, checked: &HashSet<&str>, fresh: Vec<AnomalyEntry>) {
    report.anomalies.retain(|a| !checked.contains(a.key.as_str()));
    report.anomalies.extend(fresh);
    report.schema_version = SCHEMA_VERSION;
}

pub fn save_report(path: &Path, report: &CheckReport) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let text = serde_json::to_string_pretty(report)?;
    std::fs::write(path, text).wrap_err_with(|| format!("writing report {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, kind: &str) -> AnomalyEntry {
        AnomalyEntry {
            key: key.into(),
            kind: kind.into(),
            message: String::new(),
            original: String::new(),
            translated: String::new(),
        }
    }

    #[test]
    fn rechecked_keys_are_replaced() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("report.json");
        let mut report = load_report(&path)?;
        merge_report(
            &mut report,
            &["a", "b"].into_iter().collect(),
            vec![entry("a", "untranslated"), entry("b", "tag-mismatch")],
        );
        save_report(&path, &report)?;

        let mut report = load_report(&path)?;
        merge_report(&mut report, &["a"].into_iter().collect(), Vec::new());
        assert_eq!(report.anomalies, vec![entry("b", "tag-mismatch")]);
        Ok(())
    }
}
