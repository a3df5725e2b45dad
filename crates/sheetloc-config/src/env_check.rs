//! Eager validation of the settings a command depends on.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::Settings;

static LANG_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z]{2}$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Critical,
    Warning,
}

/// Which command is about to run; decides what must be valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    All,
    Extract,
    Translate,
    Check,
    Reinject,
}

impl Stage {
    fn needs_tree_dir(self) -> bool {
        matches!(self, Stage::All | Stage::Extract | Stage::Reinject)
    }

    fn needs_target_lang(self) -> bool {
        matches!(self, Stage::All | Stage::Reinject | Stage::Translate)
    }

    fn needs_translator(self) -> bool {
        matches!(self, Stage::All | Stage::Translate | Stage::Check)
    }
}

#[derive(Debug, Clone)]
pub struct EnvCheck {
    pub name: &'static str,
    pub severity: Severity,
    pub ok: bool,
    pub value: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct EnvReport {
    pub checks: Vec<EnvCheck>,
}

impl EnvReport {
    pub fn critical(&self) -> usize {
        self.failed(Severity::Critical)
    }

    pub fn warnings(&self) -> usize {
        self.failed(Severity::Warning)
    }

    pub fn has_critical(&self) -> bool {
        self.critical() > 0
    }

    fn failed(&self, sev: Severity) -> usize {
        self.checks
            .iter()
            .filter(|c| !c.ok && c.severity == sev)
            .count()
    }

    fn push(&mut self, name: &'static str, severity: Severity, value: impl Into<String>, ok: bool, why: &str) {
        let message = if ok { "ok".to_string() } else { why.to_string() };
        self.checks.push(EnvCheck {
            name,
            severity,
            ok,
            value: value.into(),
            message,
        });
    }
}

pub fn check_environment(settings: &Settings, stage: Stage) -> EnvReport {
    let mut report = EnvReport::default();

    match settings.store.storage.as_deref() {
        Some(path) => {
            let ok = parent_creatable(path);
            report.push(
                "STORAGE",
                Severity::Critical,
                path.display().to_string(),
                ok,
                "parent directory does not exist or cannot be created",
            );
            if let Some(tpl) = settings.store.template.as_deref() {
                report.push(
                    "STORAGE_TEMPLATE",
                    Severity::Warning,
                    tpl.display().to_string(),
                    file_not_empty(tpl),
                    "file does not exist or is empty",
                );
            }
        }
        None => {
            let id = settings.store.spreadsheet_id.clone().unwrap_or_default();
            let has_id = !id.trim().is_empty();
            report.push("SPREADSHEET_ID", Severity::Critical, id, has_id, "is not set or is empty");
            let creds = settings.store.credentials_file.as_deref();
            report.push(
                "GOOGLE_CREDENTIALS_FILE",
                Severity::Critical,
                creds.map(|p| p.display().to_string()).unwrap_or_default(),
                creds.map(file_not_empty).unwrap_or(false),
                "file does not exist or is empty",
            );
        }
    }

    let names = &settings.sheets;
    for (name, value) in [
        ("ACTORS_SHEET_NAME", &names.actors),
        ("QUESTS_SHEET_NAME", &names.quests),
        ("SYSTEM_SHEET_NAME", &names.system),
        ("DIALOGUES_SHEET_NAME", &names.dialogues),
        ("STRINGS_SHEET_NAME", &names.strings),
        ("VOCAB_CHARS_SHEET_NAME", &names.vocab_chars),
        ("VOCAB_TERMS_SHEET_NAME", &names.vocab_terms),
    ] {
        report.push(name, Severity::Critical, value.clone(), !value.trim().is_empty(), "is not set or is empty");
    }

    if stage.needs_tree_dir() {
        report.push(
            "RES_DIR",
            Severity::Critical,
            settings.res_dir.display().to_string(),
            dir_not_empty(&settings.res_dir),
            "directory does not exist or is empty",
        );
        if let Some(p) = settings.chapter_definitions.as_deref() {
            report.push(
                "CHAPTER_DEFINITIONS",
                Severity::Warning,
                p.display().to_string(),
                file_not_empty(p),
                "file does not exist or is empty",
            );
        }
    }

    report.push(
        "BASE_LANG",
        Severity::Critical,
        settings.base_lang.clone(),
        is_lang_code(&settings.base_lang),
        "is not a valid 2-symbol [a-z] code",
    );
    report.push(
        "BASE_LANG_INDEX",
        Severity::Warning,
        settings.base_lang.clone(),
        settings.language_index(&settings.base_lang).is_some(),
        "has no term table column in [languages]",
    );
    if stage.needs_target_lang() {
        report.push(
            "TARGET_LANG",
            Severity::Critical,
            settings.target_lang.clone(),
            is_lang_code(&settings.target_lang),
            "is not a valid 2-symbol [a-z] code",
        );
        report.push(
            "TARGET_LANG_INDEX",
            Severity::Warning,
            settings.target_lang.clone(),
            settings.language_index(&settings.target_lang).is_some(),
            "has no term table column in [languages]",
        );
    }

    if stage.needs_translator() {
        let tr = &settings.translate;
        let endpoint = tr.endpoint.clone().unwrap_or_default();
        let ok = endpoint.to_lowercase().starts_with("http");
        report.push("OPENAI_API_ENDPOINT", Severity::Warning, endpoint, ok, "does not start with 'http'");
        let key = tr.api_key.as_deref().unwrap_or_default();
        report.push("OPENAI_API_KEY", Severity::Warning, mask(key), !key.is_empty(), "is not set or is empty");
        let model = tr.model.clone().unwrap_or_default();
        let ok = !model.is_empty();
        report.push("OPENAI_MODEL", Severity::Warning, model, ok, "is not set or is empty");
    }

    for c in &report.checks {
        if !c.ok {
            tracing::debug!(event = "env_check_failed", name = c.name, severity = ?c.severity, message = %c.message);
        }
    }
    report
}

pub fn is_lang_code(code: &str) -> bool {
    LANG_CODE_RE.is_match(code)
}

fn file_not_empty(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_file() && m.len() > 0).unwrap_or(false)
}

fn dir_not_empty(path: &Path) -> bool {
    std::fs::read_dir(path)
        .map(|mut it| it.next().is_some())
        .unwrap_or(false)
}

/// The workbook itself may be absent; its nearest existing ancestor must be a directory.
fn parent_creatable(path: &Path) -> bool {
    let mut ancestor = path.parent();
    while let Some(dir) = ancestor {
        if dir.as_os_str().is_empty() {
            return true;
        }
        if dir.exists() {
            return dir.is_dir();
        }
        ancestor = dir.parent();
    }
    true
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        String::new()
    } else {
        format!("{}…", secret.chars().take(4).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SheetLocConfig, StoreCfg};

    fn settings_with(cfg: SheetLocConfig) -> Settings {
        Settings::resolve(cfg).unwrap()
    }

    #[test]
    fn lang_codes_are_two_lowercase_letters() {
        assert!(is_lang_code("en"));
        assert!(!is_lang_code("EN"));
        assert!(!is_lang_code("eng"));
        assert!(!is_lang_code(""));
    }

    #[test]
    fn remote_store_without_id_is_critical() {
        let s = settings_with(SheetLocConfig::default());
        let report = check_environment(&s, Stage::Check);
        assert!(report.has_critical());
        let names: Vec<_> = report.checks.iter().filter(|c| !c.ok).map(|c| c.name).collect();
        assert!(names.contains(&"SPREADSHEET_ID"));
        assert!(names.contains(&"GOOGLE_CREDENTIALS_FILE"));
    }

    #[test]
    fn local_store_with_tree_dir_passes() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let res = dir.path().join("res");
        std::fs::create_dir_all(&res)?;
        std::fs::write(res.join("a.json"), "{}")?;
        let s = settings_with(SheetLocConfig {
            res_dir: Some(res.display().to_string()),
            target_lang: Some("ja".into()),
            store: Some(StoreCfg {
                storage: Some(dir.path().join("out/book.xlsx").display().to_string()),
                ..StoreCfg::default()
            }),
            ..SheetLocConfig::default()
        });
        let report = check_environment(&s, Stage::Reinject);
        assert_eq!(report.critical(), 0, "{:?}", report.checks);
        Ok(())
    }

    #[test]
    fn empty_tree_dir_is_critical_for_extract_only() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let s = settings_with(SheetLocConfig {
            res_dir: Some(dir.path().display().to_string()),
            store: Some(StoreCfg {
                storage: Some(dir.path().join("book.xlsx").display().to_string()),
                ..StoreCfg::default()
            }),
            ..SheetLocConfig::default()
        });
        assert!(check_environment(&s, Stage::Extract).has_critical());
        assert!(!check_environment(&s, Stage::Check).has_critical());
        Ok(())
    }

    #[test]
    fn translator_settings_only_warn() {
        let s = settings_with(SheetLocConfig {
            target_lang: Some("ru".into()),
            store: Some(StoreCfg {
                storage: Some("book.xlsx".into()),
                ..StoreCfg::default()
            }),
            ..SheetLocConfig::default()
        });
        let report = check_environment(&s, Stage::Translate);
        assert_eq!(report.critical(), 0);
        // endpoint, key, model and the missing `ru` term column
        assert_eq!(report.warnings(), 4);
    }
}
