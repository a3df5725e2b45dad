use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

pub mod env_check;
pub mod settings;

pub use env_check::{check_environment, EnvCheck, EnvReport, Severity, Stage};
pub use settings::{CheckSettings, SheetNames, Settings, StoreSettings, TranslateSettings};

pub const CONFIG_FILE: &str = "sheetloc.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SheetLocConfig {
    pub base_lang: Option<String>,
    pub target_lang: Option<String>,
    pub key_scheme: Option<String>,
    pub res_dir: Option<String>,
    pub chapter_definitions: Option<String>,
    pub log_dir: Option<String>,
    /// Language code to `Languages[]` index in the term table.
    pub languages: Option<BTreeMap<String, usize>>,
    pub store: Option<StoreCfg>,
    pub sheets: Option<SheetsCfg>,
    pub translate: Option<TranslateCfg>,
    pub check: Option<CheckCfg>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreCfg {
    /// Local workbook path. When set the remote spreadsheet is not used.
    pub storage: Option<String>,
    pub template: Option<String>,
    pub spreadsheet_id: Option<String>,
    pub credentials_file: Option<String>,
    pub cooldown_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SheetsCfg {
    pub actors: Option<String>,
    pub quests: Option<String>,
    pub system: Option<String>,
    pub dialogues: Option<String>,
    pub strings: Option<String>,
    pub vocab_chars: Option<String>,
    pub vocab_terms: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranslateCfg {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub lang_from: Option<String>,
    pub lang_to: Option<String>,
    pub mark_color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckCfg {
    pub batch_size: Option<usize>,
    pub checkpoint: Option<String>,
    pub report: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value for {name}: `{value}`")]
    InvalidValue { name: String, value: String },
}

/// Load `sheetloc.toml`.
///
/// An explicit path must exist and parse. Otherwise the working directory and
/// then `<config dir>/sheetloc/` are searched; the first file to set a field
/// wins, and unreadable or malformed files there are skipped with a warning.
pub fn load_config(explicit: Option<&Path>) -> Result<SheetLocConfig, ConfigError> {
    if let Some(path) = explicit {
        return read_config(path);
    }
    let mut merged = SheetLocConfig::default();
    let mut candidates = Vec::new();
    if let Ok(p) = std::env::current_dir() {
        candidates.push(p.join(CONFIG_FILE));
    }
    if let Some(base) = dirs::config_dir() {
        candidates.push(base.join("sheetloc").join(CONFIG_FILE));
    }
    for path in candidates {
        if !path.is_file() {
            continue;
        }
        match read_config(&path) {
            Ok(cfg) => {
                tracing::debug!(event = "config_loaded", path = %path.display());
                merged = merge(merged, cfg);
            }
            Err(e) => tracing::warn!(event = "config_skipped", path = %path.display(), error = %e),
        }
    }
    Ok(merged)
}

pub fn read_config(path: &Path) -> Result<SheetLocConfig, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&s).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Environment variables override file values.
pub fn apply_env(cfg: SheetLocConfig) -> Result<SheetLocConfig, ConfigError> {
    apply_env_from(cfg, |name| std::env::var(name).ok())
}

pub fn apply_env_from(
    mut cfg: SheetLocConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<SheetLocConfig, ConfigError> {
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    override_with(&mut cfg.base_lang, var("BASE_LANG"));
    override_with(&mut cfg.target_lang, var("TARGET_LANG"));
    override_with(&mut cfg.key_scheme, var("KEY_SCHEME"));
    override_with(&mut cfg.res_dir, var("RES_DIR"));
    override_with(&mut cfg.chapter_definitions, var("CHAPTER_DEFINITIONS"));
    override_with(&mut cfg.log_dir, var("LOG_DIR"));

    let store = cfg.store.get_or_insert_with(StoreCfg::default);
    override_with(&mut store.storage, var("STORAGE"));
    override_with(&mut store.template, var("STORAGE_TEMPLATE"));
    override_with(&mut store.spreadsheet_id, var("SPREADSHEET_ID"));
    override_with(&mut store.credentials_file, var("GOOGLE_CREDENTIALS_FILE"));
    if let Some(v) = var("STORE_COOLDOWN_MS") {
        let ms = v.trim().parse().map_err(|_| ConfigError::InvalidValue {
            name: "STORE_COOLDOWN_MS".into(),
            value: v.clone(),
        })?;
        store.cooldown_ms = Some(ms);
    }

    let sheets = cfg.sheets.get_or_insert_with(SheetsCfg::default);
    override_with(&mut sheets.actors, var("ACTORS_SHEET_NAME"));
    override_with(&mut sheets.quests, var("QUESTS_SHEET_NAME"));
    override_with(&mut sheets.system, var("SYSTEM_SHEET_NAME"));
    override_with(&mut sheets.dialogues, var("DIALOGUES_SHEET_NAME"));
    override_with(&mut sheets.strings, var("STRINGS_SHEET_NAME"));
    override_with(&mut sheets.vocab_chars, var("VOCAB_CHARS_SHEET_NAME"));
    override_with(&mut sheets.vocab_terms, var("VOCAB_TERMS_SHEET_NAME"));

    let tr = cfg.translate.get_or_insert_with(TranslateCfg::default);
    override_with(&mut tr.endpoint, var("OPENAI_API_ENDPOINT"));
    override_with(&mut tr.api_key, var("OPENAI_API_KEY"));
    override_with(&mut tr.model, var("OPENAI_MODEL"));
    override_with(&mut tr.lang_from, var("LANG_FROM"));
    override_with(&mut tr.lang_to, var("LANG_TO"));

    Ok(cfg)
}

fn override_with(slot: &mut Option<String>, v: Option<String>) {
    if v.is_some() {
        *slot = v;
    }
}

fn merge(mut a: SheetLocConfig, b: SheetLocConfig) -> SheetLocConfig {
    if a.base_lang.is_none() {
        a.base_lang = b.base_lang;
    }
    if a.target_lang.is_none() {
        a.target_lang = b.target_lang;
    }
    if a.key_scheme.is_none() {
        a.key_scheme = b.key_scheme;
    }
    if a.res_dir.is_none() {
        a.res_dir = b.res_dir;
    }
    if a.chapter_definitions.is_none() {
        a.chapter_definitions = b.chapter_definitions;
    }
    if a.log_dir.is_none() {
        a.log_dir = b.log_dir;
    }
    if a.languages.is_none() {
        a.languages = b.languages;
    }
    a.store = merge_opt(a.store, b.store, merge_store);
    a.sheets = merge_opt(a.sheets, b.sheets, merge_sheets);
    a.translate = merge_opt(a.translate, b.translate, merge_translate);
    a.check = merge_opt(a.check, b.check, merge_check);
    a
}

fn merge_opt<T>(a: Option<T>, b: Option<T>, f: fn(T, T) -> T) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(f(a, b)),
        (None, Some(b)) => Some(b),
        (Some(a), None) => Some(a),
        (None, None) => None,
    }
}

fn merge_store(mut a: StoreCfg, b: StoreCfg) -> StoreCfg {
    if a.storage.is_none() {
        a.storage = b.storage;
    }
    if a.template.is_none() {
        a.template = b.template;
    }
    if a.spreadsheet_id.is_none() {
        a.spreadsheet_id = b.spreadsheet_id;
    }
    if a.credentials_file.is_none() {
        a.credentials_file = b.credentials_file;
    }
    if a.cooldown_ms.is_none() {
        a.cooldown_ms = b.cooldown_ms;
    }
    a
}

fn merge_sheets(mut a: SheetsCfg, b: SheetsCfg) -> SheetsCfg {
    if a.actors.is_none() {
        a.actors = b.actors;
    }
    if a.quests.is_none() {
        a.quests = b.quests;
    }
    if a.system.is_none() {
        a.system = b.system;
    }
    if a.dialogues.is_none() {
        a.dialogues = b.dialogues;
    }
    if a.strings.is_none() {
        a.strings = b.strings;
    }
    if a.vocab_chars.is_none() {
        a.vocab_chars = b.vocab_chars;
    }
    if a.vocab_terms.is_none() {
        a.vocab_terms = b.vocab_terms;
    }
    a
}

fn merge_translate(mut a: TranslateCfg, b: TranslateCfg) -> TranslateCfg {
    if a.endpoint.is_none() {
        a.endpoint = b.endpoint;
    }
    if a.api_key.is_none() {
        a.api_key = b.api_key;
    }
    if a.model.is_none() {
        a.model = b.model;
    }
    if a.lang_from.is_none() {
        a.lang_from = b.lang_from;
    }
    if a.lang_to.is_none() {
        a.lang_to = b.lang_to;
    }
    if a.mark_color.is_none() {
        a.mark_color = b.mark_color;
    }
    a
}

fn merge_check(mut a: CheckCfg, b: CheckCfg) -> CheckCfg {
    if a.batch_size.is_none() {
        a.batch_size = b.batch_size;
    }
    if a.checkpoint.is_none() {
        a.checkpoint = b.checkpoint;
    }
    if a.report.is_none() {
        a.report = b.report;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn explicit_file_is_parsed() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
base_lang = "en"
target_lang = "ru"

[store]
storage = "work/book.xlsx"
cooldown_ms = 0

[sheets]
dialogues = "Lines"

[languages]
ru = 7
"#,
        )?;
        let cfg = load_config(Some(&path))?;
        assert_eq!(cfg.target_lang.as_deref(), Some("ru"));
        assert_eq!(cfg.store.as_ref().and_then(|s| s.cooldown_ms), Some(0));
        assert_eq!(cfg.sheets.as_ref().and_then(|s| s.dialogues.clone()).as_deref(), Some("Lines"));
        assert_eq!(cfg.languages.as_ref().and_then(|l| l.get("ru")).copied(), Some(7));
        Ok(())
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = load_config(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn first_config_wins_per_field() {
        let a = SheetLocConfig {
            base_lang: Some("en".into()),
            store: Some(StoreCfg {
                storage: Some("a.xlsx".into()),
                ..StoreCfg::default()
            }),
            ..SheetLocConfig::default()
        };
        let b = SheetLocConfig {
            base_lang: Some("zh".into()),
            target_lang: Some("ja".into()),
            store: Some(StoreCfg {
                storage: Some("b.xlsx".into()),
                cooldown_ms: Some(5),
                ..StoreCfg::default()
            }),
            ..SheetLocConfig::default()
        };
        let m = merge(a, b);
        assert_eq!(m.base_lang.as_deref(), Some("en"));
        assert_eq!(m.target_lang.as_deref(), Some("ja"));
        let store = m.store.unwrap();
        assert_eq!(store.storage.as_deref(), Some("a.xlsx"));
        assert_eq!(store.cooldown_ms, Some(5));
    }

    #[test]
    fn environment_overrides_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("TARGET_LANG", "de"),
            ("DIALOGUES_SHEET_NAME", "Dlg"),
            ("STORE_COOLDOWN_MS", "250"),
            ("OPENAI_MODEL", ""),
        ]);
        let file = SheetLocConfig {
            target_lang: Some("ru".into()),
            translate: Some(TranslateCfg {
                model: Some("gpt-4o".into()),
                ..TranslateCfg::default()
            }),
            ..SheetLocConfig::default()
        };
        let cfg = apply_env_from(file, |k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.target_lang.as_deref(), Some("de"));
        assert_eq!(cfg.sheets.unwrap().dialogues.as_deref(), Some("Dlg"));
        assert_eq!(cfg.store.unwrap().cooldown_ms, Some(250));
        // blank variables do not clear file values
        assert_eq!(cfg.translate.unwrap().model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn malformed_cooldown_is_rejected() {
        let err = apply_env_from(SheetLocConfig::default(), |k| {
            (k == "STORE_COOLDOWN_MS").then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
