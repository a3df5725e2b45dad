//! Effective settings: the merged config with defaults applied.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use sheetloc_core::KeyScheme;

use crate::{ConfigError, SheetLocConfig};

pub const DEFAULT_COOLDOWN_MS: u64 = 1000;
pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_MARK_COLOR: &str = "#ffaaaa";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetNames {
    pub actors: String,
    pub quests: String,
    pub system: String,
    pub dialogues: String,
    pub strings: String,
    pub vocab_chars: String,
    pub vocab_terms: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            actors: "Actors".into(),
            quests: "Quests".into(),
            system: "System".into(),
            dialogues: "Dialogues".into(),
            strings: "Strings".into(),
            vocab_chars: "Chars".into(),
            vocab_terms: "Terms".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub storage: Option<PathBuf>,
    pub template: Option<PathBuf>,
    pub spreadsheet_id: Option<String>,
    pub credentials_file: Option<PathBuf>,
    /// Pause between table-level writes.
    pub cooldown: Duration,
}

#[derive(Debug, Clone)]
pub struct TranslateSettings {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub lang_from: String,
    pub lang_to: String,
    pub mark_color: String,
}

#[derive(Debug, Clone)]
pub struct CheckSettings {
    pub batch_size: usize,
    pub checkpoint: PathBuf,
    pub report: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub base_lang: String,
    pub target_lang: String,
    pub key_scheme: KeyScheme,
    pub res_dir: PathBuf,
    pub chapter_definitions: Option<PathBuf>,
    pub log_dir: PathBuf,
    pub languages: BTreeMap<String, usize>,
    pub store: StoreSettings,
    pub sheets: SheetNames,
    pub translate: TranslateSettings,
    pub check: CheckSettings,
}

pub fn default_languages() -> BTreeMap<String, usize> {
    BTreeMap::from([("en".to_string(), 0), ("zh".to_string(), 1), ("ja".to_string(), 2)])
}

impl Settings {
    pub fn resolve(cfg: SheetLocConfig) -> Result<Self, ConfigError> {
        let key_scheme = match cfg.key_scheme.as_deref() {
            Some(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
                name: "key_scheme".into(),
                value: v.to_string(),
            })?,
            None => KeyScheme::default(),
        };
        let base_lang = cfg.base_lang.unwrap_or_else(|| "en".into());
        let target_lang = cfg.target_lang.unwrap_or_default();

        let mut languages = default_languages();
        languages.extend(cfg.languages.unwrap_or_default());

        let store = cfg.store.unwrap_or_default();
        let sheets_cfg = cfg.sheets.unwrap_or_default();
        let defaults = SheetNames::default();
        let sheets = SheetNames {
            actors: sheets_cfg.actors.unwrap_or(defaults.actors),
            quests: sheets_cfg.quests.unwrap_or(defaults.quests),
            system: sheets_cfg.system.unwrap_or(defaults.system),
            dialogues: sheets_cfg.dialogues.unwrap_or(defaults.dialogues),
            strings: sheets_cfg.strings.unwrap_or(defaults.strings),
            vocab_chars: sheets_cfg.vocab_chars.unwrap_or(defaults.vocab_chars),
            vocab_terms: sheets_cfg.vocab_terms.unwrap_or(defaults.vocab_terms),
        };

        let tr = cfg.translate.unwrap_or_default();
        let translate = TranslateSettings {
            endpoint: tr.endpoint,
            api_key: tr.api_key,
            model: tr.model,
            lang_from: tr.lang_from.unwrap_or_else(|| base_lang.clone()),
            lang_to: tr.lang_to.unwrap_or_else(|| target_lang.clone()),
            mark_color: tr.mark_color.unwrap_or_else(|| DEFAULT_MARK_COLOR.into()),
        };

        let ck = cfg.check.unwrap_or_default();
        let check = CheckSettings {
            batch_size: ck.batch_size.filter(|n| *n > 0).unwrap_or(DEFAULT_BATCH_SIZE),
            checkpoint: PathBuf::from(ck.checkpoint.unwrap_or_else(|| "processed.json".into())),
            report: PathBuf::from(ck.report.unwrap_or_else(|| "report.json".into())),
        };

        Ok(Self {
            base_lang,
            target_lang,
            key_scheme,
            res_dir: PathBuf::from(cfg.res_dir.unwrap_or_else(|| "res".into())),
            chapter_definitions: cfg.chapter_definitions.map(PathBuf::from),
            log_dir: PathBuf::from(cfg.log_dir.unwrap_or_else(|| "logs".into())),
            languages,
            store: StoreSettings {
                storage: store.storage.map(PathBuf::from),
                template: store.template.map(PathBuf::from),
                spreadsheet_id: store.spreadsheet_id,
                credentials_file: store.credentials_file.map(PathBuf::from),
                cooldown: Duration::from_millis(store.cooldown_ms.unwrap_or(DEFAULT_COOLDOWN_MS)),
            },
            sheets,
            translate,
            check,
        })
    }

    /// Index of `lang` in the term table's `Languages[]`.
    pub fn language_index(&self, lang: &str) -> Option<usize> {
        self.languages.get(lang).copied()
    }
}
