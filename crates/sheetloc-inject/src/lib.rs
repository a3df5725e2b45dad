//! Re-injection: walk the source trees again and write stored translations
//! into the target-language fields.
//!
//! The walk mirrors extraction's field selection. The store is only read;
//! every output goes to a `-mod.json` sibling of its input.

use std::path::{Path, PathBuf};

use color_eyre::eyre::WrapErr;
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use sheetloc_core::{unescape_tabs, DialoguePart, Field, KeyScheme, Result, StringKey, Table};
use sheetloc_domain::ReinjectTableStat;
use sheetloc_parsers_tree::extract::conversation_title;
use sheetloc_parsers_tree::terms::{is_text_term, strings_table, term_list_mut};
use sheetloc_parsers_tree::tree::value_text;
use sheetloc_parsers_tree::{
    discover_tree_files, output_path, read_tree_with_layout, write_tree, FieldLookup, FieldLookupMut, FieldQuery,
    STRINGS_FILE, TERM_TABLE_FILE,
};
use sheetloc_store::{Snapshot, StoredRow};

#[derive(Debug, Clone, Copy)]
pub struct InjectOptions<'a> {
    pub base_lang: &'a str,
    pub target_lang: &'a str,
    pub scheme: KeyScheme,
    /// Column of the target language in the term table; terms are left alone without it.
    pub target_index: Option<usize>,
}

/// Store snapshots the walk reads from.
#[derive(Debug, Clone)]
pub struct StoreTables {
    pub actors: Snapshot,
    pub quests: Snapshot,
    pub system: Snapshot,
    pub dialogues: Snapshot,
    pub strings: Snapshot,
}

/// Per-table counters. `unmatched` starts with every store key.
#[derive(Debug, Clone)]
pub struct TableTally {
    pub table: Table,
    pub store_rows: usize,
    pub replaced: usize,
    pub empty_fallbacks: usize,
    pub missing_fields: usize,
    pub unmatched: IndexSet<String>,
}

impl TableTally {
    fn seeded(table: Table, snapshot: &Snapshot) -> Self {
        Self {
            table,
            store_rows: snapshot.len(),
            replaced: 0,
            empty_fallbacks: 0,
            missing_fields: 0,
            unmatched: snapshot.keys().map(str::to_string).collect(),
        }
    }

    pub fn to_stat(&self) -> ReinjectTableStat {
        ReinjectTableStat {
            table: self.table.to_string(),
            store_rows: self.store_rows,
            replaced: self.replaced,
            empty_fallbacks: self.empty_fallbacks,
            missing_fields: self.missing_fields,
            unmatched: self.unmatched.iter().cloned().collect(),
        }
    }

    /// Write `field` of the stored row into `slot`.
    ///
    /// A key the store lacks is ignored. A missing slot leaves the key
    /// unmatched. An empty translation leaves the slot untouched.
    fn apply(&mut self, snapshot: &Snapshot, key: &str, field: Field, slot: Option<&mut Value>) {
        let Some((stored, row)) = snapshot.find(key) else {
            return;
        };
        let Some(slot) = slot else {
            self.missing_fields += 1;
            tracing::debug!(event = "inject_field_missing", table = %self.table, key = key);
            return;
        };
        self.unmatched.shift_remove(stored);
        match translation(snapshot, row, field) {
            Some(text) => {
                slot["value"] = Value::String(text);
                self.replaced += 1;
            }
            None => self.empty_fallback(key),
        }
    }

    fn empty_fallback(&mut self, key: &str) {
        self.empty_fallbacks += 1;
        tracing::warn!(event = "inject_empty_translation", table = %self.table, key = key);
    }
}

/// Non-empty stored text with tab escapes restored.
fn translation(snapshot: &Snapshot, row: &StoredRow, field: Field) -> Option<String> {
    let text = row.get(snapshot.shape(), field);
    (!text.is_empty()).then(|| unescape_tabs(text).into_owned())
}

/// One re-injection pass over any number of trees.
pub struct Injector<'a> {
    tables: &'a StoreTables,
    opts: InjectOptions<'a>,
    pub actors: TableTally,
    pub quests: TableTally,
    pub system: TableTally,
    pub dialogues: TableTally,
    pub strings: TableTally,
}

impl<'a> Injector<'a> {
    pub fn new(tables: &'a StoreTables, opts: InjectOptions<'a>) -> Self {
        Self {
            actors: TableTally::seeded(Table::Actors, &tables.actors),
            quests: TableTally::seeded(Table::Quests, &tables.quests),
            system: TableTally::seeded(Table::System, &tables.system),
            dialogues: TableTally::seeded(Table::Dialogues, &tables.dialogues),
            strings: TableTally::seeded(Table::Strings, &tables.strings),
            tables,
            opts,
        }
    }

    pub fn tallies(&self) -> [&TableTally; 5] {
        [&self.actors, &self.quests, &self.system, &self.dialogues, &self.strings]
    }

    /// Actors, quests and dialogue entries of one tree, in place.
    pub fn inject_tree(&mut self, tree: &mut Value) {
        self.inject_quests(tree);
        self.inject_actors(tree);
        self.inject_dialogues(tree);
    }

    fn inject_quests(&mut self, tree: &mut Value) {
        let base = format!("Description {}", self.opts.base_lang);
        let target = format!("Description {}", self.opts.target_lang);
        let Some(items) = tree.get_mut("items").and_then(Value::as_array_mut) else {
            return;
        };
        for item in items {
            let name = match self.opts.scheme {
                KeyScheme::NameField => item.field_text(FieldQuery::plain("Name")),
                KeyScheme::DisplayText => item
                    .field_text(FieldQuery::localized(&base))
                    .filter(|t| !t.is_empty()),
            };
            let Some(name) = name else {
                continue;
            };
            let key = StringKey::quest(name).to_string();
            let slot = item.field_mut(FieldQuery::localized(&target));
            self.quests.apply(&self.tables.quests, &key, Field::Translated, slot);
        }
    }

    fn inject_actors(&mut self, tree: &mut Value) {
        let base = format!("Display Name {}", self.opts.base_lang);
        let target = format!("Display Name {}", self.opts.target_lang);
        let Some(actors) = tree.get_mut("actors").and_then(Value::as_array_mut) else {
            return;
        };
        for actor in actors {
            let name = match self.opts.scheme {
                KeyScheme::NameField => actor.field_text(FieldQuery::plain("Name")),
                KeyScheme::DisplayText => actor
                    .field_text(FieldQuery::localized(&base))
                    .or_else(|| actor.field_text(FieldQuery::plain(&base)))
                    .filter(|t| !t.is_empty()),
            };
            let Some(name) = name else {
                continue;
            };
            let key = StringKey::actor(name).to_string();
            // same plain-field fallback as extraction
            let query = if actor.field(FieldQuery::localized(&target)).is_some() {
                FieldQuery::localized(&target)
            } else {
                FieldQuery::plain(&target)
            };
            let slot = actor.field_mut(query);
            self.actors.apply(&self.tables.actors, &key, Field::Translated, slot);
        }
    }

    fn inject_dialogues(&mut self, tree: &mut Value) {
        let menu_title = format!("Menu Text {}", self.opts.target_lang);
        let Some(conversations) = tree.get_mut("conversations").and_then(Value::as_array_mut) else {
            return;
        };
        for conversation in conversations {
            let Some(title) = conversation_title(conversation).filter(|t| !t.is_empty()) else {
                tracing::debug!(event = "inject_untitled_conversation");
                continue;
            };
            let Some(entries) = conversation
                .get_mut("dialogueEntries")
                .and_then(Value::as_array_mut)
            else {
                continue;
            };
            for entry in entries {
                let Some(id) = entry.get("id").and_then(value_text) else {
                    continue;
                };
                let text_key = StringKey::dialogue(title.as_str(), id.as_str(), DialoguePart::DialogueText).to_string();
                let slot = entry.field_mut(FieldQuery::localized(self.opts.target_lang));
                self.dialogues.apply(&self.tables.dialogues, &text_key, Field::Translated, slot);

                let menu_key = StringKey::dialogue(title.as_str(), id.as_str(), DialoguePart::MenuText).to_string();
                let slot = entry.field_mut(FieldQuery::localized(&menu_title));
                self.dialogues.apply(&self.tables.dialogues, &menu_key, Field::Translated, slot);
            }
        }
    }

    /// Term table: `Languages[target_index]`, padding the array with nulls.
    pub fn inject_terms(&mut self, tree: &mut Value) {
        let Some(index) = self.opts.target_index else {
            tracing::warn!(event = "inject_terms_skipped", target_lang = self.opts.target_lang, reason = "no term table column");
            return;
        };
        let Some(terms) = term_list_mut(tree) else {
            return;
        };
        let snapshot = &self.tables.system;
        for term in terms.iter_mut().filter(|t| is_text_term(t)) {
            let Some(name) = term.get("Term").and_then(Value::as_str) else {
                continue;
            };
            let key = StringKey::system(name).to_string();
            let Some((stored, row)) = snapshot.find(&key) else {
                continue;
            };
            self.system.unmatched.shift_remove(stored);
            let Some(text) = translation(snapshot, row, Field::Translated) else {
                self.system.empty_fallback(&key);
                continue;
            };
            let Some(obj) = term.as_object_mut() else {
                continue;
            };
            let languages = obj.entry("Languages").or_insert_with(|| Value::Array(Vec::new()));
            if !languages.is_array() {
                *languages = Value::Array(Vec::new());
            }
            if let Value::Array(list) = languages {
                if list.len() <= index {
                    list.resize(index + 1, Value::Null);
                }
                list[index] = Value::String(text);
                self.system.replaced += 1;
            }
        }
    }

    /// Every strings-table entry, with the stored value where it is non-empty.
    pub fn inject_strings(&mut self, table: IndexMap<String, Value>) -> IndexMap<String, Value> {
        let snapshot = &self.tables.strings;
        table
            .into_iter()
            .map(|(source, existing)| {
                let Some((stored, row)) = snapshot.find(&source) else {
                    return (source, existing);
                };
                self.strings.unmatched.shift_remove(stored);
                match translation(snapshot, row, Field::Value) {
                    Some(text) => {
                        self.strings.replaced += 1;
                        (source, Value::String(text))
                    }
                    None => {
                        self.strings.empty_fallback(&source);
                        (source, existing)
                    }
                }
            })
            .collect()
    }
}

/// Outcome of [`reinject_dir`].
#[derive(Debug, Clone)]
pub struct ReinjectRun {
    pub written: Vec<PathBuf>,
    pub tallies: Vec<TableTally>,
}

/// Re-inject every tree under `root`, plus the term and strings tables when present.
pub fn reinject_dir(root: &Path, tables: &StoreTables, opts: InjectOptions<'_>) -> Result<ReinjectRun> {
    let mut injector = Injector::new(tables, opts);
    let mut written = Vec::new();

    for path in discover_tree_files(root)? {
        let (mut tree, layout) =
            read_tree_with_layout(&path).wrap_err_with(|| format!("re-injecting {}", path.display()))?;
        injector.inject_tree(&mut tree);
        let out = output_path(&path);
        write_tree(&out, &tree, &layout)?;
        tracing::debug!(event = "tree_reinjected", input = %path.display(), output = %out.display());
        written.push(out);
    }

    let term_path = root.join(TERM_TABLE_FILE);
    if term_path.is_file() {
        let (mut tree, layout) = read_tree_with_layout(&term_path)?;
        injector.inject_terms(&mut tree);
        let out = output_path(&term_path);
        write_tree(&out, &tree, &layout)?;
        written.push(out);
    } else {
        tracing::warn!(event = "term_table_absent", path = %term_path.display());
    }

    let strings_path = root.join(STRINGS_FILE);
    if strings_path.is_file() {
        let (raw, layout) = read_tree_with_layout(&strings_path)?;
        let merged = injector.inject_strings(strings_table(&strings_path, raw)?);
        let out = output_path(&strings_path);
        write_tree(&out, &Value::Object(merged.into_iter().collect()), &layout)?;
        written.push(out);
    }

    for t in injector.tallies() {
        tracing::info!(
            event = "reinject_table",
            table = %t.table,
            store_rows = t.store_rows,
            replaced = t.replaced,
            empty_fallbacks = t.empty_fallbacks,
            missing_fields = t.missing_fields,
            unmatched = t.unmatched.len(),
        );
    }
    let tallies = injector.tallies().into_iter().cloned().collect();
    Ok(ReinjectRun { written, tallies })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sheetloc_core::Shape;
    use sheetloc_parsers_tree::tree::{read_tree, render_tree, TreeLayout};

    fn snap(shape: Shape, rows: &[&[&str]]) -> Snapshot {
        Snapshot::from_values(
            shape,
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect::<Vec<_>>()),
        )
    }

    fn empty_tables() -> StoreTables {
        StoreTables {
            actors: Snapshot::new(Shape::Translatable),
            quests: Snapshot::new(Shape::Translatable),
            system: Snapshot::new(Shape::Translatable),
            dialogues: Snapshot::new(Shape::Dialogue),
            strings: Snapshot::new(Shape::KeyValue),
        }
    }

    fn opts() -> InjectOptions<'static> {
        InjectOptions {
            base_lang: "en",
            target_lang: "ru",
            scheme: KeyScheme::NameField,
            target_index: Some(3),
        }
    }

    const TREE: &str = r#"{
  "actors": [
    {
      "id": 12345678901234567890,
      "fields": [
        { "title": "Name", "type": 0, "value": "grace" },
        { "title": "Display Name en", "type": 0, "value": "Grace" },
        { "title": "Display Name ru", "type": 0, "value": "" }
      ]
    }
  ],
  "items": [
    {
      "id": 2,
      "fields": [
        { "title": "Name", "type": 0, "value": "find_key" },
        { "title": "Description en", "type": 4, "value": "Find the key" },
        { "title": "Description ru", "type": 4, "value": "" }
      ]
    }
  ],
  "conversations": [
    {
      "id": 1,
      "fields": [ { "title": "Title", "type": 0, "value": "Intro" } ],
      "dialogueEntries": [
        {
          "id": 5,
          "weight": 0.50,
          "fields": [
            { "title": "en", "type": 4, "value": "Hello" },
            { "title": "ru", "type": 4, "value": "" },
            { "title": "Menu Text en", "type": 4, "value": "Greet" },
            { "title": "Menu Text ru", "type": 4, "value": "" }
          ]
        },
        {
          "id": 7,
          "fields": [ { "title": "en", "type": 4, "value": "Bye" } ]
        }
      ]
    },
    {
      "id": 2,
      "fields": [],
      "dialogueEntries": [
        { "id": 1, "fields": [ { "title": "ru", "type": 4, "value": "" } ] }
      ]
    }
  ]
}"#;

    /// What the exporter writes: four-space indent, raw non-ASCII, no final newline.
    const EXPORTED: &str = r#"{
    "actors": [
        {
            "id": 12345678901234567890,
            "fields": [
                {
                    "title": "Name",
                    "type": 0,
                    "value": "grace"
                },
                {
                    "title": "Display Name en",
                    "type": 4,
                    "value": "<color=#fff>Grâce</color>"
                },
                {
                    "title": "Display Name ru",
                    "type": 4,
                    "value": ""
                }
            ]
        }
    ],
    "conversations": [
        {
            "id": 1,
            "fields": [
                {
                    "title": "Title",
                    "type": 0,
                    "value": "Intro"
                }
            ],
            "dialogueEntries": [
                {
                    "id": 5,
                    "weight": 0.5,
                    "outgoingLinks": [],
                    "fields": [
                        {
                            "title": "Actor",
                            "type": 0,
                            "value": "12345678901234567890"
                        },
                        {
                            "title": "en",
                            "type": 4,
                            "value": "Hello\tthere"
                        },
                        {
                            "title": "ru",
                            "type": 4,
                            "value": "(ru)"
                        },
                        {
                            "title": "Menu Text en",
                            "type": 4,
                            "value": "Greet"
                        },
                        {
                            "title": "Menu Text ru",
                            "type": 4,
                            "value": ""
                        }
                    ]
                }
            ]
        }
    ]
}"#;

    fn tree() -> Value {
        serde_json::from_str(TREE).unwrap()
    }

    fn rendered(t: &Value) -> String {
        String::from_utf8(render_tree(t, &TreeLayout::default()).unwrap()).unwrap()
    }

    #[test]
    fn empty_store_reproduces_exported_bytes() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("chapter1.json"), EXPORTED)?;
        std::fs::write(dir.path().join("chapter2.json"), format!("\u{feff}{EXPORTED}"))?;

        let run = reinject_dir(dir.path(), &empty_tables(), opts())?;
        assert_eq!(run.written.len(), 2);
        for name in ["chapter1", "chapter2"] {
            let source = std::fs::read(dir.path().join(format!("{name}.json")))?;
            let out = std::fs::read(dir.path().join(format!("{name}-mod.json")))?;
            assert_eq!(String::from_utf8(out)?, String::from_utf8(source)?, "{name}");
        }
        Ok(())
    }

    #[test]
    fn only_translated_fields_change_in_exported_bytes() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("chapter1.json"), EXPORTED)?;
        let tables = StoreTables {
            dialogues: snap(
                Shape::Dialogue,
                &[
                    &["Dialogue/Intro/5/DialogueText", "Grâce", "Hello\\tthere", "Привет,\\tвсем"],
                    &["Dialogue/Intro/5/MenuText", "Grâce", "Greet", ""],
                ],
            ),
            ..empty_tables()
        };
        reinject_dir(dir.path(), &tables, opts())?;
        let out = std::fs::read_to_string(dir.path().join("chapter1-mod.json"))?;
        assert_eq!(out, EXPORTED.replace("\"(ru)\"", "\"Привет,\\tвсем\""));
        Ok(())
    }

    #[test]
    fn translations_replace_target_fields_only() {
        let tables = StoreTables {
            actors: snap(Shape::Translatable, &[&["Actor/GRACE", "Grace", "Грейс"]]),
            quests: snap(Shape::Translatable, &[&["Quest/find_key", "Find the key", "Найти\\tключ"]]),
            dialogues: snap(
                Shape::Dialogue,
                &[
                    &["Dialogue/Intro/5/DialogueText", "Grace", "Hello", "Привет"],
                    &["Dialogue/Intro/5/MenuText", "Grace", "Greet", ""],
                ],
            ),
            ..empty_tables()
        };
        let mut injector = Injector::new(&tables, opts());
        let mut t = tree();
        injector.inject_tree(&mut t);

        // plain display-name fallback on the target side too
        assert_eq!(t["actors"][0]["fields"][2]["value"], "Грейс");
        assert_eq!(t["actors"][0]["fields"][1]["value"], "Grace");
        assert_eq!(t["items"][0]["fields"][2]["value"], "Найти\tключ");
        let entry = &t["conversations"][0]["dialogueEntries"][0];
        assert_eq!(entry["fields"][1]["value"], "Привет");
        assert_eq!(entry["fields"][3]["value"], "");
        assert_eq!(entry["fields"][0]["value"], "Hello");

        assert_eq!(injector.actors.replaced, 1);
        assert_eq!(injector.quests.replaced, 1);
        assert_eq!(injector.dialogues.replaced, 1);
        assert_eq!(injector.dialogues.empty_fallbacks, 1);
        assert!(injector.dialogues.unmatched.is_empty());
        // ids beyond f64 precision survive
        assert!(rendered(&t).contains("12345678901234567890"));
        assert!(rendered(&t).contains("0.50"));
    }

    #[test]
    fn orphans_and_missing_fields_stay_unmatched() {
        let tables = StoreTables {
            dialogues: snap(
                Shape::Dialogue,
                &[
                    &["Dialogue/Intro/7/DialogueText", "", "Bye", "Пока"],
                    &["Dialogue/Gone/1/DialogueText", "", "Old", "Старое"],
                ],
            ),
            ..empty_tables()
        };
        let mut injector = Injector::new(&tables, opts());
        let mut t = tree();
        injector.inject_tree(&mut t);
        assert_eq!(injector.dialogues.missing_fields, 1);
        assert_eq!(injector.dialogues.replaced, 0);
        let stat = injector.dialogues.to_stat();
        assert_eq!(stat.store_rows, 2);
        assert_eq!(
            stat.unmatched,
            vec!["Dialogue/Intro/7/DialogueText", "Dialogue/Gone/1/DialogueText"]
        );
    }

    #[test]
    fn untitled_conversations_are_skipped() {
        let tables = StoreTables {
            dialogues: snap(Shape::Dialogue, &[&["Dialogue//1/DialogueText", "", "x", "y"]]),
            ..empty_tables()
        };
        let mut injector = Injector::new(&tables, opts());
        let mut t = tree();
        injector.inject_tree(&mut t);
        assert_eq!(t["conversations"][1]["dialogueEntries"][0]["fields"][0]["value"], "");
        assert_eq!(injector.dialogues.unmatched.len(), 1);
    }

    #[test]
    fn term_languages_are_padded_to_target() {
        let tables = StoreTables {
            system: snap(
                Shape::Translatable,
                &[&["System/Menu/Start", "Start", "Старт"], &["System/Menu/Quit", "Quit", ""]],
            ),
            ..empty_tables()
        };
        let mut injector = Injector::new(&tables, opts());
        let mut terms = json!({ "mSource": { "mTerms": [
            { "Term": "Menu/Start", "TermType": 0, "Languages": ["Start", "开始"] },
            { "Term": "Menu/Quit", "TermType": 0, "Languages": ["Quit"] }
        ]}});
        injector.inject_terms(&mut terms);
        assert_eq!(
            terms["mSource"]["mTerms"][0]["Languages"],
            json!(["Start", "开始", null, "Старт"])
        );
        // empty translation: array untouched
        assert_eq!(terms["mSource"]["mTerms"][1]["Languages"], json!(["Quit"]));
        assert_eq!(injector.system.replaced, 1);
        assert_eq!(injector.system.empty_fallbacks, 1);
    }

    #[test]
    fn non_text_terms_are_never_padded() {
        let tables = StoreTables {
            system: snap(Shape::Translatable, &[&["System/Icons/Logo", "logo.png", "лого"]]),
            ..empty_tables()
        };
        let mut injector = Injector::new(&tables, opts());
        let mut terms = json!({ "mSource": { "mTerms": [
            { "Term": "Icons/Logo", "TermType": 2, "Languages": ["logo.png"] }
        ]}});
        injector.inject_terms(&mut terms);
        assert_eq!(terms["mSource"]["mTerms"][0]["Languages"], json!(["logo.png"]));
        assert_eq!(injector.system.replaced, 0);
        assert!(injector.system.unmatched.contains("System/Icons/Logo"));
    }

    #[test]
    fn strings_keep_existing_values_when_untranslated() {
        let tables = StoreTables {
            strings: snap(Shape::KeyValue, &[&["Continue", "Продолжить"], &["Load", ""]]),
            ..empty_tables()
        };
        let mut injector = Injector::new(&tables, opts());
        let table: IndexMap<String, Value> = [
            ("Load".to_string(), json!("")),
            ("Continue".to_string(), json!("")),
            ("100".to_string(), json!("100")),
        ]
        .into_iter()
        .collect();
        let out = injector.inject_strings(table);
        assert_eq!(out.keys().collect::<Vec<_>>(), ["Load", "Continue", "100"]);
        assert_eq!(out["Continue"], "Продолжить");
        assert_eq!(out["100"], "100");
        assert_eq!(injector.strings.empty_fallbacks, 1);
    }

    #[test]
    fn reinject_dir_writes_siblings() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::create_dir_all(dir.path().join("db"))?;
        let input = dir.path().join("db/chapter1.json");
        std::fs::write(&input, TREE)?;
        std::fs::write(
            dir.path().join(TERM_TABLE_FILE),
            r#"{"mSource":{"mTerms":[{"Term":"Menu/Start","TermType":0,"Languages":["Start"]}]}}"#,
        )?;
        std::fs::write(dir.path().join(STRINGS_FILE), r#"{"Continue":""}"#)?;

        let tables = StoreTables {
            dialogues: snap(Shape::Dialogue, &[&["Dialogue/Intro/5/DialogueText", "", "Hello", "Привет"]]),
            ..empty_tables()
        };
        let run = reinject_dir(dir.path(), &tables, opts())?;
        assert_eq!(run.written.len(), 3);
        assert_eq!(std::fs::read_to_string(&input)?, TREE);
        let out = read_tree(&dir.path().join("db/chapter1-mod.json"))?;
        assert_eq!(out["conversations"][0]["dialogueEntries"][0]["fields"][1]["value"], "Привет");
        assert!(dir.path().join("I2Languages-mod.json").is_file());
        assert!(dir.path().join("strings-mod.json").is_file());

        // outputs of a previous run are not inputs
        let again = reinject_dir(dir.path(), &tables, opts())?;
        assert_eq!(again.written.len(), 3);
        Ok(())
    }
}
