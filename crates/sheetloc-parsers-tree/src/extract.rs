//! Tree extraction: one tree in, records out, folded across files.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::Value;
use sheetloc_core::{strip_markup, DialoguePart, KeyScheme, StringKey, TextRecord};

use crate::chapters::ChapterTable;
use crate::fields::{members, FieldLookup, FieldQuery};
use crate::tree::value_text;

#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions<'a> {
    pub base_lang: &'a str,
    pub scheme: KeyScheme,
    pub chapters: &'a ChapterTable,
}

/// Data-quality counters. Never fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub display_name_fallbacks: usize,
    pub missing_display_name: usize,
    pub dropped_entries: usize,
    pub skipped_items: usize,
}

impl ExtractStats {
    fn add(&mut self, other: &ExtractStats) {
        self.display_name_fallbacks += other.display_name_fallbacks;
        self.missing_display_name += other.missing_display_name;
        self.dropped_entries += other.dropped_entries;
        self.skipped_items += other.skipped_items;
    }
}

#[derive(Debug, Clone, Default)]
pub struct FileExtraction {
    pub path: PathBuf,
    pub chapter: Option<u32>,
    pub actors: Vec<TextRecord>,
    pub quests: Vec<TextRecord>,
    pub dialogues: Vec<TextRecord>,
    pub stats: ExtractStats,
}

/// Plain `title` of a conversation; the label is matched case-insensitively.
pub fn conversation_title(conversation: &Value) -> Option<String> {
    conversation.field_text(FieldQuery::plain("title").ignore_case())
}

/// First conversation whose title appears in the chapter table freezes the chapter.
pub fn resolve_chapter(tree: &Value, chapters: &ChapterTable) -> Option<u32> {
    members(tree, "conversations")
        .iter()
        .filter_map(|c| conversation_title(c))
        .find_map(|title| chapters.lookup(&title))
}

pub fn extract_file(path: &Path, tree: &Value, opts: &ExtractOptions<'_>) -> FileExtraction {
    let chapter = resolve_chapter(tree, opts.chapters);
    let mut out = FileExtraction {
        path: path.to_path_buf(),
        chapter,
        ..FileExtraction::default()
    };
    if chapter.is_none() && !members(tree, "conversations").is_empty() {
        tracing::warn!(event = "chapter_unresolved", path = %path.display());
    }

    extract_quests(tree, opts, &mut out);
    extract_actors(tree, opts, &mut out);
    extract_dialogues(tree, opts, &mut out);

    tracing::debug!(
        event = "tree_extracted",
        path = %path.display(),
        chapter = ?chapter,
        actors = out.actors.len(),
        quests = out.quests.len(),
        dialogues = out.dialogues.len(),
    );
    out
}

fn extract_quests(tree: &Value, opts: &ExtractOptions<'_>, out: &mut FileExtraction) {
    let description = format!("Description {}", opts.base_lang);
    for item in members(tree, "items") {
        let text = item.field_text(FieldQuery::localized(&description));
        let name = match opts.scheme {
            KeyScheme::NameField => item.field_text(FieldQuery::plain("Name")),
            KeyScheme::DisplayText => text.clone().filter(|t| !t.is_empty()),
        };
        match (name, text) {
            (Some(name), Some(text)) => out.quests.push(TextRecord::new(StringKey::quest(name), text)),
            _ => out.stats.skipped_items += 1,
        }
    }
}

fn extract_actors(tree: &Value, opts: &ExtractOptions<'_>, out: &mut FileExtraction) {
    let display = format!("Display Name {}", opts.base_lang);
    for actor in members(tree, "actors") {
        let name = actor.field_text(FieldQuery::plain("Name"));
        let localized = actor.field_text(FieldQuery::localized(&display));
        let text = match localized {
            Some(t) => Some(t),
            None => {
                let plain = actor.field_text(FieldQuery::plain(&display));
                if plain.is_some() {
                    out.stats.display_name_fallbacks += 1;
                    tracing::warn!(
                        event = "display_name_fallback",
                        path = %out.path.display(),
                        actor = name.as_deref().unwrap_or_default(),
                    );
                }
                plain
            }
        };
        let Some(text) = text else {
            out.stats.missing_display_name += 1;
            continue;
        };
        let key = match opts.scheme {
            KeyScheme::NameField => name,
            KeyScheme::DisplayText => Some(text.clone()).filter(|t| !t.is_empty()),
        };
        match key {
            Some(key) => out.actors.push(TextRecord::new(StringKey::actor(key), text)),
            None => out.stats.skipped_items += 1,
        }
    }
}

/// Speaker display name with markup stripped, resolved through the file's own actors.
fn speaker_name(tree: &Value, entry: &Value, opts: &ExtractOptions<'_>) -> Option<String> {
    let actor_id = entry
        .field_text(FieldQuery::any(opts.scheme.speaker_field()))
        .filter(|v| !v.is_empty())?;
    let actor = members(tree, "actors")
        .iter()
        .find(|a| a.get("id").and_then(value_text).as_deref() == Some(actor_id.as_str()))?;
    let display = format!("Display Name {}", opts.base_lang);
    let name = actor.field_text(FieldQuery::text(&display))?;
    let name = strip_markup(&name).into_owned();
    (!name.is_empty()).then_some(name)
}

fn extract_dialogues(tree: &Value, opts: &ExtractOptions<'_>, out: &mut FileExtraction) {
    let menu_title = format!("Menu Text {}", opts.base_lang);
    for conversation in members(tree, "conversations") {
        let title = conversation_title(conversation).unwrap_or_default();
        for entry in members(conversation, "dialogueEntries") {
            let Some(id) = entry.get("id").and_then(value_text) else {
                out.stats.dropped_entries += 1;
                continue;
            };
            let text = entry
                .field_text(FieldQuery::localized(opts.base_lang))
                .filter(|t| !t.is_empty());
            let menu = entry
                .field_text(FieldQuery::localized(&menu_title))
                .filter(|t| !t.is_empty());
            let keep = match opts.scheme {
                KeyScheme::NameField => text.is_some() || menu.is_some(),
                KeyScheme::DisplayText => text.is_some(),
            };
            if !keep {
                out.stats.dropped_entries += 1;
                continue;
            }
            let actor = speaker_name(tree, entry, opts);
            for (part, original) in [(DialoguePart::MenuText, menu), (DialoguePart::DialogueText, text)] {
                if let Some(original) = original {
                    out.dialogues.push(
                        TextRecord::new(StringKey::dialogue(title.as_str(), id.as_str(), part), original)
                            .with_actor(actor.clone())
                            .with_chapter(out.chapter)
                            .with_source(&out.path),
                    );
                }
            }
        }
    }
}

/// Accumulator folding per-file results.
#[derive(Debug, Default)]
pub struct ExtractionSet {
    files: usize,
    actors: Vec<TextRecord>,
    quests: Vec<TextRecord>,
    dialogues: Vec<TextRecord>,
    unresolved: Vec<PathBuf>,
    stats: ExtractStats,
}

impl ExtractionSet {
    pub fn absorb(&mut self, file: FileExtraction) {
        self.files += 1;
        if file.chapter.is_none() && !file.dialogues.is_empty() {
            self.unresolved.push(file.path.clone());
        }
        self.stats.add(&file.stats);
        self.actors.extend(file.actors);
        self.quests.extend(file.quests);
        self.dialogues.extend(file.dialogues);
    }

    /// Sort, collapse duplicate keys and project the character vocabulary.
    pub fn finish(self, terms: Vec<TextRecord>, strings: Vec<String>) -> Extraction {
        let mut dialogues = self.dialogues;
        // stable: traversal order survives within a chapter
        dialogues.sort_by_key(|r| (r.chapter.is_none(), r.chapter));
        let dialogues = collapse(dialogues);

        let mut actors = self.actors;
        actors.sort_by_key(|r| r.key.to_string());
        let mut quests = self.quests;
        quests.sort_by_key(|r| r.key.to_string());

        let vocabulary: BTreeSet<String> = dialogues.iter().filter_map(|r| r.actor.clone()).collect();

        Extraction {
            files: self.files,
            actors: collapse(actors),
            quests: collapse(quests),
            dialogues,
            terms,
            strings,
            vocabulary: vocabulary.into_iter().collect(),
            unresolved_chapters: self.unresolved,
            stats: self.stats,
        }
    }
}

/// Last value wins, first position kept.
fn collapse(records: Vec<TextRecord>) -> Vec<TextRecord> {
    let mut by_key: IndexMap<String, TextRecord> = IndexMap::with_capacity(records.len());
    for r in records {
        by_key.insert(r.key.to_string(), r);
    }
    by_key.into_values().collect()
}

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub files: usize,
    pub actors: Vec<TextRecord>,
    pub quests: Vec<TextRecord>,
    pub dialogues: Vec<TextRecord>,
    pub terms: Vec<TextRecord>,
    /// Staged UI strings.
    pub strings: Vec<String>,
    /// Distinct speaker names, sorted.
    pub vocabulary: Vec<String>,
    pub unresolved_chapters: Vec<PathBuf>,
    pub stats: ExtractStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chapters() -> ChapterTable {
        ChapterTable::from_json(r#"{ "1": "Intro", "2": ["Cellar", "Attic"] }"#).unwrap()
    }

    fn field(title: &str, ty: u64, value: Value) -> Value {
        json!({ "title": title, "type": ty, "value": value })
    }

    fn sample_tree() -> Value {
        json!({
            "actors": [
                { "id": 1, "fields": [
                    field("Name", 0, json!("grace")),
                    field("Display Name en", 0, json!("<color=red>Grace</color>"))
                ]},
                { "id": 2, "fields": [
                    field("Name", 0, json!("tom")),
                    field("Display Name en", 4, json!("Tom"))
                ]},
                { "id": 3, "fields": [ field("Name", 0, json!("nobody")) ] }
            ],
            "items": [
                { "fields": [
                    field("Name", 0, json!("FindKey")),
                    field("Description en", 4, json!("Find the key"))
                ]},
                { "fields": [ field("Name", 0, json!("NoText")) ] }
            ],
            "conversations": [
                { "fields": [ field("Title", 0, json!("Side")) ], "dialogueEntries": [] },
                { "fields": [ field("Title", 0, json!("Cellar")) ], "dialogueEntries": [
                    { "id": 12345678901234567890_u64, "fields": [
                        field("en", 4, json!("Hello")),
                        field("Menu Text en", 4, json!("Greet")),
                        field("Actor", 0, json!("1"))
                    ]},
                    { "id": 7, "fields": [ field("Actor", 0, json!("2")) ] },
                    { "id": 8, "fields": [
                        field("Menu Text en", 4, json!("Leave")),
                        field("Actor", 0, json!(2))
                    ]}
                ]}
            ]
        })
    }

    fn opts(chapters: &ChapterTable) -> ExtractOptions<'_> {
        ExtractOptions {
            base_lang: "en",
            scheme: KeyScheme::NameField,
            chapters,
        }
    }

    #[test]
    fn extracts_all_record_kinds() {
        let table = chapters();
        let tree = sample_tree();
        let f = extract_file(Path::new("a.json"), &tree, &opts(&table));
        assert_eq!(f.chapter, Some(2));

        let keys: Vec<String> = f.dialogues.iter().map(|r| r.key.to_string()).collect();
        assert_eq!(
            keys,
            [
                "Dialogue/Cellar/12345678901234567890/MenuText",
                "Dialogue/Cellar/12345678901234567890/DialogueText",
                "Dialogue/Cellar/8/MenuText",
            ]
        );
        assert_eq!(f.dialogues[0].actor.as_deref(), Some("Grace"));
        assert_eq!(f.dialogues[2].actor.as_deref(), Some("Tom"));
        assert_eq!(f.dialogues[0].chapter, Some(2));
        assert_eq!(f.stats.dropped_entries, 1);

        assert_eq!(f.actors.len(), 2);
        assert_eq!(f.actors[0].key.to_string(), "Actor/grace");
        assert_eq!(f.actors[0].original, "<color=red>Grace</color>");
        assert_eq!(f.stats.display_name_fallbacks, 1);
        assert_eq!(f.stats.missing_display_name, 1);

        assert_eq!(f.quests.len(), 1);
        assert_eq!(f.quests[0].key.to_string(), "Quest/FindKey");
        assert_eq!(f.stats.skipped_items, 1);
    }

    #[test]
    fn display_text_scheme_uses_conversant_and_text_keys() {
        let table = chapters();
        let tree = json!({
            "actors": [ { "id": 5, "fields": [ field("Display Name en", 4, json!("Ann")) ] } ],
            "items": [ { "fields": [ field("Description en", 4, json!("Open the gate")) ] } ],
            "conversations": [ { "fields": [ field("title", 0, json!("Intro")) ], "dialogueEntries": [
                { "id": 1, "fields": [ field("Menu Text en", 4, json!("Only menu")) ] },
                { "id": 2, "fields": [ field("en", 4, json!("Hi")), field("Conversant", 0, json!(5)) ] }
            ]}]
        });
        let o = ExtractOptions {
            scheme: KeyScheme::DisplayText,
            ..opts(&table)
        };
        let f = extract_file(Path::new("b.json"), &tree, &o);
        assert_eq!(f.actors[0].key.to_string(), "Actor/Ann");
        assert_eq!(f.quests[0].key.to_string(), "Quest/Open the gate");
        assert_eq!(f.dialogues.len(), 1);
        assert_eq!(f.dialogues[0].key.to_string(), "Dialogue/Intro/2/DialogueText");
        assert_eq!(f.dialogues[0].actor.as_deref(), Some("Ann"));
        assert_eq!(f.chapter, Some(1));
    }

    fn dialogue(title: &str, id: u32, chapter: Option<u32>, text: &str) -> TextRecord {
        TextRecord::new(StringKey::dialogue(title, id.to_string(), DialoguePart::DialogueText), text)
            .with_chapter(chapter)
    }

    #[test]
    fn fold_sorts_by_chapter_with_unresolved_last() {
        let mut set = ExtractionSet::default();
        set.absorb(FileExtraction {
            path: "none.json".into(),
            dialogues: vec![dialogue("Z", 1, None, "z1"), dialogue("Z", 2, None, "z2")],
            ..FileExtraction::default()
        });
        set.absorb(FileExtraction {
            path: "two.json".into(),
            chapter: Some(2),
            dialogues: vec![dialogue("B", 9, Some(2), "b9"), dialogue("B", 3, Some(2), "b3")],
            ..FileExtraction::default()
        });
        set.absorb(FileExtraction {
            path: "one.json".into(),
            chapter: Some(1),
            dialogues: vec![dialogue("A", 1, Some(1), "a1")],
            ..FileExtraction::default()
        });
        let ex = set.finish(Vec::new(), Vec::new());
        let order: Vec<&str> = ex.dialogues.iter().map(|r| r.original.as_str()).collect();
        assert_eq!(order, ["a1", "b9", "b3", "z1", "z2"]);
        assert_eq!(ex.unresolved_chapters, vec![PathBuf::from("none.json")]);
        assert_eq!(ex.files, 3);
    }

    #[test]
    fn duplicates_keep_first_position_and_last_value() {
        let mut set = ExtractionSet::default();
        set.absorb(FileExtraction {
            actors: vec![
                TextRecord::new(StringKey::actor("b"), "first b"),
                TextRecord::new(StringKey::actor("a"), "a"),
                TextRecord::new(StringKey::actor("b"), "second b"),
            ],
            dialogues: vec![
                dialogue("T", 1, Some(1), "old").with_actor(Some("Zed".into())),
                dialogue("T", 2, Some(1), "other").with_actor(Some("Amy".into())),
                dialogue("T", 1, Some(1), "new").with_actor(Some("Zed".into())),
            ],
            ..FileExtraction::default()
        });
        let ex = set.finish(Vec::new(), Vec::new());
        let actors: Vec<(String, &str)> =
            ex.actors.iter().map(|r| (r.key.to_string(), r.original.as_str())).collect();
        assert_eq!(
            actors,
            [("Actor/a".to_string(), "a"), ("Actor/b".to_string(), "second b")]
        );
        let lines: Vec<&str> = ex.dialogues.iter().map(|r| r.original.as_str()).collect();
        assert_eq!(lines, ["new", "other"]);
        assert_eq!(ex.vocabulary, ["Amy", "Zed"]);
    }

    #[test]
    fn extraction_is_deterministic() {
        let table = chapters();
        let tree = sample_tree();
        let a = extract_file(Path::new("a.json"), &tree, &opts(&table));
        let b = extract_file(Path::new("a.json"), &tree, &opts(&table));
        let keys = |f: &FileExtraction| f.dialogues.iter().map(|r| r.key.to_string()).collect::<Vec<_>>();
        assert_eq!(keys(&a), keys(&b));
    }
}
