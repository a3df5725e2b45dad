//! Machine translation of staged dialogue, one conversation block at a time.

use std::collections::{BTreeMap, HashSet};

use color_eyre::eyre::{bail, WrapErr};
use indexmap::IndexMap;
use serde::Serialize;
use sheetloc_config::{Settings, TranslateSettings};
use sheetloc_core::key::is_entry_id;
use sheetloc_core::{DialoguePart, Field, RecordPatch, Table};
use sheetloc_domain::{TranslateSummary, SCHEMA_VERSION};
use sheetloc_store::{Snapshot, TabularStore};

use crate::chat::ChatClient;
use crate::{Result, Throttle};

/// `*` for everything, `prefix*` for a prefix, anything else an exact key.
pub fn matches_filter(key: &str, filter: &str) -> bool {
    if filter == "*" {
        return true;
    }
    match filter.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => key == filter,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockLine {
    #[serde(skip)]
    pub key: String,
    pub actor: String,
    pub text: String,
}

/// Consecutive lines of one conversation, ordered by entry id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub path: String,
    pub lines: Vec<BlockLine>,
}

/// `Dialogue/Intro/12/DialogueText` -> (`Dialogue/Intro`, 12)
fn block_position(key: &str) -> Option<(&str, i128)> {
    let rest = key.strip_suffix(DialoguePart::DialogueText.as_str())?.strip_suffix('/')?;
    let (path, id) = rest.rsplit_once('/')?;
    if !is_entry_id(id) {
        return None;
    }
    Some((path, id.parse().ok()?))
}

/// Untranslated (or, with `force`, all) dialogue text rows matching `filter`, grouped.
pub fn group_blocks(dialogues: &Snapshot, filter: &str, force: bool) -> Vec<Block> {
    let shape = dialogues.shape();
    let mut blocks: IndexMap<&str, BTreeMap<i128, BlockLine>> = IndexMap::new();
    for (key, row) in dialogues.iter() {
        if !matches_filter(key, filter) {
            continue;
        }
        if !force && !row.get(shape, Field::Translated).is_empty() {
            continue;
        }
        let Some((path, id)) = block_position(key) else {
            continue;
        };
        blocks.entry(path).or_default().insert(
            id,
            BlockLine {
                key: key.to_string(),
                actor: row.get(shape, Field::Actor).to_string(),
                text: row.get(shape, Field::Original).to_string(),
            },
        );
    }
    blocks
        .into_iter()
        .map(|(path, lines)| Block {
            path: path.to_string(),
            lines: lines.into_values().collect(),
        })
        .collect()
}

/// Vocabulary table as term -> gloss, skipping terms nobody has glossed yet.
pub fn vocabulary(snapshot: &Snapshot) -> IndexMap<String, String> {
    let shape = snapshot.shape();
    snapshot
        .iter()
        .map(|(k, row)| (k, row.get(shape, Field::Value)))
        .filter(|(_, gloss)| !gloss.is_empty())
        .map(|(k, gloss)| (k.to_string(), gloss.to_string()))
        .collect()
}

/// Everything a translator sees for one block.
#[derive(Debug, Clone)]
pub struct BlockRequest<'a> {
    pub path: &'a str,
    pub lines: &'a [BlockLine],
    pub chars: Vec<(&'a str, &'a str)>,
    pub terms: Vec<(&'a str, &'a str)>,
    pub context: Option<&'a str>,
    pub lang_from: &'a str,
    pub lang_to: &'a str,
}

impl<'a> BlockRequest<'a> {
    /// Character entries for block speakers or names in the text; term entries found in the text.
    pub fn new(
        block: &'a Block,
        chars: &'a IndexMap<String, String>,
        terms: &'a IndexMap<String, String>,
        lang_from: &'a str,
        lang_to: &'a str,
    ) -> Self {
        let text = block
            .lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let speakers: HashSet<&str> = block.lines.iter().map(|l| l.actor.as_str()).collect();
        let chars = chars
            .iter()
            .filter(|(term, _)| speakers.contains(term.as_str()) || text.contains(term.as_str()))
            .map(|(t, g)| (t.as_str(), g.as_str()))
            .collect();
        let terms = terms
            .iter()
            .filter(|(term, _)| text.contains(term.as_str()))
            .map(|(t, g)| (t.as_str(), g.as_str()))
            .collect();
        Self {
            path: &block.path,
            lines: &block.lines,
            chars,
            terms,
            context: None,
            lang_from,
            lang_to,
        }
    }

    pub fn with_context(mut self, context: Option<&'a str>) -> Self {
        self.context = context.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn system_prompt(&self) -> String {
        let mut prompt = format!(
            "You are translating a game script from {} to {}. You will get a user message with a JSON array of dialogue lines.\n\n",
            self.lang_from, self.lang_to
        );
        if !self.chars.is_empty() {
            prompt.push_str("Names vocabulary (characters, locations, etc):\n");
            for (t, g) in &self.chars {
                prompt.push_str(&format!("{t} - {g}\n"));
            }
            prompt.push('\n');
        }
        if !self.terms.is_empty() {
            prompt.push_str("General vocabulary (everything else):\n");
            for (t, g) in &self.terms {
                prompt.push_str(&format!("{t} - {g}\n"));
            }
            prompt.push('\n');
        }
        if let Some(ctx) = self.context {
            prompt.push_str(&format!("Context:\n{ctx}\n\n"));
        }
        prompt.push_str(
            "Translation rules:\n\
             1. If vocabularies and context are provided, they must be used in the translation.\n\
             2. Keep the tone and style consistent with the original.\n\
             3. Do not add or remove any dialogue lines.\n\
             4. Keep any tags in the translated text intact (e.g. <color=#B1F9FF>).\n\
             5. Keep \\t escapes and placeholders such as {name} or %s as they are.\n\n\
             Return only a JSON array of translated strings, one per input line, in the original order.",
        );
        prompt
    }
}

pub trait Translator {
    fn name(&self) -> &'static str;

    /// One translation per line, in order.
    fn translate_block(&self, request: &BlockRequest<'_>) -> Result<Vec<String>>;
}

/// Returns the originals. Used for dry runs.
#[derive(Debug, Default)]
pub struct PassthroughTranslator;

impl Translator for PassthroughTranslator {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn translate_block(&self, request: &BlockRequest<'_>) -> Result<Vec<String>> {
        Ok(request.lines.iter().map(|l| l.text.clone()).collect())
    }
}

/// Translates through an OpenAI-compatible chat endpoint.
pub struct ChatTranslator {
    chat: ChatClient,
}

impl ChatTranslator {
    pub fn from_settings(settings: &TranslateSettings) -> Result<Self> {
        Ok(Self {
            chat: ChatClient::from_settings(settings)?,
        })
    }
}

impl Translator for ChatTranslator {
    fn name(&self) -> &'static str {
        "chat"
    }

    fn translate_block(&self, request: &BlockRequest<'_>) -> Result<Vec<String>> {
        let user = serde_json::to_string_pretty(request.lines)?;
        let reply = self.chat.complete(&request.system_prompt(), &user)?;
        let lines: Vec<String> = serde_json::from_str(&reply).wrap_err("reply is not a JSON array of strings")?;
        Ok(lines)
    }
}

#[derive(Debug, Clone)]
pub struct TranslateOptions<'a> {
    pub filter: &'a str,
    pub force: bool,
    pub context: Option<&'a str>,
    pub dry_run: bool,
}

pub fn run_translate(
    settings: &Settings,
    store: &dyn TabularStore,
    translator: &dyn Translator,
    opts: &TranslateOptions<'_>,
) -> Result<TranslateSummary> {
    let chars = vocabulary(&store.get(&Table::chars())?);
    let terms = vocabulary(&store.get(&Table::terms())?);
    let dialogues = store.get(&Table::Dialogues)?;
    let blocks = group_blocks(&dialogues, opts.filter, opts.force);
    let candidates: usize = blocks.iter().map(|b| b.lines.len()).sum();
    tracing::info!(
        event = "translate_planned",
        filter = opts.filter,
        force = opts.force,
        translator = translator.name(),
        chars = chars.len(),
        terms = terms.len(),
        blocks = blocks.len(),
        candidates = candidates,
    );

    let mut summary = TranslateSummary {
        schema_version: SCHEMA_VERSION,
        filter: opts.filter.to_string(),
        force: opts.force,
        dry_run: opts.dry_run,
        candidates,
        blocks: blocks.len(),
        ..TranslateSummary::default()
    };
    if blocks.is_empty() {
        tracing::warn!(event = "translate_nothing_to_do", filter = opts.filter, force = opts.force);
        return Ok(summary);
    }

    let mut throttle = Throttle::new(settings.store.cooldown);
    for (i, block) in blocks.iter().enumerate() {
        let request = BlockRequest::new(
            block,
            &chars,
            &terms,
            &settings.translate.lang_from,
            &settings.translate.lang_to,
        )
        .with_context(opts.context);
        tracing::info!(event = "translate_block", n = i + 1, of = blocks.len(), block = %block.path, lines = block.lines.len());
        match translate_one(settings, store, translator, &request, opts.dry_run, &mut throttle) {
            Ok(()) => {
                summary.translated_blocks += 1;
                summary.translated_rows += block.lines.len();
            }
            Err(err) => {
                tracing::error!(event = "translate_block_failed", block = %block.path, error = %format!("{err:#}"));
                summary.failed_blocks.push(block.path.clone());
            }
        }
    }
    tracing::info!(
        event = "translate_finished",
        translated_blocks = summary.translated_blocks,
        translated_rows = summary.translated_rows,
        failed_blocks = summary.failed_blocks.len(),
    );
    Ok(summary)
}

fn translate_one(
    settings: &Settings,
    store: &dyn TabularStore,
    translator: &dyn Translator,
    request: &BlockRequest<'_>,
    dry_run: bool,
    throttle: &mut Throttle,
) -> Result<()> {
    let out = translator.translate_block(request)?;
    if out.len() != request.lines.len() {
        bail!("expected {} translations, got {}", request.lines.len(), out.len());
    }
    if dry_run {
        return Ok(());
    }
    let updates: IndexMap<String, RecordPatch> = request
        .lines
        .iter()
        .zip(out)
        .map(|(line, text)| (line.key.clone(), RecordPatch::translated(text)))
        .collect();
    let keys: Vec<String> = updates.keys().cloned().collect();
    throttle.before_write("dialogues");
    store.replace(&Table::Dialogues, &updates)?;
    store.mark(&Table::Dialogues, &keys, &settings.translate.mark_color, Field::Translated)?;
    Ok(())
}
