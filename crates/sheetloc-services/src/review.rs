//! Language review of translated rows: grammar, spelling and punctuation.

use std::time::Duration;

use color_eyre::eyre::WrapErr;
use indexmap::IndexMap;
use serde_json::Value;
use sheetloc_config::TranslateSettings;

use crate::chat::ChatClient;
use crate::Result;

const ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(3);

pub trait Reviewer {
    fn name(&self) -> &'static str;

    /// Notes for the rows that read wrong, keyed like `rows`; clean rows are left out.
    fn review(&self, rows: &IndexMap<String, String>) -> Result<IndexMap<String, String>>;
}

/// Finds nothing. Used when no chat endpoint is configured.
#[derive(Debug, Default)]
pub struct PassthroughReviewer;

impl Reviewer for PassthroughReviewer {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn review(&self, _rows: &IndexMap<String, String>) -> Result<IndexMap<String, String>> {
        Ok(IndexMap::new())
    }
}

pub fn review_prompt(lang: &str) -> String {
    format!(
        "You will receive strings written in {lang} from the user, as a JSON object of key to string.\n\n\
         For each string, check for:\n \
         - Grammar and spelling correctness\n \
         - Appropriate punctuation\n \
         - Overall natural flow in {lang}\n\n\
         Only mention obvious errors and ignore the wider context. Markup tags, other languages and informal wording are normal.\n\n\
         Respond with a JSON object whose keys are the input keys and whose values describe the problem found. \
         Leave out every string that is correct. If nothing is wrong, return an empty JSON object.\n\n\
         Example input:\n\
         {{\n  \"Actors/John\": \"John\",\n  \"Dialogue/HighSchool/45/DialogueText\": \"I should of brought it with me...\",\n  \"System/ui/button/start\": \"New Gam\"\n}}\n\n\
         Example output:\n\
         {{\n  \"Dialogue/HighSchool/45/DialogueText\": \"'should of' is likely a mistake\",\n  \"System/ui/button/start\": \"typo in 'Game'\"\n}}"
    )
}

/// Notes from a reply object, limited to keys that were sent.
/// Anything other than a JSON object yields no notes.
pub fn parse_review(reply: &str, rows: &IndexMap<String, String>) -> IndexMap<String, String> {
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(reply) else {
        tracing::warn!(event = "review_unparsed", reply = %reply);
        return IndexMap::new();
    };
    map.into_iter()
        .filter(|(k, _)| rows.contains_key(k))
        .filter_map(|(k, v)| match v {
            Value::String(s) if !s.trim().is_empty() => Some((k, s)),
            Value::String(_) | Value::Null => None,
            other => Some((k, other.to_string())),
        })
        .collect()
}

/// Reviews through the translation chat endpoint, in the target language.
pub struct ChatReviewer {
    chat: ChatClient,
    lang: String,
}

impl ChatReviewer {
    pub fn from_settings(settings: &TranslateSettings) -> Result<Self> {
        Ok(Self {
            chat: ChatClient::from_settings(settings)?,
            lang: settings.lang_to.clone(),
        })
    }
}

impl Reviewer for ChatReviewer {
    fn name(&self) -> &'static str {
        "chat"
    }

    fn review(&self, rows: &IndexMap<String, String>) -> Result<IndexMap<String, String>> {
        if rows.is_empty() {
            return Ok(IndexMap::new());
        }
        let system = review_prompt(&self.lang);
        let user = serde_json::to_string_pretty(rows)?;
        let mut attempt = 1;
        let reply = loop {
            match self.chat.complete(&system, &user) {
                Ok(reply) => break reply,
                Err(e) if attempt < ATTEMPTS => {
                    tracing::warn!(event = "review_retry", attempt = attempt, max = ATTEMPTS, error = %e);
                    std::thread::sleep(RETRY_DELAY);
                    attempt += 1;
                }
                Err(e) => return Err(e).wrap_err_with(|| format!("review failed after {ATTEMPTS} attempts")),
            }
        };
        Ok(parse_review(&reply, rows))
    }
}
