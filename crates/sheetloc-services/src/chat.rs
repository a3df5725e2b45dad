//! OpenAI-compatible `/chat/completions` client shared by translation and review.

use std::time::Duration;

use color_eyre::eyre::{bail, eyre};
use reqwest::blocking::Client;
use serde_json::{json, Value};
use sheetloc_config::TranslateSettings;

use crate::Result;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

pub struct ChatClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    pub fn from_settings(settings: &TranslateSettings) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| eyre!("OPENAI_API_KEY is not set"))?;
        let model = settings
            .model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| eyre!("OPENAI_MODEL is not set"))?;
        let endpoint = settings
            .endpoint
            .clone()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            model,
        })
    }

    /// One system + user exchange; returns the reply text without code fences.
    pub fn complete(&self, system: &str, user: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });
        let url = format!("{}/chat/completions", self.endpoint);
        let resp = self.client.post(&url).bearer_auth(&self.api_key).json(&body).send()?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            bail!("chat endpoint returned {status}: {text}");
        }
        let reply: Value = resp.json()?;
        let content = reply["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| eyre!("reply has no message content"))?;
        Ok(strip_fences(content))
    }
}

/// Drop Markdown code fences around a reply.
pub fn strip_fences(reply: &str) -> String {
    reply
        .replace("```json\n", "")
        .replace("```\n", "")
        .replace("```", "")
        .trim()
        .to_string()
}
