//! Hierarchical string keys.
//!
//! Every localizable string is addressed by a slash-delimited key whose
//! first segment names its namespace. Keys are compared case-insensitively
//! against a store but always emitted in the case they were built with.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SheetLocError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DialoguePart {
    DialogueText,
    MenuText,
}

impl DialoguePart {
    pub fn as_str(self) -> &'static str {
        match self {
            DialoguePart::DialogueText => "DialogueText",
            DialoguePart::MenuText => "MenuText",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "DialogueText" => Some(DialoguePart::DialogueText),
            "MenuText" => Some(DialoguePart::MenuText),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StringKey {
    Actor(String),
    Quest(String),
    Dialogue {
        conversation: String,
        /// Exact decimal text of the entry id.
        entry: String,
        part: DialoguePart,
    },
    System(String),
}

impl StringKey {
    pub const ACTOR: &'static str = "Actor";
    pub const QUEST: &'static str = "Quest";
    pub const DIALOGUE: &'static str = "Dialogue";
    pub const SYSTEM: &'static str = "System";

    pub fn actor(name: impl Into<String>) -> Self {
        StringKey::Actor(name.into())
    }

    pub fn quest(name: impl Into<String>) -> Self {
        StringKey::Quest(name.into())
    }

    pub fn system(term: impl Into<String>) -> Self {
        StringKey::System(term.into())
    }

    pub fn dialogue(
        conversation: impl Into<String>,
        entry: impl Into<String>,
        part: DialoguePart,
    ) -> Self {
        StringKey::Dialogue {
            conversation: conversation.into(),
            entry: entry.into(),
            part,
        }
    }

    /// `Dialogue/<title>/<id>` without the part suffix.
    pub fn dialogue_base(conversation: &str, entry: &str) -> String {
        format!("{}/{conversation}/{entry}", Self::DIALOGUE)
    }

    pub fn namespace(&self) -> &'static str {
        match self {
            StringKey::Actor(_) => Self::ACTOR,
            StringKey::Quest(_) => Self::QUEST,
            StringKey::Dialogue { .. } => Self::DIALOGUE,
            StringKey::System(_) => Self::SYSTEM,
        }
    }

    /// Parse a rendered key back into its shape.
    ///
    /// Conversation titles may contain `/`, so a dialogue key is split from
    /// the right: the last segment is the part and the one before it the
    /// entry id.
    pub fn parse(s: &str) -> Result<Self, SheetLocError> {
        let invalid = || SheetLocError::InvalidKey(s.to_string());
        let (ns, rest) = s.split_once('/').ok_or_else(invalid)?;
        if rest.is_empty() {
            return Err(invalid());
        }
        match ns {
            Self::ACTOR => Ok(StringKey::Actor(rest.to_string())),
            Self::QUEST => Ok(StringKey::Quest(rest.to_string())),
            Self::SYSTEM => Ok(StringKey::System(rest.to_string())),
            Self::DIALOGUE => {
                let (head, part) = rest.rsplit_once('/').ok_or_else(invalid)?;
                let part = DialoguePart::parse(part).ok_or_else(invalid)?;
                let (conversation, entry) = head.rsplit_once('/').ok_or_else(invalid)?;
                if conversation.is_empty() || !is_entry_id(entry) {
                    return Err(invalid());
                }
                Ok(StringKey::dialogue(conversation, entry, part))
            }
            _ => Err(invalid()),
        }
    }

    pub fn eq_ignore_case(&self, other: &str) -> bool {
        self.to_string().to_lowercase() == other.to_lowercase()
    }
}

impl fmt::Display for StringKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StringKey::Actor(name) => write!(f, "{}/{name}", Self::ACTOR),
            StringKey::Quest(name) => write!(f, "{}/{name}", Self::QUEST),
            StringKey::System(term) => write!(f, "{}/{term}", Self::SYSTEM),
            StringKey::Dialogue {
                conversation,
                entry,
                part,
            } => write!(
                f,
                "{}/{}",
                Self::dialogue_base(conversation, entry),
                part.as_str()
            ),
        }
    }
}

impl FromStr for StringKey {
    type Err = SheetLocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StringKey::parse(s)
    }
}

/// Decimal integer text, optionally negative.
pub fn is_entry_id(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// How actor and quest keys are derived from a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyScheme {
    /// Keys from the plain `Name` field, speaker from the `Actor` field.
    #[default]
    NameField,
    /// Keys from the base-language display text, speaker from `Conversant`.
    DisplayText,
}

impl KeyScheme {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyScheme::NameField => "name-field",
            KeyScheme::DisplayText => "display-text",
        }
    }

    /// Title of the dialogue-entry field that holds the speaker's actor id.
    pub fn speaker_field(self) -> &'static str {
        match self {
            KeyScheme::NameField => "Actor",
            KeyScheme::DisplayText => "Conversant",
        }
    }
}

impl FromStr for KeyScheme {
    type Err = SheetLocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name-field" | "name" => Ok(KeyScheme::NameField),
            "display-text" | "display" => Ok(KeyScheme::DisplayText),
            _ => Err(SheetLocError::UnknownKeyScheme(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_slash_form() {
        assert_eq!(StringKey::actor("Grace").to_string(), "Actor/Grace");
        assert_eq!(StringKey::quest("FindKey").to_string(), "Quest/FindKey");
        assert_eq!(StringKey::system("Menu/Start").to_string(), "System/Menu/Start");
        assert_eq!(
            StringKey::dialogue("Intro", "12", DialoguePart::MenuText).to_string(),
            "Dialogue/Intro/12/MenuText"
        );
        assert_eq!(StringKey::dialogue_base("Intro", "12"), "Dialogue/Intro/12");
    }

    #[test]
    fn parse_splits_dialogue_from_the_right() {
        let key = StringKey::parse("Dialogue/Act 1/Cellar/12345678901234567890/DialogueText")
            .unwrap();
        assert_eq!(
            key,
            StringKey::dialogue(
                "Act 1/Cellar",
                "12345678901234567890",
                DialoguePart::DialogueText
            )
        );
        assert_eq!(
            key.to_string(),
            "Dialogue/Act 1/Cellar/12345678901234567890/DialogueText"
        );
    }

    #[test]
    fn parse_rejects_malformed_keys() {
        for bad in [
            "Actor",
            "Actor/",
            "Npc/Grace",
            "Dialogue/Intro/abc/DialogueText",
            "Dialogue/Intro/3/Body",
            "Dialogue/3/DialogueText",
        ] {
            assert!(StringKey::parse(bad).is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn case_insensitive_comparison_keeps_case() {
        let key = StringKey::actor("Grace");
        assert!(key.eq_ignore_case("actor/GRACE"));
        assert_eq!(key.to_string(), "Actor/Grace");
    }

    #[test]
    fn key_scheme_parses_config_values() {
        assert_eq!("display-text".parse::<KeyScheme>().unwrap(), KeyScheme::DisplayText);
        assert_eq!("Name-Field".parse::<KeyScheme>().unwrap(), KeyScheme::NameField);
        assert!("other".parse::<KeyScheme>().is_err());
        assert_eq!(KeyScheme::default().speaker_field(), "Actor");
    }
}
