use std::fmt;

use serde::{Deserialize, Serialize};

/// Column layout of a store table. Column 0 is always the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shape {
    /// `key, value`
    KeyValue,
    /// `key, original, translated`
    Translatable,
    /// `key, actor, original, translated`
    Dialogue,
}

impl Shape {
    pub fn width(self) -> usize {
        match self {
            Shape::KeyValue => 2,
            Shape::Translatable => 3,
            Shape::Dialogue => 4,
        }
    }

    /// 0-based column of `field`, if this shape has it.
    pub fn column(self, field: Field) -> Option<usize> {
        match (self, field) {
            (Shape::KeyValue, Field::Value) => Some(1),
            (Shape::Translatable, Field::Original) => Some(1),
            (Shape::Translatable, Field::Translated) => Some(2),
            (Shape::Dialogue, Field::Actor) => Some(1),
            (Shape::Dialogue, Field::Original) => Some(2),
            (Shape::Dialogue, Field::Translated) => Some(3),
            _ => None,
        }
    }

    /// Non-key fields in column order.
    pub fn fields(self) -> &'static [Field] {
        match self {
            Shape::KeyValue => &[Field::Value],
            Shape::Translatable => &[Field::Original, Field::Translated],
            Shape::Dialogue => &[Field::Actor, Field::Original, Field::Translated],
        }
    }

    pub fn header(self) -> &'static [&'static str] {
        match self {
            Shape::KeyValue => &["key", "value"],
            Shape::Translatable => &["key", "original", "translated"],
            Shape::Dialogue => &["key", "actor", "original", "translated"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Value,
    Actor,
    Original,
    Translated,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Value => "value",
            Field::Actor => "actor",
            Field::Original => "original",
            Field::Translated => "translated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Table {
    Actors,
    Quests,
    System,
    Dialogues,
    Strings,
    Vocab(String),
}

impl Table {
    pub const CHARS: &'static str = "Chars";
    pub const TERMS: &'static str = "Terms";

    pub fn shape(&self) -> Shape {
        match self {
            Table::Actors | Table::Quests | Table::System => Shape::Translatable,
            Table::Dialogues => Shape::Dialogue,
            Table::Strings | Table::Vocab(_) => Shape::KeyValue,
        }
    }

    pub fn chars() -> Self {
        Table::Vocab(Self::CHARS.to_string())
    }

    pub fn terms() -> Self {
        Table::Vocab(Self::TERMS.to_string())
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Table::Actors => f.write_str("actors"),
            Table::Quests => f.write_str("quests"),
            Table::System => f.write_str("system"),
            Table::Dialogues => f.write_str("dialogues"),
            Table::Strings => f.write_str("strings"),
            Table::Vocab(name) => write!(f, "vocab:{name}"),
        }
    }
}

/// Partial field set for one key.
///
/// `None` leaves the stored cell untouched, `Some("")` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated: Option<String>,
}

impl RecordPatch {
    pub fn value(v: impl Into<String>) -> Self {
        Self {
            value: Some(v.into()),
            ..Self::default()
        }
    }

    pub fn original(v: impl Into<String>) -> Self {
        Self {
            original: Some(v.into()),
            ..Self::default()
        }
    }

    pub fn translated(v: impl Into<String>) -> Self {
        Self {
            translated: Some(v.into()),
            ..Self::default()
        }
    }

    pub fn with_actor(mut self, actor: Option<String>) -> Self {
        self.actor = actor;
        self
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        match field {
            Field::Value => self.value.as_deref(),
            Field::Actor => self.actor.as_deref(),
            Field::Original => self.original.as_deref(),
            Field::Translated => self.translated.as_deref(),
        }
    }

    pub fn set(&mut self, field: Field, v: Option<String>) {
        let slot = match field {
            Field::Value => &mut self.value,
            Field::Actor => &mut self.actor,
            Field::Original => &mut self.original,
            Field::Translated => &mut self.translated,
        };
        *slot = v;
    }

    /// True when no field is present.
    pub fn is_blank(&self) -> bool {
        self.value.is_none()
            && self.actor.is_none()
            && self.original.is_none()
            && self.translated.is_none()
    }

    /// Present fields of `later` override this patch.
    pub fn overlay(&mut self, later: RecordPatch) {
        for field in [Field::Value, Field::Actor, Field::Original, Field::Translated] {
            if let Some(v) = later.get(field) {
                self.set(field, Some(v.to_string()));
            }
        }
    }

    /// Full sheet row for an append. Absent fields become empty cells.
    pub fn to_row(&self, key: &str, shape: Shape) -> Vec<String> {
        let mut row = Vec::with_capacity(shape.width());
        row.push(key.to_string());
        for field in shape.fields() {
            row.push(self.get(*field).unwrap_or_default().to_string());
        }
        row
    }
}
