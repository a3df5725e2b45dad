//! Field access on tree nodes.
//!
//! Actors, items, conversations and dialogue entries all carry a `fields`
//! array of `{ title, type, value }` objects. Type `0` is a plain field and
//! type `4` a localized string field.

use serde_json::Value;

use crate::tree::value_text;

pub const PLAIN: u64 = 0;
pub const LOCALIZED: u64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Plain,
    Localized,
    /// Plain or localized.
    Text,
    /// No type constraint.
    Any,
}

impl FieldKind {
    fn accepts(self, field: &Value) -> bool {
        let ty = field.get("type").and_then(Value::as_u64);
        match self {
            FieldKind::Plain => ty == Some(PLAIN),
            FieldKind::Localized => ty == Some(LOCALIZED),
            FieldKind::Text => matches!(ty, Some(PLAIN) | Some(LOCALIZED)),
            FieldKind::Any => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleMatch {
    Exact,
    IgnoreCase,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldQuery<'a> {
    pub kind: FieldKind,
    pub title: &'a str,
    pub title_match: TitleMatch,
}

impl<'a> FieldQuery<'a> {
    pub fn new(kind: FieldKind, title: &'a str) -> Self {
        Self {
            kind,
            title,
            title_match: TitleMatch::Exact,
        }
    }

    pub fn plain(title: &'a str) -> Self {
        Self::new(FieldKind::Plain, title)
    }

    pub fn localized(title: &'a str) -> Self {
        Self::new(FieldKind::Localized, title)
    }

    pub fn text(title: &'a str) -> Self {
        Self::new(FieldKind::Text, title)
    }

    pub fn any(title: &'a str) -> Self {
        Self::new(FieldKind::Any, title)
    }

    pub fn ignore_case(mut self) -> Self {
        self.title_match = TitleMatch::IgnoreCase;
        self
    }

    pub fn matches(&self, field: &Value) -> bool {
        if !self.kind.accepts(field) {
            return false;
        }
        let Some(title) = field.get("title").and_then(Value::as_str) else {
            return false;
        };
        match self.title_match {
            TitleMatch::Exact => title == self.title,
            TitleMatch::IgnoreCase => title.to_lowercase() == self.title.to_lowercase(),
        }
    }
}

/// First-match lookup over a node's `fields` array.
pub trait FieldLookup {
    fn fields(&self) -> &[Value];

    fn find_field(&self, pred: impl Fn(&Value) -> bool) -> Option<&Value> {
        self.fields().iter().find(|f| pred(f))
    }

    fn field(&self, query: FieldQuery<'_>) -> Option<&Value> {
        self.find_field(|f| query.matches(f))
    }

    /// Field value as text, if the field exists and holds a scalar.
    fn field_text(&self, query: FieldQuery<'_>) -> Option<String> {
        self.field(query)
            .and_then(|f| f.get("value"))
            .and_then(value_text)
    }
}

pub trait FieldLookupMut {
    /// The first matching field object. Write through `field["value"]`.
    fn field_mut(&mut self, query: FieldQuery<'_>) -> Option<&mut Value>;
}

impl FieldLookup for Value {
    fn fields(&self) -> &[Value] {
        self.get("fields")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl FieldLookupMut for Value {
    fn field_mut(&mut self, query: FieldQuery<'_>) -> Option<&mut Value> {
        self.get_mut("fields")?
            .as_array_mut()?
            .iter_mut()
            .find(|f| query.matches(f))
    }
}

/// Elements of an array member, empty when absent.
pub fn members<'v>(node: &'v Value, name: &str) -> &'v [Value] {
    node.get(name)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node() -> Value {
        json!({
            "fields": [
                { "title": "Name", "type": 0, "value": "grace" },
                { "title": "Display Name en", "type": 0, "value": "Grace (plain)" },
                { "title": "Display Name en", "type": 4, "value": "<b>Grace</b>" },
                { "title": "Title", "type": 0, "value": "Intro" },
                { "title": "Actor", "type": 5, "value": 12 }
            ]
        })
    }

    #[test]
    fn type_and_title_must_both_match() {
        let n = node();
        assert_eq!(n.field_text(FieldQuery::localized("Display Name en")).as_deref(), Some("<b>Grace</b>"));
        assert_eq!(n.field_text(FieldQuery::plain("Display Name en")).as_deref(), Some("Grace (plain)"));
        assert_eq!(n.field_text(FieldQuery::text("Display Name en")).as_deref(), Some("Grace (plain)"));
        assert!(n.field(FieldQuery::localized("Name")).is_none());
        assert!(n.field(FieldQuery::text("Actor")).is_none());
        assert_eq!(n.field_text(FieldQuery::any("Actor")).as_deref(), Some("12"));
    }

    #[test]
    fn title_case_folding_is_opt_in() {
        let n = node();
        assert!(n.field(FieldQuery::plain("title")).is_none());
        assert_eq!(n.field_text(FieldQuery::plain("title").ignore_case()).as_deref(), Some("Intro"));
    }

    #[test]
    fn mutable_lookup_targets_first_match() {
        let mut n = node();
        n.field_mut(FieldQuery::localized("Display Name en")).unwrap()["value"] = json!("Грейс");
        assert_eq!(n["fields"][2]["value"], "Грейс");
        assert_eq!(n["fields"][1]["value"], "Grace (plain)");
        assert!(n.field_mut(FieldQuery::localized("Display Name ru")).is_none());
    }

    #[test]
    fn nodes_without_fields_are_empty() {
        let n = json!({ "id": 1 });
        assert!(n.fields().is_empty());
        assert!(members(&n, "actors").is_empty());
    }
}
