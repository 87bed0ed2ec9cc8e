use std::fmt;

use serde::de::{Deserializer, Error as _, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use serde_json::Value as JsonValue;

// ---------------------------------------------------------------------------
// OperatorKind – the six comparison operators
// ---------------------------------------------------------------------------

/// Canonical comparison operator of a cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Lt,
    Le,
    Eq,
    Ne,
    Gt,
    Ge,
}

impl OperatorKind {
    /// Resolve a symbolic (`<`, `<=`, …) or mnemonic (`lt`, `le`, …) token.
    pub fn from_token(token: &str) -> Option<Self> {
        use OperatorKind::*;
        let op = match token.trim() {
            "<" | "lt" => Lt,
            "<=" | "le" => Le,
            "==" | "=" | "eq" => Eq,
            "!=" | "ne" => Ne,
            ">" | "gt" => Gt,
            ">=" | "ge" => Ge,
            _ => return None,
        };
        Some(op)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            OperatorKind::Lt => "<",
            OperatorKind::Le => "<=",
            OperatorKind::Eq => "==",
            OperatorKind::Ne => "!=",
            OperatorKind::Gt => ">",
            OperatorKind::Ge => ">=",
        }
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

// ---------------------------------------------------------------------------
// Literal – right-hand side of a cut
// ---------------------------------------------------------------------------

/// The literal a column is compared against.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Literal {
    /// Interpret a raw configuration value. Booleans count as `0`/`1`.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Number(n) => n
                .as_i64()
                .map(Literal::Int)
                .or_else(|| n.as_f64().map(Literal::Float)),
            JsonValue::String(s) => Some(Literal::Str(s.clone())),
            JsonValue::Bool(b) => Some(Literal::Int(i64::from(*b))),
            _ => None,
        }
    }

    fn to_json(&self) -> JsonValue {
        match self {
            Literal::Int(i) => JsonValue::from(*i),
            Literal::Float(f) => JsonValue::from(*f),
            Literal::Str(s) => JsonValue::from(s.as_str()),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(i) => write!(f, "{i}"),
            Literal::Float(v) => write!(f, "{v}"),
            Literal::Str(s) => write!(f, "\"{s}\""),
        }
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Literal::Int(v)
    }
}

impl From<i32> for Literal {
    fn from(v: i32) -> Self {
        Literal::Int(v.into())
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Literal::Float(v)
    }
}

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Literal::Str(v.to_string())
    }
}

impl From<String> for Literal {
    fn from(v: String) -> Self {
        Literal::Str(v)
    }
}

// ---------------------------------------------------------------------------
// SelectionGroup / SelectionConfig – uncompiled, as written by the user
// ---------------------------------------------------------------------------

/// One entry of the ordered selection list.
///
/// Well-formed groups hold exactly one `column → [operator, value]` entry;
/// the compiler rejects anything else. Entries keep document order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectionGroup {
    entries: Vec<(String, JsonValue)>,
}

impl SelectionGroup {
    /// A well-formed group holding a single cut.
    pub fn single(column: &str, operator: &str, value: impl Into<Literal>) -> Self {
        let raw = JsonValue::Array(vec![JsonValue::from(operator), value.into().to_json()]);
        SelectionGroup {
            entries: vec![(column.to_string(), raw)],
        }
    }

    /// A group made of arbitrary raw entries, well-formed or not.
    pub fn from_entries(entries: Vec<(String, JsonValue)>) -> Self {
        SelectionGroup { entries }
    }

    pub fn entries(&self) -> &[(String, JsonValue)] {
        &self.entries
    }
}

/// The parsed but uncompiled selection: an ordered list of single-cut groups.
///
/// Accepts two document shapes:
///
/// ```yaml
/// # ordered form, several cuts per column possible
/// - width: ['>', 0]
/// - width: ['<', 1]
/// # legacy form, at most one cut per column
/// width: ['>', 0]
/// length: [lt, 1]
/// ```
///
/// The legacy mapping is expanded into one group per entry at parse time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectionConfig {
    groups: Vec<SelectionGroup>,
}

impl SelectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single cut (builder style).
    pub fn with(mut self, column: &str, operator: &str, value: impl Into<Literal>) -> Self {
        self.groups.push(SelectionGroup::single(column, operator, value));
        self
    }

    pub fn from_groups(groups: Vec<SelectionGroup>) -> Self {
        SelectionConfig { groups }
    }

    /// Adapter for the legacy `column → [operator, value]` mapping.
    pub fn from_legacy<I, L>(cuts: I) -> Self
    where
        I: IntoIterator<Item = (String, String, L)>,
        L: Into<Literal>,
    {
        let groups = cuts
            .into_iter()
            .map(|(col, op, value)| SelectionGroup::single(&col, &op, value))
            .collect();
        SelectionConfig { groups }
    }

    pub fn groups(&self) -> &[SelectionGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

// -- Deserialization keeping mapping order (serde_json maps would sort) --

struct EntriesVisitor;

impl<'de> Visitor<'de> for EntriesVisitor {
    type Value = Vec<(String, JsonValue)>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a mapping of column name to [operator, value]")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut entries: Vec<(String, JsonValue)> = Vec::with_capacity(map.size_hint().unwrap_or(1));
        while let Some((key, value)) = map.next_entry::<String, JsonValue>()? {
            if entries.iter().any(|(seen, _)| *seen == key) {
                return Err(A::Error::custom(format!(
                    "duplicate column `{key}` in selection mapping"
                )));
            }
            entries.push((key, value));
        }
        Ok(entries)
    }
}

impl<'de> Deserialize<'de> for SelectionGroup {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = deserializer.deserialize_map(EntriesVisitor)?;
        Ok(SelectionGroup { entries })
    }
}

struct SelectionVisitor;

impl<'de> Visitor<'de> for SelectionVisitor {
    type Value = SelectionConfig;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a list of single-entry mappings or a legacy mapping of cuts")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut groups = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(group) = seq.next_element::<SelectionGroup>()? {
            groups.push(group);
        }
        Ok(SelectionConfig { groups })
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
        let entries = EntriesVisitor.visit_map(map)?;
        let groups = entries
            .into_iter()
            .map(|entry| SelectionGroup::from_entries(vec![entry]))
            .collect();
        Ok(SelectionConfig { groups })
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
        Ok(SelectionConfig::default())
    }
}

impl<'de> Deserialize<'de> for SelectionConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SelectionVisitor)
    }
}
