use crate::error::RankError;
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;

pub const ID_FIELD: &str = "id";

/// A schema-less record: field name to JSON value.
///
/// Values may be plain strings, localized objects (`{"en": "...", "fr": "..."}`)
/// or arrays of either, nested to any depth.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Entity {
    fields: Map<String, Value>,
}

impl Entity {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn id(&self) -> Option<&Value> {
        self.fields.get(ID_FIELD).filter(|v| !v.is_null())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl From<Map<String, Value>> for Entity {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}

impl TryFrom<Value> for Entity {
    type Error = Value;

    fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self::new(map)),
            other => Err(other),
        }
    }
}

/// Field names searched for every candidate in one ranking call.
///
/// Every text-bearing key counts, a string `id` included. Derived from the
/// first candidate only and applied to the rest unchecked;
/// callers with mixed shapes should rank each shape separately.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchableFieldSet {
    fields: Vec<String>,
}

impl SearchableFieldSet {
    pub fn from_first(entities: &[Entity]) -> Self {
        let Some(first) = entities.first() else {
            return Self::default();
        };
        let fields = first
            .fields()
            .iter()
            .filter(|(_, value)| carries_text(value))
            .map(|(name, _)| name.clone())
            .collect();
        Self { fields }
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn carries_text(value: &Value) -> bool {
    match value {
        Value::String(_) => true,
        Value::Array(items) => items.iter().any(carries_text),
        Value::Object(map) => map.values().any(carries_text),
        _ => false,
    }
}

/// Parses a JSON array of records.
pub fn parse_entities(json: &str) -> Result<Vec<Entity>> {
    let raw: Vec<Value> = serde_json::from_str(json).context("entities must be a JSON array")?;
    raw.into_iter()
        .enumerate()
        .map(|(index, value)| {
            Entity::try_from(value)
                .map_err(|_| anyhow::Error::from(RankError::NotAnObject { index }))
        })
        .collect()
}

pub fn load_entities(path: &Path) -> Result<Vec<Entity>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read entities from {}", path.display()))?;
    parse_entities(&json)
}
