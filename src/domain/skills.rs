//! Freelancer skills.
//!
//! Clients have sent skills as a JSON object, a JSON array, or a string
//! holding either of those. Everything is normalized here into one ordered
//! list of key/value pairs before it reaches the store.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed skills: {0}")]
pub struct SkillsError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Skills(Vec<Skill>);

impl Skills {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Skill> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|skill| skill.key == key)
            .map(|skill| skill.value.as_str())
    }

    /// Set `key` to `value`, keeping the position of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|skill| skill.key == key) {
            Some(existing) => existing.value = value,
            None => self.0.push(Skill { key, value }),
        }
    }

    pub fn from_text(text: &str) -> Result<Self, SkillsError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Self::new());
        }
        let value: Value =
            serde_json::from_str(trimmed).map_err(|e| SkillsError(format!("invalid JSON: {e}")))?;
        if value.is_string() {
            return Err(SkillsError("expected an object or a list".to_string()));
        }
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, SkillsError> {
        let mut skills = Self::new();
        match value {
            Value::Null => {}
            Value::String(text) => return Self::from_text(text),
            Value::Object(entries) => {
                for (key, value) in entries {
                    skills.insert(key.clone(), scalar_text(value));
                }
            }
            Value::Array(items) => {
                for item in items {
                    let (key, value) = array_item(item)?;
                    skills.insert(key, value);
                }
            }
            other => {
                return Err(SkillsError(format!("expected an object or a list, got {other}")));
            }
        }
        Ok(skills)
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn array_item(item: &Value) -> Result<(String, String), SkillsError> {
    match item {
        Value::String(name) => Ok((name.clone(), String::new())),
        Value::Object(entry) => match (entry.get("key"), entry.get("value")) {
            (Some(Value::String(key)), value) => {
                Ok((key.clone(), value.map(scalar_text).unwrap_or_default()))
            }
            _ => Err(SkillsError(format!("list entry {item} has no `key`"))),
        },
        Value::Array(pair) => match pair.as_slice() {
            [Value::String(key), value] => Ok((key.clone(), scalar_text(value))),
            _ => Err(SkillsError(format!("list entry {item} is not a [key, value] pair"))),
        },
        other => Err(SkillsError(format!("unsupported list entry {other}"))),
    }
}

impl<'de> Deserialize<'de> for Skills {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Skills::from_value(&value).map_err(serde::de::Error::custom)
    }
}
