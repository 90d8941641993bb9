//! Resource records

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ops::{Deref, DerefMut};

/// Identifier fields tried after the definition's own id field
const FALLBACK_ID_FIELDS: &[&str] = &["id", "_id"];

/// One backend record, kept as an opaque JSON object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resource(pub Map<String, Value>);

impl Resource {
    /// Wrap a JSON value; `None` unless it is an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Stable identifier, trying `id_field` then `id` then `_id`
    pub fn id(&self, id_field: &str) -> Option<String> {
        std::iter::once(id_field)
            .chain(FALLBACK_ID_FIELDS.iter().copied())
            .find_map(|field| match self.0.get(field)? {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    }

    pub fn has_id(&self, id_field: &str, id: &str) -> bool {
        self.id(id_field).as_deref() == Some(id)
    }

    /// Value at a dot-notation path (`customer.name`, `items.0.sku`)
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.0.get(parts.next()?)?;

        for part in parts {
            current = match part.parse::<usize>() {
                Ok(idx) if current.is_array() => current.get(idx)?,
                _ => current.get(part)?,
            };
        }

        Some(current)
    }

    /// Display string at a path, `None` for missing or null
    pub fn field_str(&self, path: &str) -> Option<String> {
        self.get_path(path).and_then(value_to_string)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl Deref for Resource {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Resource {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Render a scalar JSON value as text; nested values become compact JSON
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}
