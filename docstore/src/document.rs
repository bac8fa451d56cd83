use std::fmt;
use std::str::FromStr;

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::DocStoreError;

/// Name of the identifier field carried by every stored document.
pub const ID_FIELD: &str = "_id";

/// A stored document: a JSON object whose key order is preserved.
pub type Document = Map<String, Value>;

/// Store-assigned document identifier, rendered as 32 lowercase hex chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for DocumentId {
    type Err = DocStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.len() != 32 || !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DocStoreError::InvalidId(s.to_string()));
        }
        Uuid::parse_str(trimmed)
            .map(Self)
            .map_err(|_| DocStoreError::InvalidId(s.to_string()))
    }
}

impl Serialize for DocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Serialize a value into a [`Document`]. Fails unless it serializes to an object.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, DocStoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(DocStoreError::NotAnObject),
    }
}

/// Deserialize a [`Document`] into a typed value.
pub fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T, DocStoreError> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

/// Rebuild a stored document with `_id` as its first field.
pub(crate) fn with_id(id: &str, body: Document) -> Document {
    let mut doc = Document::with_capacity(body.len() + 1);
    doc.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    doc.extend(body.into_iter().filter(|(k, _)| k != ID_FIELD));
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn id_display_parse_roundtrip() {
        let id = DocumentId::new();
        let text = id.to_string();
        assert_eq!(text.len(), 32);
        assert_eq!(text.parse::<DocumentId>().unwrap(), id);
    }

    #[test]
    fn id_rejects_malformed_input() {
        assert!(matches!(
            "not-an-id".parse::<DocumentId>(),
            Err(DocStoreError::InvalidId(_))
        ));
        assert!("123".parse::<DocumentId>().is_err());
        // hyphenated uuids are not the canonical form
        assert!("67e55044-10b1-426f-9247-bb680e5fe0c8"
            .parse::<DocumentId>()
            .is_err());
    }

    #[test]
    fn to_document_requires_object() {
        assert!(to_document(&json!({"a": 1})).is_ok());
        assert!(matches!(
            to_document(&json!([1, 2])),
            Err(DocStoreError::NotAnObject)
        ));
    }

    #[test]
    fn with_id_puts_id_first() {
        let body = to_document(&json!({"title": "Dune", "_id": "stale"})).unwrap();
        let doc = with_id("abc", body);
        let keys: Vec<&str> = doc.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["_id", "title"]);
        assert_eq!(doc["_id"], "abc");
    }
}
