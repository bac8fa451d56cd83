//! A `$jsonSchema`-style validator covering the keywords collections use:
//! `bsonType`, `required`, `properties`, `minLength` and `minimum`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Type names accepted by the `bsonType` keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BsonType {
    Object,
    Array,
    String,
    Bool,
    Null,
    /// 32-bit integer.
    Int,
    /// 64-bit integer.
    Long,
    Double,
    /// Any numeric value.
    Number,
}

impl BsonType {
    fn matches(self, value: &Value) -> bool {
        match self {
            BsonType::Object => value.is_object(),
            BsonType::Array => value.is_array(),
            BsonType::String => value.is_string(),
            BsonType::Bool => value.is_boolean(),
            BsonType::Null => value.is_null(),
            BsonType::Int => value
                .as_i64()
                .is_some_and(|v| i32::try_from(v).is_ok()),
            BsonType::Long => value.is_i64() || value.is_u64(),
            BsonType::Double => value.is_f64(),
            BsonType::Number => value.is_number(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bson_type: Option<BsonType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, JsonSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl JsonSchema {
    pub fn of(bson_type: BsonType) -> Self {
        Self {
            bson_type: Some(bson_type),
            ..Self::default()
        }
    }

    pub fn object() -> Self {
        Self::of(BsonType::Object)
    }

    pub fn required<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn property(mut self, name: impl Into<String>, schema: JsonSchema) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    pub fn min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn minimum(mut self, min: f64) -> Self {
        self.minimum = Some(min);
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Check `value` against the schema. The error names the first failing
    /// path and rule.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        self.validate_at("$", value)
    }

    fn validate_at(&self, path: &str, value: &Value) -> Result<(), String> {
        if let Some(ty) = self.bson_type {
            if !ty.matches(value) {
                return Err(format!("{path} must be of bsonType {ty:?}"));
            }
        }

        if let (Some(min), Some(s)) = (self.min_length, value.as_str()) {
            if s.chars().count() < min {
                return Err(format!("{path} must have at least {min} character(s)"));
            }
        }

        if let (Some(min), Some(n)) = (self.minimum, value.as_f64()) {
            if n < min {
                return Err(format!("{path} must be >= {min}"));
            }
        }

        if let Some(obj) = value.as_object() {
            for field in &self.required {
                if !obj.contains_key(field) {
                    return Err(format!("{path}.{field} is required"));
                }
            }
            for (name, schema) in &self.properties {
                if let Some(child) = obj.get(name) {
                    schema.validate_at(&format!("{path}.{name}"), child)?;
                }
            }
        }

        Ok(())
    }
}
