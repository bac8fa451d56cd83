//! Query building blocks: equality filters, sort, limit and projection.

use serde_json::Value;

use crate::document::{Document, ID_FIELD};
use crate::DocumentId;

/// A value bound into a generated SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Bind {
    Text(String),
    Int(i64),
    Real(f64),
}

/// JSON path for a top-level field, quoted so non-ASCII names work.
pub(crate) fn json_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', ""))
}

/// Conjunction of exact field equalities. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: DocumentId) -> Self {
        Self::new().eq(ID_FIELD, id.to_string())
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((field.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Append ` AND ...` conditions for every clause.
    pub(crate) fn push_sql(&self, sql: &mut String, binds: &mut Vec<Bind>) {
        for (field, value) in &self.clauses {
            if field == ID_FIELD {
                sql.push_str(" AND id = ?");
                binds.push(Bind::Text(match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                }));
                continue;
            }

            let path = Bind::Text(json_path(field));
            match value {
                Value::Null => {
                    sql.push_str(" AND json_extract(body, ?) IS NULL");
                    binds.push(path);
                }
                Value::Bool(b) => {
                    sql.push_str(" AND json_type(body, ?) = ?");
                    binds.push(path);
                    binds.push(Bind::Text(if *b { "true" } else { "false" }.to_string()));
                }
                Value::Number(n) => {
                    sql.push_str(" AND json_extract(body, ?) = ?");
                    binds.push(path);
                    binds.push(match n.as_i64() {
                        Some(i) => Bind::Int(i),
                        None => Bind::Real(n.as_f64().unwrap_or(f64::NAN)),
                    });
                }
                Value::String(s) => {
                    sql.push_str(" AND json_type(body, ?) = 'text' AND json_extract(body, ?) = ?");
                    binds.push(path.clone());
                    binds.push(path);
                    binds.push(Bind::Text(s.clone()));
                }
                Value::Array(_) | Value::Object(_) => {
                    sql.push_str(" AND json_extract(body, ?) = json(?)");
                    binds.push(path);
                    binds.push(Bind::Text(value.to_string()));
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// Inclusion projection. `_id` is kept unless [`Projection::without_id`] is used.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    fields: Vec<String>,
    include_id: bool,
}

impl Projection {
    pub fn include<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            include_id: true,
        }
    }

    pub fn without_id(mut self) -> Self {
        self.include_id = false;
        self
    }

    pub(crate) fn apply(&self, doc: Document) -> Document {
        doc.into_iter()
            .filter(|(key, _)| {
                if key == ID_FIELD {
                    self.include_id
                } else {
                    self.fields.iter().any(|f| f == key)
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: Option<(String, SortOrder)>,
    pub limit: Option<u64>,
    pub projection: Option<Projection>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sort by `field`; `_id` sorts by insertion order. Ties keep insertion order.
    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some((field.into(), order));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Append `ORDER BY ... LIMIT ?`.
    pub(crate) fn push_sql(&self, sql: &mut String, binds: &mut Vec<Bind>) {
        match &self.sort {
            Some((field, order)) if field == ID_FIELD => {
                sql.push_str(&format!(" ORDER BY seq {}", order.as_sql()));
            }
            Some((field, order)) => {
                sql.push_str(&format!(
                    " ORDER BY json_extract(body, ?) {}, seq ASC",
                    order.as_sql()
                ));
                binds.push(Bind::Text(json_path(field)));
            }
            None => sql.push_str(" ORDER BY seq ASC"),
        }

        sql.push_str(" LIMIT ?");
        binds.push(Bind::Int(
            self.limit
                .map(|l| i64::try_from(l).unwrap_or(i64::MAX))
                .unwrap_or(-1),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_path_quotes_field() {
        assert_eq!(json_path("année"), "$.\"année\"");
        assert_eq!(json_path("Global_Sales"), "$.\"Global_Sales\"");
    }

    #[test]
    fn filter_binds_by_value_type() {
        let filter = Filter::new()
            .eq("Platform", "3DS")
            .eq("year", 2011)
            .eq("Global_Sales", 1.5);
        let mut sql = String::new();
        let mut binds = Vec::new();
        filter.push_sql(&mut sql, &mut binds);

        assert_eq!(sql.matches("AND").count(), 4);
        assert!(binds.contains(&Bind::Text("3DS".to_string())));
        assert!(binds.contains(&Bind::Int(2011)));
        assert!(binds.contains(&Bind::Real(1.5)));
    }

    #[test]
    fn id_filter_uses_id_column() {
        let id = DocumentId::new();
        let mut sql = String::new();
        let mut binds = Vec::new();
        Filter::by_id(id).push_sql(&mut sql, &mut binds);
        assert_eq!(sql, " AND id = ?");
        assert_eq!(binds, vec![Bind::Text(id.to_string())]);
    }

    #[test]
    fn unlimited_find_binds_negative_limit() {
        let mut sql = String::new();
        let mut binds = Vec::new();
        FindOptions::new().push_sql(&mut sql, &mut binds);
        assert_eq!(sql, " ORDER BY seq ASC LIMIT ?");
        assert_eq!(binds, vec![Bind::Int(-1)]);
    }

    #[test]
    fn projection_keeps_listed_fields_and_id() {
        let doc = json!({"_id": "x", "Name": "Mario", "NA_Sales": 1.0, "Global_Sales": 2.0});
        let doc = doc.as_object().unwrap().clone();

        let kept = Projection::include(["Name", "Global_Sales"]).apply(doc.clone());
        let keys: Vec<&str> = kept.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["_id", "Name", "Global_Sales"]);

        let no_id = Projection::include(["Name"]).without_id().apply(doc);
        assert!(!no_id.contains_key("_id"));
    }
}
