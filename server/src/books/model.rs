use docstore::DocumentId;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use crate::numeric::leading_int;

/// Books published in or before this year are rejected.
pub const MIN_YEAR_EXCLUSIVE: i64 = 1900;

/// A stored book. Reading is lenient so documents written without a
/// validator still list: French field names are accepted, scalars are
/// stringified and a missing or unusable year is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    #[serde(default, alias = "titre", deserialize_with = "stored_text")]
    pub title: String,
    #[serde(default, alias = "auteur", deserialize_with = "stored_text")]
    pub author: String,
    #[serde(
        default,
        alias = "année",
        deserialize_with = "stored_year",
        skip_serializing_if = "Option::is_none"
    )]
    pub year: Option<i64>,
    #[serde(default, deserialize_with = "text_only", skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
}

/// A validated book, ready to be written. A `None` genre is left out of the
/// stored document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub year: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
}

/// Year as submitted: a JSON number, any text, or something else entirely.
#[derive(Debug, Clone, PartialEq)]
pub enum YearInput {
    Integer(i64),
    Float(f64),
    Text(String),
    Unusable,
}

impl YearInput {
    fn from_value(value: Value) -> Option<Self> {
        Some(match value {
            Value::Null => return None,
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(year), _) => YearInput::Integer(year),
                (None, Some(year)) => YearInput::Float(year),
                (None, None) => YearInput::Unusable,
            },
            Value::String(s) => YearInput::Text(s),
            _ => YearInput::Unusable,
        })
    }

    fn to_year(&self) -> Option<i64> {
        match self {
            YearInput::Integer(year) => Some(*year),
            YearInput::Float(year) if year.is_finite() => Some(year.trunc() as i64),
            YearInput::Float(_) | YearInput::Unusable => None,
            YearInput::Text(text) => leading_int(text),
        }
    }
}

/// Raw book fields from a form or a bulk JSON element. The French field
/// names are accepted too. A field of the wrong JSON type is treated as
/// missing (text) or unusable (year), so validation names that field.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BookInput {
    #[serde(alias = "titre", deserialize_with = "text_only")]
    pub title: Option<String>,
    #[serde(alias = "auteur", deserialize_with = "text_only")]
    pub author: Option<String>,
    #[serde(alias = "année", deserialize_with = "year_input")]
    pub year: Option<YearInput>,
    #[serde(deserialize_with = "text_only")]
    pub genre: Option<String>,
}

fn text_only<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn year_input<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<YearInput>, D::Error> {
    Ok(YearInput::from_value(Value::deserialize(deserializer)?))
}

fn stored_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

fn stored_year<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(YearInput::from_value(Value::deserialize(deserializer)?).and_then(|year| year.to_year()))
}

impl BookInput {
    /// Check the fields and normalise them. `index` is the position within a
    /// batch and ends up in the error message.
    pub fn validate(&self, index: Option<usize>) -> Result<NewBook, BookValidationError> {
        let fail = |problem| BookValidationError { problem, index };

        let title = non_blank(self.title.as_deref()).ok_or_else(|| fail(BookProblem::MissingTitle))?;
        let author = non_blank(self.author.as_deref()).ok_or_else(|| fail(BookProblem::MissingAuthor))?;
        let year = self
            .year
            .as_ref()
            .and_then(YearInput::to_year)
            .ok_or_else(|| fail(BookProblem::InvalidYear))?;
        if year <= MIN_YEAR_EXCLUSIVE {
            return Err(fail(BookProblem::YearTooOld));
        }

        Ok(NewBook {
            title: title.to_string(),
            author: author.to_string(),
            year,
            genre: non_blank(self.genre.as_deref()).map(str::to_string),
        })
    }
}

/// Trimmed value, or `None` when missing or blank.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookProblem {
    MissingTitle,
    MissingAuthor,
    InvalidYear,
    YearTooOld,
    MissingTitleForDeletion,
    MissingAuthorForDeletion,
}

/// A rejected book field, optionally tied to a batch position.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct BookValidationError {
    pub problem: BookProblem,
    pub index: Option<usize>,
}

impl BookValidationError {
    pub fn new(problem: BookProblem) -> Self {
        Self {
            problem,
            index: None,
        }
    }
}

impl fmt::Display for BookValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match (self.problem, self.index) {
            (BookProblem::MissingTitle, _) => "Le titre est requis",
            (BookProblem::MissingAuthor, None) => "L'auteur est requis et ne peut pas être vide",
            (BookProblem::MissingAuthor, Some(_)) => "L'auteur est requis",
            (BookProblem::InvalidYear, _) => "L'année doit être un nombre valide",
            (BookProblem::YearTooOld, _) => "L'année doit être supérieure à 1900",
            (BookProblem::MissingTitleForDeletion, _) => "Le titre est requis pour la suppression",
            (BookProblem::MissingAuthorForDeletion, _) => "L'auteur est requis pour la suppression",
        };
        write!(f, "{message}")?;
        if let Some(index) = self.index {
            write!(f, " pour le livre à l'index {index}")?;
        }
        Ok(())
    }
}
