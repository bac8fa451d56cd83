use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::numeric::leading_float;

/// A game as written by the administrative routes. Text fields accept any
/// JSON scalar; sales figures accept numbers or numeric text and fall back
/// to 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Game {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(rename = "NA_Sales", default, deserialize_with = "sales")]
    pub na_sales: f64,
    #[serde(rename = "EU_Sales", default, deserialize_with = "sales")]
    pub eu_sales: f64,
    #[serde(rename = "JP_Sales", default, deserialize_with = "sales")]
    pub jp_sales: f64,
    #[serde(rename = "Other_Sales", default, deserialize_with = "sales")]
    pub other_sales: f64,
    #[serde(rename = "Global_Sales", default, deserialize_with = "sales")]
    pub global_sales: f64,
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn sales<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => leading_float(&s),
        _ => None,
    };
    Ok(value.filter(|v| v.is_finite()).unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sales_are_coerced() {
        let game: Game = serde_json::from_value(json!({
            "Name": "Tetris",
            "Platform": "GB",
            "Year": 1989,
            "NA_Sales": "23.2",
            "EU_Sales": 2.26,
            "JP_Sales": "n/a",
            "Other_Sales": null,
            "Global_Sales": "30.26M"
        }))
        .unwrap();

        assert_eq!(game.year.as_deref(), Some("1989"));
        assert_eq!(game.na_sales, 23.2);
        assert_eq!(game.eu_sales, 2.26);
        assert_eq!(game.jp_sales, 0.0);
        assert_eq!(game.other_sales, 0.0);
        assert_eq!(game.global_sales, 30.26);
        assert_eq!(game.genre, None);
    }

    #[test]
    fn test_stored_shape() {
        let game: Game = serde_json::from_value(json!({"Name": "Tetris", "Global_Sales": "1e999"})).unwrap();
        let stored = serde_json::to_value(&game).unwrap();
        assert_eq!(
            stored,
            json!({
                "Name": "Tetris",
                "NA_Sales": 0.0,
                "EU_Sales": 0.0,
                "JP_Sales": 0.0,
                "Other_Sales": 0.0,
                "Global_Sales": 0.0
            })
        );
    }
}
