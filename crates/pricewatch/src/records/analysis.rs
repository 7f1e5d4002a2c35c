//! Typed view of the worker's `pricing_analysis.json`.
//!
//! The analyzer serialises pandas frames, so numeric cells can arrive as
//! numbers, numeric strings, `null`, or bare `NaN`/`Infinity` tokens. Every
//! metric field is optional and decoded leniently; only the document shape
//! (an object with a non-empty `generated_at` and array-valued sections) is
//! enforced.

use std::borrow::Cow;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid analysis JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Analysis document is not a JSON object")]
    NotAnObject,

    #[error("Analysis document has no generated_at timestamp")]
    MissingGeneratedAt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub generated_at: String,
    #[serde(default)]
    pub reference_property: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default, deserialize_with = "rows")]
    pub pricing_metrics: Vec<PricingMetric>,
    #[serde(default, deserialize_with = "rows")]
    pub occupancy_metrics: Vec<OccupancyMetric>,
    #[serde(default, deserialize_with = "rows")]
    pub comparison: Vec<ComparisonEntry>,
    #[serde(default, deserialize_with = "rows")]
    pub room_inventory: Vec<RoomInventoryEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingMetric {
    pub hotel_name: String,
    #[serde(deserialize_with = "number")]
    pub avg_price_per_night: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub min_price: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub max_price: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub median_price: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub std_price: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub discount_frequency: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub avg_discount: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub avg_rating: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub sample_size: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub avg_min_room_price: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub avg_max_room_price: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub avg_room_price_avg: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub room_price_range: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OccupancyMetric {
    pub hotel_name: String,
    #[serde(deserialize_with = "number")]
    pub total_checks: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub available: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub sold_out: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub occupancy_rate: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub availability_rate: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub avg_total_room_types: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub avg_available_room_types: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub avg_sold_out_room_types: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub avg_room_occupancy_rate: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A competitor's position relative to the reference property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonEntry {
    pub hotel_name: String,
    #[serde(deserialize_with = "number")]
    pub avg_price: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub price_vs_ref: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub price_vs_ref_pct: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub occupancy: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub occ_vs_ref: Option<f64>,
    pub position: Option<String>,
    pub demand: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomInventoryEntry {
    pub hotel_name: String,
    #[serde(deserialize_with = "number")]
    pub avg_total_room_types: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub avg_available_room_types: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub avg_sold_out_room_types: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub avg_room_occupancy_rate: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub low_inventory_pct: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub avg_min_room_price: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub avg_max_room_price: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub avg_room_price: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub room_price_spread: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub room_price_spread_pct: Option<f64>,
    #[serde(deserialize_with = "flag")]
    pub uses_room_tiering: Option<bool>,
    #[serde(deserialize_with = "number")]
    pub sample_size: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Analysis {
    pub fn pricing_for(&self, hotel_name: &str) -> Option<&PricingMetric> {
        self.pricing_metrics
            .iter()
            .find(|m| m.hotel_name == hotel_name)
    }

    pub fn occupancy_for(&self, hotel_name: &str) -> Option<&OccupancyMetric> {
        self.occupancy_metrics
            .iter()
            .find(|m| m.hotel_name == hotel_name)
    }
}

/// Parses and validates an analysis document.
pub fn parse_analysis(text: &str) -> Result<Analysis, AnalysisError> {
    let text = replace_non_finite(text);
    let value: Value = serde_json::from_str(&text)?;

    let generated_at = match &value {
        Value::Object(map) => map.get("generated_at"),
        _ => return Err(AnalysisError::NotAnObject),
    };
    match generated_at {
        Some(Value::String(s)) if !s.trim().is_empty() => {}
        _ => return Err(AnalysisError::MissingGeneratedAt),
    }

    Ok(serde_json::from_value(value)?)
}

/// Reads an analysis file, logging and discarding any failure.
pub fn read_analysis(path: &Path) -> Option<Analysis> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            log::debug!("Could not read analysis {}: {}", path.display(), e);
            return None;
        }
    };

    match parse_analysis(&text) {
        Ok(analysis) => Some(analysis),
        Err(e) => {
            log::warn!("Ignoring malformed analysis {}: {}", path.display(), e);
            None
        }
    }
}

/// Rewrites the non-standard `NaN`, `Infinity` and `-Infinity` tokens that
/// Python's `json.dump` emits into `null`, leaving string contents untouched.
fn replace_non_finite(text: &str) -> Cow<'_, str> {
    const TOKENS: [&str; 3] = ["-Infinity", "Infinity", "NaN"];

    if !TOKENS.iter().any(|t| text.contains(t)) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        } else if let Some(token) = TOKENS.iter().find(|t| rest.starts_with(*t)) {
            out.push_str("null");
            rest = &rest[token.len()..];
            continue;
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }

    Cow::Owned(out)
}

fn rows<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let number = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(number.filter(|n| n.is_finite()))
}

fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::Number(n)) => n.as_f64().map(|n| n != 0.0),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "generated_at": "2026-01-15T06:30:00.123456",
        "reference_property": "Alpha Lodge",
        "mode": "PRICING",
        "pricing_metrics": [
            {"hotel_name": "Alpha Lodge", "avg_price_per_night": 1450.5, "min_price": 1200, "sample_size": 12, "avg_discount": null},
            {"hotel_name": "Beta Inn", "avg_price_per_night": "1320.25", "std_price": NaN}
        ],
        "occupancy_metrics": [
            {"hotel_name": "Alpha Lodge", "occupancy_rate": 40.0, "total_checks": 30}
        ],
        "comparison": [
            {"hotel_name": "Beta Inn", "price_vs_ref": -130.25, "position": "Lower Price", "demand": "Higher Demand"}
        ],
        "room_inventory": [
            {"hotel_name": "Alpha Lodge", "uses_room_tiering": true, "room_price_spread_pct": 62.5, "custom": "kept"}
        ]
    }"#;

    #[test]
    fn test_parse_full_document() {
        let analysis = parse_analysis(SAMPLE).unwrap();
        assert_eq!(analysis.generated_at, "2026-01-15T06:30:00.123456");
        assert_eq!(analysis.reference_property.as_deref(), Some("Alpha Lodge"));
        assert_eq!(analysis.pricing_metrics.len(), 2);
        assert_eq!(analysis.occupancy_metrics.len(), 1);
        assert_eq!(analysis.comparison[0].position.as_deref(), Some("Lower Price"));

        let alpha = analysis.pricing_for("Alpha Lodge").unwrap();
        assert_eq!(alpha.min_price, Some(1200.0));
        assert_eq!(alpha.avg_discount, None);

        let beta = analysis.pricing_for("Beta Inn").unwrap();
        assert_eq!(beta.avg_price_per_night, Some(1320.25));
        assert_eq!(beta.std_price, None);

        let room = &analysis.room_inventory[0];
        assert_eq!(room.uses_room_tiering, Some(true));
        assert_eq!(room.extra.get("custom"), Some(&Value::from("kept")));
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let analysis =
            parse_analysis(r#"{"generated_at": "2026-01-01T00:00:00", "room_inventory": null}"#)
                .unwrap();
        assert!(analysis.pricing_metrics.is_empty());
        assert!(analysis.room_inventory.is_empty());
        assert!(analysis.mode.is_none());
    }

    #[test]
    fn test_rejects_malformed_shapes() {
        assert!(matches!(
            parse_analysis("[1, 2, 3]"),
            Err(AnalysisError::NotAnObject)
        ));
        assert!(matches!(
            parse_analysis(r#"{"mode": "PRICING"}"#),
            Err(AnalysisError::MissingGeneratedAt)
        ));
        assert!(matches!(
            parse_analysis(r#"{"generated_at": ""}"#),
            Err(AnalysisError::MissingGeneratedAt)
        ));
        assert!(matches!(
            parse_analysis(r#"{"generated_at": "2026-01-01", "pricing_metrics": {"a": 1}}"#),
            Err(AnalysisError::Json(_))
        ));
        assert!(matches!(
            parse_analysis(r#"{"generated_at": "2026-01-01", "pricing_"#),
            Err(AnalysisError::Json(_))
        ));
    }

    #[test]
    fn test_non_finite_tokens_inside_strings_untouched() {
        let text = r#"{"generated_at": "NaN day", "mode": "say \"Infinity\"", "pricing_metrics": [{"hotel_name": "NaN Hotel", "min_price": -Infinity}]}"#;
        let analysis = parse_analysis(text).unwrap();
        assert_eq!(analysis.generated_at, "NaN day");
        assert_eq!(analysis.mode.as_deref(), Some("say \"Infinity\""));
        assert_eq!(analysis.pricing_metrics[0].hotel_name, "NaN Hotel");
        assert_eq!(analysis.pricing_metrics[0].min_price, None);
    }
}
