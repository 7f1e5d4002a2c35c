//! Builders for worker-produced documents.

#![allow(dead_code)]

use serde_json::{json, Value};

/// Builds a `pricing_analysis.json` document.
pub struct AnalysisBuilder {
    generated_at: String,
    reference_property: String,
    pricing: Vec<Value>,
}

impl AnalysisBuilder {
    pub fn new(generated_at: &str) -> Self {
        Self {
            generated_at: generated_at.to_string(),
            reference_property: "Harbour View".to_string(),
            pricing: Vec::new(),
        }
    }

    pub fn reference_property(mut self, name: &str) -> Self {
        self.reference_property = name.to_string();
        self
    }

    pub fn pricing(mut self, hotel: &str, avg_price: f64) -> Self {
        self.pricing.push(json!({
            "hotel_name": hotel,
            "avg_price_per_night": avg_price,
        }));
        self
    }

    pub fn build(self) -> String {
        json!({
            "generated_at": self.generated_at,
            "reference_property": self.reference_property,
            "mode": "pricing",
            "pricing_metrics": self.pricing,
            "occupancy_metrics": [],
            "comparison": [],
            "room_inventory": [],
        })
        .to_string()
    }
}

/// Builds a `pricing_data.csv` document.
pub struct CsvBuilder {
    rows: Vec<String>,
}

impl CsvBuilder {
    pub const HEADER: &'static str =
        "hotel_name,check_in_date,availability,total_price,day_offset,property_occupancy_rate";

    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn row(mut self, hotel: &str, date: &str, price: &str, offset: u32) -> Self {
        let availability = if price.is_empty() { "sold_out" } else { "available" };
        self.rows.push(format!(
            "\"{}\",{},{},{},{},",
            hotel, date, availability, price, offset
        ));
        self
    }

    pub fn build(self) -> String {
        let mut out = String::from(Self::HEADER);
        out.push('\n');
        for row in self.rows {
            out.push_str(&row);
            out.push('\n');
        }
        out
    }
}
