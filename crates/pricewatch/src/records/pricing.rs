use std::path::Path;

use serde::{Deserialize, Serialize};

/// One scraped (property, check-in date) observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPricingRecord {
    pub hotel_name: String,
    pub check_in_date: String,
    /// `available` / `sold_out` as written by the worker; empty when absent.
    pub availability: String,
    pub total_price: Option<f64>,
    pub day_offset: i64,
    pub total_room_types: Option<i64>,
    pub available_room_types: Option<i64>,
    pub sold_out_room_types: Option<i64>,
    pub property_occupancy_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotel_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_out_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_night: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scrape_timestamp: Option<String>,
}

impl DailyPricingRecord {
    pub fn is_sold_out(&self) -> bool {
        self.availability == "sold_out"
    }
}

/// Reads and decodes a pricing CSV. Missing or unreadable files yield an
/// empty list.
pub fn read_pricing_data(path: &Path) -> Vec<DailyPricingRecord> {
    match std::fs::read(path) {
        Ok(bytes) => crate::records::csv::decode(&String::from_utf8_lossy(&bytes)),
        Err(e) => {
            log::debug!("Could not read pricing data {}: {}", path.display(), e);
            Vec::new()
        }
    }
}
