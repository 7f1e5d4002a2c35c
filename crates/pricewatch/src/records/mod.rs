//! Worker-produced records and their tolerant decoders.

pub mod analysis;
pub mod csv;
pub mod history;
pub mod pricing;
pub mod progress;

pub use analysis::{
    parse_analysis, read_analysis, Analysis, AnalysisError, ComparisonEntry, OccupancyMetric,
    PricingMetric, RoomInventoryEntry,
};
pub use csv::decode;
pub use history::{read_history, HistoryEntry};
pub use pricing::{read_pricing_data, DailyPricingRecord};
pub use progress::{read_daily_progress, DailyProgress};
