//! Durable storage for the engine: one JSON document for the statistical
//! config and one for the per-timeframe pattern statistics.

pub mod json_store;
pub mod statistics_data;

pub use json_store::{render, JsonDocument};
pub use statistics_data::{StatisticsData, TimeframeData};
