pub mod cli;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod strategy;

pub use config::{AppConfig, StatisticalConfig, StorageConfig};
pub use coordinator::{EnhancedScore, PatternSummary, StatisticalDecisionManager, TimeframeOverview};
pub use domain::{
    ConfluenceFactor, FactorFlags, Opportunity, PatternLookup, PatternStatistics, Timeframe,
    TradeOutcome, TradeRecord,
};
pub use error::{EdgeError, Result};
pub use strategy::{Calculator, CalculatorKind, CalculatorOutput, StatisticalCalculator};
