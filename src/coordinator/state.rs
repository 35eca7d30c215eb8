//! Query payloads assembled by the decision manager.

use serde::Serialize;

use crate::domain::Timeframe;
use crate::strategy::{ConfluenceResult, KellyResult, PatternProbability, TradeDecision};

/// Combined view of one opportunity across the calculators.
#[derive(Debug, Clone, Serialize)]
pub struct EnhancedScore {
    pub timeframe: Timeframe,
    pub pattern: String,
    pub probability: PatternProbability,
    pub decision: TradeDecision,
    pub confluence: ConfluenceResult,
    pub kelly: KellyResult,
    /// Confluence-adjusted probability
    pub final_probability: f64,
    /// Confluence clears its threshold and the posterior is not below the gate
    pub should_trade: bool,
}

/// One row of [`crate::coordinator::StatisticalDecisionManager::pattern_summaries`].
#[derive(Debug, Clone, Serialize)]
pub struct PatternSummary {
    pub pattern: String,
    pub wins: u64,
    pub losses: u64,
    pub win_rate: f64,
    pub expected_value: f64,
    pub total_r: f64,
    pub posterior_mean: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeframeOverview {
    pub timeframe: Timeframe,
    pub patterns: usize,
    pub trades: u64,
    pub wins: u64,
    pub losses: u64,
    pub total_r: f64,
}

impl TimeframeOverview {
    pub fn win_rate(&self) -> f64 {
        if self.trades == 0 {
            0.0
        } else {
            self.wins as f64 / self.trades as f64
        }
    }
}
