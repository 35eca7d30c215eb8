//! Core calculator traits and types
//!
//! Defines the common interface of the four statistical calculators and the
//! read-only view of the store they evaluate against.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::StatisticalConfig;
use crate::domain::{Opportunity, PatternLookup, PatternStatistics, Timeframe, TradeRecord};
use crate::error::EdgeError;
use crate::persistence::TimeframeData;

use super::bayesian::PatternProbability;
use super::confidence::ComprehensiveAnalysis;
use super::confluence::ConfluenceResult;
use super::kelly::KellyResult;

// ============================================================================
// Calculator kinds
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculatorKind {
    Bayesian,
    ConfidenceInterval,
    Kelly,
    Confluence,
}

impl CalculatorKind {
    pub const ALL: [CalculatorKind; 4] = [
        Self::Bayesian,
        Self::ConfidenceInterval,
        Self::Kelly,
        Self::Confluence,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bayesian => "bayesian",
            Self::ConfidenceInterval => "confidence_interval",
            Self::Kelly => "kelly",
            Self::Confluence => "confluence",
        }
    }
}

impl fmt::Display for CalculatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CalculatorKind {
    type Err = EdgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bayesian" => Ok(Self::Bayesian),
            "confidence_interval" | "confidence" | "ci" => Ok(Self::ConfidenceInterval),
            "kelly" => Ok(Self::Kelly),
            "confluence" => Ok(Self::Confluence),
            other => Err(EdgeError::InvalidConfig(format!(
                "unknown calculator kind: {other}"
            ))),
        }
    }
}

// ============================================================================
// Query context
// ============================================================================

/// Borrowed view of one timeframe's data plus the config snapshot a query
/// runs against. Calculators never hold on to it past the call.
#[derive(Debug, Clone, Copy)]
pub struct QueryContext<'a> {
    data: Option<&'a TimeframeData>,
    config: &'a StatisticalConfig,
}

impl<'a> QueryContext<'a> {
    pub fn new(data: Option<&'a TimeframeData>, config: &'a StatisticalConfig) -> Self {
        Self { data, config }
    }

    pub fn config(&self) -> &'a StatisticalConfig {
        self.config
    }

    pub fn lookup(&self, pattern: &str) -> PatternLookup {
        match self.data {
            Some(data) => data.lookup(pattern),
            None => PatternLookup::Absent,
        }
    }

    /// Raw trades of one pattern in insertion order.
    pub fn trades_for(&self, pattern: &str) -> Vec<&'a TradeRecord> {
        match self.data {
            Some(data) => data.trades.iter().filter(|t| t.pattern == pattern).collect(),
            None => Vec::new(),
        }
    }

    pub fn patterns(&self) -> impl Iterator<Item = (&'a String, &'a PatternStatistics)> + 'a {
        self.data.into_iter().flat_map(|d| d.patterns.iter())
    }
}

// ============================================================================
// Calculator trait
// ============================================================================

/// Shared query interface of the statistical calculators.
///
/// Implementors are stateless apart from their timeframe binding and can be
/// shared across threads freely.
pub trait StatisticalCalculator: Send + Sync {
    fn kind(&self) -> CalculatorKind;

    fn timeframe(&self) -> Timeframe;

    /// Headline result of this calculator for an opportunity.
    fn evaluate(&self, ctx: &QueryContext<'_>, opportunity: &Opportunity) -> CalculatorOutput;
}

/// Headline result of any calculator, tagged by kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalculatorOutput {
    Bayesian(PatternProbability),
    ConfidenceInterval(ComprehensiveAnalysis),
    Kelly(KellyResult),
    Confluence(ConfluenceResult),
}

impl CalculatorOutput {
    pub fn kind(&self) -> CalculatorKind {
        match self {
            Self::Bayesian(_) => CalculatorKind::Bayesian,
            Self::ConfidenceInterval(_) => CalculatorKind::ConfidenceInterval,
            Self::Kelly(_) => CalculatorKind::Kelly,
            Self::Confluence(_) => CalculatorKind::Confluence,
        }
    }
}
