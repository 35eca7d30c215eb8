//! Multiplicative confluence scoring.
//!
//! Starts from a base probability (historical win rate once a pattern has
//! enough trades, otherwise 0.50) and multiplies in a fixed boost per present
//! confirmation factor. The running value is capped at 0.95 after every step.

use serde::{Deserialize, Serialize};

use crate::domain::{ConfluenceFactor, FactorFlags, Opportunity, Timeframe};

use super::traits::{CalculatorKind, CalculatorOutput, QueryContext, StatisticalCalculator};

pub const PROBABILITY_CAP: f64 = 0.95;
pub const NEUTRAL_BASE_PROBABILITY: f64 = 0.50;
pub const MIN_TRADES_FOR_BASE_RATE: usize = 10;
pub const DEFAULT_MIN_PROBABILITY: f64 = 0.60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseSource {
    Historical,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorContribution {
    pub factor: ConfluenceFactor,
    pub multiplier: f64,
    pub before: f64,
    pub after: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfluenceResult {
    pub pattern: String,
    pub base_probability: f64,
    pub base_source: BaseSource,
    /// Trades behind the base rate
    pub history_size: usize,
    pub contributions: Vec<FactorContribution>,
    pub final_probability: f64,
    pub min_probability: f64,
    pub should_trade: bool,
}

impl ConfluenceResult {
    pub fn factors_fired(&self) -> Vec<ConfluenceFactor> {
        self.contributions.iter().map(|c| c.factor).collect()
    }
}

/// Fold the present factors into `base`, in fixed order, capping each step.
pub fn combine(base: f64, factors: &FactorFlags) -> (Vec<FactorContribution>, f64) {
    let mut p = base.clamp(0.0, PROBABILITY_CAP);
    let mut contributions = Vec::new();

    for factor in factors.present() {
        let before = p;
        p = (p * factor.multiplier()).min(PROBABILITY_CAP);
        contributions.push(FactorContribution {
            factor,
            multiplier: factor.multiplier(),
            before,
            after: p,
        });
    }

    (contributions, p)
}

/// Confluence calculator bound to one timeframe.
#[derive(Debug, Clone)]
pub struct ProbabilisticConfluenceCalculator {
    timeframe: Timeframe,
}

impl ProbabilisticConfluenceCalculator {
    pub fn new(timeframe: Timeframe) -> Self {
        Self { timeframe }
    }

    /// Historical win rate from the trade log once there are enough trades.
    pub fn base_probability(&self, ctx: &QueryContext<'_>, pattern: &str) -> (f64, BaseSource, usize) {
        let trades = ctx.trades_for(pattern);
        let n = trades.len();
        if n < MIN_TRADES_FOR_BASE_RATE {
            return (NEUTRAL_BASE_PROBABILITY, BaseSource::Neutral, n);
        }
        let wins = trades.iter().filter(|t| t.outcome.is_win()).count();
        (wins as f64 / n as f64, BaseSource::Historical, n)
    }

    pub fn analyze(&self, ctx: &QueryContext<'_>, opportunity: &Opportunity) -> ConfluenceResult {
        let (base_probability, base_source, history_size) =
            self.base_probability(ctx, &opportunity.pattern);
        let (contributions, final_probability) = combine(base_probability, &opportunity.factors);
        let min_probability = opportunity
            .min_probability
            .unwrap_or(DEFAULT_MIN_PROBABILITY);

        ConfluenceResult {
            pattern: opportunity.pattern.clone(),
            base_probability,
            base_source,
            history_size,
            contributions,
            final_probability,
            min_probability,
            should_trade: final_probability >= min_probability,
        }
    }
}

impl StatisticalCalculator for ProbabilisticConfluenceCalculator {
    fn kind(&self) -> CalculatorKind {
        CalculatorKind::Confluence
    }

    fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    fn evaluate(&self, ctx: &QueryContext<'_>, opportunity: &Opportunity) -> CalculatorOutput {
        CalculatorOutput::Confluence(self.analyze(ctx, opportunity))
    }
}
