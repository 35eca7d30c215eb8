//! Statistical calculators
//!
//! Four stateless calculators bound to a timeframe. Each one reads a
//! [`QueryContext`] (a borrowed view of the store plus a config snapshot) at
//! query time and never caches statistics.

pub mod bayesian;
pub mod confidence;
pub mod confluence;
pub mod kelly;
pub mod numeric;
pub mod traits;

use std::sync::Arc;

use crate::domain::{Opportunity, Timeframe};

pub use bayesian::{
    BayesianPatternLearner, ConfidenceLabel, DecisionReason, LearningPoint, PatternProbability,
    TradeAction, TradeDecision,
};
pub use confidence::{
    ComprehensiveAnalysis, ConfidenceIntervalAnalyzer, ExpectedValueInterval, Recommendation,
    SharpeInterval, WinRateInterval,
};
pub use confluence::{
    BaseSource, ConfluenceResult, FactorContribution, ProbabilisticConfluenceCalculator,
};
pub use kelly::{KellyCriterionCalculator, KellyResult, PositionSizing};
pub use numeric::Interval;
pub use traits::{CalculatorKind, CalculatorOutput, QueryContext, StatisticalCalculator};

/// A cached calculator instance. Clones share the same underlying calculator.
#[derive(Debug, Clone)]
pub enum Calculator {
    Bayesian(Arc<BayesianPatternLearner>),
    ConfidenceInterval(Arc<ConfidenceIntervalAnalyzer>),
    Kelly(Arc<KellyCriterionCalculator>),
    Confluence(Arc<ProbabilisticConfluenceCalculator>),
}

impl Calculator {
    pub fn new(timeframe: Timeframe, kind: CalculatorKind) -> Self {
        match kind {
            CalculatorKind::Bayesian => Self::Bayesian(Arc::new(BayesianPatternLearner::new(timeframe))),
            CalculatorKind::ConfidenceInterval => {
                Self::ConfidenceInterval(Arc::new(ConfidenceIntervalAnalyzer::new(timeframe)))
            }
            CalculatorKind::Kelly => Self::Kelly(Arc::new(KellyCriterionCalculator::new(timeframe))),
            CalculatorKind::Confluence => {
                Self::Confluence(Arc::new(ProbabilisticConfluenceCalculator::new(timeframe)))
            }
        }
    }

    /// True when both handles point at the same calculator instance.
    pub fn ptr_eq(&self, other: &Calculator) -> bool {
        match (self, other) {
            (Self::Bayesian(a), Self::Bayesian(b)) => Arc::ptr_eq(a, b),
            (Self::ConfidenceInterval(a), Self::ConfidenceInterval(b)) => Arc::ptr_eq(a, b),
            (Self::Kelly(a), Self::Kelly(b)) => Arc::ptr_eq(a, b),
            (Self::Confluence(a), Self::Confluence(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn inner(&self) -> &dyn StatisticalCalculator {
        match self {
            Self::Bayesian(c) => c.as_ref(),
            Self::ConfidenceInterval(c) => c.as_ref(),
            Self::Kelly(c) => c.as_ref(),
            Self::Confluence(c) => c.as_ref(),
        }
    }
}

impl StatisticalCalculator for Calculator {
    fn kind(&self) -> CalculatorKind {
        self.inner().kind()
    }

    fn timeframe(&self) -> Timeframe {
        self.inner().timeframe()
    }

    fn evaluate(&self, ctx: &QueryContext<'_>, opportunity: &Opportunity) -> CalculatorOutput {
        self.inner().evaluate(ctx, opportunity)
    }
}
