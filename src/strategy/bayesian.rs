//! Beta-Binomial pattern learner.
//!
//! Each pattern's win probability gets a `Beta(alpha0, beta0)` prior from the
//! config; observed wins and losses are added to the two shape parameters.
//! Credible intervals use the normal approximation `mean +- z * std` clamped
//! to [0, 1], not exact Beta quantiles, so they are symmetric even where the
//! true posterior is skewed (few samples near 0 or 1).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{Opportunity, Timeframe};

use super::numeric::{unit_interval, Interval};
use super::traits::{CalculatorKind, CalculatorOutput, QueryContext, StatisticalCalculator};

/// Sample size at which a wide credible interval no longer blocks a trade.
pub const TRUSTED_SAMPLE_SIZE: u64 = 30;
/// Credible-interval slack below `min_probability`.
pub const LOWER_BOUND_TOLERANCE: f64 = 0.10;

/// Beta posterior mean for a Bernoulli probability. Returns 0.5 on a degenerate prior.
pub fn beta_posterior(alpha: f64, beta: f64, wins: f64, losses: f64) -> f64 {
    let denom = alpha + beta + wins + losses;
    if denom <= 0.0 {
        return 0.5;
    }
    ((alpha + wins) / denom).clamp(0.0, 1.0)
}

/// Shape and moments of a Beta posterior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BetaPosterior {
    pub alpha: f64,
    pub beta: f64,
    pub mean: f64,
    pub variance: f64,
    pub std: f64,
}

impl BetaPosterior {
    pub fn new(prior_alpha: f64, prior_beta: f64, wins: u64, losses: u64) -> Self {
        let alpha = prior_alpha + wins as f64;
        let beta = prior_beta + losses as f64;
        let total = alpha + beta;
        let mean = beta_posterior(prior_alpha, prior_beta, wins as f64, losses as f64);
        let variance = if total > 0.0 {
            (alpha * beta) / (total * total * (total + 1.0))
        } else {
            0.0
        };
        Self {
            alpha,
            beta,
            mean,
            variance,
            std: variance.sqrt(),
        }
    }

    /// Normal-approximation credible interval, clamped to [0, 1].
    pub fn credible_interval(&self, z: f64) -> Interval {
        unit_interval(self.mean, z * self.std).into()
    }
}

/// z used for credible intervals: 2.576 at 99%, otherwise 1.96.
pub fn credible_z(confidence_level: f64) -> f64 {
    if (confidence_level - 0.99).abs() < 1e-9 {
        2.576
    } else {
        1.96
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfidenceLabel {
    Low,
    Fair,
    Moderate,
    Good,
    High,
}

impl ConfidenceLabel {
    pub fn for_sample_size(n: u64) -> Self {
        match n {
            0..=9 => Self::Low,
            10..=19 => Self::Fair,
            20..=29 => Self::Moderate,
            30..=49 => Self::Good,
            _ => Self::High,
        }
    }
}

impl fmt::Display for ConfidenceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "Low",
            Self::Fair => "Fair",
            Self::Moderate => "Moderate",
            Self::Good => "Good",
            Self::High => "High",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternProbability {
    pub pattern: String,
    pub posterior_mean: f64,
    pub posterior_std: f64,
    pub credible_interval: Interval,
    pub sample_size: u64,
    /// Share of posterior mass still coming from the prior
    pub prior_influence: f64,
    pub confidence: ConfidenceLabel,
    pub raw_win_rate: f64,
    pub posterior_alpha: f64,
    pub posterior_beta: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearningPoint {
    pub trade_number: u64,
    pub cumulative_wins: u64,
    pub cumulative_losses: u64,
    pub posterior_mean: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Trade,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    Qualified,
    BelowThreshold,
    TooUncertain,
    InsufficientData,
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Qualified => "posterior and credible interval clear the threshold",
            Self::BelowThreshold => "posterior probability below threshold",
            Self::TooUncertain => "credible interval too wide for the threshold",
            Self::InsufficientData => "not enough trades to trust the estimate",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeDecision {
    pub pattern: String,
    pub action: TradeAction,
    pub reason: DecisionReason,
    pub posterior_mean: f64,
    pub credible_lower: f64,
    pub min_probability: f64,
    pub sample_size: u64,
}

impl TradeDecision {
    pub fn is_trade(&self) -> bool {
        self.action == TradeAction::Trade
    }
}

/// Bayesian learner bound to one timeframe.
#[derive(Debug, Clone)]
pub struct BayesianPatternLearner {
    timeframe: Timeframe,
}

impl BayesianPatternLearner {
    pub fn new(timeframe: Timeframe) -> Self {
        Self { timeframe }
    }

    /// Posterior summary for a pattern. Without history this is the prior.
    pub fn get_pattern_probability(&self, ctx: &QueryContext<'_>, pattern: &str) -> PatternProbability {
        let cfg = ctx.config();
        let (wins, losses, raw_win_rate) = match ctx.lookup(pattern).as_present() {
            Some(stats) => (stats.wins, stats.losses, stats.win_rate()),
            None => (0, 0, 0.0),
        };
        let post = BetaPosterior::new(cfg.bayesian_prior_alpha, cfg.bayesian_prior_beta, wins, losses);
        let sample_size = wins + losses;
        let prior_mass = cfg.bayesian_prior_alpha + cfg.bayesian_prior_beta;

        PatternProbability {
            pattern: pattern.to_string(),
            posterior_mean: post.mean,
            posterior_std: post.std,
            credible_interval: post.credible_interval(credible_z(cfg.confidence_level)),
            sample_size,
            prior_influence: prior_mass / (prior_mass + sample_size as f64),
            confidence: ConfidenceLabel::for_sample_size(sample_size),
            raw_win_rate,
            posterior_alpha: post.alpha,
            posterior_beta: post.beta,
        }
    }

    /// Replays the trade log in insertion order and reports the posterior
    /// mean after each trade. Recomputed on every call.
    pub fn get_learning_curve(&self, ctx: &QueryContext<'_>, pattern: &str) -> Vec<LearningPoint> {
        let cfg = ctx.config();
        let mut wins = 0u64;
        let mut losses = 0u64;

        ctx.trades_for(pattern)
            .into_iter()
            .enumerate()
            .map(|(i, trade)| {
                if trade.outcome.is_win() {
                    wins += 1;
                } else {
                    losses += 1;
                }
                LearningPoint {
                    trade_number: i as u64 + 1,
                    cumulative_wins: wins,
                    cumulative_losses: losses,
                    posterior_mean: beta_posterior(
                        cfg.bayesian_prior_alpha,
                        cfg.bayesian_prior_beta,
                        wins as f64,
                        losses as f64,
                    ),
                }
            })
            .collect()
    }

    /// TRADE when the posterior mean reaches `min_probability` and either the
    /// credible lower bound is within tolerance or the sample is large.
    ///
    /// SKIP reasons, first match wins: the mean is below the threshold, then
    /// the lower bound is too far below it, then no trades at all.
    pub fn should_trade(
        &self,
        ctx: &QueryContext<'_>,
        pattern: &str,
        min_probability: f64,
    ) -> TradeDecision {
        let prob = self.get_pattern_probability(ctx, pattern);
        let lower = prob.credible_interval.lower;

        let mean_ok = prob.posterior_mean >= min_probability;
        let certain_enough = lower >= min_probability - LOWER_BOUND_TOLERANCE
            || prob.sample_size >= TRUSTED_SAMPLE_SIZE;

        let (action, reason) = if mean_ok && certain_enough {
            (TradeAction::Trade, DecisionReason::Qualified)
        } else if !mean_ok {
            (TradeAction::Skip, DecisionReason::BelowThreshold)
        } else if prob.sample_size == 0 {
            (TradeAction::Skip, DecisionReason::InsufficientData)
        } else {
            (TradeAction::Skip, DecisionReason::TooUncertain)
        };

        TradeDecision {
            pattern: pattern.to_string(),
            action,
            reason,
            posterior_mean: prob.posterior_mean,
            credible_lower: lower,
            min_probability,
            sample_size: prob.sample_size,
        }
    }
}

impl StatisticalCalculator for BayesianPatternLearner {
    fn kind(&self) -> CalculatorKind {
        CalculatorKind::Bayesian
    }

    fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    fn evaluate(&self, ctx: &QueryContext<'_>, opportunity: &Opportunity) -> CalculatorOutput {
        CalculatorOutput::Bayesian(self.get_pattern_probability(ctx, &opportunity.pattern))
    }
}
