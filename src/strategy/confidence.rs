//! Confidence intervals for win rate, expected value and Sharpe ratio.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{Opportunity, Timeframe};

use super::numeric::{mean_and_sample_std, wilson_ci, z_score, Interval};
use super::traits::{CalculatorKind, CalculatorOutput, QueryContext, StatisticalCalculator};

/// Interval reported for the Sharpe ratio below two samples.
pub const SHARPE_FALLBACK: Interval = Interval {
    lower: -5.0,
    upper: 5.0,
};
/// Standard deviation substituted when every R-multiple is identical.
pub const ZERO_VARIANCE_STD_FLOOR: f64 = 0.01;

const STRONG_WIN_RATE_LOWER: f64 = 0.50;
const STRONG_SHARPE: f64 = 0.5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WinRateInterval {
    pub win_rate: f64,
    pub interval: Interval,
    pub sample_size: u64,
    pub z: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectedValueInterval {
    pub expected_value: f64,
    pub standard_error: f64,
    pub interval: Interval,
    pub sample_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharpeInterval {
    pub sharpe: f64,
    pub standard_error: f64,
    pub interval: Interval,
    pub sample_size: u64,
    pub insufficient_data: bool,
}

/// Overall verdict, from strongest to weakest claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    AllMetricsPositive,
    EvPositiveOnly,
    Inconclusive,
    NoEdge,
    InsufficientData,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AllMetricsPositive => "all metrics positive: win rate, EV and Sharpe confirm an edge",
            Self::EvPositiveOnly => "EV positive only: expected value is significant, other metrics are not",
            Self::Inconclusive => "positive point estimate but the EV interval includes zero",
            Self::NoEdge => "no statistical edge",
            Self::InsufficientData => "insufficient data",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComprehensiveAnalysis {
    pub pattern: String,
    pub timeframe: Timeframe,
    pub confidence_level: f64,
    pub win_rate: WinRateInterval,
    pub expected_value: ExpectedValueInterval,
    pub sharpe: SharpeInterval,
    pub recommendation: Recommendation,
}

/// Wilson win-rate, delta-method EV and Sharpe intervals for one timeframe.
#[derive(Debug, Clone)]
pub struct ConfidenceIntervalAnalyzer {
    timeframe: Timeframe,
}

impl ConfidenceIntervalAnalyzer {
    pub fn new(timeframe: Timeframe) -> Self {
        Self { timeframe }
    }

    pub fn win_rate_interval(&self, ctx: &QueryContext<'_>, pattern: &str) -> WinRateInterval {
        let z = z_score(ctx.config().confidence_level);
        let (wins, n) = match ctx.lookup(pattern).as_present() {
            Some(stats) => (stats.wins, stats.total_trades()),
            None => (0, 0),
        };
        WinRateInterval {
            win_rate: if n == 0 { 0.0 } else { wins as f64 / n as f64 },
            interval: wilson_ci(wins, n, z).into(),
            sample_size: n,
            z,
        }
    }

    /// Delta-method interval around `p * avg_win - (1 - p) * avg_loss`.
    pub fn expected_value_interval(&self, ctx: &QueryContext<'_>, pattern: &str) -> ExpectedValueInterval {
        let z = z_score(ctx.config().confidence_level);
        let lookup = ctx.lookup(pattern);
        let Some(stats) = lookup.as_present().filter(|s| s.total_trades() > 0) else {
            return ExpectedValueInterval {
                expected_value: 0.0,
                standard_error: 0.0,
                interval: Interval::new(0.0, 0.0),
                sample_size: 0,
            };
        };

        let n = stats.total_trades();
        let p = stats.win_rate();
        let ev = stats.expected_value();
        let se_p = (p * (1.0 - p) / n as f64).sqrt();
        let se_ev = ((se_p * stats.avg_win).powi(2) + (se_p * stats.avg_loss).powi(2)).sqrt();

        ExpectedValueInterval {
            expected_value: ev,
            standard_error: se_ev,
            interval: Interval::around(ev, z * se_ev),
            sample_size: n,
        }
    }

    /// Sharpe ratio of the pattern's signed R-multiples with an asymptotic
    /// interval `s +- z * sqrt((1 + s^2 / 2) / n)`.
    pub fn sharpe_interval(&self, ctx: &QueryContext<'_>, pattern: &str) -> SharpeInterval {
        let z = z_score(ctx.config().confidence_level);
        let returns: Vec<f64> = ctx.trades_for(pattern).iter().map(|t| t.signed_r()).collect();
        let n = returns.len() as u64;

        let Some((mean, std)) = mean_and_sample_std(&returns) else {
            return SharpeInterval {
                sharpe: 0.0,
                standard_error: 0.0,
                interval: SHARPE_FALLBACK,
                sample_size: n,
                insufficient_data: true,
            };
        };

        let std = if std == 0.0 { ZERO_VARIANCE_STD_FLOOR } else { std };
        let sharpe = mean / std;
        let se = ((1.0 + sharpe * sharpe / 2.0) / n as f64).sqrt();

        SharpeInterval {
            sharpe,
            standard_error: se,
            interval: Interval::around(sharpe, z * se),
            sample_size: n,
            insufficient_data: false,
        }
    }

    pub fn get_comprehensive_analysis(&self, ctx: &QueryContext<'_>, pattern: &str) -> ComprehensiveAnalysis {
        let win_rate = self.win_rate_interval(ctx, pattern);
        let expected_value = self.expected_value_interval(ctx, pattern);
        let sharpe = self.sharpe_interval(ctx, pattern);
        let recommendation = recommend(&win_rate, &expected_value, &sharpe);

        ComprehensiveAnalysis {
            pattern: pattern.to_string(),
            timeframe: self.timeframe,
            confidence_level: ctx.config().confidence_level,
            win_rate,
            expected_value,
            sharpe,
            recommendation,
        }
    }
}

fn recommend(
    win_rate: &WinRateInterval,
    ev: &ExpectedValueInterval,
    sharpe: &SharpeInterval,
) -> Recommendation {
    if win_rate.sample_size == 0 {
        return Recommendation::InsufficientData;
    }
    if win_rate.interval.lower >= STRONG_WIN_RATE_LOWER
        && ev.interval.lower > 0.0
        && sharpe.sharpe > STRONG_SHARPE
    {
        return Recommendation::AllMetricsPositive;
    }
    if ev.interval.lower > 0.0 {
        return Recommendation::EvPositiveOnly;
    }
    if ev.expected_value > 0.0 {
        return Recommendation::Inconclusive;
    }
    Recommendation::NoEdge
}

impl StatisticalCalculator for ConfidenceIntervalAnalyzer {
    fn kind(&self) -> CalculatorKind {
        CalculatorKind::ConfidenceInterval
    }

    fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    fn evaluate(&self, ctx: &QueryContext<'_>, opportunity: &Opportunity) -> CalculatorOutput {
        CalculatorOutput::ConfidenceInterval(self.get_comprehensive_analysis(ctx, &opportunity.pattern))
    }
}
