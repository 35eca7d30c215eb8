//! Kelly Criterion position sizing.
//!
//! `f* = (p * b - q) / b` with `b = avg_win / avg_loss`, clamped to
//! `[0, max_kelly_fraction]`. Risk percentages are floored at a tenth of the
//! caller's base risk and capped at three times it.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Opportunity, Timeframe};

use super::traits::{CalculatorKind, CalculatorOutput, QueryContext, StatisticalCalculator};

/// Floor for any recommended risk, as a multiple of base risk.
pub const MIN_RISK_MULTIPLE: f64 = 0.1;
/// Ceiling for any recommended risk, as a multiple of base risk.
pub const MAX_RISK_MULTIPLE: f64 = 3.0;

/// Unclamped Kelly fraction. Zero when the payoff ratio is not positive.
pub fn kelly_fraction(win_rate: f64, win_loss_ratio: f64) -> f64 {
    if win_loss_ratio.is_nan() || win_loss_ratio <= 0.0 || win_loss_ratio.is_infinite() {
        return 0.0;
    }
    let q = 1.0 - win_rate;
    (win_rate * win_loss_ratio - q) / win_loss_ratio
}

/// Clamp into `[0, cap]`; NaN maps to 0.
pub fn cap_fraction(raw: f64, cap: f64) -> f64 {
    if raw.is_nan() {
        return 0.0;
    }
    raw.max(0.0).min(cap)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KellyResult {
    pub pattern: String,
    pub win_rate: f64,
    pub win_loss_ratio: f64,
    /// Formula output before clamping
    pub raw_kelly: f64,
    pub kelly_full: f64,
    pub kelly_half: f64,
    pub kelly_quarter: f64,
    pub sample_size: u64,
}

impl KellyResult {
    fn neutral(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            win_rate: 0.5,
            win_loss_ratio: 1.0,
            raw_kelly: 0.0,
            kelly_full: 0.0,
            kelly_half: 0.0,
            kelly_quarter: 0.0,
            sample_size: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSizing {
    pub pattern: String,
    pub base_risk_percent: f64,
    pub half_kelly: bool,
    /// Kelly fraction the size was derived from
    pub kelly_fraction: f64,
    /// Recommended risk per trade, in percent of the account
    pub risk_percent: f64,
    pub kelly: KellyResult,
}

impl PositionSizing {
    /// Account-currency amount to risk for a balance, rounded to cents.
    pub fn risk_amount(&self, balance: Decimal) -> Decimal {
        risk_amount(balance, self.risk_percent)
    }
}

/// `balance * risk_percent / 100`, rounded to two decimals.
pub fn risk_amount(balance: Decimal, risk_percent: f64) -> Decimal {
    let pct = Decimal::from_f64(risk_percent).unwrap_or(Decimal::ZERO);
    (balance * pct / Decimal::ONE_HUNDRED).round_dp(2)
}

/// Kelly calculator bound to one timeframe.
#[derive(Debug, Clone)]
pub struct KellyCriterionCalculator {
    timeframe: Timeframe,
}

impl KellyCriterionCalculator {
    pub fn new(timeframe: Timeframe) -> Self {
        Self { timeframe }
    }

    /// Kelly fractions from the pattern's counters. Without history this is
    /// a zero-edge result (win rate 0.5, ratio 1.0).
    pub fn calculate(&self, ctx: &QueryContext<'_>, pattern: &str) -> KellyResult {
        let lookup = ctx.lookup(pattern);
        let Some(stats) = lookup.as_present().filter(|s| s.total_trades() > 0) else {
            return KellyResult::neutral(pattern);
        };

        let win_rate = stats.win_rate();
        let avg_loss = if stats.avg_loss == 0.0 { 1.0 } else { stats.avg_loss };
        let win_loss_ratio = stats.avg_win / avg_loss;

        let raw_kelly = kelly_fraction(win_rate, win_loss_ratio);
        let kelly_full = cap_fraction(raw_kelly, ctx.config().max_kelly_fraction);

        KellyResult {
            pattern: pattern.to_string(),
            win_rate,
            win_loss_ratio,
            raw_kelly,
            kelly_full,
            kelly_half: kelly_full / 2.0,
            kelly_quarter: kelly_full / 4.0,
            sample_size: stats.total_trades(),
        }
    }

    /// Recommended risk percent for an opportunity.
    pub fn calculate_position_size(
        &self,
        ctx: &QueryContext<'_>,
        opportunity: &Opportunity,
        base_risk_percent: f64,
    ) -> PositionSizing {
        let kelly = self.calculate(ctx, &opportunity.pattern);
        let half_kelly = ctx.config().use_half_kelly;
        let kelly_fraction = if half_kelly {
            kelly.kelly_half
        } else {
            kelly.kelly_full
        };

        let base = base_risk_percent.max(0.0);
        let floor = base * MIN_RISK_MULTIPLE;
        let ceiling = base * MAX_RISK_MULTIPLE;
        let risk_percent = if kelly_fraction <= 0.0 {
            floor
        } else {
            (kelly_fraction * 100.0).min(ceiling).max(floor)
        };

        PositionSizing {
            pattern: opportunity.pattern.clone(),
            base_risk_percent,
            half_kelly,
            kelly_fraction,
            risk_percent,
            kelly,
        }
    }
}

impl StatisticalCalculator for KellyCriterionCalculator {
    fn kind(&self) -> CalculatorKind {
        CalculatorKind::Kelly
    }

    fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    fn evaluate(&self, ctx: &QueryContext<'_>, opportunity: &Opportunity) -> CalculatorOutput {
        CalculatorOutput::Kelly(self.calculate(ctx, &opportunity.pattern))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StatisticalConfig;
    use crate::domain::PatternStatistics;
    use crate::persistence::TimeframeData;
    use rust_decimal_macros::dec;

    fn ctx_data(stats: PatternStatistics) -> TimeframeData {
        let mut data = TimeframeData::default();
        data.patterns.insert("Hammer".to_string(), stats);
        data
    }

    fn strong_stats() -> PatternStatistics {
        PatternStatistics {
            wins: 20,
            losses: 10,
            avg_win: 2.5,
            avg_loss: 1.0,
            total_r: 40.0,
        }
    }

    #[test]
    fn kelly_scenario_is_capped() {
        let data = ctx_data(strong_stats());
        let cfg = StatisticalConfig::default();
        let ctx = QueryContext::new(Some(&data), &cfg);
        let k = KellyCriterionCalculator::new(Timeframe::H1).calculate(&ctx, "Hammer");

        assert!((k.win_rate - 2.0 / 3.0).abs() < 1e-9);
        assert!((k.win_loss_ratio - 2.5).abs() < 1e-12);
        assert!((k.raw_kelly - 0.5333).abs() < 1e-4);
        assert_eq!(k.kelly_full, 0.25);
        assert_eq!(k.kelly_half, 0.125);
        assert_eq!(k.kelly_quarter, 0.0625);
    }

    #[test]
    fn no_data_is_zero_edge() {
        let cfg = StatisticalConfig::default();
        let ctx = QueryContext::new(None, &cfg);
        let k = KellyCriterionCalculator::new(Timeframe::H1).calculate(&ctx, "Hammer");
        assert_eq!(k.kelly_full, 0.0);
        assert_eq!(k.win_rate, 0.5);
        assert_eq!(k.win_loss_ratio, 1.0);
        assert_eq!(k.sample_size, 0);
    }

    #[test]
    fn zero_avg_loss_treated_as_one() {
        let data = ctx_data(PatternStatistics {
            wins: 5,
            losses: 0,
            avg_win: 2.0,
            avg_loss: 0.0,
            total_r: 10.0,
        });
        let cfg = StatisticalConfig::default();
        let ctx = QueryContext::new(Some(&data), &cfg);
        let k = KellyCriterionCalculator::new(Timeframe::H1).calculate(&ctx, "Hammer");
        assert_eq!(k.win_loss_ratio, 2.0);
        assert_eq!(k.kelly_full, 0.25);
    }

    #[test]
    fn kelly_always_within_bounds() {
        let cap = 0.25;
        for &p in &[0.0, 0.1, 0.5, 0.9, 1.0] {
            for &b in &[0.0, 1e-12, 0.01, 0.5, 1.0, 3.0, 1e9, f64::INFINITY] {
                let k = cap_fraction(kelly_fraction(p, b), cap);
                assert!((0.0..=cap).contains(&k), "p={} b={} k={}", p, b, k);
            }
        }
    }

    #[test]
    fn position_size_uses_half_kelly_and_caps() {
        let data = ctx_data(strong_stats());
        let cfg = StatisticalConfig::default();
        let ctx = QueryContext::new(Some(&data), &cfg);
        let calc = KellyCriterionCalculator::new(Timeframe::H1);

        // half-Kelly 0.125 -> 12.5%, capped at 3 * 1% = 3%
        let sizing = calc.calculate_position_size(&ctx, &Opportunity::new("Hammer"), 1.0);
        assert!(sizing.half_kelly);
        assert_eq!(sizing.kelly_fraction, 0.125);
        assert_eq!(sizing.risk_percent, 3.0);

        // With a large base the Kelly value itself is used
        let sizing = calc.calculate_position_size(&ctx, &Opportunity::new("Hammer"), 10.0);
        assert!((sizing.risk_percent - 12.5).abs() < 1e-12);
    }

    #[test]
    fn position_size_full_kelly_when_configured() {
        let data = ctx_data(strong_stats());
        let cfg = StatisticalConfig {
            use_half_kelly: false,
            ..StatisticalConfig::default()
        };
        let ctx = QueryContext::new(Some(&data), &cfg);
        let sizing = KellyCriterionCalculator::new(Timeframe::H1)
            .calculate_position_size(&ctx, &Opportunity::new("Hammer"), 10.0);
        assert_eq!(sizing.kelly_fraction, 0.25);
        assert!((sizing.risk_percent - 25.0).abs() < 1e-12);
    }

    #[test]
    fn position_size_floor_without_edge() {
        let cfg = StatisticalConfig::default();
        let ctx = QueryContext::new(None, &cfg);
        let sizing = KellyCriterionCalculator::new(Timeframe::H1)
            .calculate_position_size(&ctx, &Opportunity::new("Hammer"), 2.0);
        assert!((sizing.risk_percent - 0.2).abs() < 1e-12);
    }

    #[test]
    fn risk_amount_rounds_to_cents() {
        assert_eq!(risk_amount(dec!(10000), 1.25), dec!(125.00));
        assert_eq!(risk_amount(dec!(3333.33), 1.0), dec!(33.33));
        assert_eq!(risk_amount(dec!(1000), f64::NAN), dec!(0));
    }
}
