//! Per-pattern aggregate counters and the raw trade log entries behind them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Timeframe;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeOutcome {
    Win,
    Loss,
}

impl TradeOutcome {
    pub fn from_win(is_win: bool) -> Self {
        if is_win {
            Self::Win
        } else {
            Self::Loss
        }
    }

    pub fn is_win(&self) -> bool {
        matches!(self, Self::Win)
    }
}

/// One closed trade, as reported by the ingestion side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub pattern: String,
    pub timeframe: Timeframe,
    pub outcome: TradeOutcome,
    /// R-multiple exactly as reported (sign not normalized)
    pub r_multiple: f64,
    pub timestamp: DateTime<Utc>,
}

impl TradeRecord {
    pub fn new(
        timeframe: Timeframe,
        pattern: &str,
        outcome: TradeOutcome,
        r_multiple: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            pattern: pattern.to_string(),
            timeframe,
            outcome,
            r_multiple,
            timestamp,
        }
    }

    /// R contribution with losses forced negative.
    pub fn signed_r(&self) -> f64 {
        signed_r(self.outcome, self.r_multiple)
    }
}

fn signed_r(outcome: TradeOutcome, r_multiple: f64) -> f64 {
    match outcome {
        TradeOutcome::Win => r_multiple,
        TradeOutcome::Loss => -r_multiple.abs(),
    }
}

/// Aggregate win/loss counters for one (timeframe, pattern) key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternStatistics {
    pub wins: u64,
    pub losses: u64,
    /// Running mean of winning R-multiples
    pub avg_win: f64,
    /// Running mean of |losing R-multiples|
    pub avg_loss: f64,
    /// Cumulative signed R
    pub total_r: f64,
}

impl PatternStatistics {
    /// Fold one closed trade into the counters.
    ///
    /// Means are updated incrementally: `m' = m + (x - m) / n'`.
    pub fn apply(&mut self, outcome: TradeOutcome, r_multiple: f64) {
        match outcome {
            TradeOutcome::Win => {
                self.wins += 1;
                self.avg_win += (r_multiple - self.avg_win) / self.wins as f64;
            }
            TradeOutcome::Loss => {
                self.losses += 1;
                self.avg_loss += (r_multiple.abs() - self.avg_loss) / self.losses as f64;
            }
        }
        self.total_r += signed_r(outcome, r_multiple);
    }

    pub fn total_trades(&self) -> u64 {
        self.wins + self.losses
    }

    /// True when every float counter is finite, i.e. the document can be
    /// written as JSON and read back.
    pub fn is_finite(&self) -> bool {
        self.avg_win.is_finite() && self.avg_loss.is_finite() && self.total_r.is_finite()
    }

    /// Raw win rate; 0.0 when nothing has been recorded.
    pub fn win_rate(&self) -> f64 {
        let n = self.total_trades();
        if n == 0 {
            return 0.0;
        }
        self.wins as f64 / n as f64
    }

    /// Expected R per trade: `p * avg_win - (1 - p) * avg_loss`.
    pub fn expected_value(&self) -> f64 {
        if self.total_trades() == 0 {
            return 0.0;
        }
        let p = self.win_rate();
        p * self.avg_win - (1.0 - p) * self.avg_loss
    }
}

/// Result of a statistics lookup. `Absent` means the key was never recorded,
/// which is different from a present key with zero wins.
#[derive(Debug, Clone, PartialEq)]
pub enum PatternLookup {
    Present(PatternStatistics),
    Absent,
}

impl PatternLookup {
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    pub fn as_present(&self) -> Option<&PatternStatistics> {
        match self {
            Self::Present(stats) => Some(stats),
            Self::Absent => None,
        }
    }

    pub fn into_option(self) -> Option<PatternStatistics> {
        match self {
            Self::Present(stats) => Some(stats),
            Self::Absent => None,
        }
    }
}

impl From<Option<&PatternStatistics>> for PatternLookup {
    fn from(value: Option<&PatternStatistics>) -> Self {
        match value {
            Some(stats) => Self::Present(stats.clone()),
            None => Self::Absent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incremental_means_match_plain_average() {
        let mut stats = PatternStatistics::default();
        for r in [2.0, 3.0, 1.0] {
            stats.apply(TradeOutcome::Win, r);
        }
        stats.apply(TradeOutcome::Loss, -1.0);
        stats.apply(TradeOutcome::Loss, -0.5);

        assert_eq!(stats.wins, 3);
        assert_eq!(stats.losses, 2);
        assert!((stats.avg_win - 2.0).abs() < 1e-12);
        assert!((stats.avg_loss - 0.75).abs() < 1e-12);
        assert!((stats.total_r - 4.5).abs() < 1e-12);
    }

    #[test]
    fn loss_magnitude_is_sign_agnostic() {
        let mut stats = PatternStatistics::default();
        stats.apply(TradeOutcome::Loss, 1.0);
        stats.apply(TradeOutcome::Loss, -1.0);
        assert!((stats.avg_loss - 1.0).abs() < 1e-12);
        assert!((stats.total_r + 2.0).abs() < 1e-12);
    }

    #[test]
    fn overflowing_total_is_not_finite() {
        let mut stats = PatternStatistics::default();
        stats.apply(TradeOutcome::Win, 1e308);
        assert!(stats.is_finite());
        stats.apply(TradeOutcome::Win, 1e308);
        assert!(!stats.is_finite());
    }

    #[test]
    fn empty_statistics_are_neutral() {
        let stats = PatternStatistics::default();
        assert_eq!(stats.total_trades(), 0);
        assert_eq!(stats.win_rate(), 0.0);
        assert_eq!(stats.expected_value(), 0.0);
    }

    #[test]
    fn expected_value_uses_both_legs() {
        let stats = PatternStatistics {
            wins: 6,
            losses: 4,
            avg_win: 2.0,
            avg_loss: 1.0,
            total_r: 8.0,
        };
        // 0.6 * 2.0 - 0.4 * 1.0
        assert!((stats.expected_value() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn signed_r_forces_losses_negative() {
        let now = Utc::now();
        let loss = TradeRecord::new(Timeframe::H1, "Hammer", TradeOutcome::Loss, 1.5, now);
        let win = TradeRecord::new(Timeframe::H1, "Hammer", TradeOutcome::Win, 2.0, now);
        assert_eq!(loss.signed_r(), -1.5);
        assert_eq!(win.signed_r(), 2.0);
    }

    #[test]
    fn lookup_distinguishes_absent_from_zero() {
        let zero = PatternStatistics::default();
        assert!(PatternLookup::from(Some(&zero)).is_present());
        assert!(!PatternLookup::from(None).is_present());
    }
}
