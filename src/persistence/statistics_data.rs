//! In-memory form of the persisted statistics document.
//!
//! Layout on disk:
//! `{ "<timeframe>": { "trades": [TradeRecord...], "patterns": { "<name>": PatternStatistics } } }`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{PatternLookup, PatternStatistics, Timeframe, TradeOutcome, TradeRecord};

/// Trade log and aggregates for one timeframe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeframeData {
    pub trades: Vec<TradeRecord>,
    pub patterns: BTreeMap<String, PatternStatistics>,
}

impl TimeframeData {
    pub fn lookup(&self, pattern: &str) -> PatternLookup {
        PatternLookup::from(self.patterns.get(pattern))
    }

    /// Trades of one pattern, in insertion order.
    pub fn trades_for<'a>(&'a self, pattern: &'a str) -> impl Iterator<Item = &'a TradeRecord> + 'a {
        self.trades.iter().filter(move |t| t.pattern == pattern)
    }

    pub fn trade_count(&self, pattern: &str) -> usize {
        self.trades_for(pattern).count()
    }
}

/// Every timeframe's data, keyed by timeframe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatisticsData {
    timeframes: BTreeMap<Timeframe, TimeframeData>,
}

impl StatisticsData {
    pub fn timeframe(&self, timeframe: Timeframe) -> Option<&TimeframeData> {
        self.timeframes.get(&timeframe)
    }

    pub fn lookup(&self, timeframe: Timeframe, pattern: &str) -> PatternLookup {
        self.timeframes
            .get(&timeframe)
            .map(|tf| tf.lookup(pattern))
            .unwrap_or(PatternLookup::Absent)
    }

    /// Apply one closed trade: update counters, append the raw record.
    /// Creates the timeframe and pattern entries on first use.
    ///
    /// Returns `None` and leaves the document untouched when the trade is
    /// not finite or would push a counter past the f64 range.
    pub fn record(
        &mut self,
        timeframe: Timeframe,
        pattern: &str,
        outcome: TradeOutcome,
        r_multiple: f64,
        timestamp: DateTime<Utc>,
    ) -> Option<&PatternStatistics> {
        if !r_multiple.is_finite() {
            return None;
        }
        let mut next = self.lookup(timeframe, pattern).into_option().unwrap_or_default();
        next.apply(outcome, r_multiple);
        if !next.is_finite() {
            return None;
        }

        let tf = self.timeframes.entry(timeframe).or_default();
        tf.trades.push(TradeRecord::new(
            timeframe, pattern, outcome, r_multiple, timestamp,
        ));
        let stats = tf.patterns.entry(pattern.to_string()).or_default();
        *stats = next;
        Some(stats)
    }

    /// Remove a pattern's aggregates and all of its raw records.
    ///
    /// Returns false when there was nothing to remove.
    pub fn reset_pattern(&mut self, timeframe: Timeframe, pattern: &str) -> bool {
        let Some(tf) = self.timeframes.get_mut(&timeframe) else {
            return false;
        };
        let had_stats = tf.patterns.remove(pattern).is_some();
        let before = tf.trades.len();
        tf.trades.retain(|t| t.pattern != pattern);
        had_stats || tf.trades.len() != before
    }

    pub fn timeframes(&self) -> impl Iterator<Item = (&Timeframe, &TimeframeData)> {
        self.timeframes.iter()
    }
}
