//! Candidate trade opportunity as handed over by the scoring side.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Independent confirmation signal that can boost a trade probability.
///
/// `ALL` fixes the order in which boosts are applied, so the same factor set
/// always yields the same probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfluenceFactor {
    VolumeConfirmation,
    MtfAlignment,
    StrongPattern,
    LiquiditySweep,
    OrderBlock,
    Fvg,
    StructureBreak,
    SessionQuality,
    LowSpread,
    NewsAvoidance,
    CorrelationCheck,
    MlConfirmation,
}

impl ConfluenceFactor {
    pub const ALL: [ConfluenceFactor; 12] = [
        Self::VolumeConfirmation,
        Self::MtfAlignment,
        Self::StrongPattern,
        Self::LiquiditySweep,
        Self::OrderBlock,
        Self::Fvg,
        Self::StructureBreak,
        Self::SessionQuality,
        Self::LowSpread,
        Self::NewsAvoidance,
        Self::CorrelationCheck,
        Self::MlConfirmation,
    ];

    /// Probability boost applied when the factor is present.
    pub fn multiplier(&self) -> f64 {
        match self {
            Self::VolumeConfirmation => 1.15,
            Self::MtfAlignment => 1.30,
            Self::StrongPattern => 1.20,
            Self::LiquiditySweep => 1.10,
            Self::OrderBlock => 1.15,
            Self::Fvg => 1.10,
            Self::StructureBreak => 1.12,
            Self::SessionQuality => 1.08,
            Self::LowSpread => 1.05,
            Self::NewsAvoidance => 1.05,
            Self::CorrelationCheck => 1.08,
            Self::MlConfirmation => 1.15,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::VolumeConfirmation => "volume_confirmation",
            Self::MtfAlignment => "mtf_alignment",
            Self::StrongPattern => "strong_pattern",
            Self::LiquiditySweep => "liquidity_sweep",
            Self::OrderBlock => "order_block",
            Self::Fvg => "fvg",
            Self::StructureBreak => "structure_break",
            Self::SessionQuality => "session_quality",
            Self::LowSpread => "low_spread",
            Self::NewsAvoidance => "news_avoidance",
            Self::CorrelationCheck => "correlation_check",
            Self::MlConfirmation => "ml_confirmation",
        }
    }
}

impl fmt::Display for ConfluenceFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Boolean confirmation flags. Missing keys deserialize as `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorFlags {
    pub volume_confirmation: bool,
    pub mtf_alignment: bool,
    pub strong_pattern: bool,
    pub liquidity_sweep: bool,
    pub order_block: bool,
    pub fvg: bool,
    pub structure_break: bool,
    pub session_quality: bool,
    pub low_spread: bool,
    pub news_avoidance: bool,
    pub correlation_check: bool,
    pub ml_confirmation: bool,
}

impl FactorFlags {
    pub fn all() -> Self {
        let mut flags = Self::default();
        for factor in ConfluenceFactor::ALL {
            flags.set(factor, true);
        }
        flags
    }

    pub fn is_set(&self, factor: ConfluenceFactor) -> bool {
        match factor {
            ConfluenceFactor::VolumeConfirmation => self.volume_confirmation,
            ConfluenceFactor::MtfAlignment => self.mtf_alignment,
            ConfluenceFactor::StrongPattern => self.strong_pattern,
            ConfluenceFactor::LiquiditySweep => self.liquidity_sweep,
            ConfluenceFactor::OrderBlock => self.order_block,
            ConfluenceFactor::Fvg => self.fvg,
            ConfluenceFactor::StructureBreak => self.structure_break,
            ConfluenceFactor::SessionQuality => self.session_quality,
            ConfluenceFactor::LowSpread => self.low_spread,
            ConfluenceFactor::NewsAvoidance => self.news_avoidance,
            ConfluenceFactor::CorrelationCheck => self.correlation_check,
            ConfluenceFactor::MlConfirmation => self.ml_confirmation,
        }
    }

    pub fn set(&mut self, factor: ConfluenceFactor, value: bool) {
        let slot = match factor {
            ConfluenceFactor::VolumeConfirmation => &mut self.volume_confirmation,
            ConfluenceFactor::MtfAlignment => &mut self.mtf_alignment,
            ConfluenceFactor::StrongPattern => &mut self.strong_pattern,
            ConfluenceFactor::LiquiditySweep => &mut self.liquidity_sweep,
            ConfluenceFactor::OrderBlock => &mut self.order_block,
            ConfluenceFactor::Fvg => &mut self.fvg,
            ConfluenceFactor::StructureBreak => &mut self.structure_break,
            ConfluenceFactor::SessionQuality => &mut self.session_quality,
            ConfluenceFactor::LowSpread => &mut self.low_spread,
            ConfluenceFactor::NewsAvoidance => &mut self.news_avoidance,
            ConfluenceFactor::CorrelationCheck => &mut self.correlation_check,
            ConfluenceFactor::MlConfirmation => &mut self.ml_confirmation,
        };
        *slot = value;
    }

    /// Present factors in application order.
    pub fn present(&self) -> Vec<ConfluenceFactor> {
        ConfluenceFactor::ALL
            .into_iter()
            .filter(|f| self.is_set(*f))
            .collect()
    }
}

/// A candidate trade submitted for scoring or sizing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub pattern: String,
    #[serde(flatten)]
    pub factors: FactorFlags,
    /// Override for the go/no-go probability threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_probability: Option<f64>,
}

impl Opportunity {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Default::default()
        }
    }

    pub fn with_factor(mut self, factor: ConfluenceFactor) -> Self {
        self.factors.set(factor, true);
        self
    }

    pub fn with_min_probability(mut self, min: f64) -> Self {
        self.min_probability = Some(min);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opportunity_from_sparse_json_map() {
        let json = r#"{"pattern":"Hammer","mtf_alignment":true,"fvg":true}"#;
        let opp: Opportunity = serde_json::from_str(json).unwrap();
        assert_eq!(opp.pattern, "Hammer");
        assert_eq!(
            opp.factors.present(),
            vec![ConfluenceFactor::MtfAlignment, ConfluenceFactor::Fvg]
        );
        assert!(opp.min_probability.is_none());
    }

    #[test]
    fn present_follows_fixed_order() {
        let opp = Opportunity::new("Doji")
            .with_factor(ConfluenceFactor::MlConfirmation)
            .with_factor(ConfluenceFactor::VolumeConfirmation);
        assert_eq!(
            opp.factors.present(),
            vec![
                ConfluenceFactor::VolumeConfirmation,
                ConfluenceFactor::MlConfirmation
            ]
        );
    }

    #[test]
    fn all_flags_cover_every_factor() {
        assert_eq!(FactorFlags::all().present().len(), 12);
        assert!(FactorFlags::default().present().is_empty());
    }

    #[test]
    fn keys_match_serde_names() {
        for factor in ConfluenceFactor::ALL {
            let json = serde_json::to_string(&factor).unwrap();
            assert_eq!(json, format!("\"{}\"", factor.key()));
        }
    }
}
