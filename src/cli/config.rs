//! Statistical config commands
//!
//! patternedge config show              - Print the active config
//! patternedge config enable|disable    - Toggle the engine
//! patternedge config timeframe H4      - Select the default timeframe
//! patternedge config prior 10 10       - Set the Beta prior
//! patternedge config confidence 0.99   - Set the confidence level
//! patternedge config kelly-cap 0.25    - Cap the Kelly fraction
//! patternedge config half-kelly true   - Size with half-Kelly

use anyhow::Result;
use clap::{ArgAction, Subcommand};

use crate::coordinator::StatisticalDecisionManager;

use super::print_json;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the active statistical config
    Show,

    /// Enable enhanced scoring and sizing
    Enable,

    /// Disable enhanced scoring and sizing
    Disable,

    /// Select the default timeframe (M15, H1, H4, D1)
    Timeframe { value: String },

    /// Set the Beta prior pseudo-counts
    Prior { alpha: f64, beta: f64 },

    /// Set the confidence level (0.90, 0.95 or 0.99)
    Confidence { level: f64 },

    /// Upper bound for Kelly fractions, in (0, 1]
    KellyCap { fraction: f64 },

    /// Use half-Kelly for position sizing
    HalfKelly {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },
}

impl ConfigCommands {
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::Show)
    }

    pub async fn run(self, manager: &StatisticalDecisionManager) -> Result<()> {
        match self {
            Self::Show => {}
            Self::Enable => manager.set_enabled(true).await?,
            Self::Disable => manager.set_enabled(false).await?,
            Self::Timeframe { value } => manager.set_timeframe(&value).await?,
            Self::Prior { alpha, beta } => manager.set_prior(alpha, beta).await?,
            Self::Confidence { level } => manager.set_confidence_level(level).await?,
            Self::KellyCap { fraction } => manager.set_max_kelly_fraction(fraction).await?,
            Self::HalfKelly { enabled } => manager.set_use_half_kelly(enabled).await?,
        }
        print_json(&*manager.config().await)
    }
}
