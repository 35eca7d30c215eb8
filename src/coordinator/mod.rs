//! Decision coordinator
//!
//! Single owner of the statistics and config documents. Collaborators record
//! closed trades and ask for scores and position sizes through
//! [`StatisticalDecisionManager`].

pub mod manager;
pub mod state;

pub use manager::{StatisticalDecisionManager, POSTERIOR_GATE};
pub use state::{EnhancedScore, PatternSummary, TimeframeOverview};
