//! patternedge CLI
//!
//! Commands:
//! - `patternedge record`      - Record a closed trade
//! - `patternedge stats`       - Pattern counters or a timeframe summary
//! - `patternedge probability` - Bayesian posterior (and trade decision)
//! - `patternedge evaluate`    - One calculator's result for an opportunity
//! - `patternedge score`       - Enhanced score for an opportunity
//! - `patternedge config`      - Show or change the statistical config

pub mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::PathBuf;

use crate::coordinator::StatisticalDecisionManager;
use crate::domain::{Opportunity, Timeframe};
use crate::persistence::render;
use crate::strategy::CalculatorKind;

/// Statistical decision engine for pattern trading
#[derive(Parser, Debug)]
#[command(name = "patternedge")]
#[command(author, version, about = "Statistical decision engine for pattern trading", long_about = None)]
pub struct Cli {
    /// Directory holding default.toml and environment overrides
    #[arg(long, default_value = "config", env = "PATTERNEDGE_CONFIG_DIR")]
    pub config_dir: PathBuf,

    /// Override storage.data_dir
    #[arg(long, env = "PATTERNEDGE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutcomeArg {
    Win,
    Loss,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record a closed trade
    Record {
        pattern: String,
        outcome: OutcomeArg,
        /// R-multiple of the trade (losses may be given as negative)
        #[arg(allow_negative_numbers = true)]
        r_multiple: f64,
        /// Timeframe (defaults to the selected timeframe)
        #[arg(short, long)]
        timeframe: Option<Timeframe>,
    },

    /// Show statistics for a pattern, or a summary of the whole timeframe
    Stats {
        pattern: Option<String>,
        #[arg(short, long)]
        timeframe: Option<Timeframe>,
    },

    /// Bayesian posterior for a pattern
    Probability {
        pattern: String,
        #[arg(short, long)]
        timeframe: Option<Timeframe>,
        /// Also decide TRADE/SKIP against this probability
        #[arg(long)]
        min: Option<f64>,
    },

    /// Posterior mean after each recorded trade
    Curve {
        pattern: String,
        #[arg(short, long)]
        timeframe: Option<Timeframe>,
    },

    /// Win-rate, EV and Sharpe confidence intervals
    Analyze {
        pattern: String,
        #[arg(short, long)]
        timeframe: Option<Timeframe>,
    },

    /// Kelly fractions for a pattern
    Kelly {
        pattern: String,
        #[arg(short, long)]
        timeframe: Option<Timeframe>,
    },

    /// Result of a single calculator for an opportunity given as JSON
    Evaluate {
        opportunity: String,
        /// bayesian, confidence_interval (ci), kelly or confluence
        #[arg(short, long, default_value = "bayesian")]
        kind: CalculatorKind,
        #[arg(short, long)]
        timeframe: Option<Timeframe>,
    },

    /// Enhanced score for an opportunity given as JSON,
    /// e.g. '{"pattern":"Hammer","mtf_alignment":true}'
    Score {
        opportunity: String,
        #[arg(short, long)]
        timeframe: Option<Timeframe>,
    },

    /// Recommended risk for an opportunity given as JSON
    Size {
        opportunity: String,
        #[arg(short, long)]
        timeframe: Option<Timeframe>,
        /// Base risk per trade in percent
        #[arg(long, default_value = "1.0")]
        base_risk: f64,
        /// Account balance, to report the amount at risk
        #[arg(long)]
        balance: Option<Decimal>,
    },

    /// Delete a pattern's statistics and trade records
    Reset {
        pattern: String,
        #[arg(short, long)]
        timeframe: Option<Timeframe>,
    },

    /// Show or change the statistical config
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

impl Commands {
    /// Commands that never change the stored documents.
    pub fn is_read_only(&self) -> bool {
        match self {
            Self::Record { .. } | Self::Reset { .. } => false,
            Self::Config(cmd) => cmd.is_read_only(),
            _ => true,
        }
    }

    pub async fn run(self, manager: &StatisticalDecisionManager) -> Result<()> {
        let selected = manager.config().await.selected_timeframe;
        let tf = |t: Option<Timeframe>| t.unwrap_or(selected);

        match self {
            Self::Record {
                pattern,
                outcome,
                r_multiple,
                timeframe,
            } => {
                let stats = manager
                    .record_outcome(tf(timeframe), &pattern, outcome == OutcomeArg::Win, r_multiple)
                    .await;
                print_json(&stats.into_option())
            }
            Self::Stats { pattern, timeframe } => {
                let timeframe = tf(timeframe);
                match pattern {
                    Some(pattern) => {
                        let stats = manager.get_pattern_statistics(timeframe, &pattern).await;
                        print_json(&stats.into_option())
                    }
                    None => {
                        let overview = manager.timeframe_overview(timeframe).await;
                        let patterns = manager.pattern_summaries(timeframe).await;
                        print_json(&serde_json::json!({
                            "overview": overview,
                            "patterns": patterns,
                        }))
                    }
                }
            }
            Self::Probability {
                pattern,
                timeframe,
                min,
            } => {
                let timeframe = tf(timeframe);
                let probability = manager.pattern_probability(timeframe, &pattern).await;
                match min {
                    Some(min) => {
                        let decision = manager.should_trade(timeframe, &pattern, min).await;
                        print_json(&serde_json::json!({
                            "probability": probability,
                            "decision": decision,
                        }))
                    }
                    None => print_json(&probability),
                }
            }
            Self::Curve { pattern, timeframe } => {
                print_json(&manager.learning_curve(tf(timeframe), &pattern).await)
            }
            Self::Analyze { pattern, timeframe } => {
                print_json(&manager.comprehensive_analysis(tf(timeframe), &pattern).await)
            }
            Self::Kelly { pattern, timeframe } => {
                print_json(&manager.kelly(tf(timeframe), &pattern).await)
            }
            Self::Evaluate {
                opportunity,
                kind,
                timeframe,
            } => {
                let opportunity = parse_opportunity(&opportunity)?;
                print_json(&manager.evaluate(tf(timeframe), kind, &opportunity).await)
            }
            Self::Score {
                opportunity,
                timeframe,
            } => {
                let opportunity = parse_opportunity(&opportunity)?;
                match manager.get_enhanced_score(tf(timeframe), &opportunity).await {
                    Some(score) => print_json(&score),
                    None => {
                        println!("Statistical engine is disabled (patternedge config enable)");
                        Ok(())
                    }
                }
            }
            Self::Size {
                opportunity,
                timeframe,
                base_risk,
                balance,
            } => {
                let opportunity = parse_opportunity(&opportunity)?;
                let Some(sizing) = manager
                    .get_optimal_position_size(tf(timeframe), &opportunity, base_risk)
                    .await
                else {
                    println!("Statistical engine is disabled (patternedge config enable)");
                    return Ok(());
                };
                match balance {
                    Some(balance) => print_json(&serde_json::json!({
                        "sizing": sizing,
                        "balance": balance,
                        "risk_amount": sizing.risk_amount(balance),
                    })),
                    None => print_json(&sizing),
                }
            }
            Self::Reset { pattern, timeframe } => {
                let timeframe = tf(timeframe);
                if manager.reset_pattern(timeframe, &pattern).await {
                    println!("Reset {} on {}", pattern, timeframe);
                } else {
                    println!("No data for {} on {}", pattern, timeframe);
                }
                Ok(())
            }
            Self::Config(cmd) => cmd.run(manager).await,
        }
    }
}

fn parse_opportunity(raw: &str) -> Result<Opportunity> {
    serde_json::from_str(raw).with_context(|| format!("invalid opportunity JSON: {raw}"))
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", render(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_record_with_negative_r() {
        let cli = Cli::try_parse_from([
            "patternedge",
            "record",
            "Hammer",
            "loss",
            "-1.5",
            "--timeframe",
            "h4",
        ])
        .unwrap();
        match cli.command {
            Commands::Record {
                pattern,
                outcome,
                r_multiple,
                timeframe,
            } => {
                assert_eq!(pattern, "Hammer");
                assert_eq!(outcome, OutcomeArg::Loss);
                assert_eq!(r_multiple, -1.5);
                assert_eq!(timeframe, Some(Timeframe::H4));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_timeframe() {
        let parsed = Cli::try_parse_from(["patternedge", "stats", "--timeframe", "W1"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn parses_evaluate_kind() {
        let cli = Cli::try_parse_from([
            "patternedge",
            "evaluate",
            r#"{"pattern":"Doji"}"#,
            "--kind",
            "ci",
        ])
        .unwrap();
        match &cli.command {
            Commands::Evaluate { kind, timeframe, .. } => {
                assert_eq!(*kind, CalculatorKind::ConfidenceInterval);
                assert_eq!(*timeframe, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(cli.command.is_read_only());

        let parsed = Cli::try_parse_from(["patternedge", "evaluate", "{}", "--kind", "markov"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn read_only_classification() {
        let cli = Cli::try_parse_from(["patternedge", "kelly", "Hammer"]).unwrap();
        assert!(cli.command.is_read_only());
        let cli = Cli::try_parse_from(["patternedge", "reset", "Hammer"]).unwrap();
        assert!(!cli.command.is_read_only());
        let cli = Cli::try_parse_from(["patternedge", "config", "show"]).unwrap();
        assert!(cli.command.is_read_only());
        let cli = Cli::try_parse_from(["patternedge", "config", "disable"]).unwrap();
        assert!(!cli.command.is_read_only());
    }

    #[test]
    fn opportunity_json_errors_carry_context() {
        assert!(parse_opportunity(r#"{"pattern":"Hammer","fvg":true}"#).is_ok());
        let err = parse_opportunity("not json").unwrap_err();
        assert!(err.to_string().contains("invalid opportunity JSON"));
    }
}
