//! StatisticalDecisionManager: owns the config and statistics documents,
//! ingests closed trades and answers calculator queries.
//!
//! Statistics sit behind a `tokio::sync::RwLock`. Mutations keep the write
//! guard until the durable copy is on disk, so readers never observe a trade
//! that has not been persisted yet. The config is an `Arc` snapshot; queries
//! clone it once and use it for the whole query.

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::{
    validate_confidence_level, validate_kelly_cap, validate_prior, StatisticalConfig,
    StorageConfig,
};
use crate::domain::{Opportunity, PatternLookup, Timeframe, TradeOutcome};
use crate::error::Result;
use crate::persistence::{JsonDocument, StatisticsData};
use crate::strategy::bayesian::DecisionReason;
use crate::strategy::{
    BayesianPatternLearner, Calculator, CalculatorKind, CalculatorOutput, ComprehensiveAnalysis,
    ConfidenceIntervalAnalyzer, ConfluenceResult, KellyCriterionCalculator, KellyResult,
    LearningPoint, PatternProbability, PositionSizing, ProbabilisticConfluenceCalculator,
    QueryContext, StatisticalCalculator, TradeDecision,
};

use super::state::{EnhancedScore, PatternSummary, TimeframeOverview};

/// Posterior mean an enhanced score must reach before confluence can green-light it.
pub const POSTERIOR_GATE: f64 = 0.50;

pub struct StatisticalDecisionManager {
    config_store: JsonDocument<StatisticalConfig>,
    data_store: JsonDocument<StatisticsData>,
    config: RwLock<Arc<StatisticalConfig>>,
    data: RwLock<StatisticsData>,
    calculators: DashMap<(Timeframe, CalculatorKind), Calculator>,
}

impl StatisticalDecisionManager {
    /// Load both documents from `storage`.
    ///
    /// A missing config file yields `defaults`; a corrupt or out-of-range one
    /// is logged and replaced by `defaults` too. A corrupt data file starts
    /// the store empty.
    pub async fn open(storage: &StorageConfig, defaults: StatisticalConfig) -> Self {
        let defaults = match defaults.validate() {
            Ok(()) => defaults,
            Err(e) => {
                warn!(error = %e, "invalid default statistical config, using built-in defaults");
                StatisticalConfig::default()
            }
        };

        let config_store: JsonDocument<StatisticalConfig> =
            JsonDocument::new(storage.config_path(), "statistical_config");
        let data_store: JsonDocument<StatisticsData> =
            JsonDocument::new(storage.data_path(), "statistical_data");

        let config = match config_store.read().await {
            Ok(Some(cfg)) => match cfg.validate() {
                Ok(()) => cfg,
                Err(e) => {
                    warn!(
                        path = %config_store.path().display(),
                        error = %e,
                        "persisted statistical config rejected, using defaults"
                    );
                    defaults
                }
            },
            Ok(None) => defaults,
            Err(e) => {
                warn!(
                    path = %config_store.path().display(),
                    error = %e,
                    "failed to load statistical config, using defaults"
                );
                defaults
            }
        };
        let data = data_store.load_or_default().await;

        info!(
            enabled = config.enabled,
            timeframe = %config.selected_timeframe,
            timeframes = data.timeframes().count(),
            "statistical decision manager opened"
        );

        Self {
            config_store,
            data_store,
            config: RwLock::new(Arc::new(config)),
            data: RwLock::new(data),
            calculators: DashMap::new(),
        }
    }

    // ==================== Ingestion ====================

    /// Record one closed trade and persist before returning.
    ///
    /// A trade whose R-multiple is non-finite, or that would overflow the
    /// pattern's counters, is dropped with a warning and the current
    /// statistics are returned unchanged.
    pub async fn record_outcome(
        &self,
        timeframe: Timeframe,
        pattern: &str,
        is_win: bool,
        r_multiple: f64,
    ) -> PatternLookup {
        let mut data = self.data.write().await;
        let recorded = data
            .record(
                timeframe,
                pattern,
                TradeOutcome::from_win(is_win),
                r_multiple,
                Utc::now(),
            )
            .cloned();
        let Some(stats) = recorded else {
            warn!(%timeframe, pattern, r_multiple, "ignoring trade with out-of-range R-multiple");
            return data.lookup(timeframe, pattern);
        };

        if let Err(e) = self.data_store.save(&data).await {
            error!(%timeframe, pattern, error = %e, "failed to persist statistics");
        }

        debug!(
            %timeframe,
            pattern,
            is_win,
            r_multiple,
            wins = stats.wins,
            losses = stats.losses,
            "recorded trade outcome"
        );
        PatternLookup::Present(stats)
    }

    /// Drop a pattern's statistics and trade records. Returns false (and
    /// writes nothing) when the pattern had no data.
    pub async fn reset_pattern(&self, timeframe: Timeframe, pattern: &str) -> bool {
        let mut data = self.data.write().await;
        if !data.reset_pattern(timeframe, pattern) {
            debug!(%timeframe, pattern, "reset skipped, no data");
            return false;
        }
        if let Err(e) = self.data_store.save(&data).await {
            error!(%timeframe, pattern, error = %e, "failed to persist statistics after reset");
        }
        info!(%timeframe, pattern, "pattern statistics reset");
        true
    }

    // ==================== Reads ====================

    pub async fn get_pattern_statistics(&self, timeframe: Timeframe, pattern: &str) -> PatternLookup {
        self.data.read().await.lookup(timeframe, pattern)
    }

    /// Memoized calculator for (timeframe, kind). Every call returns a handle
    /// to the same instance.
    pub fn get_calculator(&self, timeframe: Timeframe, kind: CalculatorKind) -> Calculator {
        self.calculators
            .entry((timeframe, kind))
            .or_insert_with(|| {
                debug!(%timeframe, %kind, "creating calculator");
                Calculator::new(timeframe, kind)
            })
            .clone()
    }

    pub async fn config(&self) -> Arc<StatisticalConfig> {
        self.config.read().await.clone()
    }

    pub async fn is_enabled(&self) -> bool {
        self.config.read().await.enabled
    }

    // ==================== Config setters ====================

    pub async fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.update_config(|cfg| {
            cfg.enabled = enabled;
            Ok(())
        })
        .await
    }

    pub async fn set_timeframe(&self, timeframe: &str) -> Result<()> {
        let timeframe: Timeframe = timeframe.parse()?;
        self.update_config(|cfg| {
            cfg.selected_timeframe = timeframe;
            Ok(())
        })
        .await
    }

    pub async fn set_prior(&self, alpha: f64, beta: f64) -> Result<()> {
        self.update_config(|cfg| {
            validate_prior(alpha, beta)?;
            cfg.bayesian_prior_alpha = alpha;
            cfg.bayesian_prior_beta = beta;
            Ok(())
        })
        .await
    }

    pub async fn set_confidence_level(&self, level: f64) -> Result<()> {
        self.update_config(|cfg| {
            validate_confidence_level(level)?;
            cfg.confidence_level = level;
            Ok(())
        })
        .await
    }

    pub async fn set_max_kelly_fraction(&self, cap: f64) -> Result<()> {
        self.update_config(|cfg| {
            validate_kelly_cap(cap)?;
            cfg.max_kelly_fraction = cap;
            Ok(())
        })
        .await
    }

    pub async fn set_use_half_kelly(&self, half: bool) -> Result<()> {
        self.update_config(|cfg| {
            cfg.use_half_kelly = half;
            Ok(())
        })
        .await
    }

    /// Apply `change` to a copy of the current snapshot. On success the copy
    /// becomes the new snapshot and is persisted; on error nothing changes.
    async fn update_config<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut StatisticalConfig) -> Result<()>,
    {
        let mut current = self.config.write().await;
        let mut next = StatisticalConfig::clone(&current);
        change(&mut next)?;
        next.validate()?;

        if next == **current {
            return Ok(());
        }

        *current = Arc::new(next);
        if let Err(e) = self.config_store.save(&current).await {
            error!(error = %e, "failed to persist statistical config");
        }
        info!(
            enabled = current.enabled,
            timeframe = %current.selected_timeframe,
            prior_alpha = current.bayesian_prior_alpha,
            prior_beta = current.bayesian_prior_beta,
            confidence_level = current.confidence_level,
            max_kelly = current.max_kelly_fraction,
            half_kelly = current.use_half_kelly,
            "statistical config updated"
        );
        Ok(())
    }

    // ==================== Calculator queries ====================

    pub async fn pattern_probability(&self, timeframe: Timeframe, pattern: &str) -> PatternProbability {
        let calc = self.bayesian(timeframe);
        let config = self.config().await;
        let data = self.data.read().await;
        let ctx = QueryContext::new(data.timeframe(timeframe), &config);
        calc.get_pattern_probability(&ctx, pattern)
    }

    pub async fn learning_curve(&self, timeframe: Timeframe, pattern: &str) -> Vec<LearningPoint> {
        let calc = self.bayesian(timeframe);
        let config = self.config().await;
        let data = self.data.read().await;
        let ctx = QueryContext::new(data.timeframe(timeframe), &config);
        calc.get_learning_curve(&ctx, pattern)
    }

    pub async fn should_trade(
        &self,
        timeframe: Timeframe,
        pattern: &str,
        min_probability: f64,
    ) -> TradeDecision {
        let calc = self.bayesian(timeframe);
        let config = self.config().await;
        let data = self.data.read().await;
        let ctx = QueryContext::new(data.timeframe(timeframe), &config);
        calc.should_trade(&ctx, pattern, min_probability)
    }

    pub async fn comprehensive_analysis(
        &self,
        timeframe: Timeframe,
        pattern: &str,
    ) -> ComprehensiveAnalysis {
        let calc = self.confidence(timeframe);
        let config = self.config().await;
        let data = self.data.read().await;
        let ctx = QueryContext::new(data.timeframe(timeframe), &config);
        calc.get_comprehensive_analysis(&ctx, pattern)
    }

    pub async fn kelly(&self, timeframe: Timeframe, pattern: &str) -> KellyResult {
        let calc = self.kelly_calculator(timeframe);
        let config = self.config().await;
        let data = self.data.read().await;
        let ctx = QueryContext::new(data.timeframe(timeframe), &config);
        calc.calculate(&ctx, pattern)
    }

    pub async fn confluence(&self, timeframe: Timeframe, opportunity: &Opportunity) -> ConfluenceResult {
        let calc = self.confluence_calculator(timeframe);
        let config = self.config().await;
        let data = self.data.read().await;
        let ctx = QueryContext::new(data.timeframe(timeframe), &config);
        calc.analyze(&ctx, opportunity)
    }

    /// Headline result of one calculator kind, dispatched through the
    /// memoized instance.
    pub async fn evaluate(
        &self,
        timeframe: Timeframe,
        kind: CalculatorKind,
        opportunity: &Opportunity,
    ) -> CalculatorOutput {
        let calc = self.get_calculator(timeframe, kind);
        let config = self.config().await;
        let data = self.data.read().await;
        let ctx = QueryContext::new(data.timeframe(timeframe), &config);
        calc.evaluate(&ctx, opportunity)
    }

    // ==================== Scoring ====================

    /// Bayesian, confluence and Kelly view of an opportunity. `None` while the
    /// engine is disabled.
    pub async fn get_enhanced_score(
        &self,
        timeframe: Timeframe,
        opportunity: &Opportunity,
    ) -> Option<EnhancedScore> {
        let config = self.config().await;
        if !config.enabled {
            debug!(%timeframe, pattern = %opportunity.pattern, "engine disabled, no score");
            return None;
        }

        let bayesian = self.bayesian(timeframe);
        let confluence = self.confluence_calculator(timeframe);
        let kelly = self.kelly_calculator(timeframe);

        let data = self.data.read().await;
        let ctx = QueryContext::new(data.timeframe(timeframe), &config);

        let probability = bayesian.get_pattern_probability(&ctx, &opportunity.pattern);
        let decision = bayesian.should_trade(&ctx, &opportunity.pattern, POSTERIOR_GATE);
        let confluence = confluence.analyze(&ctx, opportunity);
        let kelly = kelly.calculate(&ctx, &opportunity.pattern);
        drop(data);

        let should_trade =
            confluence.should_trade && decision.reason != DecisionReason::BelowThreshold;

        debug!(
            %timeframe,
            pattern = %opportunity.pattern,
            posterior = probability.posterior_mean,
            final_probability = confluence.final_probability,
            should_trade,
            "enhanced score"
        );

        Some(EnhancedScore {
            timeframe,
            pattern: opportunity.pattern.clone(),
            final_probability: confluence.final_probability,
            probability,
            decision,
            confluence,
            kelly,
            should_trade,
        })
    }

    /// Kelly-based risk percent for an opportunity. `None` while disabled.
    pub async fn get_optimal_position_size(
        &self,
        timeframe: Timeframe,
        opportunity: &Opportunity,
        base_risk_percent: f64,
    ) -> Option<PositionSizing> {
        let config = self.config().await;
        if !config.enabled {
            debug!(%timeframe, pattern = %opportunity.pattern, "engine disabled, no sizing");
            return None;
        }

        let calc = self.kelly_calculator(timeframe);
        let data = self.data.read().await;
        let ctx = QueryContext::new(data.timeframe(timeframe), &config);
        Some(calc.calculate_position_size(&ctx, opportunity, base_risk_percent))
    }

    // ==================== Reporting ====================

    /// Every pattern of a timeframe, best posterior mean first.
    pub async fn pattern_summaries(&self, timeframe: Timeframe) -> Vec<PatternSummary> {
        let calc = self.bayesian(timeframe);
        let config = self.config().await;
        let data = self.data.read().await;
        let ctx = QueryContext::new(data.timeframe(timeframe), &config);

        let mut rows: Vec<PatternSummary> = ctx
            .patterns()
            .map(|(name, stats)| PatternSummary {
                pattern: name.clone(),
                wins: stats.wins,
                losses: stats.losses,
                win_rate: stats.win_rate(),
                expected_value: stats.expected_value(),
                total_r: stats.total_r,
                posterior_mean: calc.get_pattern_probability(&ctx, name).posterior_mean,
            })
            .collect();

        rows.sort_by(|a, b| {
            b.posterior_mean
                .total_cmp(&a.posterior_mean)
                .then_with(|| a.pattern.cmp(&b.pattern))
        });
        rows
    }

    pub async fn timeframe_overview(&self, timeframe: Timeframe) -> TimeframeOverview {
        let data = self.data.read().await;
        let mut overview = TimeframeOverview {
            timeframe,
            ..TimeframeOverview::default()
        };
        if let Some(tf) = data.timeframe(timeframe) {
            for stats in tf.patterns.values() {
                overview.patterns += 1;
                overview.trades += stats.total_trades();
                overview.wins += stats.wins;
                overview.losses += stats.losses;
                overview.total_r += stats.total_r;
            }
        }
        overview
    }

    // ==================== Lifecycle ====================

    /// Flush both documents and release the manager.
    pub async fn close(self) -> Result<()> {
        let config = self.config.read().await.clone();
        let data = self.data.read().await;

        let config_result = self.config_store.save(&config).await;
        if let Err(e) = &config_result {
            error!(error = %e, "failed to flush statistical config on close");
        }
        let data_result = self.data_store.save(&data).await;
        if let Err(e) = &data_result {
            error!(error = %e, "failed to flush statistics on close");
        }
        info!("statistical decision manager closed");

        config_result.and(data_result)
    }

    // Typed calculator handles. The cache only ever stores the variant that
    // matches its key, so the fallbacks below never build a second instance.

    fn bayesian(&self, timeframe: Timeframe) -> Arc<BayesianPatternLearner> {
        match self.get_calculator(timeframe, CalculatorKind::Bayesian) {
            Calculator::Bayesian(c) => c,
            _ => Arc::new(BayesianPatternLearner::new(timeframe)),
        }
    }

    fn confidence(&self, timeframe: Timeframe) -> Arc<ConfidenceIntervalAnalyzer> {
        match self.get_calculator(timeframe, CalculatorKind::ConfidenceInterval) {
            Calculator::ConfidenceInterval(c) => c,
            _ => Arc::new(ConfidenceIntervalAnalyzer::new(timeframe)),
        }
    }

    fn kelly_calculator(&self, timeframe: Timeframe) -> Arc<KellyCriterionCalculator> {
        match self.get_calculator(timeframe, CalculatorKind::Kelly) {
            Calculator::Kelly(c) => c,
            _ => Arc::new(KellyCriterionCalculator::new(timeframe)),
        }
    }

    fn confluence_calculator(&self, timeframe: Timeframe) -> Arc<ProbabilisticConfluenceCalculator> {
        match self.get_calculator(timeframe, CalculatorKind::Confluence) {
            Calculator::Confluence(c) => c,
            _ => Arc::new(ProbabilisticConfluenceCalculator::new(timeframe)),
        }
    }
}
