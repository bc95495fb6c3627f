//! Shareholder-level growth - sustainable growth of net income.
//!
//! `g = (1 - payout) × ROE`, with ROE averaged over the window.

use crate::{
    Result, ValuationError,
    metrics::{Metric, MetricSet},
    numeric::{mean_defined, ratio},
    registry::EstimatorStage,
    traits::{ConfigurableEstimator, Estimator},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for shareholder growth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareholderGrowthConfig {
    /// Payout ratio assumed when the company reports none.
    pub default_payout_ratio: f64,
}

impl Default for ShareholderGrowthConfig {
    fn default() -> Self {
        Self {
            default_payout_ratio: 0.0,
        }
    }
}

/// Shareholder growth and its inputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareholderGrowthResult {
    /// Growth rate of net income
    pub growth: f64,
    /// Share of earnings retained
    pub retention_ratio: f64,
    /// Mean return on equity over the window
    pub roe: f64,
    /// Payout ratio used
    pub payout_ratio: f64,
    /// Effective window length
    pub periods: usize,
}

/// Shareholder growth estimator.
#[derive(Debug, Clone, Default)]
pub struct ShareholderGrowthEstimator {
    config: ShareholderGrowthConfig,
}

const REQUIRED: [Metric; 2] = [Metric::NetIncome, Metric::TotalEquity];

impl ShareholderGrowthEstimator {
    /// Create a shareholder growth estimator with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Estimate growth over the most recent `years` periods.
    ///
    /// Fails with `NonPositiveRoe` when the mean ROE is not positive, since
    /// the growth model is meaningless for a loss-making equity base.
    pub fn estimate(
        &self,
        metrics: &MetricSet,
        payout_ratio: Option<f64>,
        years: usize,
    ) -> Result<ShareholderGrowthResult> {
        let available = metrics.available_periods(&REQUIRED)?;
        if available == 0 {
            return Err(ValuationError::InsufficientHistory {
                required: 1,
                available,
            });
        }
        let periods = years.clamp(1, available);

        let mut roes = Vec::with_capacity(periods);
        for lag in 0..periods {
            let equity = metrics.value(Metric::TotalEquity, lag)?;
            let roe = ratio(metrics.value(Metric::NetIncome, lag)?, equity);
            if roe.is_none() {
                debug!(lag, "zero equity, period skipped");
            }
            roes.push(roe);
        }

        let roe = mean_defined(&roes).unwrap_or(0.0);
        if roe <= 0.0 {
            return Err(ValuationError::NonPositiveRoe(roe));
        }

        let payout_ratio = payout_ratio.unwrap_or(self.config.default_payout_ratio);
        let retention_ratio = 1.0 - payout_ratio;
        let growth = retention_ratio * roe;
        debug!(growth, roe, retention_ratio, periods, "shareholder growth");

        Ok(ShareholderGrowthResult {
            growth,
            retention_ratio,
            roe,
            payout_ratio,
            periods,
        })
    }
}

impl Estimator for ShareholderGrowthEstimator {
    fn name(&self) -> &str {
        "shareholder_growth"
    }

    fn description(&self) -> &str {
        "Sustainable equity growth - retention ratio times return on equity"
    }

    fn stage(&self) -> EstimatorStage {
        EstimatorStage::Growth
    }

    fn required_metrics(&self) -> &[Metric] {
        &REQUIRED
    }
}

impl ConfigurableEstimator for ShareholderGrowthEstimator {
    type Config = ShareholderGrowthConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}
