//! Firm-level growth - reinvestment rate times return on invested capital.
//!
//! ```text
//! Reinvestment = (CapEx + ΔWorking Capital) / Net Income
//! ROIC         = EBIT × (1 - t) / Invested Capital
//! g            = Reinvestment × ROIC
//! ```
//!
//! Working capital here is current assets less current liabilities,
//! including cash.

use crate::{
    Result, ValuationError,
    cost_of_capital::tax::{TAX_RATE_BAND, effective_tax_rate},
    metrics::{Metric, MetricSet},
    numeric::{SanityBand, mean, ratio},
    registry::EstimatorStage,
    traits::{ConfigurableEstimator, Estimator},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Configuration for firm growth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FirmGrowthConfig {
    /// Accepted range and default for the reinvestment rate.
    pub reinvestment: SanityBand,
    /// Accepted range and default for ROIC.
    pub roic: SanityBand,
    /// Accepted range and default for the effective tax rate.
    pub tax_rate: SanityBand,
    /// Per-period growth rates with a larger magnitude are left out of the
    /// multi-year average.
    pub growth_limit: f64,
}

impl Default for FirmGrowthConfig {
    fn default() -> Self {
        Self {
            reinvestment: SanityBand::new(-100.0, 100.0, 0.5),
            roic: SanityBand::new(-0.5, 0.5, 0.1),
            tax_rate: TAX_RATE_BAND,
            growth_limit: 1.0,
        }
    }
}

/// Inputs behind one firm growth estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthComponents {
    /// Capital expenditure
    pub capital_expenditure: f64,
    /// Change in working capital versus the prior period
    pub change_in_working_capital: f64,
    /// Net income
    pub net_income: f64,
    /// EBITDA
    pub ebitda: f64,
    /// Tax provision
    pub tax_provision: f64,
    /// Invested capital, or total assets when not reported
    pub invested_capital: f64,
    /// Net operating profit less adjusted taxes
    pub noplat: f64,
    /// Effective tax rate applied to EBIT
    pub effective_tax_rate: f64,
}

/// Growth for one period against the period before it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FirmGrowthResult {
    /// Period-end date of the current period
    pub period_end: NaiveDate,
    /// Growth rate
    pub growth: f64,
    /// Reinvestment rate
    pub reinvestment_rate: f64,
    /// Return on invested capital
    pub roic: f64,
    /// Components
    pub components: GrowthComponents,
}

/// One period's contribution to the multi-year average.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodGrowth {
    /// Period-end date
    pub period_end: NaiveDate,
    /// Growth rate
    pub growth: f64,
    /// Reinvestment rate
    pub reinvestment_rate: f64,
    /// Return on invested capital
    pub roic: f64,
    /// Whether the growth passed the magnitude filter
    pub included: bool,
}

/// Multi-year average firm growth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AverageGrowthResult {
    /// Mean of the included per-period growth rates (0 when none survive)
    pub average_growth: f64,
    /// Every computed period, most recent first
    pub periods: Vec<PeriodGrowth>,
    /// Number of periods that entered the average
    pub periods_used: usize,
}

/// Firm growth estimator.
#[derive(Debug, Clone, Default)]
pub struct FirmGrowthEstimator {
    config: FirmGrowthConfig,
}

const REQUIRED: [Metric; 7] = [
    Metric::Ebit,
    Metric::Ebitda,
    Metric::TaxProvision,
    Metric::NetIncome,
    Metric::CapitalExpenditure,
    Metric::CurrentAssets,
    Metric::CurrentLiabilities,
];

impl FirmGrowthEstimator {
    /// Create a firm growth estimator with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Growth of the most recent period against the previous one.
    pub fn estimate(&self, metrics: &MetricSet) -> Result<FirmGrowthResult> {
        let available = metrics.available_periods(&REQUIRED)?;
        if available < 2 {
            return Err(ValuationError::InsufficientHistory {
                required: 2,
                available,
            });
        }
        self.estimate_at(metrics, 0)
    }

    /// Average growth over up to `years` periods.
    ///
    /// `n` periods give `n - 1` consecutive pairs. Pairs whose growth falls
    /// outside `±growth_limit` are reported but not averaged.
    pub fn estimate_average(&self, metrics: &MetricSet, years: usize) -> Result<AverageGrowthResult> {
        let available = metrics.available_periods(&REQUIRED)?;
        let periods = years.min(available);
        if periods < 2 {
            return Err(ValuationError::InsufficientHistory {
                required: 2,
                available: periods,
            });
        }

        let mut results = Vec::with_capacity(periods - 1);
        for lag in 0..periods - 1 {
            let single = self.estimate_at(metrics, lag)?;
            let included = single.growth.abs() <= self.config.growth_limit;
            if !included {
                warn!(period = %single.period_end, growth = single.growth, "growth outside filter, excluded from average");
            }
            results.push(PeriodGrowth {
                period_end: single.period_end,
                growth: single.growth,
                reinvestment_rate: single.reinvestment_rate,
                roic: single.roic,
                included,
            });
        }

        let kept: Vec<f64> = results.iter().filter(|p| p.included).map(|p| p.growth).collect();
        let average_growth = mean(&kept).unwrap_or(0.0);
        debug!(average_growth, periods_used = kept.len(), "average firm growth");

        Ok(AverageGrowthResult {
            average_growth,
            periods_used: kept.len(),
            periods: results,
        })
    }

    fn estimate_at(&self, metrics: &MetricSet, lag: usize) -> Result<FirmGrowthResult> {
        let current = metrics.snapshot(lag);
        let value = |metric: Metric, at: usize| metrics.value(metric, at);

        let working_capital =
            |at: usize| -> Result<f64> { Ok(value(Metric::CurrentAssets, at)? - value(Metric::CurrentLiabilities, at)?) };
        let change_in_working_capital = working_capital(lag)? - working_capital(lag + 1)?;

        let capital_expenditure = value(Metric::CapitalExpenditure, lag)?;
        let net_income = value(Metric::NetIncome, lag)?;
        let reinvestment_rate = match ratio(capital_expenditure + change_in_working_capital, net_income) {
            Some(raw) => self.config.reinvestment.resolve("reinvestment_rate", Some(raw)).value,
            None => {
                debug!(lag, "net income is zero, reinvestment rate set to 0");
                0.0
            }
        };

        let tax = effective_tax_rate(&current, &self.config.tax_rate);
        let noplat = value(Metric::Ebit, lag)? * (1.0 - tax.value);
        let invested_capital = match current.get(Metric::InvestedCapital) {
            Some(ic) => ic,
            None => {
                debug!(lag, "invested capital not reported, using total assets");
                value(Metric::TotalAssets, lag)?
            }
        };
        let roic = match ratio(noplat, invested_capital) {
            Some(raw) => self.config.roic.resolve("roic", Some(raw)).value,
            None => {
                debug!(lag, "invested capital is zero, roic set to 0");
                0.0
            }
        };

        let growth = reinvestment_rate * roic;
        let period_end = current
            .date
            .ok_or_else(|| ValuationError::Computation(format!("no period at lag {lag}")))?;
        debug!(%period_end, growth, reinvestment_rate, roic, "firm growth");

        Ok(FirmGrowthResult {
            period_end,
            growth,
            reinvestment_rate,
            roic,
            components: GrowthComponents {
                capital_expenditure,
                change_in_working_capital,
                net_income,
                ebitda: value(Metric::Ebitda, lag)?,
                tax_provision: value(Metric::TaxProvision, lag)?,
                invested_capital,
                noplat,
                effective_tax_rate: tax.value,
            },
        })
    }
}

impl Estimator for FirmGrowthEstimator {
    fn name(&self) -> &str {
        "firm_growth"
    }

    fn description(&self) -> &str {
        "Operating growth - reinvestment rate times return on invested capital"
    }

    fn stage(&self) -> EstimatorStage {
        EstimatorStage::Growth
    }

    fn required_metrics(&self) -> &[Metric] {
        &REQUIRED
    }

    fn min_periods(&self) -> usize {
        2
    }
}

impl ConfigurableEstimator for FirmGrowthEstimator {
    type Config = FirmGrowthConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}
