//! Weighted Average Cost of Capital (WACC).
//!
//! ```text
//! k_e  = r_f + β × MRP
//! k_d  = |Interest Expense| / Total Debt
//! WACC = k_e × w_e + k_d × (1 - t) × w_d
//! ```
//!
//! Each input falls back to a documented default on its own. Only a missing
//! base metric set aborts the estimate.

use super::{
    beta::{BetaConfig, BetaEstimate, BetaSource, estimate_beta},
    premium::{PremiumConfig, estimate_market_risk_premium},
    tax::{TAX_RATE_BAND, effective_tax_rate},
};
use crate::{
    Result, ValuationError,
    metrics::{Metric, MetricSet, MetricSnapshot},
    numeric::{Resolved, SanityBand, ratio},
    registry::EstimatorStage,
    source::MarketDataSource,
    traits::{ConfigurableEstimator, Estimator},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Configuration for the WACC estimator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaccConfig {
    /// Index used for beta regression and the market return.
    pub market_index: String,
    /// Risk-free rate used when no yield is available.
    pub risk_free_fallback: f64,
    /// Beta estimation.
    pub beta: BetaConfig,
    /// Market risk premium estimation.
    pub premium: PremiumConfig,
    /// Accepted range and default for the pre-tax cost of debt.
    pub cost_of_debt: SanityBand,
    /// Accepted range and default for the effective tax rate.
    pub tax_rate: SanityBand,
    /// Equity weight used when the capital structure is unusable.
    pub fallback_equity_weight: f64,
}

impl Default for WaccConfig {
    fn default() -> Self {
        Self {
            market_index: "^GSPC".to_string(),
            risk_free_fallback: 0.035,
            beta: BetaConfig::default(),
            premium: PremiumConfig::default(),
            cost_of_debt: SanityBand::new(0.0, 1.0, 0.045),
            tax_rate: TAX_RATE_BAND,
            fallback_equity_weight: 0.5,
        }
    }
}

/// CAPM cost of equity and its inputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostOfEquity {
    /// Required return on equity
    pub cost_of_equity: f64,
    /// Risk-free rate
    pub risk_free_rate: f64,
    /// Market risk premium
    pub market_risk_premium: f64,
    /// Beta
    pub beta: f64,
    /// Where the beta came from
    pub beta_source: BetaSource,
    /// Inputs replaced by defaults
    pub fallbacks: Vec<String>,
}

/// WACC and its components.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaccResult {
    /// Weighted average cost of capital
    pub wacc: f64,
    /// Cost of equity
    pub cost_of_equity: f64,
    /// Pre-tax cost of debt
    pub cost_of_debt: f64,
    /// Equity share of book capital
    pub equity_weight: f64,
    /// Debt share of book capital
    pub debt_weight: f64,
    /// Risk-free rate
    pub risk_free_rate: f64,
    /// Market risk premium
    pub market_risk_premium: f64,
    /// Beta
    pub beta: f64,
    /// Where the beta came from
    pub beta_source: BetaSource,
    /// Effective tax rate
    pub effective_tax_rate: f64,
    /// Inputs replaced by defaults
    pub fallbacks: Vec<String>,
}

/// Weighted Average Cost of Capital estimator.
#[derive(Debug, Clone, Default)]
pub struct WaccEstimator {
    config: WaccConfig,
}

const REQUIRED: [Metric; 2] = [Metric::TotalEquity, Metric::TotalLiabilities];

impl WaccEstimator {
    /// Create a WACC estimator with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// CAPM cost of equity for `ticker` as of `as_of`.
    pub fn cost_of_equity(
        &self,
        ticker: &str,
        market: &dyn MarketDataSource,
        as_of: NaiveDate,
    ) -> CostOfEquity {
        let mut fallbacks = Vec::new();

        let risk_free_rate = match market.risk_free_rate(as_of) {
            Ok(rate) => rate,
            Err(e) => {
                warn!(error = %e, fallback = self.config.risk_free_fallback, "risk-free rate unavailable, using default");
                fallbacks.push("risk_free_rate".to_string());
                self.config.risk_free_fallback
            }
        };

        let premium = estimate_market_risk_premium(
            market,
            &self.config.market_index,
            as_of,
            &self.config.premium,
        );
        if premium.defaulted {
            fallbacks.push("market_risk_premium".to_string());
        }

        let BetaEstimate { beta, source } = estimate_beta(
            market,
            ticker,
            &self.config.market_index,
            as_of,
            &self.config.beta,
        );
        if source == BetaSource::Default {
            fallbacks.push("beta".to_string());
        }

        let cost_of_equity = risk_free_rate + beta * premium.value;
        debug!(cost_of_equity, risk_free_rate, beta, premium = premium.value, "cost of equity");
        CostOfEquity {
            cost_of_equity,
            risk_free_rate,
            market_risk_premium: premium.value,
            beta,
            beta_source: source,
            fallbacks,
        }
    }

    /// Estimate WACC from the most recent period of `metrics`.
    pub fn estimate(
        &self,
        ticker: &str,
        metrics: &MetricSet,
        market: &dyn MarketDataSource,
        as_of: NaiveDate,
    ) -> Result<WaccResult> {
        let current = metrics.snapshot(0);
        if current.is_empty() {
            return Err(ValuationError::InsufficientHistory {
                required: 1,
                available: 0,
            });
        }

        let tax = effective_tax_rate(&current, &self.config.tax_rate);
        let equity = self.cost_of_equity(ticker, market, as_of);
        let debt = self.cost_of_debt(&current);
        let (equity_weight, debt_weight, weights_defaulted) = self.capital_structure(&current);

        let mut fallbacks = equity.fallbacks;
        for (name, defaulted) in [
            ("effective_tax_rate", tax.defaulted),
            ("cost_of_debt", debt.defaulted),
            ("capital_structure", weights_defaulted),
        ] {
            if defaulted {
                fallbacks.push(name.to_string());
            }
        }

        let wacc = equity.cost_of_equity * equity_weight
            + debt.value * (1.0 - tax.value) * debt_weight;
        debug!(wacc, equity_weight, cost_of_debt = debt.value, "wacc estimated");

        Ok(WaccResult {
            wacc,
            cost_of_equity: equity.cost_of_equity,
            cost_of_debt: debt.value,
            equity_weight,
            debt_weight,
            risk_free_rate: equity.risk_free_rate,
            market_risk_premium: equity.market_risk_premium,
            beta: equity.beta,
            beta_source: equity.beta_source,
            effective_tax_rate: tax.value,
            fallbacks,
        })
    }

    /// `|interest expense| / total debt`; the default when either is
    /// missing or debt is zero.
    fn cost_of_debt(&self, current: &MetricSnapshot) -> Resolved {
        let raw = match (
            current.get(Metric::InterestExpense),
            current.get(Metric::TotalDebt),
        ) {
            (Some(interest), Some(debt)) => ratio(interest.abs(), debt),
            _ => None,
        };
        self.config.cost_of_debt.resolve("cost_of_debt", raw)
    }

    /// Book-value weights `(equity, debt, defaulted)`.
    fn capital_structure(&self, current: &MetricSnapshot) -> (f64, f64, bool) {
        let weights = match (
            current.get(Metric::TotalEquity),
            current.get(Metric::TotalLiabilities),
        ) {
            (Some(equity), Some(debt)) if equity >= 0.0 && debt >= 0.0 => ratio(equity, equity + debt),
            _ => None,
        };
        match weights {
            Some(equity_weight) => (equity_weight, 1.0 - equity_weight, false),
            None => {
                let fallback = self.config.fallback_equity_weight;
                warn!(fallback, "capital structure unusable, using default weights");
                (fallback, 1.0 - fallback, true)
            }
        }
    }
}

impl Estimator for WaccEstimator {
    fn name(&self) -> &str {
        "wacc"
    }

    fn description(&self) -> &str {
        "Weighted average cost of capital - CAPM cost of equity blended with after-tax cost of debt"
    }

    fn stage(&self) -> EstimatorStage {
        EstimatorStage::CostOfCapital
    }

    fn required_metrics(&self) -> &[Metric] {
        &REQUIRED
    }
}

impl ConfigurableEstimator for WaccEstimator {
    type Config = WaccConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeSource, as_of, date, sample_metrics};
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn snapshot(values: &[(Metric, f64)]) -> MetricSnapshot {
        let mut snapshot = MetricSnapshot::new(0);
        for (metric, value) in values {
            snapshot.insert(*metric, date(2024, 12, 31), *value);
        }
        snapshot
    }

    #[test]
    fn test_wacc_metadata() {
        let estimator = WaccEstimator::new();
        assert_eq!(estimator.name(), "wacc");
        assert_eq!(estimator.stage(), EstimatorStage::CostOfCapital);
        assert_eq!(estimator.config().market_index, "^GSPC");
    }

    #[test]
    fn test_wacc_computation() {
        let source = FakeSource::new();
        let result = WaccEstimator::new()
            .estimate("ACME", &sample_metrics(), &source, as_of())
            .unwrap();

        // k_e = 0.03 + 1.2 * 0.05
        assert_relative_eq!(result.cost_of_equity, 0.09, epsilon = 1e-12);
        // 12 / 300
        assert_relative_eq!(result.cost_of_debt, 0.04, epsilon = 1e-12);
        // 1000 / (1000 + 600)
        assert_relative_eq!(result.equity_weight, 0.625, epsilon = 1e-12);
        assert_relative_eq!(result.effective_tax_rate, 0.2, epsilon = 1e-12);
        assert_relative_eq!(
            result.wacc,
            0.09 * 0.625 + 0.04 * 0.8 * 0.375,
            epsilon = 1e-12
        );
        assert_eq!(result.beta_source, BetaSource::Vendor);
        assert!(result.fallbacks.is_empty());
    }

    #[rstest]
    #[case(1000.0, 600.0)]
    #[case(1.0, 2.0)]
    #[case(0.0, 5.0)]
    #[case(123_456.789, 0.001)]
    #[case(7.0, 0.0)]
    fn test_weights_sum_to_one(#[case] equity: f64, #[case] liabilities: f64) {
        let estimator = WaccEstimator::new();
        let (we, wd, defaulted) = estimator.capital_structure(&snapshot(&[
            (Metric::TotalEquity, equity),
            (Metric::TotalLiabilities, liabilities),
        ]));
        assert!(!defaulted);
        assert_relative_eq!(we + wd, 1.0, epsilon = 1e-15);
    }

    #[rstest]
    #[case(&[(Metric::TotalEquity, -100.0), (Metric::TotalLiabilities, 50.0)])]
    #[case(&[(Metric::TotalEquity, 0.0), (Metric::TotalLiabilities, 0.0)])]
    #[case(&[(Metric::TotalEquity, 100.0)])]
    fn test_unusable_structure_defaults(#[case] values: &[(Metric, f64)]) {
        let (we, wd, defaulted) = WaccEstimator::new().capital_structure(&snapshot(values));
        assert!(defaulted);
        assert_eq!((we, wd), (0.5, 0.5));
    }

    #[rstest]
    #[case(&[(Metric::InterestExpense, -12.0), (Metric::TotalDebt, 300.0)], 0.04, false)]
    #[case(&[(Metric::InterestExpense, -12.0), (Metric::TotalDebt, 0.0)], 0.045, true)]
    #[case(&[(Metric::TotalDebt, 300.0)], 0.045, true)]
    #[case(&[(Metric::InterestExpense, -12.0)], 0.045, true)]
    #[case(&[(Metric::InterestExpense, -450.0), (Metric::TotalDebt, 300.0)], 0.045, true)]
    #[case(&[(Metric::InterestExpense, -12.0), (Metric::TotalDebt, -300.0)], 0.045, true)]
    fn test_cost_of_debt(#[case] values: &[(Metric, f64)], #[case] expected: f64, #[case] defaulted: bool) {
        let debt = WaccEstimator::new().cost_of_debt(&snapshot(values));
        assert_relative_eq!(debt.value, expected, epsilon = 1e-12);
        assert_eq!(debt.defaulted, defaulted);
    }

    #[test]
    fn test_tax_rate_out_of_range_replaced() {
        let mut source = FakeSource::new();
        // Tax provision exceeds pretax income in every year
        source.statements.income = polars::df![
            "date" => ["2023-12-31", "2024-12-31"],
            "EBIT" => [100.0, 100.0],
            "EBITDA" => [120.0, 120.0],
            "Tax Provision" => [150.0, 150.0],
            "Pretax Income" => [100.0, 100.0],
            "Net Income" => [50.0, 50.0],
        ]
        .unwrap();
        let metrics = MetricSet::extract(&source.statements).unwrap();

        let result = WaccEstimator::new()
            .estimate("ACME", &metrics, &source, as_of())
            .unwrap();
        assert_eq!(result.effective_tax_rate, 0.22);
        assert!(result.fallbacks.contains(&"effective_tax_rate".to_string()));
        // No interest expense reported either
        assert_eq!(result.cost_of_debt, 0.045);
    }

    #[test]
    fn test_market_failures_fall_back_independently() {
        let mut source = FakeSource::new();
        source.risk_free_rate = None;
        source.vendor_beta = None;

        let result = WaccEstimator::new()
            .estimate("ACME", &sample_metrics(), &source, as_of())
            .unwrap();
        assert_eq!(result.risk_free_rate, 0.035);
        assert_eq!(result.beta, 1.0);
        assert_eq!(result.market_risk_premium, 0.06);
        assert_relative_eq!(result.cost_of_equity, 0.035 + 0.06, epsilon = 1e-12);
        assert_eq!(
            result.fallbacks,
            vec!["risk_free_rate", "market_risk_premium", "beta"]
        );
    }

    #[test]
    fn test_custom_index() {
        let config = WaccConfig {
            market_index: "^KS11".to_string(),
            ..WaccConfig::default()
        };
        let source = FakeSource::new();
        let result = WaccEstimator::with_config(config)
            .estimate("ACME", &sample_metrics(), &source, as_of())
            .unwrap();
        // No ^KS11 prices in the fixture
        assert_eq!(result.market_risk_premium, 0.06);
    }
}
