//! Valuation composer - runs the pipeline for each candidate window and
//! selects the best per-share value.
//!
//! Statements are fetched once and WACC is computed once per run. Every
//! window then gets its own FCFE mean and shareholder growth, and is either
//! valued or excluded with a reason. A window failing never aborts the run.

use super::dcf::{DcfInputs, discounted_value};
use crate::{
    Period, Result, ValuationError,
    cash_flow::FcfeEstimator,
    cost_of_capital::{WaccConfig, WaccEstimator, WaccResult},
    growth::{
        AverageGrowthResult, FirmGrowthConfig, FirmGrowthEstimator, ShareholderGrowthConfig,
        ShareholderGrowthEstimator,
    },
    metrics::{Metric, MetricSet},
    registry::EstimatorStage,
    source::{CompanyInfo, CompanyInfoSource, MarketDataSource, StatementSource},
    traits::{ConfigurableEstimator, Estimator},
};
use chrono::NaiveDate;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Rate used to discount projected FCFE.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountBasis {
    /// CAPM cost of equity
    #[default]
    #[display("cost_of_equity")]
    CostOfEquity,
    /// Weighted average cost of capital
    #[display("wacc")]
    Wacc,
}

/// Configuration for a valuation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationConfig {
    /// Explicitly projected periods
    pub horizon_years: usize,
    /// Perpetual growth after the horizon
    pub terminal_growth: f64,
    /// Exponent used to discount the terminal value (defaults to the horizon)
    pub terminal_discount_periods: Option<usize>,
    /// Rate used to discount FCFE
    pub discount_basis: DiscountBasis,
    /// Candidate averaging windows in periods
    pub windows: Vec<usize>,
    /// Cost of capital
    pub wacc: WaccConfig,
    /// Firm growth cross-check
    pub firm_growth: FirmGrowthConfig,
    /// Shareholder growth
    pub shareholder_growth: ShareholderGrowthConfig,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            horizon_years: 5,
            terminal_growth: 0.01,
            terminal_discount_periods: None,
            discount_basis: DiscountBasis::default(),
            windows: vec![1, 2, 3, 4],
            wacc: WaccConfig::default(),
            firm_growth: FirmGrowthConfig::default(),
            shareholder_growth: ShareholderGrowthConfig::default(),
        }
    }
}

impl ValuationConfig {
    fn terminal_exponent(&self) -> usize {
        self.terminal_discount_periods.unwrap_or(self.horizon_years)
    }

    /// Windows in ascending order without duplicates.
    fn sorted_windows(&self) -> Result<Vec<usize>> {
        let mut windows = self.windows.clone();
        windows.sort_unstable();
        windows.dedup();
        match windows.first().copied() {
            None => Err(ValuationError::Computation("no candidate windows configured".to_string())),
            Some(0) => Err(ValuationError::Computation(
                "candidate windows must be at least one period".to_string(),
            )),
            Some(_) => Ok(windows),
        }
    }
}

/// Per-share value for one candidate window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationResult {
    /// Averaging window requested
    pub years: usize,
    /// Intrinsic value per share
    pub per_share: f64,
    /// Mean FCFE over the window
    pub fcfe: f64,
    /// Periods actually averaged
    pub fcfe_periods: usize,
    /// Discount rate applied
    pub discount_rate: f64,
    /// Growth over the explicit horizon
    pub growth: f64,
    /// Perpetual growth after the horizon
    pub terminal_growth: f64,
    /// Projected FCFE for each horizon year
    pub projected: Vec<f64>,
    /// Present value of the projected flows
    pub present_value_explicit: f64,
    /// Terminal value at the horizon
    pub terminal_value: f64,
    /// Present value of the terminal value
    pub present_value_terminal: f64,
    /// Equity value
    pub equity_value: f64,
    /// Shares outstanding
    pub shares_outstanding: f64,
    /// Mean capex / operating cash flow
    pub capex_to_ocf: Option<f64>,
    /// Mean repayment / issuance of debt
    pub repayment_to_issuance: Option<f64>,
    /// Retention ratio
    pub retention_ratio: f64,
    /// Mean return on equity
    pub roe: f64,
}

/// Outcome of one candidate window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// Averaging window
    pub years: usize,
    /// Valuation, when feasible
    pub value: Option<ValuationResult>,
    /// Why the window was excluded
    pub excluded_because: Option<String>,
}

/// How the reported candidate was chosen.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionRule {
    /// Smallest distance to the last close, ties to the shorter window
    #[display("closest to last close")]
    ClosestToLastClose,
    /// No usable last close; the longest feasible window
    #[display("longest window")]
    LongestWindow,
}

/// Full result of a valuation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationReport {
    /// Ticker symbol
    pub ticker: String,
    /// Statement period
    pub period: Period,
    /// Valuation date
    pub as_of: NaiveDate,
    /// Discount basis used for every candidate
    pub discount_basis: DiscountBasis,
    /// Cost of capital shared by every candidate
    pub wacc: WaccResult,
    /// Operating-side growth cross-check, when computable
    pub firm_growth: Option<AverageGrowthResult>,
    /// Every candidate in ascending window order
    pub candidates: Vec<Candidate>,
    /// The selected candidate's valuation
    pub selected: ValuationResult,
    /// Last close compared against
    pub last_close: Option<f64>,
    /// Rule that picked `selected`
    pub rule: SelectionRule,
}

impl fmt::Display for ValuationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({}, as of {})", self.ticker, self.period, self.as_of)?;
        writeln!(
            f,
            "  cost of equity {:.4}  wacc {:.4}  beta {:.3} ({})",
            self.wacc.cost_of_equity, self.wacc.wacc, self.wacc.beta, self.wacc.beta_source
        )?;
        for candidate in &self.candidates {
            match (&candidate.value, &candidate.excluded_because) {
                (Some(value), _) => writeln!(
                    f,
                    "  {}y: {:>12.2} per share  (fcfe {:.2}, g {:.4})",
                    candidate.years, value.per_share, value.fcfe, value.growth
                )?,
                (None, Some(reason)) => writeln!(f, "  {}y: excluded - {reason}", candidate.years)?,
                (None, None) => writeln!(f, "  {}y: excluded", candidate.years)?,
            }
        }
        if let Some(last_close) = self.last_close {
            writeln!(f, "  last close {last_close:.2}")?;
        }
        write!(
            f,
            "  selected {}y: {:.2} per share ({})",
            self.selected.years, self.selected.per_share, self.rule
        )
    }
}

/// DCF valuation over injected data sources.
#[derive(Debug)]
pub struct DcfValuation<'a> {
    statements: &'a dyn StatementSource,
    market: &'a dyn MarketDataSource,
    company: &'a dyn CompanyInfoSource,
    config: ValuationConfig,
}

impl<'a> DcfValuation<'a> {
    /// Create a valuation over three sources with default configuration.
    pub fn new(
        statements: &'a dyn StatementSource,
        market: &'a dyn MarketDataSource,
        company: &'a dyn CompanyInfoSource,
    ) -> Self {
        Self {
            statements,
            market,
            company,
            config: ValuationConfig::default(),
        }
    }

    /// Create a valuation over one source implementing every contract.
    pub fn from_source<S>(source: &'a S) -> Self
    where
        S: StatementSource + MarketDataSource + CompanyInfoSource,
    {
        Self::new(source, source, source)
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ValuationConfig) -> Self {
        self.config = config;
        self
    }

    /// Current configuration.
    pub const fn config(&self) -> &ValuationConfig {
        &self.config
    }

    /// Value `ticker` per share as of `as_of`.
    pub fn estimate_per_share(&self, ticker: &str, period: Period, as_of: NaiveDate) -> Result<ValuationReport> {
        let windows = self.config.sorted_windows()?;
        let statements = self.statements.statements(ticker, period)?;
        let metrics = MetricSet::extract(&statements)?;

        let company = self.company.company_info(ticker)?;
        let shares = company
            .shares_outstanding
            .filter(|s| s.is_finite() && *s > 0.0)
            .ok_or_else(|| ValuationError::MissingCompanyInfo("shares outstanding".to_string()))?;

        let wacc = WaccEstimator::with_config(self.config.wacc.clone()).estimate(ticker, &metrics, self.market, as_of)?;
        let discount_rate = match self.config.discount_basis {
            DiscountBasis::CostOfEquity => wacc.cost_of_equity,
            DiscountBasis::Wacc => wacc.wacc,
        };

        let longest = windows.last().copied().unwrap_or(1);
        let firm_growth = match FirmGrowthEstimator::with_config(self.config.firm_growth.clone())
            .estimate_average(&metrics, longest.max(2))
        {
            Ok(growth) => Some(growth),
            Err(e) => {
                warn!(error = %e, "firm growth cross-check unavailable");
                None
            }
        };

        let mut candidates = Vec::with_capacity(windows.len());
        for years in windows {
            let candidate = match self.value_window(&metrics, &company, shares, discount_rate, years) {
                Ok(value) => Candidate {
                    years,
                    value: Some(value),
                    excluded_because: None,
                },
                Err(e) if e.excludes_candidate() => {
                    warn!(years, reason = %e, "candidate excluded");
                    Candidate {
                        years,
                        value: None,
                        excluded_because: Some(e.to_string()),
                    }
                }
                Err(e) => return Err(e),
            };
            candidates.push(candidate);
        }

        let last_close = company.last_close_price.filter(|p| p.is_finite() && *p > 0.0);
        let (selected, rule) = select(&candidates, last_close).ok_or_else(|| ValuationError::Infeasible {
            ticker: ticker.to_string(),
            reasons: candidates
                .iter()
                .map(|c| {
                    format!(
                        "{}y: {}",
                        c.years,
                        c.excluded_because.as_deref().unwrap_or("no value")
                    )
                })
                .collect(),
        })?;
        info!(ticker, years = selected.years, per_share = selected.per_share, %rule, "valuation selected");

        Ok(ValuationReport {
            ticker: ticker.to_string(),
            period,
            as_of,
            discount_basis: self.config.discount_basis,
            wacc,
            firm_growth,
            candidates,
            selected,
            last_close,
            rule,
        })
    }

    fn value_window(
        &self,
        metrics: &MetricSet,
        company: &CompanyInfo,
        shares: f64,
        discount_rate: f64,
        years: usize,
    ) -> Result<ValuationResult> {
        let fcfe = FcfeEstimator.estimate(metrics, years)?;
        if fcfe.fcfe <= 0.0 {
            return Err(ValuationError::NonPositiveFcfe(fcfe.fcfe));
        }
        let growth = ShareholderGrowthEstimator::with_config(self.config.shareholder_growth.clone())
            .estimate(metrics, company.payout_ratio, years)?;

        let outcome = discounted_value(&DcfInputs {
            base_cash_flow: fcfe.fcfe,
            growth: growth.growth,
            discount_rate,
            terminal_growth: self.config.terminal_growth,
            horizon: self.config.horizon_years,
            terminal_discount_periods: self.config.terminal_exponent(),
        })?;
        let per_share = outcome.equity_value / shares;
        debug!(years, per_share, fcfe = fcfe.fcfe, growth = growth.growth, "candidate valued");

        Ok(ValuationResult {
            years,
            per_share,
            fcfe: fcfe.fcfe,
            fcfe_periods: fcfe.periods,
            discount_rate,
            growth: growth.growth,
            terminal_growth: self.config.terminal_growth,
            projected: outcome.projected,
            present_value_explicit: outcome.present_value_explicit,
            terminal_value: outcome.terminal_value,
            present_value_terminal: outcome.present_value_terminal,
            equity_value: outcome.equity_value,
            shares_outstanding: shares,
            capex_to_ocf: fcfe.capex_to_ocf,
            repayment_to_issuance: fcfe.repayment_to_issuance,
            retention_ratio: growth.retention_ratio,
            roe: growth.roe,
        })
    }
}

/// Registry entry for the composed valuation.
///
/// The run itself needs data sources, see [`DcfValuation`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DcfEstimator;

impl Estimator for DcfEstimator {
    fn name(&self) -> &str {
        "dcf"
    }

    fn description(&self) -> &str {
        "Per-share value from projected FCFE discounted at the cost of equity, best window by last close"
    }

    fn stage(&self) -> EstimatorStage {
        EstimatorStage::Valuation
    }

    fn required_metrics(&self) -> &[Metric] {
        &Metric::ALL
    }
}

/// Pick the feasible candidate closest to `last_close`, or the longest
/// feasible window when there is no usable close.
///
/// Candidates are expected in ascending window order, so keeping only
/// strictly better distances resolves ties to the shorter window.
fn select(candidates: &[Candidate], last_close: Option<f64>) -> Option<(ValuationResult, SelectionRule)> {
    let feasible = candidates.iter().filter_map(|c| c.value.as_ref());
    match last_close {
        Some(close) => feasible
            .fold(None::<(&ValuationResult, f64)>, |best, value| {
                let distance = (value.per_share - close).abs();
                match best {
                    Some((_, best_distance)) if best_distance <= distance => best,
                    _ => Some((value, distance)),
                }
            })
            .map(|(value, _)| (value.clone(), SelectionRule::ClosestToLastClose)),
        None => feasible
            .max_by_key(|value| value.years)
            .map(|value| (value.clone(), SelectionRule::LongestWindow)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeSource, as_of};
    use approx::assert_relative_eq;
    use polars::prelude::*;

    fn report(source: &FakeSource) -> Result<ValuationReport> {
        DcfValuation::from_source(source).estimate_per_share("ACME", Period::Annual, as_of())
    }

    fn with_operating_cash_flow(mut source: FakeSource, ocf: [f64; 4]) -> FakeSource {
        source.statements.cash_flow = df![
            "date" => ["2021-12-31", "2022-12-31", "2023-12-31", "2024-12-31"],
            "Operating Cash Flow" => ocf,
            "Capital Expenditure" => [-30.0, -30.0, -35.0, -40.0],
            "Repayment Of Debt" => [-10.0, -10.0, -15.0, -20.0],
            "Issuance Of Debt" => [Some(5.0), None, Some(5.0), Some(10.0)],
        ]
        .unwrap();
        source
    }

    fn with_income_column(mut source: FakeSource, label: &str, values: [Option<f64>; 4]) -> FakeSource {
        source
            .statements
            .income
            .with_column(Column::new(label.into(), values))
            .unwrap();
        source
    }

    /// FCFE of 50 and ROE of 12% in every year, payout 0.2, cost of equity
    /// 3% + 1.0 x 5%, and 1000 shares.
    fn steady_compounder() -> FakeSource {
        let mut source = FakeSource::new();
        source.vendor_beta = Some(1.0);
        source.info = CompanyInfo {
            payout_ratio: Some(0.2),
            shares_outstanding: Some(1000.0),
            last_close_price: Some(1.0),
        };
        let source = with_income_column(
            source,
            "Net Income",
            [Some(96.0), Some(108.0), Some(120.0), Some(132.0)],
        );
        let mut source = with_operating_cash_flow(source, [85.0, 90.0, 95.0, 100.0]);
        source
            .statements
            .balance
            .with_column(Column::new(
                "Total Equity Gross Minority Interest".into(),
                [800.0, 900.0, 1000.0, 1100.0],
            ))
            .unwrap();
        source
    }

    fn candidate(years: usize, per_share: f64) -> Candidate {
        let value = ValuationResult {
            years,
            per_share,
            fcfe: 1.0,
            fcfe_periods: years,
            discount_rate: 0.1,
            growth: 0.0,
            terminal_growth: 0.0,
            projected: vec![],
            present_value_explicit: 0.0,
            terminal_value: 0.0,
            present_value_terminal: 0.0,
            equity_value: 0.0,
            shares_outstanding: 1.0,
            capex_to_ocf: None,
            repayment_to_issuance: None,
            retention_ratio: 1.0,
            roe: 0.1,
        };
        Candidate {
            years,
            value: Some(value),
            excluded_because: None,
        }
    }

    #[test]
    fn test_end_to_end_selects_closest_window() {
        let report = report(&FakeSource::new()).unwrap();

        assert_eq!(report.candidates.len(), 4);
        assert!(report.candidates.iter().all(|c| c.value.is_some()));
        assert_relative_eq!(report.wacc.cost_of_equity, 0.09, epsilon = 1e-12);

        // Per-share values 27.09, 25.56, 24.04, 22.96 against a close of 25
        assert_eq!(report.rule, SelectionRule::ClosestToLastClose);
        assert_eq!(report.selected.years, 2);
        assert_relative_eq!(report.selected.fcfe, 142.5, epsilon = 1e-12);
        assert_relative_eq!(report.selected.per_share, 25.55970175566626, epsilon = 1e-6);

        let first = report.candidates[0].value.as_ref().unwrap();
        assert_relative_eq!(first.growth, 0.096, epsilon = 1e-12);
        assert_relative_eq!(first.per_share, 27.089251409364, epsilon = 1e-6);
        assert_eq!(first.projected.len(), 5);
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let source = FakeSource::new();
        assert_eq!(report(&source).unwrap(), report(&source).unwrap());
    }

    #[test]
    fn test_non_positive_fcfe_window_excluded() {
        // 2024 FCFE becomes 40 - 40 - 20 + 10 = -10
        let source = with_operating_cash_flow(FakeSource::new(), [150.0, 160.0, 180.0, 40.0]);
        let report = report(&source).unwrap();

        let first = &report.candidates[0];
        assert!(first.value.is_none());
        assert!(first.excluded_because.as_deref().unwrap().contains("Non-positive FCFE"));
        assert!(report.candidates[1..].iter().all(|c| c.value.is_some()));
        assert_ne!(report.selected.years, 1);
    }

    #[test]
    fn test_all_windows_infeasible() {
        let source = with_operating_cash_flow(FakeSource::new(), [1.0, 1.0, 1.0, 1.0]);
        let err = report(&source).unwrap_err();
        match err {
            ValuationError::Infeasible { ticker, reasons } => {
                assert_eq!(ticker, "ACME");
                assert_eq!(reasons.len(), 4);
                assert!(reasons[0].starts_with("1y: "));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_steady_compounder_golden_value() {
        let report = report(&steady_compounder()).unwrap();

        assert_relative_eq!(report.wacc.cost_of_equity, 0.08, epsilon = 1e-12);
        for candidate in &report.candidates {
            let value = candidate.value.as_ref().unwrap();
            assert_relative_eq!(value.fcfe, 50.0, epsilon = 1e-12);
            assert_relative_eq!(value.roe, 0.12, epsilon = 1e-12);
            assert_relative_eq!(value.growth, 0.096, epsilon = 1e-12);
            assert_relative_eq!(value.per_share, 1.0378077819706906, epsilon = 1e-10);
        }

        assert_eq!(report.rule, SelectionRule::ClosestToLastClose);
        assert_relative_eq!(report.selected.terminal_value, 1140.896134912176, epsilon = 1e-8);
        assert_relative_eq!(report.selected.per_share, 1.0378077819706906, epsilon = 1e-10);
    }

    #[test]
    fn test_missing_recent_net_income_excludes_every_window() {
        // Net Income series stops at its null 2024 value, leaving no periods
        let source = with_income_column(
            FakeSource::new(),
            "Net Income",
            [Some(90.0), Some(100.0), Some(110.0), None],
        );
        match report(&source).unwrap_err() {
            ValuationError::Infeasible { ticker, reasons } => {
                assert_eq!(ticker, "ACME");
                assert_eq!(reasons.len(), 4);
                assert!(reasons.iter().all(|r| r.contains("Insufficient history")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_short_net_income_history_clamps_windows() {
        // Net Income reported for the two most recent years only
        let source = with_income_column(
            FakeSource::new(),
            "Net Income",
            [None, None, Some(110.0), Some(120.0)],
        );
        let report = report(&source).unwrap();
        assert!(report.candidates.iter().all(|c| c.value.is_some()));
        let longest = report.candidates[3].value.as_ref().unwrap();
        assert_relative_eq!(longest.roe, (0.12 + 110.0 / 950.0) / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_terminal_growth_above_discount_rate_is_infeasible() {
        let source = FakeSource::new();
        let config = ValuationConfig {
            terminal_growth: 0.2,
            ..ValuationConfig::default()
        };
        let err = DcfValuation::from_source(&source)
            .with_config(config)
            .estimate_per_share("ACME", Period::Annual, as_of())
            .unwrap_err();
        assert!(err.to_string().starts_with("Valuation not possible for ACME"));
    }

    #[test]
    fn test_missing_shares_is_fatal() {
        let mut source = FakeSource::new();
        source.info.shares_outstanding = None;
        assert!(matches!(report(&source), Err(ValuationError::MissingCompanyInfo(_))));

        source.info.shares_outstanding = Some(0.0);
        assert!(matches!(report(&source), Err(ValuationError::MissingCompanyInfo(_))));
    }

    #[test]
    fn test_without_last_close_longest_window_wins() {
        let mut source = FakeSource::new();
        source.info.last_close_price = None;
        let report = report(&source).unwrap();
        assert_eq!(report.rule, SelectionRule::LongestWindow);
        assert_eq!(report.selected.years, 4);
    }

    #[test]
    fn test_wacc_discount_basis() {
        let source = FakeSource::new();
        let config = ValuationConfig {
            discount_basis: DiscountBasis::Wacc,
            ..ValuationConfig::default()
        };
        let report = DcfValuation::from_source(&source)
            .with_config(config)
            .estimate_per_share("ACME", Period::Annual, as_of())
            .unwrap();
        assert_eq!(report.selected.discount_rate, report.wacc.wacc);
    }

    #[test]
    fn test_invalid_windows_rejected() {
        let source = FakeSource::new();
        for windows in [vec![], vec![0, 1]] {
            let config = ValuationConfig {
                windows,
                ..ValuationConfig::default()
            };
            let err = DcfValuation::from_source(&source)
                .with_config(config)
                .estimate_per_share("ACME", Period::Annual, as_of())
                .unwrap_err();
            assert!(matches!(err, ValuationError::Computation(_)));
        }
    }

    #[test]
    fn test_selection_ties_go_to_shorter_window() {
        let candidates = [candidate(1, 24.0), candidate(2, 26.0), candidate(3, 30.0)];
        let (selected, rule) = select(&candidates, Some(25.0)).unwrap();
        assert_eq!(selected.years, 1);
        assert_eq!(rule, SelectionRule::ClosestToLastClose);
    }

    #[test]
    fn test_selection_skips_excluded() {
        let excluded = Candidate {
            years: 1,
            value: None,
            excluded_because: Some("Non-positive ROE".to_string()),
        };
        let candidates = [excluded, candidate(2, 10.0)];
        let (selected, _) = select(&candidates, Some(25.0)).unwrap();
        assert_eq!(selected.years, 2);
        assert!(select(&candidates[..1], Some(25.0)).is_none());
    }

    #[test]
    fn test_unknown_ticker_propagates() {
        let source = FakeSource::new();
        let err = DcfValuation::from_source(&source)
            .estimate_per_share("NOPE", Period::Annual, as_of())
            .unwrap_err();
        assert!(matches!(err, ValuationError::Source(_)));
    }
}
