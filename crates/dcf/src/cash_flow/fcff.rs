//! Free Cash Flow to the Firm (FCFF).
//!
//! FCFF is the cash available to all capital providers before financing
//! flows: EBITDA after tax, less reinvestment in fixed assets and non-cash
//! working capital.

use crate::{
    Result, ValuationError,
    metrics::{Metric, MetricSet},
    registry::EstimatorStage,
    traits::Estimator,
};
use serde::Serialize;
use tracing::debug;

/// FCFF for one period and its components.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FcffResult {
    /// Free cash flow to the firm
    pub fcff: f64,
    /// EBITDA
    pub ebitda: f64,
    /// Tax provision
    pub tax_provision: f64,
    /// Capital expenditure
    pub capital_expenditure: f64,
    /// Current assets less current liabilities
    pub working_capital: f64,
    /// Working capital excluding cash
    pub non_cash_working_capital: f64,
    /// Change in non-cash working capital versus the prior period
    pub change_in_non_cash_working_capital: f64,
    /// Cash and equivalents
    pub cash_and_equivalents: f64,
}

/// Free Cash Flow to the Firm estimator.
///
/// ```text
/// NWC  = (Current Assets - Current Liabilities) - Cash
/// FCFF = EBITDA - Tax - (CapEx + ΔNWC)
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FcffEstimator;

const REQUIRED: [Metric; 6] = [
    Metric::Ebitda,
    Metric::TaxProvision,
    Metric::CapitalExpenditure,
    Metric::CurrentAssets,
    Metric::CurrentLiabilities,
    Metric::CashAndEquivalents,
];

impl FcffEstimator {
    /// Estimate FCFF for the period `lag` back, against the period before it.
    pub fn estimate(&self, metrics: &MetricSet, lag: usize) -> Result<FcffResult> {
        let available = metrics.available_periods(&REQUIRED)?;
        if available < lag + 2 {
            return Err(ValuationError::InsufficientHistory {
                required: lag + 2,
                available,
            });
        }

        let value = |metric: Metric, at: usize| metrics.value(metric, at);
        let non_cash_wc = |at: usize| -> Result<(f64, f64)> {
            let wc = value(Metric::CurrentAssets, at)? - value(Metric::CurrentLiabilities, at)?;
            Ok((wc, wc - value(Metric::CashAndEquivalents, at)?))
        };

        let (working_capital, non_cash_working_capital) = non_cash_wc(lag)?;
        let (_, previous_non_cash) = non_cash_wc(lag + 1)?;
        let change = non_cash_working_capital - previous_non_cash;

        let ebitda = value(Metric::Ebitda, lag)?;
        let tax_provision = value(Metric::TaxProvision, lag)?;
        let capital_expenditure = value(Metric::CapitalExpenditure, lag)?;
        let fcff = ebitda - tax_provision - (capital_expenditure + change);

        debug!(fcff, working_capital, change, "fcff estimated");
        Ok(FcffResult {
            fcff,
            ebitda,
            tax_provision,
            capital_expenditure,
            working_capital,
            non_cash_working_capital,
            change_in_non_cash_working_capital: change,
            cash_and_equivalents: value(Metric::CashAndEquivalents, lag)?,
        })
    }
}

impl Estimator for FcffEstimator {
    fn name(&self) -> &str {
        "fcff"
    }

    fn description(&self) -> &str {
        "Free cash flow to the firm - EBITDA less tax, capex and the change in non-cash working capital"
    }

    fn stage(&self) -> EstimatorStage {
        EstimatorStage::CashFlow
    }

    fn required_metrics(&self) -> &[Metric] {
        &REQUIRED
    }

    fn min_periods(&self) -> usize {
        2
    }
}
