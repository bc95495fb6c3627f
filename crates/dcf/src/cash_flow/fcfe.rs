//! Free Cash Flow to Equity (FCFE).
//!
//! FCFE is the cash left for shareholders once operations are funded,
//! investment is paid for and net borrowing is accounted for.

use crate::{
    Result, ValuationError,
    metrics::{Metric, MetricSet},
    numeric::{self, ratio},
    registry::EstimatorStage,
    traits::Estimator,
};
use serde::Serialize;
use tracing::debug;

/// FCFE averaged over a window of recent periods.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FcfeResult {
    /// Mean FCFE over the window
    pub fcfe: f64,
    /// Mean operating cash flow
    pub operating_cash_flow: f64,
    /// Mean capital expenditure
    pub capital_expenditure: f64,
    /// Mean repayment of debt (negative cash effect)
    pub repayment_of_debt: f64,
    /// Mean issuance of debt
    pub issuance_of_debt: f64,
    /// Mean capex / operating cash flow over periods where defined
    pub capex_to_ocf: Option<f64>,
    /// Mean -repayment / issuance over periods where defined
    pub repayment_to_issuance: Option<f64>,
    /// Number of periods averaged
    pub periods: usize,
}

/// Free Cash Flow to Equity estimator.
///
/// ```text
/// FCFE_i = OCF_i - CapEx_i + Repayment_i + Issuance_i
/// FCFE   = mean(FCFE_0 .. FCFE_{years-1})
/// ```
///
/// Repayment carries its reported negative sign, so adding it subtracts the
/// cash paid out.
#[derive(Debug, Clone, Copy, Default)]
pub struct FcfeEstimator;

const REQUIRED: [Metric; 4] = [
    Metric::OperatingCashFlow,
    Metric::CapitalExpenditure,
    Metric::RepaymentOfDebt,
    Metric::IssuanceOfDebt,
];

impl FcfeEstimator {
    /// Estimate FCFE over the most recent `years` periods.
    ///
    /// The window is clamped to the available history.
    pub fn estimate(&self, metrics: &MetricSet, years: usize) -> Result<FcfeResult> {
        let available = metrics.available_periods(&REQUIRED)?;
        if available == 0 {
            return Err(ValuationError::InsufficientHistory {
                required: 1,
                available,
            });
        }
        let periods = years.clamp(1, available);

        let ocf = metrics.get(Metric::OperatingCashFlow)?.recent(periods);
        let capex = metrics.get(Metric::CapitalExpenditure)?.recent(periods);
        let repayment = metrics.get(Metric::RepaymentOfDebt)?.recent(periods);
        let issuance = metrics.get(Metric::IssuanceOfDebt)?.recent(periods);

        let mut fcfe = Vec::with_capacity(periods);
        let mut capex_to_ocf = Vec::with_capacity(periods);
        let mut repayment_to_issuance = Vec::with_capacity(periods);
        for i in 0..periods {
            fcfe.push(ocf[i] - capex[i] + repayment[i] + issuance[i]);
            capex_to_ocf.push(ratio(capex[i], ocf[i]));
            repayment_to_issuance.push(ratio(-repayment[i], issuance[i]));
        }

        let average = |values: &[f64]| numeric::mean(values).unwrap_or_default();
        let result = FcfeResult {
            fcfe: average(&fcfe),
            operating_cash_flow: average(&ocf),
            capital_expenditure: average(&capex),
            repayment_of_debt: average(&repayment),
            issuance_of_debt: average(&issuance),
            capex_to_ocf: numeric::mean_defined(&capex_to_ocf),
            repayment_to_issuance: numeric::mean_defined(&repayment_to_issuance),
            periods,
        };

        if result.repayment_to_issuance.is_none() {
            debug!(periods, "no debt issuance in window, repayment ratio undefined");
        }
        debug!(fcfe = result.fcfe, periods, "fcfe estimated");
        Ok(result)
    }
}

impl Estimator for FcfeEstimator {
    fn name(&self) -> &str {
        "fcfe"
    }

    fn description(&self) -> &str {
        "Free cash flow to equity - OCF less capex plus net borrowing, averaged over a window"
    }

    fn stage(&self) -> EstimatorStage {
        EstimatorStage::CashFlow
    }

    fn required_metrics(&self) -> &[Metric] {
        &REQUIRED
    }
}
