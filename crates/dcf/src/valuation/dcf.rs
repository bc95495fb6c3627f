//! Discounted cash flow arithmetic.
//!
//! ```text
//! CF_t = CF_0 × (1 + g)^t                      t = 1..=H
//! PV   = Σ CF_t / (1 + k)^t
//! TV   = CF_H × (1 + g_T) / (k - g_T)
//! PV_T = TV / (1 + k)^N
//! ```

use crate::{Result, ValuationError};
use serde::Serialize;

/// Inputs to a single DCF run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DcfInputs {
    /// Cash flow of the base period (t = 0)
    pub base_cash_flow: f64,
    /// Growth over the explicit horizon
    pub growth: f64,
    /// Discount rate
    pub discount_rate: f64,
    /// Perpetual growth after the horizon
    pub terminal_growth: f64,
    /// Number of explicitly projected periods
    pub horizon: usize,
    /// Exponent used to discount the terminal value
    pub terminal_discount_periods: usize,
}

/// Output of a DCF run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DcfOutcome {
    /// Projected cash flows for t = 1..=H
    pub projected: Vec<f64>,
    /// Present value of the projected flows
    pub present_value_explicit: f64,
    /// Terminal value at the horizon
    pub terminal_value: f64,
    /// Present value of the terminal value
    pub present_value_terminal: f64,
    /// Sum of both present values
    pub equity_value: f64,
}

/// Compound `base` forward `horizon` periods at `growth`.
pub fn project_cash_flows(base: f64, growth: f64, horizon: usize) -> Vec<f64> {
    std::iter::successors(Some(base), |previous| Some(previous * (1.0 + growth)))
        .skip(1)
        .take(horizon)
        .collect()
}

/// `value / (1 + rate)^periods`
pub fn discount(value: f64, rate: f64, periods: usize) -> f64 {
    value / (1.0 + rate).powi(periods as i32)
}

/// Present value of flows received at t = 1, 2, ...
pub fn present_value(flows: &[f64], rate: f64) -> f64 {
    flows
        .iter()
        .enumerate()
        .map(|(i, flow)| discount(*flow, rate, i + 1))
        .sum()
}

/// Gordon growth terminal value of a stream whose last explicit flow is
/// `last_flow`.
pub fn terminal_value(last_flow: f64, discount_rate: f64, terminal_growth: f64) -> Result<f64> {
    if discount_rate <= terminal_growth {
        return Err(ValuationError::DiscountRateBelowGrowth {
            discount_rate,
            terminal_growth,
        });
    }
    Ok(last_flow * (1.0 + terminal_growth) / (discount_rate - terminal_growth))
}

/// Run the full projection, terminal value, and discounting.
pub fn discounted_value(inputs: &DcfInputs) -> Result<DcfOutcome> {
    if inputs.horizon == 0 {
        return Err(ValuationError::Computation(
            "projection horizon must be at least one period".to_string(),
        ));
    }
    let projected = project_cash_flows(inputs.base_cash_flow, inputs.growth, inputs.horizon);
    let last = projected.last().copied().unwrap_or(inputs.base_cash_flow);

    let terminal_value = terminal_value(last, inputs.discount_rate, inputs.terminal_growth)?;
    let present_value_explicit = present_value(&projected, inputs.discount_rate);
    let present_value_terminal = discount(
        terminal_value,
        inputs.discount_rate,
        inputs.terminal_discount_periods,
    );

    Ok(DcfOutcome {
        projected,
        present_value_explicit,
        terminal_value,
        present_value_terminal,
        equity_value: present_value_explicit + present_value_terminal,
    })
}
