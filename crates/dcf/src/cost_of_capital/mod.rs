//! Cost of capital - the discount rates applied to projected cash flows.

pub mod beta;
pub mod premium;
pub mod tax;
pub mod wacc;

pub use beta::{BetaConfig, BetaEstimate, BetaSource, estimate_beta};
pub use premium::{PremiumConfig, estimate_market_risk_premium};
pub use tax::{DEFAULT_TAX_RATE, TAX_RATE_BAND, effective_tax_rate};
pub use wacc::{CostOfEquity, WaccConfig, WaccEstimator, WaccResult};
