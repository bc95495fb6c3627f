//! Valuation - DCF arithmetic and the candidate-window composer.

pub mod composer;
pub mod dcf;

pub use composer::{
    Candidate, DcfEstimator, DcfValuation, DiscountBasis, SelectionRule, ValuationConfig,
    ValuationReport, ValuationResult,
};
pub use dcf::{DcfInputs, DcfOutcome, discounted_value, terminal_value};
