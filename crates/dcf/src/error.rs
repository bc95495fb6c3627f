//! Error types for valuation computations.

use thiserror::Error;

/// Result type for valuation operations.
pub type Result<T> = std::result::Result<T, ValuationError>;

/// Errors that can occur while estimating or composing a valuation.
#[derive(Debug, Error)]
pub enum ValuationError {
    /// A required line item was absent under every accepted label
    #[error("Metric not found: {metric} (tried {aliases:?})")]
    MetricNotFound {
        /// Canonical metric name
        metric: String,
        /// Labels that were tried, in order
        aliases: Vec<String>,
    },

    /// Fewer periods available than the calculation needs
    #[error("Insufficient history: need {required} periods, got {available}")]
    InsufficientHistory {
        /// Required number of periods
        required: usize,
        /// Available number of periods
        available: usize,
    },

    /// Return on equity is zero or negative; equity growth is undefined
    #[error("Non-positive ROE ({0:.4}): DCF valuation is not possible")]
    NonPositiveRoe(f64),

    /// Free cash flow to equity is zero or negative
    #[error("Non-positive FCFE ({0:.2}): DCF valuation is not possible")]
    NonPositiveFcfe(f64),

    /// The perpetuity formula needs a discount rate above the terminal growth
    #[error("Discount rate {discount_rate:.4} does not exceed terminal growth {terminal_growth:.4}")]
    DiscountRateBelowGrowth {
        /// Discount rate in use
        discount_rate: f64,
        /// Terminal growth rate in use
        terminal_growth: f64,
    },

    /// A company attribute needed for the per-share figure is unavailable
    #[error("Missing company info: {0}")]
    MissingCompanyInfo(String),

    /// Every candidate window was excluded
    #[error("Valuation not possible for {ticker}: {}", reasons.join("; "))]
    Infeasible {
        /// Ticker symbol
        ticker: String,
        /// Exclusion reason per candidate
        reasons: Vec<String>,
    },

    /// Unknown reporting period
    #[error("Invalid period: {0} (expected \"annual\" or \"quarterly\")")]
    InvalidPeriod(String),

    /// Unparseable date
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// The underlying data source failed
    #[error("Data source error: {0}")]
    Source(String),

    /// Polars DataFrame error
    #[error("DataFrame error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),
}

impl ValuationError {
    /// Whether this error marks an economically infeasible estimate rather
    /// than a data or system fault.
    pub const fn is_infeasibility(&self) -> bool {
        matches!(
            self,
            Self::NonPositiveRoe(_)
                | Self::NonPositiveFcfe(_)
                | Self::DiscountRateBelowGrowth { .. }
                | Self::Infeasible { .. }
        )
    }

    /// Whether this error is confined to one candidate window: an
    /// infeasible estimate or a gap in the history that window reads.
    pub const fn excludes_candidate(&self) -> bool {
        self.is_infeasibility()
            || matches!(
                self,
                Self::InsufficientHistory { .. } | Self::MetricNotFound { .. }
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infeasibility_classification() {
        assert!(ValuationError::NonPositiveRoe(-0.1).is_infeasibility());
        assert!(ValuationError::NonPositiveFcfe(0.0).is_infeasibility());
        assert!(
            !ValuationError::InsufficientHistory {
                required: 2,
                available: 1
            }
            .is_infeasibility()
        );
    }

    #[test]
    fn test_candidate_exclusion_classification() {
        assert!(ValuationError::NonPositiveFcfe(-1.0).excludes_candidate());
        assert!(
            ValuationError::InsufficientHistory {
                required: 1,
                available: 0
            }
            .excludes_candidate()
        );
        assert!(
            ValuationError::MetricNotFound {
                metric: "net_income".to_string(),
                aliases: vec!["Net Income".to_string()],
            }
            .excludes_candidate()
        );
        assert!(!ValuationError::Source("down".to_string()).excludes_candidate());
        assert!(!ValuationError::MissingCompanyInfo("shares".to_string()).excludes_candidate());
    }

    #[test]
    fn test_infeasible_message_lists_reasons() {
        let err = ValuationError::Infeasible {
            ticker: "ACME".to_string(),
            reasons: vec!["1y: a".to_string(), "2y: b".to_string()],
        };
        assert_eq!(err.to_string(), "Valuation not possible for ACME: 1y: a; 2y: b");
    }
}
