#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cash_flow;
pub mod cost_of_capital;
pub mod error;
pub mod growth;
pub mod metrics;
pub mod numeric;
pub mod registry;
pub mod source;
pub mod traits;
pub mod valuation;

#[cfg(test)]
pub(crate) mod testing;

// Re-export core types
pub use error::{Result, ValuationError};
pub use metrics::{Metric, MetricSet};
pub use registry::{EstimatorInfo, EstimatorRegistry, EstimatorStage};
pub use source::{CompanyInfoSource, MarketDataSource, SnapshotSource, StatementSource};
pub use traits::{ConfigurableEstimator, Estimator, EstimatorConfig, Period};
pub use valuation::{DcfValuation, ValuationConfig, ValuationReport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
