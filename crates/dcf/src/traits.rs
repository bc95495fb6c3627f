//! Core trait definitions for estimators.
//!
//! Every stage of the pipeline implements [`Estimator`], which exposes the
//! metadata the registry and the CLI use for discovery. Each estimator also
//! has its own inherent `estimate` method, since the stages take different
//! inputs and return different result types.

use crate::{EstimatorStage, Result, ValuationError, metrics::Metric};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Reporting period of the financial statements.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    /// Fiscal-year statements
    #[default]
    #[display("annual")]
    Annual,
    /// Fiscal-quarter statements
    #[display("quarterly")]
    Quarterly,
}

impl FromStr for Period {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "annual" | "yearly" => Ok(Self::Annual),
            "quarterly" | "quarter" => Ok(Self::Quarterly),
            other => Err(ValuationError::InvalidPeriod(other.to_string())),
        }
    }
}

/// A stage of the valuation pipeline.
pub trait Estimator: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this estimator.
    ///
    /// Should be snake_case and stable across versions.
    fn name(&self) -> &str;

    /// Human-readable description of what this estimator produces.
    fn description(&self) -> &str;

    /// Pipeline stage for grouping.
    fn stage(&self) -> EstimatorStage;

    /// Financial-statement metrics the estimator reads.
    fn required_metrics(&self) -> &[Metric];

    /// Minimum number of statement periods needed.
    fn min_periods(&self) -> usize {
        1
    }
}

/// Marker trait for estimator configuration types.
///
/// All config types should implement Default, Clone, Send, Sync, and Debug.
pub trait EstimatorConfig: Default + Clone + Send + Sync + std::fmt::Debug {}

/// An estimator that supports runtime configuration.
pub trait ConfigurableEstimator: Estimator {
    /// Configuration type for this estimator.
    type Config: EstimatorConfig;

    /// Create a new estimator with the given configuration.
    fn with_config(config: Self::Config) -> Self;

    /// Returns the current configuration.
    fn config(&self) -> &Self::Config;
}

/// Blanket implementation for any type that satisfies the trait bounds.
impl<T: Default + Clone + Send + Sync + std::fmt::Debug> EstimatorConfig for T {}
