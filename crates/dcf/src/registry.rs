//! Estimator registry for discovery and introspection.
//!
//! The registry lists every pipeline stage with its inputs so front ends can
//! describe the pipeline without knowing the concrete estimator types.

use crate::{Estimator, metrics::Metric};
use derive_more::Display;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Pipeline stage for grouping related estimators.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorStage {
    /// CashFlow - cash flows to be discounted
    CashFlow,
    /// CostOfCapital - discount rates
    CostOfCapital,
    /// Growth - projection growth rates
    Growth,
    /// Valuation - discounting and selection
    Valuation,
}

/// Metadata for estimator introspection.
#[derive(Debug, Clone, Serialize)]
pub struct EstimatorInfo {
    /// Estimator name (unique identifier)
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Pipeline stage
    pub stage: EstimatorStage,
    /// Statement metrics read
    pub required_metrics: Vec<Metric>,
    /// Minimum statement periods
    pub min_periods: usize,
}

impl EstimatorInfo {
    fn of(estimator: &dyn Estimator) -> Self {
        Self {
            name: estimator.name().to_string(),
            description: estimator.description().to_string(),
            stage: estimator.stage(),
            required_metrics: estimator.required_metrics().to_vec(),
            min_periods: estimator.min_periods(),
        }
    }
}

/// Registry for estimator discovery.
#[derive(Debug, Default)]
pub struct EstimatorRegistry {
    estimators: HashMap<String, Arc<dyn Estimator>>,
}

impl EstimatorRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            estimators: HashMap::new(),
        }
    }

    /// Register every pipeline stage with its default configuration.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        // Cash flows
        registry.register(Arc::new(crate::cash_flow::FcfeEstimator));
        registry.register(Arc::new(crate::cash_flow::FcffEstimator));

        // Cost of capital
        registry.register(Arc::new(crate::cost_of_capital::WaccEstimator::default()));

        // Growth
        registry.register(Arc::new(crate::growth::FirmGrowthEstimator::default()));
        registry.register(Arc::new(crate::growth::ShareholderGrowthEstimator::default()));

        // Valuation
        registry.register(Arc::new(crate::valuation::DcfEstimator));

        registry
    }

    /// Register an estimator, replacing any with the same name.
    pub fn register(&mut self, estimator: Arc<dyn Estimator>) {
        self.estimators.insert(estimator.name().to_string(), estimator);
    }

    /// Get an estimator by name.
    pub fn get(&self, name: &str) -> Option<&dyn Estimator> {
        self.estimators.get(name).map(|e| e.as_ref())
    }

    /// Get estimators by stage.
    pub fn by_stage(&self, stage: EstimatorStage) -> Vec<&dyn Estimator> {
        let mut found: Vec<&dyn Estimator> = self
            .estimators
            .values()
            .filter(|e| e.stage() == stage)
            .map(|e| e.as_ref())
            .collect();
        found.sort_by(|a, b| a.name().cmp(b.name()));
        found
    }

    /// Metadata for one estimator.
    pub fn info(&self, name: &str) -> Option<EstimatorInfo> {
        self.get(name).map(EstimatorInfo::of)
    }

    /// Metadata for every estimator, in pipeline order.
    pub fn all_info(&self) -> Vec<EstimatorInfo> {
        let mut info: Vec<EstimatorInfo> = self.estimators.values().map(|e| EstimatorInfo::of(e.as_ref())).collect();
        info.sort_by(|a, b| a.stage.cmp(&b.stage).then_with(|| a.name.cmp(&b.name)));
        info
    }

    /// Every estimator name, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.estimators.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered estimators.
    pub fn len(&self) -> usize {
        self.estimators.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.estimators.is_empty()
    }
}
