//! Growth estimators.
//!
//! Shareholder growth drives the FCFE projection. Firm growth is reported
//! as a cross-check from the operating side.

pub mod firm;
pub mod shareholder;

pub use firm::{
    AverageGrowthResult, FirmGrowthConfig, FirmGrowthEstimator, FirmGrowthResult, GrowthComponents,
    PeriodGrowth,
};
pub use shareholder::{ShareholderGrowthConfig, ShareholderGrowthEstimator, ShareholderGrowthResult};
