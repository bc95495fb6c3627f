//! Cash-flow estimators - the quantities a DCF discounts.
//!
//! FCFE feeds the equity valuation directly. FCFF is reported alongside it
//! as a firm-level cross-check.

pub mod fcfe;
pub mod fcff;

pub use fcfe::{FcfeEstimator, FcfeResult};
pub use fcff::{FcffEstimator, FcffResult};
