//! Numeric guards shared by the estimators.
//!
//! Divisions that can be undefined return `Option<f64>`, and sanity bands turn
//! implausible estimates into documented defaults. Both keep the fallback
//! policy an explicit branch instead of a side effect of error handling.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// `numerator / denominator`, or `None` when the quotient is not finite.
pub fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    let value = numerator / denominator;
    value.is_finite().then_some(value)
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Mean of the defined entries, `None` if none are defined.
pub fn mean_defined(values: &[Option<f64>]) -> Option<f64> {
    let defined: Vec<f64> = values.iter().flatten().copied().collect();
    mean(&defined)
}

/// Sample covariance (n - 1 denominator) of two equally long series.
pub fn sample_covariance(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let x = Array1::from_vec(x.to_vec());
    let y = Array1::from_vec(y.to_vec());
    let dx = &x - x.mean()?;
    let dy = &y - y.mean()?;
    Some(dx.dot(&dy) / (x.len() - 1) as f64)
}

/// Sample variance (n - 1 denominator).
pub fn sample_variance(x: &[f64]) -> Option<f64> {
    sample_covariance(x, x)
}

/// A computed estimate that fell outside its sanity band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutOfRange {
    /// The offending value
    pub value: f64,
    /// Lower bound of the band
    pub lower: f64,
    /// Upper bound of the band
    pub upper: f64,
}

impl fmt::Display for OutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} outside [{}, {}]", self.value, self.lower, self.upper)
    }
}

/// Inclusive plausibility band with the default used when an estimate is
/// undefined or falls outside it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SanityBand {
    /// Lowest acceptable value
    pub lower: f64,
    /// Highest acceptable value
    pub upper: f64,
    /// Substitute value
    pub fallback: f64,
}

impl SanityBand {
    /// Create a band.
    pub const fn new(lower: f64, upper: f64, fallback: f64) -> Self {
        Self {
            lower,
            upper,
            fallback,
        }
    }

    /// Check a value against the band.
    pub fn check(&self, value: f64) -> std::result::Result<f64, OutOfRange> {
        if value.is_finite() && (self.lower..=self.upper).contains(&value) {
            Ok(value)
        } else {
            Err(OutOfRange {
                value,
                lower: self.lower,
                upper: self.upper,
            })
        }
    }

    /// Resolve an optional estimate, substituting the fallback when it is
    /// missing or out of range.
    pub fn resolve(&self, name: &str, value: Option<f64>) -> Resolved {
        match value.map(|v| self.check(v)) {
            Some(Ok(v)) => Resolved::computed(v),
            Some(Err(out_of_range)) => {
                warn!(estimate = name, %out_of_range, fallback = self.fallback, "estimate out of range, using default");
                Resolved::fallback(self.fallback)
            }
            None => {
                warn!(estimate = name, fallback = self.fallback, "estimate undefined, using default");
                Resolved::fallback(self.fallback)
            }
        }
    }
}

/// Outcome of [`SanityBand::resolve`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved {
    /// Value to use downstream
    pub value: f64,
    /// Whether `value` is the band's default rather than the computed estimate
    pub defaulted: bool,
}

impl Resolved {
    /// A value taken from the computation.
    pub const fn computed(value: f64) -> Self {
        Self {
            value,
            defaulted: false,
        }
    }

    /// A substituted default.
    pub const fn fallback(value: f64) -> Self {
        Self {
            value,
            defaulted: true,
        }
    }
}
