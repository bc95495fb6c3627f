//! Effective tax rate.

use crate::{
    metrics::{Metric, MetricSnapshot},
    numeric::{Resolved, SanityBand, ratio},
};

/// Statutory-like default used when the reported rate is unusable.
pub const DEFAULT_TAX_RATE: f64 = 0.22;

/// Accepted range for the effective tax rate.
pub const TAX_RATE_BAND: SanityBand = SanityBand::new(0.0, 1.0, DEFAULT_TAX_RATE);

/// `tax_provision / pretax_income`, resolved against `band`.
///
/// A missing line item or zero pretax income resolves to the band default.
pub fn effective_tax_rate(snapshot: &MetricSnapshot, band: &SanityBand) -> Resolved {
    let raw = match (
        snapshot.get(Metric::TaxProvision),
        snapshot.get(Metric::PretaxIncome),
    ) {
        (Some(tax), Some(pretax)) => ratio(tax, pretax),
        _ => None,
    };
    band.resolve("effective_tax_rate", raw)
}
