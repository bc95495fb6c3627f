//! Market risk premium.
//!
//! Realized annualized index return over a trailing window, less the
//! risk-free rate observed at the start of that window.

use crate::{
    Result, ValuationError,
    numeric::{Resolved, SanityBand, ratio},
    source::{Interval, MarketDataSource, last_close},
};
use chrono::{Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Configuration for the market risk premium.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PremiumConfig {
    /// Length of the trailing window in years.
    pub window_years: u32,
    /// Days before a window boundary searched for the closing price.
    pub price_tolerance_days: i64,
    /// Accepted range and default.
    pub band: SanityBand,
}

impl Default for PremiumConfig {
    fn default() -> Self {
        Self {
            window_years: 3,
            price_tolerance_days: 5,
            band: SanityBand::new(0.0, 0.2, 0.06),
        }
    }
}

/// Resolve the market risk premium, defaulting on any failure.
pub fn estimate_market_risk_premium(
    market: &dyn MarketDataSource,
    market_index: &str,
    as_of: NaiveDate,
    config: &PremiumConfig,
) -> Resolved {
    let realized = match realized_premium(market, market_index, as_of, config) {
        Ok(premium) => premium,
        Err(e) => {
            warn!(error = %e, "market risk premium computation failed");
            None
        }
    };
    config.band.resolve("market_risk_premium", realized)
}

/// `(P_end / P_start)^(1 / years) - 1 - rf(start)`.
///
/// `None` when either boundary has no close or the years are zero.
pub fn realized_premium(
    market: &dyn MarketDataSource,
    market_index: &str,
    as_of: NaiveDate,
    config: &PremiumConfig,
) -> Result<Option<f64>> {
    if config.window_years == 0 {
        return Ok(None);
    }
    let start = as_of
        .checked_sub_months(Months::new(12 * config.window_years))
        .ok_or_else(|| ValuationError::InvalidDate(format!("{as_of} minus {} years", config.window_years)))?;

    let close_near = |date: NaiveDate| -> Result<Option<f64>> {
        let from = date - Duration::days(config.price_tolerance_days);
        let prices = market.price_history(market_index, from, date, Interval::Daily)?;
        last_close(&prices)
    };
    let (Some(start_price), Some(end_price)) = (close_near(start)?, close_near(as_of)?) else {
        debug!(%start, %as_of, "no index close near window boundary");
        return Ok(None);
    };

    let Some(growth) = ratio(end_price, start_price) else {
        return Ok(None);
    };
    let annualized = growth.powf(1.0 / f64::from(config.window_years)) - 1.0;
    let historical_rf = market.risk_free_rate(start)?;
    debug!(annualized, historical_rf, "realized market return");
    Ok(Some(annualized - historical_rf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeSource, as_of};
    use approx::assert_relative_eq;

    #[test]
    fn test_realized_premium() {
        let source = FakeSource::new();
        let premium = realized_premium(&source, "^GSPC", as_of(), &PremiumConfig::default())
            .unwrap()
            .unwrap();
        // 8% annual index return less 3% risk-free
        assert_relative_eq!(premium, 0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_premium_resolves_in_band() {
        let source = FakeSource::new();
        let premium = estimate_market_risk_premium(&source, "^GSPC", as_of(), &PremiumConfig::default());
        assert!(!premium.defaulted);
        assert_relative_eq!(premium.value, 0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_premium_defaults_when_index_missing() {
        let source = FakeSource::new();
        let premium = estimate_market_risk_premium(&source, "^KS11", as_of(), &PremiumConfig::default());
        assert!(premium.defaulted);
        assert_eq!(premium.value, 0.06);
    }

    #[test]
    fn test_negative_premium_defaults() {
        let mut source = FakeSource::new();
        source.risk_free_rate = Some(0.15);
        let premium = estimate_market_risk_premium(&source, "^GSPC", as_of(), &PremiumConfig::default());
        assert!(premium.defaulted);
        assert_eq!(premium.value, 0.06);
    }

    #[test]
    fn test_no_close_near_boundary() {
        let source = FakeSource::new();
        let config = PremiumConfig {
            window_years: 10,
            ..PremiumConfig::default()
        };
        assert_eq!(realized_premium(&source, "^GSPC", as_of(), &config).unwrap(), None);
    }
}
