//! Equity beta - systematic risk exposure.
//!
//! The vendor-reported beta is used when it is plausible. Otherwise beta is
//! estimated from weekly returns:
//! `β = Cov(R_i, R_m) / Var(R_m)`

use crate::{
    Result,
    numeric::{SanityBand, ratio, sample_covariance, sample_variance},
    source::{CLOSE_COLUMN, DATE_COLUMN, Interval, MarketDataSource},
};
use chrono::{Duration, NaiveDate};
use derive_more::Display;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Configuration for beta estimation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BetaConfig {
    /// Calendar days of weekly history used for the regression.
    pub lookback_days: i64,
    /// Accepted range and default.
    pub band: SanityBand,
}

impl Default for BetaConfig {
    fn default() -> Self {
        Self {
            lookback_days: 730,
            band: SanityBand::new(0.0, 3.0, 1.0),
        }
    }
}

/// Where a beta came from.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BetaSource {
    /// Reported by the data vendor
    #[display("vendor")]
    Vendor,
    /// Estimated from weekly returns
    #[display("regression")]
    Regression,
    /// The configured default
    #[display("default")]
    Default,
}

/// A beta together with its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BetaEstimate {
    /// Beta value
    pub beta: f64,
    /// Provenance
    pub source: BetaSource,
}

/// Resolve beta for `ticker` against `market_index`.
///
/// Never fails: every error path ends at the configured default.
pub fn estimate_beta(
    market: &dyn MarketDataSource,
    ticker: &str,
    market_index: &str,
    as_of: NaiveDate,
    config: &BetaConfig,
) -> BetaEstimate {
    match market.vendor_beta(ticker) {
        Ok(Some(beta)) if config.band.check(beta).is_ok() => {
            debug!(beta, "using vendor beta");
            return BetaEstimate {
                beta,
                source: BetaSource::Vendor,
            };
        }
        Ok(Some(beta)) => debug!(beta, "vendor beta out of range, estimating"),
        Ok(None) => debug!("no vendor beta, estimating"),
        Err(e) => warn!(error = %e, "vendor beta lookup failed, estimating"),
    }

    let regressed = match regression_beta(market, ticker, market_index, as_of, config.lookback_days) {
        Ok(beta) => beta,
        Err(e) => {
            warn!(error = %e, "beta regression failed");
            None
        }
    };
    let resolved = config.band.resolve("beta", regressed);
    BetaEstimate {
        beta: resolved.value,
        source: if resolved.defaulted {
            BetaSource::Default
        } else {
            BetaSource::Regression
        },
    }
}

/// Weekly-return regression beta over `lookback_days` ending at `as_of`.
///
/// Returns are aligned on date before the covariance is taken. `None` when
/// fewer than two aligned returns exist or the market variance is zero.
pub fn regression_beta(
    market: &dyn MarketDataSource,
    ticker: &str,
    market_index: &str,
    as_of: NaiveDate,
    lookback_days: i64,
) -> Result<Option<f64>> {
    let start = as_of - Duration::days(lookback_days);
    let stock = market.price_history(ticker, start, as_of, Interval::Weekly)?;
    let index = market.price_history(market_index, start, as_of, Interval::Weekly)?;

    let aligned = weekly_returns(&stock, "stock_return")
        .join(
            weekly_returns(&index, "market_return"),
            [col(DATE_COLUMN)],
            [col(DATE_COLUMN)],
            JoinArgs::new(JoinType::Inner),
        )
        .collect()?;

    let stock_returns: Vec<f64> = aligned
        .column("stock_return")?
        .f64()?
        .into_no_null_iter()
        .collect();
    let market_returns: Vec<f64> = aligned
        .column("market_return")?
        .f64()?
        .into_no_null_iter()
        .collect();

    let beta = sample_covariance(&stock_returns, &market_returns)
        .zip(sample_variance(&market_returns))
        .and_then(|(cov, var)| ratio(cov, var));
    debug!(observations = stock_returns.len(), ?beta, "regression beta");
    Ok(beta)
}

/// Period-over-period simple returns of a `date`/`close` frame.
fn weekly_returns(prices: &DataFrame, alias: &str) -> LazyFrame {
    prices
        .clone()
        .lazy()
        .with_column(col(CLOSE_COLUMN).cast(DataType::Float64))
        .filter(col(CLOSE_COLUMN).is_not_null())
        .sort([DATE_COLUMN], SortMultipleOptions::default())
        .with_column(((col(CLOSE_COLUMN) / col(CLOSE_COLUMN).shift(lit(1))) - lit(1.0)).alias(alias))
        .filter(col(alias).is_not_null())
        .select([col(DATE_COLUMN), col(alias)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeSource, as_of};
    use approx::assert_relative_eq;

    /// Market path and a stock whose weekly returns are exactly twice the
    /// market's.
    fn doubled_paths() -> (Vec<f64>, Vec<f64>) {
        let market_returns = [0.01, -0.02, 0.03, 0.015, -0.01, 0.02];
        let mut market = vec![100.0];
        let mut stock = vec![50.0];
        for r in market_returns {
            market.push(market.last().unwrap() * (1.0 + r));
            stock.push(stock.last().unwrap() * (1.0 + 2.0 * r));
        }
        (stock, market)
    }

    #[test]
    fn test_vendor_beta_preferred() {
        let source = FakeSource::new();
        let estimate = estimate_beta(&source, "ACME", "^GSPC", as_of(), &BetaConfig::default());
        assert_eq!(estimate.beta, 1.2);
        assert_eq!(estimate.source, BetaSource::Vendor);
    }

    #[test]
    fn test_regression_when_vendor_missing() {
        let (stock, market) = doubled_paths();
        let mut source = FakeSource::new().with_weekly_prices(&stock, &market);
        source.vendor_beta = None;

        let estimate = estimate_beta(&source, "ACME", "^GSPC", as_of(), &BetaConfig::default());
        assert_eq!(estimate.source, BetaSource::Regression);
        assert_relative_eq!(estimate.beta, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_regression_when_vendor_out_of_range() {
        let (stock, market) = doubled_paths();
        let mut source = FakeSource::new().with_weekly_prices(&stock, &market);
        source.vendor_beta = Some(4.5);

        let estimate = estimate_beta(&source, "ACME", "^GSPC", as_of(), &BetaConfig::default());
        assert_eq!(estimate.source, BetaSource::Regression);
        assert_relative_eq!(estimate.beta, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_out_of_range_regression_defaults() {
        // Stock moves five times the market
        let market = [100.0, 101.0, 99.0, 102.0, 100.0];
        let stock: Vec<f64> = market.windows(2).fold(vec![10.0], |mut acc, w| {
            acc.push(acc.last().unwrap() * (1.0 + 5.0 * (w[1] / w[0] - 1.0)));
            acc
        });
        let mut source = FakeSource::new().with_weekly_prices(&stock, &market);
        source.vendor_beta = None;

        let estimate = estimate_beta(&source, "ACME", "^GSPC", as_of(), &BetaConfig::default());
        assert_eq!(estimate.source, BetaSource::Default);
        assert_eq!(estimate.beta, 1.0);
    }

    #[test]
    fn test_missing_prices_default() {
        let mut source = FakeSource::new();
        source.vendor_beta = None;

        let estimate = estimate_beta(&source, "ACME", "^GSPC", as_of(), &BetaConfig::default());
        assert_eq!(estimate.source, BetaSource::Default);
        assert_eq!(estimate.beta, 1.0);
    }

    #[test]
    fn test_flat_market_has_no_beta() {
        let source = FakeSource::new().with_weekly_prices(&[10.0, 11.0, 12.0], &[100.0, 100.0, 100.0]);
        let beta = regression_beta(&source, "ACME", "^GSPC", as_of(), 730).unwrap();
        assert_eq!(beta, None);
    }
}
