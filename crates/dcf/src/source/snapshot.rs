//! JSON snapshot adapter.
//!
//! A snapshot file holds everything one valuation run reads for a single
//! ticker: statements per period, risk-free rate observations, price
//! histories and company attributes. It implements all three source traits
//! without any network access.
//!
//! ```json
//! {
//!   "ticker": "ACME",
//!   "statements": {
//!     "annual": {
//!       "income": [{ "date": "2024-12-31", "Net Income": 120.0 }],
//!       "balance": [],
//!       "cash_flow": []
//!     }
//!   },
//!   "risk_free_rates": [{ "date": "2025-06-27", "rate": 0.043 }],
//!   "vendor_beta": 1.1,
//!   "company": { "payout_ratio": 0.2, "shares_outstanding": 100.0, "last_close_price": 25.0 },
//!   "prices": { "^GSPC": { "daily": [{ "date": "2025-06-27", "close": 6173.07 }] } }
//! }
//! ```

use super::{
    CLOSE_COLUMN, CompanyInfo, CompanyInfoSource, DATE_COLUMN, FinancialStatements, Interval,
    MarketDataSource, StatementSource, parse_date,
};
use crate::{Period, Result, ValuationError};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use tracing::debug;

/// One statement row: a period-end date and its line items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementRow {
    /// Period-end date (`YYYY-MM-DD`)
    pub date: String,
    /// Line items by vendor label; `null` for unreported
    #[serde(flatten)]
    pub values: BTreeMap<String, Option<f64>>,
}

/// Rows of the three statements for one period.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatementRows {
    /// Income statement rows
    pub income: Vec<StatementRow>,
    /// Balance sheet rows
    pub balance: Vec<StatementRow>,
    /// Cash-flow statement rows
    pub cash_flow: Vec<StatementRow>,
}

/// A dated risk-free yield.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatePoint {
    /// Observation date
    pub date: NaiveDate,
    /// Yield as a fraction
    pub rate: f64,
}

/// A dated closing price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Trading date
    pub date: NaiveDate,
    /// Closing price
    pub close: f64,
}

/// Everything a snapshot file contains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Ticker the snapshot describes
    pub ticker: String,
    /// Statement rows keyed by period (`annual`, `quarterly`)
    #[serde(default)]
    pub statements: HashMap<String, StatementRows>,
    /// Risk-free yield observations
    #[serde(default)]
    pub risk_free_rates: Vec<RatePoint>,
    /// Vendor-reported beta
    #[serde(default)]
    pub vendor_beta: Option<f64>,
    /// Company attributes
    #[serde(default)]
    pub company: CompanyInfo,
    /// Price histories keyed by symbol, then interval (`daily`, `weekly`)
    #[serde(default)]
    pub prices: HashMap<String, HashMap<String, Vec<PricePoint>>>,
}

/// Source backed by a [`Snapshot`].
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    snapshot: Snapshot,
}

impl SnapshotSource {
    /// Wrap an in-memory snapshot.
    pub const fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    /// Parse a snapshot from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Read a snapshot file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "snapshot loaded");
        Self::from_json(&json)
    }

    /// Ticker the snapshot describes.
    pub fn ticker(&self) -> &str {
        &self.snapshot.ticker
    }

    fn check_ticker(&self, ticker: &str) -> Result<()> {
        if ticker.eq_ignore_ascii_case(&self.snapshot.ticker) {
            Ok(())
        } else {
            Err(ValuationError::Source(format!(
                "snapshot holds {}, not {ticker}",
                self.snapshot.ticker
            )))
        }
    }
}

/// Build a `date` + one-column-per-label frame from statement rows.
///
/// Labels missing from a row become nulls.
fn statement_frame(rows: &[StatementRow]) -> Result<DataFrame> {
    let labels: BTreeSet<&str> = rows
        .iter()
        .flat_map(|row| row.values.keys().map(String::as_str))
        .collect();

    let mut dates = Vec::with_capacity(rows.len());
    for row in rows {
        dates.push(parse_date(&row.date)?.to_string());
    }

    let mut columns = vec![Column::new(DATE_COLUMN.into(), dates)];
    for label in labels {
        let values: Vec<Option<f64>> = rows
            .iter()
            .map(|row| row.values.get(label).copied().flatten())
            .collect();
        columns.push(Column::new(label.into(), values));
    }
    Ok(DataFrame::new(columns)?)
}

fn price_frame(points: &[PricePoint]) -> Result<DataFrame> {
    let dates: Vec<String> = points.iter().map(|p| p.date.to_string()).collect();
    let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
    let frame = DataFrame::new(vec![
        Column::new(DATE_COLUMN.into(), dates),
        Column::new(CLOSE_COLUMN.into(), closes),
    ])?;
    Ok(frame)
}

impl StatementSource for SnapshotSource {
    fn statements(&self, ticker: &str, period: Period) -> Result<FinancialStatements> {
        self.check_ticker(ticker)?;
        let rows = self
            .snapshot
            .statements
            .get(&period.to_string())
            .ok_or_else(|| ValuationError::Source(format!("no {period} statements for {ticker}")))?;
        Ok(FinancialStatements {
            income: statement_frame(&rows.income)?,
            balance: statement_frame(&rows.balance)?,
            cash_flow: statement_frame(&rows.cash_flow)?,
        })
    }
}

impl MarketDataSource for SnapshotSource {
    fn risk_free_rate(&self, date: NaiveDate) -> Result<f64> {
        self.snapshot
            .risk_free_rates
            .iter()
            .filter(|point| point.date <= date)
            .max_by_key(|point| point.date)
            .map(|point| point.rate)
            .ok_or_else(|| ValuationError::Source(format!("no risk-free rate on or before {date}")))
    }

    fn price_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<DataFrame> {
        let points = self
            .snapshot
            .prices
            .get(symbol)
            .and_then(|by_interval| by_interval.get(&interval.to_string()))
            .ok_or_else(|| ValuationError::Source(format!("no {interval} prices for {symbol}")))?;
        let mut in_range: Vec<PricePoint> = points
            .iter()
            .filter(|p| (start..=end).contains(&p.date))
            .copied()
            .collect();
        in_range.sort_by_key(|p| p.date);
        price_frame(&in_range)
    }

    fn vendor_beta(&self, ticker: &str) -> Result<Option<f64>> {
        self.check_ticker(ticker)?;
        Ok(self.snapshot.vendor_beta)
    }
}

impl CompanyInfoSource for SnapshotSource {
    fn company_info(&self, ticker: &str) -> Result<CompanyInfo> {
        self.check_ticker(ticker)?;
        Ok(self.snapshot.company)
    }
}
