//! Data-source contracts.
//!
//! Retrieval of statements, market data and company metadata lives outside
//! this crate. The pipeline only depends on the traits below, and adapters
//! are passed in explicitly so that each valuation run sees exactly the data
//! it was handed.

pub mod snapshot;

pub use snapshot::SnapshotSource;

use crate::{Period, Result, ValuationError, metrics::Statement};
use chrono::NaiveDate;
use derive_more::Display;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Name of the period-end column in statement and price frames.
pub const DATE_COLUMN: &str = "date";

/// Name of the closing-price column in price frames.
pub const CLOSE_COLUMN: &str = "close";

/// Date format used in every frame.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|e| ValuationError::InvalidDate(format!("{value}: {e}")))
}

/// The three primary statements for one ticker and period.
///
/// Each frame has a `date` column (`YYYY-MM-DD`) and one numeric column per
/// vendor line-item label. Rows are periods in any order.
#[derive(Debug, Clone)]
pub struct FinancialStatements {
    /// Income statement
    pub income: DataFrame,
    /// Balance sheet
    pub balance: DataFrame,
    /// Cash-flow statement
    pub cash_flow: DataFrame,
}

impl FinancialStatements {
    /// Frame for a statement.
    pub const fn frame(&self, statement: Statement) -> &DataFrame {
        match statement {
            Statement::Income => &self.income,
            Statement::Balance => &self.balance,
            Statement::CashFlow => &self.cash_flow,
        }
    }
}

/// Sampling interval of a price history.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    /// One close per trading day
    #[display("daily")]
    Daily,
    /// One close per week
    #[display("weekly")]
    Weekly,
}

/// Company attributes used by the per-share step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyInfo {
    /// Dividends as a fraction of net income
    pub payout_ratio: Option<f64>,
    /// Shares outstanding
    pub shares_outstanding: Option<f64>,
    /// Last traded (previous close) price
    pub last_close_price: Option<f64>,
}

/// Supplies raw financial statements.
pub trait StatementSource: std::fmt::Debug {
    /// Fetch the statements for a ticker and period.
    fn statements(&self, ticker: &str, period: Period) -> Result<FinancialStatements>;
}

/// Supplies market-wide and per-security market data.
pub trait MarketDataSource: std::fmt::Debug {
    /// Risk-free rate (10-year government yield, as a fraction) observed on
    /// or most recently before `date`.
    fn risk_free_rate(&self, date: NaiveDate) -> Result<f64>;

    /// Closing prices for `symbol` between `start` and `end`, inclusive.
    ///
    /// Returns a frame with `date` and `close` columns.
    fn price_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<DataFrame>;

    /// Beta reported by the data vendor, if any.
    fn vendor_beta(&self, ticker: &str) -> Result<Option<f64>>;
}

/// Supplies company metadata.
pub trait CompanyInfoSource: std::fmt::Debug {
    /// Fetch payout ratio, shares outstanding and last close.
    fn company_info(&self, ticker: &str) -> Result<CompanyInfo>;
}

/// Last close in a price frame, by date.
pub fn last_close(prices: &DataFrame) -> Result<Option<f64>> {
    let sorted = prices
        .clone()
        .lazy()
        .filter(col(CLOSE_COLUMN).is_not_null())
        .sort([DATE_COLUMN], SortMultipleOptions::default())
        .collect()?;
    let closes = sorted.column(CLOSE_COLUMN)?.cast(&DataType::Float64)?;
    let last = closes.f64()?.into_iter().flatten().last();
    Ok(last)
}
