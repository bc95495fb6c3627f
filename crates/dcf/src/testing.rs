//! Deterministic in-memory sources shared by the unit tests.

use crate::{
    Period, Result, ValuationError,
    metrics::MetricSet,
    source::{
        CLOSE_COLUMN, CompanyInfo, CompanyInfoSource, DATE_COLUMN, FinancialStatements, Interval,
        MarketDataSource, StatementSource,
    },
};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::HashMap;

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Valuation date used across the tests.
pub(crate) fn as_of() -> NaiveDate {
    date(2025, 6, 30)
}

/// Four fiscal years, most recent 2024, listed oldest-first to exercise
/// sorting.
///
/// Per-period FCFE is 150, 135, 120, 115 (2024 back to 2021). ROE in 2024 is
/// 120 / 1000 = 0.12 and the effective tax rate is 0.2 in every year.
pub(crate) fn annual_statements() -> FinancialStatements {
    let dates = ["2021-12-31", "2022-12-31", "2023-12-31", "2024-12-31"];
    let income = df![
        DATE_COLUMN => dates,
        "Operating Income" => [120.0, 140.0, 160.0, 180.0],
        "EBITDA" => [150.0, 175.0, 200.0, 220.0],
        "Tax Provision" => [24.0, 28.0, 32.0, 36.0],
        "Pretax Income" => [120.0, 140.0, 160.0, 180.0],
        "Net Income" => [90.0, 100.0, 110.0, 120.0],
        "Interest Expense" => [-9.0, -10.0, -11.0, -12.0],
    ]
    .unwrap();
    let balance = df![
        DATE_COLUMN => dates,
        "Total Assets" => [1700.0, 1800.0, 1900.0, 2000.0],
        "Total Equity Gross Minority Interest" => [850.0, 900.0, 950.0, 1000.0],
        "Total Liabilities Net Minority Interest" => [510.0, 540.0, 570.0, 600.0],
        "Total Debt" => [270.0, 280.0, 290.0, 300.0],
        "Total Current Assets" => [400.0, 430.0, 460.0, 500.0],
        "Total Current Liabilities" => [170.0, 180.0, 190.0, 200.0],
        "Total Non Current Liabilities Net Minority Interest" => [340.0, 360.0, 380.0, 400.0],
        "Cash And Cash Equivalents" => [120.0, 130.0, 140.0, 150.0],
        "Invested Capital" => [None, Some(1100.0), Some(1150.0), Some(1200.0)],
    ]
    .unwrap();
    let cash_flow = df![
        DATE_COLUMN => dates,
        "Operating Cash Flow" => [150.0, 160.0, 180.0, 200.0],
        "Capital Expenditure" => [-30.0, -30.0, -35.0, -40.0],
        "Repayment Of Debt" => [-10.0, -10.0, -15.0, -20.0],
        "Issuance Of Debt" => [Some(5.0), None, Some(5.0), Some(10.0)],
    ]
    .unwrap();

    FinancialStatements {
        income,
        balance,
        cash_flow,
    }
}

pub(crate) fn sample_metrics() -> MetricSet {
    MetricSet::extract(&annual_statements()).unwrap()
}

/// Prices keyed by symbol and interval, filtered by date on request.
#[derive(Debug, Clone)]
pub(crate) struct FakeSource {
    pub(crate) ticker: String,
    pub(crate) statements: FinancialStatements,
    pub(crate) risk_free_rate: Option<f64>,
    pub(crate) vendor_beta: Option<f64>,
    pub(crate) prices: HashMap<(String, Interval), DataFrame>,
    pub(crate) info: CompanyInfo,
}

impl FakeSource {
    /// Source with the annual fixture, rf = 3%, vendor beta 1.2, and an
    /// index that compounds 8% a year over the premium window.
    pub(crate) fn new() -> Self {
        let mut prices = HashMap::new();
        prices.insert(
            ("^GSPC".to_string(), Interval::Daily),
            df![
                DATE_COLUMN => ["2022-06-27", "2022-06-29", "2025-06-26", "2025-06-27"],
                CLOSE_COLUMN => [99.0, 100.0, 125.0, 100.0 * 1.08_f64.powi(3)],
            ]
            .unwrap(),
        );

        Self {
            ticker: "ACME".to_string(),
            statements: annual_statements(),
            risk_free_rate: Some(0.03),
            vendor_beta: Some(1.2),
            prices,
            info: CompanyInfo {
                payout_ratio: Some(0.2),
                shares_outstanding: Some(100.0),
                last_close_price: Some(25.0),
            },
        }
    }

    pub(crate) fn with_weekly_prices(mut self, stock: &[f64], market: &[f64]) -> Self {
        let start = date(2024, 1, 5);
        let dates: Vec<String> = (0..stock.len().max(market.len()))
            .map(|i| (start + chrono::Duration::weeks(i as i64)).to_string())
            .collect();
        self.prices.insert(
            (self.ticker.clone(), Interval::Weekly),
            df![DATE_COLUMN => &dates[..stock.len()], CLOSE_COLUMN => stock].unwrap(),
        );
        self.prices.insert(
            ("^GSPC".to_string(), Interval::Weekly),
            df![DATE_COLUMN => &dates[..market.len()], CLOSE_COLUMN => market].unwrap(),
        );
        self
    }
}

impl StatementSource for FakeSource {
    fn statements(&self, ticker: &str, _period: Period) -> Result<FinancialStatements> {
        if ticker != self.ticker {
            return Err(ValuationError::Source(format!("unknown ticker {ticker}")));
        }
        Ok(self.statements.clone())
    }
}

impl MarketDataSource for FakeSource {
    fn risk_free_rate(&self, _date: NaiveDate) -> Result<f64> {
        self.risk_free_rate
            .ok_or_else(|| ValuationError::Source("no treasury data".to_string()))
    }

    fn price_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<DataFrame> {
        let frame = self
            .prices
            .get(&(symbol.to_string(), interval))
            .ok_or_else(|| ValuationError::Source(format!("no {interval} prices for {symbol}")))?;
        let filtered = frame
            .clone()
            .lazy()
            .filter(
                col(DATE_COLUMN)
                    .gt_eq(lit(start.to_string()))
                    .and(col(DATE_COLUMN).lt_eq(lit(end.to_string()))),
            )
            .collect()?;
        Ok(filtered)
    }

    fn vendor_beta(&self, _ticker: &str) -> Result<Option<f64>> {
        Ok(self.vendor_beta)
    }
}

impl CompanyInfoSource for FakeSource {
    fn company_info(&self, _ticker: &str) -> Result<CompanyInfo> {
        Ok(self.info)
    }
}
