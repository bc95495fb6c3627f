//! Metric extraction - resolving vendor statements into named series.
//!
//! [`MetricSet::extract`] reads each catalog metric from its statement using
//! the first matching label alias. A required metric with no matching label
//! fails the extraction with `MetricNotFound`. Optional metrics are kept only
//! when found.

pub mod catalog;
pub mod series;

pub use catalog::{Metric, Statement};
pub use series::{MetricPoint, MetricSeries, MetricSnapshot};

use crate::{
    Result, ValuationError,
    source::{DATE_COLUMN, FinancialStatements, parse_date},
};
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// All metrics extracted for one ticker and period.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSet {
    series: BTreeMap<Metric, MetricSeries>,
}

impl MetricSet {
    /// Build a set from already-extracted series.
    pub fn from_series(series: impl IntoIterator<Item = MetricSeries>) -> Self {
        Self {
            series: series.into_iter().map(|s| (s.metric(), s)).collect(),
        }
    }

    /// Resolve every catalog metric from the statements.
    pub fn extract(statements: &FinancialStatements) -> Result<Self> {
        let income = latest_first(&statements.income)?;
        let balance = latest_first(&statements.balance)?;
        let cash_flow = latest_first(&statements.cash_flow)?;

        let mut series = BTreeMap::new();
        for metric in Metric::ALL {
            let frame = match metric.statement() {
                Statement::Income => &income,
                Statement::Balance => &balance,
                Statement::CashFlow => &cash_flow,
            };
            match read_series(frame, metric)? {
                Some(found) => {
                    series.insert(metric, found);
                }
                None if metric.is_required() => return Err(not_found(metric)),
                None => debug!(%metric, "optional metric not reported"),
            }
        }

        // Total debt falls back to current + non-current liabilities
        if !series.contains_key(&Metric::TotalDebt) {
            if let (Some(current), Some(non_current)) = (
                series.get(&Metric::CurrentLiabilities),
                series.get(&Metric::NonCurrentLiabilities),
            ) {
                let points = current
                    .points()
                    .iter()
                    .zip(non_current.points())
                    .map(|(c, n)| MetricPoint {
                        date: c.date,
                        value: c.value + n.value,
                    })
                    .collect();
                debug!("total debt derived from current and non-current liabilities");
                series.insert(Metric::TotalDebt, MetricSeries::new(Metric::TotalDebt, points));
            }
        }

        Ok(Self { series })
    }

    /// Series for a metric.
    pub fn get(&self, metric: Metric) -> Result<&MetricSeries> {
        self.series.get(&metric).ok_or_else(|| not_found(metric))
    }

    /// Series for a metric, if present.
    pub fn try_get(&self, metric: Metric) -> Option<&MetricSeries> {
        self.series.get(&metric)
    }

    /// Value of a metric `lag` periods back.
    pub fn value(&self, metric: Metric, lag: usize) -> Result<f64> {
        let series = self.get(metric)?;
        series
            .value(lag)
            .ok_or(ValuationError::InsufficientHistory {
                required: lag + 1,
                available: series.len(),
            })
    }

    /// Length of the shortest series among `metrics`.
    pub fn available_periods(&self, metrics: &[Metric]) -> Result<usize> {
        metrics
            .iter()
            .map(|m| self.get(*m).map(MetricSeries::len))
            .try_fold(usize::MAX, |acc, len| len.map(|len| acc.min(len)))
            .map(|shortest| if metrics.is_empty() { 0 } else { shortest })
    }

    /// Values of every present metric at `lag`.
    pub fn snapshot(&self, lag: usize) -> MetricSnapshot {
        let mut snapshot = MetricSnapshot::new(lag);
        for (metric, series) in &self.series {
            if let Some(point) = series.points().get(lag) {
                snapshot.insert(*metric, point.date, point.value);
            }
        }
        snapshot
    }

    /// Number of metrics present.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Whether no metrics are present.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

fn not_found(metric: Metric) -> ValuationError {
    ValuationError::MetricNotFound {
        metric: metric.to_string(),
        aliases: metric.aliases().iter().map(|a| a.to_string()).collect(),
    }
}

fn latest_first(frame: &DataFrame) -> Result<DataFrame> {
    let sorted = frame
        .clone()
        .lazy()
        .sort(
            [DATE_COLUMN],
            SortMultipleOptions::default().with_order_descending(true),
        )
        .collect()?;
    Ok(sorted)
}

/// Read one metric from a frame already sorted most-recent-first.
///
/// The series stops at the first null, except for metrics where a null means
/// zero. Returns `None` when no alias names a column.
fn read_series(frame: &DataFrame, metric: Metric) -> Result<Option<MetricSeries>> {
    let Some(label) = metric
        .aliases()
        .iter()
        .find(|label| frame.column(label).is_ok())
    else {
        return Ok(None);
    };

    let values = frame.column(label)?.cast(&DataType::Float64)?;
    let values = values.f64()?;
    let dates = frame.column(DATE_COLUMN)?.str()?;

    let mut points = Vec::with_capacity(frame.height());
    for (date, value) in dates.into_iter().zip(values.into_iter()) {
        let Some(date) = date else {
            return Err(ValuationError::InvalidDate(format!(
                "null period date in {metric} column"
            )));
        };
        let value = match value {
            Some(v) => v,
            None if metric.null_is_zero() => 0.0,
            None => {
                if points.is_empty() {
                    warn!(%metric, label, date, "most recent value missing, no usable history");
                } else {
                    debug!(%metric, date, "series truncated at first missing value");
                }
                break;
            }
        };
        let value = if metric.stored_as_magnitude() {
            value.abs()
        } else {
            value
        };
        points.push(MetricPoint {
            date: parse_date(date)?,
            value,
        });
    }

    debug!(%metric, label, periods = points.len(), "metric resolved");
    Ok(Some(MetricSeries::new(metric, points)))
}
