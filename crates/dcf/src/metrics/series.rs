//! Time series of a single metric and point-in-time snapshots.

use super::Metric;
use crate::numeric;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// One observation of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricPoint {
    /// Period-end date
    pub date: NaiveDate,
    /// Reported value
    pub value: f64,
}

/// Observations of one metric ordered most-recent-first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSeries {
    metric: Metric,
    points: Vec<MetricPoint>,
}

impl MetricSeries {
    /// Build a series, sorting the points most-recent-first.
    pub fn new(metric: Metric, mut points: Vec<MetricPoint>) -> Self {
        points.sort_by(|a, b| b.date.cmp(&a.date));
        Self { metric, points }
    }

    /// The metric this series holds.
    pub const fn metric(&self) -> Metric {
        self.metric
    }

    /// Number of periods.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no periods.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// All points, most recent first.
    pub fn points(&self) -> &[MetricPoint] {
        &self.points
    }

    /// Value `lag` periods back (0 = most recent).
    pub fn value(&self, lag: usize) -> Option<f64> {
        self.points.get(lag).map(|p| p.value)
    }

    /// Period-end date `lag` periods back.
    pub fn date(&self, lag: usize) -> Option<NaiveDate> {
        self.points.get(lag).map(|p| p.date)
    }

    /// The most recent `n` values (fewer if the series is shorter).
    pub fn recent(&self, n: usize) -> Vec<f64> {
        self.points.iter().take(n).map(|p| p.value).collect()
    }

    /// Mean of the most recent `n` values.
    pub fn mean(&self, n: usize) -> Option<f64> {
        numeric::mean(&self.recent(n))
    }
}

/// Values of several metrics at one lag.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricSnapshot {
    /// Lag the snapshot was taken at
    pub lag: usize,
    /// Period-end date of the snapshot, when any metric reached this lag
    pub date: Option<NaiveDate>,
    values: BTreeMap<Metric, f64>,
}

impl MetricSnapshot {
    /// Create an empty snapshot for a lag.
    pub fn new(lag: usize) -> Self {
        Self {
            lag,
            date: None,
            values: BTreeMap::new(),
        }
    }

    /// Record a value.
    pub fn insert(&mut self, metric: Metric, date: NaiveDate, value: f64) {
        self.date.get_or_insert(date);
        self.values.insert(metric, value);
    }

    /// Value of a metric, if it was available at this lag.
    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.values.get(&metric).copied()
    }

    /// Number of metrics present.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no metric reached this lag.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
