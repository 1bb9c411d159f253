//! Scalar metrics and time-bucketed series over a filtered record set.

use std::collections::BTreeMap;

use dash_core::error::{DashError, Result};
use dash_core::models::{
    Condition, MetricBundle, MetricFormat, MetricValue, Period, RecordSet, TimeSeries, Value,
};
use tracing::debug;

// ── Aggregation ───────────────────────────────────────────────────────────────

/// A scalar computation over one record set.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    /// Sum of present numeric values; booleans count as 1 / 0.
    Sum(String),
    /// Number of records.
    Count,
    /// Number of records with a non-null value in the field.
    CountNonNull(String),
    /// Number of records whose field satisfies the condition.
    CountWhere(String, Condition),
    /// `numerator / denominator * 100`.
    Ratio {
        numerator: Box<Aggregation>,
        denominator: Box<Aggregation>,
    },
}

impl Aggregation {
    pub fn sum(field: &str) -> Self {
        Aggregation::Sum(field.to_string())
    }

    pub fn count_non_null(field: &str) -> Self {
        Aggregation::CountNonNull(field.to_string())
    }

    pub fn count_where(field: &str, condition: Condition) -> Self {
        Aggregation::CountWhere(field.to_string(), condition)
    }

    pub fn ratio(numerator: Aggregation, denominator: Aggregation) -> Self {
        Aggregation::Ratio {
            numerator: Box::new(numerator),
            denominator: Box::new(denominator),
        }
    }
}

/// One named entry of an aggregation request.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSpec {
    pub key: String,
    pub label: String,
    pub aggregation: Aggregation,
    pub format: MetricFormat,
}

impl MetricSpec {
    pub fn new(key: &str, label: &str, aggregation: Aggregation, format: MetricFormat) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            aggregation,
            format,
        }
    }
}

/// What each period bucket accumulates.
#[derive(Debug, Clone, PartialEq)]
pub enum PeriodValue {
    Sum(String),
    Count,
    CountNonNull(String),
}

// ── Primitive aggregates ──────────────────────────────────────────────────────

/// Sum of `field`; missing values and a missing column contribute zero.
pub fn sum(records: &RecordSet, field: &str) -> f64 {
    match records.column(field) {
        Some(col) => col.filter_map(Value::as_number).sum(),
        None => {
            debug!(field, "sum over absent column");
            0.0
        }
    }
}

pub fn count(records: &RecordSet) -> u64 {
    records.len() as u64
}

/// Records whose `field` is non-null; zero when the column is absent.
pub fn count_non_null(records: &RecordSet, field: &str) -> u64 {
    records
        .column(field)
        .map(|col| col.filter(|v| !v.is_null()).count() as u64)
        .unwrap_or(0)
}

pub fn count_where(records: &RecordSet, field: &str, condition: &Condition) -> u64 {
    records
        .column(field)
        .map(|col| col.filter(|v| condition.matches(v)).count() as u64)
        .unwrap_or(0)
}

/// `part / whole * 100`.
///
/// Fails with [`DashError::DivisionUndefined`] when `whole` is zero.
pub fn ratio(part: f64, whole: f64) -> Result<f64> {
    if whole == 0.0 {
        return Err(DashError::DivisionUndefined);
    }
    Ok(part / whole * 100.0)
}

/// Evaluate one aggregation to a number.
pub fn evaluate(records: &RecordSet, aggregation: &Aggregation) -> Result<f64> {
    Ok(match aggregation {
        Aggregation::Sum(field) => sum(records, field),
        Aggregation::Count => count(records) as f64,
        Aggregation::CountNonNull(field) => count_non_null(records, field) as f64,
        Aggregation::CountWhere(field, cond) => count_where(records, field, cond) as f64,
        Aggregation::Ratio {
            numerator,
            denominator,
        } => ratio(evaluate(records, numerator)?, evaluate(records, denominator)?)?,
    })
}

// ── Metric bundles ────────────────────────────────────────────────────────────

/// Compute every requested metric over `records`.
///
/// An undefined ratio becomes [`MetricValue::Undefined`] instead of failing
/// the whole bundle.
pub fn aggregate(records: &RecordSet, specs: &[MetricSpec]) -> MetricBundle {
    let mut bundle = MetricBundle::default();
    for spec in specs {
        let value = match evaluate(records, &spec.aggregation) {
            Ok(v) => match spec.format {
                MetricFormat::Currency => MetricValue::Currency(v),
                MetricFormat::Count => MetricValue::Count(v.max(0.0).round() as u64),
                MetricFormat::Percent => MetricValue::Percent(v),
            },
            Err(e) => {
                debug!(metric = %spec.key, error = %e, "metric undefined");
                MetricValue::Undefined
            }
        };
        bundle.push(spec.key.clone(), spec.label.clone(), value);
    }
    bundle
}

// ── Period grouping ───────────────────────────────────────────────────────────

/// Bucket records by `period` of `timestamp_field` and accumulate `value`.
///
/// Returns points sorted ascending by period. Periods without records are
/// omitted, as are records with a null timestamp.
pub fn group_by_period(
    records: &RecordSet,
    timestamp_field: &str,
    value: &PeriodValue,
    period: Period,
) -> TimeSeries {
    let Some(ts_idx) = records.schema().index_of(timestamp_field) else {
        debug!(timestamp_field, "grouping on absent column");
        return TimeSeries::default();
    };
    let value_idx = match value {
        PeriodValue::Sum(f) | PeriodValue::CountNonNull(f) => records.schema().index_of(f),
        PeriodValue::Count => None,
    };

    // BTreeMap keeps period labels sorted; both label formats sort
    // chronologically.
    let mut buckets: BTreeMap<String, f64> = BTreeMap::new();

    for record in records.records() {
        let Some(ts) = record.values.get(ts_idx).and_then(Value::as_timestamp) else {
            continue;
        };
        let cell = value_idx.and_then(|i| record.values.get(i));
        let contribution = match value {
            PeriodValue::Sum(_) => cell.and_then(Value::as_number).unwrap_or(0.0),
            PeriodValue::Count => 1.0,
            PeriodValue::CountNonNull(_) => match cell {
                Some(v) if !v.is_null() => 1.0,
                _ => 0.0,
            },
        };
        *buckets.entry(period.label(&ts)).or_insert(0.0) += contribution;
    }

    TimeSeries {
        points: buckets.into_iter().collect(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
