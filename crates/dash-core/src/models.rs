use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ── Value ─────────────────────────────────────────────────────────────────────

/// A single typed cell of a loaded extract.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Empty, unparseable or non-finite cell.
    Null,
    /// Decimal amount or count. Never NaN or infinite.
    Number(f64),
    /// Boolean flag such as `deleted` or `refunded`.
    Bool(bool),
    /// Free text, identifiers and categorical labels.
    Text(String),
    /// Wall-clock timestamp in the configured source timezone.
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Build a number cell, mapping non-finite input to [`Value::Null`].
    pub fn number(n: f64) -> Self {
        if n.is_finite() {
            Value::Number(n)
        } else {
            Value::Null
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view used by summation. Booleans count as 1 / 0.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Canonical text used for grouping and join keys.
    ///
    /// Integral numbers drop their fractional part so that `2` and `2.0`
    /// group together. `Null` has no key.
    pub fn key(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Number(n) => Some(format_plain_number(*n)),
            Value::Bool(b) => Some(b.to_string()),
            Value::Text(s) => Some(s.clone()),
            Value::Timestamp(ts) => Some(format_timestamp(ts)),
        }
    }

    /// Cell text for tabular display; empty for `Null`.
    pub fn display(&self) -> String {
        self.key().unwrap_or_default()
    }

    /// Loose equality used by [`Condition`]: numbers and booleans compare by
    /// value, text compares exactly, `Null` never matches anything.
    pub fn matches(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            _ => false,
        }
    }
}

fn format_plain_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Render a timestamp as `YYYY-MM-DD` at midnight, else with the time of day.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    if ts.time() == chrono::NaiveTime::MIN {
        ts.format("%Y-%m-%d").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

// ── Condition ─────────────────────────────────────────────────────────────────

/// Predicate over a single cell, used by conditional counts and selections.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Equals(Value),
    /// Negation of [`Condition::Equals`]; `Null` cells satisfy it.
    NotEquals(Value),
    OneOf(Vec<Value>),
    /// Strictly greater than, for numeric cells only.
    GreaterThan(f64),
}

impl Condition {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Condition::Equals(expected) => value.matches(expected),
            Condition::NotEquals(expected) => !value.matches(expected),
            Condition::OneOf(options) => options.iter().any(|o| value.matches(o)),
            Condition::GreaterThan(threshold) => match value {
                Value::Number(n) => n > threshold,
                _ => false,
            },
        }
    }
}

// ── Schema ────────────────────────────────────────────────────────────────────

/// How the loader types a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Timestamp,
    Number,
    Bool,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

/// Ordered column layout shared by every record of a [`RecordSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
    timestamp_field: String,
}

impl Schema {
    pub fn new(columns: Vec<Column>, timestamp_field: impl Into<String>) -> Self {
        Self {
            columns,
            timestamp_field: timestamp_field.into(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.kind)
    }

    /// The designated field used for date-range filtering.
    pub fn timestamp_field(&self) -> &str {
        &self.timestamp_field
    }
}

// ── Record / RecordSet ────────────────────────────────────────────────────────

/// One parsed row, aligned with its [`Schema`].
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub values: Vec<Value>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }
}

/// Ordered collection of records sharing a schema.
///
/// Every value in the designated timestamp column is either a
/// [`Value::Timestamp`] or [`Value::Null`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSet {
    schema: Arc<Schema>,
    records: Vec<Record>,
}

impl RecordSet {
    pub fn new(schema: Schema, records: Vec<Record>) -> Self {
        Self {
            schema: Arc::new(schema),
            records,
        }
    }

    /// A new set with the same schema and the given records.
    pub fn with_records(&self, records: Vec<Record>) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            records,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn timestamp_field(&self) -> &str {
        self.schema.timestamp_field()
    }

    /// Cell `field` of `record`; `None` if the schema has no such column.
    pub fn value<'a>(&self, record: &'a Record, field: &str) -> Option<&'a Value> {
        self.schema
            .index_of(field)
            .and_then(|idx| record.values.get(idx))
    }

    /// All cells of column `field`, or `None` if the column is absent.
    pub fn column(&self, field: &str) -> Option<impl Iterator<Item = &Value> + '_> {
        let idx = self.schema.index_of(field)?;
        Some(self.records.iter().filter_map(move |r| r.values.get(idx)))
    }

    /// Non-null values of the designated timestamp field.
    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.column(self.timestamp_field())
            .map(|col| col.filter_map(Value::as_timestamp).collect())
            .unwrap_or_default()
    }

    /// The min/max observed timestamp dates, the default range for a view.
    pub fn observed_range(&self) -> Option<DateRange> {
        let stamps = self.timestamps();
        let min = stamps.iter().min()?.date();
        let max = stamps.iter().max()?.date();
        Some(DateRange::new(min, max))
    }
}

// ── DateRange ─────────────────────────────────────────────────────────────────

/// Inclusive `[start, end]` calendar-date range.
///
/// `start > end` is allowed and simply matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} → {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

// ── Metrics ───────────────────────────────────────────────────────────────────

/// How a scalar metric is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricFormat {
    Currency,
    Count,
    Percent,
}

/// A computed scalar, tagged with its presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum MetricValue {
    Currency(f64),
    Count(u64),
    Percent(f64),
    /// Sentinel for a ratio whose denominator was zero.
    Undefined,
}

impl MetricValue {
    /// Numeric view; `None` for [`MetricValue::Undefined`].
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Currency(v) | MetricValue::Percent(v) => Some(*v),
            MetricValue::Count(c) => Some(*c as f64),
            MetricValue::Undefined => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    /// Stable identifier, e.g. `"total_amount"`.
    pub key: String,
    /// Display label, e.g. `"Total Amount"`.
    pub label: String,
    pub value: MetricValue,
}

/// Ordered metric name → value mapping produced for one filtered set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricBundle {
    pub metrics: Vec<Metric>,
}

impl MetricBundle {
    pub fn push(&mut self, key: impl Into<String>, label: impl Into<String>, value: MetricValue) {
        self.metrics.push(Metric {
            key: key.into(),
            label: label.into(),
            value,
        });
    }

    pub fn get(&self, key: &str) -> Option<&MetricValue> {
        self.metrics.iter().find(|m| m.key == key).map(|m| &m.value)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

// ── Series / distributions ────────────────────────────────────────────────────

/// Calendar bucket used for time-series grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Month,
    Day,
}

impl Period {
    /// Bucket label: `"%Y-%m"` for months, `"%Y-%m-%d"` for days.
    ///
    /// Both formats sort lexicographically in chronological order.
    pub fn label(self, ts: &NaiveDateTime) -> String {
        match self {
            Period::Month => ts.format("%Y-%m").to_string(),
            Period::Day => ts.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Ordered `(period label, value)` points, ascending by period.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeSeries {
    pub points: Vec<(String, f64)>,
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.points.iter().map(|(_, v)| v).sum()
    }
}

/// Ordered `(category, value)` entries; values are counts or percentages.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoricalDistribution {
    pub entries: Vec<(String, f64)>,
}

impl CategoricalDistribution {
    pub fn new(entries: Vec<(String, f64)>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, category: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, v)| *v)
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, v)| v).sum()
    }
}
