//! CSV extract loading.
//!
//! Turns a raw delimited text blob into a typed [`RecordSet`]. Tokenising is
//! strict (every row must match the header width) while cell parsing is
//! tolerant: unparseable timestamps, numbers and flags become nulls.

use std::collections::HashSet;

use csv::{ReaderBuilder, Trim};
use dash_core::error::{DashError, Result};
use dash_core::models::{Column, ColumnKind, Record, RecordSet, Schema, Value};
use dash_core::time_utils::TimezoneHandler;
use tracing::{debug, warn};

// ── SchemaHints ───────────────────────────────────────────────────────────────

/// Column typing for one dataset. Columns not named here load as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaHints {
    /// Designated field used for range filtering; must exist in the header.
    pub timestamp_field: String,
    /// Additional date/time columns.
    pub timestamp_fields: Vec<String>,
    pub numeric_fields: Vec<String>,
    pub boolean_fields: Vec<String>,
}

impl SchemaHints {
    pub fn new(timestamp_field: &str) -> Self {
        Self {
            timestamp_field: timestamp_field.to_string(),
            timestamp_fields: Vec::new(),
            numeric_fields: Vec::new(),
            boolean_fields: Vec::new(),
        }
    }

    pub fn timestamps(mut self, fields: &[&str]) -> Self {
        self.timestamp_fields
            .extend(fields.iter().map(|f| f.to_string()));
        self
    }

    pub fn numbers(mut self, fields: &[&str]) -> Self {
        self.numeric_fields.extend(fields.iter().map(|f| f.to_string()));
        self
    }

    pub fn booleans(mut self, fields: &[&str]) -> Self {
        self.boolean_fields.extend(fields.iter().map(|f| f.to_string()));
        self
    }

    fn kind_for(&self, name: &str) -> ColumnKind {
        if name == self.timestamp_field || self.timestamp_fields.iter().any(|f| f == name) {
            ColumnKind::Timestamp
        } else if self.numeric_fields.iter().any(|f| f == name) {
            ColumnKind::Number
        } else if self.boolean_fields.iter().any(|f| f == name) {
            ColumnKind::Bool
        } else {
            ColumnKind::Text
        }
    }

    fn hinted_fields(&self) -> impl Iterator<Item = &String> {
        self.timestamp_fields
            .iter()
            .chain(self.numeric_fields.iter())
            .chain(self.boolean_fields.iter())
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load a raw byte blob as returned by a data source.
///
/// Invalid UTF-8 sequences are replaced rather than rejected.
pub fn load_bytes(raw: &[u8], hints: &SchemaHints, tz: &TimezoneHandler) -> Result<RecordSet> {
    match std::str::from_utf8(raw) {
        Ok(text) => load(text, hints, tz),
        Err(e) => {
            warn!(error = %e, "extract is not valid UTF-8; replacing invalid bytes");
            load(&String::from_utf8_lossy(raw), hints, tz)
        }
    }
}

/// Parse `raw` CSV text into a typed [`RecordSet`].
///
/// Fails with [`DashError::Load`] when the text has no header row, when the
/// designated timestamp column is missing, or when any row's field count
/// differs from the header. No partial set is returned.
pub fn load(raw: &str, hints: &SchemaHints, tz: &TimezoneHandler) -> Result<RecordSet> {
    let raw = raw.trim_start_matches('\u{feff}');

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .trim(Trim::All)
        .from_reader(raw.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| DashError::Load(format!("unreadable header: {}", e)))?
        .clone();
    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Err(DashError::Load("extract has no header row".to_string()));
    }

    let columns: Vec<Column> = headers
        .iter()
        .map(|name| Column {
            name: name.to_string(),
            kind: hints.kind_for(name),
        })
        .collect();

    if !columns.iter().any(|c| c.name == hints.timestamp_field) {
        return Err(DashError::Load(format!(
            "timestamp column '{}' not found",
            hints.timestamp_field
        )));
    }
    let present: HashSet<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    for missing in hints.hinted_fields().filter(|f| !present.contains(f.as_str())) {
        debug!(column = %missing, "hinted column absent from extract");
    }

    let mut records = Vec::new();
    let mut bad_timestamps = 0usize;

    for result in reader.records() {
        let row = result.map_err(|e| DashError::Load(e.to_string()))?;
        let values = columns
            .iter()
            .zip(row.iter())
            .map(|(column, cell)| {
                let value = parse_cell(cell, column.kind, tz);
                if column.kind == ColumnKind::Timestamp && value.is_null() && !cell.is_empty() {
                    bad_timestamps += 1;
                }
                value
            })
            .collect();
        records.push(Record::new(values));
    }

    if bad_timestamps > 0 {
        warn!(
            count = bad_timestamps,
            "unparseable timestamps stored as null"
        );
    }
    debug!(
        rows = records.len(),
        columns = columns.len(),
        timestamp_field = %hints.timestamp_field,
        "extract loaded"
    );

    Ok(RecordSet::new(
        Schema::new(columns, hints.timestamp_field.clone()),
        records,
    ))
}

// ── Cell parsing ──────────────────────────────────────────────────────────────

fn parse_cell(cell: &str, kind: ColumnKind, tz: &TimezoneHandler) -> Value {
    match kind {
        ColumnKind::Timestamp => tz
            .parse_timestamp(cell)
            .map(Value::Timestamp)
            .unwrap_or(Value::Null),
        ColumnKind::Number => parse_number(cell).map(Value::number).unwrap_or(Value::Null),
        ColumnKind::Bool => parse_bool(cell).map(Value::Bool).unwrap_or(Value::Null),
        ColumnKind::Text => {
            if cell.is_empty() {
                Value::Null
            } else {
                Value::Text(cell.to_string())
            }
        }
    }
}

/// Decimal parse tolerant of currency symbols and thousands separators.
pub fn parse_number(cell: &str) -> Option<f64> {
    let cleaned: String = cell
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

pub fn parse_bool(cell: &str) -> Option<bool> {
    match cell.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Some(true),
        "false" | "f" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn invoice_hints() -> SchemaHints {
        SchemaHints::new("created")
            .numbers(&["total_invoice_amount", "tax"])
            .booleans(&["paid"])
    }

    fn tz() -> TimezoneHandler {
        TimezoneHandler::default()
    }

    #[test]
    fn test_load_types_columns() {
        let raw = "created,customer_id,total_invoice_amount,tax,paid\n\
                   2024-01-05 10:00:00,cus_1,100.50,5,True\n\
                   2024-01-06,cus_2,,1.5,false\n";
        let set = load(raw, &invoice_hints(), &tz()).expect("load");

        assert_eq!(set.len(), 2);
        assert_eq!(set.timestamp_field(), "created");
        assert_eq!(set.schema().kind_of("created"), Some(ColumnKind::Timestamp));
        assert_eq!(set.schema().kind_of("customer_id"), Some(ColumnKind::Text));
        assert_eq!(
            set.schema().kind_of("total_invoice_amount"),
            Some(ColumnKind::Number)
        );

        let first = &set.records()[0];
        assert_eq!(
            set.value(first, "total_invoice_amount"),
            Some(&Value::Number(100.5))
        );
        assert_eq!(set.value(first, "paid"), Some(&Value::Bool(true)));

        let second = &set.records()[1];
        assert_eq!(set.value(second, "total_invoice_amount"), Some(&Value::Null));
        assert_eq!(
            set.value(second, "created")
                .and_then(Value::as_timestamp)
                .map(|t| t.date()),
            NaiveDate::from_ymd_opt(2024, 1, 6)
        );
    }

    #[test]
    fn test_unparseable_timestamp_becomes_null() {
        let raw = "created,tax\nyesterday,1\n2024-02-01,2\n";
        let set = load(raw, &invoice_hints(), &tz()).expect("tolerant load");
        assert_eq!(set.len(), 2);
        assert!(set.value(&set.records()[0], "created").unwrap().is_null());
        assert_eq!(set.timestamps().len(), 1);
    }

    #[test]
    fn test_nan_amount_is_null() {
        let raw = "created,total_invoice_amount\n2024-01-01,100\n2024-01-02,200\n2024-01-03,NaN\n";
        let set = load(raw, &invoice_hints(), &tz()).unwrap();
        assert!(set
            .value(&set.records()[2], "total_invoice_amount")
            .unwrap()
            .is_null());
    }

    #[test]
    fn test_inconsistent_column_count_is_load_error() {
        let raw = "created,tax\n2024-01-01,1\n2024-01-02,2,extra\n";
        let err = load(raw, &invoice_hints(), &tz()).unwrap_err();
        assert!(matches!(err, DashError::Load(_)), "got {err:?}");
    }

    #[test]
    fn test_empty_text_is_load_error() {
        let err = load("", &invoice_hints(), &tz()).unwrap_err();
        assert!(matches!(err, DashError::Load(_)));
    }

    #[test]
    fn test_missing_timestamp_column_is_load_error() {
        let err = load("id,tax\n1,2\n", &invoice_hints(), &tz()).unwrap_err();
        match err {
            DashError::Load(msg) => assert!(msg.contains("created")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_header_only_is_empty_set() {
        let set = load("created,tax\n", &invoice_hints(), &tz()).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.schema().columns().len(), 2);
    }

    #[test]
    fn test_bom_and_quoted_fields() {
        let raw = "\u{feff}created,description,tax\n2024-01-01,\"Plan, yearly\",3\n";
        let set = load(raw, &invoice_hints(), &tz()).unwrap();
        let rec = &set.records()[0];
        assert_eq!(
            set.value(rec, "description"),
            Some(&Value::text("Plan, yearly"))
        );
    }

    #[test]
    fn test_load_bytes_lossy_utf8() {
        let mut raw = b"created,name\n2024-01-01,Jos".to_vec();
        raw.push(0xff);
        raw.extend_from_slice(b"\n");
        let set = load_bytes(&raw, &SchemaHints::new("created"), &tz()).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_parse_number_variants() {
        assert_eq!(parse_number("1,234.50"), Some(1234.5));
        assert_eq!(parse_number("$ 12"), Some(12.0));
        assert_eq!(parse_number("-3"), Some(-3.0));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn test_parse_bool_variants() {
        assert_eq!(parse_bool("True"), Some(true));
        assert_eq!(parse_bool("FALSE"), Some(false));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("maybe"), None);
    }
}
