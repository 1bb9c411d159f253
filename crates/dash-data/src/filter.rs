//! Date-range and predicate selection over record sets.

use chrono::NaiveDate;
use dash_core::models::{Condition, DateRange, RecordSet};
use tracing::debug;

/// Keep records whose designated timestamp falls on a date in
/// `[start, end]`. Null timestamps never match; `start > end` yields an
/// empty set.
///
/// Comparison is by calendar date, so a record at `23:59` on `end` is kept.
pub fn filter(records: &RecordSet, start: NaiveDate, end: NaiveDate) -> RecordSet {
    filter_range(records, &DateRange::new(start, end))
}

/// [`filter`] taking a [`DateRange`].
pub fn filter_range(records: &RecordSet, range: &DateRange) -> RecordSet {
    filter_range_on(records, records.timestamp_field(), range)
}

/// Range filter on an arbitrary timestamp column instead of the designated
/// one. An absent or non-timestamp column selects nothing.
pub fn filter_range_on(records: &RecordSet, field: &str, range: &DateRange) -> RecordSet {
    if range.is_inverted() {
        debug!(%range, "inverted date range selects nothing");
        return records.with_records(Vec::new());
    }

    let Some(idx) = records.schema().index_of(field) else {
        return records.with_records(Vec::new());
    };

    let kept: Vec<_> = records
        .records()
        .iter()
        .filter(|r| {
            r.values
                .get(idx)
                .and_then(|v| v.as_timestamp())
                .is_some_and(|ts| range.contains(ts.date()))
        })
        .cloned()
        .collect();

    debug!(
        %range,
        field,
        total = records.len(),
        kept = kept.len(),
        "range filter applied"
    );
    records.with_records(kept)
}

/// Keep records whose `field` satisfies `condition`.
///
/// A field the schema does not have matches nothing.
pub fn select_where(records: &RecordSet, field: &str, condition: &Condition) -> RecordSet {
    let Some(idx) = records.schema().index_of(field) else {
        debug!(field, "selection on absent column");
        return records.with_records(Vec::new());
    };

    let kept = records
        .records()
        .iter()
        .filter(|r| r.values.get(idx).is_some_and(|v| condition.matches(v)))
        .cloned()
        .collect();
    records.with_records(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{load, SchemaHints};
    use dash_core::models::Value;
    use dash_core::time_utils::TimezoneHandler;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn payments() -> RecordSet {
        let raw = "created_date,status,amount\n\
                   2024-01-01 00:00:00,succeeded,10\n\
                   2024-01-15 12:30:00,failed,20\n\
                   2024-01-31 23:59:59,succeeded,30\n\
                   2024-02-01 00:00:00,succeeded,40\n\
                   ,failed,50\n";
        load(
            raw,
            &SchemaHints::new("created_date").numbers(&["amount"]),
            &TimezoneHandler::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_filter_inclusive_date_bounds() {
        let set = payments();
        let january = filter(&set, d(2024, 1, 1), d(2024, 1, 31));
        // Includes the 23:59:59 record on the end date; excludes the null.
        assert_eq!(january.len(), 3);
    }

    #[test]
    fn test_filter_single_day() {
        let set = payments();
        let day = filter(&set, d(2024, 1, 15), d(2024, 1, 15));
        assert_eq!(day.len(), 1);
    }

    #[test]
    fn test_filter_inverted_range_is_empty() {
        let set = payments();
        assert!(filter(&set, d(2024, 2, 1), d(2024, 1, 1)).is_empty());
    }

    #[test]
    fn test_filter_no_match_is_empty_not_error() {
        let set = payments();
        assert!(filter(&set, d(2023, 1, 1), d(2023, 12, 31)).is_empty());
    }

    #[test]
    fn test_filter_is_idempotent() {
        let set = payments();
        let once = filter(&set, d(2024, 1, 10), d(2024, 2, 1));
        let twice = filter(&once, d(2024, 1, 10), d(2024, 2, 1));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_filter_excludes_null_timestamps_even_for_wide_range() {
        let set = payments();
        let all = filter(&set, d(1970, 1, 1), d(2100, 1, 1));
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_filter_range_on_secondary_timestamp() {
        let set = load(
            "created,customer_id,trial_end\n\
             2024-01-10,cus_1,2024-02-05\n\
             2024-01-11,cus_2,2024-01-20\n\
             2024-02-02,cus_3,\n",
            &SchemaHints::new("created").timestamps(&["trial_end"]),
            &TimezoneHandler::default(),
        )
        .unwrap();
        let february = DateRange::new(d(2024, 2, 1), d(2024, 2, 29));

        assert_eq!(filter_range(&set, &february).len(), 1);
        let ending = filter_range_on(&set, "trial_end", &february);
        assert_eq!(ending.len(), 1);
        assert_eq!(
            ending.value(&ending.records()[0], "customer_id"),
            Some(&Value::text("cus_1"))
        );
        assert!(filter_range_on(&set, "customer_id", &february).is_empty());
        assert!(filter_range_on(&set, "nope", &february).is_empty());
    }

    #[test]
    fn test_select_where_equals() {
        let set = payments();
        let failed = select_where(&set, "status", &Condition::Equals(Value::text("failed")));
        assert_eq!(failed.len(), 2);
    }

    #[test]
    fn test_select_where_greater_than() {
        let set = payments();
        let big = select_where(&set, "amount", &Condition::GreaterThan(25.0));
        assert_eq!(big.len(), 3);
    }

    #[test]
    fn test_select_where_absent_field() {
        let set = payments();
        assert!(select_where(&set, "nope", &Condition::GreaterThan(0.0)).is_empty());
    }
}
