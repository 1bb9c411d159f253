//! Inner join of two record sets on a shared identifier.

use std::collections::HashMap;

use dash_core::models::{Column, Record, RecordSet, Schema};
use tracing::debug;

/// Inner-join `left` to `right` where `left[left_key] == right[right_key]`.
///
/// Keys compare on their canonical text form and null keys never match.
/// Output follows left order, then right order for repeated matches.
/// Right-hand columns whose names collide with a left column get `suffix`
/// appended. The left set's designated timestamp field is kept.
///
/// If either key column is absent the result is empty.
pub fn inner_join(
    left: &RecordSet,
    right: &RecordSet,
    left_key: &str,
    right_key: &str,
    suffix: &str,
) -> RecordSet {
    let mut columns: Vec<Column> = left.schema().columns().to_vec();
    for col in right.schema().columns() {
        let name = if left.schema().contains(&col.name) {
            format!("{}{}", col.name, suffix)
        } else {
            col.name.clone()
        };
        columns.push(Column {
            name,
            kind: col.kind,
        });
    }
    let schema = Schema::new(columns, left.timestamp_field());

    let (Some(li), Some(ri)) = (
        left.schema().index_of(left_key),
        right.schema().index_of(right_key),
    ) else {
        debug!(left_key, right_key, "join key column missing");
        return RecordSet::new(schema, Vec::new());
    };

    let mut index: HashMap<String, Vec<&Record>> = HashMap::new();
    for record in right.records() {
        if let Some(key) = record.values.get(ri).and_then(|v| v.key()) {
            index.entry(key).or_default().push(record);
        }
    }

    let mut joined = Vec::new();
    for record in left.records() {
        let Some(key) = record.values.get(li).and_then(|v| v.key()) else {
            continue;
        };
        if let Some(matches) = index.get(&key) {
            for other in matches {
                let mut values = record.values.clone();
                values.extend(other.values.iter().cloned());
                joined.push(Record::new(values));
            }
        }
    }

    debug!(
        left = left.len(),
        right = right.len(),
        joined = joined.len(),
        "inner join"
    );
    RecordSet::new(schema, joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{load, SchemaHints};
    use dash_core::models::Value;
    use dash_core::time_utils::TimezoneHandler;

    fn subs() -> RecordSet {
        load(
            "created,customer_id,status\n\
             2024-01-01,1,active\n\
             2024-01-02,2,active\n\
             2024-01-03,3,canceled\n",
            &SchemaHints::new("created").numbers(&["customer_id"]),
            &TimezoneHandler::default(),
        )
        .unwrap()
    }

    fn customers() -> RecordSet {
        load(
            "created,id,name\n\
             2023-12-01,2,Bea\n\
             2023-12-02,3,Cy\n\
             2023-12-03,4,Dee\n",
            &SchemaHints::new("created"),
            &TimezoneHandler::default(),
        )
        .unwrap()
    }

    fn ids(set: &RecordSet, field: &str) -> Vec<String> {
        set.column(field)
            .unwrap()
            .filter_map(|v| v.key())
            .collect()
    }

    #[test]
    fn test_inner_join_keeps_only_matches() {
        let joined = inner_join(&subs(), &customers(), "customer_id", "id", "_customer");
        assert_eq!(ids(&joined, "customer_id"), vec!["2", "3"]);
        assert_eq!(ids(&joined, "name"), vec!["Bea", "Cy"]);
    }

    #[test]
    fn test_inner_join_suffixes_colliding_columns() {
        let joined = inner_join(&subs(), &customers(), "customer_id", "id", "_customer");
        let names = joined.schema().column_names();
        assert!(names.contains(&"created"));
        assert!(names.contains(&"created_customer"));
        assert_eq!(joined.timestamp_field(), "created");
    }

    #[test]
    fn test_inner_join_numeric_and_text_keys_match() {
        // customer_id loads as a number, id as text; "2" == "2".
        let joined = inner_join(&subs(), &customers(), "customer_id", "id", "_customer");
        let first = &joined.records()[0];
        assert_eq!(joined.value(first, "status"), Some(&Value::text("active")));
    }

    #[test]
    fn test_inner_join_duplicates_fan_out() {
        let dupes = load(
            "created,id,name\n2023-12-01,2,Bea\n2023-12-05,2,Bea again\n",
            &SchemaHints::new("created"),
            &TimezoneHandler::default(),
        )
        .unwrap();
        let joined = inner_join(&subs(), &dupes, "customer_id", "id", "_customer");
        assert_eq!(ids(&joined, "name"), vec!["Bea", "Bea again"]);
    }

    #[test]
    fn test_inner_join_missing_key_column_is_empty() {
        let joined = inner_join(&subs(), &customers(), "customer_id", "nope", "_customer");
        assert!(joined.is_empty());
    }
}
