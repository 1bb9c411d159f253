//! Column selection for the tabular part of a view.

use dash_core::error::{DashError, Result};
use dash_core::models::{RecordSet, Schema};
use serde::Serialize;
use tracing::debug;

/// Rendered rows of a record set, every cell as display text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A validated list of columns to show, resolved against a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    columns: Vec<String>,
}

impl Projection {
    /// Resolve the columns to display.
    ///
    /// An explicit `requested` list must name only columns the schema has,
    /// otherwise [`DashError::UnknownColumns`] lists every unknown name.
    /// Without a request, `defaults` is used and entries the extract lacks
    /// are skipped.
    pub fn resolve(schema: &Schema, requested: Option<&[String]>, defaults: &[&str]) -> Result<Self> {
        match requested {
            Some(names) => {
                let unknown: Vec<String> = names
                    .iter()
                    .filter(|n| !schema.contains(n))
                    .cloned()
                    .collect();
                if !unknown.is_empty() {
                    return Err(DashError::UnknownColumns(unknown));
                }
                Ok(Self {
                    columns: names.to_vec(),
                })
            }
            None => {
                let columns = defaults
                    .iter()
                    .filter(|name| {
                        let present = schema.contains(name);
                        if !present {
                            debug!(column = %name, "default column absent; skipped");
                        }
                        present
                    })
                    .map(|n| n.to_string())
                    .collect();
                Ok(Self { columns })
            }
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Render `records` restricted to the projected columns, in order.
    pub fn apply(&self, records: &RecordSet) -> Table {
        let indices: Vec<Option<usize>> = self
            .columns
            .iter()
            .map(|c| records.schema().index_of(c))
            .collect();

        let rows = records
            .records()
            .iter()
            .map(|record| {
                indices
                    .iter()
                    .map(|idx| {
                        idx.and_then(|i| record.values.get(i))
                            .map(|v| v.display())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();

        Table {
            columns: self.columns.clone(),
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{load, SchemaHints};
    use dash_core::time_utils::TimezoneHandler;

    fn customers() -> RecordSet {
        load(
            "created,email,name,deleted\n\
             2024-01-05 00:00:00,a@x.io,Ann,false\n\
             2024-01-06 09:15:00,,Ben,true\n",
            &SchemaHints::new("created").booleans(&["deleted"]),
            &TimezoneHandler::default(),
        )
        .unwrap()
    }

    const DEFAULTS: &[&str] = &["created", "email", "phone", "name", "address_country"];

    #[test]
    fn test_defaults_skip_missing_columns() {
        let set = customers();
        let p = Projection::resolve(set.schema(), None, DEFAULTS).unwrap();
        assert_eq!(p.columns(), ["created", "email", "name"]);
    }

    #[test]
    fn test_explicit_unknown_columns_error() {
        let set = customers();
        let requested = vec!["name".to_string(), "foo".to_string(), "bar".to_string()];
        let err = Projection::resolve(set.schema(), Some(&requested), DEFAULTS).unwrap_err();
        match err {
            DashError::UnknownColumns(cols) => assert_eq!(cols, vec!["foo", "bar"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_apply_renders_cells() {
        let set = customers();
        let requested = vec!["name".to_string(), "created".to_string(), "email".to_string()];
        let table = Projection::resolve(set.schema(), Some(&requested), DEFAULTS)
            .unwrap()
            .apply(&set);
        assert_eq!(table.columns, vec!["name", "created", "email"]);
        assert_eq!(
            table.rows,
            vec![
                vec!["Ann", "2024-01-05", "a@x.io"],
                vec!["Ben", "2024-01-06 09:15:00", ""],
            ]
        );
    }

    #[test]
    fn test_apply_empty_set() {
        let set = customers().with_records(vec![]);
        let table = Projection::resolve(set.schema(), None, DEFAULTS)
            .unwrap()
            .apply(&set);
        assert!(table.is_empty());
        assert_eq!(table.columns.len(), 3);
    }
}
