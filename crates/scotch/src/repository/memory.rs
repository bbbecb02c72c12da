//! In-memory repository: JSON rows grouped by table

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use tracing::trace;

use super::LocalRepository;
use crate::error::{ScotchError, ScotchResult};
use crate::model::Row;

#[derive(Debug, Default)]
pub struct MemoryRepository {
    tables: DashMap<String, Vec<Row>>,
    queries: AtomicUsize,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row to `table`
    pub fn insert(&self, table: &str, row: Row) {
        self.tables.entry(table.to_string()).or_default().push(row);
    }

    /// Append any serializable value that encodes as a JSON object
    pub fn insert_record<T: Serialize>(&self, table: &str, record: &T) -> ScotchResult<()> {
        match serde_json::to_value(record) {
            Ok(Value::Object(row)) => {
                self.insert(table, row);
                Ok(())
            }
            Ok(other) => Err(ScotchError::local_store(format!(
                "a row of '{}' must be a JSON object, got {}",
                table, other
            ))),
            Err(e) => Err(ScotchError::local_store(e.to_string())),
        }
    }

    /// Set `field = value` on every row of `table` matching `filter_field == filter_value`,
    /// returning how many rows changed
    pub fn update_where(
        &self,
        table: &str,
        filter_field: &str,
        filter_value: &Value,
        field: &str,
        value: Value,
    ) -> usize {
        let Some(mut rows) = self.tables.get_mut(table) else {
            return 0;
        };

        let mut updated = 0;
        for row in rows.iter_mut().filter(|row| row.get(filter_field) == Some(filter_value)) {
            row.insert(field.to_string(), value.clone());
            updated += 1;
        }
        updated
    }

    /// Snapshot of every row in `table`
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .get(table)
            .map(|rows| rows.clone())
            .unwrap_or_default()
    }

    /// Number of filter queries answered so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocalRepository for MemoryRepository {
    async fn filter_by_equals(
        &self,
        table: &str,
        field: &str,
        value: &Value,
    ) -> ScotchResult<Vec<Row>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        trace!(table, field, %value, "in-memory filter");

        Ok(self
            .tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| row.get(field) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
