//! Local store access
//!
//! Relationships only need one capability from the embedding persistence
//! layer: rows of a table whose field equals a value.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ScotchResult;
use crate::model::Row;

pub use memory::MemoryRepository;
#[cfg(feature = "postgres")]
pub use postgres::PostgresRepository;

#[async_trait]
pub trait LocalRepository: Send + Sync {
    /// All rows of `table` where `field == value`, possibly none
    async fn filter_by_equals(&self, table: &str, field: &str, value: &Value)
        -> ScotchResult<Vec<Row>>;

    /// First row of `table` where `field == value`
    async fn first_by_equals(
        &self,
        table: &str,
        field: &str,
        value: &Value,
    ) -> ScotchResult<Option<Row>> {
        Ok(self
            .filter_by_equals(table, field, value)
            .await?
            .into_iter()
            .next())
    }
}
