//! Local models - rows owned by the embedding persistence layer

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ScotchError, ScotchResult};

/// A row as returned by a [`LocalRepository`](crate::repository::LocalRepository)
pub type Row = serde_json::Map<String, Value>;

/// Table-backed type that relationships can load from the local store
pub trait LocalModel: DeserializeOwned + Send + Sync + 'static {
    /// Table name for this model
    fn table_name() -> &'static str;

    /// Name used when a relationship targets this type by name
    fn model_name() -> &'static str {
        super::short_type_name::<Self>()
    }

    /// Create a model instance from a repository row
    fn from_row(row: Row) -> ScotchResult<Self> {
        serde_json::from_value(Value::Object(row)).map_err(|e| {
            ScotchError::local_store(format!(
                "row of '{}' does not decode into {}: {}",
                Self::table_name(),
                Self::model_name(),
                e
            ))
        })
    }
}
