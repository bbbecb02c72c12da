//! Remote entities - typed views of JSON resources served over HTTP

use std::fmt::Debug;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::api::WriteResponse;
use crate::context::Scotch;
use crate::error::{ScotchError, ScotchResult};

/// Untyped pass-through fields kept from a JSON payload.
///
/// Declare it as `#[serde(flatten)] extra: Extra` so unknown keys survive a
/// decode/encode cycle instead of being rejected.
pub type Extra = serde_json::Map<String, Value>;

/// A resource living in a remote collection.
///
/// Equality is structural: implementors derive `PartialEq` over every field,
/// declared and pass-through. A [`ProxyCache`](crate::relationships::ProxyCache)
/// field never takes part in the comparison.
pub trait RemoteEntity:
    Serialize + DeserializeOwned + Debug + Clone + PartialEq + Send + Sync + 'static
{
    /// Path segment of the collection, e.g. `"cars"` for `/cars/{id}`.
    ///
    /// Checked when the accessor is first built, not when the type is defined.
    fn resource_directory() -> Option<&'static str> {
        None
    }

    /// Name used when a relationship targets this type by name
    fn entity_name() -> &'static str {
        super::short_type_name::<Self>()
    }

    /// Remote id, absent until the remote side assigned one
    fn id(&self) -> Option<i64>;
}

/// `update`/`delete` on an entity, delegating to its type's accessor
#[async_trait]
pub trait RemoteEntityExt: RemoteEntity {
    /// PUT this entity to `/{directory}/{id}`
    async fn update(&self, scotch: &Scotch) -> ScotchResult<WriteResponse>;

    /// DELETE `/{directory}/{id}`; the body is passed through as is
    async fn delete(&self, scotch: &Scotch) -> ScotchResult<Value>;
}

#[async_trait]
impl<E: RemoteEntity> RemoteEntityExt for E {
    async fn update(&self, scotch: &Scotch) -> ScotchResult<WriteResponse> {
        scotch.api::<E>()?.update(self).await
    }

    async fn delete(&self, scotch: &Scotch) -> ScotchResult<Value> {
        let id = self
            .id()
            .ok_or_else(|| ScotchError::MissingId(E::entity_name().to_string()))?;
        scotch.api::<E>()?.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        #[serde(default)]
        id: Option<i64>,
        name: String,
        #[serde(flatten)]
        extra: Extra,
    }

    impl RemoteEntity for Item {
        fn resource_directory() -> Option<&'static str> {
            Some("items")
        }

        fn id(&self) -> Option<i64> {
            self.id
        }
    }

    #[test]
    fn test_unknown_fields_are_kept() {
        let item: Item = serde_json::from_value(json!({
            "id": 3,
            "name": "Keyboard",
            "layout": "qwerty"
        }))
        .unwrap();

        assert_eq!(item.extra.get("layout"), Some(&json!("qwerty")));
        let back = serde_json::to_value(&item).unwrap();
        assert_eq!(back["layout"], json!("qwerty"));
    }

    #[test]
    fn test_equality_includes_pass_through_fields() {
        let plain: Item = serde_json::from_value(json!({"id": 1, "name": "Car"})).unwrap();
        let same: Item = serde_json::from_value(json!({"id": 1, "name": "Car"})).unwrap();
        let tagged: Item =
            serde_json::from_value(json!({"id": 1, "name": "Car", "color": "red"})).unwrap();

        assert_eq!(plain, same);
        assert_ne!(plain, tagged);
    }

    #[test]
    fn test_default_entity_name() {
        assert_eq!(Item::entity_name(), "Item");
    }

    #[tokio::test]
    async fn test_delete_without_id() {
        let scotch = Scotch::builder().api_url("http://localhost").build().unwrap();
        let item = Item {
            id: None,
            name: "Bottle".to_string(),
            extra: Extra::new(),
        };

        let err = item.delete(&scotch).await.unwrap_err();
        assert_eq!(err, ScotchError::MissingId("Item".to_string()));
    }
}
