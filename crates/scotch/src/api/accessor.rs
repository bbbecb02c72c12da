//! ApiAccessor - REST access to the collection of one remote entity type

use std::fmt::{self, Display};
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::transport::{ApiRequest, ApiResponse, HttpTransport, Method};
use crate::error::{ScotchError, ScotchResult};
use crate::model::{Extra, RemoteEntity};

/// Marker value a create/update response must carry in its `msg` field
pub const SUCCESS_MARKER: &str = "Success";

/// Body of a create/update response: `{"msg": "Success" | other, ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteResponse {
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl WriteResponse {
    pub fn is_success(&self) -> bool {
        self.msg.as_deref() == Some(SUCCESS_MARKER)
    }
}

/// Accessor bound to the collection of `E`.
///
/// Holds nothing but the base URL, the resource directory and a transport
/// handle, so one instance per type is shared by every caller.
pub struct ApiAccessor<E> {
    base_url: Url,
    resource_directory: &'static str,
    transport: Arc<dyn HttpTransport>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> fmt::Debug for ApiAccessor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiAccessor")
            .field("base_url", &self.base_url.as_str())
            .field("resource_directory", &self.resource_directory)
            .finish()
    }
}

impl<E: RemoteEntity> ApiAccessor<E> {
    /// Build an accessor, failing if `E` declares no resource directory
    pub fn new(base_url: Url, transport: Arc<dyn HttpTransport>) -> ScotchResult<Self> {
        let resource_directory = E::resource_directory()
            .map(|directory| directory.trim_matches('/'))
            .filter(|directory| !directory.is_empty())
            .ok_or_else(|| {
                ScotchError::configuration(format!(
                    "remote entity '{}' must have a resource directory",
                    E::entity_name()
                ))
            })?;

        if base_url.cannot_be_a_base() {
            return Err(ScotchError::configuration(format!(
                "'{}' cannot be used as an API base URL",
                base_url
            )));
        }

        Ok(Self {
            base_url,
            resource_directory,
            transport,
            _entity: PhantomData,
        })
    }

    pub fn resource_directory(&self) -> &'static str {
        self.resource_directory
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `base/directory/subdirectory`, with `params` form-encoded as the query
    pub fn build_url(&self, subdirectory: &str, params: Option<&[(&str, &str)]>) -> Url {
        let mut url = self.base_url.clone();
        let path = format!(
            "{}/{}/{}",
            self.base_url.path().trim_end_matches('/'),
            self.resource_directory,
            subdirectory.trim_start_matches('/')
        );
        url.set_path(&path);
        url.set_query(None);
        url.set_fragment(None);

        if let Some(params) = params.filter(|params| !params.is_empty()) {
            url.query_pairs_mut().extend_pairs(params.iter());
        }

        url
    }

    /// GET the collection root and decode every element
    pub async fn all(&self, params: Option<&[(&str, &str)]>) -> ScotchResult<Vec<E>> {
        let url = self.build_url("", params);
        let response = self.send(Method::Get, url.clone(), None).await?;
        decode(&url, &response)
    }

    /// GET `/{directory}/{id}`
    pub async fn get(&self, id: impl Display) -> ScotchResult<E> {
        let url = self.build_url(&id.to_string(), None);
        let response = self.send(Method::Get, url.clone(), None).await?;
        decode(&url, &response)
    }

    /// POST the entity to the collection root.
    ///
    /// On the success marker the input entity is handed back unchanged; the
    /// id assigned remotely is not read back.
    pub async fn create(&self, entity: E) -> ScotchResult<E> {
        let url = self.build_url("", None);
        let body = encode(&entity)?;
        let response = self.send(Method::Post, url.clone(), Some(body)).await?;
        check_marker("create", &url, &response)?;
        Ok(entity)
    }

    /// PUT the entity to `/{directory}/{id}`
    pub async fn update(&self, entity: &E) -> ScotchResult<WriteResponse> {
        let id = entity
            .id()
            .ok_or_else(|| ScotchError::MissingId(E::entity_name().to_string()))?;
        let url = self.build_url(&id.to_string(), None);
        let body = encode(entity)?;
        let response = self.send(Method::Put, url.clone(), Some(body)).await?;
        check_marker("update", &url, &response)
    }

    /// DELETE `/{directory}/{id}`, returning whatever the service answered
    pub async fn delete(&self, id: impl Display) -> ScotchResult<Value> {
        let url = self.build_url(&id.to_string(), None);
        let response = self.send(Method::Delete, url, None).await?;

        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&response.body).unwrap_or(Value::String(response.body)))
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<String>,
    ) -> ScotchResult<ApiResponse> {
        debug!(
            entity = E::entity_name(),
            method = %method,
            url = %url,
            "remote request"
        );

        let mut request = ApiRequest::new(method, url);
        if let Some(body) = body {
            request = request.with_body(body);
        }

        let response = self.transport.execute(request).await?;
        if !response.is_success() {
            warn!(
                entity = E::entity_name(),
                method = %method,
                status = response.status,
                "remote answered with a non-success status"
            );
        }
        Ok(response)
    }
}

fn encode<E: RemoteEntity>(entity: &E) -> ScotchResult<String> {
    serde_json::to_string(entity).map_err(|e| {
        ScotchError::configuration(format!(
            "'{}' cannot be serialized: {}",
            E::entity_name(),
            e
        ))
    })
}

fn decode<T: DeserializeOwned>(url: &Url, response: &ApiResponse) -> ScotchResult<T> {
    serde_json::from_str(&response.body).map_err(|e| ScotchError::RemoteDecode {
        url: url.to_string(),
        status: response.status,
        message: e.to_string(),
    })
}

fn check_marker(
    operation: &'static str,
    url: &Url,
    response: &ApiResponse,
) -> ScotchResult<WriteResponse> {
    let write: WriteResponse = decode(url, response)?;
    if write.is_success() {
        return Ok(write);
    }

    warn!(operation, url = %url, marker = ?write.msg, "remote write rejected");
    Err(ScotchError::RemoteWrite {
        operation,
        url: url.to_string(),
        marker: write.msg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryTransport;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Car {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<i64>,
        name: String,
    }

    impl RemoteEntity for Car {
        fn resource_directory() -> Option<&'static str> {
            Some("cars")
        }

        fn id(&self) -> Option<i64> {
            self.id
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Homeless {
        id: Option<i64>,
    }

    impl RemoteEntity for Homeless {
        fn id(&self) -> Option<i64> {
            self.id
        }
    }

    fn accessor(base: &str) -> (ApiAccessor<Car>, Arc<MemoryTransport>) {
        let transport = Arc::new(MemoryTransport::new());
        let accessor = ApiAccessor::new(Url::parse(base).unwrap(), transport.clone()).unwrap();
        (accessor, transport)
    }

    #[test]
    fn test_build_url() {
        let (cars, _) = accessor("http://localhost");
        assert_eq!(cars.build_url("", None).as_str(), "http://localhost/cars/");
        assert_eq!(cars.build_url("1", None).as_str(), "http://localhost/cars/1");
        assert_eq!(
            cars.build_url("", Some(&[("name", "My car"), ("limit", "5")][..])).as_str(),
            "http://localhost/cars/?name=My+car&limit=5"
        );
        assert_eq!(cars.build_url("", Some(&[][..])).as_str(), "http://localhost/cars/");
    }

    #[test]
    fn test_build_url_keeps_base_path() {
        let (cars, _) = accessor("https://api.example.com/v2");
        assert_eq!(
            cars.build_url("7/wheels", None).as_str(),
            "https://api.example.com/v2/cars/7/wheels"
        );
    }

    #[test]
    fn test_missing_directory_is_configuration_error() {
        let transport = Arc::new(MemoryTransport::new());
        let err = ApiAccessor::<Homeless>::new(Url::parse("http://localhost").unwrap(), transport)
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_all_and_get() {
        let (cars, transport) = accessor("http://localhost");
        transport.respond_json(
            Method::Get,
            "/cars/",
            200,
            &json!([{"id": 1, "name": "Car"}, {"id": 2, "name": "Van"}]),
        );
        transport.respond_json(Method::Get, "/cars/2", 200, &json!({"id": 2, "name": "Van"}));

        let all = cars.all(None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Car");

        let van = cars.get(2).await.unwrap();
        assert_eq!(van, Car { id: Some(2), name: "Van".to_string() });
    }

    #[tokio::test]
    async fn test_get_decode_failure() {
        let (cars, transport) = accessor("http://localhost");
        transport.route(Method::Get, "/cars/1", |_| ApiResponse::new(500, "<html>oops</html>"));
        transport.respond_json(Method::Get, "/cars/2", 200, &json!({"id": 2}));

        let err = cars.get(1).await.unwrap_err();
        assert!(matches!(err, ScotchError::RemoteDecode { status: 500, .. }));

        let err = cars.get(2).await.unwrap_err();
        assert!(matches!(err, ScotchError::RemoteDecode { status: 200, .. }));
    }

    #[tokio::test]
    async fn test_create_contract() {
        let (cars, transport) = accessor("http://localhost");
        transport.respond_json(Method::Post, "/cars/", 200, &json!({"msg": "Success"}));

        let car = Car { id: None, name: "voila".to_string() };
        let created = cars.create(car.clone()).await.unwrap();
        assert_eq!(created, car);

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].body.as_deref(), Some(r#"{"name":"voila"}"#));
    }

    #[tokio::test]
    async fn test_create_rejected() {
        let (cars, transport) = accessor("http://localhost");
        transport.respond_json(Method::Post, "/cars/", 400, &json!({"msg": "Failed"}));

        let err = cars
            .create(Car { id: None, name: "voila".to_string() })
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ScotchError::RemoteWrite {
                operation: "create",
                url: "http://localhost/cars/".to_string(),
                marker: Some("Failed".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_update_requires_id() {
        let (cars, transport) = accessor("http://localhost");
        let err = cars
            .update(&Car { id: None, name: "x".to_string() })
            .await
            .unwrap_err();

        assert!(matches!(err, ScotchError::MissingId(_)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_update_marker_missing() {
        let (cars, transport) = accessor("http://localhost");
        transport.respond_json(Method::Put, "/cars/3", 200, &json!({"status": "ok"}));

        let err = cars
            .update(&Car { id: Some(3), name: "x".to_string() })
            .await
            .unwrap_err();
        assert!(matches!(err, ScotchError::RemoteWrite { marker: None, .. }));
    }

    #[tokio::test]
    async fn test_delete_passes_body_through() {
        let (cars, transport) = accessor("http://localhost");
        transport.respond_json(Method::Delete, "/cars/1", 200, &json!({"msg": "Deleted"}));
        transport.route(Method::Delete, "/cars/2", |_| ApiResponse::new(204, ""));
        transport.route(Method::Delete, "/cars/3", |_| ApiResponse::new(200, "gone"));

        assert_eq!(cars.delete(1).await.unwrap(), json!({"msg": "Deleted"}));
        assert_eq!(cars.delete(2).await.unwrap(), Value::Null);
        assert_eq!(cars.delete(3).await.unwrap(), json!("gone"));
    }
}
