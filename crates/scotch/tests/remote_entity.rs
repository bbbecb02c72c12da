//! Accessor behavior through a context

mod common;

use std::sync::Arc;

use common::{Car, CarService};
use scotch::api::{ApiResponse, Method};
use scotch::relationships::RegistryRoot;
use scotch::{MemoryRepository, RemoteEntity, Scotch, ScotchConfig, ScotchError};
use serde::{Deserialize, Serialize};

#[tokio::test]
async fn test_all_forwards_query_parameters() {
    let service = CarService::new().with_car(1, "My car").with_car(2, "Van");
    let scotch = service.scotch(Arc::new(MemoryRepository::new()));

    let cars = scotch
        .api::<Car>()
        .unwrap()
        .all(Some(&[("name", "My car")][..]))
        .await
        .unwrap();
    assert_eq!(cars.len(), 2);

    let requests = service.transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.as_str(), "http://cars.local/cars/?name=My+car");
}

#[tokio::test]
async fn test_non_json_body_is_decode_error() {
    let service = CarService::new();
    service
        .transport
        .route(Method::Get, "/cars/9", |_| ApiResponse::new(502, "Bad Gateway"));
    let scotch = service.scotch(Arc::new(MemoryRepository::new()));

    let err = scotch.api::<Car>().unwrap().get(9).await.unwrap_err();
    match err {
        ScotchError::RemoteDecode { url, status, .. } => {
            assert_eq!(url, "http://cars.local/cars/9");
            assert_eq!(status, 502);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_context_initialized_late() {
    let service = CarService::new().with_car(1, "My car");
    let scotch = Scotch::builder()
        .transport(service.transport.clone())
        .build()
        .unwrap();

    assert!(scotch.api::<Car>().unwrap_err().is_configuration());

    scotch
        .init(ScotchConfig::new().with_api_url("http://cars.local///"))
        .unwrap();
    let car = scotch.api::<Car>().unwrap().get(1).await.unwrap();
    assert_eq!(car.name, "My car");
}

mod fleet {
    use super::*;

    /// Another remote type that is also called `Car`
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Car {
        pub id: Option<i64>,
    }

    impl RemoteEntity for Car {
        fn resource_directory() -> Option<&'static str> {
            Some("fleet")
        }

        fn id(&self) -> Option<i64> {
            self.id
        }
    }
}

#[test]
fn test_ambiguous_names_are_reported() {
    let scotch = Scotch::builder()
        .remote::<Car>()
        .remote::<fleet::Car>()
        .build()
        .unwrap();

    let err = scotch
        .registry()
        .resolve(&"Car".into(), RegistryRoot::Remote)
        .unwrap_err();
    assert!(err.is_resolution());
    assert!(err.to_string().contains("fleet::Car"));
}
