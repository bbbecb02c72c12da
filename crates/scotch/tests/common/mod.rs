//! Shared models and fixtures for scotch integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use scotch::api::{ApiResponse, Method};
use scotch::relationships::EntityType;
use scotch::{
    Extra, LocalModel, MemoryRepository, MemoryTransport, ProxyCache, RelationshipDescriptor,
    RelationshipOwner, RemoteEntity, Scotch, ScotchResult,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Remote car, with the tires stored locally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Car {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(flatten)]
    pub extra: Extra,
    #[serde(skip)]
    pub cache: ProxyCache<Car>,
}

impl Car {
    pub fn new(id: Option<i64>, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            extra: Extra::new(),
            cache: ProxyCache::default(),
        }
    }

    pub async fn tires(&self, scotch: &Scotch) -> ScotchResult<Vec<Arc<Tire>>> {
        self.cache.many(self, "tires", scotch).await
    }

    pub async fn spare(&self, scotch: &Scotch) -> ScotchResult<Option<Arc<Tire>>> {
        self.cache.one(self, "spare", scotch).await
    }
}

impl RemoteEntity for Car {
    fn resource_directory() -> Option<&'static str> {
        Some("cars")
    }

    fn id(&self) -> Option<i64> {
        self.id
    }
}

impl RelationshipOwner for Car {
    scotch::relationships! {
        tires => RelationshipDescriptor::local(EntityType::local::<Tire>()).key("car_id"),
        spare => RelationshipDescriptor::local("Tire").key("car_id").single(),
    }
}

/// Local tire row pointing at a remote car
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tire {
    pub id: i64,
    pub car_id: Option<i64>,
    #[serde(skip)]
    pub cache: ProxyCache<Tire>,
}

impl Tire {
    pub fn new(id: i64, car_id: Option<i64>) -> Self {
        Self {
            id,
            car_id,
            cache: ProxyCache::default(),
        }
    }

    pub async fn car(&self, scotch: &Scotch) -> ScotchResult<Option<Arc<Car>>> {
        self.cache.one(self, "car", scotch).await
    }

    pub fn row(&self) -> Value {
        json!({"id": self.id, "car_id": self.car_id})
    }
}

impl LocalModel for Tire {
    fn table_name() -> &'static str {
        "tire"
    }
}

impl RelationshipOwner for Tire {
    scotch::relationships! {
        car => RelationshipDescriptor::remote(EntityType::remote::<Car>()),
    }
}

/// In-memory stand-in for the remote car service.
///
/// GET and PUT on `/cars/{id}` read and write a shared map, so a fresh
/// accessor sees what an earlier one wrote.
pub struct CarService {
    pub transport: Arc<MemoryTransport>,
    pub cars: Arc<Mutex<BTreeMap<i64, Value>>>,
}

impl CarService {
    pub fn new() -> Self {
        Self {
            transport: Arc::new(MemoryTransport::new()),
            cars: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    pub fn with_car(self, id: i64, name: &str) -> Self {
        self.cars
            .lock()
            .unwrap()
            .insert(id, json!({"id": id, "name": name}));

        let cars = self.cars.clone();
        self.transport.route(Method::Get, format!("/cars/{}", id), move |_| {
            match cars.lock().unwrap().get(&id) {
                Some(car) => ApiResponse::new(200, car.to_string()),
                None => ApiResponse::new(404, json!({"msg": "Not found"}).to_string()),
            }
        });

        let cars = self.cars.clone();
        self.transport.route(Method::Put, format!("/cars/{}", id), move |request| {
            let body: Value = serde_json::from_str(request.body.as_deref().unwrap_or("null"))
                .unwrap_or(Value::Null);
            cars.lock().unwrap().insert(id, body);
            ApiResponse::new(200, json!({"msg": "Success"}).to_string())
        });

        let listing = self.cars.clone();
        self.transport.route(Method::Get, "/cars/", move |_| {
            let cars: Vec<Value> = listing.lock().unwrap().values().cloned().collect();
            ApiResponse::new(200, Value::Array(cars).to_string())
        });

        self
    }

    pub fn gets(&self, id: i64) -> usize {
        self.transport.request_count(Method::Get, &format!("/cars/{}", id))
    }

    pub fn scotch(&self, repository: Arc<MemoryRepository>) -> Scotch {
        Scotch::builder()
            .api_url("http://cars.local/")
            .transport(self.transport.clone())
            .repository(repository)
            .remote::<Car>()
            .local::<Tire>()
            .build()
            .unwrap()
    }
}
