//! In-memory transport that answers from registered routes and records
//! every request it sees

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use super::transport::{ApiRequest, ApiResponse, HttpTransport, Method};
use crate::error::{ScotchError, ScotchResult};

type Handler = Arc<dyn Fn(&ApiRequest) -> ApiResponse + Send + Sync>;

/// Route table keyed by verb and URL path (query string ignored).
///
/// Requests to a path with no route fail with a transport error, the same
/// way a refused connection would.
#[derive(Default)]
pub struct MemoryTransport {
    routes: DashMap<(Method, String), Handler>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method path` with a handler computed per request
    pub fn route<F>(&self, method: Method, path: impl Into<String>, handler: F) -> &Self
    where
        F: Fn(&ApiRequest) -> ApiResponse + Send + Sync + 'static,
    {
        self.routes.insert((method, path.into()), Arc::new(handler));
        self
    }

    /// Answer `method path` with a fixed JSON body
    pub fn respond_json<T: Serialize>(
        &self,
        method: Method,
        path: impl Into<String>,
        status: u16,
        body: &T,
    ) -> &Self {
        let body = serde_json::to_string(body).unwrap_or_else(|_| "null".to_string());
        self.route(method, path, move |_| ApiResponse::new(status, body.clone()))
    }

    /// Every request executed so far, oldest first
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.log().clone()
    }

    /// Number of requests executed against `method path`
    pub fn request_count(&self, method: Method, path: &str) -> usize {
        self.log()
            .iter()
            .filter(|request| request.method == method && request.url.path() == path)
            .count()
    }

    pub fn clear_requests(&self) {
        self.log().clear();
    }

    fn log(&self) -> std::sync::MutexGuard<'_, Vec<ApiRequest>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl HttpTransport for MemoryTransport {
    async fn execute(&self, request: ApiRequest) -> ScotchResult<ApiResponse> {
        debug!(method = %request.method, url = %request.url, "in-memory request");
        self.log().push(request.clone());

        let key = (request.method, request.url.path().to_string());
        let handler = self
            .routes
            .get(&key)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| {
                ScotchError::transport(format!(
                    "no route for {} {}",
                    request.method,
                    request.url.path()
                ))
            })?;

        Ok(handler(&request))
    }
}
