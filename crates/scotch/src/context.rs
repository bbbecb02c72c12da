//! Scotch context - the explicit handle relationship reads go through
//!
//! A context owns the configuration (remote base URL), the HTTP transport,
//! the local repository, the target registry and one cached accessor per
//! remote entity type. It is cheap to clone; clones share all of it.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use tracing::{debug, info};

use crate::api::{ApiAccessor, HttpTransport, ReqwestTransport};
use crate::config::ScotchConfig;
use crate::error::{ScotchError, ScotchResult};
use crate::model::{LocalModel, RemoteEntity};
use crate::relationships::TargetRegistry;
use crate::repository::LocalRepository;

#[derive(Clone)]
pub struct Scotch {
    inner: Arc<Inner>,
}

struct Inner {
    config: RwLock<ScotchConfig>,
    transport: Arc<dyn HttpTransport>,
    repository: Option<Arc<dyn LocalRepository>>,
    registry: TargetRegistry,
    /// `TypeId` of the entity -> `Arc<ApiAccessor<E>>`
    accessors: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Scotch {
    pub fn builder() -> ScotchBuilder {
        ScotchBuilder::default()
    }

    /// Context talking to `api_url` over HTTP, without a local repository
    pub fn new(api_url: impl AsRef<str>) -> ScotchResult<Self> {
        Self::builder().api_url(api_url).build()
    }

    /// Context configured from `SCOTCH_API_URL`
    pub fn from_env() -> ScotchResult<Self> {
        Self::builder().config(ScotchConfig::from_env()?).build()
    }

    /// Replace the configuration. Accessors built against the previous base
    /// URL are dropped and rebuilt on next use.
    pub fn init(&self, config: ScotchConfig) -> ScotchResult<()> {
        config.validate()?;
        info!(api_url = ?config.api_url, "scotch context initialized");

        let mut current = self
            .inner
            .config
            .write()
            .map_err(|_| ScotchError::configuration("scotch configuration lock poisoned"))?;
        *current = config;
        self.inner.accessors.clear();
        Ok(())
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> ScotchResult<ScotchConfig> {
        self.inner
            .config
            .read()
            .map(|config| config.clone())
            .map_err(|_| ScotchError::configuration("scotch configuration lock poisoned"))
    }

    /// Whether a base URL has been configured
    pub fn is_initialized(&self) -> bool {
        self.config()
            .map(|config| config.api_url.is_some())
            .unwrap_or(false)
    }

    /// Accessor for the collection of `E`, built on first use and shared afterwards
    pub fn api<E: RemoteEntity>(&self) -> ScotchResult<Arc<ApiAccessor<E>>> {
        let key = TypeId::of::<E>();
        if let Some(cached) = self.inner.accessors.get(&key) {
            if let Ok(accessor) = cached.value().clone().downcast::<ApiAccessor<E>>() {
                return Ok(accessor);
            }
        }

        let base_url = self.config()?.base_url()?;
        let accessor = Arc::new(ApiAccessor::<E>::new(base_url, self.inner.transport.clone())?);
        debug!(
            entity = E::entity_name(),
            directory = accessor.resource_directory(),
            "built remote accessor"
        );

        self.inner.accessors.insert(key, accessor.clone());
        Ok(accessor)
    }

    pub fn registry(&self) -> &TargetRegistry {
        &self.inner.registry
    }

    /// Make `E` reachable by name from relationship declarations
    pub fn register_remote<E: RemoteEntity>(&self) -> &Self {
        self.inner.registry.register_remote::<E>();
        self
    }

    /// Make `L` reachable by name from relationship declarations
    pub fn register_local<L: LocalModel>(&self) -> &Self {
        self.inner.registry.register_local::<L>();
        self
    }

    /// The local repository, required by relationships that read local rows
    pub fn repository(&self) -> ScotchResult<Arc<dyn LocalRepository>> {
        self.inner.repository.clone().ok_or_else(|| {
            ScotchError::configuration("scotch context has no local repository")
        })
    }

    pub fn transport(&self) -> Arc<dyn HttpTransport> {
        self.inner.transport.clone()
    }
}

impl fmt::Debug for Scotch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scotch")
            .field("config", &self.config().ok())
            .field("has_repository", &self.inner.repository.is_some())
            .field("accessors", &self.inner.accessors.len())
            .finish()
    }
}

/// Builder for [`Scotch`]
#[derive(Default)]
pub struct ScotchBuilder {
    config: ScotchConfig,
    transport: Option<Arc<dyn HttpTransport>>,
    repository: Option<Arc<dyn LocalRepository>>,
    registry: TargetRegistry,
}

impl ScotchBuilder {
    pub fn api_url(mut self, api_url: impl AsRef<str>) -> Self {
        self.config = self.config.with_api_url(api_url);
        self
    }

    pub fn config(mut self, config: ScotchConfig) -> Self {
        self.config = config;
        self
    }

    /// Transport used by every accessor; defaults to a `reqwest` client
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn repository(mut self, repository: Arc<dyn LocalRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn remote<E: RemoteEntity>(self) -> Self {
        self.registry.register_remote::<E>();
        self
    }

    pub fn local<L: LocalModel>(self) -> Self {
        self.registry.register_local::<L>();
        self
    }

    pub fn build(self) -> ScotchResult<Scotch> {
        self.config.validate()?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };

        Ok(Scotch {
            inner: Arc::new(Inner {
                config: RwLock::new(self.config),
                transport,
                repository: self.repository,
                registry: self.registry,
                accessors: DashMap::new(),
            }),
        })
    }
}
