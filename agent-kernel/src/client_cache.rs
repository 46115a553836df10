//! Per-model cache of backend clients.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use agent_adapters::{AdapterResult, GeminiBackend, GeminiConfig, GenerationBackend};
use agent_primitives::normalize_model_identifier;
use tracing::debug;

/// Model used when a contract names none.
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro-preview-0409";

/// Creates backend clients for a model identifier.
pub trait ModelClientFactory: Send + Sync {
    /// Builds a client bound to `model`.
    ///
    /// # Errors
    ///
    /// Returns an adapter error when the client cannot be configured.
    fn create(&self, model: &str) -> AdapterResult<Arc<dyn GenerationBackend>>;
}

/// Factory producing Gemini clients that share one connection configuration.
#[derive(Debug, Clone)]
pub struct GeminiClientFactory {
    config: GeminiConfig,
}

impl GeminiClientFactory {
    /// Creates the factory.
    #[must_use]
    pub fn new(config: GeminiConfig) -> Self {
        Self { config }
    }
}

impl ModelClientFactory for GeminiClientFactory {
    fn create(&self, model: &str) -> AdapterResult<Arc<dyn GenerationBackend>> {
        Ok(Arc::new(GeminiBackend::new(&self.config, model)?))
    }
}

/// Holds at most one live client per resolved model identifier.
///
/// Creation happens under the cache lock, so concurrent first accesses for
/// the same model build a single client.
pub struct ModelClientCache {
    factory: Arc<dyn ModelClientFactory>,
    default_model: String,
    clients: Mutex<HashMap<String, Arc<dyn GenerationBackend>>>,
}

impl fmt::Debug for ModelClientCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClientCache")
            .field("default_model", &self.default_model)
            .field("cached", &self.len())
            .finish_non_exhaustive()
    }
}

impl ModelClientCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(factory: Arc<dyn ModelClientFactory>, default_model: impl Into<String>) -> Self {
        Self {
            factory,
            default_model: default_model.into(),
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Maps an optional contract model to the concrete identifier.
    #[must_use]
    pub fn resolve_model_id(&self, requested: Option<&str>) -> String {
        requested
            .and_then(normalize_model_identifier)
            .unwrap_or_else(|| self.default_model.clone())
    }

    /// Returns the cached client for the resolved model, creating it once.
    ///
    /// # Errors
    ///
    /// Propagates factory failures; nothing is cached in that case.
    pub fn resolve(&self, requested: Option<&str>) -> AdapterResult<Arc<dyn GenerationBackend>> {
        let model = self.resolve_model_id(requested);
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = clients.get(&model) {
            return Ok(Arc::clone(client));
        }

        let client = self.factory.create(&model)?;
        debug!(model = %model, "created backend client");
        clients.insert(model, Arc::clone(&client));
        Ok(client)
    }

    /// Returns the number of cached clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` when no client has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_adapters::{AdapterError, GenerationRequest};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Named(String);

    #[async_trait]
    impl GenerationBackend for Named {
        fn provider(&self) -> &'static str {
            "test"
        }

        fn model(&self) -> &str {
            &self.0
        }

        async fn generate(&self, _request: &GenerationRequest) -> AdapterResult<Option<String>> {
            Ok(None)
        }
    }

    #[derive(Default)]
    struct CountingFactory {
        created: AtomicUsize,
    }

    impl ModelClientFactory for CountingFactory {
        fn create(&self, model: &str) -> AdapterResult<Arc<dyn GenerationBackend>> {
            if model == "broken" {
                return Err(AdapterError::configuration("no such model"));
            }
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Named(model.to_owned())))
        }
    }

    #[test]
    fn same_model_shares_one_client() {
        let factory = Arc::new(CountingFactory::default());
        let cache = ModelClientCache::new(factory.clone(), DEFAULT_MODEL);

        let a = cache.resolve(Some("gemini-1.5-flash")).unwrap();
        let b = cache.resolve(Some("gemini-1.5-flash")).unwrap();
        let c = cache.resolve(Some("gemini-1.0-pro")).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(factory.created.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn sentinels_resolve_to_default() {
        let cache = ModelClientCache::new(Arc::new(CountingFactory::default()), DEFAULT_MODEL);
        let none = cache.resolve(None).unwrap();
        let blank = cache.resolve(Some("")).unwrap();
        let na = cache.resolve(Some("N/A")).unwrap();
        let lower_na = cache.resolve(Some(" n/a ")).unwrap();

        assert_eq!(none.model(), DEFAULT_MODEL);
        assert!(Arc::ptr_eq(&none, &blank));
        assert!(Arc::ptr_eq(&none, &na));
        assert!(Arc::ptr_eq(&none, &lower_na));
        assert_eq!(cache.resolve_model_id(Some(" gemini-1.5-flash ")), "gemini-1.5-flash");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn factory_failure_is_not_cached() {
        let cache = ModelClientCache::new(Arc::new(CountingFactory::default()), DEFAULT_MODEL);
        assert!(cache.resolve(Some("broken")).is_err());
        assert!(cache.is_empty());
    }
}
