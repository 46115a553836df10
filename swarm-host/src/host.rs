//! Host wiring: contract registry, tool bindings, dispatcher, and protocol
//! server assembled from one [`HostConfig`].
//!
//! [`SwarmHost::refresh`] is the only path that changes the bound tools.

use std::num::NonZeroUsize;
use std::sync::Arc;

use agent_adapters::AdapterError;
use agent_config::HostConfig;
use agent_kernel::{
    ContractRegistry, ContractSource, Dispatcher, DispatcherConfig, GeminiClientFactory, InvocationScheduler,
    JsonFileSource, McpServer, ModelClientCache, ModelClientFactory, RegistryError, SchedulerConfig, ServerError,
    ServerInfo,
};
use agent_tools::{ContractExecutor, RegistrationError, RegistrationSummary, ToolHost};
use agent_validator::ContractValidator;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{info, warn};

/// Errors surfaced by the host.
#[derive(Debug, Error)]
pub enum HostError {
    /// A configuration value cannot be used.
    #[error("invalid host configuration: {0}")]
    InvalidConfig(String),
    /// The backend could not be configured.
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    /// The registry fetch failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// The registration pass was rejected.
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    /// The protocol channel failed.
    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Result alias for host operations.
pub type HostResult<T> = Result<T, HostError>;

/// A running host: registry, bound tools, dispatcher, and protocol server.
#[derive(Debug, Clone)]
pub struct SwarmHost {
    registry: Arc<ContractRegistry>,
    tools: Arc<ToolHost>,
    dispatcher: Arc<Dispatcher>,
    server: McpServer,
}

impl SwarmHost {
    /// Builds a host reading contracts from the configured JSON file and
    /// invoking Gemini models.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] when the configuration cannot be applied.
    pub fn new(config: &HostConfig) -> HostResult<Self> {
        let source = Arc::new(JsonFileSource::new(&config.source.contracts_path));
        let gemini = config.generation.gemini_config()?;
        if !gemini.has_api_key() {
            warn!("no Gemini API key configured; invocations will fail");
        }
        Self::with_parts(config, source, Arc::new(GeminiClientFactory::new(gemini)))
    }

    /// Builds a host over an arbitrary source and client factory.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::InvalidConfig`] for zero page sizes or limits.
    pub fn with_parts(
        config: &HostConfig,
        source: Arc<dyn ContractSource>,
        factory: Arc<dyn ModelClientFactory>,
    ) -> HostResult<Self> {
        let page_size = non_zero("source.page_size", config.source.page_size)?;
        let concurrency = non_zero("execution.max_concurrency", config.execution.max_concurrency)?;

        let registry = Arc::new(ContractRegistry::new(
            source,
            ContractValidator::new(&config.validation),
            page_size,
        ));

        let clients = Arc::new(ModelClientCache::new(factory, config.generation.default_model.clone()));
        let dispatcher = Arc::new(Dispatcher::new(
            clients,
            DispatcherConfig {
                invocation_timeout: config.generation.invocation_timeout(),
                generation: config.generation.generation_config(),
            },
        ));
        let tools = Arc::new(ToolHost::new(Arc::clone(&dispatcher) as Arc<dyn ContractExecutor>));

        let server = McpServer::new(
            Arc::clone(&tools),
            ServerInfo::new(config.server.name.clone(), config.server.version.clone()),
            InvocationScheduler::new(
                SchedulerConfig::new(concurrency).with_max_queued(config.execution.max_queued),
            ),
        );

        Ok(Self {
            registry,
            tools,
            dispatcher,
            server,
        })
    }

    /// Loads the first snapshot and binds its tools.
    ///
    /// # Errors
    ///
    /// See [`refresh`](Self::refresh).
    pub async fn initialize(&self) -> HostResult<RegistrationSummary> {
        let summary = self.refresh().await?;
        info!(tools = ?summary.registered, "swarm host initialised");
        Ok(summary)
    }

    /// Fetches a new snapshot and re-registers tools from it.
    ///
    /// A failed fetch changes nothing. A rejected registration pass keeps the
    /// previous bindings.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Registry`] or [`HostError::Registration`].
    pub async fn refresh(&self) -> HostResult<RegistrationSummary> {
        let contracts = self.registry.fetch_eligible_contracts().await?;
        let summary = self.tools.register(&contracts).inspect_err(|err| {
            warn!(error = %err, "registration pass rejected; keeping previous bindings");
        })?;
        info!(
            registered = summary.registered.len(),
            removed = summary.removed.len(),
            generation = summary.generation,
            "tool bindings refreshed"
        );
        Ok(summary)
    }

    /// Serves the protocol over `reader`/`writer` until EOF.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Server`] when the channel fails.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> HostResult<()>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        self.server.serve(reader, writer).await?;
        Ok(())
    }

    /// Serves the protocol over standard input and output.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Server`] when stdio fails.
    pub async fn serve_stdio(&self) -> HostResult<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Returns the contract registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ContractRegistry> {
        &self.registry
    }

    /// Returns the tool host.
    #[must_use]
    pub fn tools(&self) -> &Arc<ToolHost> {
        &self.tools
    }

    /// Returns the dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}

fn non_zero(key: &str, value: usize) -> HostResult<NonZeroUsize> {
    NonZeroUsize::new(value).ok_or_else(|| HostError::InvalidConfig(format!("{key} must be at least 1")))
}
