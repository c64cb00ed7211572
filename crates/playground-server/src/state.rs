//! Shared application state.

use std::sync::Arc;

use playground_client::{ChatClient, ClientConfig, CompletionBackend};
use tracing::debug;

use crate::config::ServerConfig;

/// Builds a backend for one request's credential and endpoint.
pub type Connector = dyn Fn(ClientConfig) -> Arc<dyn CompletionBackend> + Send + Sync;

/// Shared application state.
pub struct AppState {
    /// Server configuration.
    pub config: ServerConfig,

    connector: Box<Connector>,
}

impl AppState {
    /// State that talks to the real endpoint over HTTP.
    pub fn new(config: ServerConfig) -> Arc<Self> {
        Self::with_connector(config, |client_config| {
            Arc::new(ChatClient::new(client_config)) as Arc<dyn CompletionBackend>
        })
    }

    /// State with a custom backend factory.
    pub fn with_connector<F>(config: ServerConfig, connector: F) -> Arc<Self>
    where
        F: Fn(ClientConfig) -> Arc<dyn CompletionBackend> + Send + Sync + 'static,
    {
        Arc::new(Self {
            config,
            connector: Box::new(connector),
        })
    }

    /// Backend for a request. The request's endpoint wins over the
    /// configured default.
    pub fn connect(&self, api_key: &str, endpoint: Option<&str>) -> Arc<dyn CompletionBackend> {
        let endpoint = endpoint
            .filter(|e| !e.trim().is_empty())
            .or(self.config.default_endpoint.as_deref());
        let client_config = ClientConfig::new(api_key).with_endpoint(endpoint);
        debug!(endpoint = %client_config.endpoint, "Connecting backend");
        (self.connector)(client_config)
    }
}
