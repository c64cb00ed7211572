//! User-level defaults applied to new chat sessions.

use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::options::{ChatOptions, DEFAULT_MODEL, DEFAULT_TEMPERATURE};

/// Persisted user settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,

    /// Custom API endpoint; must be an http(s) URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: DEFAULT_TEMPERATURE,
            seed: None,
            endpoint: None,
        }
    }
}

impl Settings {
    /// Replace invalid values with defaults instead of rejecting the file.
    pub fn sanitize(mut self) -> Self {
        if self.model.trim().is_empty() {
            self.model = default_model();
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            warn!(temperature = self.temperature, "Temperature out of range, using default");
            self.temperature = DEFAULT_TEMPERATURE;
        }
        if self.seed.is_some_and(|s| s < 0) {
            self.seed = None;
        }
        if let Some(endpoint) = &self.endpoint {
            if !is_http_url(endpoint) {
                warn!(endpoint = %endpoint, "Ignoring invalid endpoint");
                self.endpoint = None;
            }
        }
        self
    }

    /// Options for a new chat session.
    pub fn chat_options(&self) -> ChatOptions {
        ChatOptions {
            model: self.model.clone(),
            temperature: self.temperature,
            seed: self.seed.and_then(|s| u64::try_from(s).ok()),
            ..ChatOptions::default()
        }
    }
}

/// An absolute `http`/`https` URL with a host.
fn is_http_url(endpoint: &str) -> bool {
    match Url::parse(endpoint) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host().is_some(),
        Err(_) => false,
    }
}
