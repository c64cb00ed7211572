//! Data directory layout and persisted settings.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use playground_client::ClientConfig;
use playground_core::Settings;
use tracing::warn;

use crate::error::CliError;

const SETTINGS_FILE: &str = "settings.json";
const CHATS_DIR: &str = "chats";

/// Resolved CLI configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of everything the CLI persists.
    pub data_dir: PathBuf,

    /// API key from `--api-key` or `MISTRAL_API_KEY`.
    pub api_key: Option<String>,

    /// Endpoint from `--endpoint` or `PLAYGROUND_ENDPOINT`.
    pub endpoint: Option<String>,
}

impl Config {
    /// Build from command line values, falling back to the platform data dir.
    pub fn new(
        data_dir: Option<PathBuf>,
        api_key: Option<String>,
        endpoint: Option<String>,
    ) -> Result<Self, CliError> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => dirs::data_dir()
                .map(|dir| dir.join("playground"))
                .ok_or(CliError::NoDataDir)?,
        };
        Ok(Self {
            data_dir,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            endpoint: endpoint.filter(|e| !e.trim().is_empty()),
        })
    }

    pub fn chats_dir(&self) -> PathBuf {
        self.data_dir.join(CHATS_DIR)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILE)
    }

    /// Client configuration. An explicit endpoint wins over the one in
    /// settings.
    pub fn client_config(&self, settings: &Settings) -> Result<ClientConfig, CliError> {
        let api_key = self
            .api_key
            .clone()
            .ok_or(playground_client::ClientError::MissingApiKey)?;
        let endpoint = self.endpoint.as_deref().or(settings.endpoint.as_deref());
        Ok(ClientConfig::new(api_key).with_endpoint(endpoint))
    }
}

/// Load settings, treating a missing or unreadable file as defaults.
pub fn load_settings(path: &Path) -> Result<Settings, CliError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Settings::default()),
        Err(e) => return Err(e.into()),
    };
    let settings = match serde_json::from_slice::<Settings>(&bytes) {
        Ok(settings) => settings,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Invalid settings file, using defaults");
            Settings::default()
        }
    };
    Ok(settings.sanitize())
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_vec_pretty(settings)?)?;
    Ok(())
}
