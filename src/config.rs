use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::feed::firestore::{API_ROOT, FirestoreSettings};

pub const DEFAULT_CONFIG_PATH: &str = "config/chat.json";

pub const ENV_BACKEND: &str = "CHAT_BACKEND";
pub const ENV_PROJECT_ID: &str = "FIRESTORE_PROJECT_ID";
pub const ENV_API_KEY: &str = "FIRESTORE_API_KEY";

static PROJECT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9-]{4,28}[a-z0-9]$").expect("valid project id regex"));
static COLLECTION_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,100}$").expect("valid collection regex"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown backend `{0}` (expected `local` or `firestore`)")]
    UnknownBackend(String),
    #[error("firestore backend needs a project id")]
    MissingProjectId,
    #[error("invalid firestore project id `{0}`")]
    InvalidProjectId(String),
    #[error("invalid collection id `{0}`")]
    InvalidCollection(String),
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// In-process feed, nothing leaves the machine
    Local,
    /// Cloud Firestore REST API
    Firestore,
}

impl std::str::FromStr for Backend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Backend::Local),
            "firestore" => Ok(Backend::Firestore),
            _ => Err(ConfigError::UnknownBackend(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirestoreConfig {
    pub project_id: Option<String>,
    pub api_key: Option<String>,
    pub database: String,
    pub api_root: String,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            api_key: None,
            database: "(default)".to_string(),
            api_root: API_ROOT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: Backend,
    pub collection: String,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub online_count_interval_secs: u64,
    pub latency_compensation: bool,
    pub firestore: FirestoreConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Local,
            collection: "messages".to_string(),
            poll_interval_ms: 2_000,
            request_timeout_ms: 10_000,
            online_count_interval_secs: 30,
            latency_compensation: true,
            firestore: FirestoreConfig::default(),
        }
    }
}

impl AppConfig {
    /// Applies environment overrides. `lookup` is `std::env::var` in the binary.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup(ENV_BACKEND) {
            self.backend = backend.parse()?;
        }
        if let Some(project_id) = lookup(ENV_PROJECT_ID) {
            self.firestore.project_id = Some(project_id);
        }
        if let Some(api_key) = lookup(ENV_API_KEY) {
            self.firestore.api_key = Some(api_key);
        }
        Ok(())
    }

    pub fn online_count_interval(&self) -> Duration {
        Duration::from_secs(self.online_count_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !COLLECTION_ID.is_match(&self.collection) {
            return Err(ConfigError::InvalidCollection(self.collection.clone()));
        }
        if self.online_count_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval("online_count_interval_secs"));
        }
        if self.backend == Backend::Firestore {
            self.firestore_settings()?;
        }
        Ok(())
    }

    pub fn firestore_settings(&self) -> Result<FirestoreSettings, ConfigError> {
        let project_id = self
            .firestore
            .project_id
            .clone()
            .ok_or(ConfigError::MissingProjectId)?;
        if !PROJECT_ID.is_match(&project_id) {
            return Err(ConfigError::InvalidProjectId(project_id));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval("poll_interval_ms"));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::ZeroInterval("request_timeout_ms"));
        }

        Ok(FirestoreSettings {
            api_root: self.firestore.api_root.trim_end_matches('/').to_string(),
            project_id,
            database: self.firestore.database.clone(),
            collection: self.collection.clone(),
            api_key: self.firestore.api_key.clone(),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        })
    }
}

pub fn load_config(path: &str) -> AppConfig {
    let path = Path::new(path);
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Failed to parse config file {}: {err}", path.display());
                AppConfig::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            log::info!(
                "Config file {} not found; writing defaults",
                path.display()
            );
            let config = AppConfig::default();
            if let Err(err) = save_config(path, &config) {
                log::warn!("Unable to create {}: {err}", path.display());
            }
            config
        }
        Err(err) => {
            log::warn!("Failed to read config file {}: {err}", path.display());
            AppConfig::default()
        }
    }
}

pub fn save_config(path: &Path, config: &AppConfig) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json)
}
