//! Configuration management.
//!
//! Two layers:
//! - [`MycelialConfig`]: process configuration from a TOML file plus
//!   `MYCELIAL_*` environment overrides (data dir, endpoints, timeouts, logging).
//! - [`SettingsService`]: the user-editable global settings blob kept in the
//!   key-value store (API keys, default model, theme).

mod settings;

pub use settings::{GLOBAL_SETTINGS_KEY, GlobalSettings, SettingsService};

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration for mycelial.
#[derive(Debug, Clone)]
pub struct MycelialConfig {
    /// Directory holding the filesystem key-value store.
    pub data_dir: PathBuf,
    /// Storage backend.
    pub storage: StorageBackend,
    /// HTTP client settings shared by all service clients.
    pub http: HttpSettings,
    /// External service endpoints.
    pub endpoints: EndpointSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Available storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    /// JSON files in the data directory.
    #[default]
    Filesystem,
    /// Process-local map, lost on exit.
    Memory,
}

impl StorageBackend {
    /// Parses a backend string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "memory" | "in-memory" | "in_memory" => Self::Memory,
            _ => Self::Filesystem,
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpSettings {
    /// Request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
}

/// Endpoint overrides for external services.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndpointSettings {
    /// `OpenRouter` API base URL.
    pub openrouter: Option<String>,
    /// Gemini API base URL.
    pub gemini: Option<String>,
    /// Gemini embedding model name.
    pub gemini_embedding_model: Option<String>,
    /// Google Custom Search base URL.
    pub google_search: Option<String>,
}

/// Logging settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSettings {
    /// Output format: "pretty" or "json".
    pub format: Option<String>,
    /// `EnvFilter` directive.
    pub filter: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Storage backend name.
    pub storage: Option<String>,
    /// HTTP section.
    pub http: Option<HttpSettings>,
    /// Endpoints section.
    pub endpoints: Option<EndpointSettings>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
}

impl Default for MycelialConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            storage: StorageBackend::default(),
            http: HttpSettings::default(),
            endpoints: EndpointSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl MycelialConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::operation("read_config_file", e))?;
        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration TOML.
    pub fn from_toml(contents: &str) -> crate::Result<Self> {
        let file: ConfigFile = toml::from_str(contents)
            .map_err(|e| crate::Error::operation("parse_config_file", e))?;
        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks `<platform config dir>/mycelial/config.toml`, then
    /// `~/.config/mycelial/config.toml`. Returns defaults if neither exists
    /// or parses.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join("mycelial").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("mycelial")
                .join("config.toml"),
        ];
        for path in candidates {
            if !path.exists() {
                continue;
            }
            match Self::load_from_file(&path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(path = %path.display(), "Ignoring config file: {e}"),
            }
        }

        Self::default()
    }

    /// Applies `MYCELIAL_*` environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var("MYCELIAL_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(backend) = std::env::var("MYCELIAL_STORAGE") {
            self.storage = StorageBackend::parse(&backend);
        }
        if let Some(timeout_ms) = env_u64("MYCELIAL_HTTP_TIMEOUT_MS") {
            self.http.timeout_ms = Some(timeout_ms);
        }
        if let Some(connect_timeout_ms) = env_u64("MYCELIAL_HTTP_CONNECT_TIMEOUT_MS") {
            self.http.connect_timeout_ms = Some(connect_timeout_ms);
        }
        if let Ok(url) = std::env::var("MYCELIAL_OPENROUTER_URL") {
            self.endpoints.openrouter = Some(url);
        }
        if let Ok(url) = std::env::var("MYCELIAL_GEMINI_URL") {
            self.endpoints.gemini = Some(url);
        }
        if let Ok(url) = std::env::var("MYCELIAL_GOOGLE_SEARCH_URL") {
            self.endpoints.google_search = Some(url);
        }
        self
    }

    /// Converts a `ConfigFile` to `MycelialConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Some(storage) = file.storage {
            config.storage = StorageBackend::parse(&storage);
        }
        if let Some(http) = file.http {
            config.http = http;
        }
        if let Some(endpoints) = file.endpoints {
            config.endpoints = endpoints;
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }

        config
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }
}

fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "mycelial")
        .map_or_else(|| PathBuf::from(".mycelial"), |dirs| dirs.data_dir().to_path_buf())
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
