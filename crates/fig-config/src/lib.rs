//! Configuration management for fig.
//!
//! Parses `fig.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.url`
//! - `server.headers` entries

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use fig_registry::{DiagramType, default_types};

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "fig.toml";

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the rendering service URL.
    pub server_url: Option<String>,
    /// Override the per-attempt request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Override the retry attempt count.
    pub retry_count: Option<u32>,
    /// Override the cache enabled flag.
    pub cache_enabled: Option<bool>,
}

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rendering service configuration.
    pub server: ServerConfig,
    /// Render cache bounds.
    pub cache: CacheConfig,
    /// Request pipeline tuning.
    pub request: RequestConfig,
    /// Per-type overrides of the built-in registry table.
    #[serde(rename = "types")]
    pub type_overrides: Vec<TypeOverride>,
    /// Export tool configuration.
    pub export: ExportConfig,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Rendering service configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the rendering service.
    pub url: String,
    /// Custom headers sent with every service request, as `"Name: value"`
    /// lines.
    pub headers: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "https://kroki.io".to_owned(),
            headers: Vec::new(),
        }
    }
}

/// Render cache bounds.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether the render cache is consulted at all.
    pub enabled: bool,
    /// Maximum number of cached renders.
    pub max_entries: usize,
    /// Maximum entry age in seconds.
    pub max_age_secs: u64,
}

impl CacheConfig {
    /// Maximum entry age as a [`Duration`].
    #[must_use]
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 100,
            max_age_secs: 3600,
        }
    }
}

/// Request pipeline tuning.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Per-attempt HTTP timeout in seconds.
    pub timeout_secs: u64,
    /// Attempts per transport strategy.
    pub retry_count: u32,
    /// Base backoff delay between retries, in milliseconds.
    pub retry_delay_ms: u64,
}

impl RequestConfig {
    /// Per-attempt timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base backoff delay as a [`Duration`].
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            retry_count: 3,
            retry_delay_ms: 500,
        }
    }
}

/// One `[[types]]` entry: overrides the built-in registration with the
/// same id, or registers a new type.
#[derive(Debug, Deserialize)]
pub struct TypeOverride {
    /// Canonical type id to override or register.
    pub id: String,
    /// Enable or disable the type.
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Replace the service-side endpoint name.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Additional language-tag aliases.
    #[serde(default)]
    pub aliases: Option<Vec<String>>,
}

/// Export tool configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Converter executable name or path.
    pub program: String,
    /// Extra arguments appended to every conversion.
    pub args: Vec<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            program: "pandoc".to_owned(),
            args: Vec::new(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`server.url`").
        field: String,
        /// Error message (e.g., "${`FIG_TOKEN`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

/// Parse one `"Name: value"` header line.
fn parse_header(line: &str) -> Result<(String, String), ConfigError> {
    let (name, value) = line.split_once(':').ok_or_else(|| {
        ConfigError::Validation(format!(
            "server.headers entry '{line}' must have the form 'Name: value'"
        ))
    })?;
    let name = name.trim();
    if name.is_empty() {
        return Err(ConfigError::Validation(format!(
            "server.headers entry '{line}' has an empty header name"
        )));
    }
    Ok((name.to_owned(), value.trim().to_owned()))
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `fig.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading, allowing CLI arguments to
    /// take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(url) = &settings.server_url {
            self.server.url.clone_from(url);
        }
        if let Some(timeout_secs) = settings.timeout_secs {
            self.request.timeout_secs = timeout_secs;
        }
        if let Some(retry_count) = settings.retry_count {
            self.request.retry_count = retry_count;
        }
        if let Some(cache_enabled) = settings.cache_enabled {
            self.cache.enabled = cache_enabled;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;
        config.config_path = Some(path.to_path_buf());
        config.validate()?;

        Ok(config)
    }

    /// Custom headers parsed into name/value pairs.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` for entries without a
    /// `Name: value` shape.
    pub fn custom_headers(&self) -> Result<Vec<(String, String)>, ConfigError> {
        self.server.headers.iter().map(|l| parse_header(l)).collect()
    }

    /// The built-in registry table with `[[types]]` overrides applied.
    ///
    /// Overrides match built-in entries by canonical id; unmatched ids
    /// register new types whose endpoint and tag default to the id.
    #[must_use]
    pub fn diagram_types(&self) -> Vec<DiagramType> {
        fn apply(entry: &mut DiagramType, over: &TypeOverride) {
            if let Some(enabled) = over.enabled {
                entry.enabled = enabled;
            }
            if let Some(endpoint) = &over.endpoint {
                entry.endpoint.clone_from(endpoint);
            }
            if let Some(aliases) = &over.aliases {
                entry.aliases.extend(aliases.iter().cloned());
            }
        }

        let mut table = default_types();
        for over in &self.type_overrides {
            if let Some(existing) = table.iter_mut().find(|t| t.id == over.id) {
                apply(existing, over);
            } else {
                let mut entry = DiagramType::new(&over.id, &over.id);
                apply(&mut entry, over);
                table.push(entry);
            }
        }
        table
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.url, "server.url")?;
        require_http_url(&self.server.url, "server.url")?;
        self.custom_headers()?;

        if self.cache.max_entries == 0 {
            return Err(ConfigError::Validation(
                "cache.max_entries must be greater than 0".to_owned(),
            ));
        }
        if self.request.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "request.timeout_secs must be greater than 0".to_owned(),
            ));
        }
        for over in &self.type_overrides {
            require_non_empty(&over.id, "types.id")?;
        }
        require_non_empty(&self.export.program, "export.program")?;

        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.url = expand::expand_env(&self.server.url, "server.url")?;
        for header in &mut self.server.headers {
            *header = expand::expand_env(header, "server.headers")?;
        }
        Ok(())
    }
}
