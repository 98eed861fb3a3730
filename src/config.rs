//! Configuration parsing and validation for ai-adapter.
//!
//! Configuration is loaded once at process start (TOML file, then environment
//! overrides) and is read-only afterwards. Per-provider credential and endpoint
//! problems are deliberately *not* raised here: they are resolved when the
//! provider registry is built so one broken provider never blocks the others.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;
use std::time::Duration;

/// Placeholder value shipped in sample env files; treated as "no key".
pub const PLACEHOLDER_API_KEY: &str = "your-gemini-api-key-here";

/// Local transcription endpoint used when neither config nor env sets one.
pub const DEFAULT_WHISPER_URL: &str = "http://whisperlive:9090";

/// Env var consulted for the local transcription endpoint.
pub const WHISPER_URL_ENV: &str = "WHISPER_LIVE_URL";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:8000")
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String {
    "0.0.0.0:8000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

/// Routing policy configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RoutingConfig {
    /// Apply the daily cap and per-call cost threshold to the cloud provider
    #[serde(default = "default_true")]
    pub enable_cost_optimization: bool,
    /// Daily unit ceiling for the cloud provider
    #[serde(default = "default_max_units", alias = "max_gemini_tokens_per_day")]
    pub max_units_per_day: u64,
    /// Allow any capable non-primary provider as a last resort
    #[serde(default = "default_true")]
    pub fallback_to_local: bool,
    /// Maximum estimated cost of a single cloud call
    #[serde(default = "default_cost_threshold")]
    pub cost_threshold_usd: f64,
    /// Bounded wait for a single provider call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Reset the usage ledger in-process at every UTC midnight
    #[serde(default)]
    pub daily_reset: bool,
}

fn default_true() -> bool {
    true
}

fn default_max_units() -> u64 {
    10_000
}

fn default_cost_threshold() -> f64 {
    0.01
}

fn default_request_timeout() -> u64 {
    120
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            enable_cost_optimization: true,
            max_units_per_day: default_max_units(),
            fallback_to_local: true,
            cost_threshold_usd: default_cost_threshold(),
            request_timeout_secs: default_request_timeout(),
            daily_reset: false,
        }
    }
}

impl RoutingConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Provider slots. Each slot registers at most one provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub cloud: CloudProviderConfig,
    #[serde(default)]
    pub local: LocalProviderConfig,
}

/// Metered cloud text-generation provider (Gemini REST API).
#[derive(Debug, Clone, Deserialize)]
pub struct CloudProviderConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Ledger key and provider name reported in responses
    #[serde(default = "default_cloud_name")]
    pub name: String,
    #[serde(default = "default_cloud_model")]
    pub model: String,
    #[serde(default = "default_cloud_base_url")]
    pub base_url: String,
    /// API key; may contain `${VAR}` references expanded at registration
    pub api_key: Option<ApiKey>,
}

fn default_cloud_name() -> String {
    "gemini".to_string()
}

fn default_cloud_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_cloud_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

impl Default for CloudProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            name: default_cloud_name(),
            model: default_cloud_model(),
            base_url: default_cloud_base_url(),
            api_key: None,
        }
    }
}

/// Local speech-to-text provider (Whisper HTTP service).
#[derive(Debug, Clone, Deserialize)]
pub struct LocalProviderConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_local_name")]
    pub name: String,
    /// Base URL of the service; `/transcribe` is appended
    pub url: Option<String>,
}

fn default_local_name() -> String {
    "whisper".to_string()
}

impl Default for LocalProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            name: default_local_name(),
            url: None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// API key wrapper that redacts in Debug/Display/Serialize and zeroizes on drop.
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Access the raw key value. Every call site is auditable via `grep expose_secret`.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl std::fmt::Display for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Serialize for ApiKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> serde::Deserialize<'de> for ApiKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|s| ApiKey(SecretString::from(s)))
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        ApiKey(SecretString::from(s))
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        ApiKey(SecretString::from(s))
    }
}

/// How a provider's API key was resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum KeySource {
    /// Key was a literal string in config (no ${} references)
    Literal,
    /// Key contained ${VAR} references expanded from environment
    EnvExpanded,
    /// Key was auto-discovered from convention env var (holds var name)
    Convention(String),
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::Literal => write!(f, "config-literal"),
            KeySource::EnvExpanded => write!(f, "env-expanded"),
            KeySource::Convention(var) => write!(f, "convention ({})", var),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable '{var}' not set for provider '{provider}': {message}")]
    EnvVar {
        var: String,
        provider: String,
        message: String,
    },

    #[error("No credentials for provider '{provider}': {message}")]
    MissingCredential { provider: String, message: String },

    #[error("Invalid endpoint '{url}' for provider '{provider}': {message}")]
    InvalidEndpoint {
        provider: String,
        url: String,
        message: String,
    },
}

impl Config {
    /// Load configuration from a TOML file (no environment overrides).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = read_config_file(path.as_ref())?;
        Self::parse_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the process configuration.
    ///
    /// Reads the TOML file when a path is given (defaults otherwise), applies
    /// environment overrides, then validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => toml::from_str(&read_config_file(path)?)?,
            None => Config::default(),
        };
        config.apply_env_overrides_with(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using a custom lookup function.
    ///
    /// Recognized: `ENABLE_COST_OPTIMIZATION`, `MAX_GEMINI_TOKENS_PER_DAY`,
    /// `FALLBACK_TO_LOCAL`, `PORT`. Boolean toggles are true only for the
    /// (case-insensitive) value "true".
    pub fn apply_env_overrides_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("ENABLE_COST_OPTIMIZATION") {
            self.routing.enable_cost_optimization = value.trim().eq_ignore_ascii_case("true");
        }

        if let Some(value) = lookup("MAX_GEMINI_TOKENS_PER_DAY") {
            self.routing.max_units_per_day = value.trim().parse().map_err(|e| {
                ConfigError::Validation(format!(
                    "MAX_GEMINI_TOKENS_PER_DAY must be a positive integer, got '{}': {}",
                    value, e
                ))
            })?;
        }

        if let Some(value) = lookup("FALLBACK_TO_LOCAL") {
            self.routing.fallback_to_local = value.trim().eq_ignore_ascii_case("true");
        }

        if let Some(value) = lookup("PORT") {
            let port: u16 = value.trim().parse().map_err(|e| {
                ConfigError::Validation(format!("PORT must be a port number, got '{}': {}", value, e))
            })?;
            self.server.listen = format!("0.0.0.0:{}", port);
        }

        Ok(())
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.routing.max_units_per_day == 0 {
            return Err(ConfigError::Validation(
                "routing.max_units_per_day must be greater than zero".to_string(),
            ));
        }

        let threshold = self.routing.cost_threshold_usd;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::Validation(format!(
                "routing.cost_threshold_usd must be a non-negative number, got {}",
                threshold
            )));
        }

        if self.routing.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "routing.request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        let cloud = &self.providers.cloud;
        let local = &self.providers.local;
        if cloud.name.trim().is_empty() || local.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Provider names must not be empty".to_string(),
            ));
        }
        if cloud.enabled && local.enabled && cloud.name == local.name {
            return Err(ConfigError::Validation(format!(
                "Provider name '{}' is used by both provider slots",
                cloud.name
            )));
        }

        if !cloud.enabled && !local.enabled {
            tracing::warn!("All providers disabled - every request will be rejected");
        }

        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

/// Expand all `${VAR}` references in a string using a custom lookup function.
///
/// Supports multiple `${VAR}` in one string (e.g., `${SCHEME}://${HOST}/v1`).
/// Fails on first missing variable, unclosed `${`, or empty variable name.
pub fn expand_env_vars_with<F>(
    input: &str,
    provider_name: &str,
    lookup: F,
) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if !input.contains("${") {
        return Ok(input.to_string());
    }

    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let end = after.find('}').ok_or_else(|| ConfigError::EnvVar {
            var: "<unclosed>".to_string(),
            provider: provider_name.to_string(),
            message: "Unclosed '${' in config value".to_string(),
        })?;

        let var_name = &after[..end];
        if var_name.is_empty() {
            return Err(ConfigError::EnvVar {
                var: "".to_string(),
                provider: provider_name.to_string(),
                message: "Empty variable name in '${}' reference".to_string(),
            });
        }

        let value = lookup(var_name).ok_or_else(|| ConfigError::EnvVar {
            var: var_name.to_string(),
            provider: provider_name.to_string(),
            message: format!(
                "Environment variable '{}' is not set (referenced in provider '{}')",
                var_name, provider_name
            ),
        })?;

        result.push_str(&value);
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    Ok(result)
}

/// Derive the convention-based env var name for a provider's key.
///
/// - "gemini" -> "GEMINI_API_KEY"
/// - "gemini-pro" -> "GEMINI_PRO_API_KEY"
pub fn convention_env_var_name(provider_name: &str) -> String {
    let upper_snake = provider_name.to_uppercase().replace(['-', ' '], "_");
    format!("{}_API_KEY", upper_snake)
}

/// Resolve a provider's API key.
///
/// - `${VAR}` references are expanded (`EnvExpanded`)
/// - any other configured value is used as-is (`Literal`)
/// - an absent key falls back to `<NAME>_API_KEY` (`Convention`)
///
/// Empty keys and the sample-file placeholder count as missing.
pub fn resolve_api_key_with<F>(
    provider_name: &str,
    configured: Option<&ApiKey>,
    lookup: F,
) -> Result<(ApiKey, KeySource), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let (value, source) = match configured {
        Some(raw) if raw.expose_secret().contains("${") => (
            expand_env_vars_with(raw.expose_secret(), provider_name, &lookup)?,
            KeySource::EnvExpanded,
        ),
        Some(raw) => (raw.expose_secret().to_string(), KeySource::Literal),
        None => {
            let var_name = convention_env_var_name(provider_name);
            let value = lookup(&var_name).ok_or_else(|| ConfigError::MissingCredential {
                provider: provider_name.to_string(),
                message: format!("no api_key configured and {} is not set", var_name),
            })?;
            (value, KeySource::Convention(var_name))
        }
    };

    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == PLACEHOLDER_API_KEY {
        return Err(ConfigError::MissingCredential {
            provider: provider_name.to_string(),
            message: format!("api key from {} is empty or a placeholder", source),
        });
    }

    Ok((ApiKey::from(trimmed), source))
}

/// Resolve the local transcription endpoint: config, then `WHISPER_LIVE_URL`,
/// then [`DEFAULT_WHISPER_URL`].
pub fn resolve_local_url_with<F>(configured: Option<&str>, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    configured
        .map(str::to_string)
        .or_else(|| lookup(WHISPER_URL_ENV))
        .unwrap_or_else(|| DEFAULT_WHISPER_URL.to_string())
}
