//! Configuration for the offline components.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

/// Top-level configuration shared by the cache manager and the action queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineConfig {
    /// Origin of the storefront; anything else counts as cross-origin.
    #[serde(default = "default_origin")]
    pub origin: Url,

    /// Request cache settings.
    #[serde(default)]
    pub cache: CacheSettings,

    /// Network fetch settings.
    #[serde(default)]
    pub fetch: FetchSettings,

    /// Action queue settings.
    #[serde(default)]
    pub queue: QueueSettings,

    /// Durable storage settings.
    #[serde(default)]
    pub storage: StorageSettings,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            cache: CacheSettings::default(),
            fetch: FetchSettings::default(),
            queue: QueueSettings::default(),
            storage: StorageSettings::default(),
        }
    }
}

impl OfflineConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.origin.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                field: "origin",
                message: format!("unsupported scheme '{}'", self.origin.scheme()),
            });
        }
        if self.cache.version.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "cache.version",
                message: "must not be empty".to_string(),
            });
        }
        if !self.cache.api_prefix.starts_with('/') {
            return Err(ConfigError::Invalid {
                field: "cache.api_prefix",
                message: format!("'{}' must start with '/'", self.cache.api_prefix),
            });
        }
        if self.queue.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "queue.max_attempts",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Cache names for the configured version.
    pub fn cache_names(&self) -> CacheNames {
        CacheNames::from_settings(&self.cache)
    }
}

fn default_origin() -> Url {
    Url::parse("http://localhost:8080").expect("static origin URL is valid")
}

/// Request cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Version suffix embedded in every cache name.
    #[serde(default = "default_cache_version")]
    pub version: String,

    /// Application name, also the prefix of the legacy default cache.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Path prefix identifying API requests.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Shell assets stored in the static cache at install time.
    #[serde(default = "default_shell_assets")]
    pub shell_assets: Vec<String>,

    /// Document served when a navigation fails offline.
    #[serde(default = "default_fallback_document")]
    pub fallback_document: String,

    /// File extensions treated as images.
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
}

fn default_cache_version() -> String {
    "v3".to_string()
}

fn default_app_name() -> String {
    "netlistore".to_string()
}

fn default_api_prefix() -> String {
    "/api/".to_string()
}

fn default_shell_assets() -> Vec<String> {
    ["/", "/index.html", "/manifest.json", "/favicon.ico"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_fallback_document() -> String {
    "/index.html".to_string()
}

fn default_image_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png", "gif", "webp", "svg"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            version: default_cache_version(),
            app_name: default_app_name(),
            api_prefix: default_api_prefix(),
            shell_assets: default_shell_assets(),
            fallback_document: default_fallback_document(),
            image_extensions: default_image_extensions(),
        }
    }
}

/// Network fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSettings {
    /// Total time allowed for one attempt.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Time allowed to establish a connection.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Upper bound for the backoff delay.
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_connect_timeout_ms() -> u64 {
    2_000
}

fn default_max_retries() -> u32 {
    1
}

fn default_backoff_base_ms() -> u64 {
    100
}

fn default_backoff_max_ms() -> u64 {
    2_000
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

/// Action queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSettings {
    /// Storage key holding the serialized queue.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Prefix for generic data cache entries.
    #[serde(default = "default_cache_namespace")]
    pub cache_namespace: String,

    /// Replay attempts before an action is dropped.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Default freshness window for cached data.
    #[serde(default = "default_max_age_ms")]
    pub default_max_age_ms: u64,
}

fn default_storage_key() -> String {
    "offline-actions".to_string()
}

fn default_cache_namespace() -> String {
    "cache-".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_max_age_ms() -> u64 {
    3_600_000
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
            cache_namespace: default_cache_namespace(),
            max_attempts: default_max_attempts(),
            default_max_age_ms: default_max_age_ms(),
        }
    }
}

/// Durable storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Directory holding cache and key/value files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("netlistore")
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Versioned names of the caches the manager owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheNames {
    /// Shell assets populated at install time.
    pub static_cache: String,
    /// API responses and miscellaneous assets.
    pub dynamic_cache: String,
    /// Images.
    pub image_cache: String,
    /// Legacy default cache kept alive across promotion.
    pub legacy_cache: String,
}

impl CacheNames {
    /// Build names for a version suffix.
    pub fn versioned(app_name: &str, version: &str) -> Self {
        Self {
            static_cache: format!("static-{}", version),
            dynamic_cache: format!("dynamic-{}", version),
            image_cache: format!("images-{}", version),
            legacy_cache: format!("{}-{}", app_name, version),
        }
    }

    /// Build names from cache settings.
    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::versioned(&settings.app_name, &settings.version)
    }

    /// Every name that survives promotion.
    pub fn expected(&self) -> [&str; 4] {
        [
            &self.static_cache,
            &self.dynamic_cache,
            &self.image_cache,
            &self.legacy_cache,
        ]
    }

    /// Check whether a cache name belongs to the current version.
    pub fn is_expected(&self, name: &str) -> bool {
        self.expected().contains(&name)
    }
}

impl Default for CacheNames {
    fn default() -> Self {
        Self::from_settings(&CacheSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_storefront() {
        let config = OfflineConfig::default();
        assert_eq!(config.cache.version, "v3");
        assert_eq!(config.cache.api_prefix, "/api/");
        assert_eq!(config.cache.shell_assets.len(), 4);
        assert_eq!(config.queue.storage_key, "offline-actions");
        assert_eq!(config.queue.cache_namespace, "cache-");
    }

    #[test]
    fn test_cache_names_versioned() {
        let names = CacheNames::versioned("netlistore", "v4");
        assert_eq!(names.static_cache, "static-v4");
        assert_eq!(names.dynamic_cache, "dynamic-v4");
        assert_eq!(names.image_cache, "images-v4");
        assert_eq!(names.legacy_cache, "netlistore-v4");
        assert!(names.is_expected("images-v4"));
        assert!(!names.is_expected("images-v3"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = OfflineConfig::from_toml_str(
            r#"
            origin = "https://shop.example.com"

            [cache]
            version = "v9"

            [queue]
            max_attempts = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.origin.host_str(), Some("shop.example.com"));
        assert_eq!(config.cache_names().static_cache, "static-v9");
        assert_eq!(config.cache.fallback_document, "/index.html");
        assert_eq!(config.queue.max_attempts, 5);
        assert_eq!(config.fetch.max_retries, 1);
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let result = OfflineConfig::from_toml_str("[queue]\nmax_attempts = 0\n");
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { field: "queue.max_attempts", .. })
        ));
    }

    #[test]
    fn test_rejects_relative_api_prefix() {
        let result = OfflineConfig::from_json_str(r#"{"cache": {"api_prefix": "api"}}"#);
        assert!(result.is_err());
    }
}
