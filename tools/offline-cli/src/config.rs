//! Configuration file handling.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use offline_core::OfflineConfig;

/// File names searched for, in order, in each directory.
pub const CONFIG_FILE_NAMES: [&str; 3] = ["netlistore.toml", ".netlistore.toml", "netlistore.json"];

/// Name written by `config init`.
pub const DEFAULT_CONFIG_FILE: &str = "netlistore.toml";

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

/// Load and validate a config file; `.json` files are parsed as JSON, anything
/// else as TOML.
pub fn load(path: &Path) -> Result<OfflineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    if is_json(path) {
        OfflineConfig::from_json_str(&content)
            .with_context(|| format!("Failed to load JSON config: {}", path.display()))
    } else {
        OfflineConfig::from_toml_str(&content)
            .with_context(|| format!("Failed to load TOML config: {}", path.display()))
    }
}

/// Save config to a file in the format its extension names.
pub fn save(config: &OfflineConfig, path: &Path) -> Result<()> {
    let content = if is_json(path) {
        serde_json::to_string_pretty(config)?
    } else {
        toml::to_string_pretty(config)?
    };

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}

/// Find the nearest config file from `start` upward.
pub fn find_config(start: &Path) -> Option<PathBuf> {
    start.ancestors().find_map(|dir| {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_config_walks_up() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.path().join(".netlistore.toml"), "").unwrap();

        assert_eq!(find_config(&nested), Some(root.path().join(".netlistore.toml")));
    }

    #[test]
    fn test_find_config_prefers_nearest() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("shop");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.path().join("netlistore.toml"), "").unwrap();
        std::fs::write(nested.join("netlistore.json"), "{}").unwrap();

        assert_eq!(find_config(&nested), Some(nested.join("netlistore.json")));
    }

    #[test]
    fn test_save_then_load_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        let mut config = OfflineConfig::default();
        config.cache.version = "v4".to_string();

        save(&config, &path).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(loaded.cache.version, "v4");
        assert_eq!(loaded.cache_names().static_cache, "static-v4");
    }

    #[test]
    fn test_load_json_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("netlistore.json");
        std::fs::write(&path, r#"{"origin": "https://shop.example"}"#).unwrap();

        let config = load(&path).unwrap();
        assert_eq!(config.origin.as_str(), "https://shop.example/");
        assert_eq!(config.queue.storage_key, "offline-actions");
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "[queue]\nmax_attempts = 0\n").unwrap();

        let err = load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("queue.max_attempts"));
    }
}
