//! Configuration management commands.

use anyhow::{bail, Result};
use offline_core::OfflineConfig;

use super::{ConfigArgs, ConfigCommand};
use crate::config::{self, DEFAULT_CONFIG_FILE};
use crate::context::Context;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx),
        ConfigCommand::Init { path, force } => init_config(path.as_deref(), force, ctx),
        ConfigCommand::Validate => validate_config(ctx),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match &ctx.config_path {
        Some(path) => ctx.output.kv("source", &path.display().to_string()),
        None => ctx.output.kv("source", "defaults"),
    }

    let names = ctx.config.cache_names();
    ctx.output.info("");
    ctx.output.info("[caches]");
    ctx.output.kv("static", &names.static_cache);
    ctx.output.kv("dynamic", &names.dynamic_cache);
    ctx.output.kv("images", &names.image_cache);
    ctx.output.kv("legacy", &names.legacy_cache);

    ctx.output.info("");
    println!("{}", toml::to_string_pretty(&ctx.config)?);
    Ok(())
}

fn init_config(path: Option<&str>, force: bool, ctx: &Context) -> Result<()> {
    let config_path = ctx.resolve_path(path.unwrap_or(DEFAULT_CONFIG_FILE));

    if config_path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    config::save(&OfflineConfig::default(), &config_path)?;
    ctx.output.success(&format!("Created: {}", config_path.display()));
    Ok(())
}

/// Problems that do not stop the layer from working but are likely mistakes.
fn config_warnings(config: &OfflineConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let settings = &config.cache;

    if !settings.shell_assets.contains(&settings.fallback_document) {
        warnings.push(format!(
            "cache.fallback_document '{}' is not among cache.shell_assets; offline navigations will 503",
            settings.fallback_document
        ));
    }
    for asset in &settings.shell_assets {
        if !asset.starts_with('/') {
            warnings.push(format!("cache.shell_assets entry '{}' should start with '/'", asset));
        }
    }
    if settings.image_extensions.is_empty() {
        warnings.push("cache.image_extensions is empty; images are only recognized by destination".to_string());
    }
    if config.queue.default_max_age_ms == 0 {
        warnings.push("queue.default_max_age_ms is 0; cached data is never fresh".to_string());
    }
    if config.fetch.backoff_base_ms > config.fetch.backoff_max_ms {
        warnings.push("fetch.backoff_base_ms exceeds fetch.backoff_max_ms".to_string());
    }
    warnings
}

fn validate_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Validating configuration");

    if let Err(e) = ctx.config.validate() {
        bail!("Configuration is invalid: {}", e);
    }

    let warnings = config_warnings(&ctx.config);
    if warnings.is_empty() {
        ctx.output.success("Configuration is valid");
        return Ok(());
    }

    for warning in &warnings {
        ctx.output.warn(&format!("Warning: {}", warning));
    }
    ctx.output.success("Configuration is valid (with warnings)");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_have_no_warnings() {
        assert!(config_warnings(&OfflineConfig::default()).is_empty());
    }

    #[test]
    fn test_missing_fallback_document_warns() {
        let mut config = OfflineConfig::default();
        config.cache.shell_assets = vec!["/".to_string(), "app.js".to_string()];

        let warnings = config_warnings(&config);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("/index.html"));
        assert!(warnings[1].contains("app.js"));
    }
}
