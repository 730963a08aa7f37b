//! Inspect and purge the request caches.

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use dialoguer::Confirm;
use offline_cache::{CacheStorage, SqliteCacheStorage};
use serde::Serialize;

use super::{CachesArgs, CachesCommand};
use crate::context::Context;
use crate::output::format_bytes;

#[derive(Serialize)]
struct CacheListing {
    name: String,
    current: bool,
    entries: Vec<EntryListing>,
}

#[derive(Serialize)]
struct EntryListing {
    key: String,
    status: u16,
    bytes: usize,
    stored_at: String,
}

/// Run the caches command.
pub async fn run(args: CachesArgs, ctx: &Context) -> Result<()> {
    let storage = ctx.cache_storage()?;
    match args.command {
        CachesCommand::List { entries } => list_caches(&storage, entries, ctx).await,
        CachesCommand::Purge { stale, yes } => purge_caches(&storage, stale, yes, ctx).await,
    }
}

fn format_stored_at(millis: u64) -> String {
    i64::try_from(millis)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}

async fn list_caches(storage: &SqliteCacheStorage, show_entries: bool, ctx: &Context) -> Result<()> {
    let names = ctx.config.cache_names();
    let mut listings = Vec::new();

    for name in storage.names().await.context("Failed to list caches")? {
        let mut entries = Vec::new();
        for key in storage.keys(&name).await? {
            if let Some(entry) = storage.get(&name, &key).await? {
                entries.push(EntryListing {
                    key: key.to_string(),
                    status: entry.status,
                    bytes: entry.body.len(),
                    stored_at: format_stored_at(entry.stored_at),
                });
            }
        }
        listings.push(CacheListing {
            current: names.is_expected(&name),
            name,
            entries,
        });
    }

    if ctx.output.is_json() {
        ctx.output.json(&listings);
        return Ok(());
    }

    ctx.output.header("Caches");
    if listings.is_empty() {
        ctx.output.info("No caches");
        return Ok(());
    }

    for cache in &listings {
        let total: usize = cache.entries.iter().map(|e| e.bytes).sum();
        let marker = if cache.current { "" } else { " (stale)" };
        ctx.output.list_item(&format!(
            "{}{}: {} entries, {}",
            cache.name,
            marker,
            cache.entries.len(),
            format_bytes(total as u64)
        ));
        if show_entries {
            for entry in &cache.entries {
                ctx.output.table_row(
                    &[
                        &entry.status.to_string(),
                        &format_bytes(entry.bytes as u64),
                        &entry.stored_at,
                        &entry.key,
                    ],
                    &[4, 10, 25, 0],
                );
            }
        }
    }

    Ok(())
}

async fn purge_caches(storage: &SqliteCacheStorage, stale: bool, yes: bool, ctx: &Context) -> Result<()> {
    let names = ctx.config.cache_names();
    let targets: Vec<String> = storage
        .names()
        .await
        .context("Failed to list caches")?
        .into_iter()
        .filter(|name| !stale || !names.is_expected(name))
        .collect();

    if targets.is_empty() {
        ctx.output.info("Nothing to purge");
        return Ok(());
    }

    if !yes && !ctx.output.is_json() {
        for name in &targets {
            ctx.output.list_item(name);
        }
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete {} cache(s)?", targets.len()))
            .default(false)
            .interact()?;

        if !confirmed {
            ctx.output.warn("Purge cancelled");
            return Ok(());
        }
    }

    let mut deleted = Vec::new();
    for name in targets {
        if storage.delete(&name).await? {
            deleted.push(name);
        }
    }

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({ "deleted": deleted }));
    } else {
        ctx.output.success(&format!("Deleted {} cache(s)", deleted.len()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_stored_at() {
        assert_eq!(format_stored_at(0), "1970-01-01T00:00:00+00:00");
        assert_eq!(format_stored_at(u64::MAX), u64::MAX.to_string());
    }
}
