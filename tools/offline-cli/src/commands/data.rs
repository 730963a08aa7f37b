//! Time-bounded data cache commands.

use anyhow::{bail, Context as _, Result};
use offline_queue::DataCache;
use serde_json::Value;

use super::{DataArgs, DataCommand};
use crate::context::Context;

/// Run the data command.
pub async fn run(args: DataArgs, ctx: &Context) -> Result<()> {
    let cache = DataCache::new(ctx.store()?, &ctx.config.queue);
    match args.command {
        DataCommand::Set { key, value } => {
            let value: Value =
                serde_json::from_str(&value).with_context(|| format!("Invalid JSON value: {}", value))?;
            cache.cache_data(&key, &value);
            ctx.output.success(&format!("Cached '{}'", key));
        }
        DataCommand::Get { key, max_age_ms } => {
            let max_age = max_age_ms.unwrap_or(ctx.config.queue.default_max_age_ms);
            match cache.get_cached_data::<Value>(&key, max_age) {
                Some(value) if ctx.output.is_json() => ctx.output.json(&value),
                Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                None => bail!("No fresh data for '{}'", key),
            }
        }
        DataCommand::Clear => {
            let removed = cache.clear_cache();
            if ctx.output.is_json() {
                ctx.output.json(&serde_json::json!({ "removed": removed }));
            } else {
                ctx.output.success(&format!("Removed {} cached value(s)", removed));
            }
        }
    }
    Ok(())
}
