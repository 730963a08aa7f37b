//! Offline action queue commands.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use chrono::Utc;
use indicatif::ProgressBar;
use offline_queue::{
    ActionId, ActionKind, ActionSink, CartAddPayload, CheckoutPayload, LoggingSink, OfflineQueue,
    OfflineSync, ReplayError, WishlistPayload,
};
use offline_store::SqliteStore;

use super::{QueueArgs, QueueCommand};
use crate::context::Context;
use crate::output::format_age;

/// Run the queue command.
pub async fn run(args: QueueArgs, ctx: &Context) -> Result<()> {
    let queue = Arc::new(OfflineQueue::new(ctx.store()?, &ctx.config.queue));
    match args.command {
        QueueCommand::Record { kind, data } => record_action(&queue, &kind, &data, ctx),
        QueueCommand::List => list_actions(&queue, ctx),
        QueueCommand::Drain => drain_queue(queue, ctx).await,
        QueueCommand::Status => show_status(queue, ctx),
    }
}

fn record_action(queue: &OfflineQueue<SqliteStore>, kind: &str, data: &str, ctx: &Context) -> Result<()> {
    let data = serde_json::from_str(data).with_context(|| format!("Invalid JSON payload: {}", data))?;
    let kind = ActionKind::from_parts(kind, data);
    if !kind.is_known() {
        ctx.output
            .warn(&format!("'{}' is not a known action type; it will be skipped on replay", kind.name()));
    }

    let id = queue.record_action(kind);

    if ctx.output.is_json() {
        ctx.output
            .json(&serde_json::json!({ "id": id, "pending": queue.pending_count() }));
    } else {
        ctx.output.success(&format!("Recorded action {}", id));
        ctx.output.kv("Pending", &queue.pending_count().to_string());
    }
    Ok(())
}

fn list_actions(queue: &OfflineQueue<SqliteStore>, ctx: &Context) -> Result<()> {
    let pending = queue.pending();

    if ctx.output.is_json() {
        ctx.output.json(&pending);
        return Ok(());
    }

    ctx.output.header("Pending actions");
    if pending.is_empty() {
        ctx.output.info("Queue is empty");
        return Ok(());
    }

    let now = Utc::now().timestamp_millis().max(0) as u64;
    ctx.output.table_row(&["ID", "TYPE", "AGE", "ATTEMPTS"], &[15, 22, 10, 8]);
    for action in &pending {
        ctx.output.table_row(
            &[
                action.id.as_str(),
                action.kind.name(),
                &format_age(now.saturating_sub(action.timestamp)),
                &action.attempts.to_string(),
            ],
            &[15, 22, 10, 8],
        );
    }
    Ok(())
}

async fn drain_queue(queue: Arc<OfflineQueue<SqliteStore>>, ctx: &Context) -> Result<()> {
    let pending = queue.pending_count();
    if pending == 0 {
        ctx.output.info("Queue is empty");
        return Ok(());
    }

    let bar = ctx.output.progress(pending as u64, "Replaying actions");
    let sink = Arc::new(ProgressSink::new(LoggingSink, bar.clone()));
    let sync = OfflineSync::new(queue, sink, ctx.connectivity());

    if !sync.connectivity().is_online() {
        bar.finish_and_clear();
        ctx.output
            .warn(&format!("Offline: {} action(s) stay queued", pending));
        return Ok(());
    }

    let report = sync.drain().await;
    bar.finish_and_clear();

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({
            "synced": report.synced,
            "skipped": report.skipped,
            "retained": report.retained,
            "dropped": report.dropped,
        }));
        return Ok(());
    }

    ctx.output
        .success(&format!("Synced {} action(s)", report.synced.len()));
    if !report.skipped.is_empty() {
        ctx.output
            .warn(&format!("Skipped {} unknown action(s)", report.skipped.len()));
    }
    if report.failed() > 0 {
        ctx.output.warn(&format!(
            "{} failed: {} kept for retry, {} dropped",
            report.failed(),
            report.retained.len(),
            report.dropped.len()
        ));
    }
    Ok(())
}

fn show_status(queue: Arc<OfflineQueue<SqliteStore>>, ctx: &Context) -> Result<()> {
    let sync = OfflineSync::new(queue, Arc::new(LoggingSink), ctx.connectivity());
    let status = sync.status();

    if ctx.output.is_json() {
        ctx.output.json(&status);
        return Ok(());
    }

    ctx.output.kv("Connectivity", &status.connectivity.to_string());
    ctx.output.kv("Pending", &status.pending.to_string());
    if let Some(banner) = status.banner() {
        ctx.output.banner(&banner);
    }
    Ok(())
}

/// Advances a progress bar as each action is delivered.
struct ProgressSink<K> {
    inner: K,
    bar: ProgressBar,
}

impl<K> ProgressSink<K> {
    fn new(inner: K, bar: ProgressBar) -> Self {
        Self { inner, bar }
    }

    fn tick<T>(&self, id: &ActionId, result: Result<T, ReplayError>) -> Result<T, ReplayError> {
        self.bar.set_message(id.to_string());
        self.bar.inc(1);
        result
    }
}

#[async_trait]
impl<K: ActionSink> ActionSink for ProgressSink<K> {
    async fn add_to_cart(&self, id: &ActionId, payload: &CartAddPayload) -> Result<(), ReplayError> {
        let result = self.inner.add_to_cart(id, payload).await;
        self.tick(id, result)
    }

    async fn add_to_wishlist(&self, id: &ActionId, payload: &WishlistPayload) -> Result<(), ReplayError> {
        let result = self.inner.add_to_wishlist(id, payload).await;
        self.tick(id, result)
    }

    async fn remove_from_wishlist(
        &self,
        id: &ActionId,
        payload: &WishlistPayload,
    ) -> Result<(), ReplayError> {
        let result = self.inner.remove_from_wishlist(id, payload).await;
        self.tick(id, result)
    }

    async fn checkout(&self, id: &ActionId, payload: &CheckoutPayload) -> Result<(), ReplayError> {
        let result = self.inner.checkout(id, payload).await;
        self.tick(id, result)
    }
}

#[cfg(test)]
mod tests {
    use offline_store::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_progress_sink_counts_delivered_actions() {
        let queue = OfflineQueue::new(MemoryStore::new(), &Default::default());
        queue.record_action(ActionKind::CartAdd(CartAddPayload::new("1", 2)));
        queue.record_action(ActionKind::from_parts("share-product", serde_json::json!({})));
        queue.record_action(ActionKind::WishlistRemove(WishlistPayload::new("3")));

        let bar = ProgressBar::hidden();
        let sink = ProgressSink::new(LoggingSink, bar.clone());
        let report = queue.drain(&sink).await;

        assert_eq!(report.synced.len(), 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(bar.position(), 2);
    }
}
