//! Queue replay across connectivity changes and the background sync hook.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use offline_cache::{CacheManager, MemoryCacheStorage, SyncEvent};
use offline_core::{Connectivity, ConnectivityMonitor, OfflineConfig, QueueSettings};
use offline_fetch::ScriptedFetcher;
use offline_queue::{
    ActionId, ActionKind, ActionSink, CartAddPayload, CheckoutPayload, OfflineQueue, OfflineSync,
    ReplayError, WishlistPayload,
};
use offline_store::{KeyValueStore, MemoryStore};

/// Records the order actions arrive in.
#[derive(Default)]
struct OrderSink {
    seen: Mutex<Vec<String>>,
}

impl OrderSink {
    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActionSink for OrderSink {
    async fn add_to_cart(&self, _: &ActionId, p: &CartAddPayload) -> Result<(), ReplayError> {
        self.seen.lock().unwrap().push(format!("add-to-cart:{}", p.product_id));
        Ok(())
    }

    async fn add_to_wishlist(&self, _: &ActionId, p: &WishlistPayload) -> Result<(), ReplayError> {
        self.seen.lock().unwrap().push(format!("add-to-wishlist:{}", p.product_id));
        Ok(())
    }

    async fn remove_from_wishlist(&self, _: &ActionId, p: &WishlistPayload) -> Result<(), ReplayError> {
        self.seen.lock().unwrap().push(format!("remove-from-wishlist:{}", p.product_id));
        Ok(())
    }

    async fn checkout(&self, _: &ActionId, p: &CheckoutPayload) -> Result<(), ReplayError> {
        self.seen.lock().unwrap().push(format!("order-checkout:{}", p.items.len()));
        Ok(())
    }
}

fn three_actions() -> Vec<ActionKind> {
    vec![
        ActionKind::CartAdd(CartAddPayload::new("42", 1)),
        ActionKind::WishlistAdd(WishlistPayload::new("7")),
        ActionKind::Checkout(CheckoutPayload {
            items: vec![CartAddPayload::new("42", 1)],
            note: None,
        }),
    ]
}

async fn wait_for_empty<S: KeyValueStore>(queue: &OfflineQueue<S>) {
    let mut pending = queue.subscribe_pending();
    tokio::time::timeout(Duration::from_secs(5), pending.wait_for(|count| *count == 0))
        .await
        .expect("queue did not drain")
        .expect("queue dropped");
}

#[tokio::test]
async fn coming_online_replays_in_order_and_clears_storage() {
    let store = Arc::new(MemoryStore::new());
    let queue = Arc::new(OfflineQueue::new(store.clone(), &QueueSettings::default()));
    let sink = Arc::new(OrderSink::default());
    let connectivity = ConnectivityMonitor::new(Connectivity::Offline);
    let sync = Arc::new(OfflineSync::new(queue.clone(), sink.clone(), connectivity.clone()));

    for kind in three_actions() {
        sync.submit(kind).await;
    }
    assert_eq!(queue.pending_count(), 3);
    assert!(store.get("offline-actions").unwrap().is_some());

    let runner = tokio::spawn({
        let sync = sync.clone();
        async move { sync.run().await }
    });
    tokio::task::yield_now().await;

    connectivity.set(Connectivity::Online);
    wait_for_empty(&queue).await;
    runner.abort();

    assert_eq!(
        sink.seen(),
        vec!["add-to-cart:42", "add-to-wishlist:7", "order-checkout:1"]
    );
    assert!(store.get("offline-actions").unwrap().is_none());
}

#[tokio::test]
async fn queue_survives_restart() {
    let store = Arc::new(MemoryStore::new());
    {
        let queue = OfflineQueue::new(store.clone(), &QueueSettings::default());
        for kind in three_actions() {
            queue.record_action(kind);
        }
    }

    let reopened = OfflineQueue::new(store, &QueueSettings::default());
    let ids: Vec<_> = reopened.pending().into_iter().map(|a| a.id).collect();
    assert_eq!(ids.len(), 3);
    assert!(ids.windows(2).all(|w| w[0].as_millis() < w[1].as_millis()));
}

#[tokio::test]
async fn background_sync_from_cache_manager_drains_queue() {
    let queue = Arc::new(OfflineQueue::new(MemoryStore::new(), &QueueSettings::default()));
    let sink = Arc::new(OrderSink::default());
    let sync = Arc::new(OfflineSync::new(
        queue.clone(),
        sink.clone(),
        ConnectivityMonitor::new(Connectivity::Offline),
    ));
    for kind in three_actions() {
        sync.submit(kind).await;
    }

    let manager = CacheManager::new(
        &OfflineConfig::default(),
        MemoryCacheStorage::new(),
        ScriptedFetcher::new(),
    );
    manager.set_sync_handler(sync);

    manager.on_sync(&SyncEvent::background()).await.unwrap();

    assert_eq!(queue.pending_count(), 0);
    assert_eq!(sink.seen().len(), 3);
}
