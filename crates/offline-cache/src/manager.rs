//! The request cache manager.
//!
//! Sits between the page and the network: every intercepted request is
//! classified and answered from a named cache, the network, or a synthesized
//! fallback. Cache writes never delay the response; they run on spawned tasks
//! that [`CacheManager::settle`] waits for.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use futures::future::join_all;
use http::Method;
use offline_core::{
    CacheNames, CacheSettings, Clock, OfflineConfig, RequestId, SyncError, SyncHandler,
    SystemClock,
};
use offline_fetch::{Destination, Fetcher, Request, Response};
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, warn, Instrument};
use url::Url;

use crate::entry::CachedResponse;
use crate::events::{notification_click, ControlMessage, Notification, PushPayload, SyncEvent};
use crate::fallback;
use crate::key::RequestKey;
use crate::lifecycle::{ActivationReport, InstallReport, WorkerState};
use crate::policy::{Classifier, RequestClass};
use crate::storage::CacheStorage;

/// Result of intercepting a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Intercept {
    /// The manager produced the response.
    Respond(Response),
    /// Not intercepted; the caller should go to the network itself.
    Passthrough,
}

impl Intercept {
    /// The response, if the request was intercepted.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Intercept::Respond(response) => Some(response),
            Intercept::Passthrough => None,
        }
    }

    /// Consume into the response, if any.
    pub fn into_response(self) -> Option<Response> {
        match self {
            Intercept::Respond(response) => Some(response),
            Intercept::Passthrough => None,
        }
    }
}

/// Request cache manager over a cache storage and a network fetcher.
pub struct CacheManager<S, F> {
    storage: Arc<S>,
    fetcher: F,
    classifier: Classifier,
    names: CacheNames,
    settings: CacheSettings,
    fallback_key: Option<RequestKey>,
    clock: Arc<dyn Clock>,
    state: RwLock<WorkerState>,
    skip_waiting: AtomicBool,
    claimed: AtomicBool,
    writes: Mutex<JoinSet<()>>,
    sync_handler: RwLock<Option<Arc<dyn SyncHandler>>>,
}

impl<S, F> CacheManager<S, F>
where
    S: CacheStorage + 'static,
    F: Fetcher,
{
    /// Create a manager for the configured origin and cache version.
    pub fn new(config: &OfflineConfig, storage: S, fetcher: F) -> Self {
        let fallback_key = config
            .origin
            .join(&config.cache.fallback_document)
            .ok()
            .map(|url| RequestKey::get(&url));

        Self {
            storage: Arc::new(storage),
            fetcher,
            classifier: Classifier::new(config.origin.clone(), &config.cache),
            names: config.cache_names(),
            settings: config.cache.clone(),
            fallback_key,
            clock: Arc::new(SystemClock),
            state: RwLock::new(WorkerState::Parsed),
            skip_waiting: AtomicBool::new(true),
            claimed: AtomicBool::new(false),
            writes: Mutex::new(JoinSet::new()),
            sync_handler: RwLock::new(None),
        }
    }

    /// Use a different clock for entry timestamps.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Whether `install` promotes immediately. When disabled the manager waits
    /// in `Installed` until a `SKIP_WAITING` message arrives.
    pub fn with_skip_waiting(self, skip: bool) -> Self {
        self.skip_waiting.store(skip, Ordering::SeqCst);
        self
    }

    /// Register the handler that replays queued work on background sync.
    pub fn set_sync_handler(&self, handler: Arc<dyn SyncHandler>) {
        *self
            .sync_handler
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(handler);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        *self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Whether clients have been claimed.
    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::SeqCst)
    }

    /// Cache names for this version.
    pub fn names(&self) -> &CacheNames {
        &self.names
    }

    /// Underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Underlying fetcher.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Request classifier.
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    fn transition(&self, next: WorkerState) -> bool {
        let mut state = self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let current = *state;
        if !current.can_transition_to(next) {
            warn!(from = %current, to = %next, "Ignoring illegal lifecycle transition");
            return false;
        }
        debug!(from = %current, to = %next, "Lifecycle transition");
        *state = next;
        true
    }

    /// Provision the static cache with the shell assets, then promote unless
    /// skip-waiting is disabled.
    ///
    /// Provisioning is all-or-nothing: if any shell asset cannot be fetched,
    /// nothing is stored. Failures are logged and never block promotion.
    pub async fn install(&self) -> InstallReport {
        if !self.transition(WorkerState::Installing) {
            return InstallReport::default();
        }
        info!(cache = %self.names.static_cache, "Installing");

        let report = self.provision().await;
        if report.is_complete() {
            info!(assets = report.cached.len(), "Static assets cached");
        } else {
            error!(failed = ?report.failed, "Failed to cache static assets");
        }

        self.transition(WorkerState::Installed);
        if self.skip_waiting.load(Ordering::SeqCst) {
            self.activate().await;
        }
        report
    }

    async fn provision(&self) -> InstallReport {
        let cache = &self.names.static_cache;
        let mut report = InstallReport::default();

        if let Err(e) = self.storage.open(cache).await {
            error!(cache = %cache, error = %e, "Failed to open static cache");
            report.failed = self.settings.shell_assets.clone();
            return report;
        }

        let fetches = self.settings.shell_assets.iter().map(|asset| async move {
            let request = match Request::for_path(self.classifier.origin(), asset) {
                Ok(request) => request,
                Err(e) => {
                    warn!(asset = %asset, error = %e, "Invalid shell asset path");
                    return (asset, None);
                }
            };
            match self.fetcher.fetch(&request).await {
                Ok(response) if response.status.is_success() => {
                    (asset, Some((RequestKey::from_request(&request), response)))
                }
                Ok(response) => {
                    warn!(asset = %asset, status = response.status.as_u16(), "Shell asset not available");
                    (asset, None)
                }
                Err(e) => {
                    warn!(asset = %asset, error = %e, "Failed to fetch shell asset");
                    (asset, None)
                }
            }
        });

        let mut fetched = Vec::with_capacity(self.settings.shell_assets.len());
        for (asset, result) in join_all(fetches).await {
            match result {
                Some((key, response)) => fetched.push((asset, key, response)),
                None => report.failed.push(asset.clone()),
            }
        }

        if !report.failed.is_empty() {
            return report;
        }

        let now = self.clock.now_millis();
        for (asset, key, response) in fetched {
            let entry = CachedResponse::from_response(&response, now);
            match self.storage.put(cache, &key, entry).await {
                Ok(()) => report.cached.push(asset.clone()),
                Err(e) => {
                    warn!(asset = %asset, error = %e, "Failed to store shell asset");
                    report.failed.push(asset.clone());
                }
            }
        }
        report
    }

    /// Promote this version: delete every cache outside the expected set and
    /// claim all clients.
    pub async fn activate(&self) -> ActivationReport {
        let mut report = ActivationReport::default();
        if !self.transition(WorkerState::Activating) {
            return report;
        }
        info!("Activating");

        match self.storage.names().await {
            Ok(names) => {
                for name in names.into_iter().filter(|n| !self.names.is_expected(n)) {
                    match self.storage.delete(&name).await {
                        Ok(_) => {
                            info!(cache = %name, "Deleting old cache");
                            report.deleted.push(name);
                        }
                        Err(e) => warn!(cache = %name, error = %e, "Failed to delete old cache"),
                    }
                }
            }
            Err(e) => error!(error = %e, "Failed to enumerate caches"),
        }

        self.claimed.store(true, Ordering::SeqCst);
        report.claimed = true;
        self.transition(WorkerState::Activated);
        info!(deleted = report.deleted.len(), "Activated");
        report
    }

    /// Mark this version as superseded.
    pub fn retire(&self) {
        self.transition(WorkerState::Redundant);
    }

    /// Intercept a request.
    ///
    /// Never fails: network and storage errors resolve to cached content or a
    /// synthesized fallback.
    pub async fn handle(&self, request: &Request) -> Intercept {
        let class = self.classifier.classify(request);
        if class == RequestClass::Passthrough {
            return Intercept::Passthrough;
        }

        let request_id = RequestId::generate();
        let span = info_span!(
            "intercept",
            request_id = %request_id,
            class = %class,
            method = %request.method,
            url = %request.url,
        );

        let response = async {
            let key = RequestKey::from_request(request);
            let response = match class {
                RequestClass::Image => self.serve_image(request, &key).await,
                RequestClass::Api => self.serve_api(request, &key).await,
                RequestClass::Navigation => self.serve_navigation(request).await,
                RequestClass::Asset | RequestClass::Passthrough => {
                    self.serve_asset(request, &key).await
                }
            };
            debug!(status = response.status.as_u16(), "Responded");
            response
        }
        .instrument(span)
        .await;

        Intercept::Respond(response)
    }

    /// Cache-first against the image cache; placeholder on network failure.
    async fn serve_image(&self, request: &Request, key: &RequestKey) -> Response {
        if let Some(hit) = self.cached_in(request, &self.names.image_cache, key).await {
            return hit;
        }
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                self.store_later(request, &self.names.image_cache, key, &response);
                response
            }
            Err(e) => {
                warn!(error = %e, "Image fetch failed, serving placeholder");
                fallback::placeholder_image()
            }
        }
    }

    /// Network-first; dynamic cache, then the offline JSON error.
    async fn serve_api(&self, request: &Request, key: &RequestKey) -> Response {
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                self.store_later(request, &self.names.dynamic_cache, key, &response);
                response
            }
            Err(e) => {
                warn!(error = %e, "API fetch failed, trying cache");
                match self.cached_in(request, &self.names.dynamic_cache, key).await {
                    Some(hit) => hit,
                    None => fallback::offline_api(),
                }
            }
        }
    }

    /// Network-first; the cached app shell document on failure.
    async fn serve_navigation(&self, request: &Request) -> Response {
        match self.fetcher.fetch(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Navigation failed, serving app shell");
                self.shell_document().await
            }
        }
    }

    /// Cache-first across every cache; shell document or 503 on failure.
    async fn serve_asset(&self, request: &Request, key: &RequestKey) -> Response {
        if let Some(hit) = self.cached_anywhere(request, key).await {
            return hit;
        }
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                self.store_later(request, &self.names.dynamic_cache, key, &response);
                response
            }
            Err(e) => {
                warn!(error = %e, "Asset fetch failed");
                if request.destination == Destination::Document {
                    self.shell_document().await
                } else {
                    fallback::service_unavailable()
                }
            }
        }
    }

    async fn shell_document(&self) -> Response {
        let Some(key) = &self.fallback_key else {
            return fallback::service_unavailable();
        };
        match self.storage.match_any(key).await {
            Ok(Some(entry)) => entry.to_response(),
            Ok(None) => {
                warn!(document = %self.settings.fallback_document, "App shell not cached");
                fallback::service_unavailable()
            }
            Err(e) => {
                warn!(error = %e, "Failed to read app shell");
                fallback::service_unavailable()
            }
        }
    }

    async fn cached_in(&self, request: &Request, cache: &str, key: &RequestKey) -> Option<Response> {
        if request.method != Method::GET {
            return None;
        }
        match self.storage.get(cache, key).await {
            Ok(found) => found.map(|entry| {
                debug!(cache = %cache, "Cache hit");
                entry.to_response()
            }),
            Err(e) => {
                warn!(cache = %cache, error = %e, "Cache read failed");
                None
            }
        }
    }

    async fn cached_anywhere(&self, request: &Request, key: &RequestKey) -> Option<Response> {
        if request.method != Method::GET {
            return None;
        }
        match self.storage.match_any(key).await {
            Ok(found) => found.map(|entry| {
                debug!("Cache hit");
                entry.to_response()
            }),
            Err(e) => {
                warn!(error = %e, "Cache read failed");
                None
            }
        }
    }

    /// Store a 200 GET response on a background task.
    fn store_later(&self, request: &Request, cache: &str, key: &RequestKey, response: &Response) {
        if request.method != Method::GET || !response.is_cacheable() {
            return;
        }

        let storage = Arc::clone(&self.storage);
        let cache = cache.to_string();
        let key = key.clone();
        let entry = CachedResponse::from_response(response, self.clock.now_millis());

        let mut writes = self.lock_writes();
        while writes.try_join_next().is_some() {}
        writes.spawn(
            async move {
                match storage.put(&cache, &key, entry).await {
                    Ok(()) => debug!(cache = %cache, "Stored response"),
                    Err(e) => warn!(cache = %cache, key = %key, error = %e, "Failed to store response"),
                }
            }
            .in_current_span(),
        );
    }

    fn lock_writes(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.writes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Wait for every outstanding cache write.
    pub async fn settle(&self) {
        loop {
            let mut writes = std::mem::take(&mut *self.lock_writes());
            if writes.is_empty() {
                return;
            }
            while let Some(result) = writes.join_next().await {
                if let Err(e) = result {
                    warn!(error = %e, "Cache write task failed");
                }
            }
        }
    }

    /// Handle a deferred-work notification.
    ///
    /// `background-sync` is forwarded to the registered handler; other tags
    /// are ignored.
    pub async fn on_sync(&self, event: &SyncEvent) -> Result<(), SyncError> {
        info!(tag = %event.tag, "Background sync triggered");
        if !event.is_background_sync() {
            return Ok(());
        }

        let handler = self
            .sync_handler
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        match handler {
            Some(handler) => handler.on_sync(&event.tag).await.map_err(|e| {
                warn!(error = %e, "Background sync incomplete");
                e
            }),
            None => {
                debug!("No sync handler registered");
                Ok(())
            }
        }
    }

    /// Build the notification for a push message.
    pub fn on_push(&self, data: &[u8]) -> Notification {
        info!("Push notification received");
        Notification::from_push(PushPayload::parse(data))
    }

    /// Page to open for a notification click.
    pub fn on_notification_click(&self, action: &str) -> Option<&'static str> {
        info!(action = %action, "Notification clicked");
        notification_click(action)
    }

    /// Handle a message from a page. Returns whether it was recognized.
    pub async fn on_message(&self, data: &str) -> bool {
        match ControlMessage::parse(data) {
            Some(ControlMessage::SkipWaiting) => {
                self.skip_waiting.store(true, Ordering::SeqCst);
                if self.state() == WorkerState::Installed {
                    self.activate().await;
                }
                true
            }
            None => {
                debug!(message = %data, "Ignoring unrecognized message");
                false
            }
        }
    }

    /// Resolve a path against the storefront origin.
    pub fn resolve(&self, path: &str) -> Option<Url> {
        self.classifier.origin().join(path).ok()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use http::StatusCode;
    use offline_core::ManualClock;
    use offline_fetch::ScriptedFetcher;

    use super::*;
    use crate::storage::MemoryCacheStorage;

    const ORIGIN: &str = "https://shop.example.com";

    fn config() -> OfflineConfig {
        OfflineConfig {
            origin: Url::parse(ORIGIN).unwrap(),
            ..OfflineConfig::default()
        }
    }

    fn url(path: &str) -> String {
        format!("{}{}", ORIGIN, path)
    }

    fn manager(fetcher: ScriptedFetcher) -> CacheManager<MemoryCacheStorage, ScriptedFetcher> {
        CacheManager::new(&config(), MemoryCacheStorage::new(), fetcher)
    }

    fn shell_fetcher() -> ScriptedFetcher {
        ScriptedFetcher::new()
            .with_route(url("/"), Response::ok("<html>root</html>"))
            .with_route(url("/index.html"), Response::ok("<html>shell</html>"))
            .with_route(url("/manifest.json"), Response::ok("{}"))
            .with_route(url("/favicon.ico"), Response::ok(vec![0u8, 1, 2]))
    }

    #[tokio::test]
    async fn test_install_provisions_and_activates() {
        let manager = manager(shell_fetcher());
        let report = manager.install().await;

        assert!(report.is_complete());
        assert_eq!(report.cached.len(), 4);
        assert_eq!(manager.state(), WorkerState::Activated);
        assert!(manager.is_claimed());
        assert_eq!(manager.storage().keys("static-v3").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_install_failure_still_activates() {
        let fetcher = ScriptedFetcher::new().with_route(url("/"), Response::ok("root"));
        let manager = manager(fetcher);
        let report = manager.install().await;

        assert!(!report.is_complete());
        assert!(report.cached.is_empty());
        assert!(manager.storage().keys("static-v3").await.unwrap().is_empty());
        assert_eq!(manager.state(), WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_skip_waiting_message_promotes() {
        let manager = manager(shell_fetcher()).with_skip_waiting(false);
        manager.install().await;
        assert_eq!(manager.state(), WorkerState::Installed);

        assert!(!manager.on_message(r#"{"type":"RELOAD"}"#).await);
        assert!(manager.on_message(r#"{"type":"SKIP_WAITING"}"#).await);
        assert_eq!(manager.state(), WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_image_cache_hit_skips_network() {
        let fetcher = ScriptedFetcher::new().with_route(url("/p/1.png"), Response::ok("png"));
        let manager = manager(fetcher);
        let request = Request::image(&url("/p/1.png")).unwrap();

        manager.handle(&request).await;
        manager.settle().await;
        let second = manager.handle(&request).await.into_response().unwrap();

        assert_eq!(second.body, b"png");
        assert_eq!(manager.fetcher.calls_for(&url("/p/1.png")), 1);
    }

    #[tokio::test]
    async fn test_non_200_is_not_cached() {
        let fetcher = ScriptedFetcher::new()
            .with_route(url("/api/products"), Response::new(StatusCode::NO_CONTENT));
        let manager = manager(fetcher);
        let request = Request::get(&url("/api/products")).unwrap();

        manager.handle(&request).await;
        manager.settle().await;

        assert!(manager.storage().keys("dynamic-v3").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_post_is_never_cached() {
        let fetcher = ScriptedFetcher::new().with_route(url("/api/cart"), Response::ok("{}"));
        let manager = manager(fetcher);
        let request = Request::get(&url("/api/cart")).unwrap().with_method(Method::POST);

        let response = manager.handle(&request).await.into_response().unwrap();
        manager.settle().await;

        assert_eq!(response.status, StatusCode::OK);
        assert!(manager.storage().keys("dynamic-v3").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_entries_are_stamped_with_clock() {
        let fetcher = ScriptedFetcher::new().with_route(url("/app.js"), Response::ok("js"));
        let manager = manager(fetcher).with_clock(ManualClock::new(5_000));
        let request = Request::get(&url("/app.js")).unwrap();

        manager.handle(&request).await;
        manager.settle().await;

        let entry = manager
            .storage()
            .get("dynamic-v3", &RequestKey::from_request(&request))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.stored_at, 5_000);
    }

    #[tokio::test]
    async fn test_write_failure_does_not_affect_response() {
        let fetcher = ScriptedFetcher::new().with_route(url("/app.css"), Response::ok("css"));
        let manager = manager(fetcher);
        manager.storage().reject_writes(true);

        let request = Request::get(&url("/app.css")).unwrap();
        let response = manager.handle(&request).await.into_response().unwrap();
        manager.settle().await;

        assert_eq!(response.body, b"css");
    }

    #[tokio::test]
    async fn test_passthrough() {
        let manager = manager(ScriptedFetcher::new());
        let request = Request::get("chrome-extension://abc/content.js").unwrap();
        assert_eq!(manager.handle(&request).await, Intercept::Passthrough);
        assert_eq!(manager.fetcher.call_count(), 0);
    }

    struct CountingHandler(AtomicUsize);

    #[async_trait]
    impl SyncHandler for CountingHandler {
        async fn on_sync(&self, _tag: &str) -> Result<(), SyncError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_background_sync_reaches_handler() {
        let manager = manager(ScriptedFetcher::new());
        let handler = Arc::new(CountingHandler(AtomicUsize::new(0)));
        manager.set_sync_handler(handler.clone());

        manager.on_sync(&SyncEvent::new("periodic")).await.unwrap();
        manager.on_sync(&SyncEvent::background()).await.unwrap();

        assert_eq!(handler.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_background_sync_without_handler() {
        let manager = manager(ScriptedFetcher::new());
        assert!(manager.on_sync(&SyncEvent::background()).await.is_ok());
    }

    #[test]
    fn test_push_and_click() {
        let manager = manager(ScriptedFetcher::new());
        let notification = manager.on_push(br#"{"body":"Back in stock"}"#);
        assert_eq!(notification.title, "Netlistore");
        assert_eq!(notification.body, "Back in stock");
        assert_eq!(manager.on_notification_click("explore"), Some("/"));
    }
}
