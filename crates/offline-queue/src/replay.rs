//! Replaying queued actions against a backend.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::action::{ActionKind, CartAddPayload, CheckoutPayload, QueuedAction, WishlistPayload};
use crate::error::ReplayError;
use crate::ids::ActionId;

/// Destination for replayed actions, one method per known kind.
#[async_trait]
pub trait ActionSink: Send + Sync {
    async fn add_to_cart(&self, id: &ActionId, payload: &CartAddPayload) -> Result<(), ReplayError>;

    async fn add_to_wishlist(&self, id: &ActionId, payload: &WishlistPayload) -> Result<(), ReplayError>;

    async fn remove_from_wishlist(
        &self,
        id: &ActionId,
        payload: &WishlistPayload,
    ) -> Result<(), ReplayError>;

    async fn checkout(&self, id: &ActionId, payload: &CheckoutPayload) -> Result<(), ReplayError>;
}

#[async_trait]
impl<S: ActionSink + ?Sized> ActionSink for Arc<S> {
    async fn add_to_cart(&self, id: &ActionId, payload: &CartAddPayload) -> Result<(), ReplayError> {
        (**self).add_to_cart(id, payload).await
    }

    async fn add_to_wishlist(&self, id: &ActionId, payload: &WishlistPayload) -> Result<(), ReplayError> {
        (**self).add_to_wishlist(id, payload).await
    }

    async fn remove_from_wishlist(
        &self,
        id: &ActionId,
        payload: &WishlistPayload,
    ) -> Result<(), ReplayError> {
        (**self).remove_from_wishlist(id, payload).await
    }

    async fn checkout(&self, id: &ActionId, payload: &CheckoutPayload) -> Result<(), ReplayError> {
        (**self).checkout(id, payload).await
    }
}

/// Sink that only logs what it would sync.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

#[async_trait]
impl ActionSink for LoggingSink {
    async fn add_to_cart(&self, id: &ActionId, payload: &CartAddPayload) -> Result<(), ReplayError> {
        info!(action_id = %id, product_id = %payload.product_id, quantity = payload.quantity, "Syncing cart addition");
        Ok(())
    }

    async fn add_to_wishlist(&self, id: &ActionId, payload: &WishlistPayload) -> Result<(), ReplayError> {
        info!(action_id = %id, product_id = %payload.product_id, "Syncing wishlist addition");
        Ok(())
    }

    async fn remove_from_wishlist(
        &self,
        id: &ActionId,
        payload: &WishlistPayload,
    ) -> Result<(), ReplayError> {
        info!(action_id = %id, product_id = %payload.product_id, "Syncing wishlist removal");
        Ok(())
    }

    async fn checkout(&self, id: &ActionId, payload: &CheckoutPayload) -> Result<(), ReplayError> {
        info!(action_id = %id, items = payload.items.len(), "Syncing checkout");
        Ok(())
    }
}

/// Result of replaying one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayOutcome {
    /// Delivered to the sink.
    Synced,
    /// Not deliverable by this build; dropped with a diagnostic.
    Skipped,
}

/// Route an action to the sink method for its kind.
pub async fn dispatch<S: ActionSink + ?Sized>(
    sink: &S,
    action: &QueuedAction,
) -> Result<ReplayOutcome, ReplayError> {
    match &action.kind {
        ActionKind::CartAdd(payload) => sink.add_to_cart(&action.id, payload).await?,
        ActionKind::WishlistAdd(payload) => sink.add_to_wishlist(&action.id, payload).await?,
        ActionKind::WishlistRemove(payload) => sink.remove_from_wishlist(&action.id, payload).await?,
        ActionKind::Checkout(payload) => sink.checkout(&action.id, payload).await?,
        ActionKind::Unknown { kind, .. } => {
            warn!(action_id = %action.id, kind = %kind, "Unknown offline action");
            return Ok(ReplayOutcome::Skipped);
        }
    }
    Ok(ReplayOutcome::Synced)
}
