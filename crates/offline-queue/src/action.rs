//! Queued user actions and their persisted form.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{ActionId, ProductId, VariantId};

/// Wire name of a cart addition.
pub const ADD_TO_CART: &str = "add-to-cart";
/// Wire name of a wishlist addition.
pub const ADD_TO_WISHLIST: &str = "add-to-wishlist";
/// Wire name of a wishlist removal.
pub const REMOVE_FROM_WISHLIST: &str = "remove-from-wishlist";
/// Wire name of a checkout hand-off.
pub const ORDER_CHECKOUT: &str = "order-checkout";

fn default_quantity() -> u32 {
    1
}

/// A product added to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartAddPayload {
    pub product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<VariantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

impl CartAddPayload {
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            variant_id: None,
            size: None,
            quantity,
        }
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }
}

/// A product added to or removed from the wishlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistPayload {
    pub product_id: ProductId,
}

impl WishlistPayload {
    pub fn new(product_id: impl Into<ProductId>) -> Self {
        Self {
            product_id: product_id.into(),
        }
    }
}

/// The cart contents handed to the external order form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
    #[serde(default)]
    pub items: Vec<CartAddPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// What the user did.
///
/// Kinds this build does not recognize are kept verbatim so they survive a
/// round trip through storage.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionKind {
    CartAdd(CartAddPayload),
    WishlistAdd(WishlistPayload),
    WishlistRemove(WishlistPayload),
    Checkout(CheckoutPayload),
    Unknown { kind: String, data: Value },
}

impl ActionKind {
    /// Build a kind from its wire name and data.
    ///
    /// A recognized name whose data does not match its payload is kept as
    /// `Unknown` rather than lost.
    pub fn from_parts(kind: &str, data: Value) -> Self {
        fn typed<T: serde::de::DeserializeOwned>(data: &Value) -> Option<T> {
            T::deserialize(data).ok()
        }

        let parsed = match kind {
            ADD_TO_CART => typed(&data).map(Self::CartAdd),
            ADD_TO_WISHLIST => typed(&data).map(Self::WishlistAdd),
            REMOVE_FROM_WISHLIST => typed(&data).map(Self::WishlistRemove),
            ORDER_CHECKOUT => typed(&data).map(Self::Checkout),
            _ => None,
        };

        parsed.unwrap_or_else(|| Self::Unknown {
            kind: kind.to_string(),
            data,
        })
    }

    /// Wire name.
    pub fn name(&self) -> &str {
        match self {
            Self::CartAdd(_) => ADD_TO_CART,
            Self::WishlistAdd(_) => ADD_TO_WISHLIST,
            Self::WishlistRemove(_) => REMOVE_FROM_WISHLIST,
            Self::Checkout(_) => ORDER_CHECKOUT,
            Self::Unknown { kind, .. } => kind.as_str(),
        }
    }

    /// Payload as JSON.
    pub fn data(&self) -> Value {
        let value = match self {
            Self::CartAdd(payload) => serde_json::to_value(payload),
            Self::WishlistAdd(payload) | Self::WishlistRemove(payload) => {
                serde_json::to_value(payload)
            }
            Self::Checkout(payload) => serde_json::to_value(payload),
            Self::Unknown { data, .. } => return data.clone(),
        };
        value.unwrap_or(Value::Null)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown { .. })
    }
}

/// An action waiting to be replayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawAction", into = "RawAction")]
pub struct QueuedAction {
    pub id: ActionId,
    pub kind: ActionKind,
    /// When the action was recorded (Unix millis).
    pub timestamp: u64,
    /// Failed replay attempts so far.
    pub attempts: u32,
}

impl QueuedAction {
    pub fn new(id: ActionId, kind: ActionKind, timestamp: u64) -> Self {
        Self {
            id,
            kind,
            timestamp,
            attempts: 0,
        }
    }
}

/// Persisted shape: `{id, type, data, timestamp, attempts}`.
#[derive(Serialize, Deserialize)]
struct RawAction {
    id: ActionId,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    timestamp: u64,
    #[serde(default)]
    attempts: u32,
}

impl From<RawAction> for QueuedAction {
    fn from(raw: RawAction) -> Self {
        Self {
            id: raw.id,
            kind: ActionKind::from_parts(&raw.kind, raw.data),
            timestamp: raw.timestamp,
            attempts: raw.attempts,
        }
    }
}

impl From<QueuedAction> for RawAction {
    fn from(action: QueuedAction) -> Self {
        Self {
            data: action.kind.data(),
            kind: action.kind.name().to_string(),
            id: action.id,
            timestamp: action.timestamp,
            attempts: action.attempts,
        }
    }
}
