use storefront_orchestrator::HandlerError;
use thiserror::Error;

use crate::types::{InventoryItemId, PriceSetId, ProductId, SalesChannelId};

#[derive(Debug, Error)]
pub enum CommerceError {
    #[error("product '{0}' not found")]
    ProductNotFound(ProductId),

    #[error("product handle '{0}' is already taken")]
    DuplicateHandle(String),

    #[error("sales channel '{0}' not found")]
    SalesChannelNotFound(SalesChannelId),

    #[error("price set '{0}' not found")]
    PriceSetNotFound(PriceSetId),

    #[error("inventory item '{0}' not found")]
    InventoryItemNotFound(InventoryItemId),

    #[error("product '{product}' has no variant at position {position}")]
    VariantMismatch { product: ProductId, position: usize },

    #[error("failed to encode step output")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CommerceError>;

impl From<CommerceError> for HandlerError {
    fn from(error: CommerceError) -> Self {
        HandlerError::from_source(error)
    }
}
