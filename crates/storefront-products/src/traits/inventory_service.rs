use async_trait::async_trait;

use crate::Result;
use crate::types::{InventoryItem, InventoryItemId, Variant, VariantId};

#[async_trait]
pub trait InventoryService: Send + Sync {
    /// Create one inventory item per variant.
    ///
    /// # Errors
    ///
    /// Returns an error if the items cannot be stored.
    async fn create_items(&self, variants: &[Variant]) -> Result<Vec<InventoryItem>>;

    /// # Errors
    ///
    /// Returns an error if any item does not exist.
    async fn delete_items(&self, ids: &[InventoryItemId]) -> Result<()>;

    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    async fn items_for_variant(&self, variant: &VariantId) -> Result<Vec<InventoryItem>>;
}
