use async_trait::async_trait;

use crate::Result;
use crate::types::{PriceId, PriceInput, PriceSet, PriceSetId, VariantId};

#[async_trait]
pub trait PricingService: Send + Sync {
    /// The price set linked to a variant, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    async fn price_set_for_variant(&self, variant: &VariantId) -> Result<Option<PriceSet>>;

    /// Create a price set and link it to `variant`.
    ///
    /// # Errors
    ///
    /// Returns an error if the price set cannot be stored.
    async fn create_price_set(&self, variant: &VariantId, prices: &[PriceInput])
    -> Result<PriceSet>;

    /// # Errors
    ///
    /// Returns an error if the price set does not exist.
    async fn add_prices(&self, price_set: &PriceSetId, prices: &[PriceInput])
    -> Result<Vec<PriceId>>;

    /// # Errors
    ///
    /// Returns an error if the price set does not exist.
    async fn remove_prices(&self, price_set: &PriceSetId, prices: &[PriceId]) -> Result<()>;

    /// Delete price sets and their variant links.
    ///
    /// # Errors
    ///
    /// Returns an error if any price set does not exist.
    async fn delete_price_sets(&self, ids: &[PriceSetId]) -> Result<()>;
}
