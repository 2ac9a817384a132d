use async_trait::async_trait;

use crate::Result;
use crate::types::{ProductId, SalesChannelId};

#[async_trait]
pub trait SalesChannelService: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the sales channel does not exist.
    async fn add_products(&self, channel: &SalesChannelId, products: &[ProductId]) -> Result<()>;

    /// # Errors
    ///
    /// Returns an error if the sales channel does not exist.
    async fn remove_products(&self, channel: &SalesChannelId, products: &[ProductId])
    -> Result<()>;

    /// # Errors
    ///
    /// Returns an error if the sales channel does not exist.
    async fn list_products(&self, channel: &SalesChannelId) -> Result<Vec<ProductId>>;
}
