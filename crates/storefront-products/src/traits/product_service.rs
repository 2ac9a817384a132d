use async_trait::async_trait;

use crate::Result;
use crate::types::{Product, ProductId, ProductInput};

#[async_trait]
pub trait ProductService: Send + Sync {
    /// Create products with their variants, assigning ids.
    ///
    /// # Errors
    ///
    /// Returns an error if a handle is already taken.
    async fn create(&self, products: &[ProductInput]) -> Result<Vec<Product>>;

    /// # Errors
    ///
    /// Returns an error if any product does not exist.
    async fn soft_delete(&self, ids: &[ProductId]) -> Result<()>;

    /// # Errors
    ///
    /// Returns an error if any product does not exist.
    async fn restore(&self, ids: &[ProductId]) -> Result<()>;

    /// Products with the given ids. Soft-deleted ones only when `with_deleted`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    async fn list(&self, ids: &[ProductId], with_deleted: bool) -> Result<Vec<Product>>;
}
