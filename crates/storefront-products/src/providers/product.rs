use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::lock;
use crate::traits::ProductService;
use crate::types::{Product, ProductId, ProductInput, Variant, VariantId};
use crate::{CommerceError, Result};

#[derive(Debug, Default)]
pub struct InMemoryProductService {
    products: Mutex<HashMap<ProductId, Product>>,
}

impl InMemoryProductService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn set_deleted(&self, ids: &[ProductId], deleted: bool) -> Result<()> {
        let mut products = lock(&self.products);
        if let Some(missing) = ids.iter().find(|id| !products.contains_key(*id)) {
            return Err(CommerceError::ProductNotFound(missing.clone()));
        }
        for id in ids {
            if let Some(product) = products.get_mut(id) {
                product.deleted = deleted;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ProductService for InMemoryProductService {
    async fn create(&self, inputs: &[ProductInput]) -> Result<Vec<Product>> {
        let mut products = lock(&self.products);
        let mut handles: HashSet<String> = products
            .values()
            .filter(|product| !product.deleted)
            .map(|product| product.handle.clone())
            .collect();

        let mut created = Vec::with_capacity(inputs.len());
        for input in inputs {
            let handle = input.resolved_handle();
            if !handles.insert(handle.clone()) {
                return Err(CommerceError::DuplicateHandle(handle));
            }
            created.push(Product {
                id: ProductId::generate(),
                title: input.title.clone(),
                handle,
                subtitle: input.subtitle.clone(),
                tags: input.tags.clone(),
                options: input.options.clone(),
                variants: input
                    .variants
                    .iter()
                    .map(|variant| Variant {
                        id: VariantId::generate(),
                        title: variant.title.clone(),
                        sku: variant.sku.clone(),
                        manage_inventory: variant.manage_inventory,
                    })
                    .collect(),
                deleted: false,
            });
        }

        for product in &created {
            products.insert(product.id.clone(), product.clone());
        }
        Ok(created)
    }

    async fn soft_delete(&self, ids: &[ProductId]) -> Result<()> {
        self.set_deleted(ids, true)
    }

    async fn restore(&self, ids: &[ProductId]) -> Result<()> {
        self.set_deleted(ids, false)
    }

    async fn list(&self, ids: &[ProductId], with_deleted: bool) -> Result<Vec<Product>> {
        let products = lock(&self.products);
        Ok(ids
            .iter()
            .filter_map(|id| products.get(id))
            .filter(|product| with_deleted || !product.deleted)
            .cloned()
            .collect())
    }
}
