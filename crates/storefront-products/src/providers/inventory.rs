use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::lock;
use crate::traits::InventoryService;
use crate::types::{InventoryItem, InventoryItemId, Variant, VariantId};
use crate::{CommerceError, Result};

#[derive(Debug, Default)]
pub struct InMemoryInventoryService {
    items: Mutex<HashMap<InventoryItemId, InventoryItem>>,
}

impl InMemoryInventoryService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryService for InMemoryInventoryService {
    async fn create_items(&self, variants: &[Variant]) -> Result<Vec<InventoryItem>> {
        let created: Vec<InventoryItem> = variants
            .iter()
            .map(|variant| InventoryItem {
                id: InventoryItemId::generate(),
                variant_id: variant.id.clone(),
                sku: variant.sku.clone(),
            })
            .collect();

        let mut items = lock(&self.items);
        for item in &created {
            items.insert(item.id.clone(), item.clone());
        }
        Ok(created)
    }

    async fn delete_items(&self, ids: &[InventoryItemId]) -> Result<()> {
        let mut items = lock(&self.items);
        if let Some(missing) = ids.iter().find(|id| !items.contains_key(*id)) {
            return Err(CommerceError::InventoryItemNotFound(missing.clone()));
        }
        for id in ids {
            items.remove(id);
        }
        Ok(())
    }

    async fn items_for_variant(&self, variant: &VariantId) -> Result<Vec<InventoryItem>> {
        Ok(lock(&self.items)
            .values()
            .filter(|item| &item.variant_id == variant)
            .cloned()
            .collect())
    }
}
