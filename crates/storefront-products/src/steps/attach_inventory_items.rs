use async_trait::async_trait;
use serde_json::Value;
use storefront_orchestrator::{HandlerError, StepHandler};
use tracing::debug;

use super::Args;
use crate::container::CommerceServices;
use crate::types::{InventoryItem, InventoryItemId, Product, Variant};
use crate::unit_of_work::UnitOfWork;
use crate::workflow::{CreateProductsActions, PRODUCTS_ALIAS};

/// Creates an inventory item for every variant that manages inventory.
/// Compensation deletes the items.
#[derive(Debug, Default)]
pub struct AttachInventoryItems;

#[async_trait]
impl StepHandler for AttachInventoryItems {
    type Container = CommerceServices;
    type Context = UnitOfWork;

    async fn invoke(&self, args: Args) -> Result<Value, HandlerError> {
        let products: Vec<Product> = args.data.get_as(PRODUCTS_ALIAS)?;
        let managed: Vec<Variant> = products
            .into_iter()
            .flat_map(|product| product.variants)
            .filter(|variant| variant.manage_inventory)
            .collect();

        let items = args.container.inventory().create_items(&managed).await?;

        debug!(count = items.len(), "created inventory items");
        args.context.record(
            CreateProductsActions::ATTACH_INVENTORY_ITEMS,
            format!("created {} inventory item(s)", items.len()),
        );
        Ok(serde_json::to_value(&items)?)
    }

    async fn compensate(&self, args: Args) -> Result<(), HandlerError> {
        let items: Vec<InventoryItem> = args.data.invoke_output_as()?;
        let ids: Vec<InventoryItemId> = items.into_iter().map(|item| item.id).collect();
        args.container.inventory().delete_items(&ids).await?;

        args.context.record(
            CreateProductsActions::ATTACH_INVENTORY_ITEMS,
            format!("deleted {} inventory item(s)", ids.len()),
        );
        Ok(())
    }
}
