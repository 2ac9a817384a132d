use async_trait::async_trait;
use serde_json::Value;
use storefront_orchestrator::{HandlerError, StepHandler};
use tracing::debug;

use super::Args;
use crate::container::CommerceServices;
use crate::types::{CreateProductsInput, Product, ProductId};
use crate::unit_of_work::UnitOfWork;
use crate::workflow::CreateProductsActions;

/// Creates the products of the input. Compensation soft-deletes them.
#[derive(Debug, Default)]
pub struct CreateProducts;

#[async_trait]
impl StepHandler for CreateProducts {
    type Container = CommerceServices;
    type Context = UnitOfWork;

    async fn invoke(&self, args: Args) -> Result<Value, HandlerError> {
        let input: CreateProductsInput = args.data.input_as()?;
        let products = args.container.products().create(&input.products).await?;

        debug!(count = products.len(), "created products");
        args.context.record(
            CreateProductsActions::CREATE_PRODUCTS,
            format!("created {} product(s)", products.len()),
        );
        Ok(serde_json::to_value(&products)?)
    }

    async fn compensate(&self, args: Args) -> Result<(), HandlerError> {
        let products: Vec<Product> = args.data.invoke_output_as()?;
        let ids: Vec<ProductId> = products.into_iter().map(|product| product.id).collect();
        args.container.products().soft_delete(&ids).await?;

        debug!(count = ids.len(), "soft-deleted products");
        args.context.record(
            CreateProductsActions::CREATE_PRODUCTS,
            format!("soft-deleted {} product(s)", ids.len()),
        );
        Ok(())
    }
}
