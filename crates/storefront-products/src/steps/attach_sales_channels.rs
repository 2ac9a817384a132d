use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use storefront_orchestrator::{HandlerError, StepHandler};
use tracing::{debug, warn};

use super::Args;
use crate::CommerceError;
use crate::container::CommerceServices;
use crate::traits::SalesChannelService;
use crate::types::{CreateProductsInput, Product, ProductId, ProductInput, SalesChannelId};
use crate::unit_of_work::UnitOfWork;
use crate::workflow::{CreateProductsActions, PRODUCTS_ALIAS};

/// Product ids to attach to each sales channel.
///
/// Products are matched to their input by handle; a product whose input
/// names no sales channel is left out.
#[must_use]
pub fn group_products_by_sales_channel(
    inputs: &[ProductInput],
    products: &[Product],
) -> BTreeMap<SalesChannelId, Vec<ProductId>> {
    let channels_by_handle: HashMap<String, &[SalesChannelId]> = inputs
        .iter()
        .map(|input| (input.resolved_handle(), input.sales_channels.as_slice()))
        .collect();

    products.iter().fold(BTreeMap::new(), |mut grouped, product| {
        let channels = channels_by_handle
            .get(&product.handle)
            .copied()
            .unwrap_or_default();
        for channel in channels {
            grouped
                .entry(channel.clone())
                .or_insert_with(Vec::new)
                .push(product.id.clone());
        }
        grouped
    })
}

/// Detach products from every channel in `grouped`.
///
/// Every channel is attempted; the first error is returned.
async fn detach(
    sales_channels: &dyn SalesChannelService,
    grouped: &BTreeMap<SalesChannelId, Vec<ProductId>>,
) -> Result<(), CommerceError> {
    let results = join_all(
        grouped
            .iter()
            .map(|(channel, ids)| sales_channels.remove_products(channel, ids)),
    )
    .await;
    results.into_iter().collect()
}

/// Attaches created products to the sales channels their input names.
///
/// All channels are attempted. If any attach fails, the channels that
/// succeeded are detached again before the error is returned.
#[derive(Debug, Default)]
pub struct AttachSalesChannels;

#[async_trait]
impl StepHandler for AttachSalesChannels {
    type Container = CommerceServices;
    type Context = UnitOfWork;

    async fn invoke(&self, args: Args) -> Result<Value, HandlerError> {
        let input: CreateProductsInput = args.data.input_as()?;
        let products: Vec<Product> = args.data.get_as(PRODUCTS_ALIAS)?;
        let grouped = group_products_by_sales_channel(&input.products, &products);

        let sales_channels = args.container.sales_channels();
        let results = join_all(
            grouped
                .iter()
                .map(|(channel, ids)| sales_channels.add_products(channel, ids)),
        )
        .await;

        let mut attached = BTreeMap::new();
        let mut failure = None;
        for ((channel, ids), result) in grouped.iter().zip(results) {
            match result {
                Ok(()) => {
                    attached.insert(channel.clone(), ids.clone());
                }
                Err(error) => {
                    failure.get_or_insert(error);
                }
            }
        }

        if let Some(error) = failure {
            if let Err(undo) = detach(sales_channels, &attached).await {
                warn!(error = %undo, "failed to detach partially attached products");
            }
            return Err(error.into());
        }

        debug!(channels = grouped.len(), "attached products to sales channels");
        args.context.record(
            CreateProductsActions::ATTACH_SALES_CHANNELS,
            format!("attached products to {} sales channel(s)", grouped.len()),
        );
        Ok(serde_json::to_value(&grouped)?)
    }

    async fn compensate(&self, args: Args) -> Result<(), HandlerError> {
        let grouped: BTreeMap<SalesChannelId, Vec<ProductId>> = args.data.invoke_output_as()?;
        detach(args.container.sales_channels(), &grouped).await?;

        args.context.record(
            CreateProductsActions::ATTACH_SALES_CHANNELS,
            format!("detached products from {} sales channel(s)", grouped.len()),
        );
        Ok(())
    }
}
