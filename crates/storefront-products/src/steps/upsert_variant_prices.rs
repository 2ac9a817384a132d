use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use storefront_orchestrator::{HandlerError, StepHandler};
use tracing::{debug, warn};

use super::Args;
use crate::CommerceError;
use crate::container::CommerceServices;
use crate::traits::PricingService;
use crate::types::{
    CreateProductsInput, PriceId, PriceInput, PriceSetId, Product, ProductInput, VariantId,
};
use crate::unit_of_work::UnitOfWork;
use crate::workflow::{CreateProductsActions, PRODUCTS_ALIAS};

/// Prices added to a price set that already existed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddedPrices {
    pub price_set: PriceSetId,
    pub prices: Vec<PriceId>,
}

/// What an upsert changed, so it can be undone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceUpsert {
    pub created: Vec<PriceSetId>,
    pub added: Vec<AddedPrices>,
}

impl PriceUpsert {
    /// Prices added to price sets that already existed.
    #[must_use]
    pub fn added_price_count(&self) -> usize {
        self.added.iter().map(|added| added.prices.len()).sum()
    }

    /// Remove the added prices, then delete the created price sets.
    ///
    /// Every removal is attempted even after a failure.
    ///
    /// # Errors
    ///
    /// Returns the first error the pricing service reported.
    pub async fn revert(&self, pricing: &dyn PricingService) -> Result<(), CommerceError> {
        let mut first_error = None;
        for added in &self.added {
            if let Err(error) = pricing.remove_prices(&added.price_set, &added.prices).await {
                first_error.get_or_insert(error);
            }
        }
        if let Err(error) = pricing.delete_price_sets(&self.created).await {
            first_error.get_or_insert(error);
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Requested prices of each created variant.
///
/// Products are matched to their input by handle and variants by position.
/// Variants without prices are skipped.
///
/// # Errors
///
/// Returns `CommerceError::VariantMismatch` if a priced input variant has no
/// created counterpart.
pub fn variant_prices(
    inputs: &[ProductInput],
    products: &[Product],
) -> Result<Vec<(VariantId, Vec<PriceInput>)>, CommerceError> {
    let inputs_by_handle: HashMap<String, &ProductInput> = inputs
        .iter()
        .map(|input| (input.resolved_handle(), input))
        .collect();

    let mut prices = Vec::new();
    for product in products {
        let Some(input) = inputs_by_handle.get(&product.handle) else {
            continue;
        };
        for (position, variant) in input.variants.iter().enumerate() {
            if variant.prices.is_empty() {
                continue;
            }
            let created = product
                .variants
                .get(position)
                .ok_or_else(|| CommerceError::VariantMismatch {
                    product: product.id.clone(),
                    position,
                })?;
            prices.push((created.id.clone(), variant.prices.clone()));
        }
    }
    Ok(prices)
}

/// Apply the requested prices, recording each change in `upsert` as it lands.
async fn upsert_prices(
    pricing: &dyn PricingService,
    requested: Vec<(VariantId, Vec<PriceInput>)>,
    upsert: &mut PriceUpsert,
) -> Result<(), CommerceError> {
    for (variant, prices) in requested {
        match pricing.price_set_for_variant(&variant).await? {
            Some(existing) => {
                let added = pricing.add_prices(&existing.id, &prices).await?;
                upsert.added.push(AddedPrices {
                    price_set: existing.id,
                    prices: added,
                });
            }
            None => {
                let created = pricing.create_price_set(&variant, &prices).await?;
                upsert.created.push(created.id);
            }
        }
    }
    Ok(())
}

/// Creates or extends the price set of every priced variant.
/// Compensation deletes created sets and removes added prices.
///
/// A failure part way through reverts the changes already made before the
/// error is returned.
#[derive(Debug, Default)]
pub struct UpsertVariantPrices;

#[async_trait]
impl StepHandler for UpsertVariantPrices {
    type Container = CommerceServices;
    type Context = UnitOfWork;

    async fn invoke(&self, args: Args) -> Result<Value, HandlerError> {
        let input: CreateProductsInput = args.data.input_as()?;
        let products: Vec<Product> = args.data.get_as(PRODUCTS_ALIAS)?;
        let requested = variant_prices(&input.products, &products)?;
        let pricing = args.container.pricing();

        let mut upsert = PriceUpsert::default();
        if let Err(error) = upsert_prices(pricing, requested, &mut upsert).await {
            if let Err(undo) = upsert.revert(pricing).await {
                warn!(error = %undo, "failed to revert partially upserted prices");
            }
            return Err(error.into());
        }

        debug!(
            created = upsert.created.len(),
            updated = upsert.added.len(),
            "upserted variant prices"
        );
        args.context.record(
            CreateProductsActions::UPSERT_VARIANT_PRICES,
            format!(
                "created {} and updated {} price set(s)",
                upsert.created.len(),
                upsert.added.len()
            ),
        );
        Ok(serde_json::to_value(&upsert)?)
    }

    async fn compensate(&self, args: Args) -> Result<(), HandlerError> {
        let upsert: PriceUpsert = args.data.invoke_output_as()?;
        upsert.revert(args.container.pricing()).await?;

        args.context.record(
            CreateProductsActions::UPSERT_VARIANT_PRICES,
            format!(
                "removed {} price(s) from {} price set(s) and deleted {} price set(s)",
                upsert.added_price_count(),
                upsert.added.len(),
                upsert.created.len()
            ),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use storefront_orchestrator::{StepArgs, StepData};

    use super::*;
    use crate::providers::{
        InMemoryInventoryService, InMemoryPricingService, InMemoryProductService,
        InMemorySalesChannelService,
    };
    use crate::types::{PriceSet, Variant, VariantInput};

    fn usd(amount: u64) -> PriceInput {
        PriceInput {
            amount,
            currency_code: "usd".to_string(),
            region_id: None,
            min_quantity: None,
            max_quantity: None,
        }
    }

    fn variant_input(title: &str, prices: Vec<PriceInput>) -> VariantInput {
        VariantInput {
            title: title.to_string(),
            sku: None,
            manage_inventory: true,
            prices,
        }
    }

    fn variant(id: &str) -> Variant {
        Variant {
            id: VariantId::from(id),
            title: id.to_string(),
            sku: None,
            manage_inventory: true,
        }
    }

    fn mug(variants: Vec<VariantInput>) -> ProductInput {
        ProductInput {
            title: "Mug".to_string(),
            handle: None,
            subtitle: None,
            tags: Vec::new(),
            options: Vec::new(),
            sales_channels: Vec::new(),
            variants,
        }
    }

    fn created_mug(variants: Vec<Variant>) -> Product {
        Product {
            id: "prod_mug".into(),
            title: "Mug".to_string(),
            handle: "mug".to_string(),
            subtitle: None,
            tags: Vec::new(),
            options: Vec::new(),
            variants,
            deleted: false,
        }
    }

    #[test]
    fn matches_prices_to_created_variants() {
        let inputs = [mug(vec![
            variant_input("Small", vec![usd(100)]),
            variant_input("Large", Vec::new()),
            variant_input("Huge", vec![usd(300), usd(250)]),
        ])];
        let products = [created_mug(vec![
            variant("variant_s"),
            variant("variant_l"),
            variant("variant_h"),
        ])];

        let prices = variant_prices(&inputs, &products).expect("variants match");

        assert_eq!(
            prices,
            vec![
                (VariantId::from("variant_s"), vec![usd(100)]),
                (VariantId::from("variant_h"), vec![usd(300), usd(250)]),
            ]
        );
    }

    #[test]
    fn missing_variant_is_reported() {
        let inputs = [mug(vec![variant_input("Small", vec![usd(100)])])];
        let products = [created_mug(Vec::new())];

        let result = variant_prices(&inputs, &products);

        assert!(matches!(
            result,
            Err(CommerceError::VariantMismatch { position: 0, .. })
        ));
    }

    /// Pricing that refuses to create a price set for one variant.
    struct UnavailableFor {
        inner: Arc<InMemoryPricingService>,
        variant: VariantId,
    }

    #[async_trait]
    impl PricingService for UnavailableFor {
        async fn price_set_for_variant(
            &self,
            variant: &VariantId,
        ) -> crate::Result<Option<PriceSet>> {
            self.inner.price_set_for_variant(variant).await
        }

        async fn create_price_set(
            &self,
            variant: &VariantId,
            prices: &[PriceInput],
        ) -> crate::Result<PriceSet> {
            if variant == &self.variant {
                return Err(CommerceError::PriceSetNotFound(PriceSetId::from("pset_unavailable")));
            }
            self.inner.create_price_set(variant, prices).await
        }

        async fn add_prices(
            &self,
            price_set: &PriceSetId,
            prices: &[PriceInput],
        ) -> crate::Result<Vec<PriceId>> {
            self.inner.add_prices(price_set, prices).await
        }

        async fn remove_prices(
            &self,
            price_set: &PriceSetId,
            prices: &[PriceId],
        ) -> crate::Result<()> {
            self.inner.remove_prices(price_set, prices).await
        }

        async fn delete_price_sets(&self, ids: &[PriceSetId]) -> crate::Result<()> {
            self.inner.delete_price_sets(ids).await
        }
    }

    fn services(pricing: Arc<dyn PricingService>) -> CommerceServices {
        CommerceServices::new(
            Arc::new(InMemoryProductService::new()),
            Arc::new(InMemorySalesChannelService::default()),
            pricing,
            Arc::new(InMemoryInventoryService::new()),
        )
    }

    fn step_args(services: CommerceServices, data: StepData) -> (Args, Arc<UnitOfWork>) {
        let unit = Arc::new(UnitOfWork::new());
        let args = StepArgs {
            container: Arc::new(services),
            context: Arc::clone(&unit),
            data,
        };
        (args, unit)
    }

    #[tokio::test]
    async fn failed_invoke_reverts_price_sets_it_created() -> anyhow::Result<()> {
        let inner = Arc::new(InMemoryPricingService::new());
        let pricing = Arc::new(UnavailableFor {
            inner: Arc::clone(&inner),
            variant: VariantId::from("variant_l"),
        });
        let input = CreateProductsInput {
            products: vec![mug(vec![
                variant_input("Small", vec![usd(100)]),
                variant_input("Large", vec![usd(200)]),
            ])],
        };
        let products = vec![created_mug(vec![variant("variant_s"), variant("variant_l")])];
        let data = StepData::new(serde_json::to_value(&input)?)
            .with_dependency(PRODUCTS_ALIAS, serde_json::to_value(&products)?);
        let (args, unit) = step_args(services(pricing), data);

        let result = UpsertVariantPrices.invoke(args).await;

        assert_eq!(
            result.err().map(|error| error.message().to_string()),
            Some("price set 'pset_unavailable' not found".to_string())
        );
        assert!(
            inner
                .price_set_for_variant(&VariantId::from("variant_s"))
                .await?
                .is_none()
        );
        assert!(unit.entries().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn revert_continues_after_a_failed_removal() -> anyhow::Result<()> {
        let pricing = InMemoryPricingService::new();
        let created = pricing
            .create_price_set(&VariantId::from("variant_s"), &[usd(100)])
            .await?;
        let upsert = PriceUpsert {
            created: vec![created.id],
            added: vec![AddedPrices {
                price_set: PriceSetId::from("pset_gone"),
                prices: vec![PriceId::from("price_1")],
            }],
        };

        let result = upsert.revert(&pricing).await;

        assert!(matches!(result, Err(CommerceError::PriceSetNotFound(_))));
        assert!(
            pricing
                .price_set_for_variant(&VariantId::from("variant_s"))
                .await?
                .is_none()
        );
        Ok(())
    }

    #[tokio::test]
    async fn compensation_journal_counts_removed_prices() -> anyhow::Result<()> {
        let pricing = Arc::new(InMemoryPricingService::new());
        let existing = pricing
            .create_price_set(&VariantId::from("variant_s"), &[usd(100)])
            .await?;
        let added = pricing
            .add_prices(&existing.id, &[usd(200), usd(300)])
            .await?;
        let created = pricing
            .create_price_set(&VariantId::from("variant_l"), &[usd(400)])
            .await?;
        let upsert = PriceUpsert {
            created: vec![created.id],
            added: vec![AddedPrices {
                price_set: existing.id.clone(),
                prices: added,
            }],
        };
        let data = StepData::new(json!(null)).with_invoke_output(serde_json::to_value(&upsert)?);
        let (args, unit) = step_args(services(pricing.clone()), data);

        UpsertVariantPrices.compensate(args).await?;

        let entries = unit.entries();
        assert_eq!(
            entries.last().map(|entry| entry.effect.as_str()),
            Some("removed 2 price(s) from 1 price set(s) and deleted 1 price set(s)")
        );
        let remaining = pricing
            .price_set_for_variant(&VariantId::from("variant_s"))
            .await?
            .expect("existing price set is kept");
        assert_eq!(remaining.prices.len(), 1);
        assert!(
            pricing
                .price_set_for_variant(&VariantId::from("variant_l"))
                .await?
                .is_none()
        );
        Ok(())
    }
}
