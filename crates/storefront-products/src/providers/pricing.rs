use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::lock;
use crate::traits::PricingService;
use crate::types::{Price, PriceId, PriceInput, PriceSet, PriceSetId, VariantId};
use crate::{CommerceError, Result};

#[derive(Debug, Default)]
pub struct InMemoryPricingService {
    price_sets: Mutex<HashMap<PriceSetId, PriceSet>>,
}

impl InMemoryPricingService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PricingService for InMemoryPricingService {
    async fn price_set_for_variant(&self, variant: &VariantId) -> Result<Option<PriceSet>> {
        Ok(lock(&self.price_sets)
            .values()
            .find(|price_set| &price_set.variant_id == variant)
            .cloned())
    }

    async fn create_price_set(
        &self,
        variant: &VariantId,
        prices: &[PriceInput],
    ) -> Result<PriceSet> {
        let price_set = PriceSet {
            id: PriceSetId::generate(),
            variant_id: variant.clone(),
            prices: prices.iter().map(Price::from_input).collect(),
        };
        lock(&self.price_sets).insert(price_set.id.clone(), price_set.clone());
        Ok(price_set)
    }

    async fn add_prices(
        &self,
        price_set: &PriceSetId,
        prices: &[PriceInput],
    ) -> Result<Vec<PriceId>> {
        let mut price_sets = lock(&self.price_sets);
        let existing = price_sets
            .get_mut(price_set)
            .ok_or_else(|| CommerceError::PriceSetNotFound(price_set.clone()))?;

        let added: Vec<Price> = prices.iter().map(Price::from_input).collect();
        let ids = added.iter().map(|price| price.id.clone()).collect();
        existing.prices.extend(added);
        Ok(ids)
    }

    async fn remove_prices(&self, price_set: &PriceSetId, prices: &[PriceId]) -> Result<()> {
        let mut price_sets = lock(&self.price_sets);
        let existing = price_sets
            .get_mut(price_set)
            .ok_or_else(|| CommerceError::PriceSetNotFound(price_set.clone()))?;
        existing.prices.retain(|price| !prices.contains(&price.id));
        Ok(())
    }

    async fn delete_price_sets(&self, ids: &[PriceSetId]) -> Result<()> {
        let mut price_sets = lock(&self.price_sets);
        if let Some(missing) = ids.iter().find(|id| !price_sets.contains_key(*id)) {
            return Err(CommerceError::PriceSetNotFound(missing.clone()));
        }
        for id in ids {
            price_sets.remove(id);
        }
        Ok(())
    }
}
