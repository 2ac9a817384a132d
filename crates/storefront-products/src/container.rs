use std::fmt;
use std::sync::Arc;

use crate::providers::{
    InMemoryInventoryService, InMemoryPricingService, InMemoryProductService,
    InMemorySalesChannelService,
};
use crate::traits::{InventoryService, PricingService, ProductService, SalesChannelService};
use crate::types::SalesChannelId;

/// Services the create-products steps resolve, handed to `compile`.
#[derive(Clone)]
pub struct CommerceServices {
    products: Arc<dyn ProductService>,
    sales_channels: Arc<dyn SalesChannelService>,
    pricing: Arc<dyn PricingService>,
    inventory: Arc<dyn InventoryService>,
}

impl CommerceServices {
    pub fn new(
        products: Arc<dyn ProductService>,
        sales_channels: Arc<dyn SalesChannelService>,
        pricing: Arc<dyn PricingService>,
        inventory: Arc<dyn InventoryService>,
    ) -> Self {
        Self {
            products,
            sales_channels,
            pricing,
            inventory,
        }
    }

    /// Fresh in-memory services knowing the given sales channels.
    pub fn in_memory<I, S>(sales_channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SalesChannelId>,
    {
        Self::new(
            Arc::new(InMemoryProductService::new()),
            Arc::new(InMemorySalesChannelService::with_channels(sales_channels)),
            Arc::new(InMemoryPricingService::new()),
            Arc::new(InMemoryInventoryService::new()),
        )
    }

    #[must_use]
    pub fn products(&self) -> &dyn ProductService {
        self.products.as_ref()
    }

    #[must_use]
    pub fn sales_channels(&self) -> &dyn SalesChannelService {
        self.sales_channels.as_ref()
    }

    #[must_use]
    pub fn pricing(&self) -> &dyn PricingService {
        self.pricing.as_ref()
    }

    #[must_use]
    pub fn inventory(&self) -> &dyn InventoryService {
        self.inventory.as_ref()
    }
}

impl fmt::Debug for CommerceServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommerceServices").finish_non_exhaustive()
    }
}
