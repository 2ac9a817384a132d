use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::lock;
use crate::traits::SalesChannelService;
use crate::types::{ProductId, SalesChannelId};
use crate::{CommerceError, Result};

#[derive(Debug, Default)]
pub struct InMemorySalesChannelService {
    channels: Mutex<BTreeMap<SalesChannelId, Vec<ProductId>>>,
}

impl InMemorySalesChannelService {
    /// A service knowing the given sales channels, all empty.
    pub fn with_channels<I, S>(channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SalesChannelId>,
    {
        Self {
            channels: Mutex::new(
                channels
                    .into_iter()
                    .map(|channel| (channel.into(), Vec::new()))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl SalesChannelService for InMemorySalesChannelService {
    async fn add_products(&self, channel: &SalesChannelId, products: &[ProductId]) -> Result<()> {
        let mut channels = lock(&self.channels);
        let attached = channels
            .get_mut(channel)
            .ok_or_else(|| CommerceError::SalesChannelNotFound(channel.clone()))?;
        for product in products {
            if !attached.contains(product) {
                attached.push(product.clone());
            }
        }
        Ok(())
    }

    async fn remove_products(
        &self,
        channel: &SalesChannelId,
        products: &[ProductId],
    ) -> Result<()> {
        let mut channels = lock(&self.channels);
        let attached = channels
            .get_mut(channel)
            .ok_or_else(|| CommerceError::SalesChannelNotFound(channel.clone()))?;
        attached.retain(|product| !products.contains(product));
        Ok(())
    }

    async fn list_products(&self, channel: &SalesChannelId) -> Result<Vec<ProductId>> {
        lock(&self.channels)
            .get(channel)
            .cloned()
            .ok_or_else(|| CommerceError::SalesChannelNotFound(channel.clone()))
    }
}
