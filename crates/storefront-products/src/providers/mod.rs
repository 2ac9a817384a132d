//! In-memory service implementations.

mod inventory;
mod pricing;
mod product;
mod sales_channel;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use inventory::InMemoryInventoryService;
pub use pricing::InMemoryPricingService;
pub use product::InMemoryProductService;
pub use sales_channel::InMemorySalesChannelService;

/// Lock a store, recovering the data of a poisoned lock.
fn lock<T>(store: &Mutex<T>) -> MutexGuard<'_, T> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}
