//! Step handlers of the create-products workflow.

mod attach_inventory_items;
mod attach_sales_channels;
mod create_products;
mod upsert_variant_prices;

use storefront_orchestrator::StepArgs;

use crate::container::CommerceServices;
use crate::unit_of_work::UnitOfWork;

pub use attach_inventory_items::AttachInventoryItems;
pub use attach_sales_channels::{AttachSalesChannels, group_products_by_sales_channel};
pub use create_products::CreateProducts;
pub use upsert_variant_prices::{AddedPrices, PriceUpsert, UpsertVariantPrices, variant_prices};

type Args = StepArgs<CommerceServices, UnitOfWork>;
