mod inventory_service;
mod pricing_service;
mod product_service;
mod sales_channel_service;

pub use inventory_service::InventoryService;
pub use pricing_service::PricingService;
pub use product_service::ProductService;
pub use sales_channel_service::SalesChannelService;
