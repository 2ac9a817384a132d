use storefront_orchestrator::{
    ActionRegistry, DefinitionError, Handlers, StepDefinition, WorkflowDefinition,
};

use crate::container::CommerceServices;
use crate::steps::{AttachInventoryItems, AttachSalesChannels, CreateProducts, UpsertVariantPrices};
use crate::unit_of_work::UnitOfWork;

pub const WORKFLOW_NAME: &str = "create-products";

/// Name the created products are exposed under to dependent steps.
pub const PRODUCTS_ALIAS: &str = "products";

/// Action names of the create-products workflow.
pub struct CreateProductsActions;

impl CreateProductsActions {
    pub const CREATE_PRODUCTS: &'static str = "create_products";
    pub const ATTACH_SALES_CHANNELS: &'static str = "attach_sales_channels";
    pub const UPSERT_VARIANT_PRICES: &'static str = "upsert_variant_prices";
    pub const ATTACH_INVENTORY_ITEMS: &'static str = "attach_inventory_items";
}

pub type ProductWorkflowDefinition = WorkflowDefinition<CommerceServices, UnitOfWork>;

fn actions() -> [(&'static str, Handlers<CommerceServices, UnitOfWork>); 4] {
    [
        (
            CreateProductsActions::CREATE_PRODUCTS,
            Handlers::from_step(CreateProducts),
        ),
        (
            CreateProductsActions::ATTACH_SALES_CHANNELS,
            Handlers::from_step(AttachSalesChannels),
        ),
        (
            CreateProductsActions::UPSERT_VARIANT_PRICES,
            Handlers::from_step(UpsertVariantPrices),
        ),
        (
            CreateProductsActions::ATTACH_INVENTORY_ITEMS,
            Handlers::from_step(AttachInventoryItems),
        ),
    ]
}

/// The create-products workflow.
///
/// `create_products` runs first and exposes its output as `products`; the
/// sales channel, price and inventory steps then run concurrently. The
/// run's result is the list of created products.
#[must_use]
pub fn create_products_workflow() -> ProductWorkflowDefinition {
    let mut definition =
        WorkflowDefinition::new(WORKFLOW_NAME).output(CreateProductsActions::CREATE_PRODUCTS);

    for (action, handlers) in actions() {
        let step = StepDefinition::new(action, handlers);
        let step = if action == CreateProductsActions::CREATE_PRODUCTS {
            step.alias(PRODUCTS_ALIAS)
        } else {
            step.depends_on([PRODUCTS_ALIAS])
        };
        definition = definition.step(step);
    }
    definition
}

/// Every create-products action, for manifest-defined workflows.
///
/// # Errors
///
/// Returns `DefinitionError::DuplicateAction` if an action name is repeated.
pub fn registry() -> Result<ActionRegistry<CommerceServices, UnitOfWork>, DefinitionError> {
    let mut registry = ActionRegistry::new();
    for (action, handlers) in actions() {
        registry.register(action, handlers)?;
    }
    Ok(registry)
}
