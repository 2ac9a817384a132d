//! The create-products workflow.
//!
//! Creates products with their variants, then attaches them to sales
//! channels, prices their variants and creates inventory items, all as one
//! orchestrated transaction: if any step fails, the completed ones are
//! undone. Services are reached through [`CommerceServices`]; in-memory
//! implementations live in [`providers`].

mod container;
mod error;
pub mod providers;
pub mod steps;
pub mod traits;
pub mod types;
mod unit_of_work;
mod workflow;

pub use container::CommerceServices;
pub use error::{CommerceError, Result};
pub use unit_of_work::{JournalEntry, UnitOfWork};
pub use workflow::{
    CreateProductsActions, PRODUCTS_ALIAS, ProductWorkflowDefinition, WORKFLOW_NAME,
    create_products_workflow, registry,
};
