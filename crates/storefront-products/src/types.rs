use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// A fresh identifier with the entity's prefix.
            #[must_use]
            pub fn generate() -> Self {
                Self(format!("{}_{}", $prefix, Uuid::new_v4().simple()))
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_type!(ProductId, "prod");
id_type!(VariantId, "variant");
id_type!(SalesChannelId, "sc");
id_type!(PriceSetId, "pset");
id_type!(PriceId, "price");
id_type!(InventoryItemId, "iitem");

/// Input of the create-products workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateProductsInput {
    pub products: Vec<ProductInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInput {
    pub title: String,
    /// URL handle. Derived from the title when absent.
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub sales_channels: Vec<SalesChannelId>,
    #[serde(default)]
    pub variants: Vec<VariantInput>,
}

impl ProductInput {
    /// The handle the product will be stored under.
    #[must_use]
    pub fn resolved_handle(&self) -> String {
        self.handle
            .clone()
            .unwrap_or_else(|| handle_from_title(&self.title))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantInput {
    pub title: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default = "default_manage_inventory")]
    pub manage_inventory: bool,
    #[serde(default)]
    pub prices: Vec<PriceInput>,
}

fn default_manage_inventory() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceInput {
    pub amount: u64,
    pub currency_code: String,
    #[serde(default)]
    pub region_id: Option<String>,
    #[serde(default)]
    pub min_quantity: Option<u32>,
    #[serde(default)]
    pub max_quantity: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub handle: String,
    pub subtitle: Option<String>,
    pub tags: Vec<String>,
    pub options: Vec<String>,
    pub variants: Vec<Variant>,
    /// Set by a soft delete; deleted products are hidden from default listings.
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub title: String,
    pub sku: Option<String>,
    pub manage_inventory: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub id: PriceId,
    pub amount: u64,
    pub currency_code: String,
    pub region_id: Option<String>,
    pub min_quantity: Option<u32>,
    pub max_quantity: Option<u32>,
}

impl Price {
    #[must_use]
    pub fn from_input(input: &PriceInput) -> Self {
        Self {
            id: PriceId::generate(),
            amount: input.amount,
            currency_code: input.currency_code.to_lowercase(),
            region_id: input.region_id.clone(),
            min_quantity: input.min_quantity,
            max_quantity: input.max_quantity,
        }
    }
}

/// Prices of one variant, linked to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSet {
    pub id: PriceSetId,
    pub variant_id: VariantId,
    pub prices: Vec<Price>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: InventoryItemId,
    pub variant_id: VariantId,
    pub sku: Option<String>,
}

/// Lowercase the title and join its alphanumeric runs with `-`.
#[must_use]
pub fn handle_from_title(title: &str) -> String {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}
