use std::path::Path;

use storefront_products::CommerceServices;

use super::{DEFAULT_SALES_CHANNEL, compile_manifest};
use crate::error::Result;

pub(super) fn run(manifest: &Path) -> Result<()> {
    let workflow = compile_manifest(manifest, CommerceServices::in_memory([DEFAULT_SALES_CHANNEL]))?;

    println!("Workflow '{}' is valid.", workflow.name());
    println!("Execution order:");
    for (position, step) in workflow.execution_order().iter().enumerate() {
        println!("  {}. {step}", position + 1);
    }
    println!("Output step: {}", workflow.output_step());

    Ok(())
}
