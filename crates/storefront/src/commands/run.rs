use std::path::{Path, PathBuf};

use serde_json::Value;
use storefront_orchestrator::RunOptions;
use storefront_products::{CommerceServices, UnitOfWork};
use tracing::info;

use super::compile_manifest;
use crate::error::{CliError, Result};
use crate::output::{RunReport, print_report};

pub(super) async fn run(
    manifest: &Path,
    input: &str,
    throw_on_error: bool,
    sales_channels: Vec<String>,
) -> Result<()> {
    let input = read_input(input)?;
    let workflow = compile_manifest(manifest, CommerceServices::in_memory(sales_channels))?;
    let unit = UnitOfWork::new();
    info!(unit_of_work = %unit.id(), workflow = workflow.name(), "running workflow");

    let outcome = match workflow
        .run(RunOptions::new(input, unit).throw_on_error(throw_on_error))
        .await
    {
        Ok(outcome) => outcome,
        Err(error) => {
            if let Some(transaction) = error.transaction() {
                let result = transaction
                    .output(workflow.output_step())
                    .map(|value| value.as_ref().clone());
                print_report(&RunReport::new(result, transaction))?;
            }
            return Err(error.into());
        }
    };

    print_report(&RunReport::new(outcome.result.clone(), &outcome.transaction))?;

    if outcome.is_successful() {
        Ok(())
    } else {
        Err(CliError::Unsuccessful(outcome.transaction.state()))
    }
}

/// Inline JSON, or `@path` naming a JSON file.
fn read_input(input: &str) -> Result<Value> {
    let text = match input.strip_prefix('@') {
        Some(path) => {
            let path = PathBuf::from(path);
            std::fs::read_to_string(&path).map_err(|source| CliError::InputRead { path, source })?
        }
        None => input.to_string(),
    };
    serde_json::from_str(&text).map_err(CliError::InvalidInput)
}
