mod check;
mod run;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Subcommand;
use storefront_orchestrator::{Workflow, WorkflowDefinition, load_manifest};
use storefront_products::{CommerceServices, UnitOfWork, registry};
use tracing::debug;

use crate::error::Result;

const DEFAULT_SALES_CHANNEL: &str = "sc_default";

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Validate a workflow manifest against the product actions
    Check {
        /// Path to the workflow manifest (TOML)
        manifest: PathBuf,
    },
    /// Run a workflow against in-memory services
    Run {
        /// Path to the workflow manifest (TOML)
        manifest: PathBuf,

        /// Workflow input as JSON, or @path to a JSON file
        #[arg(long)]
        input: String,

        /// Exit with the step error instead of reporting a reverted run
        #[arg(long)]
        throw_on_error: bool,

        /// Sales channels known to the in-memory services
        #[arg(long = "sales-channel", default_value = DEFAULT_SALES_CHANNEL)]
        sales_channels: Vec<String>,
    },
}

impl Commands {
    pub(crate) async fn execute(self) -> Result<()> {
        match self {
            Self::Check { manifest } => check::run(&manifest),
            Self::Run {
                manifest,
                input,
                throw_on_error,
                sales_channels,
            } => run::run(&manifest, &input, throw_on_error, sales_channels).await,
        }
    }
}

/// Load a manifest and compile it against the product action registry.
fn compile_manifest(
    path: &Path,
    services: CommerceServices,
) -> Result<Workflow<CommerceServices, UnitOfWork>> {
    let manifest = load_manifest(path)?;
    debug!(
        manifest = %path.display(),
        workflow = %manifest.workflow.name,
        steps = manifest.workflow.steps.len(),
        "loaded workflow manifest"
    );

    let definition = WorkflowDefinition::from_manifest(&manifest, &registry()?)?;
    Ok(definition.compile(Arc::new(services))?)
}
