use std::path::PathBuf;

use storefront_orchestrator::{DefinitionError, ManifestError, RunError, TransactionState};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid workflow manifest")]
    Manifest(#[from] ManifestError),

    #[error("invalid workflow definition")]
    Definition(#[from] DefinitionError),

    #[error("workflow run failed")]
    Run(#[from] RunError),

    #[error("failed to read input file '{path}'")]
    InputRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("input is not valid JSON")]
    InvalidInput(#[source] serde_json::Error),

    #[error("failed to encode run report")]
    Report(#[source] serde_json::Error),

    #[error("workflow ended in state '{0}'")]
    Unsuccessful(TransactionState),
}

pub type Result<T> = std::result::Result<T, CliError>;
