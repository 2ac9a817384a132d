use std::path::Path;

use serde::Deserialize;

use crate::config::OrchestratorConfig;
use crate::error::ManifestError;

/// A workflow declared in TOML, with steps naming registered actions.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowManifest {
    pub workflow: WorkflowSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct WorkflowSection {
    pub name: String,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub steps: Vec<StepEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct StepEntry {
    pub name: String,
    /// Registered action providing the handlers. Defaults to `name`.
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub no_compensation: bool,
}

impl StepEntry {
    #[must_use]
    pub fn action(&self) -> &str {
        self.action.as_deref().unwrap_or(&self.name)
    }
}

/// Parse a workflow manifest from TOML text.
///
/// # Errors
///
/// Returns `ManifestError::Parse` if the text is not a valid manifest.
pub fn parse_manifest(contents: &str) -> Result<WorkflowManifest, ManifestError> {
    Ok(toml::from_str(contents)?)
}

/// Read and parse a workflow manifest file.
///
/// # Errors
///
/// Returns `ManifestError::Read` if the file cannot be read, or
/// `ManifestError::Parse` if it is not a valid manifest.
pub fn load_manifest(path: &Path) -> Result<WorkflowManifest, ManifestError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_manifest(&contents)
}
