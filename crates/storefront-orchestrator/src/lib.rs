//! Workflow orchestration with compensation.
//!
//! A workflow is a set of named steps wired into a dependency graph. Each
//! step has an async invoke handler and an optional compensate handler.
//! Running a compiled [`Workflow`] opens a [`Transaction`]: steps start as
//! soon as their dependencies have produced output, independent steps run
//! concurrently, and if any invoke fails the steps that completed are
//! compensated one at a time in reverse completion order.
//!
//! Definitions are built in code with [`WorkflowDefinition`] or loaded from
//! a TOML [`WorkflowManifest`] whose steps name actions in an
//! [`ActionRegistry`].

mod config;
mod definition;
mod error;
mod graph;
mod handler;
mod log;
mod manifest;
mod orchestrator;
mod registry;
mod step;
mod transaction;
mod workflow;

pub use config::OrchestratorConfig;
pub use definition::WorkflowDefinition;
pub use error::{DefinitionError, HandlerError, ManifestError, RunError};
pub use handler::{CompensateFuture, Handlers, InvokeFuture, StepArgs, StepData, StepHandler};
pub use log::{ExecutionLog, ExecutionStatus, StepExecution};
pub use manifest::{StepEntry, WorkflowManifest, WorkflowSection, load_manifest, parse_manifest};
pub use registry::ActionRegistry;
pub use step::{ActionOptions, StepDefinition};
pub use transaction::{
    CallSnapshot, ErrorSnapshot, HandlerType, Transaction, TransactionError, TransactionSnapshot,
    TransactionState,
};
pub use workflow::{RunOptions, RunOutcome, Workflow};
