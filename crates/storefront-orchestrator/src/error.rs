use std::fmt::{self, Debug};
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::transaction::{Transaction, TransactionError, TransactionState};

/// Failure reported by an invoke or compensate handler.
///
/// Handler errors are cloneable so that the same failure can be stored in the
/// transaction's error list, its execution log, and a raised [`RunError`].
#[derive(Clone, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
    #[source]
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl HandlerError {
    /// Create a handler error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create a handler error that wraps an underlying error.
    ///
    /// The message is the underlying error's display output.
    pub fn from_source<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: error.to_string(),
            source: Some(Arc::new(error)),
        }
    }

    /// Create a handler error with its own message and an underlying cause.
    pub fn with_source<E>(message: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            source: Some(Arc::new(error)),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerError")
            .field("message", &self.message)
            .field("source", &self.source.as_ref().map(ToString::to_string))
            .finish()
    }
}

/// Two handler errors are equal when their messages are equal.
impl PartialEq for HandlerError {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
    }
}

impl Eq for HandlerError {}

impl From<serde_json::Error> for HandlerError {
    fn from(error: serde_json::Error) -> Self {
        Self::with_source("invalid step data", error)
    }
}

/// Error in a workflow definition, raised before any run starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DefinitionError {
    #[error("workflow '{workflow}' has no steps")]
    EmptyWorkflow { workflow: String },

    #[error("workflow '{workflow}' declares step '{step}' more than once")]
    DuplicateStep { workflow: String, step: String },

    #[error("action '{action}' is already registered")]
    DuplicateAction { action: String },

    #[error("alias '{alias}' of step '{step}' is already exposed by step '{existing}'")]
    AliasConflict {
        alias: String,
        step: String,
        existing: String,
    },

    #[error("step '{step}' depends on '{dependency}', which no step produces")]
    UnknownDependency { step: String, dependency: String },

    #[error("step '{step}' not found in workflow")]
    UnknownStep { step: String },

    #[error("output step '{step}' not found in workflow")]
    UnknownOutput { step: String },

    #[error("step '{step}' refers to unregistered action '{action}'")]
    UnknownAction { step: String, action: String },

    #[error("dependency cycle between steps: {}", .steps.join(", "))]
    Cycle { steps: Vec<String> },
}

/// Error from reading a workflow manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read workflow manifest '{path}'")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse workflow manifest")]
    Parse(#[from] toml::de::Error),

    #[error("invalid workflow definition")]
    Definition(#[from] DefinitionError),
}

/// Error raised by a run when `throw_on_error` is set, or when the
/// transaction state machine is violated.
///
/// Step failures are raised only after compensation has completed; the
/// finished transaction travels with the error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunError {
    /// A step failed and every compensation succeeded.
    #[error("step '{action}' failed")]
    StepFailed {
        /// Name of the step whose invoke failed first.
        action: String,
        #[source]
        source: HandlerError,
        /// The reverted transaction.
        transaction: Box<Transaction>,
    },

    /// A step failed and some compensations also failed.
    #[error("step '{failed_action}' failed, and {} compensation(s) also failed", .compensation_errors.len())]
    CompensationFailed {
        /// Name of the step whose invoke failed first.
        failed_action: String,
        #[source]
        step_error: HandlerError,
        /// Errors from failed compensations, in the order they ran.
        compensation_errors: Vec<TransactionError>,
        /// The reverted transaction.
        transaction: Box<Transaction>,
    },

    #[error("invalid transaction state transition from {from} to {to}")]
    InvalidTransition {
        from: TransactionState,
        to: TransactionState,
    },
}

impl RunError {
    /// The finished transaction, when the error carries one.
    #[must_use]
    pub fn transaction(&self) -> Option<&Transaction> {
        match self {
            Self::StepFailed { transaction, .. } | Self::CompensationFailed { transaction, .. } => {
                Some(transaction)
            }
            Self::InvalidTransition { .. } => None,
        }
    }
}
