use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{HandlerError, RunError};
use crate::log::{ExecutionLog, ExecutionStatus};

/// Lifecycle state of a transaction.
///
/// `not_started → invoking → (done | reverting → (reverted | failed))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    NotStarted,
    Invoking,
    Reverting,
    Reverted,
    Done,
    Failed,
}

impl TransactionState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Invoking => "invoking",
            Self::Reverting => "reverting",
            Self::Reverted => "reverted",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Terminal states admit no further handler calls.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Reverted | Self::Done | Self::Failed)
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::NotStarted, Self::Invoking)
                | (Self::Invoking, Self::Done | Self::Reverting)
                | (Self::Reverting, Self::Reverted | Self::Failed)
        )
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which handler of a step was called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerType {
    Invoke,
    Compensate,
}

impl HandlerType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invoke => "invoke",
            Self::Compensate => "compensate",
        }
    }
}

impl fmt::Display for HandlerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed handler call: `{action, handler_type, error}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionError {
    pub action: String,
    pub handler_type: HandlerType,
    pub error: HandlerError,
}

impl TransactionError {
    pub fn new(action: impl Into<String>, handler_type: HandlerType, error: HandlerError) -> Self {
        Self {
            action: action.into(),
            handler_type,
            error,
        }
    }
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} failed: {}", self.action, self.handler_type, self.error)
    }
}

/// One run of a workflow.
///
/// Created by `Workflow::run`, driven to a terminal state, and handed back to
/// the caller. It is never reused.
#[derive(Debug, Clone)]
pub struct Transaction {
    id: Uuid,
    workflow: String,
    state: TransactionState,
    log: ExecutionLog,
    errors: Vec<TransactionError>,
    outputs: IndexMap<String, Arc<Value>>,
}

impl Transaction {
    pub(crate) fn new(workflow: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow: workflow.to_string(),
            state: TransactionState::NotStarted,
            log: ExecutionLog::new(),
            errors: Vec::new(),
            outputs: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn workflow_name(&self) -> &str {
        &self.workflow
    }

    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    #[must_use]
    pub fn log(&self) -> &ExecutionLog {
        &self.log
    }

    /// Every failed handler call, in the order the failures were observed.
    #[must_use]
    pub fn errors(&self) -> &[TransactionError] {
        &self.errors
    }

    /// The recorded output of a successfully invoked step.
    #[must_use]
    pub fn output(&self, step: &str) -> Option<&Arc<Value>> {
        self.outputs.get(step)
    }

    /// Steps that invoked successfully, in completion order.
    pub fn completed_steps(&self) -> impl Iterator<Item = &str> {
        self.outputs.keys().map(String::as_str)
    }

    /// `done` with no errors is the only fully successful outcome.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.state == TransactionState::Done && self.errors.is_empty()
    }

    pub(crate) fn transition(&mut self, next: TransactionState) -> Result<(), RunError> {
        if !self.state.can_transition_to(next) {
            return Err(RunError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    pub(crate) fn log_mut(&mut self) -> &mut ExecutionLog {
        &mut self.log
    }

    /// Outputs are recorded once and never replaced.
    pub(crate) fn record_output(&mut self, step: &str, output: Arc<Value>) {
        self.outputs.entry(step.to_string()).or_insert(output);
    }

    pub(crate) fn record_error(&mut self, error: TransactionError) {
        self.errors.push(error);
    }

    /// Serializable view of the transaction for archiving or display.
    #[must_use]
    pub fn snapshot(&self) -> TransactionSnapshot {
        TransactionSnapshot {
            id: self.id,
            workflow: self.workflow.clone(),
            state: self.state,
            errors: self
                .errors
                .iter()
                .map(|error| ErrorSnapshot {
                    action: error.action.clone(),
                    handler_type: error.handler_type,
                    message: error.error.to_string(),
                })
                .collect(),
            calls: self
                .log
                .entries()
                .iter()
                .map(|record| CallSnapshot {
                    action: record.action.clone(),
                    handler_type: record.handler_type,
                    status: record.status,
                    duration_ms: record.finished_at.map(|finished| {
                        u64::try_from(finished.duration_since(record.started_at).as_millis())
                            .unwrap_or(u64::MAX)
                    }),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionSnapshot {
    pub id: Uuid,
    pub workflow: String,
    pub state: TransactionState,
    pub errors: Vec<ErrorSnapshot>,
    pub calls: Vec<CallSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorSnapshot {
    pub action: String,
    pub handler_type: HandlerType,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallSnapshot {
    pub action: String,
    pub handler_type: HandlerType,
    pub status: ExecutionStatus,
    pub duration_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn new_transaction_is_not_started() {
        let transaction = Transaction::new("create-products");

        assert_eq!(transaction.state(), TransactionState::NotStarted);
        assert_eq!(transaction.workflow_name(), "create-products");
        assert!(transaction.errors().is_empty());
        assert!(!transaction.is_successful());
    }

    #[test]
    fn transitions_follow_the_state_machine() {
        let mut transaction = Transaction::new("wf");

        transaction
            .transition(TransactionState::Invoking)
            .expect("start");
        transaction
            .transition(TransactionState::Reverting)
            .expect("revert");
        transaction
            .transition(TransactionState::Reverted)
            .expect("reverted");

        assert_eq!(transaction.state(), TransactionState::Reverted);
    }

    #[test]
    fn terminal_states_reject_transitions() {
        let mut transaction = Transaction::new("wf");
        transaction
            .transition(TransactionState::Invoking)
            .expect("start");
        transaction.transition(TransactionState::Done).expect("done");

        let err = transaction
            .transition(TransactionState::Reverting)
            .expect_err("done is terminal");

        assert!(matches!(
            err,
            RunError::InvalidTransition {
                from: TransactionState::Done,
                to: TransactionState::Reverting
            }
        ));
        assert!(TransactionState::Done.is_terminal());
    }

    #[test]
    fn cannot_skip_invoking() {
        assert!(!TransactionState::NotStarted.can_transition_to(TransactionState::Done));
        assert!(!TransactionState::Invoking.can_transition_to(TransactionState::Reverted));
    }

    #[test]
    fn recorded_output_is_never_replaced() {
        let mut transaction = Transaction::new("wf");
        transaction.record_output("create", Arc::new(json!(1)));
        transaction.record_output("create", Arc::new(json!(2)));

        assert_eq!(transaction.output("create").map(AsRef::as_ref), Some(&json!(1)));
    }

    #[test]
    fn states_serialize_in_snake_case() {
        let json = serde_json::to_string(&TransactionState::NotStarted).expect("serialize");

        assert_eq!(json, "\"not_started\"");
        assert_eq!(TransactionState::Reverted.to_string(), "reverted");
    }

    #[test]
    fn snapshot_carries_errors() {
        let mut transaction = Transaction::new("wf");
        transaction.record_error(TransactionError::new(
            "fail_step",
            HandlerType::Invoke,
            HandlerError::new("boom"),
        ));

        let snapshot = transaction.snapshot();

        assert_eq!(snapshot.errors.len(), 1);
        assert_eq!(snapshot.errors[0].action, "fail_step");
        assert_eq!(snapshot.errors[0].message, "boom");
    }
}
