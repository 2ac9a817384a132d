use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;

use crate::error::HandlerError;
use crate::transaction::HandlerType;

/// Status of a handler call in the execution log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ExecutionStatus {
    /// Handler was started and has not finished.
    Running,
    /// Handler finished successfully.
    Succeeded,
    /// Handler failed.
    Failed,
}

/// Record of one invoke or compensate call.
///
/// `started_event` and `finished_event` are positions in a single counter
/// shared by every start and finish of the transaction, so they order calls
/// totally even when the clock cannot.
#[derive(Debug, Clone)]
pub struct StepExecution {
    /// Name of the step.
    pub action: String,
    /// Which handler was called.
    pub handler_type: HandlerType,
    /// Current status.
    pub status: ExecutionStatus,
    /// When the handler was started.
    pub started_at: Instant,
    /// When the handler finished.
    pub finished_at: Option<Instant>,
    /// Event number of the start.
    pub started_event: u64,
    /// Event number of the finish.
    pub finished_event: Option<u64>,
    /// Output of a successful invoke.
    pub output: Option<Arc<Value>>,
    /// Error of a failed call.
    pub error: Option<HandlerError>,
}

/// Ordered log of every handler call of a transaction.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    entries: Vec<StepExecution>,
    next_event: u64,
}

impl ExecutionLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a handler call starting, returning its entry index.
    pub(crate) fn record_start(&mut self, action: &str, handler_type: HandlerType) -> usize {
        let started_event = self.next_event();
        self.entries.push(StepExecution {
            action: action.to_string(),
            handler_type,
            status: ExecutionStatus::Running,
            started_at: Instant::now(),
            finished_at: None,
            started_event,
            finished_event: None,
            output: None,
            error: None,
        });
        self.entries.len() - 1
    }

    /// Mark an entry as finished successfully.
    pub(crate) fn record_success(&mut self, entry: usize, output: Option<Arc<Value>>) {
        let finished_event = self.next_event();
        if let Some(record) = self.entries.get_mut(entry) {
            record.status = ExecutionStatus::Succeeded;
            record.finished_at = Some(Instant::now());
            record.finished_event = Some(finished_event);
            record.output = output;
        }
    }

    /// Mark an entry as failed.
    pub(crate) fn record_failure(&mut self, entry: usize, error: HandlerError) {
        let finished_event = self.next_event();
        if let Some(record) = self.entries.get_mut(entry) {
            record.status = ExecutionStatus::Failed;
            record.finished_at = Some(Instant::now());
            record.finished_event = Some(finished_event);
            record.error = Some(error);
        }
    }

    fn next_event(&mut self) -> u64 {
        let event = self.next_event;
        self.next_event += 1;
        event
    }

    /// All entries, in start order.
    #[must_use]
    pub fn entries(&self) -> &[StepExecution] {
        &self.entries
    }

    /// Invoke calls, in start order.
    pub fn invocations(&self) -> impl Iterator<Item = &StepExecution> {
        self.of_type(HandlerType::Invoke)
    }

    /// Compensate calls, in start order.
    pub fn compensations(&self) -> impl Iterator<Item = &StepExecution> {
        self.of_type(HandlerType::Compensate)
    }

    fn of_type(&self, handler_type: HandlerType) -> impl Iterator<Item = &StepExecution> {
        self.entries
            .iter()
            .filter(move |record| record.handler_type == handler_type)
    }

    /// The call of a given handler of a step, if it happened.
    #[must_use]
    pub fn find(&self, action: &str, handler_type: HandlerType) -> Option<&StepExecution> {
        self.entries
            .iter()
            .find(|record| record.action == action && record.handler_type == handler_type)
    }

    /// Get a summary of the execution for display.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        for record in &self.entries {
            let status = match (record.handler_type, record.status) {
                (_, ExecutionStatus::Running) => "…",
                (HandlerType::Invoke, ExecutionStatus::Succeeded) => "✓",
                (HandlerType::Invoke, ExecutionStatus::Failed) => "✗",
                (HandlerType::Compensate, ExecutionStatus::Succeeded) => "↩",
                (HandlerType::Compensate, ExecutionStatus::Failed) => "⚠",
            };
            lines.push(format!("{status} {}", record.action));
        }

        lines.join("\n")
    }
}
