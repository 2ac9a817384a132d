use std::sync::Arc;

use serde_json::Value;
use tracing::instrument;

use crate::config::OrchestratorConfig;
use crate::definition::WorkflowDefinition;
use crate::error::RunError;
use crate::graph::ExecutionPlan;
use crate::orchestrator::Orchestrator;
use crate::step::StepDefinition;
use crate::transaction::{Transaction, TransactionError};

/// A compiled workflow ready for execution.
///
/// Steps run in dependency order; independent steps run concurrently. If any
/// invoke fails, the steps that completed are compensated in reverse
/// completion order.
pub struct Workflow<C, X> {
    definition: WorkflowDefinition<C, X>,
    plan: ExecutionPlan,
    output: usize,
    container: Arc<C>,
}

impl<C, X> Workflow<C, X> {
    pub(crate) fn new(
        definition: WorkflowDefinition<C, X>,
        plan: ExecutionPlan,
        output: usize,
        container: Arc<C>,
    ) -> Self {
        Self {
            definition,
            plan,
            output,
            container,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.definition.name()
    }

    #[must_use]
    pub fn container(&self) -> &Arc<C> {
        &self.container
    }

    /// Name of the step whose output becomes the run's result.
    #[must_use]
    pub fn output_step(&self) -> &str {
        self.steps()[self.output].name()
    }

    /// Step names in the order the plan would start them one at a time.
    #[must_use]
    pub fn execution_order(&self) -> Vec<&str> {
        self.plan
            .order()
            .iter()
            .map(|&index| self.steps()[index].name())
            .collect()
    }

    /// A mutable copy of the definition, to patch and compile again.
    #[must_use]
    pub fn to_definition(&self) -> WorkflowDefinition<C, X> {
        self.definition.clone()
    }

    pub(crate) fn steps(&self) -> &[StepDefinition<C, X>] {
        self.definition.steps()
    }

    pub(crate) fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    pub(crate) fn output_index(&self) -> usize {
        self.output
    }

    pub(crate) fn config(&self) -> &OrchestratorConfig {
        self.definition.orchestrator_config()
    }
}

impl<C, X> Workflow<C, X>
where
    C: Send + Sync + 'static,
    X: Send + Sync + 'static,
{
    /// Run the workflow in a new transaction.
    ///
    /// # Errors
    ///
    /// With `throw_on_error` unset, handler failures are reported through
    /// the outcome's `errors` and transaction state and this only fails on
    /// an internal state machine violation. With `throw_on_error` set, the
    /// first invoke failure is returned as `RunError::StepFailed` or
    /// `RunError::CompensationFailed` after compensation has completed.
    #[instrument(name = "workflow_run", skip_all, fields(workflow = %self.name()))]
    pub async fn run(&self, options: RunOptions<X>) -> Result<RunOutcome, RunError> {
        let RunOptions {
            input,
            context,
            throw_on_error,
        } = options;

        Orchestrator::new(self, Arc::new(input), context)
            .execute(throw_on_error)
            .await
    }
}

/// Input of one run: `{input, context, throw_on_error}`.
#[derive(Debug)]
pub struct RunOptions<X> {
    input: Value,
    context: Arc<X>,
    throw_on_error: bool,
}

impl<X> RunOptions<X> {
    pub fn new(input: Value, context: X) -> Self {
        Self::with_shared_context(input, Arc::new(context))
    }

    /// Use a context the caller keeps a handle to.
    pub fn with_shared_context(input: Value, context: Arc<X>) -> Self {
        Self {
            input,
            context,
            throw_on_error: false,
        }
    }

    /// Return handler failures as `Err` after compensation.
    #[must_use]
    pub fn throw_on_error(mut self, throw_on_error: bool) -> Self {
        self.throw_on_error = throw_on_error;
        self
    }
}

/// Result of a run: `{result, errors, transaction}`.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Output of the workflow's output step, if that step produced one.
    pub result: Option<Value>,
    /// Every failed handler call, in the order observed.
    pub errors: Vec<TransactionError>,
    /// The finished transaction.
    pub transaction: Transaction,
}

impl RunOutcome {
    /// `done` with no errors.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.transaction.is_successful()
    }
}
