use std::any::Any;
use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::{HandlerError, RunError};
use crate::handler::{StepArgs, StepData};
use crate::transaction::{HandlerType, Transaction, TransactionError, TransactionState};
use crate::workflow::{RunOutcome, Workflow};

/// A finished invoke: `(step index, log entry, outcome)`.
type Invoked = (usize, usize, Result<Value, Failure>);

/// A handler call that did not succeed.
struct Failure {
    error: HandlerError,
    panicked: bool,
}

impl Failure {
    fn handler(error: HandlerError) -> Self {
        Self {
            error,
            panicked: false,
        }
    }

    fn panic(payload: &(dyn Any + Send)) -> Self {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Self {
            error: HandlerError::new(format!("handler panicked: {detail}")),
            panicked: true,
        }
    }
}

/// Bookkeeping of the forward pass, consumed by the compensation pass.
struct Progress {
    /// Successfully invoked steps, in completion order.
    completed: Vec<usize>,
    /// Data each started step received, by step index.
    data: Vec<Option<StepData>>,
    /// First invoke failure; once set no further invoke starts.
    failure: Option<(usize, HandlerError)>,
    panicked: bool,
}

impl Progress {
    fn new(steps: usize) -> Self {
        Self {
            completed: Vec::with_capacity(steps),
            data: vec![None; steps],
            failure: None,
            panicked: false,
        }
    }

    fn started(&self, index: usize) -> bool {
        self.data[index].is_some()
    }
}

/// Drives one transaction of a workflow to a terminal state.
pub(crate) struct Orchestrator<'w, C, X> {
    workflow: &'w Workflow<C, X>,
    input: Arc<Value>,
    context: Arc<X>,
    transaction: Transaction,
}

impl<'w, C, X> Orchestrator<'w, C, X>
where
    C: Send + Sync + 'static,
    X: Send + Sync + 'static,
{
    pub(crate) fn new(workflow: &'w Workflow<C, X>, input: Arc<Value>, context: Arc<X>) -> Self {
        Self {
            workflow,
            input,
            context,
            transaction: Transaction::new(workflow.name()),
        }
    }

    pub(crate) async fn execute(mut self, throw_on_error: bool) -> Result<RunOutcome, RunError> {
        let workflow = self.workflow;
        info!(
            transaction_id = %self.transaction.id(),
            steps = workflow.steps().len(),
            "transaction started"
        );

        self.transaction.transition(TransactionState::Invoking)?;
        let mut progress = self.invoke_steps().await;

        let Some((failed, step_error)) = progress.failure.take() else {
            self.transaction.transition(TransactionState::Done)?;
            info!(transaction_id = %self.transaction.id(), "transaction done");
            return Ok(self.into_outcome());
        };

        self.transaction.transition(TransactionState::Reverting)?;
        let compensation_errors = self.compensate_steps(&mut progress).await;

        let terminal = if progress.panicked {
            TransactionState::Failed
        } else {
            TransactionState::Reverted
        };
        self.transaction.transition(terminal)?;

        let failed_action = workflow.steps()[failed].name().to_string();
        warn!(
            transaction_id = %self.transaction.id(),
            failed_action = %failed_action,
            compensation_failures = compensation_errors.len(),
            state = %terminal,
            "transaction rolled back"
        );

        if !throw_on_error {
            return Ok(self.into_outcome());
        }

        let transaction = Box::new(self.transaction);
        if compensation_errors.is_empty() {
            Err(RunError::StepFailed {
                action: failed_action,
                source: step_error,
                transaction,
            })
        } else {
            Err(RunError::CompensationFailed {
                failed_action,
                step_error,
                compensation_errors,
                transaction,
            })
        }
    }

    /// Start every step whose dependencies have succeeded, until all steps
    /// ran or a failure stops new starts and the in-flight ones drained.
    async fn invoke_steps(&mut self) -> Progress {
        let workflow = self.workflow;
        let steps = workflow.steps();
        let plan = workflow.plan();
        let limit = workflow.config().concurrency_limit();

        let mut position = vec![0; steps.len()];
        for (rank, &index) in plan.order().iter().enumerate() {
            position[index] = rank;
        }

        let mut progress = Progress::new(steps.len());
        let mut succeeded = vec![false; steps.len()];
        let mut ready: BTreeSet<(usize, usize)> = (0..steps.len())
            .filter(|&index| plan.upstream(index).is_empty())
            .map(|index| (position[index], index))
            .collect();
        let mut in_flight: FuturesUnordered<BoxFuture<'static, Invoked>> = FuturesUnordered::new();

        loop {
            while progress.failure.is_none() && in_flight.len() < limit {
                let Some((_, index)) = ready.pop_first() else {
                    break;
                };
                in_flight.push(self.start_invoke(index, &mut progress));
            }

            let Some((index, entry, outcome)) = in_flight.next().await else {
                break;
            };
            let action = steps[index].name();

            match outcome {
                Ok(output) => {
                    let output = Arc::new(output);
                    self.transaction
                        .log_mut()
                        .record_success(entry, Some(Arc::clone(&output)));
                    self.transaction.record_output(action, output);
                    succeeded[index] = true;
                    progress.completed.push(index);
                    debug!(transaction_id = %self.transaction.id(), action, "step invoked");

                    for &next in plan.downstream(index) {
                        if !progress.started(next)
                            && plan
                                .upstream(next)
                                .iter()
                                .all(|dependency| succeeded[dependency.producer])
                        {
                            ready.insert((position[next], next));
                        }
                    }
                }
                Err(Failure { error, panicked }) => {
                    warn!(
                        transaction_id = %self.transaction.id(),
                        action,
                        error = %error,
                        in_flight = in_flight.len(),
                        "step invoke failed"
                    );
                    self.transaction.log_mut().record_failure(entry, error.clone());
                    self.transaction.record_error(TransactionError::new(
                        action,
                        HandlerType::Invoke,
                        error.clone(),
                    ));
                    progress.panicked |= panicked;
                    if progress.failure.is_none() {
                        progress.failure = Some((index, error));
                    }
                }
            }
        }

        progress
    }

    fn start_invoke(&mut self, index: usize, progress: &mut Progress) -> BoxFuture<'static, Invoked> {
        let workflow = self.workflow;
        let step = &workflow.steps()[index];

        let data = self.step_data(index);
        progress.data[index] = Some(data.clone());
        let args = StepArgs {
            container: Arc::clone(workflow.container()),
            context: Arc::clone(&self.context),
            data,
        };

        let entry = self
            .transaction
            .log_mut()
            .record_start(step.name(), HandlerType::Invoke);
        debug!(transaction_id = %self.transaction.id(), action = step.name(), "invoking step");

        let handlers = step.handlers().clone();
        guarded(move || handlers.invoke(args))
            .map(move |outcome| (index, entry, outcome))
            .boxed()
    }

    /// Compensate completed steps one at a time, last completed first.
    async fn compensate_steps(&mut self, progress: &mut Progress) -> Vec<TransactionError> {
        let workflow = self.workflow;
        let steps = workflow.steps();
        let mut compensation_errors = Vec::new();

        for &index in progress.completed.iter().rev() {
            let step = &steps[index];
            if step.skips_compensation() || !step.handlers().has_compensation() {
                debug!(
                    transaction_id = %self.transaction.id(),
                    action = step.name(),
                    "nothing to compensate"
                );
                continue;
            }
            let Some(data) = progress.data[index].clone() else {
                continue;
            };
            let data = match self.transaction.output(step.name()) {
                Some(output) => data.with_shared_invoke_output(Arc::clone(output)),
                None => data,
            };
            let args = StepArgs {
                container: Arc::clone(workflow.container()),
                context: Arc::clone(&self.context),
                data,
            };

            let entry = self
                .transaction
                .log_mut()
                .record_start(step.name(), HandlerType::Compensate);
            debug!(transaction_id = %self.transaction.id(), action = step.name(), "compensating step");

            let handlers = step.handlers().clone();
            match guarded(move || handlers.compensate(args)).await {
                Ok(()) => self.transaction.log_mut().record_success(entry, None),
                Err(Failure { error, panicked }) => {
                    error!(
                        transaction_id = %self.transaction.id(),
                        action = step.name(),
                        error = %error,
                        "step compensation failed"
                    );
                    self.transaction.log_mut().record_failure(entry, error.clone());
                    let failure = TransactionError::new(step.name(), HandlerType::Compensate, error);
                    self.transaction.record_error(failure.clone());
                    compensation_errors.push(failure);
                    progress.panicked |= panicked;
                }
            }
        }

        compensation_errors
    }

    /// The workflow input plus the outputs of the step's dependencies.
    fn step_data(&self, index: usize) -> StepData {
        let steps = self.workflow.steps();
        let dependencies = self
            .workflow
            .plan()
            .upstream(index)
            .iter()
            .filter_map(|dependency| {
                self.transaction
                    .output(steps[dependency.producer].name())
                    .map(|output| (dependency.key.clone(), Arc::clone(output)))
            })
            .collect();
        StepData::from_shared(Arc::clone(&self.input), dependencies)
    }

    fn into_outcome(self) -> RunOutcome {
        let workflow = self.workflow;
        let output = workflow.steps()[workflow.output_index()].name();
        let result = self
            .transaction
            .output(output)
            .map(|value| value.as_ref().clone());

        RunOutcome {
            result,
            errors: self.transaction.errors().to_vec(),
            transaction: self.transaction,
        }
    }
}

/// Run a handler call, turning a panic into a failure.
fn guarded<T, F>(start: F) -> BoxFuture<'static, Result<T, Failure>>
where
    T: Send + 'static,
    F: FnOnce() -> BoxFuture<'static, Result<T, HandlerError>>,
{
    match std::panic::catch_unwind(AssertUnwindSafe(start)) {
        Ok(call) => AssertUnwindSafe(call)
            .catch_unwind()
            .map(|caught| match caught {
                Ok(result) => result.map_err(Failure::handler),
                Err(payload) => Err(Failure::panic(&*payload)),
            })
            .boxed(),
        Err(payload) => futures::future::ready(Err(Failure::panic(&*payload))).boxed(),
    }
}
