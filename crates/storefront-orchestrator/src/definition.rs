use std::sync::Arc;

use crate::config::OrchestratorConfig;
use crate::error::DefinitionError;
use crate::graph::ExecutionPlan;
use crate::handler::Handlers;
use crate::manifest::WorkflowManifest;
use crate::registry::ActionRegistry;
use crate::step::{ActionOptions, StepDefinition};
use crate::workflow::Workflow;

/// Builder for a named graph of steps.
///
/// A definition can be patched with [`append_action`](Self::append_action)
/// and [`replace_action`](Self::replace_action) until it is compiled. The
/// compiled [`Workflow`] is immutable; a dependency cycle, an unknown
/// dependency or a duplicate name is reported by [`compile`](Self::compile),
/// so a workflow that could not be compiled can never be run.
///
/// ```
/// use std::sync::Arc;
///
/// use serde_json::json;
/// use storefront_orchestrator::{Handlers, StepArgs, StepDefinition, WorkflowDefinition};
///
/// let workflow = WorkflowDefinition::<(), ()>::new("greet")
///     .step(StepDefinition::new(
///         "hello",
///         Handlers::new(|_args: StepArgs<(), ()>| async { Ok(json!("hello")) }),
///     ))
///     .compile(Arc::new(()))
///     .expect("valid workflow");
///
/// assert_eq!(workflow.execution_order(), vec!["hello"]);
/// ```
///
/// A cycle is a definition error:
///
/// ```
/// use std::sync::Arc;
///
/// use serde_json::Value;
/// use storefront_orchestrator::{
///     DefinitionError, Handlers, StepArgs, StepDefinition, WorkflowDefinition,
/// };
///
/// let noop = || Handlers::new(|_args: StepArgs<(), ()>| async { Ok(Value::Null) });
/// let result = WorkflowDefinition::<(), ()>::new("loop")
///     .step(StepDefinition::new("a", noop()).depends_on(["b"]))
///     .step(StepDefinition::new("b", noop()).depends_on(["a"]))
///     .compile(Arc::new(()));
///
/// assert!(matches!(result, Err(DefinitionError::Cycle { .. })));
/// ```
pub struct WorkflowDefinition<C, X> {
    name: String,
    steps: Vec<StepDefinition<C, X>>,
    output: Option<String>,
    config: OrchestratorConfig,
}

impl<C, X> WorkflowDefinition<C, X> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            output: None,
            config: OrchestratorConfig::default(),
        }
    }

    /// Add a step at the end of the declaration order.
    #[must_use]
    pub fn step(mut self, step: StepDefinition<C, X>) -> Self {
        self.steps.push(step);
        self
    }

    /// Designate the step whose output is the run's result.
    ///
    /// Without one, the last step of the execution order is used.
    #[must_use]
    pub fn output(mut self, step: impl Into<String>) -> Self {
        self.output = Some(step.into());
        self
    }

    #[must_use]
    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn steps(&self) -> &[StepDefinition<C, X>] {
        &self.steps
    }

    #[must_use]
    pub fn find_step(&self, name: &str) -> Option<&StepDefinition<C, X>> {
        self.steps.iter().find(|step| step.name() == name)
    }

    #[must_use]
    pub fn output_step(&self) -> Option<&str> {
        self.output.as_deref()
    }

    #[must_use]
    pub fn orchestrator_config(&self) -> &OrchestratorConfig {
        &self.config
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|step| step.name() == name)
    }

    /// Insert a step that runs after `after`.
    ///
    /// The new step is placed right after `after` in declaration order and
    /// depends on it, so it receives `after`'s output under that name.
    ///
    /// # Errors
    ///
    /// Returns `DefinitionError::UnknownStep` if `after` does not exist, or
    /// `DefinitionError::DuplicateStep` if `name` is already used.
    pub fn append_action(
        &mut self,
        name: impl Into<String>,
        after: &str,
        handlers: Handlers<C, X>,
        options: ActionOptions,
    ) -> Result<&mut Self, DefinitionError> {
        let name = name.into();
        if self.position(&name).is_some() {
            return Err(DefinitionError::DuplicateStep {
                workflow: self.name.clone(),
                step: name,
            });
        }
        let anchor = self
            .position(after)
            .ok_or_else(|| DefinitionError::UnknownStep {
                step: after.to_string(),
            })?;

        let mut step = StepDefinition::new(name, handlers).depends_on([after]);
        if options.no_compensation {
            step = step.no_compensation();
        }
        self.steps.insert(anchor + 1, step);
        Ok(self)
    }

    /// Swap the handlers of an existing step, keeping its wiring.
    ///
    /// # Errors
    ///
    /// Returns `DefinitionError::UnknownStep` if `name` does not exist.
    pub fn replace_action(
        &mut self,
        name: &str,
        handlers: Handlers<C, X>,
    ) -> Result<&mut Self, DefinitionError> {
        let step = self
            .steps
            .iter_mut()
            .find(|step| step.name() == name)
            .ok_or_else(|| DefinitionError::UnknownStep {
                step: name.to_string(),
            })?;
        step.set_handlers(handlers);
        Ok(self)
    }

    /// Build a definition from a manifest, resolving actions in `registry`.
    ///
    /// # Errors
    ///
    /// Returns `DefinitionError::UnknownAction` if a step names an action the
    /// registry does not have.
    pub fn from_manifest(
        manifest: &WorkflowManifest,
        registry: &ActionRegistry<C, X>,
    ) -> Result<Self, DefinitionError> {
        let section = &manifest.workflow;
        let mut definition = Self::new(section.name.clone()).config(section.orchestrator);

        for entry in &section.steps {
            let handlers =
                registry
                    .get(entry.action())
                    .ok_or_else(|| DefinitionError::UnknownAction {
                        step: entry.name.clone(),
                        action: entry.action().to_string(),
                    })?;

            let mut step = StepDefinition::new(entry.name.clone(), handlers.clone())
                .depends_on(entry.depends_on.iter().cloned());
            for alias in &entry.aliases {
                step = step.alias(alias.clone());
            }
            if entry.no_compensation {
                step = step.no_compensation();
            }
            definition = definition.step(step);
        }

        if let Some(output) = &section.output {
            definition = definition.output(output.clone());
        }
        Ok(definition)
    }

    /// Validate the definition and bind it to its service container.
    ///
    /// # Errors
    ///
    /// Returns a `DefinitionError` for an empty workflow, duplicate step
    /// names or aliases, unknown dependencies or output step, and cycles.
    pub fn compile(&self, container: Arc<C>) -> Result<Workflow<C, X>, DefinitionError> {
        let plan = ExecutionPlan::build(&self.name, &self.steps)?;

        let output = match &self.output {
            Some(name) => self
                .position(name)
                .ok_or_else(|| DefinitionError::UnknownOutput { step: name.clone() })?,
            None => plan.terminal(),
        };

        Ok(Workflow::new(self.clone(), plan, output, container))
    }
}

impl<C, X> Clone for WorkflowDefinition<C, X> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            steps: self.steps.clone(),
            output: self.output.clone(),
            config: self.config,
        }
    }
}

impl<C, X> std::fmt::Debug for WorkflowDefinition<C, X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowDefinition")
            .field("name", &self.name)
            .field("steps", &self.steps)
            .field("output", &self.output)
            .field("config", &self.config)
            .finish()
    }
}
