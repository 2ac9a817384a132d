use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::HandlerError;

/// Future returned by an erased invoke handler.
pub type InvokeFuture = BoxFuture<'static, Result<Value, HandlerError>>;

/// Future returned by an erased compensate handler.
pub type CompensateFuture = BoxFuture<'static, Result<(), HandlerError>>;

type InvokeFn<C, X> = Arc<dyn Fn(StepArgs<C, X>) -> InvokeFuture + Send + Sync>;
type CompensateFn<C, X> = Arc<dyn Fn(StepArgs<C, X>) -> CompensateFuture + Send + Sync>;

/// Data handed to a step handler.
///
/// Holds the workflow input, the outputs of the step's declared dependencies
/// keyed by the name the step declared them under, and, when compensating, the
/// output the step's own invoke produced. Values are shared with the
/// transaction and never copied or mutated on the way.
#[derive(Debug, Clone)]
pub struct StepData {
    input: Arc<Value>,
    dependencies: IndexMap<String, Arc<Value>>,
    invoke_output: Option<Arc<Value>>,
}

impl StepData {
    /// Create step data carrying only the workflow input.
    #[must_use]
    pub fn new(input: Value) -> Self {
        Self::from_shared(Arc::new(input), IndexMap::new())
    }

    pub(crate) fn from_shared(input: Arc<Value>, dependencies: IndexMap<String, Arc<Value>>) -> Self {
        Self {
            input,
            dependencies,
            invoke_output: None,
        }
    }

    #[must_use]
    pub fn with_dependency(mut self, key: impl Into<String>, value: Value) -> Self {
        self.dependencies.insert(key.into(), Arc::new(value));
        self
    }

    #[must_use]
    pub fn with_invoke_output(self, output: Value) -> Self {
        self.with_shared_invoke_output(Arc::new(output))
    }

    pub(crate) fn with_shared_invoke_output(mut self, output: Arc<Value>) -> Self {
        self.invoke_output = Some(output);
        self
    }

    /// The workflow input, as passed to the run.
    #[must_use]
    pub fn input(&self) -> &Value {
        &self.input
    }

    /// Deserialize the workflow input.
    ///
    /// # Errors
    ///
    /// Returns an error if the input does not match `T`.
    pub fn input_as<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        Ok(T::deserialize(self.input.as_ref())?)
    }

    /// The value of a declared dependency.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.dependencies.get(key).map(AsRef::as_ref)
    }

    /// The shared value of a declared dependency.
    #[must_use]
    pub fn get_shared(&self, key: &str) -> Option<&Arc<Value>> {
        self.dependencies.get(key)
    }

    /// Deserialize a declared dependency.
    ///
    /// # Errors
    ///
    /// Returns an error if the dependency is missing or does not match `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, HandlerError> {
        let value = self
            .get(key)
            .ok_or_else(|| HandlerError::new(format!("missing dependency '{key}'")))?;
        Ok(T::deserialize(value)?)
    }

    /// Declared dependency keys and their values, in declaration order.
    pub fn dependencies(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.dependencies
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_ref()))
    }

    /// The output of the step's own invoke. Only set for compensation.
    #[must_use]
    pub fn invoke_output(&self) -> Option<&Value> {
        self.invoke_output.as_deref()
    }

    /// Deserialize the output of the step's own invoke.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no invoke output or it does not match `T`.
    pub fn invoke_output_as<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        let value = self
            .invoke_output()
            .ok_or_else(|| HandlerError::new("step has no invoke output"))?;
        Ok(T::deserialize(value)?)
    }
}

/// Arguments of every handler call: `(container, context, data)`.
///
/// `container` is the capability bundle the workflow was compiled with;
/// `context` is the per-run value shared by every step of one transaction.
pub struct StepArgs<C, X> {
    pub container: Arc<C>,
    pub context: Arc<X>,
    pub data: StepData,
}

impl<C, X> Clone for StepArgs<C, X> {
    fn clone(&self) -> Self {
        Self {
            container: Arc::clone(&self.container),
            context: Arc::clone(&self.context),
            data: self.data.clone(),
        }
    }
}

impl<C, X> fmt::Debug for StepArgs<C, X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepArgs")
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}

/// A step implemented as a type rather than a pair of closures.
///
/// # Type Parameters
///
/// - `Container`: Collaborator services (injected at compile time)
/// - `Context`: Per-run shared state, e.g. a unit of work
#[async_trait]
pub trait StepHandler: Send + Sync {
    /// Collaborator services the step resolves.
    type Container: Send + Sync + 'static;

    /// Shared state of one run.
    type Context: Send + Sync + 'static;

    /// Perform the step's side effect and produce its output.
    ///
    /// # Errors
    ///
    /// Returns an error if the step fails; the run then reverts.
    async fn invoke(
        &self,
        args: StepArgs<Self::Container, Self::Context>,
    ) -> Result<Value, HandlerError>;

    /// Undo the side effect of a successful `invoke()`.
    ///
    /// `args.data` is the data the invoke received plus its output. The
    /// default implementation is a no-op, suitable for read-only steps.
    ///
    /// # Errors
    ///
    /// Returns an error if compensation fails.
    async fn compensate(
        &self,
        args: StepArgs<Self::Container, Self::Context>,
    ) -> Result<(), HandlerError> {
        let _ = args;
        Ok(())
    }

    /// Whether the orchestrator should call `compensate()` at all.
    fn has_compensation(&self) -> bool {
        true
    }
}

/// The invoke/compensate pair registered for a step.
pub struct Handlers<C, X> {
    invoke: InvokeFn<C, X>,
    compensate: Option<CompensateFn<C, X>>,
}

impl<C, X> Handlers<C, X>
where
    C: Send + Sync + 'static,
    X: Send + Sync + 'static,
{
    /// Create handlers from an invoke closure, without compensation.
    pub fn new<F, Fut>(invoke: F) -> Self
    where
        F: Fn(StepArgs<C, X>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
    {
        Self {
            invoke: Arc::new(move |args| invoke(args).boxed()),
            compensate: None,
        }
    }

    /// Attach a compensate closure.
    #[must_use]
    pub fn with_compensation<F, Fut>(mut self, compensate: F) -> Self
    where
        F: Fn(StepArgs<C, X>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.compensate = Some(Arc::new(move |args| compensate(args).boxed()));
        self
    }

    /// Create handlers from a [`StepHandler`] implementation.
    pub fn from_step<S>(step: S) -> Self
    where
        S: StepHandler<Container = C, Context = X> + 'static,
    {
        let step = Arc::new(step);
        let invoker = Arc::clone(&step);
        let handlers = Self::new(move |args| {
            let step = Arc::clone(&invoker);
            async move { step.invoke(args).await }
        });

        if step.has_compensation() {
            handlers.with_compensation(move |args| {
                let step = Arc::clone(&step);
                async move { step.compensate(args).await }
            })
        } else {
            handlers
        }
    }
}

impl<C, X> Handlers<C, X> {
    #[must_use]
    pub fn has_compensation(&self) -> bool {
        self.compensate.is_some()
    }

    pub(crate) fn invoke(&self, args: StepArgs<C, X>) -> InvokeFuture {
        (self.invoke)(args)
    }

    /// Calls the compensate handler, or resolves immediately when there is none.
    pub(crate) fn compensate(&self, args: StepArgs<C, X>) -> CompensateFuture {
        match &self.compensate {
            Some(compensate) => compensate(args),
            None => Box::pin(futures::future::ready(Ok(()))),
        }
    }
}

impl<C, X> Clone for Handlers<C, X> {
    fn clone(&self) -> Self {
        Self {
            invoke: Arc::clone(&self.invoke),
            compensate: self.compensate.clone(),
        }
    }
}

impl<C, X> fmt::Debug for Handlers<C, X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("compensate", &self.has_compensation())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    struct Services {
        multiplier: i64,
    }

    #[derive(Default)]
    struct Journal {
        entries: Mutex<Vec<String>>,
    }

    fn args(data: StepData) -> StepArgs<Services, Journal> {
        StepArgs {
            container: Arc::new(Services { multiplier: 3 }),
            context: Arc::new(Journal::default()),
            data,
        }
    }

    struct MultiplyStep;

    #[async_trait]
    impl StepHandler for MultiplyStep {
        type Container = Services;
        type Context = Journal;

        async fn invoke(&self, args: StepArgs<Services, Journal>) -> Result<Value, HandlerError> {
            let value: i64 = args.data.input_as()?;
            Ok(json!(value * args.container.multiplier))
        }

        async fn compensate(&self, args: StepArgs<Services, Journal>) -> Result<(), HandlerError> {
            let output: i64 = args.data.invoke_output_as()?;
            args.context
                .entries
                .lock()
                .expect("journal lock")
                .push(format!("undo multiply -> {output}"));
            Ok(())
        }
    }

    struct ReadOnlyStep;

    #[async_trait]
    impl StepHandler for ReadOnlyStep {
        type Container = Services;
        type Context = Journal;

        async fn invoke(&self, args: StepArgs<Services, Journal>) -> Result<Value, HandlerError> {
            Ok(args.data.input().clone())
        }

        fn has_compensation(&self) -> bool {
            false
        }
    }

    #[test]
    fn get_as_reports_missing_dependency() {
        let data = StepData::new(json!(null));

        let err = data.get_as::<String>("products").expect_err("missing key");

        assert_eq!(err.message(), "missing dependency 'products'");
    }

    #[test]
    fn dependencies_keep_declaration_order() {
        let data = StepData::new(json!({}))
            .with_dependency("b", json!(2))
            .with_dependency("a", json!(1));

        let keys: Vec<&str> = data.dependencies().map(|(key, _)| key).collect();

        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(data.get("a"), Some(&json!(1)));
    }

    #[test]
    fn input_as_reports_type_mismatch() {
        let data = StepData::new(json!("not a number"));

        let err = data.input_as::<i64>().expect_err("type mismatch");

        assert_eq!(err.message(), "invalid step data");
    }

    #[tokio::test]
    async fn closure_handlers_invoke_and_compensate() {
        let handlers: Handlers<Services, Journal> =
            Handlers::new(|args: StepArgs<Services, Journal>| async move {
                Ok(json!({ "echo": args.data.input().clone() }))
            })
            .with_compensation(|args: StepArgs<Services, Journal>| async move {
                args.context
                    .entries
                    .lock()
                    .expect("journal lock")
                    .push("compensated".to_string());
                Ok(())
            });

        let call_args = args(StepData::new(json!(7)));
        let context = Arc::clone(&call_args.context);

        let output = handlers
            .invoke(call_args.clone())
            .await
            .expect("invoke succeeds");
        handlers
            .compensate(call_args)
            .await
            .expect("compensate succeeds");

        assert!(handlers.has_compensation());
        assert_eq!(output, json!({ "echo": 7 }));
        assert_eq!(
            *context.entries.lock().expect("journal lock"),
            vec!["compensated".to_string()]
        );
    }

    #[tokio::test]
    async fn step_handler_is_erased_into_handlers() {
        let handlers = Handlers::from_step(MultiplyStep);
        let call_args = args(StepData::new(json!(7)));
        let context = Arc::clone(&call_args.context);

        let output = handlers
            .invoke(call_args.clone())
            .await
            .expect("invoke succeeds");
        let mut compensate_args = call_args;
        compensate_args.data = compensate_args.data.with_invoke_output(output.clone());
        handlers
            .compensate(compensate_args)
            .await
            .expect("compensate succeeds");

        assert_eq!(output, json!(21));
        assert_eq!(
            *context.entries.lock().expect("journal lock"),
            vec!["undo multiply -> 21".to_string()]
        );
    }

    #[test]
    fn read_only_step_has_no_compensation() {
        let handlers = Handlers::from_step(ReadOnlyStep);

        assert!(!handlers.has_compensation());
    }

    #[tokio::test]
    async fn missing_compensation_resolves_ok() {
        let handlers: Handlers<Services, Journal> =
            Handlers::new(|_args: StepArgs<Services, Journal>| async { Ok(Value::Null) });

        let result = handlers.compensate(args(StepData::new(Value::Null))).await;

        assert!(result.is_ok());
    }
}
