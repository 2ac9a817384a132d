//! Integration tests for failing compensations and raised run errors.

use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use storefront_orchestrator::{
    HandlerError, HandlerType, Handlers, RunError, RunOptions, StepArgs, StepDefinition,
    TransactionState, Workflow, WorkflowDefinition,
};

#[derive(Default)]
struct Journal {
    events: Mutex<Vec<String>>,
}

impl Journal {
    fn push(&self, event: String) {
        self.events.lock().expect("journal lock").push(event);
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().expect("journal lock").clone()
    }
}

type Args = StepArgs<(), Journal>;

fn tracked(name: &'static str) -> Handlers<(), Journal> {
    Handlers::new(move |args: Args| async move {
        args.context.push(format!("invoke {name}"));
        Ok(json!(name))
    })
    .with_compensation(move |args: Args| async move {
        args.context.push(format!("compensate {name}"));
        Ok(())
    })
}

fn stubborn(name: &'static str) -> Handlers<(), Journal> {
    Handlers::new(move |args: Args| async move {
        args.context.push(format!("invoke {name}"));
        Ok(json!(name))
    })
    .with_compensation(move |args: Args| async move {
        args.context.push(format!("compensate {name}"));
        Err(HandlerError::new(format!("{name} cannot be undone")))
    })
}

fn failing(name: &'static str) -> Handlers<(), Journal> {
    Handlers::new(move |args: Args| async move {
        args.context.push(format!("invoke {name}"));
        Err(HandlerError::new(format!("{name} exploded")))
    })
}

/// `a -> b -> c`, where `c` fails.
fn workflow(b: Handlers<(), Journal>) -> Workflow<(), Journal> {
    WorkflowDefinition::new("rollback")
        .step(StepDefinition::new("a", tracked("a")))
        .step(StepDefinition::new("b", b).depends_on(["a"]))
        .step(StepDefinition::new("c", failing("c")).depends_on(["b"]))
        .compile(Arc::new(()))
        .expect("valid workflow")
}

#[tokio::test]
async fn compensation_failure_does_not_stop_rollback() {
    let journal = Arc::new(Journal::default());

    let outcome = workflow(stubborn("b"))
        .run(RunOptions::with_shared_context(Value::Null, Arc::clone(&journal)))
        .await
        .expect("run completes");

    assert_eq!(outcome.transaction.state(), TransactionState::Reverted);
    assert_eq!(
        journal.events(),
        vec![
            "invoke a",
            "invoke b",
            "invoke c",
            "compensate b",
            "compensate a"
        ]
    );

    let errors: Vec<_> = outcome
        .errors
        .iter()
        .map(|error| (error.action.as_str(), error.handler_type))
        .collect();
    assert_eq!(
        errors,
        vec![("c", HandlerType::Invoke), ("b", HandlerType::Compensate)]
    );
    assert_eq!(outcome.errors[1].error.message(), "b cannot be undone");
}

#[tokio::test]
async fn throw_on_error_raises_step_failure_after_rollback() {
    let journal = Arc::new(Journal::default());

    let result = workflow(tracked("b"))
        .run(
            RunOptions::with_shared_context(Value::Null, Arc::clone(&journal)).throw_on_error(true),
        )
        .await;

    let (action, source, transaction) = match result {
        Err(RunError::StepFailed {
            action,
            source,
            transaction,
        }) => (action, source, transaction),
        other => panic!("expected StepFailed, got {other:?}"),
    };
    assert_eq!(action, "c");
    assert_eq!(source.message(), "c exploded");
    assert_eq!(transaction.state(), TransactionState::Reverted);
    assert!(journal.events().contains(&"compensate a".to_string()));
}

#[tokio::test]
async fn throw_on_error_raises_compensation_failures() {
    let result = workflow(stubborn("b"))
        .run(RunOptions::new(Value::Null, Journal::default()).throw_on_error(true))
        .await;

    let error = result.expect_err("run should fail");
    assert_eq!(
        error.to_string(),
        "step 'c' failed, and 1 compensation(s) also failed"
    );
    let RunError::CompensationFailed {
        failed_action,
        step_error,
        compensation_errors,
        ..
    } = &error
    else {
        panic!("expected CompensationFailed, got {error:?}");
    };
    assert_eq!(failed_action, "c");
    assert_eq!(step_error.message(), "c exploded");
    assert_eq!(compensation_errors.len(), 1);
    assert_eq!(compensation_errors[0].action, "b");
    assert_eq!(
        error.transaction().map(|transaction| transaction.state()),
        Some(TransactionState::Reverted)
    );
}

#[tokio::test]
async fn without_throw_on_error_failures_are_returned() {
    let outcome = workflow(tracked("b"))
        .run(RunOptions::new(Value::Null, Journal::default()))
        .await
        .expect("run completes without raising");

    assert!(!outcome.is_successful());
    assert_eq!(outcome.errors.len(), 1);
}

#[tokio::test]
async fn errors_do_not_leak_between_runs() {
    let workflow = workflow(stubborn("b"));

    let first = workflow
        .run(RunOptions::new(Value::Null, Journal::default()))
        .await
        .expect("first run completes");
    let second = workflow
        .run(RunOptions::new(Value::Null, Journal::default()))
        .await
        .expect("second run completes");

    assert_eq!(first.errors.len(), 2);
    assert_eq!(second.errors.len(), 2);
    assert_eq!(first.errors, second.errors);
    assert_ne!(first.transaction.id(), second.transaction.id());
}

#[tokio::test]
async fn panicking_handler_fails_the_transaction() {
    let journal = Arc::new(Journal::default());
    let exploding = Handlers::new(|_args: Args| async move {
        if true {
            panic!("boom");
        }
        Ok(Value::Null)
    });

    let outcome = WorkflowDefinition::new("panic")
        .step(StepDefinition::new("a", tracked("a")))
        .step(StepDefinition::new("b", exploding).depends_on(["a"]))
        .compile(Arc::new(()))
        .expect("valid workflow")
        .run(RunOptions::with_shared_context(Value::Null, Arc::clone(&journal)))
        .await
        .expect("run completes");

    assert_eq!(outcome.transaction.state(), TransactionState::Failed);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].action, "b");
    assert_eq!(outcome.errors[0].error.message(), "handler panicked: boom");
    assert!(journal.events().contains(&"compensate a".to_string()));
}
