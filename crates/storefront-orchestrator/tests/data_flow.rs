//! Integration tests for data flowing between steps.

use std::sync::{Arc, Mutex};

use serde::Deserialize;
use serde_json::{Value, json};
use storefront_orchestrator::{
    HandlerError, Handlers, RunOptions, StepArgs, StepDefinition, TransactionState,
    WorkflowDefinition,
};

type Args = StepArgs<(), ()>;

#[derive(Debug, Deserialize)]
struct Order {
    sku: String,
    quantity: u32,
}

#[tokio::test]
async fn dependencies_are_keyed_by_declared_name() {
    let workflow = WorkflowDefinition::new("totals")
        .step(StepDefinition::new(
            "price",
            Handlers::new(|_args: Args| async { Ok(json!(250)) }),
        ))
        .step(StepDefinition::new(
            "order",
            Handlers::new(|args: Args| async move {
                let order: Order = args.data.input_as()?;
                Ok(json!({ "sku": order.sku, "quantity": order.quantity }))
            }),
        ))
        .step(
            StepDefinition::new(
                "total",
                Handlers::new(|args: Args| async move {
                    let price: u64 = args.data.get_as("price")?;
                    let order: Order = args.data.get_as("order")?;
                    let keys: Vec<_> = args.data.dependencies().map(|(key, _)| key).collect();
                    Ok(json!({ "total": price * u64::from(order.quantity), "keys": keys }))
                }),
            )
            .depends_on(["order", "price"]),
        )
        .compile(Arc::new(()))
        .expect("valid workflow");

    let outcome = workflow
        .run(RunOptions::new(json!({ "sku": "SKU-1", "quantity": 3 }), ()))
        .await
        .expect("run completes");

    assert!(outcome.is_successful());
    assert_eq!(
        outcome.result,
        Some(json!({ "total": 750, "keys": ["order", "price"] }))
    );
}

#[tokio::test]
async fn alias_exposes_output_under_another_name() {
    let workflow = WorkflowDefinition::new("aliases")
        .step(
            StepDefinition::new(
                "create_products",
                Handlers::new(|_args: Args| async { Ok(json!([{ "id": "prod_1" }])) }),
            )
            .alias("products"),
        )
        .step(
            StepDefinition::new(
                "count",
                Handlers::new(|args: Args| async move {
                    let products = args
                        .data
                        .get("products")
                        .and_then(Value::as_array)
                        .ok_or_else(|| HandlerError::new("products missing"))?;
                    Ok(json!(products.len()))
                }),
            )
            .depends_on(["products"]),
        )
        .compile(Arc::new(()))
        .expect("valid workflow");

    let outcome = workflow
        .run(RunOptions::new(Value::Null, ()))
        .await
        .expect("run completes");

    assert_eq!(outcome.result, Some(json!(1)));
}

#[tokio::test]
async fn outputs_are_shared_not_copied() {
    let seen: Arc<Mutex<Option<Arc<Value>>>> = Arc::default();
    let sink = Arc::clone(&seen);

    let workflow = WorkflowDefinition::new("shared")
        .step(StepDefinition::new(
            "source",
            Handlers::new(|_args: Args| async { Ok(json!({ "payload": [1, 2, 3] })) }),
        ))
        .step(
            StepDefinition::new(
                "reader",
                Handlers::new(move |args: Args| {
                    let sink = Arc::clone(&sink);
                    async move {
                        *sink.lock().expect("sink lock") = args.data.get_shared("source").cloned();
                        Ok(Value::Null)
                    }
                }),
            )
            .depends_on(["source"]),
        )
        .compile(Arc::new(()))
        .expect("valid workflow");

    let outcome = workflow
        .run(RunOptions::new(Value::Null, ()))
        .await
        .expect("run completes");

    let seen = seen.lock().expect("sink lock").clone().expect("reader ran");
    let recorded = outcome.transaction.output("source").expect("source output");
    assert!(Arc::ptr_eq(&seen, recorded));
    assert_eq!(*seen, json!({ "payload": [1, 2, 3] }));
}

#[tokio::test]
async fn every_step_sees_the_workflow_input() {
    let echo = || Handlers::new(|args: Args| async move { Ok(args.data.input().clone()) });
    let workflow = WorkflowDefinition::new("echo")
        .step(StepDefinition::new("first", echo()))
        .step(StepDefinition::new("second", echo()).depends_on(["first"]))
        .compile(Arc::new(()))
        .expect("valid workflow");

    let outcome = workflow
        .run(RunOptions::new(json!({ "cart": "c_1" }), ()))
        .await
        .expect("run completes");

    for step in ["first", "second"] {
        assert_eq!(
            outcome.transaction.output(step).map(|value| value.as_ref()),
            Some(&json!({ "cart": "c_1" }))
        );
    }
}

#[tokio::test]
async fn output_step_result_survives_rollback() {
    let workflow = WorkflowDefinition::new("partial")
        .step(StepDefinition::new(
            "create",
            Handlers::new(|_args: Args| async { Ok(json!({ "id": "rec_1" })) })
                .with_compensation(|_args: Args| async { Ok(()) }),
        ))
        .step(
            StepDefinition::new(
                "fail",
                Handlers::new(|_args: Args| async { Err(HandlerError::new("nope")) }),
            )
            .depends_on(["create"]),
        )
        .output("create")
        .compile(Arc::new(()))
        .expect("valid workflow");

    let outcome = workflow
        .run(RunOptions::new(Value::Null, ()))
        .await
        .expect("run completes");

    assert_eq!(outcome.transaction.state(), TransactionState::Reverted);
    assert_eq!(outcome.result, Some(json!({ "id": "rec_1" })));
}

#[tokio::test]
async fn invalid_input_fails_the_step() {
    let workflow = WorkflowDefinition::new("typed")
        .step(StepDefinition::new(
            "parse",
            Handlers::new(|args: Args| async move {
                let order: Order = args.data.input_as()?;
                Ok(json!(order.sku))
            }),
        ))
        .compile(Arc::new(()))
        .expect("valid workflow");

    let outcome = workflow
        .run(RunOptions::new(json!({ "sku": 42 }), ()))
        .await
        .expect("run completes");

    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].error.message(), "invalid step data");
}
