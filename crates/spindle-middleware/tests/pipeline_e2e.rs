//! End-to-end pipeline integration tests.
//!
//! These tests drive whole pipelines through the public API:
//!
//! 1. Nested pipelines sharing a context through `use_pipeline`
//! 2. Concurrent runs on a multi-threaded runtime
//! 3. Explicit context access through `Next::context`
//! 4. Error propagation through the onion

use spindle_core::{Cell, Context, HookError, PipelineError};
use spindle_middleware::{
    from_fn, handler, use_cell, use_cell_value, use_context, use_pipeline, Next, Pipeline,
    PipelineOptions, RunOptions,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn request_id() -> Cell<u64> {
    Cell::named("request_id", 0)
}

#[tokio::test]
async fn test_nested_pipeline_sees_outer_writes() {
    let user = Cell::named("user", String::from("anonymous"));
    let greeting = Cell::named("greeting", String::new());

    let inner_user = user.clone();
    let inner_greeting = greeting.clone();
    let inner: Pipeline<(), ()> = Pipeline::builder()
        .name("greeter")
        .on_last(move |()| {
            let user = inner_user.clone();
            let greeting = inner_greeting.clone();
            async move {
                let name = use_cell_value(&user)?;
                use_cell(&greeting)?.set(format!("hello, {name}"));
                Ok::<_, PipelineError>(())
            }
        })
        .build();
    let inner = Arc::new(inner);

    let outer_user = user.clone();
    let outer_greeting = greeting.clone();
    let nested = Arc::clone(&inner);
    let outer: Pipeline<String, String> = Pipeline::builder()
        .name("outer")
        .add(from_fn("login", move |name: String, next: Next<String, String>| {
            let user = outer_user.clone();
            async move {
                use_cell(&user)?.set(name.clone());
                next.run(name).await
            }
        }))
        .add(handler("greet", move |_name: String| {
            let inner = Arc::clone(&nested);
            let greeting = outer_greeting.clone();
            async move {
                use_pipeline(&*inner)?.run(()).await?;
                Ok::<_, PipelineError>(use_cell_value(&greeting)?)
            }
        }))
        .build();

    let output = outer.run("ada".to_string()).await.unwrap();
    assert_eq!(output, "hello, ada");

    // The inner pipeline wrote into the outer run's context, not its own.
    assert_eq!(outer.context().read(&greeting), "hello, ada");
    assert_eq!(inner.context().read(&greeting), "");
    assert!(inner.has_run());
}

#[tokio::test]
async fn test_inner_pipeline_run_directly_uses_own_context() {
    let cell = request_id();
    let writer = cell.clone();
    let inner: Pipeline<u64, ()> = Pipeline::builder()
        .on_last(move |id: u64| {
            let writer = writer.clone();
            async move {
                use_cell(&writer)?.set(id);
                Ok::<_, PipelineError>(())
            }
        })
        .build();
    let inner = Arc::new(inner);

    let nested = Arc::clone(&inner);
    let outer: Pipeline<u64, ()> = Pipeline::builder()
        .add(handler("direct", move |id: u64| {
            let inner = Arc::clone(&nested);
            async move { inner.run(id).await }
        }))
        .build();

    outer.run(42).await.unwrap();
    assert_eq!(inner.context().read(&cell), 42);
    assert_eq!(outer.context().read(&cell), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_runs_see_their_own_context() {
    let cell = request_id();
    let seen = cell.clone();
    let pipeline: Pipeline<u64, u64> = Pipeline::builder()
        .options(PipelineOptions::default().fresh_context(true))
        .add(from_fn("stamp", move |id: u64, next: Next<u64, u64>| {
            let cell = seen.clone();
            async move {
                use_cell(&cell)?.set(id);
                // Give other runs a chance to interleave on this worker.
                tokio::time::sleep(Duration::from_millis(id % 5)).await;
                tokio::task::yield_now().await;
                next.run(id).await
            }
        }))
        .on_last({
            let cell = cell.clone();
            move |id: u64| {
                let cell = cell.clone();
                async move {
                    tokio::task::yield_now().await;
                    let stored = use_cell_value(&cell)?;
                    assert_eq!(stored, id);
                    Ok::<_, PipelineError>(stored)
                }
            }
        })
        .build();
    let pipeline = Arc::new(pipeline);

    let tasks: Vec<_> = (1..=64_u64)
        .map(|id| tokio::spawn(pipeline.run(id)))
        .collect();

    for (expected, task) in (1..=64_u64).zip(tasks) {
        assert_eq!(task.await.unwrap().unwrap(), expected);
    }
    assert_eq!(pipeline.context().read(&cell), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_hooks_do_not_leak_into_spawned_tasks() {
    let pipeline: Pipeline<(), bool> = Pipeline::builder()
        .on_last(|()| async {
            let in_run = use_context().is_ok();
            let in_task = tokio::spawn(async { use_context().is_ok() }).await.unwrap();
            Ok::<_, PipelineError>(in_run && !in_task)
        })
        .build();

    assert!(pipeline.run(()).await.unwrap());
    assert_eq!(
        use_context().unwrap_err(),
        HookError::OutOfScope { hook: "use_context" }
    );
}

#[tokio::test]
async fn test_explicit_context_matches_ambient_context() {
    let cell = Cell::new(0_i32);
    let explicit = cell.clone();
    let ambient = cell.clone();

    let pipeline: Pipeline<i32, i32> = Pipeline::builder()
        .add(from_fn("explicit", move |n: i32, next: Next<i32, i32>| {
            let cell = explicit.clone();
            async move {
                next.context().write(&cell, n);
                assert!(Context::ptr_eq(next.context(), &use_context()?));
                next.run(n).await
            }
        }))
        .add(handler("ambient", move |_n: i32| {
            let cell = ambient.clone();
            async move { Ok::<_, PipelineError>(use_cell_value(&cell)? * 2) }
        }))
        .build();

    let context = Context::new();
    let output = pipeline
        .run_with(21, RunOptions::new().context(context.clone()))
        .await
        .unwrap();

    assert_eq!(output, 42);
    assert_eq!(context.read(&cell), 21);
}

#[tokio::test]
async fn test_errors_unwind_through_outer_middleware() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let record = Arc::clone(&log);

    let pipeline: Pipeline<(), ()> = Pipeline::builder()
        .add(from_fn("observe", move |(), next: Next<(), ()>| {
            let record = Arc::clone(&record);
            async move {
                let result = next.run(()).await;
                record
                    .lock()
                    .unwrap()
                    .push(result.as_ref().map_err(ToString::to_string).err());
                result
            }
        }))
        .add(handler("fail", |()| async {
            Err::<(), _>(PipelineError::from(anyhow::anyhow!("database offline")))
        }))
        .build();

    let err = pipeline.run(()).await.unwrap_err();
    assert_eq!(err.to_string(), "database offline");
    assert_eq!(err.kind(), "middleware");
    assert_eq!(
        *log.lock().unwrap(),
        vec![Some("database offline".to_string())]
    );
}

#[tokio::test]
async fn test_error_kinds_for_contract_violations() {
    let empty: Pipeline<(), ()> = Pipeline::new();
    let err = empty.run(()).await.unwrap_err();
    assert_eq!(err.kind(), "incomplete_chain");
    assert_eq!(
        err.to_string(),
        "Expect returning a value, but all middlewares just calling next() (ran off the end at index 0)"
    );

    let mut sealed: Pipeline<(), ()> =
        Pipeline::with_options(PipelineOptions::default().sealed(true));
    let _ = sealed.run(()).await;
    let err = sealed
        .add(handler("late", |()| async { Ok::<_, PipelineError>(()) }))
        .unwrap_err();
    assert!(err.is_contract_violation());
    assert_eq!(err.to_string(), "Can't add middleware after running");
}
