//! Application-level scenarios: configuration drives pipelines, and cells
//! flow between middleware through both explicit and ambient access.

use spindle::config::ConfigLoader;
use std::sync::Arc;
use spindle::prelude::*;
use spindle_test::{failing, recording, terminal, EventLog, TestError};

const QUIET: &str = r#"
[telemetry.logging]
enabled = false

[telemetry.metrics]
enabled = false
"#;

fn spindle_from(extra: &str) -> Spindle {
    let text = format!("{extra}\n{QUIET}");
    let loader = ConfigLoader::new().with_string(&text, "toml").unwrap();
    Spindle::from_loader(loader).unwrap()
}

#[derive(Debug, Clone, PartialEq)]
struct Request {
    path: String,
    user: Option<String>,
}

impl Request {
    fn get(path: &str, user: Option<&str>) -> Self {
        Self {
            path: path.to_string(),
            user: user.map(str::to_string),
        }
    }
}

#[tokio::test]
async fn test_request_pipeline_with_cells() {
    let spindle = spindle_from("");
    let user = Cell::named("user", None::<String>);
    let hits = Cell::named("hits", 0_u32);

    let auth_user = user.clone();
    let handler_user = user.clone();
    let counted = hits.clone();

    let pipeline = spindle
        .pipeline::<Request, String>("http")
        .add(from_fn("count", move |req: Request, next: Next<Request, String>| {
            let hits = counted.clone();
            async move {
                next.context().update(&hits, |n| n + 1);
                next.run(req).await
            }
        }))
        .add(from_fn("auth", move |req: Request, next: Next<Request, String>| {
            let user = auth_user.clone();
            async move {
                let Some(name) = req.user.clone() else {
                    return Ok("401 Unauthorized".to_string());
                };
                use_cell(&user)?.set(Some(name));
                next.run(req).await
            }
        }))
        .on_last(move |req: Request| {
            let user = handler_user.clone();
            async move {
                let name = use_cell_value(&user)?.unwrap_or_default();
                Ok::<_, PipelineError>(format!("200 {} for {name}", req.path))
            }
        })
        .build();

    let ok = pipeline.run(Request::get("/orders", Some("ada"))).await.unwrap();
    assert_eq!(ok, "200 /orders for ada");

    let denied = pipeline.run(Request::get("/orders", None)).await.unwrap();
    assert_eq!(denied, "401 Unauthorized");

    // The default context is shared across runs.
    assert_eq!(pipeline.context().read(&hits), 2);
    assert_eq!(pipeline.context().read(&user), Some("ada".to_string()));
}

#[tokio::test]
async fn test_fresh_context_from_config() {
    let spindle = spindle_from("[pipeline]\nfresh_context_per_run = true");
    let hits = Cell::new(0_u32);
    let counted = hits.clone();

    let pipeline = spindle
        .pipeline::<(), u32>("fresh")
        .add(from_fn("count", move |(), next: Next<(), u32>| {
            let hits = counted.clone();
            async move {
                use_cell(&hits)?.update(|n| n + 1);
                next.run(()).await
            }
        }))
        .on_last({
            let hits = hits.clone();
            move |()| {
                let hits = hits.clone();
                async move { Ok::<_, PipelineError>(use_cell_value(&hits)?) }
            }
        })
        .build();

    assert_eq!(pipeline.run(()).await.unwrap(), 1);
    assert_eq!(pipeline.run(()).await.unwrap(), 1);
    assert_eq!(pipeline.context().read(&hits), 0);
}

#[tokio::test]
async fn test_sealed_pipeline_from_config() {
    let loader = ConfigLoader::new()
        .with_string(&format!("[pipeline]\nseal_after_run = true\n{QUIET}"), "toml")
        .unwrap();
    let spindle = Spindle::from_loader(loader).unwrap();
    assert!(spindle.pipeline_options().seal_after_run);

    let log = EventLog::new();
    let mut pipeline = spindle
        .pipeline::<(), ()>("sealed")
        .add(recording("A", &log))
        .default_output(())
        .build();

    pipeline.add(recording("B", &log)).unwrap();
    pipeline.run(()).await.unwrap();
    log.assert_onion(&["A", "B"]);

    let err = pipeline.add(recording("C", &log)).unwrap_err();
    assert!(err.is_contract_violation());
    assert!(matches!(SpindleError::from(err), SpindleError::Pipeline(_)));
}

#[tokio::test]
async fn test_errors_unwind_through_recorded_layers() {
    let spindle = spindle_from("");
    let log = EventLog::new();

    let pipeline = spindle
        .pipeline::<u8, u8>("failing")
        .add(recording("outer", &log))
        .add(recording("inner", &log))
        .add(failing("store", "disk full"))
        .add(terminal("unreached", &log, 0))
        .build();

    let err = pipeline.run(7).await.unwrap_err();
    log.assert_onion(&["outer", "inner"]);

    let PipelineError::Middleware(inner) = &err else {
        panic!("Expected middleware error, got {err:?}");
    };
    assert!(inner.downcast_ref::<TestError>().is_some());
    assert_eq!(err.kind(), "middleware");

    let wrapped = SpindleError::from(err);
    assert_eq!(wrapped.to_string(), "Injected failure in store: disk full");
}

fn extend(trail: &[&'static str], step: &'static str) -> Vec<&'static str> {
    let mut trail = trail.to_vec();
    trail.push(step);
    trail
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_nested_pipelines_share_caller_context() {
    let spindle = spindle_from("");
    let trail = Cell::named("trail", Vec::<&'static str>::new());

    let inner_trail = trail.clone();
    let inner = Arc::new(
        spindle
            .pipeline::<u32, u32>("inner")
            .add(from_fn("inner", move |n: u32, next: Next<u32, u32>| {
                let trail = inner_trail.clone();
                async move {
                    use_cell(&trail)?.update(|t| extend(t, "inner"));
                    next.run(n * 10).await
                }
            }))
            .on_last(|n| async move { Ok(n + 1) })
            .build(),
    );

    let outer_trail = trail.clone();
    let nested = Arc::clone(&inner);
    let outer = spindle
        .pipeline::<u32, u32>("outer")
        .add(from_fn("outer", move |n: u32, next: Next<u32, u32>| {
            let trail = outer_trail.clone();
            let inner = Arc::clone(&nested);
            async move {
                use_cell(&trail)?.update(|t| extend(t, "outer"));
                let runner = use_pipeline(&*inner)?;
                let n = runner.run(n).await?;
                tokio::task::yield_now().await;
                next.run(n).await
            }
        }))
        .on_last(|n| async move { Ok(n * 2) })
        .build();

    let context = Context::new();
    let output = outer
        .run_with(3, RunOptions::new().context(context.clone()))
        .await
        .unwrap();

    assert_eq!(output, 62);
    assert_eq!(context.read(&trail), vec!["outer", "inner"]);
    assert!(inner.context().is_empty());
    assert!(outer.context().is_empty());
}

#[test]
fn test_hooks_fail_outside_pipeline() {
    let cell = Cell::new(1_u8);
    let err = use_cell(&cell).err().unwrap();
    assert!(err.to_string().contains("use_cell"));

    let context = Context::new();
    let value = with_context(&context, || use_cell_value(&cell)).unwrap();
    assert_eq!(value, 1);
}

#[tokio::test]
async fn test_interleaved_runs_on_one_thread_keep_their_contexts() {
    let spindle = spindle_from("[pipeline]\nfresh_context_per_run = true");
    let id = Cell::named("id", 0_usize);

    let stamp = id.clone();
    let pipeline = spindle
        .pipeline::<usize, usize>("interleaved")
        .add(from_fn("stamp", move |n: usize, next: Next<usize, usize>| {
            let id = stamp.clone();
            async move {
                use_cell(&id)?.set(n);
                tokio::task::yield_now().await;
                next.run(n).await
            }
        }))
        .on_last({
            let id = id.clone();
            move |_n: usize| {
                let id = id.clone();
                async move {
                    tokio::task::yield_now().await;
                    Ok::<_, PipelineError>(use_cell_value(&id)?)
                }
            }
        })
        .build();

    let outputs = futures_util::future::join_all((0..16).map(|n| pipeline.run(n))).await;
    for (n, output) in outputs.into_iter().enumerate() {
        assert_eq!(output.unwrap(), n);
    }
}
