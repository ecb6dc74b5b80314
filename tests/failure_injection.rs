//! Failure injection tests: slow, stuck and panicking handlers behind the
//! full server stack.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use serve_toolkit::http::DefaultResponse;

mod common;

const TIMEOUT_MESSAGE: &str = r#"{"status":"timeout","msg":"Gateway Timeout"}"#;

#[tokio::test]
async fn test_fast_handler_passes_through() {
    let routes = Router::new().route(
        "/fast",
        get(|| async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            (StatusCode::CREATED, [("x-handler", "fast")], "ok")
        }),
    );
    let server = common::start_server(common::test_config(500, TIMEOUT_MESSAGE), routes).await;

    let res = common::client().get(server.url("/fast")).send().await.expect("server unreachable");
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(res.headers()["x-handler"], "fast");
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.text().await.unwrap(), "ok");

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_slow_handler_times_out_within_bound() {
    let finished = Arc::new(AtomicBool::new(false));
    let flag = finished.clone();
    let routes = Router::new().route(
        "/slow",
        get(move || {
            let flag = flag.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(300)).await;
                flag.store(true, Ordering::SeqCst);
                (StatusCode::CREATED, "late")
            }
        }),
    );
    let server = common::start_server(common::test_config(50, TIMEOUT_MESSAGE), routes).await;

    let start = Instant::now();
    let res = common::client().get(server.url("/slow")).send().await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(res.text().await.unwrap(), TIMEOUT_MESSAGE);
    assert!(elapsed < Duration::from_millis(250), "took {elapsed:?}");

    // The detached handler still runs to completion.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(finished.load(Ordering::SeqCst));

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_panicking_handler_gets_500() {
    let routes = Router::new().route(
        "/panic",
        get(|| async {
            if true {
                panic!("handler failure");
            }
            "unreachable"
        }),
    );
    let server = common::start_server(common::test_config(500, TIMEOUT_MESSAGE), routes).await;
    let client = common::client();

    let res = client.get(server.url("/panic")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: DefaultResponse = res.json().await.unwrap();
    assert_eq!(body.status, 500);

    // The server keeps serving after a panic.
    let res = client.get(server.url("/missing")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_concurrent_requests_each_get_one_response() {
    let routes = Router::new().route(
        "/sleep/{ms}",
        get(|axum::extract::Path(ms): axum::extract::Path<u64>| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            ms.to_string()
        }),
    );
    let server = common::start_server(common::test_config(100, TIMEOUT_MESSAGE), routes).await;
    let client = common::client();

    let tasks: Vec<_> = [10u64, 400, 20, 400, 30]
        .into_iter()
        .map(|ms| {
            let client = client.clone();
            let url = server.url(&format!("/sleep/{ms}"));
            tokio::spawn(async move {
                let res = client.get(url).send().await.unwrap();
                (ms, res.status(), res.text().await.unwrap())
            })
        })
        .collect();

    for task in tasks {
        let (ms, status, body) = task.await.unwrap();
        if ms < 100 {
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, ms.to_string());
        } else {
            assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
            assert_eq!(body, TIMEOUT_MESSAGE);
        }
    }

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_shutdown_stops_server() {
    let routes = Router::new().route("/", get(|| async { "up" }));
    let server = common::start_server(common::test_config(500, TIMEOUT_MESSAGE), routes).await;

    let res = common::client().get(server.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    server.shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(3), server.handle)
        .await
        .expect("server did not stop");
    assert!(result.unwrap().is_ok());
}
