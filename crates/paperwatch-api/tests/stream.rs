//! End-to-end SSE consumption against a loopback axum server.

use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures_util::StreamExt;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use paperwatch_api::{ApiClient, ProcessEvent, ProgressKind, StreamError};

/// Serve each chunk with a small delay so client-side chunk boundaries are
/// deterministic.
fn chunked_sse(chunks: Vec<String>) -> Response {
    let stream = futures_util::stream::iter(chunks).then(|chunk| async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok::<_, Infallible>(chunk)
    });
    Response::builder()
        .header("content-type", "text/event-stream")
        .body(Body::from_stream(stream))
        .unwrap()
}

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn process_stream_delivers_typed_events_in_order() {
    let router = Router::new().route(
        "/papers/1/process/stream",
        get(|| async {
            chunked_sse(vec![
                "event: progress\ndata: {\"status\":\"started\",\"message\":\"Downloading PDF\"}\n\n"
                    .to_string(),
                "event: thinking\ndata: {\"thought\":\"Hello \"}\n\n".to_string(),
                // Corrupt record: must be skipped without killing the stream.
                "event: thinking\ndata: {\"thought\": \n\n".to_string(),
                "event: thinking\ndata: {\"thought\":\"world\"}\n\n".to_string(),
                "event: result\ndata: {\"relevance_score\":7,\"paper_essence\":\"e\"}\n\n"
                    .to_string(),
                "event: done\ndata: {\"status\":\"completed\"}\n\n".to_string(),
            ])
        }),
    );
    let base = serve(router).await;

    let client = ApiClient::new(base);
    let cancel = CancellationToken::new();
    let mut events = Vec::new();
    client
        .process_stream(1, &cancel, |event| events.push(event))
        .await
        .unwrap();

    assert_eq!(events.len(), 5, "corrupt record must be dropped");
    assert!(matches!(
        &events[0],
        ProcessEvent::Progress {
            status: ProgressKind::Started,
            ..
        }
    ));
    let thought: String = events
        .iter()
        .filter_map(|e| match e {
            ProcessEvent::Thinking { thought } => Some(thought.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(thought, "Hello world");
    assert!(matches!(&events[3], ProcessEvent::Result(r) if r.relevance_score == 7));
    assert!(matches!(&events[4], ProcessEvent::Done));
}

#[tokio::test]
async fn non_2xx_response_is_an_immediate_terminal_error() {
    let router = Router::new().route(
        "/papers/1/process/stream",
        get(|| async {
            Response::builder()
                .status(503)
                .body(Body::from("workflow unavailable"))
                .unwrap()
        }),
    );
    let base = serve(router).await;

    let client = ApiClient::new(base);
    let cancel = CancellationToken::new();
    let err = client
        .process_stream(1, &cancel, |_| panic!("no events expected"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "http_503");
    match err {
        StreamError::Status { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "workflow unavailable");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn cancellation_stops_delivery_without_error() {
    // Endless stream: one thinking event every 10ms.
    let router = Router::new().route(
        "/papers/1/process/stream",
        get(|| async {
            let stream = futures_util::stream::unfold(0u64, |n| async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                let chunk = format!("event: thinking\ndata: {{\"thought\":\"t{n}\"}}\n\n");
                Some((Ok::<_, Infallible>(chunk), n + 1))
            });
            Response::builder()
                .header("content-type", "text/event-stream")
                .body(Body::from_stream(stream))
                .unwrap()
        }),
    );
    let base = serve(router).await;

    let client = ApiClient::new(base);
    let cancel = CancellationToken::new();
    let seen = Arc::new(Mutex::new(0usize));

    let seen_cb = seen.clone();
    let cancel_cb = cancel.clone();
    let result = client
        .process_stream(1, &cancel, move |_| {
            *seen_cb.lock().unwrap() += 1;
            // Abort mid-stream: nothing may be delivered after this.
            cancel_cb.cancel();
        })
        .await;

    assert!(result.is_ok(), "cancellation is not an error");
    let after_cancel = *seen.lock().unwrap();
    assert_eq!(after_cancel, 1, "no callbacks after abort");

    // The server keeps emitting; give it time to prove nothing else arrives.
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(*seen.lock().unwrap(), after_cancel);
}
