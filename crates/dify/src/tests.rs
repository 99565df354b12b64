// Client tests against local axum servers

use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures::stream;
use serde_json::{json, Value};

use crate::{ApiConfig, ChatFile, ClientError, DifyClient};

const API_KEY: &str = "app-test-key";

async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client_for(base_url: &str) -> DifyClient {
    DifyClient::new(
        ApiConfig::new(API_KEY)
            .with_base_url(base_url)
            .with_user("tester")
            .with_request_timeout(Duration::from_secs(5))
            .with_idle_timeout(Duration::from_secs(2)),
    )
    .unwrap()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", API_KEY))
        .unwrap_or(false)
}

fn streaming_response(chunks: Vec<&'static str>) -> Response {
    let body = Body::from_stream(stream::iter(
        chunks.into_iter().map(Ok::<_, std::io::Error>),
    ));
    Response::builder()
        .header("content-type", "text/event-stream")
        .body(body)
        .unwrap()
}

#[cfg(test)]
mod completion_tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_stream_assembles_answer() {
        let app = Router::new().route(
            "/v1/completion-messages",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                if !authorized(&headers) {
                    return StatusCode::UNAUTHORIZED.into_response();
                }
                assert_eq!(body["response_mode"], "streaming");
                assert_eq!(body["user"], "tester");
                assert!(body["inputs"]["query"].as_str().unwrap().contains("Smith"));

                streaming_response(vec![
                    "data: {\"event\": \"message\", \"answer\": \"{\\\"title\\\": \"}\n",
                    "data: {\"event\": \"message\", \"answ",
                    "er\": \"\\\"Trial\\\"}\"}\n",
                    "data: {garbage}\n",
                    "event: ping\n\n",
                    "data: {\"event\": \"message_end\"}\n",
                ])
            }),
        );
        let base = spawn_server(app).await;

        let answer = client_for(&base)
            .completion_stream("Reference: Smith J. Trial.")
            .await
            .unwrap();

        assert_eq!(answer, "{\"title\": \"Trial\"}");
    }

    #[tokio::test]
    async fn test_non_success_status_fails_with_code() {
        let app = Router::new().route(
            "/v1/completion-messages",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded") }),
        );
        let base = spawn_server(app).await;

        let err = client_for(&base).completion_stream("q").await.unwrap_err();

        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "upstream exploded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_any_success_status_is_streamed() {
        let app = Router::new().route(
            "/v1/completion-messages",
            post(|| async {
                let mut response = streaming_response(vec![
                    "data: {\"event\": \"message\", \"answer\": \"accepted\"}\n",
                ]);
                *response.status_mut() = StatusCode::ACCEPTED;
                response
            }),
        );
        let base = spawn_server(app).await;

        let answer = client_for(&base).completion_stream("q").await.unwrap();

        assert_eq!(answer, "accepted");
    }

    #[tokio::test]
    async fn test_wrong_key_is_rejected() {
        let app = Router::new().route(
            "/v1/completion-messages",
            post(|headers: HeaderMap| async move {
                if authorized(&headers) {
                    StatusCode::OK
                } else {
                    StatusCode::UNAUTHORIZED
                }
            }),
        );
        let base = spawn_server(app).await;

        let client = DifyClient::new(ApiConfig::new("wrong").with_base_url(&base)).unwrap();
        let err = client.completion_stream("q").await.unwrap_err();

        assert!(matches!(err, ClientError::Api { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_error_event_fails_call() {
        let app = Router::new().route(
            "/v1/completion-messages",
            post(|| async {
                streaming_response(vec![
                    "data: {\"event\": \"message\", \"answer\": \"partial\"}\n",
                    "data: {\"event\": \"error\", \"status\": 400, \"message\": \"model overloaded\"}\n",
                ])
            }),
        );
        let base = spawn_server(app).await;

        let err = client_for(&base).completion_stream("q").await.unwrap_err();

        assert!(matches!(err, ClientError::Stream(ref m) if m == "model overloaded"));
    }

    #[tokio::test]
    async fn test_idle_stream_times_out() {
        let app = Router::new().route(
            "/v1/completion-messages",
            post(|| async {
                let chunks = stream::iter(vec![Ok::<_, std::io::Error>(
                    "data: {\"answer\": \"a\"}\n",
                )])
                .chain(stream::pending());
                Response::new(Body::from_stream(chunks))
            }),
        );
        let base = spawn_server(app).await;

        let client = DifyClient::new(
            ApiConfig::new(API_KEY)
                .with_base_url(&base)
                .with_idle_timeout(Duration::from_millis(200)),
        )
        .unwrap();
        let err = client.completion_stream("q").await.unwrap_err();

        assert!(matches!(err, ClientError::Idle(d) if d == Duration::from_millis(200)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client_for(&format!("http://{}", addr))
            .completion_stream("q")
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Http(_)));
        let item: refminer_core::ItemError = err.into();
        assert!(item.is_retryable());
    }
}

#[cfg(test)]
mod chat_tests {
    use super::*;

    #[tokio::test]
    async fn test_blocking_chat_returns_answer() {
        let app = Router::new().route(
            "/v1/chat-messages",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["response_mode"], "blocking");
                assert_eq!(body["files"][0]["upload_file_id"], "file-42");
                Json(json!({
                    "message_id": "m1",
                    "conversation_id": "c1",
                    "answer": "  [{\"id\": 1, \"reference_id\": [3]}]\n"
                }))
            }),
        );
        let base = spawn_server(app).await;

        let answer = client_for(&base)
            .chat_blocking("prompt", vec![ChatFile::uploaded_image("file-42")])
            .await
            .unwrap();

        assert_eq!(answer, "[{\"id\": 1, \"reference_id\": [3]}]");
    }

    #[tokio::test]
    async fn test_blocking_chat_bad_json_is_decode_error() {
        let app = Router::new().route("/v1/chat-messages", post(|| async { "not json" }));
        let base = spawn_server(app).await;

        let err = client_for(&base)
            .chat_blocking("prompt", vec![])
            .await
            .unwrap_err();

        let item: refminer_core::ItemError = err.into();
        assert!(matches!(item, refminer_core::ItemError::Decode(_)));
    }
}

#[cfg(test)]
mod upload_tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_accepts_created() {
        let app = Router::new().route(
            "/v1/files/upload",
            post(|headers: HeaderMap, body: Bytes| async move {
                assert!(authorized(&headers));
                let text = String::from_utf8_lossy(&body);
                assert!(text.contains("name=\"file\"; filename=\"page-1.png\""));
                assert!(text.contains("image/png"));
                assert!(text.contains("name=\"user\""));
                (
                    StatusCode::CREATED,
                    Json(json!({
                        "id": "remote-1",
                        "name": "page-1.png",
                        "size": 4,
                        "extension": "png",
                        "mime_type": "image/png",
                        "created_at": 1700000000
                    })),
                )
            }),
        );
        let base = spawn_server(app).await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page-1.png");
        std::fs::write(&path, b"\x89PNG").unwrap();

        let uploaded = client_for(&base).upload_file(&path).await.unwrap();

        assert_eq!(uploaded.id, "remote-1");
        assert_eq!(uploaded.size, 4);
        assert_eq!(uploaded.mime_type.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn test_upload_mime_follows_file_content() {
        let app = Router::new().route(
            "/v1/files/upload",
            post(|body: Bytes| async move {
                let text = String::from_utf8_lossy(&body);
                assert!(text.contains("filename=\"scan.png\""));
                assert!(text.contains("image/jpeg"));
                assert!(!text.contains("image/png"));
                Json(json!({"id": "remote-2", "name": "scan.png", "size": 4}))
            }),
        );
        let base = spawn_server(app).await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        std::fs::write(&path, b"\xFF\xD8\xFF\xE0").unwrap();

        let uploaded = client_for(&base).upload_file(&path).await.unwrap();
        assert_eq!(uploaded.id, "remote-2");
    }

    #[tokio::test]
    async fn test_upload_missing_file_is_io_error() {
        let err = client_for("http://127.0.0.1:9")
            .upload_file(std::path::Path::new("/nonexistent/page.png"))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Io(_)));
    }

    #[tokio::test]
    async fn test_upload_rejected_status() {
        let app = Router::new().route(
            "/v1/files/upload",
            post(|| async { (StatusCode::PAYLOAD_TOO_LARGE, "file too large") }),
        );
        let base = spawn_server(app).await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.png");
        std::fs::write(&path, b"data").unwrap();

        let err = client_for(&base).upload_file(&path).await.unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 413, .. }));
    }
}
