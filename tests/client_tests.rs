use httpmock::prelude::*;
use rustc_hash::FxHashMap;
use serde_json::json;

use chainserve::{ServeError, client::InvokeClient};

#[tokio::test]
async fn test_invoke_posts_fields() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/essay/invoke")
                .json_body(json!({"input": {"topic": "caching"}}));
            then.status(200)
                .json_body(json!({"output": "1. Keep copies close"}));
        })
        .await;

    let client = InvokeClient::new(&server.base_url()).unwrap();
    let mut fields = FxHashMap::default();
    fields.insert("topic".to_string(), "caching".to_string());

    let output = client.invoke("essay", &fields).await.unwrap();

    assert_eq!(output, "1. Keep copies close");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_invoke_text() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/poem/invoke")
                .json_body(json!({"input": "autumn"}));
            then.status(200).json_body(json!({"output": "Leaves fall"}));
        })
        .await;

    let client = InvokeClient::new(&server.base_url()).unwrap();
    let output = client.invoke_text("/poem/", "autumn").await.unwrap();

    assert_eq!(output, "Leaves fall");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_error_detail_is_surfaced() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/essay/invoke");
            then.status(422)
                .json_body(json!({"detail": "Missing input field: topic"}));
        })
        .await;

    let client = InvokeClient::new(&server.base_url()).unwrap();
    let err = client
        .invoke("essay", &FxHashMap::default())
        .await
        .unwrap_err();

    match err {
        ServeError::Remote { status, detail } => {
            assert_eq!(status, 422);
            assert_eq!(detail, "Missing input field: topic");
        }
        other => panic!("expected Remote error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_non_json_error_body() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/essay/invoke");
            then.status(500).body("Internal Server Error");
        })
        .await;

    let client = InvokeClient::new(&server.base_url()).unwrap();
    let err = client.invoke_text("essay", "x").await.unwrap_err();

    assert!(matches!(
        err,
        ServeError::Remote { status: 500, ref detail } if detail == "Internal Server Error"
    ));
}
