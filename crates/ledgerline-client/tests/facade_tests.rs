//! End-to-end behavior of `ApiClient::fetch_json` over a scripted platform.

mod common;

use common::{client_with, connection_refused, ok_json, status_json, wait_until, ScriptedTransport};
use futures::future::join_all;
use ledgerline_client::transport::CLIENT_TZ_HEADER;
use ledgerline_domain::{FetchError, Method, RawResponse, RequestOptions};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize, PartialEq)]
struct Todo {
    #[serde(rename = "_id")]
    id: String,
    title: String,
}

// ============================================================
// Section 1: Mutations
// ============================================================

#[tokio::test]
async fn test_create_todo_returns_body_and_is_not_cached() {
    // Arrange
    let transport =
        ScriptedTransport::new(Ok(RawResponse::json(201, r#"{"_id":"42","title":"Pay rent"}"#)));
    let (client, sink) = client_with(transport.clone());

    // Act
    let created = client
        .post_json("/api/todo", &json!({ "title": "Pay rent" }))
        .await
        .unwrap();

    // Assert
    assert_eq!(created, json!({ "_id": "42", "title": "Pay rent" }));
    assert_eq!(transport.calls(), 1);
    assert_eq!(sink.count(), 0);

    let cache = client.coordinator().cache();
    cache.run_pending_tasks().await;
    assert_eq!(cache.entry_count(), 0);

    let sent = &transport.requests()[0];
    assert_eq!(sent.method, Method::Post);
    assert_eq!(sent.body.as_deref(), Some(r#"{"title":"Pay rent"}"#));
    assert_eq!(sent.headers.get("content-type"), Some("application/json"));
}

#[tokio::test]
async fn test_concurrent_identical_mutations_are_not_coalesced() {
    // Arrange
    let (transport, gate) = ScriptedTransport::gated(Ok(RawResponse::json(201, "{}")));
    let (client, _) = client_with(transport.clone());
    let body = json!({ "title": "Pay rent" });

    // Act
    let calls = (0..3).map(|_| client.post_json("/api/todo", &body));
    let release = async {
        wait_until(|| transport.calls() == 3).await;
        gate.add_permits(3);
    };
    let (results, ()) = tokio::join!(join_all(calls), release);

    // Assert
    assert!(results.iter().all(Result::is_ok));
    assert_eq!(transport.calls(), 3);
    assert_eq!(client.coordinator().in_flight(), 0);
}

#[tokio::test]
async fn test_delete_no_content_yields_empty_object() {
    let transport = ScriptedTransport::new(Ok(RawResponse {
        status: 204,
        content_type: None,
        body: Vec::new(),
    }));
    let (client, _) = client_with(transport.clone());

    let value = client.delete("/api/todo/42").await.unwrap();

    assert_eq!(value, json!({}));
    assert_eq!(transport.requests()[0].method, Method::Delete);
}

#[tokio::test]
async fn test_patch_and_put_use_their_methods() {
    let transport = ScriptedTransport::new(ok_json("{}"));
    let (client, _) = client_with(transport.clone());

    client.patch_json("/api/goals/7", &json!({ "saved": 10 })).await.unwrap();
    client.put_json("/api/goals/7", &json!({ "saved": 20 })).await.unwrap();

    let methods: Vec<Method> = transport.requests().iter().map(|r| r.method).collect();
    assert_eq!(methods, vec![Method::Patch, Method::Put]);
}

// ============================================================
// Section 2: Headers
// ============================================================

#[tokio::test]
async fn test_header_override_does_not_leak_into_later_calls() {
    // Arrange
    let transport = ScriptedTransport::new(ok_json("{}"));
    let (client, _) = client_with(transport.clone());
    let csv = || RequestOptions::new().header("Accept", "text/csv");

    // Act
    client.fetch_json("/api/export", csv()).await.unwrap();
    client.fetch_json("/api/export", csv()).await.unwrap();
    client.get("/api/goals").await.unwrap();

    // Assert
    let requests = transport.requests();
    assert_eq!(requests[0].headers, requests[1].headers);
    assert_eq!(requests[0].headers.get("accept"), Some("text/csv"));
    assert_eq!(requests[2].headers.get("accept"), Some("application/json"));
    for request in &requests {
        assert_eq!(request.headers.get(CLIENT_TZ_HEADER), Some("Europe/Berlin"));
    }
    assert_eq!(
        client.transport().default_headers().get("accept"),
        Some("application/json")
    );
}

// ============================================================
// Section 3: Failures
// ============================================================

#[tokio::test]
async fn test_validation_failure_shape() {
    // Arrange
    let body = r#"{"error":"Bad input","errors":[{"loc":["body","title"],"msg":"required"}]}"#;
    let transport = ScriptedTransport::new(status_json(422, body));
    let (client, sink) = client_with(transport);

    // Act
    let err = client
        .post_json("/api/todo", &json!({}))
        .await
        .unwrap_err();

    // Assert
    assert_eq!(err.status(), Some(422));
    assert!(err.is_client_error());
    assert_eq!(err.to_string(), "Bad input\ntitle: required");
    assert_eq!(err.payload().unwrap()["errors"][0]["msg"], "required");
    assert_eq!(err.validation_issues().len(), 1);
    assert_eq!(sink.messages(), vec!["Bad input\ntitle: required".to_string()]);
}

#[tokio::test]
async fn test_network_failure_notifies_once() {
    let transport = ScriptedTransport::new(connection_refused());
    let (client, sink) = client_with(transport);

    let err = client.get("/api/goals").await.unwrap_err();

    assert!(matches!(err, FetchError::Network { .. }));
    assert_eq!(err.status(), None);
    assert_eq!(sink.count(), 1);
}

#[tokio::test]
async fn test_plain_gets_are_never_coalesced() {
    let transport = ScriptedTransport::new(ok_json("[]"));
    let (client, _) = client_with(transport.clone());

    client.get("/api/goals").await.unwrap();
    client.get("/api/goals").await.unwrap();

    assert_eq!(transport.calls(), 2);
}

// ============================================================
// Section 4: Typed responses
// ============================================================

#[tokio::test]
async fn test_fetch_as_deserializes_response() {
    let transport = ScriptedTransport::new(ok_json(r#"[{"_id":"1","title":"Groceries"}]"#));
    let (client, _) = client_with(transport);

    let todos: Vec<Todo> = client
        .fetch_as("/api/todo", RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(
        todos,
        vec![Todo {
            id: "1".to_string(),
            title: "Groceries".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_fetch_as_shape_mismatch_is_decode_error_without_notification() {
    let transport = ScriptedTransport::new(ok_json(r#"{"unexpected":true}"#));
    let (client, sink) = client_with(transport);

    let err = client
        .fetch_as::<Vec<Todo>>("/api/todo", RequestOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Decode { .. }));
    assert_eq!(sink.count(), 0);
}
