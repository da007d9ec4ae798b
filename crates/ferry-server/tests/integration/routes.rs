/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! HTTP routes driven through the router in-process.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use ferry::RequestStatus;
use serde_json::json;

use crate::fixtures::{server_fixture, PUBLIC_URL};

#[tokio::test]
async fn test_health() {
    let fixture = server_fixture().await;

    let (status, body) = fixture.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_create_request() {
    let fixture = server_fixture().await;

    let (status, body) = fixture
        .post(
            "/api/request",
            json!({
                "category": "logincheckrequest",
                "callback_url": "http://sub/cb",
                "data": {"account": "a-17"}
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "created");
    assert_eq!(body["category"], "logincheckrequest");
    assert_eq!(body["request_id"], "00001");
    assert_eq!(
        body["url"],
        format!("{}/api/request/logincheckrequest/00001", PUBLIC_URL)
    );
}

#[tokio::test]
async fn test_create_request_accepts_genre() {
    let fixture = server_fixture().await;

    let (status, body) = fixture
        .post(
            "/api/request",
            json!({"genre": "connectioncheck", "callback_url": "http://sub/cb"}),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["category"], "connectioncheck");
}

#[tokio::test]
async fn test_create_request_validation() {
    let fixture = server_fixture().await;

    for payload in [
        json!({"callback_url": "http://sub/cb"}),
        json!({"category": "connectioncheck"}),
        json!({"category": "connectioncheck", "callback_url": "mailto:someone@example.com"}),
    ] {
        let (status, body) = fixture.post("/api/request", payload.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {}", payload);
        assert!(body["error"].is_string());
    }

    let (status, body) = fixture
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/api/request")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    // None of the above consumed an identifier.
    let (_, body) = fixture
        .post(
            "/api/request",
            json!({"category": "connectioncheck", "callback_url": "http://sub/cb"}),
        )
        .await;
    assert_eq!(body["request_id"], "00001");
}

#[tokio::test]
async fn test_create_request_unknown_category() {
    let fixture = server_fixture().await;

    let (status, body) = fixture
        .post(
            "/api/request",
            json!({"category": "unprovisioned", "callback_url": "http://sub/cb"}),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("unprovisioned"));
}

#[tokio::test]
async fn test_get_request_and_result() {
    let fixture = server_fixture().await;
    fixture
        .post(
            "/api/request",
            json!({
                "category": "connectioncheck",
                "callback_url": "http://sub/cb",
                "data": {"host": "db-1"}
            }),
        )
        .await;

    let (status, record) = fixture.get("/api/request/connectioncheck/00001").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["category"], "connectioncheck");
    assert_eq!(record["request_id"], "00001");
    assert_eq!(record["callback_url"], "http://sub/cb");
    assert_eq!(record["status"], "pending");
    assert_eq!(record["data"], json!({"host": "db-1"}));
    assert!(record["completed_at"].is_null());

    let (status, result) = fixture.get("/api/request-result/connectioncheck/00001").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        result,
        json!({
            "category": "connectioncheck",
            "request_id": "00001",
            "status": "pending",
            "locked_by": null,
            "completed_at": null
        })
    );

    let (status, body) = fixture.get("/api/request/connectioncheck/00099").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Request not found"}));

    let (status, _) = fixture.get("/api/request-result/connectioncheck/00099").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_pending_requests_listing() {
    let fixture = server_fixture().await;
    fixture
        .post(
            "/api/request",
            json!({"category": "connectioncheck", "callback_url": "http://sub/cb", "data": [1, 2]}),
        )
        .await;
    fixture.clock.advance(chrono::Duration::seconds(1));
    fixture
        .post(
            "/api/request",
            json!({"category": "logincheckrequest", "callback_url": "http://sub/cb"}),
        )
        .await;

    let (status, body) = fixture.get("/api/pending-requests").await;
    assert_eq!(status, StatusCode::OK);

    let pending = body.as_array().unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0]["category"], "connectioncheck");
    assert_eq!(pending[0]["request_id"], "00001");
    assert_eq!(
        pending[0]["url"],
        "http://relay.test/api/request/connectioncheck/00001"
    );
    assert_eq!(pending[0]["data"], json!([1, 2]));
    assert_eq!(pending[1]["category"], "logincheckrequest");
    assert!(pending[1]["data"].is_null());
}

#[tokio::test]
async fn test_claim_is_exclusive() {
    let fixture = server_fixture().await;
    fixture
        .post(
            "/api/request",
            json!({"category": "connectioncheck", "callback_url": "http://sub/cb"}),
        )
        .await;

    let (status, body) = fixture
        .post(
            "/api/request/connectioncheck/00001/claim",
            json!({"worker_id": "pc-1"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"locked": true}));

    let (_, body) = fixture
        .post(
            "/api/request/connectioncheck/00001/claim",
            json!({"pc_id": "pc-2"}),
        )
        .await;
    assert_eq!(body, json!({"locked": false}));

    let (status, _) = fixture
        .post("/api/request/connectioncheck/00001/claim", json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, pending) = fixture.get("/api/pending-requests").await;
    assert_eq!(pending, json!([]));
}

#[tokio::test]
async fn test_complete_defaults_and_first_report_wins() {
    let fixture = server_fixture().await;
    fixture
        .post(
            "/api/request",
            json!({"category": "logincheckrequest", "callback_url": "http://sub/cb"}),
        )
        .await;

    let (status, body) = fixture
        .post("/api/request/logincheckrequest/00001/complete", json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"accepted": true}));

    let (_, body) = fixture
        .post(
            "/api/request/logincheckrequest/00001/complete",
            json!({"status": "success", "pc_id": "pc-1"}),
        )
        .await;
    assert_eq!(body, json!({"accepted": false}));

    let (_, result) = fixture.get("/api/request-result/logincheckrequest/00001").await;
    assert_eq!(result["status"], "failed");
    assert_eq!(result["locked_by"], "unknown");
    assert!(result["completed_at"].is_string());

    fixture.engine.deliveries().drain().await;
    let delivered = fixture.dispatcher.deliveries();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].0, "http://sub/cb");
    assert_eq!(delivered[0].1.status, RequestStatus::Failed);
    assert_eq!(delivered[0].1.worker_id.as_deref(), Some("unknown"));
}

#[tokio::test]
async fn test_complete_rejects_bad_statuses() {
    let fixture = server_fixture().await;
    fixture
        .post(
            "/api/request",
            json!({"category": "connectioncheck", "callback_url": "http://sub/cb"}),
        )
        .await;

    for status in ["timeout", "pending", "finished"] {
        let (code, body) = fixture
            .post(
                "/api/request/connectioncheck/00001/complete",
                json!({"status": status, "worker_id": "pc-1"}),
            )
            .await;
        assert_eq!(code, StatusCode::BAD_REQUEST, "status {}", status);
        assert!(body["error"].is_string());
    }

    let (_, result) = fixture.get("/api/request-result/connectioncheck/00001").await;
    assert_eq!(result["status"], "pending");
}

#[tokio::test]
async fn test_response_endpoint() {
    let fixture = server_fixture().await;
    fixture
        .post(
            "/api/request",
            json!({"category": "logincheckrequest", "callback_url": "http://sub/cb"}),
        )
        .await;

    let (status, body) = fixture
        .post(
            "/api/response",
            json!({
                "genre": "logincheckrequest",
                "request_id": "00001",
                "status": "success",
                "pc_id": "pc-1"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"accepted": true}));

    let (_, body) = fixture
        .post(
            "/api/response",
            json!({
                "category": "logincheckrequest",
                "request_id": "00001",
                "status": "failed",
                "worker_id": "pc-2"
            }),
        )
        .await;
    assert_eq!(body, json!({"accepted": false}));

    let (_, body) = fixture
        .post(
            "/api/response",
            json!({"category": "logincheckrequest", "request_id": "00404", "status": "success"}),
        )
        .await;
    assert_eq!(body, json!({"accepted": false}));

    let (status, _) = fixture
        .post("/api/response", json!({"category": "logincheckrequest"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, result) = fixture.get("/api/request-result/logincheckrequest/00001").await;
    assert_eq!(result["status"], "success");
    assert_eq!(result["locked_by"], "pc-1");
}
