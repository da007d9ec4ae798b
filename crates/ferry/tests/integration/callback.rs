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

//! HTTP callback delivery against a mock originator.

use ferry::{
    CallbackDispatcher, CallbackPayload, DeliveryPool, DispatcherConfig, HttpCallbackDispatcher,
    RequestStatus,
};
use mockito::Matcher;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn quick_dispatcher(max_retries: u32) -> HttpCallbackDispatcher {
    HttpCallbackDispatcher::new(
        DispatcherConfig::builder()
            .request_timeout(Duration::from_secs(2))
            .backoff(Duration::from_millis(10))
            .max_retries(max_retries)
            .build(),
    )
    .unwrap()
}

fn success_payload() -> CallbackPayload {
    CallbackPayload {
        category: "logincheckrequest".to_string(),
        identifier: "00001".to_string(),
        status: RequestStatus::Success,
        worker_id: Some("pc-1".to_string()),
    }
}

#[tokio::test]
async fn test_delivers_json_body() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/cb")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({
            "category": "logincheckrequest",
            "identifier": "00001",
            "status": "success",
            "worker_id": "pc-1"
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let delivered = quick_dispatcher(3)
        .deliver(&format!("{}/cb", server.url()), &success_payload())
        .await;

    assert!(delivered);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_timeout_payload_has_null_worker() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/cb")
        .match_body(Matcher::Json(json!({
            "category": "connectioncheck",
            "identifier": "00003",
            "status": "timeout",
            "worker_id": null
        })))
        .with_status(204)
        .create_async()
        .await;

    let payload = CallbackPayload {
        category: "connectioncheck".to_string(),
        identifier: "00003".to_string(),
        status: RequestStatus::Timeout,
        worker_id: None,
    };
    assert!(
        quick_dispatcher(0)
            .deliver(&format!("{}/cb", server.url()), &payload)
            .await
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_retries_after_server_error() {
    let mut server = mockito::Server::new_async().await;
    let failing = server
        .mock("POST", "/cb")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let dispatcher = quick_dispatcher(3);
    let address = format!("{}/cb", server.url());

    // First attempt hits the failing mock; once it is spent, the next mock
    // answers the retry.
    let recovering = server
        .mock("POST", "/cb")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    assert!(dispatcher.deliver(&address, &success_payload()).await);
    failing.assert_async().await;
    recovering.assert_async().await;
}

#[tokio::test]
async fn test_gives_up_after_max_retries() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/cb")
        .with_status(503)
        .expect(3)
        .create_async()
        .await;

    let delivered = quick_dispatcher(2)
        .deliver(&format!("{}/cb", server.url()), &success_payload())
        .await;

    assert!(!delivered);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unreachable_address_is_not_delivered() {
    // Port 9 (discard) on localhost is not expected to accept connections.
    let delivered = quick_dispatcher(1)
        .deliver("http://127.0.0.1:9/cb", &success_payload())
        .await;
    assert!(!delivered);
}

#[tokio::test]
async fn test_delivery_pool_runs_in_background() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/cb")
        .with_status(200)
        .expect(2)
        .create_async()
        .await;

    let pool = DeliveryPool::new(Arc::new(quick_dispatcher(0)));
    let address = format!("{}/cb", server.url());

    pool.enqueue(address.clone(), success_payload()).await;
    pool.enqueue(address, success_payload()).await;

    assert_eq!(pool.drain().await, 2);
    assert_eq!(pool.pending().await, 0);
    mock.assert_async().await;
}
