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

//! Request Store reads, conditional completion and conditional locking.

use chrono::Duration;
use ferry::{Clock, RequestStatus, StoreError, DAL};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Barrier;

use crate::fixtures::fixture;

#[tokio::test]
async fn test_create_then_get_round_trips_the_record() {
    let fixture = fixture().await;
    let now = fixture.clock.now();

    let created = fixture
        .dal
        .requests()
        .create(
            "connectioncheck",
            "http://sub/cb",
            Some(json!({"host": "db-1", "port": 5432})),
            now,
        )
        .await
        .unwrap();

    let stored = fixture
        .dal
        .requests()
        .get("connectioncheck", &created.identifier)
        .await
        .unwrap()
        .expect("request should exist");

    assert_eq!(stored.status, RequestStatus::Pending);
    assert_eq!(stored.callback_url, "http://sub/cb");
    assert_eq!(stored.payload, Some(json!({"host": "db-1", "port": 5432})));
    assert_eq!(stored.created_at, now);
    assert!(stored.locked_by.is_none());
    assert!(stored.completed_at.is_none());
}

#[tokio::test]
async fn test_get_unknown_request_is_none() {
    let fixture = fixture().await;

    let missing = fixture.dal.requests().get("connectioncheck", "99999").await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_list_pending_is_oldest_first_and_excludes_claimed_and_terminal() {
    let fixture = fixture().await;
    let requests = fixture.dal.requests();
    let t0 = fixture.clock.now();

    // Inserted out of chronological order on purpose.
    let late = requests
        .create("connectioncheck", "http://sub/cb", None, t0.minus(Duration::minutes(1)))
        .await
        .unwrap();
    let early = requests
        .create("logincheckrequest", "http://sub/cb", None, t0.minus(Duration::minutes(3)))
        .await
        .unwrap();
    let claimed = requests
        .create("connectioncheck", "http://sub/cb", None, t0.minus(Duration::minutes(2)))
        .await
        .unwrap();
    let done = requests
        .create("connectioncheck", "http://sub/cb", None, t0.minus(Duration::minutes(4)))
        .await
        .unwrap();

    assert!(requests
        .lock("connectioncheck", &claimed.identifier, "pc-1", t0)
        .await
        .unwrap());
    requests
        .complete("connectioncheck", &done.identifier, RequestStatus::Success, "pc-2", t0)
        .await
        .unwrap()
        .expect("completion should be accepted");

    let pending = requests.list_pending().await.unwrap();
    let order: Vec<(&str, &str)> = pending
        .iter()
        .map(|r| (r.category.as_str(), r.identifier.as_str()))
        .collect();

    assert_eq!(
        order,
        vec![
            ("logincheckrequest", early.identifier.as_str()),
            ("connectioncheck", late.identifier.as_str()),
        ]
    );
}

#[tokio::test]
async fn test_first_completion_wins() {
    let fixture = fixture().await;
    let requests = fixture.dal.requests();
    let now = fixture.clock.now();

    let created = requests
        .create("connectioncheck", "http://sub/cb", None, now)
        .await
        .unwrap();

    let first = requests
        .complete("connectioncheck", &created.identifier, RequestStatus::Success, "pc-1", now)
        .await
        .unwrap()
        .expect("first completion should be accepted");
    assert_eq!(first.status, RequestStatus::Success);
    assert_eq!(first.locked_by.as_deref(), Some("pc-1"));
    assert_eq!(first.completed_at, Some(now));

    let second = requests
        .complete("connectioncheck", &created.identifier, RequestStatus::Failed, "pc-2", now)
        .await
        .unwrap();
    assert!(second.is_none());

    let stored = requests
        .get("connectioncheck", &created.identifier)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, RequestStatus::Success);
    assert_eq!(stored.locked_by.as_deref(), Some("pc-1"));
}

#[tokio::test]
async fn test_complete_unknown_request_is_not_accepted() {
    let fixture = fixture().await;

    let result = fixture
        .dal
        .requests()
        .complete("connectioncheck", "00042", RequestStatus::Success, "pc-1", fixture.clock.now())
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_complete_rejects_non_reportable_status() {
    let fixture = fixture().await;
    let requests = fixture.dal.requests();
    let now = fixture.clock.now();

    let created = requests
        .create("connectioncheck", "http://sub/cb", None, now)
        .await
        .unwrap();

    for status in [RequestStatus::Timeout, RequestStatus::Pending, RequestStatus::Locked] {
        let err = requests
            .complete("connectioncheck", &created.identifier, status, "pc-1", now)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidStatus(_)));
    }

    let stored = requests
        .get("connectioncheck", &created.identifier)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, RequestStatus::Pending);
}

#[tokio::test]
async fn test_lock_is_exclusive_but_completion_is_status_gated_only() {
    let fixture = fixture().await;
    let requests = fixture.dal.requests();
    let now = fixture.clock.now();

    let created = requests
        .create("connectioncheck", "http://sub/cb", None, now)
        .await
        .unwrap();

    assert!(requests
        .lock("connectioncheck", &created.identifier, "pc-1", now)
        .await
        .unwrap());
    assert!(!requests
        .lock("connectioncheck", &created.identifier, "pc-2", now)
        .await
        .unwrap());

    let locked = requests
        .get("connectioncheck", &created.identifier)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(locked.status, RequestStatus::Locked);
    assert_eq!(locked.locked_by.as_deref(), Some("pc-1"));
    assert_eq!(locked.locked_at, Some(now));

    // A different worker may still finish the request first.
    let completed = requests
        .complete("connectioncheck", &created.identifier, RequestStatus::Failed, "pc-2", now)
        .await
        .unwrap()
        .expect("locked requests accept completion");
    assert_eq!(completed.status, RequestStatus::Failed);
    assert_eq!(completed.locked_by.as_deref(), Some("pc-2"));

    // Terminal requests cannot be claimed.
    assert!(!requests
        .lock("connectioncheck", &created.identifier, "pc-3", now)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_lock_unknown_request_is_refused() {
    let fixture = fixture().await;

    let locked = fixture
        .dal
        .requests()
        .lock("connectioncheck", "00007", "pc-1", fixture.clock.now())
        .await
        .unwrap();
    assert!(!locked);
}

/// Many workers reporting on the same request at once: exactly one wins.
#[tokio::test]
async fn test_concurrent_completion_has_a_single_winner() {
    let fixture = fixture().await;
    let now = fixture.clock.now();

    let created = fixture
        .dal
        .requests()
        .create("connectioncheck", "http://sub/cb", None, now)
        .await
        .unwrap();

    const NUM_WORKERS: usize = 10;
    let barrier = Arc::new(Barrier::new(NUM_WORKERS));
    let mut handles = Vec::new();

    for worker in 0..NUM_WORKERS {
        let dal = DAL::new(fixture.database.clone());
        let barrier = barrier.clone();
        let identifier = created.identifier.clone();

        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            let status = if worker % 2 == 0 {
                RequestStatus::Success
            } else {
                RequestStatus::Failed
            };
            dal.requests()
                .complete("connectioncheck", &identifier, status, &format!("pc-{}", worker), now)
                .await
                .expect("complete failed")
                .map(|r| (r.status, r.locked_by))
        }));
    }

    let mut winners = Vec::new();
    for handle in handles {
        if let Some(winner) = handle.await.expect("task panicked") {
            winners.push(winner);
        }
    }
    assert_eq!(winners.len(), 1, "expected exactly one winner, got {:?}", winners);

    let stored = fixture
        .dal
        .requests()
        .get("connectioncheck", &created.identifier)
        .await
        .unwrap()
        .unwrap();
    assert_eq!((stored.status, stored.locked_by), winners.remove(0));
}
