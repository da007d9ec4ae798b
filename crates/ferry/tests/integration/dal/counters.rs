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

//! Identifier allocation, including concurrent allocation on one category.

use ferry::{StoreError, UniversalTimestamp, DAL};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Barrier;

use crate::fixtures::fixture;

#[tokio::test]
async fn test_seeded_categories_are_provisioned() {
    let fixture = fixture().await;

    let categories = fixture.dal.counters().list_categories().await.unwrap();
    assert_eq!(categories, vec!["connectioncheck", "logincheckrequest"]);
}

#[tokio::test]
async fn test_identifiers_increase_per_category() {
    let fixture = fixture().await;
    let counters = fixture.dal.counters();

    assert_eq!(counters.next("connectioncheck").await.unwrap(), "00001");
    assert_eq!(counters.next("connectioncheck").await.unwrap(), "00002");
    // Categories do not share an identifier space.
    assert_eq!(counters.next("logincheckrequest").await.unwrap(), "00001");
    assert_eq!(counters.current("connectioncheck").await.unwrap(), Some(2));
}

#[tokio::test]
async fn test_unknown_category_is_rejected() {
    let fixture = fixture().await;

    let err = fixture.dal.counters().next("unprovisioned").await.unwrap_err();
    assert!(matches!(err, StoreError::CategoryNotFound(ref c) if c == "unprovisioned"));
    assert_eq!(fixture.dal.counters().current("unprovisioned").await.unwrap(), None);
}

#[tokio::test]
async fn test_provision_is_idempotent_and_never_resets() {
    let fixture = fixture().await;
    let counters = fixture.dal.counters();

    assert!(counters.provision("billingcheck").await.unwrap());
    assert_eq!(counters.next("billingcheck").await.unwrap(), "00001");

    assert!(!counters.provision("billingcheck").await.unwrap());
    assert_eq!(counters.next("billingcheck").await.unwrap(), "00002");
}

#[tokio::test]
async fn test_failed_create_does_not_consume_an_identifier() {
    let fixture = fixture().await;
    let requests = fixture.dal.requests();

    let err = requests
        .create("unprovisioned", "http://sub/cb", None, UniversalTimestamp::now())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::CategoryNotFound(_)));

    let created = requests
        .create("connectioncheck", "http://sub/cb", None, UniversalTimestamp::now())
        .await
        .unwrap();
    assert_eq!(created.identifier, "00001");
}

/// Concurrent creates on one category must yield pairwise distinct
/// identifiers that together form the contiguous range 1..=N.
#[tokio::test]
async fn test_concurrent_creates_are_distinct_and_contiguous() {
    let fixture = fixture().await;

    const NUM_CALLERS: usize = 25;
    let barrier = Arc::new(Barrier::new(NUM_CALLERS));
    let mut handles = Vec::new();

    for _ in 0..NUM_CALLERS {
        let dal = DAL::new(fixture.database.clone());
        let barrier = barrier.clone();

        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            dal.requests()
                .create("connectioncheck", "http://sub/cb", None, UniversalTimestamp::now())
                .await
                .expect("create failed")
                .identifier
        }));
    }

    let mut identifiers = Vec::new();
    for handle in handles {
        identifiers.push(handle.await.expect("task panicked"));
    }

    let unique: HashSet<&String> = identifiers.iter().collect();
    assert_eq!(unique.len(), NUM_CALLERS, "duplicate identifiers: {:?}", identifiers);

    let mut numbers: Vec<usize> = identifiers.iter().map(|id| id.parse().unwrap()).collect();
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=NUM_CALLERS).collect::<Vec<_>>());
    assert!(identifiers.iter().all(|id| id.len() == 5));
}
