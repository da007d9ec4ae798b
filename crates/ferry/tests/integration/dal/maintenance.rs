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

//! Bulk store operations used by the janitor: stale-lock release, timeout
//! escalation and retention purge.

use chrono::Duration;
use ferry::{Clock, RequestStatus};

use crate::fixtures::fixture;

#[tokio::test]
async fn test_release_stale_locks_only_touches_old_open_locks() {
    let fixture = fixture().await;
    let requests = fixture.dal.requests();
    let t0 = fixture.clock.now();

    let stale = requests
        .create("connectioncheck", "http://sub/cb", None, t0)
        .await
        .unwrap();
    let fresh = requests
        .create("connectioncheck", "http://sub/cb", None, t0)
        .await
        .unwrap();
    let finished = requests
        .create("connectioncheck", "http://sub/cb", None, t0)
        .await
        .unwrap();

    requests
        .lock("connectioncheck", &stale.identifier, "pc-1", t0)
        .await
        .unwrap();
    requests
        .lock("connectioncheck", &finished.identifier, "pc-2", t0)
        .await
        .unwrap();
    requests
        .complete("connectioncheck", &finished.identifier, RequestStatus::Success, "pc-2", t0)
        .await
        .unwrap();
    requests
        .lock("connectioncheck", &fresh.identifier, "pc-3", t0.plus(Duration::minutes(4)))
        .await
        .unwrap();

    let cutoff = t0.plus(Duration::minutes(6)).minus(Duration::minutes(5));
    let released = requests
        .release_stale_locks("connectioncheck", cutoff)
        .await
        .unwrap();
    assert_eq!(released, 1);

    let stale = requests.get("connectioncheck", &stale.identifier).await.unwrap().unwrap();
    assert_eq!(stale.status, RequestStatus::Pending);
    assert!(stale.locked_by.is_none());
    assert!(stale.locked_at.is_none());

    let fresh = requests.get("connectioncheck", &fresh.identifier).await.unwrap().unwrap();
    assert_eq!(fresh.status, RequestStatus::Locked);
    assert_eq!(fresh.locked_by.as_deref(), Some("pc-3"));

    let finished = requests.get("connectioncheck", &finished.identifier).await.unwrap().unwrap();
    assert_eq!(finished.status, RequestStatus::Success);
    assert_eq!(finished.locked_by.as_deref(), Some("pc-2"));

    // A released request can be claimed by someone else.
    assert!(requests
        .lock("connectioncheck", &stale.identifier, "pc-4", t0.plus(Duration::minutes(6)))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_release_stale_locks_is_scoped_to_its_category() {
    let fixture = fixture().await;
    let requests = fixture.dal.requests();
    let t0 = fixture.clock.now();

    let other = requests
        .create("logincheckrequest", "http://sub/cb", None, t0)
        .await
        .unwrap();
    requests
        .lock("logincheckrequest", &other.identifier, "pc-1", t0)
        .await
        .unwrap();

    let released = requests
        .release_stale_locks("connectioncheck", t0.plus(Duration::hours(1)))
        .await
        .unwrap();
    assert_eq!(released, 0);
}

#[tokio::test]
async fn test_escalate_timeouts_returns_each_request_once() {
    let fixture = fixture().await;
    let requests = fixture.dal.requests();
    let t0 = fixture.clock.now();

    let old = requests
        .create("connectioncheck", "http://sub/cb", None, t0.minus(Duration::minutes(11)))
        .await
        .unwrap();
    let old_claimed = requests
        .create("connectioncheck", "http://sub/cb", None, t0.minus(Duration::minutes(12)))
        .await
        .unwrap();
    let recent = requests
        .create("connectioncheck", "http://sub/cb", None, t0.minus(Duration::minutes(2)))
        .await
        .unwrap();
    requests
        .lock("connectioncheck", &old_claimed.identifier, "pc-1", t0.minus(Duration::minutes(1)))
        .await
        .unwrap();

    let cutoff = t0.minus(Duration::minutes(10));
    let expired = requests
        .escalate_timeouts("connectioncheck", cutoff, t0)
        .await
        .unwrap();

    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].identifier, old.identifier);
    // Rows come back as they were before the transition.
    assert_eq!(expired[0].status, RequestStatus::Pending);
    assert!(expired[0].completed_at.is_none());

    let stored = requests.get("connectioncheck", &old.identifier).await.unwrap().unwrap();
    assert_eq!(stored.status, RequestStatus::Timeout);
    assert_eq!(stored.completed_at, Some(t0));

    let again = requests
        .escalate_timeouts("connectioncheck", cutoff, t0)
        .await
        .unwrap();
    assert!(again.is_empty());

    let claimed = requests
        .get("connectioncheck", &old_claimed.identifier)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(claimed.status, RequestStatus::Locked);

    let recent = requests.get("connectioncheck", &recent.identifier).await.unwrap().unwrap();
    assert_eq!(recent.status, RequestStatus::Pending);
}

#[tokio::test]
async fn test_timed_out_request_rejects_late_reports() {
    let fixture = fixture().await;
    let requests = fixture.dal.requests();
    let t0 = fixture.clock.now();

    let created = requests
        .create("connectioncheck", "http://sub/cb", None, t0.minus(Duration::minutes(30)))
        .await
        .unwrap();
    requests
        .escalate_timeouts("connectioncheck", t0.minus(Duration::minutes(10)), t0)
        .await
        .unwrap();

    let late = requests
        .complete("connectioncheck", &created.identifier, RequestStatus::Success, "pc-1", t0)
        .await
        .unwrap();
    assert!(late.is_none());
}

#[tokio::test]
async fn test_purge_deletes_only_old_terminal_requests() {
    let fixture = fixture().await;
    let requests = fixture.dal.requests();
    let t0 = fixture.clock.now();
    let month_ago = t0.minus(Duration::days(31));

    let old_done = requests
        .create("connectioncheck", "http://sub/cb", None, month_ago)
        .await
        .unwrap();
    requests
        .complete("connectioncheck", &old_done.identifier, RequestStatus::Success, "pc-1", month_ago)
        .await
        .unwrap();

    let old_pending = requests
        .create("connectioncheck", "http://sub/cb", None, t0.minus(Duration::days(60)))
        .await
        .unwrap();

    let recent_done = requests
        .create("connectioncheck", "http://sub/cb", None, month_ago)
        .await
        .unwrap();
    requests
        .complete("connectioncheck", &recent_done.identifier, RequestStatus::Failed, "pc-1", t0)
        .await
        .unwrap();

    let cutoff = t0.minus(Duration::days(30));
    assert_eq!(requests.count_purgeable("connectioncheck", cutoff).await.unwrap(), 1);
    assert_eq!(requests.purge("connectioncheck", cutoff).await.unwrap(), 1);

    assert!(requests
        .get("connectioncheck", &old_done.identifier)
        .await
        .unwrap()
        .is_none());
    assert!(requests
        .get("connectioncheck", &old_pending.identifier)
        .await
        .unwrap()
        .is_some());
    assert!(requests
        .get("connectioncheck", &recent_done.identifier)
        .await
        .unwrap()
        .is_some());

    assert_eq!(requests.count_purgeable("connectioncheck", cutoff).await.unwrap(), 0);
}

#[tokio::test]
async fn test_purge_keeps_identifiers_from_being_reused() {
    let fixture = fixture().await;
    let requests = fixture.dal.requests();
    let t0 = fixture.clock.now();
    let long_ago = t0.minus(Duration::days(90));

    let first = requests
        .create("connectioncheck", "http://sub/cb", None, long_ago)
        .await
        .unwrap();
    requests
        .complete("connectioncheck", &first.identifier, RequestStatus::Success, "pc-1", long_ago)
        .await
        .unwrap();
    requests
        .purge("connectioncheck", t0.minus(Duration::days(30)))
        .await
        .unwrap();

    let next = requests
        .create("connectioncheck", "http://sub/cb", None, t0)
        .await
        .unwrap();
    assert_ne!(next.identifier, first.identifier);
    assert_eq!(next.identifier, "00002");
}

#[tokio::test]
async fn test_escalate_timeouts_rolls_back_on_undecodable_row() {
    let fixture = fixture().await;
    let requests = fixture.dal.requests();
    let t0 = fixture.clock.now();
    let created = t0.minus(Duration::minutes(11));

    let healthy = requests
        .create("connectioncheck", "http://sub/cb", None, created)
        .await
        .unwrap();
    let broken = requests
        .create("connectioncheck", "http://sub/cb", None, created)
        .await
        .unwrap();
    fixture
        .corrupt_payload("connectioncheck", &broken.identifier)
        .await;

    let cutoff = t0.minus(Duration::minutes(10));
    assert!(requests
        .escalate_timeouts("connectioncheck", cutoff, t0)
        .await
        .is_err());

    // Nothing was transitioned, so a later scan still sees both rows.
    assert_eq!(
        fixture.raw_status("connectioncheck", &healthy.identifier).await,
        "pending"
    );
    assert_eq!(
        fixture.raw_status("connectioncheck", &broken.identifier).await,
        "pending"
    );
}
