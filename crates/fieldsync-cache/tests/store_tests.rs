//! Integration tests for the reference cache and offline interview store
//! running over a real in-memory SQLite database.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use fieldsync_cache::{OfflineInterviewStore, ReferenceDataCache, SqliteKeyValueStore};
use fieldsync_core::domain::{
    AcRecord, CompositeKey, GpsPoint, InterviewMode, OfflineInterview, PollingGroup,
    RotationCounter, SubmissionType, SurveyId, SyncQueueItem, SyncStatus,
};
use fieldsync_core::ports::IKeyValueStore;

async fn setup() -> Arc<dyn IKeyValueStore> {
    Arc::new(SqliteKeyValueStore::open_in_memory().await.unwrap())
}

fn sample_ac(name: &str) -> AcRecord {
    AcRecord {
        name: name.to_string(),
        state: "WB".to_string(),
        representatives: vec![],
        election_scheduled: true,
        reserved: false,
    }
}

fn sample_interview() -> OfflineInterview {
    OfflineInterview::new(
        SurveyId::new("survey-wb-2026").unwrap(),
        json!({"name": "WB pre-poll"}),
        InterviewMode::Capi,
        HashMap::from([("q1".to_string(), json!("yes"))]),
        Utc::now() - chrono::Duration::minutes(10),
        Utc::now(),
    )
}

#[tokio::test]
async fn test_file_backed_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("fieldsync.db");
    let key = CompositeKey::single("DINHATA").unwrap();

    {
        let store = SqliteKeyValueStore::open(&db_path).await.unwrap();
        let cache = ReferenceDataCache::new(Arc::new(store));
        cache
            .put_ac_record(key.clone(), sample_ac("DINHATA"))
            .await
            .unwrap();
    }

    let store = SqliteKeyValueStore::open(&db_path).await.unwrap();
    let cache = ReferenceDataCache::new(Arc::new(store));
    let entry = cache.ac_record(&key).await.unwrap();
    assert_eq!(entry.payload.name, "DINHATA");
}

// ============================================================================
// Reference cache
// ============================================================================

#[tokio::test]
async fn test_ac_record_put_and_get() {
    let cache = ReferenceDataCache::new(setup().await);
    let key = CompositeKey::single("DINHATA").unwrap();
    let record = sample_ac("DINHATA");

    assert!(cache.ac_record(&key).await.is_none());
    cache.put_ac_record(key.clone(), record.clone()).await.unwrap();

    let entry = cache.ac_record(&key).await.unwrap();
    assert_eq!(entry.payload, record);
}

#[tokio::test]
async fn test_put_replaces_in_place() {
    let cache = ReferenceDataCache::new(setup().await);
    let key_a = CompositeKey::new(&["WB", "DINHATA"]).unwrap();
    let key_b = CompositeKey::new(&["WB", "MATHABHANGA (SC)"]).unwrap();

    let group = |name: &str| PollingGroup {
        name: name.to_string(),
    };

    cache
        .put_polling_groups(key_a.clone(), vec![group("Block 1")])
        .await
        .unwrap();
    cache
        .put_polling_groups(key_b.clone(), vec![group("Block 9")])
        .await
        .unwrap();
    // Rewrite the first key; its position in the blob must not change
    cache
        .put_polling_groups(key_a.clone(), vec![group("Block 2")])
        .await
        .unwrap();

    let all = cache.all_polling_groups().await;
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].key, key_a);
    assert_eq!(all[0].payload[0].name, "Block 2");
    assert_eq!(all[1].key, key_b);
}

#[tokio::test]
async fn test_families_are_isolated() {
    let cache = ReferenceDataCache::new(setup().await);
    let key = CompositeKey::single("survey-1").unwrap();

    cache
        .put_rotation_counter(
            key.clone(),
            RotationCounter {
                last_set_number: Some(3),
            },
        )
        .await
        .unwrap();

    // Same key in a different family must not collide
    assert!(cache.gender_quota(&key).await.is_none());
    assert_eq!(
        cache
            .rotation_counter(&key)
            .await
            .unwrap()
            .payload
            .last_set_number,
        Some(3)
    );
}

#[tokio::test]
async fn test_gps_batch_put() {
    let cache = ReferenceDataCache::new(setup().await);
    let points = vec![
        (
            CompositeKey::new(&["WB", "DINHATA", "Block 1", "School 4"]).unwrap(),
            GpsPoint {
                latitude: 26.13,
                longitude: 89.46,
                description: None,
            },
        ),
        (
            CompositeKey::new(&["WB", "DINHATA", "Block 1", "School 7"]).unwrap(),
            GpsPoint {
                latitude: 26.14,
                longitude: 89.47,
                description: Some("Near market".to_string()),
            },
        ),
    ];

    cache.put_gps_points(points).await.unwrap();
    assert_eq!(cache.all_gps_points().await.len(), 2);
}

#[tokio::test]
async fn test_corrupt_blob_treated_as_empty() {
    let store = setup().await;
    store
        .set("refcache:ac", "this is not json {{{")
        .await
        .unwrap();

    let cache = ReferenceDataCache::new(store);
    let key = CompositeKey::single("DINHATA").unwrap();
    assert!(cache.ac_record(&key).await.is_none());
    assert!(cache.all_ac_records().await.is_empty());

    // A write after corruption starts the family fresh
    cache
        .put_ac_record(key.clone(), sample_ac("DINHATA"))
        .await
        .unwrap();
    assert!(cache.ac_record(&key).await.is_some());
}

#[tokio::test]
async fn test_clear_reference_data_spares_interviews() {
    let store = setup().await;
    let cache = ReferenceDataCache::new(store.clone());
    let interviews = OfflineInterviewStore::new(store);

    let key = CompositeKey::single("DINHATA").unwrap();
    cache
        .put_ac_record(key.clone(), sample_ac("DINHATA"))
        .await
        .unwrap();
    cache.mark_survey_download_now().await.unwrap();

    let interview = sample_interview();
    interviews.save(&interview).await.unwrap();

    cache.clear_reference_data().await.unwrap();

    assert!(cache.ac_record(&key).await.is_none());
    assert!(cache.last_survey_download().await.is_none());
    // Field data survives the wipe
    assert_eq!(interviews.get_all().await.len(), 1);
}

#[tokio::test]
async fn test_timestamp_markers() {
    let cache = ReferenceDataCache::new(setup().await);
    assert!(cache.last_sync().await.is_none());

    cache.mark_sync_now().await.unwrap();
    let stamp = cache.last_sync().await.unwrap();
    assert!((Utc::now() - stamp).num_seconds() < 5);
}

// ============================================================================
// Offline interview store
// ============================================================================

#[tokio::test]
async fn test_save_and_get() {
    let store = OfflineInterviewStore::new(setup().await);
    let interview = sample_interview();

    store.save(&interview).await.unwrap();
    let loaded = store.get(interview.id()).await.unwrap();
    assert_eq!(loaded, interview);
}

#[tokio::test]
async fn test_save_upserts() {
    let store = OfflineInterviewStore::new(setup().await);
    let mut interview = sample_interview();
    store.save(&interview).await.unwrap();

    interview.start_sync().unwrap();
    store.save(&interview).await.unwrap();

    let all = store.get_all().await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].status(), SyncStatus::Syncing);
}

#[tokio::test]
async fn test_get_pending_includes_failed() {
    let store = OfflineInterviewStore::new(setup().await);

    let pending = sample_interview();
    store.save(&pending).await.unwrap();

    let mut failed = sample_interview();
    failed.start_sync().unwrap();
    failed.record_failure("timeout").unwrap();
    store.save(&failed).await.unwrap();

    let mut syncing = sample_interview();
    syncing.start_sync().unwrap();
    store.save(&syncing).await.unwrap();

    let work = store.get_pending().await;
    assert_eq!(work.len(), 2);
    assert!(work.iter().all(|i| i.status().is_pending_work()));
}

#[tokio::test]
async fn test_update_status() {
    let store = OfflineInterviewStore::new(setup().await);
    let interview = sample_interview();
    store.save(&interview).await.unwrap();

    store
        .update_status(interview.id(), SyncStatus::Syncing, None)
        .await
        .unwrap();
    store
        .update_status(interview.id(), SyncStatus::Failed, Some("timeout"))
        .await
        .unwrap();

    let stored = store.get(interview.id()).await.unwrap();
    assert_eq!(stored.status(), SyncStatus::Failed);
    assert_eq!(stored.sync_attempts(), 1);
    assert_eq!(stored.last_error(), Some("timeout"));

    // Invalid transitions are rejected, unknown ids are errors
    assert!(store
        .update_status(interview.id(), SyncStatus::Synced, None)
        .await
        .is_err());
    assert!(store
        .update_status(&fieldsync_core::domain::InterviewId::generate(), SyncStatus::Syncing, None)
        .await
        .is_err());
}

#[tokio::test]
async fn test_delete() {
    let store = OfflineInterviewStore::new(setup().await);
    let interview = sample_interview();
    store.save(&interview).await.unwrap();

    store.delete(interview.id()).await.unwrap();
    assert!(store.get(interview.id()).await.is_none());

    // Deleting again is a no-op
    store.delete(interview.id()).await.unwrap();
}

#[tokio::test]
async fn test_status_counts() {
    let store = OfflineInterviewStore::new(setup().await);

    store.save(&sample_interview()).await.unwrap();
    store.save(&sample_interview()).await.unwrap();

    let mut failed = sample_interview();
    failed.start_sync().unwrap();
    failed.record_failure("503").unwrap();
    store.save(&failed).await.unwrap();

    assert_eq!(store.status_counts().await, (2, 0, 1));
}

#[tokio::test]
async fn test_queue_lifecycle() {
    let store = OfflineInterviewStore::new(setup().await);
    let interview = sample_interview();

    store
        .enqueue(SyncQueueItem::new(
            interview.id().clone(),
            SubmissionType::Complete,
            json!({"responses": {}}),
        ))
        .await
        .unwrap();
    store
        .enqueue(SyncQueueItem::new(
            interview.id().clone(),
            SubmissionType::Abandon,
            json!({"reason": "respondent_left"}),
        ))
        .await
        .unwrap();

    assert_eq!(store.queue_items().await.len(), 2);

    store.record_queue_attempt(interview.id()).await.unwrap();
    assert!(store.queue_items().await.iter().all(|i| i.attempts == 1));

    store.dequeue(interview.id()).await.unwrap();
    assert!(store.queue_items().await.is_empty());
}

#[tokio::test]
async fn test_corrupt_interview_blob_degrades_to_empty() {
    let store = setup().await;
    store.set("offline:interviews", "[{broken").await.unwrap();

    let interviews = OfflineInterviewStore::new(store);
    assert!(interviews.get_all().await.is_empty());
}
