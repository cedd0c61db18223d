//! BulkDownloader crawl and single-flight behavior.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{ac, station, MemoryStore, MockRemote};
use fieldsync_cache::ReferenceDataCache;
use fieldsync_core::domain::{
    AssignmentRoles, CompositeKey, GenderQuota, InterviewMode, RotationCounter, Survey, SurveyId,
};
use fieldsync_sync::BulkDownloader;

fn survey(id: &str, mode: InterviewMode, areas: &[&str]) -> Survey {
    Survey {
        id: SurveyId::new(id).unwrap(),
        name: format!("Survey {id}"),
        mode,
        assignments: AssignmentRoles {
            single_mode: areas.iter().map(|a| a.to_string()).collect(),
            phone_mode: vec![],
            in_person_mode: vec![],
        },
        state: Some("WB".to_string()),
    }
}

fn setup() -> (Arc<ReferenceDataCache>, Arc<MockRemote>, BulkDownloader) {
    let cache = Arc::new(ReferenceDataCache::new(Arc::new(MemoryStore::default())));
    let remote = Arc::new(MockRemote::default());
    let downloader = BulkDownloader::new(cache.clone(), remote.clone(), "WB");
    (cache, remote, downloader)
}

fn seed_full_area(remote: &MockRemote, canonical: &str) {
    remote.add_ac(ac(canonical));
    remote.add_groups("WB", canonical, &["Block 1"]);
    remote.add_stations(
        "WB",
        canonical,
        "Block 1",
        vec![station("School 4", 26.13, 89.46), station("School 7", 26.14, 89.47)],
    );
}

#[tokio::test]
async fn test_full_crawl() {
    let (cache, remote, downloader) = setup();
    seed_full_area(&remote, "DINHATA");
    remote.quotas.lock().unwrap().insert(
        "svy-1".to_string(),
        GenderQuota {
            counts: Default::default(),
            targets: Default::default(),
        },
    );
    remote.rotations.lock().unwrap().insert(
        "svy-1".to_string(),
        RotationCounter {
            last_set_number: Some(2),
        },
    );
    *remote.profile.lock().unwrap() = Some(fieldsync_core::domain::UserProfile {
        id: "u1".to_string(),
        name: "Field User".to_string(),
        phone: None,
        role: "interviewer".to_string(),
    });

    let summary = downloader
        .download_all(&[survey("svy-1", InterviewMode::Mixed, &["Dinhata"])], true)
        .await;

    assert!(!summary.skipped);
    assert_eq!(summary.areas, 1);
    assert_eq!(summary.group_lists, 1);
    assert_eq!(summary.station_lists, 1);
    assert_eq!(summary.gps_points, 2);
    assert_eq!(summary.quotas, 1);
    assert_eq!(summary.rotations, 1);
    assert!(summary.profile_cached);

    // Everything keyed under the server's canonical spelling
    let key = CompositeKey::new(&["WB", "DINHATA"]).unwrap();
    assert!(cache.polling_groups(&key).await.is_some());
    let gps_key = CompositeKey::new(&["WB", "DINHATA", "Block 1", "School 4"]).unwrap();
    assert!(cache.gps_point(&gps_key).await.is_some());
    assert!(cache.last_survey_download().await.is_some());
}

#[tokio::test]
async fn test_gps_skipped_without_detail_flag() {
    let (cache, remote, downloader) = setup();
    seed_full_area(&remote, "DINHATA");

    let summary = downloader
        .download_all(&[survey("svy-1", InterviewMode::Capi, &["Dinhata"])], false)
        .await;

    assert_eq!(summary.gps_points, 0);
    assert!(cache.all_gps_points().await.is_empty());
    // Stations are still cached; only the GPS extraction is skipped
    assert_eq!(summary.station_lists, 1);
}

#[tokio::test]
async fn test_rotation_only_for_telephone_surveys() {
    let (cache, remote, downloader) = setup();
    remote.quotas.lock().unwrap().insert(
        "svy-capi".to_string(),
        GenderQuota {
            counts: Default::default(),
            targets: Default::default(),
        },
    );

    let summary = downloader
        .download_all(&[survey("svy-capi", InterviewMode::Capi, &[])], false)
        .await;

    assert_eq!(summary.rotations, 0);
    let key = CompositeKey::single("svy-capi").unwrap();
    assert!(cache.rotation_counter(&key).await.is_none());
}

#[tokio::test]
async fn test_rotation_not_found_caches_empty_counter() {
    let (cache, remote, downloader) = setup();
    remote.quotas.lock().unwrap().insert(
        "svy-cati".to_string(),
        GenderQuota {
            counts: Default::default(),
            targets: Default::default(),
        },
    );
    // No rotation entry configured: the remote answers NotFound

    let summary = downloader
        .download_all(&[survey("svy-cati", InterviewMode::Cati, &[])], false)
        .await;

    assert_eq!(summary.rotations, 1);
    let key = CompositeKey::single("svy-cati").unwrap();
    let counter = cache.rotation_counter(&key).await.unwrap();
    assert_eq!(counter.payload.last_set_number, None);
}

#[tokio::test]
async fn test_partial_failure_continues_crawl() {
    let (cache, remote, downloader) = setup();
    // First area is fully broken, second is fine
    seed_full_area(&remote, "MATHABHANGA (SC)");

    let summary = downloader
        .download_all(
            &[survey(
                "svy-1",
                InterviewMode::Capi,
                &["GHOST AREA", "Mathabhanga"],
            )],
            false,
        )
        .await;

    assert!(summary.failures > 0);
    // The broken area did not abort the rest
    assert_eq!(summary.group_lists, 1);
    let key = CompositeKey::new(&["WB", "MATHABHANGA (SC)"]).unwrap();
    assert!(cache.polling_groups(&key).await.is_some());
}

#[tokio::test]
async fn test_duplicate_areas_collapsed() {
    let (_, remote, downloader) = setup();
    seed_full_area(&remote, "DINHATA");

    let mut s = survey("svy-1", InterviewMode::Capi, &["Dinhata"]);
    s.assignments.phone_mode = vec!["Dinhata".to_string()];
    s.assignments.in_person_mode = vec!["Dinhata".to_string()];

    downloader.download_all(&[s], false).await;

    // One AC fetch (plus possible raw retry), one groups fetch, one
    // stations fetch, one profile attempt; a duplicate area would double
    // the area-scoped calls
    let calls = remote.fetch_calls.load(Ordering::SeqCst);
    assert!(calls <= 5, "expected collapsed crawl, saw {calls} calls");
}

#[tokio::test]
async fn test_single_flight() {
    let (_, remote, downloader) = setup();
    seed_full_area(&remote, "DINHATA");
    *remote.delay.lock().unwrap() = Some(Duration::from_millis(20));

    let surveys = [survey("svy-1", InterviewMode::Capi, &["Dinhata"])];
    let (first, second) =
        tokio::join!(downloader.download_all(&surveys, false), downloader.download_all(&surveys, false));

    // Exactly one of the two concurrent calls actually crawled
    assert_ne!(first.skipped, second.skipped);
    let crawled = if first.skipped { second } else { first };
    assert_eq!(crawled.group_lists, 1);

    // A later call runs again once the flag is cleared
    let third = downloader.download_all(&surveys, false).await;
    assert!(!third.skipped);
}

#[tokio::test]
async fn test_cancelled_crawl_releases_single_flight() {
    let cache = Arc::new(ReferenceDataCache::new(Arc::new(MemoryStore::default())));
    let remote = Arc::new(MockRemote::default());
    seed_full_area(&remote, "DINHATA");
    *remote.delay.lock().unwrap() = Some(Duration::from_millis(50));
    let downloader = Arc::new(BulkDownloader::new(cache, remote.clone(), "WB"));

    let task = tokio::spawn({
        let downloader = downloader.clone();
        async move {
            downloader
                .download_all(&[survey("svy-1", InterviewMode::Capi, &["Dinhata"])], false)
                .await
        }
    });
    // Let the crawl get in flight, then kill it mid-fetch
    tokio::time::sleep(Duration::from_millis(10)).await;
    task.abort();
    assert!(task.await.is_err());

    // The aborted crawl must not leave the guard shut
    *remote.delay.lock().unwrap() = None;
    let summary = downloader
        .download_all(&[survey("svy-1", InterviewMode::Capi, &["Dinhata"])], false)
        .await;
    assert!(!summary.skipped);
    assert_eq!(summary.group_lists, 1);
}
