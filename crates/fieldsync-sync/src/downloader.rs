//! Bulk reference data download
//!
//! Eagerly populates the reference cache from a list of assigned surveys so
//! subsequent offline work has everything it needs. The crawl is
//! best-effort: every sub-step is independently wrapped, a failed area or
//! group is logged and skipped, and `download_all` never returns an error
//! past its own boundary.
//!
//! Areas and groups are processed sequentially on purpose. Sequential
//! execution is the backpressure mechanism against the remote API; there is
//! no rate limiter.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use fieldsync_cache::ReferenceDataCache;
use fieldsync_core::domain::{
    AcRecord, CompositeKey, GpsPoint, PollingGroup, RemoteError, RotationCounter, Survey,
};
use fieldsync_core::normalizer::normalize;
use fieldsync_core::ports::IRemoteDataSource;

/// Outcome of one bulk download pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    /// True when another download was already in flight and this call did
    /// nothing
    pub skipped: bool,
    /// AC records cached
    pub areas: usize,
    /// Group lists cached
    pub group_lists: usize,
    /// Station lists cached
    pub station_lists: usize,
    /// GPS points cached
    pub gps_points: usize,
    /// Gender quotas cached
    pub quotas: usize,
    /// Rotation counters cached
    pub rotations: usize,
    /// Whether the user profile was cached
    pub profile_cached: bool,
    /// Sub-steps that failed and were skipped
    pub failures: usize,
}

/// Single-flight, best-effort crawler populating the reference cache
pub struct BulkDownloader {
    cache: Arc<ReferenceDataCache>,
    remote: Arc<dyn IRemoteDataSource>,
    default_state: String,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when dropped, so a crawl future that is
/// cancelled mid-flight (task abort, timeout) cannot wedge the guard shut
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl BulkDownloader {
    /// Creates a downloader; `default_state` is used for surveys carrying
    /// no state of their own
    pub fn new(
        cache: Arc<ReferenceDataCache>,
        remote: Arc<dyn IRemoteDataSource>,
        default_state: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            remote,
            default_state: default_state.into(),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Crawls and caches all dependent data for the given surveys
    ///
    /// A concurrent call while a crawl is running is a silent no-op; the
    /// returned summary is flagged `skipped`. Per-step failures are counted
    /// and skipped, never propagated.
    pub async fn download_all(
        &self,
        surveys: &[Survey],
        include_gps_detail: bool,
    ) -> DownloadSummary {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Bulk download already in flight, ignoring call");
            return DownloadSummary {
                skipped: true,
                ..DownloadSummary::default()
            };
        }

        let _guard = InFlightGuard(&self.in_flight);
        let summary = self.crawl(surveys, include_gps_detail).await;

        info!(
            areas = summary.areas,
            group_lists = summary.group_lists,
            station_lists = summary.station_lists,
            gps_points = summary.gps_points,
            failures = summary.failures,
            "Bulk download finished"
        );
        summary
    }

    async fn crawl(&self, surveys: &[Survey], include_gps_detail: bool) -> DownloadSummary {
        let mut summary = DownloadSummary::default();

        // Step 1: distinct (state, area) pairs across all role lists,
        // insertion order preserved
        let mut seen = HashSet::new();
        let mut targets: Vec<(String, String)> = Vec::new();
        for survey in surveys {
            let state = survey
                .state
                .clone()
                .unwrap_or_else(|| self.default_state.clone());
            for area in survey.assignments.all_areas() {
                let pair = (state.clone(), area.to_string());
                if seen.insert(pair.clone()) {
                    targets.push(pair);
                }
            }
        }

        for (state, raw_area) in &targets {
            let canonical = self.crawl_area(state, raw_area, &mut summary).await;
            self.crawl_groups(state, &canonical, include_gps_detail, &mut summary)
                .await;
        }

        for survey in surveys {
            self.crawl_survey_counters(survey, &mut summary).await;
        }

        match self.remote.fetch_user_profile().await {
            Ok(profile) => match self.cache.put_user_profile(profile).await {
                Ok(()) => summary.profile_cached = true,
                Err(err) => {
                    warn!(%err, "Failed to cache user profile");
                    summary.failures += 1;
                }
            },
            Err(err) => {
                warn!(%err, "Failed to fetch user profile");
                summary.failures += 1;
            }
        }

        if let Err(err) = self.cache.mark_survey_download_now().await {
            warn!(%err, "Failed to stamp download marker");
        }

        summary
    }

    /// Step 2: resolves the canonical name for one area and caches its AC
    /// record
    ///
    /// The canonical name is, in order of preference: the server-returned
    /// name, the locally normalized name (network failure), the raw name
    /// (even the normalized fetch 404ed). All sub-resource caching for the
    /// area uses this one name; a mismatched key here would silently break
    /// later offline reads.
    async fn crawl_area(&self, state: &str, raw_area: &str, summary: &mut DownloadSummary) -> String {
        let raw = raw_area.trim();
        let normalized = normalize(raw);

        let fetched = match self.remote.fetch_ac_record(&normalized).await {
            Err(RemoteError::NotFound) if raw != normalized => {
                match self.remote.fetch_ac_record(raw).await {
                    Err(err) => {
                        warn!(state, area = raw, %err, "AC record unavailable, keying by raw name");
                        summary.failures += 1;
                        return raw.to_string();
                    }
                    ok => ok,
                }
            }
            Err(err) => {
                warn!(state, area = raw, %err, "AC fetch failed, keying by normalized name");
                summary.failures += 1;
                return normalized;
            }
            ok => ok,
        };

        match fetched {
            Ok(record) => {
                let canonical = if record.name.trim().is_empty() {
                    normalized
                } else {
                    record.name.clone()
                };
                self.cache_ac(&canonical, record, summary).await;
                canonical
            }
            Err(err) => {
                warn!(state, area = raw, %err, "AC fetch failed, keying by raw name");
                summary.failures += 1;
                raw.to_string()
            }
        }
    }

    async fn cache_ac(&self, canonical: &str, record: AcRecord, summary: &mut DownloadSummary) {
        let Ok(key) = CompositeKey::single(canonical) else {
            warn!(area = canonical, "Cannot build cache key for AC record");
            summary.failures += 1;
            return;
        };
        match self.cache.put_ac_record(key, record).await {
            Ok(()) => summary.areas += 1,
            Err(err) => {
                warn!(area = canonical, %err, "Failed to cache AC record");
                summary.failures += 1;
            }
        }
    }

    /// Steps 3-4: groups, stations, and inline GPS for one canonical area
    async fn crawl_groups(
        &self,
        state: &str,
        area: &str,
        include_gps_detail: bool,
        summary: &mut DownloadSummary,
    ) {
        let groups: Vec<PollingGroup> = match self.remote.fetch_polling_groups(state, area).await {
            Ok(groups) => groups,
            Err(err) => {
                warn!(state, area, %err, "Failed to fetch polling groups");
                summary.failures += 1;
                return;
            }
        };

        match CompositeKey::new(&[state, area]) {
            Ok(key) => match self.cache.put_polling_groups(key, groups.clone()).await {
                Ok(()) => summary.group_lists += 1,
                Err(err) => {
                    warn!(state, area, %err, "Failed to cache polling groups");
                    summary.failures += 1;
                }
            },
            Err(err) => {
                warn!(state, area, %err, "Cannot build cache key for groups");
                summary.failures += 1;
            }
        }

        for group in &groups {
            let stations = match self
                .remote
                .fetch_polling_stations(state, area, &group.name)
                .await
            {
                Ok(stations) => stations,
                Err(err) => {
                    warn!(state, area, group = %group.name, %err, "Failed to fetch stations");
                    summary.failures += 1;
                    continue;
                }
            };

            match CompositeKey::new(&[state, area, &group.name]) {
                Ok(key) => match self.cache.put_polling_stations(key, stations.clone()).await {
                    Ok(()) => summary.station_lists += 1,
                    Err(err) => {
                        warn!(state, area, group = %group.name, %err, "Failed to cache stations");
                        summary.failures += 1;
                    }
                },
                Err(err) => {
                    warn!(state, area, group = %group.name, %err, "Cannot build cache key for stations");
                    summary.failures += 1;
                }
            }

            if include_gps_detail {
                // GPS is inline in the station records; no extra round-trip
                let batch: Vec<(CompositeKey, GpsPoint)> = stations
                    .iter()
                    .filter_map(|station| {
                        let gps = station.gps.clone()?;
                        CompositeKey::new(&[state, area, &group.name, &station.name])
                            .ok()
                            .map(|key| (key, gps))
                    })
                    .collect();
                let count = batch.len();

                match self.cache.put_gps_points(batch.clone()).await {
                    Ok(()) => summary.gps_points += count,
                    Err(err) => {
                        // One store write per group; fall back to
                        // per-station writes tolerating individual failures
                        warn!(state, area, group = %group.name, %err, "GPS batch write failed, retrying per station");
                        for (key, gps) in batch {
                            match self.cache.put_gps_point(key, gps).await {
                                Ok(()) => summary.gps_points += 1,
                                Err(err) => {
                                    warn!(%err, "Failed to cache GPS point");
                                    summary.failures += 1;
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    /// Step 5: gender quota for every survey, rotation counter for
    /// CATI-capable surveys
    async fn crawl_survey_counters(&self, survey: &Survey, summary: &mut DownloadSummary) {
        let survey_id = survey.id.as_str();
        let Ok(key) = CompositeKey::single(survey_id) else {
            warn!(survey_id, "Cannot build cache key for survey");
            summary.failures += 1;
            return;
        };

        match self.remote.fetch_gender_quota(survey_id).await {
            Ok(quota) => match self.cache.put_gender_quota(key.clone(), quota).await {
                Ok(()) => summary.quotas += 1,
                Err(err) => {
                    warn!(survey_id, %err, "Failed to cache gender quota");
                    summary.failures += 1;
                }
            },
            Err(err) => {
                warn!(survey_id, %err, "Failed to fetch gender quota");
                summary.failures += 1;
            }
        }

        if !survey.mode.is_telephone() {
            return;
        }

        let counter = match self.remote.fetch_rotation_counter(survey_id).await {
            Ok(counter) => counter,
            // 404 means no prior interviews; cache the empty counter so
            // offline reads default to set 1
            Err(RemoteError::NotFound) => RotationCounter {
                last_set_number: None,
            },
            Err(err) => {
                warn!(survey_id, %err, "Failed to fetch rotation counter");
                summary.failures += 1;
                return;
            }
        };
        match self.cache.put_rotation_counter(key, counter).await {
            Ok(()) => summary.rotations += 1,
            Err(err) => {
                warn!(survey_id, %err, "Failed to cache rotation counter");
                summary.failures += 1;
            }
        }
    }
}
