//! Read-through cached fetching
//!
//! Every reference data read in the app goes through [`CachedFetcher`],
//! which applies one strict policy:
//!
//! 1. Exact cache hit wins, always: the key as supplied first, then the
//!    normalized spelling.
//! 2. Cache miss while offline falls through to a case-insensitive scan of
//!    the family before surfacing `FetchError::OfflineNoCache`.
//! 3. Cache miss while online fetches remotely under the normalized name,
//!    retrying once with the raw name on a remote 404, and writes through
//!    to the cache before returning. Write-through is mandatory so the next
//!    offline read of the same resource succeeds.
//!
//! A network failure during (3) falls back to the scan of (2) as well:
//! stale cached data is preferred over a hard failure wherever any cached
//! candidate exists.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use fieldsync_cache::ReferenceDataCache;
use fieldsync_core::domain::{
    AcRecord, CacheEntry, CompositeKey, FetchError, GenderQuota, GpsPoint, PollingGroup,
    PollingStation, RemoteError, RotationCounter, UserProfile,
};
use fieldsync_core::normalizer::normalize;
use fieldsync_core::ports::{IConnectivityProbe, IRemoteDataSource};

/// A fetch result with its cache provenance
///
/// `cached_at` is `None` when the payload came fresh from the network, and
/// carries the cache write time otherwise so callers can surface staleness.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    /// The fetched payload
    pub value: T,
    /// When the payload was cached; `None` means fresh from network
    pub cached_at: Option<DateTime<Utc>>,
}

impl<T> Fetched<T> {
    fn fresh(value: T) -> Self {
        Self {
            value,
            cached_at: None,
        }
    }

    fn cached(entry: CacheEntry<T>) -> Self {
        Self {
            value: entry.payload,
            cached_at: Some(entry.cached_at),
        }
    }

    /// Returns true if the payload was served from cache
    pub fn is_from_cache(&self) -> bool {
        self.cached_at.is_some()
    }
}

/// Read-through fetcher over the reference cache and remote API
pub struct CachedFetcher {
    cache: Arc<ReferenceDataCache>,
    remote: Arc<dyn IRemoteDataSource>,
    probe: Arc<dyn IConnectivityProbe>,
}

/// Case-insensitive area comparison used by the last-resort scan tier
fn area_matches(component: &str, raw: &str, normalized: &str) -> bool {
    let c = component.trim().to_lowercase();
    c == raw.trim().to_lowercase() || c == normalized.trim().to_lowercase()
}

impl CachedFetcher {
    /// Creates a fetcher over the given cache and ports
    pub fn new(
        cache: Arc<ReferenceDataCache>,
        remote: Arc<dyn IRemoteDataSource>,
        probe: Arc<dyn IConnectivityProbe>,
    ) -> Self {
        Self {
            cache,
            remote,
            probe,
        }
    }

    // ========================================================================
    // AC metadata
    // ========================================================================

    /// Fetches the AC record for an area by any of its known spellings
    pub async fn ac_record(&self, raw_name: &str) -> Result<Fetched<AcRecord>, FetchError> {
        let raw = raw_name.trim();
        let normalized = normalize(raw);

        // The key as supplied wins over the normalized spelling when both
        // are cached
        if let Ok(key) = CompositeKey::single(raw) {
            if let Some(entry) = self.cache.ac_record(&key).await {
                return Ok(Fetched::cached(entry));
            }
        }
        // A name carrying the key separator cannot exist in the cache or
        // the master data
        let norm_key = CompositeKey::single(&normalized).map_err(|_| FetchError::NotFound)?;
        if normalized != raw {
            if let Some(entry) = self.cache.ac_record(&norm_key).await {
                return Ok(Fetched::cached(entry));
            }
        }

        if !self.probe.is_online().await {
            return match self.ac_scan(raw, &normalized).await {
                Some(entry) => Ok(Fetched::cached(entry)),
                None => Err(FetchError::OfflineNoCache),
            };
        }

        match self.fetch_ac_remote(raw, &normalized).await {
            Ok(record) => {
                // Cache under the server's canonical spelling
                let canonical = if record.name.trim().is_empty() {
                    normalized.clone()
                } else {
                    record.name.clone()
                };
                self.write_through_ac(&canonical, record.clone()).await;
                Ok(Fetched::fresh(record))
            }
            Err(err) if err.is_network() => match self.ac_scan(raw, &normalized).await {
                Some(entry) => {
                    debug!(area = raw, "Serving stale AC record after network failure");
                    Ok(Fetched::cached(entry))
                }
                None => Err(err.into()),
            },
            Err(err) => Err(err.into()),
        }
    }

    /// Remote AC fetch: normalized name first, raw name on a 404
    async fn fetch_ac_remote(&self, raw: &str, normalized: &str) -> Result<AcRecord, RemoteError> {
        match self.remote.fetch_ac_record(normalized).await {
            Err(RemoteError::NotFound) if raw != normalized => {
                debug!(raw, normalized, "Normalized name unknown remotely, retrying raw");
                self.remote.fetch_ac_record(raw).await
            }
            other => other,
        }
    }

    async fn write_through_ac(&self, canonical: &str, record: AcRecord) {
        let Ok(key) = CompositeKey::single(canonical) else {
            warn!(area = canonical, "Cannot build cache key for AC record");
            return;
        };
        if let Err(err) = self.cache.put_ac_record(key, record).await {
            warn!(area = canonical, %err, "Write-through of AC record failed");
        }
    }

    /// Last-resort tier: case-insensitive scan over every cached AC record
    ///
    /// Both exact keys were already tried before this runs.
    async fn ac_scan(&self, raw: &str, normalized: &str) -> Option<CacheEntry<AcRecord>> {
        self.cache
            .all_ac_records()
            .await
            .into_iter()
            .find(|entry| {
                entry
                    .key
                    .components()
                    .first()
                    .is_some_and(|c| area_matches(c, raw, normalized))
            })
    }

    // ========================================================================
    // Polling groups
    // ========================================================================

    /// Fetches the polling-group list for (state, area)
    pub async fn polling_groups(
        &self,
        state: &str,
        raw_area: &str,
    ) -> Result<Fetched<Vec<PollingGroup>>, FetchError> {
        let raw = raw_area.trim();
        let normalized = normalize(raw);

        if let Ok(key) = CompositeKey::new(&[state, raw]) {
            if let Some(entry) = self.cache.polling_groups(&key).await {
                return Ok(Fetched::cached(entry));
            }
        }
        let norm_key = CompositeKey::new(&[state, &normalized]).map_err(|_| FetchError::NotFound)?;
        if normalized != raw {
            if let Some(entry) = self.cache.polling_groups(&norm_key).await {
                return Ok(Fetched::cached(entry));
            }
        }

        if !self.probe.is_online().await {
            return match self.groups_scan(state, raw, &normalized).await {
                Some(entry) => Ok(Fetched::cached(entry)),
                None => Err(FetchError::OfflineNoCache),
            };
        }

        let (area_used, result) = self.fetch_groups_remote(state, raw, &normalized).await;
        match result {
            Ok(groups) => {
                if let Ok(key) = CompositeKey::new(&[state, &area_used]) {
                    if let Err(err) = self.cache.put_polling_groups(key, groups.clone()).await {
                        warn!(state, area = %area_used, %err, "Write-through of groups failed");
                    }
                }
                Ok(Fetched::fresh(groups))
            }
            Err(err) if err.is_network() => {
                match self.groups_scan(state, raw, &normalized).await {
                    Some(entry) => Ok(Fetched::cached(entry)),
                    None => Err(err.into()),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn fetch_groups_remote(
        &self,
        state: &str,
        raw: &str,
        normalized: &str,
    ) -> (String, Result<Vec<PollingGroup>, RemoteError>) {
        match self.remote.fetch_polling_groups(state, normalized).await {
            Err(RemoteError::NotFound) if raw != normalized => {
                (raw.to_string(), self.remote.fetch_polling_groups(state, raw).await)
            }
            other => (normalized.to_string(), other),
        }
    }

    /// Case-insensitive scan over every cached group list for the state
    async fn groups_scan(
        &self,
        state: &str,
        raw: &str,
        normalized: &str,
    ) -> Option<CacheEntry<Vec<PollingGroup>>> {
        self.cache
            .all_polling_groups()
            .await
            .into_iter()
            .find(|entry| {
                let components = entry.key.components();
                components.first() == Some(&state)
                    && components
                        .get(1)
                        .is_some_and(|c| area_matches(c, raw, normalized))
            })
    }

    // ========================================================================
    // Polling stations
    // ========================================================================

    /// Fetches the polling-station list for (state, area, group)
    pub async fn polling_stations(
        &self,
        state: &str,
        raw_area: &str,
        group: &str,
    ) -> Result<Fetched<Vec<PollingStation>>, FetchError> {
        let raw = raw_area.trim();
        let normalized = normalize(raw);

        if let Ok(key) = CompositeKey::new(&[state, raw, group]) {
            if let Some(entry) = self.cache.polling_stations(&key).await {
                return Ok(Fetched::cached(entry));
            }
        }
        let norm_key =
            CompositeKey::new(&[state, &normalized, group]).map_err(|_| FetchError::NotFound)?;
        if normalized != raw {
            if let Some(entry) = self.cache.polling_stations(&norm_key).await {
                return Ok(Fetched::cached(entry));
            }
        }

        if !self.probe.is_online().await {
            return match self.stations_scan(state, raw, &normalized, group).await {
                Some(entry) => Ok(Fetched::cached(entry)),
                None => Err(FetchError::OfflineNoCache),
            };
        }

        let (area_used, result) = match self
            .remote
            .fetch_polling_stations(state, &normalized, group)
            .await
        {
            Err(RemoteError::NotFound) if raw != normalized => (
                raw.to_string(),
                self.remote.fetch_polling_stations(state, raw, group).await,
            ),
            other => (normalized.clone(), other),
        };

        match result {
            Ok(stations) => {
                if let Ok(key) = CompositeKey::new(&[state, &area_used, group]) {
                    if let Err(err) = self.cache.put_polling_stations(key, stations.clone()).await
                    {
                        warn!(state, area = %area_used, group, %err, "Write-through of stations failed");
                    }
                }
                Ok(Fetched::fresh(stations))
            }
            Err(err) if err.is_network() => {
                match self.stations_scan(state, raw, &normalized, group).await {
                    Some(entry) => Ok(Fetched::cached(entry)),
                    None => Err(err.into()),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Case-insensitive scan over cached station lists for (state, group)
    async fn stations_scan(
        &self,
        state: &str,
        raw: &str,
        normalized: &str,
        group: &str,
    ) -> Option<CacheEntry<Vec<PollingStation>>> {
        self.cache
            .all_polling_stations()
            .await
            .into_iter()
            .find(|entry| {
                let components = entry.key.components();
                components.first() == Some(&state)
                    && components.get(2) == Some(&group)
                    && components
                        .get(1)
                        .is_some_and(|c| area_matches(c, raw, normalized))
            })
    }

    // ========================================================================
    // GPS points
    // ========================================================================

    /// Fetches GPS points for every station in a group
    ///
    /// GPS arrives inline with the stations list, so the remote branch
    /// fetches stations and extracts coordinates; the extracted batch is
    /// cached in one store write.
    pub async fn gps_points(
        &self,
        state: &str,
        raw_area: &str,
        group: &str,
    ) -> Result<Fetched<Vec<(String, GpsPoint)>>, FetchError> {
        let raw = raw_area.trim();
        let normalized = normalize(raw);

        for area in [raw, normalized.as_str()] {
            let cached = self.gps_scan(state, area, group).await;
            if !cached.is_empty() {
                let oldest = cached.iter().map(|e| e.cached_at).min();
                let points = cached
                    .into_iter()
                    .filter_map(|entry| {
                        let station = entry.key.components().get(3)?.to_string();
                        Some((station, entry.payload))
                    })
                    .collect();
                return Ok(Fetched {
                    value: points,
                    cached_at: oldest,
                });
            }
        }

        if !self.probe.is_online().await {
            return Err(FetchError::OfflineNoCache);
        }

        // Remote path: stations carry GPS inline
        let stations = self.polling_stations(state, raw_area, group).await?;
        let points: Vec<(String, GpsPoint)> = stations
            .value
            .into_iter()
            .filter_map(|station| Some((station.name.clone(), station.gps?)))
            .collect();

        let batch: Vec<(CompositeKey, GpsPoint)> = points
            .iter()
            .filter_map(|(station, gps)| {
                CompositeKey::new(&[state, &normalized, group, station])
                    .ok()
                    .map(|key| (key, gps.clone()))
            })
            .collect();
        if let Err(err) = self.cache.put_gps_points(batch).await {
            warn!(state, area = %normalized, group, %err, "Write-through of GPS batch failed");
        }

        Ok(Fetched::fresh(points))
    }

    /// All cached GPS entries under the (state, area, group) prefix
    async fn gps_scan(&self, state: &str, area: &str, group: &str) -> Vec<CacheEntry<GpsPoint>> {
        self.cache
            .all_gps_points()
            .await
            .into_iter()
            .filter(|entry| {
                let components = entry.key.components();
                components.first() == Some(&state)
                    && components
                        .get(1)
                        .is_some_and(|c| c.trim().eq_ignore_ascii_case(area.trim()))
                    && components.get(2) == Some(&group)
            })
            .collect()
    }

    // ========================================================================
    // Survey-keyed families
    // ========================================================================

    /// Fetches the gender-quota snapshot for a survey
    pub async fn gender_quota(&self, survey_id: &str) -> Result<Fetched<GenderQuota>, FetchError> {
        let key = CompositeKey::single(survey_id).map_err(|_| FetchError::NotFound)?;
        if let Some(entry) = self.cache.gender_quota(&key).await {
            return Ok(Fetched::cached(entry));
        }

        if !self.probe.is_online().await {
            return Err(FetchError::OfflineNoCache);
        }

        let quota = self.remote.fetch_gender_quota(survey_id).await?;
        if let Err(err) = self.cache.put_gender_quota(key, quota.clone()).await {
            warn!(survey_id, %err, "Write-through of gender quota failed");
        }
        Ok(Fetched::fresh(quota))
    }

    /// Fetches the CATI rotation counter for a survey
    ///
    /// A remote 404 means "no prior interviews" and is SUCCESS with
    /// `last_set_number: None`; the caller defaults to set 1.
    pub async fn rotation_counter(
        &self,
        survey_id: &str,
    ) -> Result<Fetched<RotationCounter>, FetchError> {
        let key = CompositeKey::single(survey_id).map_err(|_| FetchError::NotFound)?;
        if let Some(entry) = self.cache.rotation_counter(&key).await {
            return Ok(Fetched::cached(entry));
        }

        if !self.probe.is_online().await {
            return Err(FetchError::OfflineNoCache);
        }

        match self.remote.fetch_rotation_counter(survey_id).await {
            Ok(counter) => {
                if let Err(err) = self.cache.put_rotation_counter(key, counter.clone()).await {
                    warn!(survey_id, %err, "Write-through of rotation counter failed");
                }
                Ok(Fetched::fresh(counter))
            }
            Err(RemoteError::NotFound) => Ok(Fetched::fresh(RotationCounter {
                last_set_number: None,
            })),
            Err(err) => Err(err.into()),
        }
    }

    /// Fetches the current user's profile
    pub async fn user_profile(&self) -> Result<Fetched<UserProfile>, FetchError> {
        if let Some(entry) = self.cache.user_profile().await {
            return Ok(Fetched::cached(entry));
        }

        if !self.probe.is_online().await {
            return Err(FetchError::OfflineNoCache);
        }

        let profile = self.remote.fetch_user_profile().await?;
        if let Err(err) = self.cache.put_user_profile(profile.clone()).await {
            warn!(%err, "Write-through of user profile failed");
        }
        Ok(Fetched::fresh(profile))
    }
}
