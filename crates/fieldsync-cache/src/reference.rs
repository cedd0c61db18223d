//! Namespaced reference data cache
//!
//! Read-through/write-through cache over the key-value store port for the
//! seven reference data families. Each family is persisted as ONE serialized
//! blob under a distinct top-level store key, so bulk family reads/writes
//! never cross-contaminate.
//!
//! Blob format is an ordered `Vec<CacheEntry<T>>`: insertion order is
//! preserved across rewrites, which makes the fallback scans of the fetch
//! layer deterministic.
//!
//! ## Failure policy
//!
//! A corrupt or unreadable blob degrades to "family is empty" with a warning
//! log; reads never fail. Writes propagate storage errors to the caller.
//! The whole reference cache is safe to discard and rebuild from the server
//! at any time; it is never the source of truth.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use fieldsync_core::domain::{
    AcRecord, CacheEntry, CompositeKey, GenderQuota, GpsPoint, PollingGroup, PollingStation,
    RotationCounter, UserProfile,
};
use fieldsync_core::ports::IKeyValueStore;

/// Top-level store keys, one per resource family
pub mod family_keys {
    /// AC master-data records, keyed by (area name)
    pub const AC: &str = "refcache:ac";
    /// Polling-group lists, keyed by (state, area)
    pub const GROUPS: &str = "refcache:groups";
    /// Polling-station lists, keyed by (state, area, group)
    pub const STATIONS: &str = "refcache:stations";
    /// GPS points, keyed by (state, area, group, station)
    pub const GPS: &str = "refcache:gps";
    /// Gender-quota snapshots, keyed by (survey id)
    pub const QUOTA: &str = "refcache:quota";
    /// CATI rotation counters, keyed by (survey id)
    pub const ROTATION: &str = "refcache:rotation";
    /// Current-user profile singleton
    pub const PROFILE: &str = "refcache:profile";
}

/// Scalar marker: when the last interview sync completed
const LAST_SYNC_KEY: &str = "meta:last_sync";
/// Scalar marker: when the last bulk reference download completed
const LAST_DOWNLOAD_KEY: &str = "meta:last_survey_download";

/// Singleton key used for the user-profile family
const PROFILE_SINGLETON: &str = "me";

/// Namespaced cache over the key-value store for reference data families
pub struct ReferenceDataCache {
    store: Arc<dyn IKeyValueStore>,
}

impl ReferenceDataCache {
    /// Creates a cache over the given store
    pub fn new(store: Arc<dyn IKeyValueStore>) -> Self {
        Self { store }
    }

    // ========================================================================
    // Generic family operations
    // ========================================================================

    /// Loads a family blob, degrading corruption or storage errors to empty
    async fn load_family<T: DeserializeOwned>(&self, family_key: &str) -> Vec<CacheEntry<T>> {
        match self.store.get(family_key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(family = family_key, %err, "Corrupt cache blob, treating family as empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(family = family_key, %err, "Storage read failed, treating family as empty");
                Vec::new()
            }
        }
    }

    /// Rewrites a family blob wholesale
    async fn save_family<T: Serialize>(
        &self,
        family_key: &str,
        entries: &[CacheEntry<T>],
    ) -> anyhow::Result<()> {
        let raw = serde_json::to_string(entries)?;
        self.store.set(family_key, &raw).await
    }

    /// Returns the entry under `key` in the given family, if cached
    pub async fn get_in<T: DeserializeOwned>(
        &self,
        family_key: &str,
        key: &CompositeKey,
    ) -> Option<CacheEntry<T>> {
        self.load_family::<T>(family_key)
            .await
            .into_iter()
            .find(|entry| &entry.key == key)
    }

    /// Writes `payload` under `key`, replacing an existing entry in place
    ///
    /// Replacement preserves the entry's position in the blob so fallback
    /// scans stay deterministic; new keys append.
    pub async fn put_in<T: Serialize + DeserializeOwned>(
        &self,
        family_key: &str,
        key: CompositeKey,
        payload: T,
    ) -> anyhow::Result<()> {
        let mut entries = self.load_family::<T>(family_key).await;
        let fresh = CacheEntry::new(key, payload);
        match entries.iter_mut().find(|entry| entry.key == fresh.key) {
            Some(slot) => *slot = fresh,
            None => entries.push(fresh),
        }
        self.save_family(family_key, &entries).await
    }

    /// Writes a batch of entries in ONE store operation
    ///
    /// Used by the bulk downloader to cache a whole group's GPS points
    /// without rewriting the blob once per station.
    pub async fn put_many_in<T: Serialize + DeserializeOwned>(
        &self,
        family_key: &str,
        items: Vec<(CompositeKey, T)>,
    ) -> anyhow::Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        let mut entries = self.load_family::<T>(family_key).await;
        for (key, payload) in items {
            let fresh = CacheEntry::new(key, payload);
            match entries.iter_mut().find(|entry| entry.key == fresh.key) {
                Some(slot) => *slot = fresh,
                None => entries.push(fresh),
            }
        }
        self.save_family(family_key, &entries).await
    }

    /// Returns every entry in the family, in insertion order
    ///
    /// Used by diagnostic views and the last-resort fallback scans.
    pub async fn all_in<T: DeserializeOwned>(&self, family_key: &str) -> Vec<CacheEntry<T>> {
        self.load_family(family_key).await
    }

    // ========================================================================
    // Typed family accessors
    // ========================================================================

    /// Cached AC record for an area, if present
    pub async fn ac_record(&self, key: &CompositeKey) -> Option<CacheEntry<AcRecord>> {
        self.get_in(family_keys::AC, key).await
    }

    /// Caches an AC record
    pub async fn put_ac_record(&self, key: CompositeKey, record: AcRecord) -> anyhow::Result<()> {
        self.put_in(family_keys::AC, key, record).await
    }

    /// Every cached AC record, in insertion order
    pub async fn all_ac_records(&self) -> Vec<CacheEntry<AcRecord>> {
        self.all_in(family_keys::AC).await
    }

    /// Cached polling-group list for (state, area), if present
    pub async fn polling_groups(
        &self,
        key: &CompositeKey,
    ) -> Option<CacheEntry<Vec<PollingGroup>>> {
        self.get_in(family_keys::GROUPS, key).await
    }

    /// Caches a polling-group list
    pub async fn put_polling_groups(
        &self,
        key: CompositeKey,
        groups: Vec<PollingGroup>,
    ) -> anyhow::Result<()> {
        self.put_in(family_keys::GROUPS, key, groups).await
    }

    /// Every cached polling-group list, in insertion order
    pub async fn all_polling_groups(&self) -> Vec<CacheEntry<Vec<PollingGroup>>> {
        self.all_in(family_keys::GROUPS).await
    }

    /// Cached polling-station list for (state, area, group), if present
    pub async fn polling_stations(
        &self,
        key: &CompositeKey,
    ) -> Option<CacheEntry<Vec<PollingStation>>> {
        self.get_in(family_keys::STATIONS, key).await
    }

    /// Caches a polling-station list
    pub async fn put_polling_stations(
        &self,
        key: CompositeKey,
        stations: Vec<PollingStation>,
    ) -> anyhow::Result<()> {
        self.put_in(family_keys::STATIONS, key, stations).await
    }

    /// Every cached polling-station list, in insertion order
    pub async fn all_polling_stations(&self) -> Vec<CacheEntry<Vec<PollingStation>>> {
        self.all_in(family_keys::STATIONS).await
    }

    /// Cached GPS point for (state, area, group, station), if present
    pub async fn gps_point(&self, key: &CompositeKey) -> Option<CacheEntry<GpsPoint>> {
        self.get_in(family_keys::GPS, key).await
    }

    /// Caches one GPS point
    pub async fn put_gps_point(&self, key: CompositeKey, point: GpsPoint) -> anyhow::Result<()> {
        self.put_in(family_keys::GPS, key, point).await
    }

    /// Caches a batch of GPS points in one store write
    pub async fn put_gps_points(
        &self,
        points: Vec<(CompositeKey, GpsPoint)>,
    ) -> anyhow::Result<()> {
        self.put_many_in(family_keys::GPS, points).await
    }

    /// Every cached GPS point, in insertion order
    pub async fn all_gps_points(&self) -> Vec<CacheEntry<GpsPoint>> {
        self.all_in(family_keys::GPS).await
    }

    /// Cached gender quota for a survey, if present
    pub async fn gender_quota(&self, key: &CompositeKey) -> Option<CacheEntry<GenderQuota>> {
        self.get_in(family_keys::QUOTA, key).await
    }

    /// Caches a gender-quota snapshot
    pub async fn put_gender_quota(
        &self,
        key: CompositeKey,
        quota: GenderQuota,
    ) -> anyhow::Result<()> {
        self.put_in(family_keys::QUOTA, key, quota).await
    }

    /// Cached rotation counter for a survey, if present
    pub async fn rotation_counter(
        &self,
        key: &CompositeKey,
    ) -> Option<CacheEntry<RotationCounter>> {
        self.get_in(family_keys::ROTATION, key).await
    }

    /// Caches a rotation counter
    pub async fn put_rotation_counter(
        &self,
        key: CompositeKey,
        counter: RotationCounter,
    ) -> anyhow::Result<()> {
        self.put_in(family_keys::ROTATION, key, counter).await
    }

    /// Cached user profile, if present
    pub async fn user_profile(&self) -> Option<CacheEntry<UserProfile>> {
        let key = CompositeKey::single(PROFILE_SINGLETON).ok()?;
        self.get_in(family_keys::PROFILE, &key).await
    }

    /// Caches the user profile
    pub async fn put_user_profile(&self, profile: UserProfile) -> anyhow::Result<()> {
        let key = CompositeKey::single(PROFILE_SINGLETON)
            .map_err(|e| anyhow::anyhow!("profile key: {e}"))?;
        self.put_in(family_keys::PROFILE, key, profile).await
    }

    // ========================================================================
    // Scalar markers and clearing
    // ========================================================================

    /// When the last interview sync completed, if ever
    pub async fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.read_timestamp(LAST_SYNC_KEY).await
    }

    /// Stamps the last-sync marker with the current time
    pub async fn mark_sync_now(&self) -> anyhow::Result<()> {
        self.store
            .set(LAST_SYNC_KEY, &Utc::now().to_rfc3339())
            .await
    }

    /// When the last bulk reference download completed, if ever
    pub async fn last_survey_download(&self) -> Option<DateTime<Utc>> {
        self.read_timestamp(LAST_DOWNLOAD_KEY).await
    }

    /// Stamps the last-download marker with the current time
    pub async fn mark_survey_download_now(&self) -> anyhow::Result<()> {
        self.store
            .set(LAST_DOWNLOAD_KEY, &Utc::now().to_rfc3339())
            .await
    }

    async fn read_timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        let raw = self.store.get(key).await.ok().flatten()?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }

    /// Discards every reference data family and both scalar markers
    ///
    /// The reference cache is a pure cache, always rebuildable from the
    /// server. Offline interview records and the sync queue live under
    /// different keys and are deliberately NOT touched here.
    pub async fn clear_reference_data(&self) -> anyhow::Result<()> {
        self.store
            .remove_many(&[
                family_keys::AC,
                family_keys::GROUPS,
                family_keys::STATIONS,
                family_keys::GPS,
                family_keys::QUOTA,
                family_keys::ROTATION,
                family_keys::PROFILE,
                LAST_SYNC_KEY,
                LAST_DOWNLOAD_KEY,
            ])
            .await
    }
}
