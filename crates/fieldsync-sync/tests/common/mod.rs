//! In-memory mock implementations of the ports for orchestration tests.

// Not every test binary exercises every helper
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use fieldsync_core::domain::{
    AcRecord, GenderQuota, PollingGroup, PollingStation, RemoteError, RotationCounter, UserProfile,
};
use fieldsync_core::ports::{
    AckReceipt, IConnectivityProbe, IKeyValueStore, IRemoteDataSource,
};

// ============================================================================
// MemoryStore
// ============================================================================

/// HashMap-backed key-value store
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

#[async_trait::async_trait]
impl IKeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn remove_many(&self, keys: &[&str]) -> anyhow::Result<()> {
        let mut entries = self.entries.lock().unwrap();
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

// ============================================================================
// StaticProbe
// ============================================================================

/// Probe answering a fixed, switchable online state
pub struct StaticProbe(pub AtomicBool);

impl StaticProbe {
    pub fn online() -> Self {
        Self(AtomicBool::new(true))
    }

    pub fn offline() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn set_online(&self, online: bool) {
        self.0.store(online, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl IConnectivityProbe for StaticProbe {
    async fn is_online(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// MockRemote
// ============================================================================

/// Programmable remote data source with call counting
///
/// Unknown resources answer `NotFound`; flipping `network_down` makes every
/// call fail with a `Network` error instead. An optional per-call delay
/// keeps a crawl in flight long enough for concurrency tests.
#[derive(Default)]
pub struct MockRemote {
    pub ac_records: Mutex<HashMap<String, AcRecord>>,
    pub groups: Mutex<HashMap<(String, String), Vec<PollingGroup>>>,
    pub stations: Mutex<HashMap<(String, String, String), Vec<PollingStation>>>,
    pub quotas: Mutex<HashMap<String, GenderQuota>>,
    pub rotations: Mutex<HashMap<String, RotationCounter>>,
    pub profile: Mutex<Option<UserProfile>>,
    pub network_down: AtomicBool,
    pub submissions_fail: AtomicBool,
    pub delay: Mutex<Option<Duration>>,
    pub fetch_calls: AtomicUsize,
    pub submit_calls: AtomicUsize,
    pub abandon_calls: AtomicUsize,
}

impl MockRemote {
    pub fn add_ac(&self, record: AcRecord) {
        self.ac_records
            .lock()
            .unwrap()
            .insert(record.name.clone(), record);
    }

    pub fn add_groups(&self, state: &str, area: &str, names: &[&str]) {
        self.groups.lock().unwrap().insert(
            (state.to_string(), area.to_string()),
            names
                .iter()
                .map(|n| PollingGroup {
                    name: n.to_string(),
                })
                .collect(),
        );
    }

    pub fn add_stations(&self, state: &str, area: &str, group: &str, stations: Vec<PollingStation>) {
        self.stations.lock().unwrap().insert(
            (state.to_string(), area.to_string(), group.to_string()),
            stations,
        );
    }

    async fn gate(&self) -> Result<(), RemoteError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.network_down.load(Ordering::SeqCst) {
            return Err(RemoteError::Network("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl IRemoteDataSource for MockRemote {
    async fn fetch_ac_record(&self, area_name: &str) -> Result<AcRecord, RemoteError> {
        self.gate().await?;
        self.ac_records
            .lock()
            .unwrap()
            .get(area_name)
            .cloned()
            .ok_or(RemoteError::NotFound)
    }

    async fn fetch_polling_groups(
        &self,
        state: &str,
        area: &str,
    ) -> Result<Vec<PollingGroup>, RemoteError> {
        self.gate().await?;
        self.groups
            .lock()
            .unwrap()
            .get(&(state.to_string(), area.to_string()))
            .cloned()
            .ok_or(RemoteError::NotFound)
    }

    async fn fetch_polling_stations(
        &self,
        state: &str,
        area: &str,
        group: &str,
    ) -> Result<Vec<PollingStation>, RemoteError> {
        self.gate().await?;
        self.stations
            .lock()
            .unwrap()
            .get(&(state.to_string(), area.to_string(), group.to_string()))
            .cloned()
            .ok_or(RemoteError::NotFound)
    }

    async fn fetch_gender_quota(&self, survey_id: &str) -> Result<GenderQuota, RemoteError> {
        self.gate().await?;
        self.quotas
            .lock()
            .unwrap()
            .get(survey_id)
            .cloned()
            .ok_or(RemoteError::NotFound)
    }

    async fn fetch_rotation_counter(
        &self,
        survey_id: &str,
    ) -> Result<RotationCounter, RemoteError> {
        self.gate().await?;
        self.rotations
            .lock()
            .unwrap()
            .get(survey_id)
            .cloned()
            .ok_or(RemoteError::NotFound)
    }

    async fn fetch_user_profile(&self) -> Result<UserProfile, RemoteError> {
        self.gate().await?;
        self.profile
            .lock()
            .unwrap()
            .clone()
            .ok_or(RemoteError::NotFound)
    }

    async fn submit_interview(
        &self,
        _payload: &serde_json::Value,
    ) -> Result<AckReceipt, RemoteError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if self.network_down.load(Ordering::SeqCst) || self.submissions_fail.load(Ordering::SeqCst)
        {
            return Err(RemoteError::Network("connection refused".to_string()));
        }
        Ok(AckReceipt {
            server_id: format!("srv-{}", self.submit_calls.load(Ordering::SeqCst)),
            accepted_at: "2026-08-30T10:00:00Z".to_string(),
        })
    }

    async fn submit_abandon(&self, _payload: &serde_json::Value) -> Result<AckReceipt, RemoteError> {
        self.abandon_calls.fetch_add(1, Ordering::SeqCst);
        if self.network_down.load(Ordering::SeqCst) || self.submissions_fail.load(Ordering::SeqCst)
        {
            return Err(RemoteError::Network("connection refused".to_string()));
        }
        Ok(AckReceipt {
            server_id: "srv-abandon".to_string(),
            accepted_at: "2026-08-30T10:00:00Z".to_string(),
        })
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn ac(name: &str) -> AcRecord {
    AcRecord {
        name: name.to_string(),
        state: "WB".to_string(),
        representatives: vec!["N. Roy".to_string()],
        election_scheduled: true,
        reserved: name.contains("(SC)"),
    }
}

pub fn station(name: &str, lat: f64, lon: f64) -> PollingStation {
    PollingStation {
        name: name.to_string(),
        number: None,
        gps: Some(fieldsync_core::domain::GpsPoint {
            latitude: lat,
            longitude: lon,
            description: None,
        }),
    }
}
