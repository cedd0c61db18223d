//! HTTP connectivity probe
//!
//! A reachability check against the server's health endpoint, used
//! system-wide to pick between the read-through and offline-only branches.
//! The probe must be fast and conservative: a slow answer is the same as no
//! answer, because a fetch that would hang past the probe timeout is worse
//! for the interviewer than serving cached data.

use std::time::Duration;

use reqwest::Url;
use tracing::{debug, trace};

use fieldsync_core::ports::IConnectivityProbe;

/// Default probe timeout; anything slower counts as offline
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Reachability probe against the server's `/health` endpoint
pub struct HttpConnectivityProbe {
    http: reqwest::Client,
    health_url: Url,
    timeout: Duration,
}

impl HttpConnectivityProbe {
    /// Creates a probe for the given server base URL
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| anyhow::anyhow!("Invalid server base URL {base_url}: {e}"))?;
        let health_url = base
            .join("health")
            .map_err(|e| anyhow::anyhow!("Cannot build health URL: {e}"))?;
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            health_url,
            timeout,
        })
    }
}

#[async_trait::async_trait]
impl IConnectivityProbe for HttpConnectivityProbe {
    async fn is_online(&self) -> bool {
        let result = self
            .http
            .head(self.health_url.clone())
            .timeout(self.timeout)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                trace!("Connectivity probe succeeded");
                true
            }
            Ok(response) => {
                debug!(status = %response.status(), "Connectivity probe rejected");
                false
            }
            Err(err) => {
                debug!(%err, "Connectivity probe failed");
                false
            }
        }
    }
}
