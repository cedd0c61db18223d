//! Survey server API client
//!
//! All endpoint construction, authentication headers, timeouts, and status
//! classification live here. Path segments are pushed through the URL
//! builder so area and group names containing spaces or parentheses are
//! percent-encoded correctly.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};

use fieldsync_core::domain::{
    AcRecord, GenderQuota, GroupEntry, PollingGroup, PollingStation, RemoteError, RotationCounter,
    UserProfile,
};
use fieldsync_core::ports::{AckReceipt, ICredentialStore, IRemoteDataSource};

/// Authenticated client for the survey server REST API
pub struct SurveyApiClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Arc<dyn ICredentialStore>,
    /// Timeout for reference data fetches
    fetch_timeout: Duration,
    /// Timeout for interview submissions; uploads carry full response
    /// payloads and sometimes audio references, so they get longer
    upload_timeout: Duration,
}

impl SurveyApiClient {
    /// Creates a client against the given server base URL
    pub fn new(
        base_url: &str,
        credentials: Arc<dyn ICredentialStore>,
        fetch_timeout: Duration,
        upload_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| anyhow::anyhow!("Invalid server base URL {base_url}: {e}"))?;
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url,
            credentials,
            fetch_timeout,
            upload_timeout,
        })
    }

    /// Builds an endpoint URL from percent-encoded path segments
    fn endpoint(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| RemoteError::Protocol("Base URL cannot carry a path".to_string()))?;
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    /// Returns the bearer token, if the user is authenticated
    async fn token(&self) -> Result<Option<String>, RemoteError> {
        self.credentials
            .get_token()
            .await
            .map_err(|e| RemoteError::Protocol(format!("Credential store failure: {e}")))
    }

    /// Classifies a non-success status into a `RemoteError`
    fn classify_status(status: StatusCode) -> RemoteError {
        match status {
            StatusCode::NOT_FOUND => RemoteError::NotFound,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Unauthorized,
            s if s.is_server_error() => RemoteError::Network(format!("Server error: {s}")),
            s => RemoteError::Protocol(format!("Unexpected status: {s}")),
        }
    }

    /// Maps a transport-level reqwest failure
    fn classify_transport(err: reqwest::Error) -> RemoteError {
        RemoteError::Network(err.to_string())
    }

    /// Deserializes a successful response body
    async fn parse_body<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
        response
            .json::<T>()
            .await
            .map_err(|e| RemoteError::Protocol(format!("Malformed response body: {e}")))
    }

    /// GETs an endpoint and deserializes the JSON body
    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, RemoteError> {
        let url = self.endpoint(segments)?;
        trace!(%url, "GET");

        let mut request = self.http.get(url).timeout(self.fetch_timeout);
        if let Some(token) = self.token().await? {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(Self::classify_transport)?;
        if !response.status().is_success() {
            return Err(Self::classify_status(response.status()));
        }
        Self::parse_body(response).await
    }

    /// POSTs a JSON payload and deserializes the JSON body
    async fn post_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        payload: &serde_json::Value,
    ) -> Result<T, RemoteError> {
        let url = self.endpoint(segments)?;
        debug!(%url, "POST");

        let mut request = self
            .http
            .post(url)
            .timeout(self.upload_timeout)
            .json(payload);
        if let Some(token) = self.token().await? {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(Self::classify_transport)?;
        if !response.status().is_success() {
            return Err(Self::classify_status(response.status()));
        }
        Self::parse_body(response).await
    }
}

#[async_trait::async_trait]
impl IRemoteDataSource for SurveyApiClient {
    async fn fetch_ac_record(&self, area_name: &str) -> Result<AcRecord, RemoteError> {
        self.get_json(&["api", "ac", area_name]).await
    }

    async fn fetch_polling_groups(
        &self,
        state: &str,
        area: &str,
    ) -> Result<Vec<PollingGroup>, RemoteError> {
        let entries: Vec<GroupEntry> = self
            .get_json(&["api", "areas", state, area, "groups"])
            .await?;

        // The endpoint mixes string and object shapes; unusable entries are
        // skipped rather than failing the whole list
        let total = entries.len();
        let groups: Vec<PollingGroup> = entries
            .into_iter()
            .filter_map(GroupEntry::into_group)
            .collect();
        if groups.len() < total {
            warn!(
                area,
                skipped = total - groups.len(),
                "Skipped unusable group entries"
            );
        }
        Ok(groups)
    }

    async fn fetch_polling_stations(
        &self,
        state: &str,
        area: &str,
        group: &str,
    ) -> Result<Vec<PollingStation>, RemoteError> {
        self.get_json(&["api", "areas", state, area, "groups", group, "stations"])
            .await
    }

    async fn fetch_gender_quota(&self, survey_id: &str) -> Result<GenderQuota, RemoteError> {
        self.get_json(&["api", "surveys", survey_id, "gender-quota"])
            .await
    }

    async fn fetch_rotation_counter(
        &self,
        survey_id: &str,
    ) -> Result<RotationCounter, RemoteError> {
        self.get_json(&["api", "surveys", survey_id, "rotation"])
            .await
    }

    async fn fetch_user_profile(&self) -> Result<UserProfile, RemoteError> {
        self.get_json(&["api", "profile"]).await
    }

    async fn submit_interview(
        &self,
        payload: &serde_json::Value,
    ) -> Result<AckReceipt, RemoteError> {
        self.post_json(&["api", "interviews"], payload).await
    }

    async fn submit_abandon(&self, payload: &serde_json::Value) -> Result<AckReceipt, RemoteError> {
        self.post_json(&["api", "interviews", "abandon"], payload)
            .await
    }
}
