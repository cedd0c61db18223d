//! Offline interview store and sync queue
//!
//! Durable persistence for interview records awaiting server acknowledgment,
//! plus the companion retry queue for completion and abandon submissions.
//!
//! Both collections are stored as one serialized blob each over the
//! key-value store port, matching the reference cache layout. Unlike the
//! reference cache, THIS data is the sole durable record of field work:
//! nothing here is rebuildable from the server, and cache clearing never
//! touches these keys.
//!
//! A corrupt blob still degrades to empty with a warning rather than
//! failing reads; a fatal read path here would brick the whole app over one
//! bad write, which is worse for the interviewer than losing the list.

use std::sync::Arc;

use tracing::{debug, warn};

use fieldsync_core::domain::{InterviewId, OfflineInterview, SyncQueueItem, SyncStatus};
use fieldsync_core::ports::IKeyValueStore;

/// Store key for the offline interview list
const INTERVIEWS_KEY: &str = "offline:interviews";
/// Store key for the submission retry queue
const SYNC_QUEUE_KEY: &str = "offline:sync_queue";

/// Durable storage for offline interview records and the sync queue
pub struct OfflineInterviewStore {
    store: Arc<dyn IKeyValueStore>,
}

impl OfflineInterviewStore {
    /// Creates a store over the given key-value backend
    pub fn new(store: Arc<dyn IKeyValueStore>) -> Self {
        Self { store }
    }

    // ========================================================================
    // Interview records
    // ========================================================================

    /// Returns every stored interview, in insertion order
    pub async fn get_all(&self) -> Vec<OfflineInterview> {
        self.load_list(INTERVIEWS_KEY).await
    }

    /// Returns the interview with the given id, if stored
    pub async fn get(&self, id: &InterviewId) -> Option<OfflineInterview> {
        self.get_all()
            .await
            .into_iter()
            .find(|interview| interview.id() == id)
    }

    /// Returns interviews eligible for a push attempt (`Pending` or `Failed`)
    pub async fn get_pending(&self) -> Vec<OfflineInterview> {
        self.get_all()
            .await
            .into_iter()
            .filter(|interview| interview.status().is_pending_work())
            .collect()
    }

    /// Upserts an interview record
    ///
    /// Matching on id: replaces in place when the record exists, appends
    /// otherwise. All status changes flow through this method after the
    /// caller has run the domain transition, so the persisted status can
    /// never skip a state the entity would reject.
    pub async fn save(&self, interview: &OfflineInterview) -> anyhow::Result<()> {
        let mut interviews = self.load_list::<OfflineInterview>(INTERVIEWS_KEY).await;
        match interviews
            .iter_mut()
            .find(|existing| existing.id() == interview.id())
        {
            Some(slot) => *slot = interview.clone(),
            None => interviews.push(interview.clone()),
        }
        debug!(
            interview_id = %interview.id(),
            status = %interview.status(),
            "Saved offline interview"
        );
        self.save_list(INTERVIEWS_KEY, &interviews).await
    }

    /// Applies a status transition to a stored interview and persists it
    ///
    /// Supplying an error implies a failed attempt: the attempt counter is
    /// incremented and the message recorded. This is a pure state change;
    /// it never triggers a network call.
    pub async fn update_status(
        &self,
        id: &InterviewId,
        status: SyncStatus,
        error: Option<&str>,
    ) -> anyhow::Result<()> {
        let mut interview = self
            .get(id)
            .await
            .ok_or_else(|| anyhow::anyhow!("Unknown interview: {id}"))?;
        match (status, error) {
            (SyncStatus::Failed, Some(message)) => interview.record_failure(message)?,
            (target, _) => interview.transition_to(target)?,
        }
        self.save(&interview).await
    }

    /// Deletes an interview record; absent ids are a no-op
    ///
    /// Called after server acknowledgment, or by explicit operator action
    /// on a failed record.
    pub async fn delete(&self, id: &InterviewId) -> anyhow::Result<()> {
        let mut interviews = self.load_list::<OfflineInterview>(INTERVIEWS_KEY).await;
        let before = interviews.len();
        interviews.retain(|interview| interview.id() != id);
        if interviews.len() < before {
            debug!(interview_id = %id, "Deleted offline interview");
        }
        self.save_list(INTERVIEWS_KEY, &interviews).await
    }

    /// Counts stored interviews per status: (pending, syncing, failed)
    ///
    /// Synced records are deleted on acknowledgment, so they never
    /// accumulate and are not reported.
    pub async fn status_counts(&self) -> (usize, usize, usize) {
        let mut pending = 0;
        let mut syncing = 0;
        let mut failed = 0;
        for interview in self.get_all().await {
            match interview.status() {
                SyncStatus::Pending => pending += 1,
                SyncStatus::Syncing => syncing += 1,
                SyncStatus::Failed => failed += 1,
                SyncStatus::Synced => {}
            }
        }
        (pending, syncing, failed)
    }

    // ========================================================================
    // Sync queue
    // ========================================================================

    /// Appends a submission to the retry queue
    pub async fn enqueue(&self, item: SyncQueueItem) -> anyhow::Result<()> {
        let mut queue = self.load_list::<SyncQueueItem>(SYNC_QUEUE_KEY).await;
        debug!(
            interview_id = %item.interview_id,
            submission = ?item.submission_type,
            "Enqueued submission"
        );
        queue.push(item);
        self.save_list(SYNC_QUEUE_KEY, &queue).await
    }

    /// Returns the whole retry queue, oldest first
    pub async fn queue_items(&self) -> Vec<SyncQueueItem> {
        self.load_list(SYNC_QUEUE_KEY).await
    }

    /// Removes every queue item for the given interview
    ///
    /// Called once the submission is acknowledged, or when its interview
    /// record is deleted.
    pub async fn dequeue(&self, interview_id: &InterviewId) -> anyhow::Result<()> {
        let mut queue = self.load_list::<SyncQueueItem>(SYNC_QUEUE_KEY).await;
        queue.retain(|item| &item.interview_id != interview_id);
        self.save_list(SYNC_QUEUE_KEY, &queue).await
    }

    /// Increments the attempt counter on every queue item for the interview
    pub async fn record_queue_attempt(&self, interview_id: &InterviewId) -> anyhow::Result<()> {
        let mut queue = self.load_list::<SyncQueueItem>(SYNC_QUEUE_KEY).await;
        for item in queue
            .iter_mut()
            .filter(|item| &item.interview_id == interview_id)
        {
            item.attempts += 1;
        }
        self.save_list(SYNC_QUEUE_KEY, &queue).await
    }

    // ========================================================================
    // Blob helpers
    // ========================================================================

    async fn load_list<T: serde::de::DeserializeOwned>(&self, key: &str) -> Vec<T> {
        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(list) => list,
                Err(err) => {
                    warn!(key, %err, "Corrupt offline blob, treating as empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(key, %err, "Storage read failed, treating as empty");
                Vec::new()
            }
        }
    }

    async fn save_list<T: serde::Serialize>(&self, key: &str, list: &[T]) -> anyhow::Result<()> {
        let raw = serde_json::to_string(list)?;
        self.store.set(key, &raw).await
    }
}
