//! Interview submission and retry
//!
//! Pushes pending interviews to the server and drains the companion retry
//! queue. There is no timer here; invocation is external (the `sync` CLI
//! command or a connectivity-restored hook), and repeated invocation for
//! the same interview is safe: records already `Syncing` are skipped, so a
//! racing second pass cannot double-submit.

use std::sync::Arc;

use tracing::{debug, info, warn};

use fieldsync_cache::{OfflineInterviewStore, ReferenceDataCache};
use fieldsync_core::domain::{
    InterviewId, OfflineInterview, SubmissionType, SyncQueueItem, SyncStatus,
};
use fieldsync_core::ports::{IConnectivityProbe, IRemoteDataSource};

/// Outcome of one sync pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// True when the device was offline and nothing was attempted
    pub offline: bool,
    /// Interviews acknowledged and deleted
    pub synced: usize,
    /// Interviews that failed and were marked for retry
    pub failed: usize,
    /// Queue items delivered and removed
    pub queue_drained: usize,
    /// Queue items that failed delivery
    pub queue_failed: usize,
}

/// Pushes offline interviews and queued submissions to the server
pub struct Submitter {
    interviews: Arc<OfflineInterviewStore>,
    cache: Arc<ReferenceDataCache>,
    remote: Arc<dyn IRemoteDataSource>,
    probe: Arc<dyn IConnectivityProbe>,
}

impl Submitter {
    /// Creates a submitter over the given stores and ports
    pub fn new(
        interviews: Arc<OfflineInterviewStore>,
        cache: Arc<ReferenceDataCache>,
        remote: Arc<dyn IRemoteDataSource>,
        probe: Arc<dyn IConnectivityProbe>,
    ) -> Self {
        Self {
            interviews,
            cache,
            remote,
            probe,
        }
    }

    /// Pushes every pending/failed interview, then drains the retry queue
    ///
    /// Offline short-circuit: when the probe says offline, returns
    /// immediately with `offline: true` and touches nothing.
    pub async fn sync_pending(&self) -> SyncReport {
        let mut report = SyncReport::default();

        if !self.probe.is_online().await {
            debug!("Offline, skipping sync pass");
            report.offline = true;
            return report;
        }

        for interview in self.interviews.get_pending().await {
            // Compare-and-set discipline: never re-submit a record another
            // pass already has in flight
            if interview.status() == SyncStatus::Syncing {
                continue;
            }
            self.push_interview(interview, &mut report).await;
        }

        self.drain_queue(&mut report).await;

        if let Err(err) = self.cache.mark_sync_now().await {
            warn!(%err, "Failed to stamp sync marker");
        }

        info!(
            synced = report.synced,
            failed = report.failed,
            queue_drained = report.queue_drained,
            queue_failed = report.queue_failed,
            "Sync pass finished"
        );
        report
    }

    /// Enqueues an abandon notification and flushes it immediately when
    /// online
    ///
    /// The queue write is durable before any network attempt, so an
    /// abandon recorded offline survives restarts and is delivered by a
    /// later sync pass.
    pub async fn abandon(
        &self,
        interview_id: &InterviewId,
        payload: serde_json::Value,
    ) -> anyhow::Result<()> {
        self.interviews
            .enqueue(SyncQueueItem::new(
                interview_id.clone(),
                SubmissionType::Abandon,
                payload,
            ))
            .await?;

        if self.probe.is_online().await {
            let mut report = SyncReport::default();
            self.drain_queue(&mut report).await;
        }
        Ok(())
    }

    async fn push_interview(&self, mut interview: OfflineInterview, report: &mut SyncReport) {
        let id = interview.id().clone();

        if let Err(err) = interview.start_sync() {
            warn!(interview_id = %id, %err, "Cannot start sync for interview");
            return;
        }
        if let Err(err) = self.interviews.save(&interview).await {
            warn!(interview_id = %id, %err, "Failed to persist syncing status");
            return;
        }

        let payload = match serde_json::to_value(&interview) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(interview_id = %id, %err, "Cannot serialize interview");
                self.record_failure(interview, &err.to_string(), report).await;
                return;
            }
        };

        match self.remote.submit_interview(&payload).await {
            Ok(ack) => {
                debug!(interview_id = %id, server_id = %ack.server_id, "Interview acknowledged");
                // Acknowledged records are deleted, not kept as Synced
                if let Err(err) = interview.mark_synced() {
                    warn!(interview_id = %id, %err, "Unexpected transition failure");
                }
                if let Err(err) = self.interviews.delete(&id).await {
                    warn!(interview_id = %id, %err, "Failed to delete acknowledged interview");
                }
                if let Err(err) = self.interviews.dequeue(&id).await {
                    warn!(interview_id = %id, %err, "Failed to clear queue for acknowledged interview");
                }
                report.synced += 1;
            }
            Err(err) => {
                self.record_failure(interview, &err.to_string(), report).await;
            }
        }
    }

    async fn record_failure(
        &self,
        mut interview: OfflineInterview,
        message: &str,
        report: &mut SyncReport,
    ) {
        let id = interview.id().clone();
        warn!(interview_id = %id, error = message, "Interview push failed");
        if let Err(err) = interview.record_failure(message) {
            warn!(interview_id = %id, %err, "Unexpected transition failure");
        }
        if let Err(err) = self.interviews.save(&interview).await {
            warn!(interview_id = %id, %err, "Failed to persist failed status");
        }
        report.failed += 1;
    }

    async fn drain_queue(&self, report: &mut SyncReport) {
        for item in self.interviews.queue_items().await {
            let result = match item.submission_type {
                SubmissionType::Complete => self.remote.submit_interview(&item.payload).await,
                SubmissionType::Abandon => self.remote.submit_abandon(&item.payload).await,
            };

            match result {
                Ok(_) => {
                    if let Err(err) = self.interviews.dequeue(&item.interview_id).await {
                        warn!(interview_id = %item.interview_id, %err, "Failed to remove delivered queue item");
                    }
                    report.queue_drained += 1;
                }
                Err(err) => {
                    warn!(
                        interview_id = %item.interview_id,
                        submission = ?item.submission_type,
                        %err,
                        "Queue item delivery failed"
                    );
                    if let Err(err) = self.interviews.record_queue_attempt(&item.interview_id).await
                    {
                        warn!(interview_id = %item.interview_id, %err, "Failed to record queue attempt");
                    }
                    report.queue_failed += 1;
                }
            }
        }
    }
}
