//! Sync command - Push pending interviews and drain the retry queue

use anyhow::Result;
use clap::Args;

use fieldsync_sync::Submitter;

use crate::context::AppContext;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct SyncCommand {}

impl SyncCommand {
    pub async fn execute(&self, config_path: Option<&str>, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let ctx = AppContext::build(config_path).await?;

        let submitter = Submitter::new(
            ctx.interviews.clone(),
            ctx.cache.clone(),
            ctx.remote.clone(),
            ctx.probe.clone(),
        );
        let report = submitter.sync_pending().await;

        if report.offline {
            formatter.error("No internet connection; nothing was synced");
            return Ok(());
        }

        formatter.print_json(&serde_json::json!({
            "synced": report.synced,
            "failed": report.failed,
            "queue_drained": report.queue_drained,
            "queue_failed": report.queue_failed,
        }));
        formatter.success(&format!(
            "Synced {} interviews, {} failed; queue: {} delivered, {} pending retry",
            report.synced, report.failed, report.queue_drained, report.queue_failed
        ));
        Ok(())
    }
}
