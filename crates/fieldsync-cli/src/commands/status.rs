//! Status command - Sync counts and last sync/download times

use anyhow::Result;
use clap::Args;

use crate::context::AppContext;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(&self, config_path: Option<&str>, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let ctx = AppContext::build(config_path).await?;

        let (pending, syncing, failed) = ctx.interviews.status_counts().await;
        let queue_depth = ctx.interviews.queue_items().await.len();
        let last_sync = ctx.cache.last_sync().await;
        let last_download = ctx.cache.last_survey_download().await;

        formatter.print_json(&serde_json::json!({
            "pending": pending,
            "syncing": syncing,
            "failed": failed,
            "queue_depth": queue_depth,
            "last_sync": last_sync.map(|t| t.to_rfc3339()),
            "last_download": last_download.map(|t| t.to_rfc3339()),
        }));

        formatter.success("Interview status");
        formatter.info(&format!("pending: {pending}"));
        formatter.info(&format!("syncing: {syncing}"));
        formatter.info(&format!("failed:  {failed}"));
        formatter.info(&format!("retry queue depth: {queue_depth}"));
        formatter.info(&match last_sync {
            Some(t) => format!("last sync: {}", t.to_rfc3339()),
            None => "last sync: never".to_string(),
        });
        formatter.info(&match last_download {
            Some(t) => format!("last reference download: {}", t.to_rfc3339()),
            None => "last reference download: never".to_string(),
        });
        Ok(())
    }
}
