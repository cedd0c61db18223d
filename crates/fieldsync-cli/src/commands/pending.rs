//! Pending command - List interviews awaiting sync

use anyhow::Result;
use clap::Args;

use crate::context::AppContext;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct PendingCommand {}

impl PendingCommand {
    pub async fn execute(&self, config_path: Option<&str>, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let ctx = AppContext::build(config_path).await?;

        let pending = ctx.interviews.get_pending().await;

        formatter.print_json(&serde_json::json!(pending
            .iter()
            .map(|i| {
                serde_json::json!({
                    "id": i.id().as_str(),
                    "survey": i.survey_id().as_str(),
                    "status": i.status().to_string(),
                    "attempts": i.sync_attempts(),
                    "last_error": i.last_error(),
                })
            })
            .collect::<Vec<_>>()));

        if pending.is_empty() {
            formatter.success("No interviews awaiting sync");
            return Ok(());
        }

        formatter.success(&format!("{} interviews awaiting sync", pending.len()));
        for interview in &pending {
            formatter.info(&format!(
                "{} [{}] survey={} attempts={}{}",
                interview.id(),
                interview.status(),
                interview.survey_id(),
                interview.sync_attempts(),
                interview
                    .last_error()
                    .map(|e| format!(" last_error={e}"))
                    .unwrap_or_default()
            ));
        }
        Ok(())
    }
}
