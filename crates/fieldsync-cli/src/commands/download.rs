//! Download command - Bulk-fetch reference data for assigned surveys
//!
//! Surveys come from a JSON file (`--surveys`) or, when omitted, from the
//! snapshot stored by the previous file-based run. Each file-based run
//! refreshes the snapshot so a plain `fieldsync download` keeps working
//! offline provisioning unchanged.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use fieldsync_core::domain::Survey;
use fieldsync_sync::BulkDownloader;

use crate::context::AppContext;
use crate::output::{get_formatter, OutputFormat};

/// Store key for the last-provided survey list
const SURVEYS_KEY: &str = "meta:surveys";

#[derive(Debug, Args)]
pub struct DownloadCommand {
    /// JSON file with the assigned survey list
    #[arg(long)]
    pub surveys: Option<PathBuf>,

    /// Skip per-station GPS detail even if the config enables it
    #[arg(long)]
    pub no_gps: bool,
}

impl DownloadCommand {
    pub async fn execute(&self, config_path: Option<&str>, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let ctx = AppContext::build(config_path).await?;

        let surveys = match &self.surveys {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                let surveys: Vec<Survey> =
                    serde_json::from_str(&raw).context("Malformed survey list")?;
                // Refresh the snapshot for future flag-less runs
                ctx.store.set(SURVEYS_KEY, &raw).await?;
                surveys
            }
            None => {
                let raw = ctx.store.get(SURVEYS_KEY).await?.with_context(|| {
                    "No survey list stored; run once with --surveys <file>".to_string()
                })?;
                serde_json::from_str(&raw).context("Stored survey list is malformed")?
            }
        };

        let include_gps = ctx.config.sync.include_gps_detail && !self.no_gps;
        let downloader = BulkDownloader::new(
            ctx.cache.clone(),
            ctx.remote.clone(),
            ctx.config.sync.default_state.clone(),
        );

        let summary = downloader.download_all(&surveys, include_gps).await;

        if summary.skipped {
            formatter.error("A download is already running");
            return Ok(());
        }

        formatter.print_json(&serde_json::json!({
            "areas": summary.areas,
            "group_lists": summary.group_lists,
            "station_lists": summary.station_lists,
            "gps_points": summary.gps_points,
            "quotas": summary.quotas,
            "rotations": summary.rotations,
            "profile_cached": summary.profile_cached,
            "failures": summary.failures,
        }));
        formatter.success(&format!(
            "Downloaded {} areas, {} group lists, {} station lists, {} GPS points ({} failures)",
            summary.areas,
            summary.group_lists,
            summary.station_lists,
            summary.gps_points,
            summary.failures
        ));
        Ok(())
    }
}
