pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

#[cfg(test)]
mod test_support;

use crate::config::AppConfig;
use crate::services::harvester::HttpPageHarvester;
use crate::services::locks::SheetLocks;
use crate::services::pipeline::SyncPipeline;
use crate::services::sheets::google::GoogleSheetsClient;
use crate::services::status::{RunRegistry, StatusSink};
use crate::services::youtube::YouTubeClient;
use std::sync::Arc;

pub struct AppState {
    pub config: Arc<AppConfig>,
    pub http: reqwest::Client,
    pub runs: Arc<RunRegistry>,
    pub sheet_locks: Arc<SheetLocks>,
}

impl AppState {
    /// Wires the HTTP-backed services for one run against `spreadsheet_id`.
    pub fn build_pipeline(&self, spreadsheet_id: &str, status: Arc<dyn StatusSink>) -> SyncPipeline {
        SyncPipeline::new(
            Arc::new(HttpPageHarvester::new(self.http.clone())),
            Arc::new(YouTubeClient::new(
                self.http.clone(),
                self.config.youtube_api_key.clone(),
            )),
            Arc::new(GoogleSheetsClient::new(
                self.http.clone(),
                self.config.sheets_access_token.clone(),
                spreadsheet_id,
            )),
            status,
            self.config.pipeline_settings(),
        )
    }
}
