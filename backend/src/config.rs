use crate::services::cutoff::OrderCheck;
use crate::services::locks::SheetLocks;
use crate::services::pipeline::PipelineSettings;
use crate::services::sheets::sync::SheetSettings;
use crate::services::status::RunRegistry;
use crate::AppState;
use anyhow::{Context, Result};
use env_logger::Builder;
use log::{info, LevelFilter};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub fn init_logger() {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();
    info!("Starting channel sheet sync backend...");
}

pub fn load_environment() {
    dotenv::dotenv().ok();
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub youtube_api_key: String,
    pub sheets_access_token: String,
    pub spreadsheet_id: Option<String>,
    pub link_log_dir: PathBuf,
    pub http_timeout: Duration,
    pub throttle_batch_size: usize,
    pub throttle_window: Duration,
    pub sheet_growth_rows: u32,
    pub formula_separator: char,
    pub single_video_sheet: String,
    pub order_check: OrderCheck,
    pub run_retention: Duration,
}

fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("{name} environment variable must be set"))
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let order_check = match env::var("ORDER_CHECK") {
            Ok(value) => value
                .parse::<OrderCheck>()
                .with_context(|| "ORDER_CHECK must be 'fail' or 'warn'")?,
            Err(_) => OrderCheck::Fail,
        };

        Ok(AppConfig {
            youtube_api_key: required("YOUTUBE_API_KEY")?,
            sheets_access_token: required("GOOGLE_SHEETS_TOKEN")?,
            spreadsheet_id: env::var("SPREADSHEET_ID").ok().filter(|s| !s.trim().is_empty()),
            link_log_dir: PathBuf::from(
                env::var("LINK_LOG_DIR").unwrap_or_else(|_| "channels".to_string()),
            ),
            http_timeout: Duration::from_secs(env_or("HTTP_TIMEOUT_SECS", 30)),
            throttle_batch_size: env_or("THROTTLE_BATCH_SIZE", 6),
            throttle_window: Duration::from_secs(env_or("THROTTLE_WINDOW_SECS", 100)),
            sheet_growth_rows: env_or("SHEET_GROWTH_ROWS", 100),
            formula_separator: env_or("FORMULA_SEPARATOR", ';'),
            single_video_sheet: env::var("SINGLE_VIDEO_SHEET")
                .unwrap_or_else(|_| "Sheet1".to_string()),
            order_check,
            run_retention: Duration::from_secs(env_or("RUN_RETENTION_SECS", 24 * 60 * 60)),
        })
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            link_log_dir: self.link_log_dir.clone(),
            throttle_batch_size: self.throttle_batch_size,
            throttle_window: self.throttle_window,
            order_check: self.order_check,
            single_video_sheet: self.single_video_sheet.clone(),
            sheet: SheetSettings {
                growth_rows: self.sheet_growth_rows,
                formula_separator: self.formula_separator,
            },
        }
    }
}

pub fn create_http_client(config: &AppConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("Failed to build HTTP client")
}

pub fn create_app_state() -> Result<AppState> {
    let config = AppConfig::from_env()?;
    let http = create_http_client(&config)?;
    info!(
        "Link logs in {}, throttle {} per {}s",
        config.link_log_dir.display(),
        config.throttle_batch_size,
        config.throttle_window.as_secs()
    );

    let runs = Arc::new(RunRegistry::with_retention(config.run_retention));

    Ok(AppState {
        config: Arc::new(config),
        http,
        runs,
        sheet_locks: Arc::new(SheetLocks::default()),
    })
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        youtube_api_key: "key".into(),
        sheets_access_token: "token".into(),
        spreadsheet_id: None,
        link_log_dir: PathBuf::from("channels"),
        http_timeout: Duration::from_secs(5),
        throttle_batch_size: 6,
        throttle_window: Duration::from_secs(100),
        sheet_growth_rows: 100,
        formula_separator: ';',
        single_video_sheet: "Sheet1".into(),
        order_check: OrderCheck::Fail,
        run_retention: Duration::from_secs(3600),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_settings_follow_config() {
        let mut config = test_config();
        config.formula_separator = ',';
        config.sheet_growth_rows = 50;

        let settings = config.pipeline_settings();
        assert_eq!(settings.sheet.formula_separator, ',');
        assert_eq!(settings.sheet.growth_rows, 50);
        assert_eq!(settings.throttle_batch_size, 6);
        assert_eq!(settings.single_video_sheet, "Sheet1");
    }

    #[test]
    fn env_or_falls_back_on_garbage() {
        env::set_var("CHANNEL_SYNC_TEST_NUMBER", "not a number");
        assert_eq!(env_or("CHANNEL_SYNC_TEST_NUMBER", 7u64), 7);
        env::set_var("CHANNEL_SYNC_TEST_NUMBER", " 12 ");
        assert_eq!(env_or("CHANNEL_SYNC_TEST_NUMBER", 7u64), 12);
        assert_eq!(env_or("CHANNEL_SYNC_TEST_MISSING", ';'), ';');
    }
}
