use crate::error::SyncError;
use crate::models::{ChannelIdentity, CutoffPolicy, ListingKind, SyncReport, VideoLink};
use crate::services::channel::{resolve_channel, SyncTarget};
use crate::services::cutoff::{filter_links, OrderCheck};
use crate::services::harvester::{harvest_listing, PageHarvester};
use crate::services::link_log::LinkLog;
use crate::services::sheets::sync::{SheetSettings, SheetSyncEngine, UpsertOutcome};
use crate::services::sheets::{SpreadsheetService, Worksheet};
use crate::services::status::StatusSink;
use crate::services::throttle::{Throttler, DEFAULT_BATCH_SIZE, DEFAULT_WINDOW};
use crate::services::youtube::{fetch_video_record, MetadataService};
use chrono::Utc;
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub link_log_dir: PathBuf,
    pub throttle_batch_size: usize,
    pub throttle_window: Duration,
    pub order_check: OrderCheck,
    pub single_video_sheet: String,
    pub sheet: SheetSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        PipelineSettings {
            link_log_dir: PathBuf::from("channels"),
            throttle_batch_size: DEFAULT_BATCH_SIZE,
            throttle_window: DEFAULT_WINDOW,
            order_check: OrderCheck::Fail,
            single_video_sheet: "Sheet1".to_string(),
            sheet: SheetSettings::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub link: String,
    pub cutoff: CutoffPolicy,
    /// Sync from the existing link logs instead of harvesting again.
    pub resume: bool,
}

/// One sync run: resolve, harvest the three listings, filter by cutoff, then sync every kept
/// link into the sheet under the throttle. Runs strictly sequentially; callers must not run two
/// pipelines against the same worksheet at once.
pub struct SyncPipeline {
    harvester: Arc<dyn PageHarvester>,
    metadata: Arc<dyn MetadataService>,
    sheets: Arc<dyn SpreadsheetService>,
    status: Arc<dyn StatusSink>,
    settings: PipelineSettings,
}

impl SyncPipeline {
    pub fn new(
        harvester: Arc<dyn PageHarvester>,
        metadata: Arc<dyn MetadataService>,
        sheets: Arc<dyn SpreadsheetService>,
        status: Arc<dyn StatusSink>,
        settings: PipelineSettings,
    ) -> Self {
        SyncPipeline {
            harvester,
            metadata,
            sheets,
            status,
            settings,
        }
    }

    /// Runs a channel or single-video sync depending on the link, and reports the
    /// end of the run (completion or failure) to the status sink.
    pub async fn run(&self, request: &SyncRequest) -> Result<SyncReport, SyncError> {
        let result = match SyncTarget::detect(&request.link) {
            SyncTarget::Channel(link) => {
                self.sync_channel(&link, request.cutoff, request.resume).await
            }
            SyncTarget::Video(link) => self.sync_single_video(&link).await,
        };

        match &result {
            Ok(report) => {
                self.status.notify(&format!(
                    "Done: {} new, {} already present, {} failed (of {}).",
                    report.inserted, report.already_present, report.failed, report.total
                ));
                self.status.notify_complete();
            }
            Err(e) => self.status.notify_failed(&e.to_string()),
        }
        result
    }

    pub async fn sync_channel(
        &self,
        input: &str,
        cutoff: CutoffPolicy,
        resume: bool,
    ) -> Result<SyncReport, SyncError> {
        self.status.notify("Resolving channel link...");
        let channel = resolve_channel(input)?;
        info!(
            "Syncing channel {} ({}) with cutoff {cutoff:?}",
            channel.display_name, channel.canonical_url
        );

        let logs: Vec<(ListingKind, LinkLog)> = ListingKind::ALL
            .iter()
            .map(|kind| {
                (
                    *kind,
                    LinkLog::new(&self.settings.link_log_dir, &channel.display_name, *kind),
                )
            })
            .collect();

        let mut links = Vec::new();
        if resume {
            for (_, log) in &logs {
                links.extend(log.read_all().await?);
            }
            if links.is_empty() {
                self.status
                    .notify("No saved links to resume from, collecting from channel...");
            } else {
                self.status
                    .notify(&format!("Resuming from {} saved links...", links.len()));
            }
        }
        if links.is_empty() {
            links = self.discover(&channel, cutoff, &logs).await?;
        }

        self.sync_links(&channel.display_name, &links).await
    }

    pub async fn sync_single_video(&self, input: &str) -> Result<SyncReport, SyncError> {
        self.status.notify("Processing video link...");
        let link = VideoLink::parse(input)?;
        let mut worksheet = self
            .sheets
            .ensure_worksheet(&self.settings.single_video_sheet)
            .await?;

        let mut report = SyncReport {
            total: 1,
            ..SyncReport::default()
        };
        let outcome = self.sync_link(&mut worksheet, &link).await?;
        tally(&mut report, &outcome);
        Ok(report)
    }

    async fn discover(
        &self,
        channel: &ChannelIdentity,
        cutoff: CutoffPolicy,
        logs: &[(ListingKind, LinkLog)],
    ) -> Result<Vec<VideoLink>, SyncError> {
        let mut harvested = Vec::new();
        for kind in ListingKind::ALL {
            self.status
                .notify(&format!("Collecting {kind} links from the channel..."));
            let links = harvest_listing(self.harvester.as_ref(), channel, kind).await?;
            if links.is_empty() {
                warn!("No {kind} links found on {}", kind.listing_url(channel));
                self.status
                    .notify(&format!("Warning: no {kind} links found on the channel."));
            }
            harvested.push(links);
        }
        if harvested.iter().all(Vec::is_empty) {
            return Err(SyncError::NothingHarvested(channel.canonical_url.clone()));
        }

        let since = cutoff.since(Utc::now());
        let mut kept = Vec::new();
        for ((kind, log), links) in logs.iter().zip(harvested) {
            self.status.notify(&format!(
                "Checking publish dates of {} {kind} links...",
                links.len()
            ));
            log.reset().await?;
            let filtered = filter_links(
                self.metadata.as_ref(),
                &links,
                since,
                log,
                self.settings.order_check,
            )
            .await?;
            info!(
                "Kept {} of {} {kind} links for {}",
                filtered.len(),
                links.len(),
                channel.display_name
            );
            kept.extend(filtered);
        }
        Ok(kept)
    }

    async fn sync_links(&self, tab: &str, links: &[VideoLink]) -> Result<SyncReport, SyncError> {
        let total = links.len();
        let mut report = SyncReport {
            total,
            ..SyncReport::default()
        };
        if links.is_empty() {
            self.status.notify("No links to sync.");
            return Ok(report);
        }

        let mut worksheet = self.sheets.ensure_worksheet(tab).await?;
        let mut throttler = Throttler::new(
            self.settings.throttle_batch_size,
            self.settings.throttle_window,
        );

        for (i, link) in links.iter().enumerate() {
            self.status
                .notify(&format!("Processing link {}/{total}...", i + 1));
            let outcome = self.sync_link(&mut worksheet, link).await?;
            tally(&mut report, &outcome);
            throttler.tick().await;
        }
        Ok(report)
    }

    async fn sync_link(
        &self,
        worksheet: &mut Worksheet,
        link: &VideoLink,
    ) -> Result<UpsertOutcome, SyncError> {
        let record = fetch_video_record(self.metadata.as_ref(), link).await?;
        let engine = SheetSyncEngine::new(self.sheets.as_ref(), &self.settings.sheet);
        let outcome = engine
            .upsert(worksheet, &link.canonical_url(), &record)
            .await;
        if let UpsertOutcome::Failed { reason } = &outcome {
            warn!("Row for {} not synced: {reason}", link.item_id);
        }
        Ok(outcome)
    }
}

fn tally(report: &mut SyncReport, outcome: &UpsertOutcome) {
    match outcome {
        UpsertOutcome::Inserted { .. } => report.inserted += 1,
        UpsertOutcome::AlreadyPresent { .. } => report.already_present += 1,
        UpsertOutcome::Failed { .. } => report.failed += 1,
    }
}
