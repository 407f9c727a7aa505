use crate::error::SyncError;
use crate::utils::extract_youtube_video_id;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rocket::http::{ContentType, Status};
use rocket::request::Request;
use rocket::response::Responder;
use rocket::{response, Response};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;

pub const YOUTUBE_BASE_URL: &str = "https://www.youtube.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelIdentity {
    pub canonical_url: String,
    /// Sanitized channel name; doubles as the destination tab name.
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Video,
    Shorts,
    Live,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Video => "Video",
            Category::Shorts => "Shorts",
            Category::Live => "Live",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The three per-channel listings that get scraped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingKind {
    Videos,
    Shorts,
    Streams,
}

impl ListingKind {
    pub const ALL: [ListingKind; 3] = [ListingKind::Videos, ListingKind::Shorts, ListingKind::Streams];

    pub fn path_suffix(&self) -> &'static str {
        match self {
            ListingKind::Videos => "/videos",
            ListingKind::Shorts => "/shorts",
            ListingKind::Streams => "/streams",
        }
    }

    /// Substring an anchor href must contain to count as an item of this listing.
    pub fn link_marker(&self) -> &'static str {
        match self {
            ListingKind::Shorts => "/shorts/",
            ListingKind::Videos | ListingKind::Streams => "/watch?v=",
        }
    }

    pub fn log_file_name(&self) -> &'static str {
        match self {
            ListingKind::Videos => "videos.txt",
            ListingKind::Shorts => "shorts.txt",
            ListingKind::Streams => "streams.txt",
        }
    }

    pub fn listing_url(&self, channel: &ChannelIdentity) -> String {
        format!("{}{}", channel.canonical_url, self.path_suffix())
    }
}

impl fmt::Display for ListingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ListingKind::Videos => "videos",
            ListingKind::Shorts => "shorts",
            ListingKind::Streams => "streams",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoLink {
    pub item_id: String,
    pub raw_url: String,
}

impl VideoLink {
    pub fn parse(raw_url: &str) -> Result<Self, SyncError> {
        let raw_url = raw_url.trim();
        Ok(VideoLink {
            item_id: extract_youtube_video_id(raw_url)?,
            raw_url: raw_url.to_string(),
        })
    }

    pub fn is_shorts(&self) -> bool {
        self.raw_url.contains("/shorts/")
    }

    /// The link written to the sheet. Shorts keep their `/shorts/` form,
    /// everything else becomes `watch?v=`.
    pub fn canonical_url(&self) -> String {
        if self.is_shorts() {
            format!("{YOUTUBE_BASE_URL}/shorts/{}", self.item_id)
        } else {
            format!("{YOUTUBE_BASE_URL}/watch?v={}", self.item_id)
        }
    }
}

/// Every path form under which a video's link may already sit in a sheet. The sheet is
/// deduplicated against all of them, so the same id never gets a second row.
pub fn link_forms(item_id: &str) -> [String; 2] {
    [format!("/watch?v={item_id}"), format!("/shorts/{item_id}")]
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoRecord {
    pub item_id: String,
    pub title: String,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    pub published_at: DateTime<Utc>,
    pub category: Category,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutoffPolicy {
    None,
    SixMonthsAgo,
    Explicit(NaiveDate),
}

impl CutoffPolicy {
    /// Maps the submitted `date_option` / `date_input` pair onto a policy.
    /// Unknown or missing options fall back to six months.
    pub fn from_options(
        date_option: Option<&str>,
        date_input: Option<&str>,
    ) -> Result<Self, SyncError> {
        match date_option.map(str::trim) {
            Some("all") => Ok(CutoffPolicy::None),
            Some("custom") => {
                let input = date_input
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| SyncError::MalformedInput("no cutoff date selected".into()))?;
                NaiveDate::parse_from_str(input, "%Y-%m-%d")
                    .map(CutoffPolicy::Explicit)
                    .map_err(|e| SyncError::MalformedInput(format!("bad cutoff date '{input}': {e}")))
            }
            _ => Ok(CutoffPolicy::SixMonthsAgo),
        }
    }

    /// The earliest publish instant still eligible, or `None` when everything is.
    pub fn since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            CutoffPolicy::None => None,
            CutoffPolicy::SixMonthsAgo => Some(now - Duration::days(180)),
            CutoffPolicy::Explicit(date) => date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub total: usize,
    pub inserted: usize,
    pub already_present: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessLinkRequest {
    pub link: String,
    pub date_option: Option<String>,
    pub date_input: Option<String>,
    pub spreadsheet_id: Option<String>,
    #[serde(default)]
    pub resume: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessLinkResponse {
    pub success: bool,
    pub message: String,
    pub run_id: String,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn from_sync_error(e: &SyncError) -> Self {
        let error = match e {
            SyncError::MalformedInput(_) => "malformed_input",
            SyncError::NotFound(_) => "not_found",
            SyncError::Upstream(_) => "upstream",
            SyncError::SheetsApi { .. } => "sheets_api",
            SyncError::ListingOutOfOrder(_) => "listing_out_of_order",
            SyncError::NothingHarvested(_) => "nothing_harvested",
            SyncError::LinkLog(_) => "link_log",
        };
        ErrorResponse {
            error: error.to_string(),
            message: e.to_string(),
        }
    }
}

impl From<SyncError> for ErrorResponse {
    fn from(e: SyncError) -> Self {
        ErrorResponse::from_sync_error(&e)
    }
}

impl<'r> Responder<'r, 'static> for ErrorResponse {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let json = serde_json::to_string(&self).unwrap_or_default();
        Response::build()
            .status(Status::BadRequest)
            .header(ContentType::JSON)
            .sized_body(json.len(), Cursor::new(json))
            .ok()
    }
}
