use crate::error::SyncError;
use crate::models::{Category, VideoLink, VideoRecord};
use crate::utils::{is_short_form_duration, parse_published_at};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

const VIDEOS_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/videos";

/// Everything the classifier and the sheet need about one video.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoDetails {
    pub title: String,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    pub published_at: DateTime<Utc>,
    pub duration: String,
    pub is_live: bool,
}

/// Quota-limited video metadata lookups.
#[async_trait]
pub trait MetadataService: Send + Sync {
    /// Date-only lookup used while scanning listings.
    async fn published_at(&self, video_id: &str) -> Result<DateTime<Utc>, SyncError>;

    async fn video_details(&self, video_id: &str) -> Result<VideoDetails, SyncError>;
}

pub struct YouTubeClient {
    http: Client,
    api_key: String,
}

impl YouTubeClient {
    pub fn new(http: Client, api_key: impl Into<String>) -> Self {
        YouTubeClient {
            http,
            api_key: api_key.into(),
        }
    }

    async fn list_videos(&self, video_id: &str, part: &str) -> Result<VideoListResponse, SyncError> {
        // Documentation: https://developers.google.com/youtube/v3/docs/videos/list
        let response = self
            .http
            .get(VIDEOS_ENDPOINT)
            .query(&[("id", video_id), ("key", self.api_key.as_str()), ("part", part)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Upstream(format!(
                "videos.list for {video_id} failed with {status}: {body}"
            )));
        }

        Ok(response.json::<VideoListResponse>().await?)
    }
}

#[async_trait]
impl MetadataService for YouTubeClient {
    async fn published_at(&self, video_id: &str) -> Result<DateTime<Utc>, SyncError> {
        let response = self.list_videos(video_id, "snippet").await?;
        let item = response.first_item(video_id)?;
        parse_published_at(&item.snippet.published_at)
    }

    async fn video_details(&self, video_id: &str) -> Result<VideoDetails, SyncError> {
        let response = self
            .list_videos(video_id, "snippet,statistics,contentDetails,liveStreamingDetails")
            .await?;
        response.first_item(video_id)?.to_details()
    }
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

impl VideoListResponse {
    fn first_item(&self, video_id: &str) -> Result<&VideoItem, SyncError> {
        self.items
            .first()
            .ok_or_else(|| SyncError::NotFound(format!("video {video_id}")))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    snippet: Snippet,
    #[serde(default)]
    statistics: Statistics,
    #[serde(default)]
    content_details: ContentDetails,
    live_streaming_details: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    published_at: String,
}

// The API reports counts as decimal strings and omits hidden ones.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ContentDetails {
    #[serde(default)]
    duration: String,
}

fn parse_count(value: &Option<String>) -> u64 {
    value.as_deref().and_then(|s| s.parse().ok()).unwrap_or(0)
}

impl VideoItem {
    fn to_details(&self) -> Result<VideoDetails, SyncError> {
        let is_live = match &self.live_streaming_details {
            Some(Value::Object(map)) => !map.is_empty(),
            Some(Value::Null) | None => false,
            Some(_) => true,
        };
        Ok(VideoDetails {
            title: self.snippet.title.clone(),
            view_count: parse_count(&self.statistics.view_count),
            like_count: parse_count(&self.statistics.like_count),
            comment_count: parse_count(&self.statistics.comment_count),
            published_at: parse_published_at(&self.snippet.published_at)?,
            duration: self.content_details.duration.clone(),
            is_live,
        })
    }
}

/// Live beats everything; then a shorts link or a short-form duration; otherwise a regular video.
pub fn classify(is_live: bool, duration: &str, link: &VideoLink) -> Category {
    if is_live {
        Category::Live
    } else if link.is_shorts() || is_short_form_duration(duration) {
        Category::Shorts
    } else {
        Category::Video
    }
}

/// Fetches the full metadata of one linked video and classifies it. Never cached,
/// so counts are current on every sync.
pub async fn fetch_video_record(
    metadata: &dyn MetadataService,
    link: &VideoLink,
) -> Result<VideoRecord, SyncError> {
    let details = metadata.video_details(&link.item_id).await?;
    let category = classify(details.is_live, &details.duration, link);
    debug!(
        "Fetched {} ({}): views={}, likes={}, comments={}, duration={}",
        link.item_id, category, details.view_count, details.like_count, details.comment_count, details.duration
    );

    Ok(VideoRecord {
        item_id: link.item_id.clone(),
        title: details.title,
        view_count: details.view_count,
        like_count: details.like_count,
        comment_count: details.comment_count,
        published_at: details.published_at,
        category,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn watch_link() -> VideoLink {
        VideoLink::parse("https://www.youtube.com/watch?v=abcdefghijk").unwrap()
    }

    #[test]
    fn classification_priority() {
        let watch = watch_link();
        let shorts = VideoLink::parse("https://www.youtube.com/shorts/abcdefghijk").unwrap();

        assert_eq!(classify(false, "PT45S", &watch), Category::Shorts);
        assert_eq!(classify(true, "PT45S", &watch), Category::Live);
        assert_eq!(classify(true, "PT1H", &shorts), Category::Live);
        assert_eq!(classify(false, "PT12M3S", &shorts), Category::Shorts);
        assert_eq!(classify(false, "PT1M", &watch), Category::Video);
        assert_eq!(classify(false, "PT61S", &watch), Category::Video);
    }

    #[test]
    fn parses_full_item() {
        let response: VideoListResponse = serde_json::from_value(json!({
            "items": [{
                "snippet": { "title": "Hello \"world\"", "publishedAt": "2024-05-02T10:11:12Z" },
                "statistics": { "viewCount": "1200", "likeCount": "34", "commentCount": "5" },
                "contentDetails": { "duration": "PT45S" }
            }]
        }))
        .unwrap();

        let details = response.first_item("abcdefghijk").unwrap().to_details().unwrap();
        assert_eq!(details.title, "Hello \"world\"");
        assert_eq!(details.view_count, 1200);
        assert_eq!(details.like_count, 34);
        assert_eq!(details.comment_count, 5);
        assert_eq!(details.duration, "PT45S");
        assert!(!details.is_live);
    }

    #[test]
    fn hidden_counts_default_to_zero_and_live_details_mark_live() {
        let response: VideoListResponse = serde_json::from_value(json!({
            "items": [{
                "snippet": { "title": "Stream", "publishedAt": "2024-05-02T10:11:12Z" },
                "statistics": { "viewCount": "10" },
                "contentDetails": { "duration": "PT2H" },
                "liveStreamingDetails": { "actualStartTime": "2024-05-02T10:00:00Z" }
            }]
        }))
        .unwrap();

        let details = response.first_item("abcdefghijk").unwrap().to_details().unwrap();
        assert_eq!(details.like_count, 0);
        assert_eq!(details.comment_count, 0);
        assert!(details.is_live);
    }

    #[test]
    fn empty_live_details_are_not_live() {
        let response: VideoListResponse = serde_json::from_value(json!({
            "items": [{
                "snippet": { "title": "x", "publishedAt": "2024-05-02T10:11:12Z" },
                "liveStreamingDetails": {}
            }]
        }))
        .unwrap();
        assert!(!response.first_item("abcdefghijk").unwrap().to_details().unwrap().is_live);
    }

    #[test]
    fn no_items_is_not_found() {
        let response: VideoListResponse = serde_json::from_value(json!({ "items": [] })).unwrap();
        assert!(response.first_item("abcdefghijk").unwrap_err().is_not_found());
    }
}
