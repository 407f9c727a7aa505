use crate::error::SyncError;
use crate::models::{ChannelIdentity, ListingKind, VideoLink, YOUTUBE_BASE_URL};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use scraper::{Html, Selector};

/// External capability returning the content of a listing page once everything is loaded.
#[async_trait]
pub trait PageHarvester: Send + Sync {
    async fn render(&self, url: &str) -> Result<String, SyncError>;
}

/// Placeholder harvester: a plain HTTP fetch of the server-rendered page. It neither
/// scrolls nor runs scripts, and YouTube ships listing items inside the `ytInitialData`
/// script rather than as anchors, so real listings usually come back empty here. The
/// pipeline reports such empty harvests and fails the run when every listing is empty.
/// Production use needs a browser-backed [`PageHarvester`] that returns the fully
/// scrolled document.
pub struct HttpPageHarvester {
    http: Client,
}

impl HttpPageHarvester {
    pub fn new(http: Client) -> Self {
        HttpPageHarvester { http }
    }
}

#[async_trait]
impl PageHarvester for HttpPageHarvester {
    async fn render(&self, url: &str) -> Result<String, SyncError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SyncError::NotFound(format!("listing page {url}")));
        }
        if !status.is_success() {
            return Err(SyncError::Upstream(format!("GET {url} failed with {status}")));
        }
        let body = response.text().await?;
        debug!("Fetched {} bytes from {url}", body.len());
        Ok(body)
    }
}

/// Pulls item links of one listing kind out of page content, in encounter order.
/// Tracking parameters after `&` are dropped and exact duplicates removed.
pub fn extract_video_links(page_source: &str, kind: ListingKind) -> Vec<String> {
    let document = Html::parse_document(page_source);
    let Ok(anchors) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut links: Vec<String> = Vec::new();
    for anchor in document.select(&anchors) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if !href.contains(kind.link_marker()) {
            continue;
        }
        let stripped = href.split('&').next().unwrap_or(href);
        let full_url = if stripped.starts_with("http://") || stripped.starts_with("https://") {
            stripped.to_string()
        } else {
            format!("{YOUTUBE_BASE_URL}{stripped}")
        };
        if !links.contains(&full_url) {
            links.push(full_url);
        }
    }
    links
}

pub async fn harvest_listing(
    harvester: &dyn PageHarvester,
    channel: &ChannelIdentity,
    kind: ListingKind,
) -> Result<Vec<VideoLink>, SyncError> {
    let listing_url = kind.listing_url(channel);
    info!("Harvesting {kind} listing: {listing_url}");

    let page_source = harvester.render(&listing_url).await?;
    let links = extract_video_links(&page_source, kind)
        .iter()
        .map(|raw| VideoLink::parse(raw))
        .collect::<Result<Vec<_>, _>>()?;

    info!("Found {} {kind} links for {}", links.len(), channel.display_name);
    Ok(links)
}
