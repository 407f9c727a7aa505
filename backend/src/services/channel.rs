use crate::error::SyncError;
use crate::models::{ChannelIdentity, YOUTUBE_BASE_URL};
use lazy_static::lazy_static;
use regex::Regex;

pub const UNKNOWN_CHANNEL: &str = "unknown_channel";

lazy_static! {
    static ref LISTING_SUFFIX_RE: Regex =
        Regex::new(r"(/videos|/shorts|/streams)$").expect("listing suffix pattern is valid");
    static ref CHANNEL_NAME_RE: Regex =
        Regex::new(r"/(?:c/|channel/|user/|@)([^/?#&]+)").expect("channel name pattern is valid");
    static ref CHANNEL_MARKER_RE: Regex =
        Regex::new(r"(?:/c/|/channel/|/user/|@)").expect("channel marker pattern is valid");
}

const HOST_PREFIXES: [&str; 4] = ["www.youtube.com/", "m.youtube.com/", "youtube.com/", "www.youtube.com"];

/// What a submitted link asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncTarget {
    Channel(String),
    Video(String),
}

impl SyncTarget {
    pub fn detect(link: &str) -> Self {
        let link = link.trim();
        if CHANNEL_MARKER_RE.is_match(link) {
            SyncTarget::Channel(link.to_string())
        } else {
            SyncTarget::Video(link.to_string())
        }
    }
}

/// Turns user input (`youtube.com/@Example/videos`, `@Example`, `https://m.youtube.com/c/x/`)
/// into `https://www.youtube.com/<path>` without a trailing slash or listing suffix.
pub fn normalize_channel_url(input: &str) -> Result<String, SyncError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SyncError::MalformedInput("empty channel link".into()));
    }

    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    let path = HOST_PREFIXES
        .iter()
        .find_map(|prefix| without_scheme.strip_prefix(prefix))
        .unwrap_or(without_scheme)
        .trim_start_matches('/');

    let joined = format!("{YOUTUBE_BASE_URL}/{path}");
    let joined = joined.trim_end_matches('/');
    let normalized = LISTING_SUFFIX_RE.replace(joined, "").into_owned();

    url::Url::parse(&normalized)
        .map_err(|e| SyncError::MalformedInput(format!("bad channel link '{input}': {e}")))?;
    Ok(normalized)
}

pub fn extract_channel_name(url: &str) -> String {
    CHANNEL_NAME_RE
        .captures(url)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_CHANNEL.to_string())
}

/// Restricts a name to `[A-Za-z0-9_.-]` so it is safe both as a tab title and a directory name.
pub fn sanitize_display_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        UNKNOWN_CHANNEL.to_string()
    } else {
        cleaned
    }
}

pub fn resolve_channel(input: &str) -> Result<ChannelIdentity, SyncError> {
    let canonical_url = normalize_channel_url(input)?;
    let display_name = sanitize_display_name(&extract_channel_name(&canonical_url));
    Ok(ChannelIdentity {
        canonical_url,
        display_name,
    })
}
