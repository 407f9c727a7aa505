use crate::error::SyncError;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref VIDEO_ID_RE: Regex = Regex::new(
        r"(?:https?://)?(?:www\.)?(?:youtube\.com/(?:[^/\s]+/\S+/|(?:v|e(?:mbed)?)/|\S*?[?&]v=)|youtu\.be/|youtube\.com/shorts/)([a-zA-Z0-9_-]{11})",
    )
    .expect("video id pattern is valid");
    static ref SHORT_FORM_RE: Regex =
        Regex::new(r"^PT(\d+M)?(\d+)S").expect("short-form duration pattern is valid");
}

/// Extracts the 11-character video id from any of the usual YouTube link shapes
/// (`watch?v=`, `youtu.be/`, `/shorts/`, `/embed/`, `/v/`).
pub fn extract_youtube_video_id(url: &str) -> Result<String, SyncError> {
    VIDEO_ID_RE
        .captures(url)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| SyncError::MalformedInput(format!("no video id in '{url}'")))
}

/// Parse an RFC 3339 / ISO 8601 timestamp as returned by the Data API (`publishedAt`).
pub fn parse_published_at(date_str: &str) -> Result<DateTime<Utc>, SyncError> {
    date_str
        .parse::<DateTime<Utc>>()
        .map_err(|e| SyncError::Upstream(format!("unparseable publishedAt '{date_str}': {e}")))
}

/// A duration counts as short-form when it has no minutes component and at most 60 seconds.
/// Any minutes component disqualifies it, whatever the seconds say.
pub fn is_short_form_duration(duration_str: &str) -> bool {
    match SHORT_FORM_RE.captures(duration_str) {
        Some(captures) => {
            if captures.get(1).is_some() {
                return false;
            }
            captures
                .get(2)
                .and_then(|s| s.as_str().parse::<u64>().ok())
                .map(|seconds| seconds <= 60)
                .unwrap_or(false)
        }
        None => false,
    }
}

/// Zero-based column index to its A1 letters (0 -> A, 25 -> Z, 26 -> AA).
pub fn column_letter(index: u32) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Quote a worksheet title for use in an A1 range (`'My Tab'!A1:F1`).
pub fn quote_sheet_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

pub fn a1_row_range(title: &str, start_col: u32, end_col: u32, row: u32) -> String {
    format!(
        "{}!{}{row}:{}{row}",
        quote_sheet_title(title),
        column_letter(start_col),
        column_letter(end_col)
    )
}
