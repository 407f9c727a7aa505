//! In-memory stand-ins for the external services, shared by the unit tests.

use crate::error::SyncError;
use crate::services::harvester::PageHarvester;
use crate::services::sheets::{SpreadsheetService, ValueRender, Worksheet, NEW_SHEET_COLUMNS, NEW_SHEET_ROWS};
use crate::services::status::StatusSink;
use crate::services::youtube::{MetadataService, VideoDetails};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct FakeHarvester {
    pages: HashMap<String, String>,
    renders: AtomicUsize,
}

impl FakeHarvester {
    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageHarvester for FakeHarvester {
    async fn render(&self, url: &str) -> Result<String, SyncError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(format!("listing page {url}")))
    }
}

#[derive(Default)]
pub struct FakeMetadata {
    videos: Mutex<HashMap<String, VideoDetails>>,
    failing: Mutex<HashSet<String>>,
    date_lookups: AtomicUsize,
}

impl FakeMetadata {
    pub fn add_video(&self, id: &str, published_at: DateTime<Utc>, duration: &str, is_live: bool) {
        self.videos.lock().unwrap().insert(
            id.to_string(),
            VideoDetails {
                title: format!("Title of {id}"),
                view_count: 100,
                like_count: 10,
                comment_count: 1,
                published_at,
                duration: duration.to_string(),
                is_live,
            },
        );
    }

    /// Makes full lookups of `id` fail as an upstream error.
    pub fn fail_details_for(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    pub fn date_lookups(&self) -> usize {
        self.date_lookups.load(Ordering::SeqCst)
    }

    fn lookup(&self, id: &str) -> Result<VideoDetails, SyncError> {
        self.videos
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(format!("video {id}")))
    }
}

#[async_trait]
impl MetadataService for FakeMetadata {
    async fn published_at(&self, video_id: &str) -> Result<DateTime<Utc>, SyncError> {
        self.date_lookups.fetch_add(1, Ordering::SeqCst);
        self.lookup(video_id).map(|details| details.published_at)
    }

    async fn video_details(&self, video_id: &str) -> Result<VideoDetails, SyncError> {
        if self.failing.lock().unwrap().contains(video_id) {
            return Err(SyncError::Upstream(format!("quota exceeded for {video_id}")));
        }
        self.lookup(video_id)
    }
}

struct Tab {
    sheet_id: i64,
    row_count: u32,
    cells: Vec<Vec<String>>,
    layout_batches: usize,
}

impl Tab {
    fn set(&mut self, row: usize, col: usize, value: String) {
        if self.cells.len() <= row {
            self.cells.resize(row + 1, Vec::new());
        }
        let cells = &mut self.cells[row];
        if cells.len() <= col {
            cells.resize(col + 1, String::new());
        }
        cells[col] = value;
    }
}

/// Displayed text of a raw cell: a HYPERLINK formula shows its title.
/// Links never contain `"`, so the title starts after the link's closing quote,
/// the separator and `" "`.
fn formatted(raw: &str) -> String {
    let Some(rest) = raw.strip_prefix("=HYPERLINK(\"") else {
        return raw.to_string();
    };
    let Some(link_end) = rest.find('"') else {
        return raw.to_string();
    };
    let mut after_link = rest[link_end + 1..].chars();
    after_link.next();
    let Some(title) = after_link.as_str().strip_prefix(" \"") else {
        return raw.to_string();
    };
    title
        .strip_suffix("\")")
        .unwrap_or(title)
        .replace("\"\"", "\"")
}

fn trimmed(grid: Vec<Vec<String>>) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = grid
        .into_iter()
        .map(|mut row| {
            while row.last().is_some_and(|c| c.is_empty()) {
                row.pop();
            }
            row
        })
        .collect();
    while rows.last().is_some_and(|r| r.is_empty()) {
        rows.pop();
    }
    rows
}

pub struct MemorySheets {
    tabs: Mutex<HashMap<String, Tab>>,
    initial_rows: u32,
    fail_reads: AtomicBool,
    fail_batches: AtomicBool,
    fail_appends: AtomicBool,
}

impl Default for MemorySheets {
    fn default() -> Self {
        Self::with_row_count(NEW_SHEET_ROWS)
    }
}

impl MemorySheets {
    pub fn with_row_count(rows: u32) -> Self {
        MemorySheets {
            tabs: Mutex::new(HashMap::new()),
            initial_rows: rows,
            fail_reads: AtomicBool::new(false),
            fail_batches: AtomicBool::new(false),
            fail_appends: AtomicBool::new(false),
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every `batchUpdate` (layout and row formatting) fail.
    pub fn fail_batches(&self, fail: bool) {
        self.fail_batches.store(fail, Ordering::SeqCst);
    }

    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Raw content (formula as entered) of a 1-based row and 0-based column.
    pub fn cell(&self, tab: &str, row: u32, col: u32) -> String {
        let tabs = self.tabs.lock().unwrap();
        tabs.get(tab)
            .and_then(|t| t.cells.get(row as usize - 1))
            .and_then(|r| r.get(col as usize))
            .cloned()
            .unwrap_or_default()
    }

    pub fn rows_containing(&self, tab: &str, needle: &str) -> usize {
        let tabs = self.tabs.lock().unwrap();
        tabs.get(tab)
            .map(|t| {
                t.cells
                    .iter()
                    .filter(|row| row.iter().any(|c| c.contains(needle)))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Number of batch updates that (re)merged the label columns.
    pub fn layout_batches(&self, tab: &str) -> usize {
        self.tabs
            .lock()
            .unwrap()
            .get(tab)
            .map(|t| t.layout_batches)
            .unwrap_or(0)
    }

    pub fn row_count(&self, tab: &str) -> u32 {
        self.tabs
            .lock()
            .unwrap()
            .get(tab)
            .map(|t| t.row_count)
            .unwrap_or(0)
    }
}

#[async_trait]
impl SpreadsheetService for MemorySheets {
    async fn ensure_worksheet(&self, title: &str) -> Result<Worksheet, SyncError> {
        let mut tabs = self.tabs.lock().unwrap();
        let next_id = tabs.len() as i64 + 1;
        let tab = tabs.entry(title.to_string()).or_insert_with(|| Tab {
            sheet_id: next_id,
            row_count: self.initial_rows,
            cells: Vec::new(),
            layout_batches: 0,
        });
        Ok(Worksheet {
            sheet_id: tab.sheet_id,
            title: title.to_string(),
            row_count: tab.row_count,
            column_count: NEW_SHEET_COLUMNS,
        })
    }

    async fn read_values(
        &self,
        worksheet: &Worksheet,
        render: ValueRender,
    ) -> Result<Vec<Vec<String>>, SyncError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(SyncError::Upstream("read failed".into()));
        }
        let tabs = self.tabs.lock().unwrap();
        let tab = tabs
            .get(&worksheet.title)
            .ok_or_else(|| SyncError::NotFound(worksheet.title.clone()))?;
        let grid = tab
            .cells
            .iter()
            .map(|row| {
                row.iter()
                    .map(|raw| match render {
                        ValueRender::Formatted => formatted(raw),
                        ValueRender::Formula => raw.clone(),
                    })
                    .collect()
            })
            .collect();
        Ok(trimmed(grid))
    }

    async fn write_row(
        &self,
        worksheet: &Worksheet,
        row: u32,
        start_column: u32,
        values: Vec<Value>,
    ) -> Result<(), SyncError> {
        let mut tabs = self.tabs.lock().unwrap();
        let tab = tabs
            .get_mut(&worksheet.title)
            .ok_or_else(|| SyncError::NotFound(worksheet.title.clone()))?;
        if row == 0 || row > tab.row_count {
            return Err(SyncError::SheetsApi {
                status: 400,
                message: format!("row {row} exceeds grid limits"),
            });
        }
        for (i, value) in values.iter().enumerate() {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            tab.set(row as usize - 1, start_column as usize + i, text);
        }
        Ok(())
    }

    async fn batch_update(&self, requests: Vec<Value>) -> Result<(), SyncError> {
        if self.fail_batches.load(Ordering::SeqCst) {
            return Err(SyncError::SheetsApi {
                status: 429,
                message: "quota exceeded".into(),
            });
        }
        let mut tabs = self.tabs.lock().unwrap();
        let mut merged_sheets = HashSet::new();
        for request in &requests {
            if let Some(update) = request.get("updateCells") {
                let range = &update["range"];
                let text = update["rows"][0]["values"][0]["userEnteredValue"]["stringValue"].as_str();
                let sheet_id = range["sheetId"].as_i64();
                let tab = tabs.values_mut().find(|t| Some(t.sheet_id) == sheet_id);
                if let (Some(tab), Some(text)) = (tab, text) {
                    let row = range["startRowIndex"].as_u64().unwrap_or(0) as usize;
                    let col = range["startColumnIndex"].as_u64().unwrap_or(0) as usize;
                    tab.set(row, col, text.to_string());
                }
            }
            if let Some(sheet_id) = request["mergeCells"]["range"]["sheetId"].as_i64() {
                merged_sheets.insert(sheet_id);
            }
            if let Some(sheet_id) = request["appendDimension"]["sheetId"].as_i64() {
                let length = request["appendDimension"]["length"].as_u64().unwrap_or(0) as u32;
                if let Some(tab) = tabs.values_mut().find(|t| t.sheet_id == sheet_id) {
                    tab.row_count += length;
                }
            }
        }
        for tab in tabs.values_mut() {
            if merged_sheets.contains(&tab.sheet_id) {
                tab.layout_batches += 1;
            }
        }
        Ok(())
    }

    async fn append_rows(&self, worksheet: &Worksheet, count: u32) -> Result<(), SyncError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(SyncError::SheetsApi {
                status: 500,
                message: "backend error".into(),
            });
        }
        let mut tabs = self.tabs.lock().unwrap();
        let tab = tabs
            .get_mut(&worksheet.title)
            .ok_or_else(|| SyncError::NotFound(worksheet.title.clone()))?;
        tab.row_count += count;
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingStatus {
    messages: Mutex<Vec<String>>,
    completed: AtomicBool,
    failure: Mutex<Option<String>>,
}

impl RecordingStatus {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn failure(&self) -> Option<String> {
        self.failure.lock().unwrap().clone()
    }
}

impl StatusSink for RecordingStatus {
    fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }

    fn notify_complete(&self) {
        self.completed.store(true, Ordering::SeqCst);
    }

    fn notify_failed(&self, error: &str) {
        *self.failure.lock().unwrap() = Some(error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatted_hyperlink_shows_title() {
        assert_eq!(
            formatted("=HYPERLINK(\"https://x/watch?v=a\"; \"Say \"\"hi\"\"\")"),
            "Say \"hi\""
        );
        assert_eq!(
            formatted("=HYPERLINK(\"https://x/watch?v=a\", \"A \"\"quoted\"\" word\")"),
            "A \"quoted\" word"
        );
        assert_eq!(formatted("plain"), "plain");
    }
}
