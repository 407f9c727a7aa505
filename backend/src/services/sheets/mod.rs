pub mod google;
pub mod layout;
pub mod sync;

use crate::error::SyncError;
use async_trait::async_trait;
use serde_json::Value;

pub const NEW_SHEET_ROWS: u32 = 1000;
pub const NEW_SHEET_COLUMNS: u32 = 26;

/// One tab of the destination spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worksheet {
    pub sheet_id: i64,
    pub title: String,
    pub row_count: u32,
    pub column_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueRender {
    /// What a viewer sees (a HYPERLINK cell shows its title).
    Formatted,
    /// Raw formulas as entered.
    Formula,
}

/// The spreadsheet operations the sync engine needs. Rows are 1-based, columns 0-based.
#[async_trait]
pub trait SpreadsheetService: Send + Sync {
    /// Opens the tab named `title`, creating it when it does not exist yet.
    async fn ensure_worksheet(&self, title: &str) -> Result<Worksheet, SyncError>;

    /// All cell values of the tab, row-major, trailing empty cells omitted.
    async fn read_values(
        &self,
        worksheet: &Worksheet,
        render: ValueRender,
    ) -> Result<Vec<Vec<String>>, SyncError>;

    /// Writes `values` into `row` starting at `start_column`, interpreting them as user input
    /// (formulas are evaluated).
    async fn write_row(
        &self,
        worksheet: &Worksheet,
        row: u32,
        start_column: u32,
        values: Vec<Value>,
    ) -> Result<(), SyncError>;

    /// Sends raw `batchUpdate` requests (formatting, merges, dimensions).
    async fn batch_update(&self, requests: Vec<Value>) -> Result<(), SyncError>;

    /// Appends `count` empty rows to the tab.
    async fn append_rows(&self, worksheet: &Worksheet, count: u32) -> Result<(), SyncError>;
}
