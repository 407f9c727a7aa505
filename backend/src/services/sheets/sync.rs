use crate::models::{link_forms, VideoRecord};
use crate::services::sheets::layout::{self, Block};
use crate::services::sheets::{SpreadsheetService, ValueRender, Worksheet};
use log::{error, info, warn};
use serde_json::{json, Value};

pub const DEFAULT_GROWTH_ROWS: u32 = 100;
pub const DEFAULT_FORMULA_SEPARATOR: char = ';';

#[derive(Debug, Clone)]
pub struct SheetSettings {
    pub growth_rows: u32,
    pub formula_separator: char,
}

impl Default for SheetSettings {
    fn default() -> Self {
        SheetSettings {
            growth_rows: DEFAULT_GROWTH_ROWS,
            formula_separator: DEFAULT_FORMULA_SEPARATOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted { row: u32 },
    /// The link is already somewhere in the sheet; nothing was written.
    AlreadyPresent { row: u32 },
    /// Nothing usable was written; a rerun will retry this link.
    Failed { reason: String },
}

/// First 1-based row holding any of `needles` in either the displayed values or the raw formulas.
pub fn find_link_row(values: &[Vec<String>], formulas: &[Vec<String>], needles: &[String]) -> Option<u32> {
    let scan = |grid: &[Vec<String>]| {
        grid.iter()
            .position(|row| {
                row.iter()
                    .any(|cell| needles.iter().any(|needle| cell.contains(needle.as_str())))
            })
            .map(|i| i as u32 + 1)
    };
    match (scan(values), scan(formulas)) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Last 1-based row with anything in the block's data columns; the header row counts as filled.
pub fn last_filled_row(values: &[Vec<String>], block: &Block) -> u32 {
    let start = block.start_column as usize;
    let end = block.end_column() as usize;
    values
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            row.iter()
                .enumerate()
                .any(|(col, cell)| col >= start && col <= end && !cell.trim().is_empty())
        })
        .map(|(i, _)| i as u32 + 1)
        .max()
        .unwrap_or(1)
        .max(1)
}

pub fn hyperlink_formula(link: &str, title: &str, separator: char) -> String {
    let safe_link: String = link.chars().filter(|c| *c != separator && *c != '"').collect();
    let safe_title = title.replace('"', "\"\"");
    format!("=HYPERLINK(\"{safe_link}\"{separator} \"{safe_title}\")")
}

fn row_values(link: &str, record: &VideoRecord, separator: char) -> Vec<Value> {
    vec![
        json!(hyperlink_formula(link, &record.title, separator)),
        json!(record.view_count),
        json!(record.like_count),
        json!(record.comment_count),
        json!(record.published_at.format("%Y-%m-%d").to_string()),
        json!(record.published_at.format("%H:%M:%S").to_string()),
    ]
}

/// Keeps exactly one formatted row per video link in a worksheet.
/// Not safe to run concurrently against the same worksheet.
pub struct SheetSyncEngine<'a> {
    sheets: &'a dyn SpreadsheetService,
    settings: &'a SheetSettings,
}

impl<'a> SheetSyncEngine<'a> {
    pub fn new(sheets: &'a dyn SpreadsheetService, settings: &'a SheetSettings) -> Self {
        SheetSyncEngine { sheets, settings }
    }

    /// Writes `record` into its category block unless `link` is already in the sheet.
    /// Failures are logged and reported through the outcome so one bad row never stops a batch.
    pub async fn upsert(
        &self,
        worksheet: &mut Worksheet,
        link: &str,
        record: &VideoRecord,
    ) -> UpsertOutcome {
        let values = match self.sheets.read_values(worksheet, ValueRender::Formatted).await {
            Ok(values) => values,
            Err(e) => return Self::lookup_failed(link, e),
        };
        let formulas = match self.sheets.read_values(worksheet, ValueRender::Formula).await {
            Ok(formulas) => formulas,
            Err(e) => return Self::lookup_failed(link, e),
        };

        let mut needles = link_forms(&record.item_id).to_vec();
        needles.push(link.to_string());
        if let Some(row) = find_link_row(&values, &formulas, &needles) {
            info!("Link {link} already exists in '{}' on row {row}", worksheet.title);
            return UpsertOutcome::AlreadyPresent { row };
        }

        if !layout::is_initialized(&values) {
            info!("Initializing layout of '{}'", worksheet.title);
            self.apply_layout(worksheet).await;
        }

        let block = layout::block_for(record.category);
        let row = last_filled_row(&values, &block) + 1;

        if row > worksheet.row_count {
            let growth = self.settings.growth_rows;
            if let Err(e) = self.sheets.append_rows(worksheet, growth).await {
                error!("Could not grow '{}' by {growth} rows: {e}", worksheet.title);
                return UpsertOutcome::Failed {
                    reason: format!("grow sheet: {e}"),
                };
            }
            worksheet.row_count += growth;
            info!("Grew '{}' to {} rows", worksheet.title, worksheet.row_count);
            // Stretch the merged label columns over the new rows.
            self.apply_layout(worksheet).await;
        }

        let cells = row_values(link, record, self.settings.formula_separator);
        if let Err(e) = self
            .sheets
            .write_row(worksheet, row, block.start_column, cells)
            .await
        {
            error!("Could not write {link} to '{}' row {row}: {e}", worksheet.title);
            return UpsertOutcome::Failed {
                reason: format!("write row: {e}"),
            };
        }

        let mut formatting = vec![layout::row_format_request(worksheet.sheet_id, &block, row)];
        formatting.extend(layout::block_color_requests(
            worksheet.sheet_id,
            &block,
            worksheet.row_count,
        ));
        if let Err(e) = self.sheets.batch_update(formatting).await {
            error!("Could not format row {row} of '{}': {e}", worksheet.title);
        }

        info!(
            "Wrote {} '{}' to '{}' row {row}",
            record.category, record.title, worksheet.title
        );
        UpsertOutcome::Inserted { row }
    }

    async fn apply_layout(&self, worksheet: &Worksheet) {
        let requests = layout::layout_requests(worksheet.sheet_id, worksheet.row_count);
        if let Err(e) = self.sheets.batch_update(requests).await {
            error!("Could not lay out '{}': {e}", worksheet.title);
        }
    }

    fn lookup_failed(link: &str, e: crate::error::SyncError) -> UpsertOutcome {
        warn!("Duplicate check for {link} failed, not inserting: {e}");
        UpsertOutcome::Failed {
            reason: format!("duplicate check: {e}"),
        }
    }
}
