//! Fixed three-block sheet layout: one 7-column block per category
//! (6 data columns plus a merged, colored label column), separated by a spacer column.

use crate::models::Category;
use serde_json::{json, Value};

pub const DATA_COLUMNS: u32 = 6;
pub const BLOCK_WIDTH: u32 = DATA_COLUMNS + 1;
pub const HEADERS: [&str; DATA_COLUMNS as usize] =
    ["Title", "Views", "Likes", "Comments", "Upload Date", "Upload Time"];
pub const TITLE_COLUMN_PIXELS: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub f32, pub f32, pub f32);

impl Rgb {
    pub fn to_json(self) -> Value {
        json!({ "red": self.0, "green": self.1, "blue": self.2 })
    }
}

const HEADER_BACKGROUND: Rgb = Rgb(0.9, 0.9, 0.9);
const WHITE: Rgb = Rgb(1.0, 1.0, 1.0);
const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);

pub const COLUMN_TINTS: [Rgb; DATA_COLUMNS as usize] = [
    Rgb(1.0, 0.9, 0.9),
    Rgb(0.9, 1.0, 0.9),
    Rgb(0.9, 0.9, 1.0),
    Rgb(1.0, 1.0, 0.9),
    Rgb(0.9, 1.0, 1.0),
    Rgb(1.0, 0.9, 1.0),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    pub category: Category,
    pub start_column: u32,
    pub color: Rgb,
}

impl Block {
    /// Last data column (inclusive).
    pub fn end_column(&self) -> u32 {
        self.start_column + DATA_COLUMNS - 1
    }

    pub fn label_column(&self) -> u32 {
        self.start_column + DATA_COLUMNS
    }
}

pub const BLOCKS: [Block; 3] = [
    Block {
        category: Category::Shorts,
        start_column: 0,
        color: Rgb(0.137, 0.623, 0.733),
    },
    Block {
        category: Category::Live,
        start_column: 8,
        color: Rgb(0.71, 0.004, 0.004),
    },
    Block {
        category: Category::Video,
        start_column: 16,
        color: Rgb(1.0, 0.623, 0.008),
    },
];

pub fn block_for(category: Category) -> Block {
    match category {
        Category::Shorts => BLOCKS[0],
        Category::Live => BLOCKS[1],
        Category::Video => BLOCKS[2],
    }
}

/// Rightmost column the layout touches, plus one.
pub fn required_columns() -> u32 {
    BLOCKS
        .iter()
        .map(|b| b.label_column() + 1)
        .max()
        .unwrap_or(BLOCK_WIDTH)
}

/// True when the first row already carries the headers and category labels.
pub fn is_initialized(values: &[Vec<String>]) -> bool {
    let Some(header_row) = values.first() else {
        return false;
    };
    let cell = |col: u32| header_row.get(col as usize).map(String::as_str).unwrap_or("");
    BLOCKS.iter().all(|block| {
        cell(block.label_column()) == block.category.label()
            && HEADERS
                .iter()
                .enumerate()
                .all(|(i, header)| cell(block.start_column + i as u32) == *header)
    })
}

/// Half-open `[start, end)` row and column ranges, 0-based.
fn grid_range(sheet_id: i64, rows: (u32, u32), columns: (u32, u32)) -> Value {
    json!({
        "sheetId": sheet_id,
        "startRowIndex": rows.0,
        "endRowIndex": rows.1,
        "startColumnIndex": columns.0,
        "endColumnIndex": columns.1,
    })
}

fn header_cell(sheet_id: i64, column: u32, text: &str, background: Rgb, foreground: Rgb, size: u32) -> Value {
    json!({
        "updateCells": {
            "range": grid_range(sheet_id, (0, 1), (column, column + 1)),
            "rows": [{
                "values": [{
                    "userEnteredValue": { "stringValue": text },
                    "userEnteredFormat": {
                        "backgroundColor": background.to_json(),
                        "horizontalAlignment": "CENTER",
                        "textFormat": {
                            "foregroundColor": foreground.to_json(),
                            "fontSize": size,
                            "bold": true
                        }
                    }
                }]
            }],
            "fields": "userEnteredValue,userEnteredFormat(backgroundColor,textFormat,horizontalAlignment)"
        }
    })
}

fn background(sheet_id: i64, rows: (u32, u32), column: u32, color: Rgb) -> Value {
    json!({
        "repeatCell": {
            "range": grid_range(sheet_id, rows, (column, column + 1)),
            "cell": { "userEnteredFormat": { "backgroundColor": color.to_json() } },
            "fields": "userEnteredFormat(backgroundColor)"
        }
    })
}

/// Column tints for every data column of `block` and the category color on its label column,
/// from the first data row down to `row_count`.
pub fn block_color_requests(sheet_id: i64, block: &Block, row_count: u32) -> Vec<Value> {
    let mut requests: Vec<Value> = COLUMN_TINTS
        .iter()
        .enumerate()
        .map(|(i, tint)| background(sheet_id, (1, row_count), block.start_column + i as u32, *tint))
        .collect();
    requests.push(background(
        sheet_id,
        (1, row_count),
        block.label_column(),
        block.color,
    ));
    requests
}

/// Every request needed to lay out a sheet of `row_count` rows. Re-sending them is
/// harmless: values and formats are overwritten with the same content, and the label
/// columns are unmerged before being merged again.
pub fn layout_requests(sheet_id: i64, row_count: u32) -> Vec<Value> {
    let mut requests = Vec::new();

    for block in BLOCKS.iter() {
        let label = block.label_column();
        requests.push(header_cell(sheet_id, label, block.category.label(), block.color, WHITE, 14));

        for (i, header) in HEADERS.iter().enumerate() {
            requests.push(header_cell(
                sheet_id,
                block.start_column + i as u32,
                header,
                HEADER_BACKGROUND,
                BLACK,
                12,
            ));
        }

        requests.extend(block_color_requests(sheet_id, block, row_count));

        let label_range = grid_range(sheet_id, (1, row_count), (label, label + 1));
        requests.push(json!({ "unmergeCells": { "range": label_range } }));
        requests.push(json!({ "mergeCells": { "range": label_range, "mergeType": "MERGE_ALL" } }));

        requests.push(json!({
            "updateDimensionProperties": {
                "range": {
                    "sheetId": sheet_id,
                    "dimension": "COLUMNS",
                    "startIndex": block.start_column,
                    "endIndex": block.start_column + 1
                },
                "properties": { "pixelSize": TITLE_COLUMN_PIXELS },
                "fields": "pixelSize"
            }
        }));
    }

    requests.push(json!({
        "updateSheetProperties": {
            "properties": { "sheetId": sheet_id, "gridProperties": { "frozenRowCount": 1 } },
            "fields": "gridProperties.frozenRowCount"
        }
    }));
    requests
}

/// Bold, left-aligned, clipped text across the data cells of one row.
pub fn row_format_request(sheet_id: i64, block: &Block, row: u32) -> Value {
    json!({
        "repeatCell": {
            "range": grid_range(sheet_id, (row - 1, row), (block.start_column, block.end_column() + 1)),
            "cell": {
                "userEnteredFormat": {
                    "textFormat": { "bold": true },
                    "horizontalAlignment": "LEFT",
                    "wrapStrategy": "CLIP"
                }
            },
            "fields": "userEnteredFormat(textFormat,horizontalAlignment,wrapStrategy)"
        }
    })
}
