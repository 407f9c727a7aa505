use crate::error::SyncError;
use crate::services::sheets::layout::required_columns;
use crate::services::sheets::{
    SpreadsheetService, ValueRender, Worksheet, NEW_SHEET_COLUMNS, NEW_SHEET_ROWS,
};
use crate::utils::{a1_row_range, quote_sheet_title};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets/";

/// Google Sheets v4 REST client bound to one spreadsheet.
pub struct GoogleSheetsClient {
    http: Client,
    access_token: String,
    spreadsheet_id: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
    #[serde(default)]
    grid_properties: GridProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridProperties {
    #[serde(default)]
    row_count: u32,
    #[serde(default)]
    column_count: u32,
}

impl From<SheetProperties> for Worksheet {
    fn from(p: SheetProperties) -> Self {
        Worksheet {
            sheet_id: p.sheet_id,
            title: p.title,
            row_count: p.grid_properties.row_count,
            column_count: p.grid_properties.column_count,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl GoogleSheetsClient {
    pub fn new(http: Client, access_token: impl Into<String>, spreadsheet_id: impl Into<String>) -> Self {
        GoogleSheetsClient {
            http,
            access_token: access_token.into(),
            spreadsheet_id: spreadsheet_id.into(),
        }
    }

    /// `https://sheets.googleapis.com/v4/spreadsheets/<id><suffix>`, with extra
    /// path segments percent-encoded (A1 ranges contain quotes, `!` and spaces).
    fn endpoint(&self, suffix: &str, segments: &[&str]) -> Result<Url, SyncError> {
        let mut url = Url::parse(&format!("{SHEETS_API_BASE}{}{suffix}", self.spreadsheet_id))
            .map_err(|e| SyncError::MalformedInput(format!("bad spreadsheet id: {e}")))?;
        if !segments.is_empty() {
            url.path_segments_mut()
                .map_err(|_| SyncError::MalformedInput("spreadsheet URL cannot take segments".into()))?
                .extend(segments);
        }
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, SyncError> {
        let response = request.bearer_auth(&self.access_token).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            return Err(SyncError::NotFound(format!(
                "spreadsheet {}: {message}",
                self.spreadsheet_id
            )));
        }
        Err(SyncError::SheetsApi {
            status: status.as_u16(),
            message,
        })
    }

    async fn find_worksheet(&self, title: &str) -> Result<Option<Worksheet>, SyncError> {
        let url = self.endpoint("", &[])?;
        let meta: SpreadsheetMeta = self
            .send(self.http.get(url).query(&[("fields", "sheets.properties")]))
            .await?
            .json()
            .await?;
        Ok(meta
            .sheets
            .into_iter()
            .map(|entry| entry.properties)
            .find(|p| p.title == title)
            .map(Worksheet::from))
    }

    async fn add_worksheet(&self, title: &str) -> Result<Worksheet, SyncError> {
        let url = self.endpoint(":batchUpdate", &[])?;
        let body = json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": title,
                        "gridProperties": {
                            "rowCount": NEW_SHEET_ROWS,
                            "columnCount": NEW_SHEET_COLUMNS.max(required_columns())
                        }
                    }
                }
            }]
        });
        let reply: Value = self.send(self.http.post(url).json(&body)).await?.json().await?;
        let properties = reply["replies"][0]["addSheet"]["properties"].clone();
        let properties: SheetProperties = serde_json::from_value(properties)
            .map_err(|e| SyncError::Upstream(format!("unexpected addSheet reply: {e}")))?;
        Ok(properties.into())
    }
}

#[async_trait]
impl SpreadsheetService for GoogleSheetsClient {
    async fn ensure_worksheet(&self, title: &str) -> Result<Worksheet, SyncError> {
        debug!("Opening worksheet '{title}' in {}", self.spreadsheet_id);
        if let Some(worksheet) = self.find_worksheet(title).await? {
            return Ok(worksheet);
        }
        info!("Worksheet '{title}' not found, creating it");
        self.add_worksheet(title).await
    }

    async fn read_values(
        &self,
        worksheet: &Worksheet,
        render: ValueRender,
    ) -> Result<Vec<Vec<String>>, SyncError> {
        let range = quote_sheet_title(&worksheet.title);
        let url = self.endpoint("", &["values", &range])?;
        let render_option = match render {
            ValueRender::Formatted => "FORMATTED_VALUE",
            ValueRender::Formula => "FORMULA",
        };
        let range: ValueRange = self
            .send(self.http.get(url).query(&[("valueRenderOption", render_option)]))
            .await?
            .json()
            .await?;
        Ok(range
            .values
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect())
    }

    async fn write_row(
        &self,
        worksheet: &Worksheet,
        row: u32,
        start_column: u32,
        values: Vec<Value>,
    ) -> Result<(), SyncError> {
        let end_column = start_column + (values.len().max(1) as u32) - 1;
        let range = a1_row_range(&worksheet.title, start_column, end_column, row);
        let url = self.endpoint("", &["values", &range])?;
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": [values],
        });
        self.send(
            self.http
                .put(url)
                .query(&[("valueInputOption", "USER_ENTERED")])
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn batch_update(&self, requests: Vec<Value>) -> Result<(), SyncError> {
        if requests.is_empty() {
            return Ok(());
        }
        let url = self.endpoint(":batchUpdate", &[])?;
        self.send(self.http.post(url).json(&json!({ "requests": requests })))
            .await?;
        Ok(())
    }

    async fn append_rows(&self, worksheet: &Worksheet, count: u32) -> Result<(), SyncError> {
        self.batch_update(vec![json!({
            "appendDimension": {
                "sheetId": worksheet.sheet_id,
                "dimension": "ROWS",
                "length": count
            }
        })])
        .await
    }
}
