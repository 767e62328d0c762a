use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::GoogleConfig;
use crate::db::models::row::{bool_cell, cell, Row};
use crate::error::{AppError, AppResult};
use crate::services::google::GoogleAuth;

/// A sheet to create inside a new spreadsheet, with its header row.
#[derive(Debug, Clone)]
pub struct SheetSpec {
    pub name: String,
    pub header: Vec<String>,
}

impl SheetSpec {
    pub fn new(name: &str, header: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            header: header.iter().map(|h| h.to_string()).collect(),
        }
    }
}

/// Spreadsheet service used as the datastore.
///
/// Row indexes are 1-based sheet rows (row 1 is the header). Every call is an
/// independent request: there is no batching, locking or version check, so a
/// racing overwrite can clobber another write.
#[async_trait]
pub trait SheetStore: Send + Sync + 'static {
    /// All rows of a sheet, header included.
    async fn read_rows(&self, spreadsheet_id: &str, sheet: &str) -> AppResult<Vec<Row>>;

    async fn append_row(&self, spreadsheet_id: &str, sheet: &str, row: Row) -> AppResult<()>;

    async fn update_row(
        &self,
        spreadsheet_id: &str,
        sheet: &str,
        row_index: usize,
        row: Row,
    ) -> AppResult<()>;

    async fn update_cell(
        &self,
        spreadsheet_id: &str,
        sheet: &str,
        row_index: usize,
        column: usize,
        value: String,
    ) -> AppResult<()>;

    /// Create a spreadsheet with the given sheets and header rows; returns its id.
    async fn create_spreadsheet(
        &self,
        title: &str,
        folder_id: Option<&str>,
        sheets: &[SheetSpec],
    ) -> AppResult<String>;

    /// Linear scan for the first data row whose column 0 equals `id`.
    async fn find_row_by_id(
        &self,
        spreadsheet_id: &str,
        sheet: &str,
        id: &str,
    ) -> AppResult<Option<(usize, Row)>> {
        self.find_row_by_column(spreadsheet_id, sheet, 0, id).await
    }

    /// Linear scan for the first data row whose `column` equals `value`.
    async fn find_row_by_column(
        &self,
        spreadsheet_id: &str,
        sheet: &str,
        column: usize,
        value: &str,
    ) -> AppResult<Option<(usize, Row)>> {
        let rows = self.read_rows(spreadsheet_id, sheet).await?;
        Ok(rows
            .into_iter()
            .enumerate()
            .skip(1)
            .find(|(_, row)| cell(row, column).trim() == value)
            .map(|(idx, row)| (idx + 1, row)))
    }
}

/// Spreadsheet column letters: 0 -> A, 25 -> Z, 26 -> AA.
pub fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.iter().rev().collect()
}

/// Quote a sheet name for A1 notation (`'my sheet'!A1`).
fn quoted(sheet: &str) -> String {
    format!("'{}'", sheet.replace('\'', "''"))
}

fn row_range(sheet: &str, row_index: usize, width: usize) -> String {
    format!(
        "{}!A{}:{}{}",
        quoted(sheet),
        row_index,
        column_letter(width.saturating_sub(1)),
        row_index
    )
}

fn cell_range(sheet: &str, row_index: usize, column: usize) -> String {
    format!("{}!{}{}", quoted(sheet), column_letter(column), row_index)
}

fn value_to_cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => bool_cell(*b),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedSpreadsheet {
    spreadsheet_id: String,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    #[serde(default)]
    parents: Vec<String>,
}

/// Google Sheets (and Drive, for folder placement) over REST.
#[derive(Debug, Clone)]
pub struct GoogleSheetsClient {
    client: Client,
    auth: GoogleAuth,
    sheets_api_url: String,
    drive_api_url: String,
}

impl GoogleSheetsClient {
    pub fn new(client: Client, auth: GoogleAuth, config: &GoogleConfig) -> Self {
        Self {
            client,
            auth,
            sheets_api_url: config.sheets_api_url.trim_end_matches('/').to_string(),
            drive_api_url: config.drive_api_url.trim_end_matches('/').to_string(),
        }
    }

    fn values_url(&self, spreadsheet_id: &str, range: &str) -> String {
        format!(
            "{}/{}/values/{}",
            self.sheets_api_url,
            spreadsheet_id,
            urlencoding::encode(range)
        )
    }

    async fn check(response: reqwest::Response, action: &str) -> AppResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        Err(AppError::Sheets(format!(
            "Failed to {} ({}): {}",
            action, status, error_text
        )))
    }

    async fn put_values(&self, spreadsheet_id: &str, range: String, row: Row) -> AppResult<()> {
        let token = self.auth.access_token().await?;
        let response = self
            .client
            .put(self.values_url(spreadsheet_id, &range))
            .bearer_auth(token)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "range": range, "majorDimension": "ROWS", "values": [row] }))
            .send()
            .await?;
        Self::check(response, "update values").await?;
        Ok(())
    }

    async fn move_to_folder(&self, file_id: &str, folder_id: &str) -> AppResult<()> {
        let token = self.auth.access_token().await?;
        let url = format!("{}/files/{}", self.drive_api_url, file_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .query(&[("fields", "parents"), ("supportsAllDrives", "true")])
            .send()
            .await?;
        let file: DriveFile = Self::check(response, "read file parents")
            .await?
            .json()
            .await
            .map_err(|e| AppError::Sheets(format!("Failed to parse file metadata: {}", e)))?;

        let remove = file.parents.join(",");
        let response = self
            .client
            .patch(&url)
            .bearer_auth(&token)
            .query(&[
                ("addParents", folder_id),
                ("removeParents", remove.as_str()),
                ("supportsAllDrives", "true"),
            ])
            .json(&json!({}))
            .send()
            .await?;
        Self::check(response, "move spreadsheet to folder").await?;
        Ok(())
    }
}

#[async_trait]
impl SheetStore for GoogleSheetsClient {
    async fn read_rows(&self, spreadsheet_id: &str, sheet: &str) -> AppResult<Vec<Row>> {
        let token = self.auth.access_token().await?;
        let response = self
            .client
            .get(self.values_url(spreadsheet_id, &quoted(sheet)))
            .bearer_auth(token)
            .query(&[
                ("majorDimension", "ROWS"),
                ("valueRenderOption", "FORMATTED_VALUE"),
            ])
            .send()
            .await?;

        let range: ValueRange = Self::check(response, "read range")
            .await?
            .json()
            .await
            .map_err(|e| AppError::Sheets(format!("Failed to parse value range: {}", e)))?;

        Ok(range
            .values
            .iter()
            .map(|row| row.iter().map(value_to_cell).collect())
            .collect())
    }

    async fn append_row(&self, spreadsheet_id: &str, sheet: &str, row: Row) -> AppResult<()> {
        let token = self.auth.access_token().await?;
        let url = format!("{}:append", self.values_url(spreadsheet_id, &quoted(sheet)));
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({ "majorDimension": "ROWS", "values": [row] }))
            .send()
            .await?;
        Self::check(response, "append row").await?;
        Ok(())
    }

    async fn update_row(
        &self,
        spreadsheet_id: &str,
        sheet: &str,
        row_index: usize,
        row: Row,
    ) -> AppResult<()> {
        let range = row_range(sheet, row_index, row.len());
        self.put_values(spreadsheet_id, range, row).await
    }

    async fn update_cell(
        &self,
        spreadsheet_id: &str,
        sheet: &str,
        row_index: usize,
        column: usize,
        value: String,
    ) -> AppResult<()> {
        let range = cell_range(sheet, row_index, column);
        self.put_values(spreadsheet_id, range, vec![value]).await
    }

    async fn create_spreadsheet(
        &self,
        title: &str,
        folder_id: Option<&str>,
        sheets: &[SheetSpec],
    ) -> AppResult<String> {
        let sheet_bodies: Vec<Value> = sheets
            .iter()
            .map(|spec| {
                let header: Vec<Value> = spec
                    .header
                    .iter()
                    .map(|h| json!({ "userEnteredValue": { "stringValue": h } }))
                    .collect();
                json!({
                    "properties": { "title": spec.name, "gridProperties": { "frozenRowCount": 1 } },
                    "data": [{ "startRow": 0, "startColumn": 0, "rowData": [{ "values": header }] }]
                })
            })
            .collect();

        let token = self.auth.access_token().await?;
        let response = self
            .client
            .post(&self.sheets_api_url)
            .bearer_auth(token)
            .json(&json!({ "properties": { "title": title }, "sheets": sheet_bodies }))
            .send()
            .await?;

        let created: CreatedSpreadsheet = Self::check(response, "create spreadsheet")
            .await?
            .json()
            .await
            .map_err(|e| AppError::Sheets(format!("Failed to parse created spreadsheet: {}", e)))?;

        if let Some(folder_id) = folder_id {
            // The spreadsheet is already usable; a failed move only affects Drive organisation.
            if let Err(e) = self.move_to_folder(&created.spreadsheet_id, folder_id).await {
                tracing::warn!(
                    "Failed to move spreadsheet {} into folder {}: {:?}",
                    created.spreadsheet_id,
                    folder_id,
                    e
                );
            }
        }

        tracing::info!("Created spreadsheet {} ({})", created.spreadsheet_id, title);
        Ok(created.spreadsheet_id)
    }
}
