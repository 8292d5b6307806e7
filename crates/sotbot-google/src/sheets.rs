//! Google Sheets values API: ranged reads, cell updates and row appends
//! against the department's spreadsheet.

use std::sync::Arc;

use reqwest::header;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::{build_http_client, execute_with_retry, GoogleError, RequestConfig, TokenProvider};

const SHEETS_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets/";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Serialize)]
struct ValueRangeBody<'a> {
    values: &'a [Vec<String>],
}

/// Worksheet cells arrive as JSON scalars; everything is flattened to the
/// string the user would see in the cell.
fn cell_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub struct SheetsClient {
    http: reqwest::Client,
    auth: Arc<TokenProvider>,
    base: Url,
    spreadsheet_id: String,
    config: RequestConfig,
}

impl SheetsClient {
    /// Client for one spreadsheet.
    ///
    /// # Errors
    /// Returns an error when the API base URL cannot be parsed.
    pub fn new(auth: Arc<TokenProvider>, spreadsheet_id: impl Into<String>) -> Result<Self, GoogleError> {
        Self::with_config(auth, spreadsheet_id, RequestConfig::default())
    }

    /// Client for one spreadsheet with custom request configuration.
    ///
    /// # Errors
    /// Returns an error when the API base URL cannot be parsed.
    pub fn with_config(
        auth: Arc<TokenProvider>,
        spreadsheet_id: impl Into<String>,
        config: RequestConfig,
    ) -> Result<Self, GoogleError> {
        let base = Url::parse(SHEETS_BASE)
            .map_err(|err| GoogleError::Api(format!("invalid sheets base url: {err}")))?;
        Ok(Self {
            http: build_http_client(&config),
            auth,
            base,
            spreadsheet_id: spreadsheet_id.into(),
            config,
        })
    }

    fn values_url(&self, range: &str) -> Result<Url, GoogleError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| GoogleError::Api("sheets base url cannot be a base".to_string()))?
            .push(&self.spreadsheet_id)
            .push("values")
            .push(range);
        Ok(url)
    }

    /// Read a range (`Лист!A:AZ`) as rows of display strings. Rows can be
    /// ragged; trailing empty cells are simply absent.
    ///
    /// # Errors
    /// Returns an error when the request fails or the response cannot be
    /// decoded.
    pub async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, GoogleError> {
        let url = self.values_url(range)?;
        let bearer = self.auth.bearer().await?;

        let response = execute_with_retry(&self.config, || async {
            self.http
                .get(url.clone())
                .header(header::AUTHORIZATION, bearer.clone())
                .header(header::ACCEPT, "application/json")
                .send()
                .await
        })
        .await?;

        let body: ValueRange = response.json().await?;
        Ok(body
            .values
            .iter()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect())
    }

    /// Overwrite a range with the given values (`USER_ENTERED`, so dates and
    /// numbers keep their worksheet formatting).
    ///
    /// # Errors
    /// Returns an error when the request fails.
    pub async fn update_values(
        &self,
        range: &str,
        values: &[Vec<String>],
    ) -> Result<(), GoogleError> {
        let mut url = self.values_url(range)?;
        url.query_pairs_mut().append_pair("valueInputOption", "USER_ENTERED");
        let bearer = self.auth.bearer().await?;
        let body = ValueRangeBody { values };

        execute_with_retry(&self.config, || async {
            self.http
                .put(url.clone())
                .header(header::AUTHORIZATION, bearer.clone())
                .json(&body)
                .send()
                .await
        })
        .await?;
        Ok(())
    }

    /// Update one cell, addressed by sheet, column letter and 1-based row.
    ///
    /// # Errors
    /// Returns an error when the request fails.
    pub async fn update_cell(
        &self,
        sheet: &str,
        column: &str,
        row: u32,
        value: &str,
    ) -> Result<(), GoogleError> {
        let range = a1_cell_ref(sheet, column, row);
        self.update_values(&range, &[vec![value.to_string()]]).await
    }

    /// Append one row after the last data row of a sheet.
    ///
    /// # Errors
    /// Returns an error when the request fails.
    pub async fn append_row(&self, sheet: &str, row: &[String]) -> Result<(), GoogleError> {
        let mut url = self.values_url(&format!("{sheet}!A:Z:append"))?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED")
            .append_pair("insertDataOption", "INSERT_ROWS");
        let bearer = self.auth.bearer().await?;
        let values = [row.to_vec()];
        let body = ValueRangeBody { values: &values };

        execute_with_retry(&self.config, || async {
            self.http
                .post(url.clone())
                .header(header::AUTHORIZATION, bearer.clone())
                .json(&body)
                .send()
                .await
        })
        .await?;
        Ok(())
    }
}

fn a1_cell_ref(sheet: &str, column: &str, row: u32) -> String {
    format!("{sheet}!{column}{row}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_flatten_to_display_strings() {
        assert_eq!(cell_to_string(&Value::String("да".to_string())), "да");
        assert_eq!(cell_to_string(&Value::Null), "");
        assert_eq!(cell_to_string(&serde_json::json!(12)), "12");
        assert_eq!(cell_to_string(&serde_json::json!(1.5)), "1.5");
    }

    #[test]
    fn range_urls_percent_encode_sheet_names() {
        let provider = Arc::new(TokenProvider::fixed("t"));
        let client = match SheetsClient::new(provider, "sheet-id") {
            Ok(client) => client,
            Err(err) => panic!("client should build: {err}"),
        };
        let url = match client.values_url("График!A:AZ") {
            Ok(url) => url,
            Err(err) => panic!("url should build: {err}"),
        };
        let rendered = url.to_string();
        assert!(rendered.starts_with("https://sheets.googleapis.com/v4/spreadsheets/sheet-id/values/"));
        assert!(!rendered.contains("График"));
        assert!(rendered.contains("!A:AZ") || rendered.contains("%21A:AZ"));
    }
}
