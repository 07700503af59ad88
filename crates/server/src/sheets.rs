//! Google Sheets data fetching
//!
//! Two ways to read a spreadsheet: the official v4 API when an API key
//! is configured, or the public CSV export for sheets shared with "anyone
//! with the link". The strategy is chosen once at startup and injected
//! into the client, so nothing here consults the environment.

use std::time::Duration;

/// How spreadsheet data is fetched
#[derive(Debug, Clone)]
pub enum FetchStrategy {
    /// Google Sheets v4 API with an API key
    ApiKey(String),
    /// Public CSV export, no key needed
    PublicCsv,
}

pub struct SheetsClient {
    http: reqwest::Client,
    strategy: FetchStrategy,
}

impl SheetsClient {
    pub fn new(strategy: FetchStrategy) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        Self { http, strategy }
    }

    /// Titles of all tabs in a spreadsheet. Only available through the
    /// API, the CSV export has no metadata endpoint.
    pub async fn list_tabs(&self, sheet_id: &str) -> Result<Vec<String>, String> {
        let FetchStrategy::ApiKey(key) = &self.strategy else {
            return Err("GOOGLE_API_KEY is required to list sheet tabs".to_string());
        };

        let url = reqwest::Url::parse_with_params(
            &format!("https://sheets.googleapis.com/v4/spreadsheets/{sheet_id}"),
            &[("fields", "sheets(properties(title))"), ("key", key.as_str())],
        )
        .map_err(|e| format!("invalid spreadsheet URL: {e}"))?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| format!("tabs request failed: {e}"))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("tabs request failed ({status}): {body}"));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| format!("tabs response parse failed: {e}"))?;

        let tabs = json["sheets"]
            .as_array()
            .map(|sheets| {
                sheets
                    .iter()
                    .filter_map(|sheet| sheet["properties"]["title"].as_str())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        Ok(tabs)
    }

    /// Cell values for a range like `Sheet1!A1:Z100`, as a row-major grid.
    pub async fn fetch_values(
        &self,
        sheet_id: &str,
        full_range: &str,
    ) -> Result<Vec<Vec<String>>, String> {
        match &self.strategy {
            FetchStrategy::ApiKey(key) => self.values_by_api(sheet_id, full_range, key).await,
            FetchStrategy::PublicCsv => self.values_by_csv(sheet_id, full_range).await,
        }
    }

    async fn values_by_api(
        &self,
        sheet_id: &str,
        full_range: &str,
        key: &str,
    ) -> Result<Vec<Vec<String>>, String> {
        let url = reqwest::Url::parse_with_params(
            &format!("https://sheets.googleapis.com/v4/spreadsheets/{sheet_id}/values/{full_range}"),
            &[("key", key)],
        )
        .map_err(|e| format!("invalid values URL: {e}"))?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| format!("values request failed: {e}"))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("values request failed ({status}): {body}"));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| format!("values response parse failed: {e}"))?;

        let values = json["values"]
            .as_array()
            .map(|rows| {
                rows.iter()
                    .map(|row| {
                        row.as_array()
                            .map(|cells| cells.iter().map(cell_to_string).collect())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(values)
    }

    async fn values_by_csv(
        &self,
        sheet_id: &str,
        full_range: &str,
    ) -> Result<Vec<Vec<String>>, String> {
        let (sheet, a1) = parse_full_range(full_range);
        let url = reqwest::Url::parse_with_params(
            &format!("https://docs.google.com/spreadsheets/d/{sheet_id}/gviz/tq"),
            &[
                ("tqx", "out:csv"),
                ("sheet", sheet.as_str()),
                ("range", a1.as_str()),
            ],
        )
        .map_err(|e| format!("invalid CSV export URL: {e}"))?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| format!("CSV export request failed: {e}"))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("CSV export request failed ({status}): {body}"));
        }

        let text = response
            .text()
            .await
            .map_err(|e| format!("CSV export read failed: {e}"))?;
        Ok(parse_csv(&text))
    }
}

fn cell_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Split `Sheet1!A1:Z100` into sheet name and A1 range. Input without a
/// usable `sheet!range` shape falls back to Sheet1, and an empty input
/// means the whole usual column span.
fn parse_full_range(full_range: &str) -> (String, String) {
    if let Some((sheet, a1)) = full_range.split_once('!') {
        if !sheet.is_empty() && !a1.is_empty() {
            return (sheet.to_string(), a1.to_string());
        }
    }
    if full_range.is_empty() {
        ("Sheet1".to_string(), "A:Z".to_string())
    } else {
        ("Sheet1".to_string(), full_range.to_string())
    }
}

fn parse_csv(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .filter(|line| !line.is_empty())
        .map(parse_csv_line)
        .collect()
}

/// Split one CSV line, honoring quoted fields and doubled quotes.
fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '"' {
            if in_quotes && chars.peek() == Some(&'"') {
                current.push('"');
                chars.next();
            } else {
                in_quotes = !in_quotes;
            }
        } else if c == ',' && !in_quotes {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    fields.push(current);
    fields
}
