use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

use crate::{GridSize, SheetBackend};

pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_API_BASE_URL: &str = "https://sheets.googleapis.com";

const ASSERTION_TTL_SECONDS: i64 = 3600;
/// Refresh the access token this long before Google says it expires.
const TOKEN_EXPIRY_SLACK_SECONDS: i64 = 60;

#[derive(Debug, Clone)]
pub struct GoogleSheetsConfig {
    pub spreadsheet_id: String,
    pub client_email: String,
    pub private_key_pem: String,
    pub token_url: String,
    pub api_base_url: String,
}

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("failed to sign service account assertion: {0}")]
    Assertion(#[from] jsonwebtoken::errors::Error),
    #[error("sheets request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("sheets api answered {status}: {body}")]
    Api { status: u16, body: String },
    #[error("invalid sheets api url: {0}")]
    Url(String),
    #[error("spreadsheet has no worksheets")]
    NoSheet,
}

#[derive(Debug, Serialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

/// Signs the RS256 JWT a service account trades for an access token.
pub fn mint_assertion(cfg: &GoogleSheetsConfig, now: DateTime<Utc>) -> Result<String, SheetError> {
    let claims = AssertionClaims {
        iss: cfg.client_email.clone(),
        scope: SPREADSHEETS_SCOPE.to_string(),
        aud: cfg.token_url.clone(),
        iat: now.timestamp(),
        exp: (now + Duration::seconds(ASSERTION_TTL_SECONDS)).timestamp(),
    };
    let key = EncodingKey::from_rsa_pem(cfg.private_key_pem.as_bytes())?;
    Ok(encode(&Header::new(Algorithm::RS256), &claims, &key)?)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_TTL_SECONDS
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
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

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    #[serde(default)]
    sheet_id: i64,
    title: String,
    grid_properties: GridProperties,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridProperties {
    row_count: u32,
    column_count: u32,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Google Sheets v4 REST client authenticated as a service account. Always
/// operates on the first worksheet.
pub struct GoogleSheets {
    http: Client,
    cfg: GoogleSheetsConfig,
    token: Mutex<Option<CachedToken>>,
}

impl GoogleSheets {
    pub fn new(cfg: GoogleSheetsConfig) -> Self {
        Self {
            http: Client::new(),
            cfg,
            token: Mutex::new(None),
        }
    }

    async fn access_token(&self) -> Result<String, SheetError> {
        let mut cached = self.token.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref() {
            if token.expires_at > now {
                return Ok(token.access_token.clone());
            }
        }

        let assertion = mint_assertion(&self.cfg, now)?;
        let response = self
            .http
            .post(&self.cfg.token_url)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;
        let token: TokenResponse = read_json(response).await?;
        debug!(expires_in = token.expires_in, "obtained sheets access token");

        let lifetime = (token.expires_in - TOKEN_EXPIRY_SLACK_SECONDS).max(0);
        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at: now + Duration::seconds(lifetime),
        });
        Ok(token.access_token)
    }

    fn url(&self, segments: &[&str]) -> Result<Url, SheetError> {
        let mut url = Url::parse(&self.cfg.api_base_url).map_err(|e| SheetError::Url(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SheetError::Url(self.cfg.api_base_url.clone()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets"])
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, SheetError> {
        let token = self.access_token().await?;
        let response = request.bearer_auth(token).send().await?;
        read_json(response).await
    }

    async fn first_sheet(&self) -> Result<SheetProperties, SheetError> {
        let url = self.url(&[&self.cfg.spreadsheet_id])?;
        let meta: SpreadsheetMeta = self
            .send(self.http.get(url).query(&[("fields", "sheets.properties")]))
            .await?;
        meta.sheets
            .into_iter()
            .next()
            .map(|entry| entry.properties)
            .ok_or(SheetError::NoSheet)
    }

    fn values_url(&self, title: &str, cells: &str, suffix: &str) -> Result<Url, SheetError> {
        let range = format!("'{}'!{cells}{suffix}", title.replace('\'', "''"));
        self.url(&[&self.cfg.spreadsheet_id, "values", &range])
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, SheetError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SheetError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json().await?)
}

#[async_trait]
impl SheetBackend for GoogleSheets {
    async fn grid_size(&self) -> Result<GridSize> {
        let sheet = self.first_sheet().await?;
        Ok(GridSize {
            rows: sheet.grid_properties.row_count,
            columns: sheet.grid_properties.column_count,
        })
    }

    async fn resize(&self, size: GridSize) -> Result<()> {
        let sheet = self.first_sheet().await?;
        let url = self.url(&[&format!("{}:batchUpdate", self.cfg.spreadsheet_id)])?;
        let body = json!({
            "requests": [{
                "updateSheetProperties": {
                    "properties": {
                        "sheetId": sheet.sheet_id,
                        "gridProperties": {
                            "rowCount": size.rows,
                            "columnCount": size.columns,
                        },
                    },
                    "fields": "gridProperties(rowCount,columnCount)",
                },
            }],
        });
        let _: serde_json::Value = self.send(self.http.post(url).json(&body)).await?;
        info!(
            title = %sheet.title,
            rows = size.rows,
            columns = size.columns,
            "resized sheet"
        );
        Ok(())
    }

    async fn header_row(&self) -> Result<Vec<String>> {
        let sheet = self.first_sheet().await?;
        let url = self.values_url(&sheet.title, "1:1", "")?;
        let range: ValueRange = self
            .send(self.http.get(url).query(&[("majorDimension", "ROWS")]))
            .await?;
        Ok(range.values.into_iter().next().unwrap_or_default())
    }

    async fn set_header_row(&self, headers: &[String]) -> Result<()> {
        let sheet = self.first_sheet().await?;
        let url = self.values_url(&sheet.title, "A1", "")?;
        let body = json!({ "majorDimension": "ROWS", "values": [headers] });
        let _: serde_json::Value = self
            .send(
                self.http
                    .put(url)
                    .query(&[("valueInputOption", "RAW")])
                    .json(&body),
            )
            .await?;
        Ok(())
    }

    async fn append_row(&self, values: &[String]) -> Result<()> {
        let sheet = self.first_sheet().await?;
        let url = self.values_url(&sheet.title, "A1", ":append")?;
        let body = json!({ "majorDimension": "ROWS", "values": [values] });
        let _: serde_json::Value = self
            .send(
                self.http
                    .post(url)
                    .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
                    .json(&body),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/google_tests.rs"]
mod tests;
