use std::{collections::HashMap, path::Path, str::FromStr, sync::Arc};

use anyhow::{bail, Context};
use chrono::FixedOffset;
use config::{Config, Environment, File, FileFormat};
use object_storage::S3Config;
use serde::Deserialize;
use server_api::{SubmissionConfig, DEFAULT_MIN_ROWS};
use sheets::{
    GoogleSheets, GoogleSheetsConfig, InMemorySheet, SheetBackend, DEFAULT_API_BASE_URL,
    DEFAULT_TOKEN_URL,
};
use tracing::warn;

/// Plain variables the deployment has always used, mapped onto settings keys.
/// `APP__*` variables take precedence over these.
const LEGACY_VARS: &[(&str, &str)] = &[
    ("SERVER_BIND", "server_bind"),
    ("REGION", "storage.region"),
    ("AWS_REGION", "storage.region"),
    ("BUCKET_NAME", "storage.bucket"),
    ("AWS_BUCKET_NAME", "storage.bucket"),
    ("AWS_ACCESS_KEY_ID", "storage.access_key_id"),
    ("AWS_SECRET_ACCESS_KEY", "storage.secret_access_key"),
    ("GOOGLE_SHEETS_CLIENT_EMAIL", "sheets.client_email"),
    ("GOOGLE_SHEETS_PRIVATE_KEY", "sheets.private_key"),
    ("GOOGLE_SHEETS_SHEET_ID", "sheets.spreadsheet_id"),
];

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server_bind: String,
    pub max_body_bytes: usize,
    pub storage: StorageSettings,
    pub sheets: SheetsSettings,
    pub submission: SubmissionSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            max_body_bytes: 256 * 1024,
            storage: StorageSettings::default(),
            sheets: SheetsSettings::default(),
            submission: SubmissionSettings::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub region: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint: Option<String>,
    pub public_base_url: Option<String>,
    pub presign_ttl_seconds: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            region: "ap-northeast-1".into(),
            bucket: String::new(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            endpoint: None,
            public_base_url: None,
            presign_ttl_seconds: 3600,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetBackendKind {
    #[default]
    Google,
    Memory,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SheetsSettings {
    pub backend: SheetBackendKind,
    pub spreadsheet_id: String,
    pub client_email: String,
    pub private_key: String,
    pub token_url: String,
    pub api_base_url: String,
}

impl Default for SheetsSettings {
    fn default() -> Self {
        Self {
            backend: SheetBackendKind::Google,
            spreadsheet_id: String::new(),
            client_email: String::new(),
            private_key: String::new(),
            token_url: DEFAULT_TOKEN_URL.into(),
            api_base_url: DEFAULT_API_BASE_URL.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SubmissionSettings {
    /// UTC offset of the timestamp column, e.g. `+09:00`.
    pub utc_offset: String,
    pub verify_uploads: bool,
    pub min_rows: u32,
}

impl Default for SubmissionSettings {
    fn default() -> Self {
        Self {
            utc_offset: "+09:00".into(),
            verify_uploads: true,
            min_rows: DEFAULT_MIN_ROWS,
        }
    }
}

pub fn load_settings() -> anyhow::Result<Settings> {
    let vars: HashMap<String, String> = std::env::vars().collect();
    load_settings_from(Path::new("server.toml"), &vars)
}

/// Defaults, then `path` if it exists, then the legacy variables, then
/// `APP__*` variables (`APP__STORAGE__BUCKET` sets `storage.bucket`).
pub fn load_settings_from(path: &Path, vars: &HashMap<String, String>) -> anyhow::Result<Settings> {
    let mut legacy = Config::builder();
    for (name, key) in LEGACY_VARS {
        if let Some(value) = vars.get(*name).filter(|v| !v.trim().is_empty()) {
            legacy = legacy.set_override(*key, value.clone())?;
        }
    }

    let mut settings: Settings = Config::builder()
        .add_source(File::from(path).format(FileFormat::Toml).required(false))
        .add_source(legacy.build()?)
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(Some(vars.clone().into_iter().collect())),
        )
        .build()
        .with_context(|| format!("failed to read settings from {}", path.display()))?
        .try_deserialize()
        .context("invalid settings")?;

    settings.sheets.private_key = unescape_newlines(&settings.sheets.private_key);
    Ok(settings)
}

/// Keys pasted into a single-line variable carry literal `\n` sequences.
pub fn unescape_newlines(raw: &str) -> String {
    raw.replace("\\n", "\n")
}

impl Settings {
    pub fn s3_config(&self) -> anyhow::Result<S3Config> {
        let storage = &self.storage;
        let missing = missing_values(&[
            ("storage.bucket", &storage.bucket),
            ("storage.access_key_id", &storage.access_key_id),
            ("storage.secret_access_key", &storage.secret_access_key),
        ]);
        if !missing.is_empty() {
            bail!("object storage needs {}", missing.join(", "));
        }
        Ok(S3Config {
            bucket: storage.bucket.clone(),
            region: storage.region.clone(),
            access_key_id: storage.access_key_id.clone(),
            secret_access_key: storage.secret_access_key.clone(),
            endpoint: storage.endpoint.clone(),
            public_base_url: storage.public_base_url.clone(),
            presign_ttl_seconds: storage.presign_ttl_seconds,
        })
    }

    pub fn submission_config(&self) -> anyhow::Result<SubmissionConfig> {
        let business_offset = FixedOffset::from_str(self.submission.utc_offset.trim())
            .map_err(|e| anyhow::anyhow!("invalid utc_offset {:?}: {e}", self.submission.utc_offset))?;
        Ok(SubmissionConfig {
            business_offset,
            verify_uploads: self.submission.verify_uploads,
            min_rows: self.submission.min_rows,
        })
    }

    pub fn sheet_backend(&self) -> anyhow::Result<Arc<dyn SheetBackend>> {
        let sheets = &self.sheets;
        match sheets.backend {
            SheetBackendKind::Memory => {
                warn!("using in-memory sheet; submissions are lost on restart");
                Ok(Arc::new(InMemorySheet::new()))
            }
            SheetBackendKind::Google => {
                let missing = missing_values(&[
                    ("sheets.spreadsheet_id", &sheets.spreadsheet_id),
                    ("sheets.client_email", &sheets.client_email),
                    ("sheets.private_key", &sheets.private_key),
                ]);
                if !missing.is_empty() {
                    bail!("google sheets backend needs {}", missing.join(", "));
                }
                Ok(Arc::new(GoogleSheets::new(GoogleSheetsConfig {
                    spreadsheet_id: sheets.spreadsheet_id.clone(),
                    client_email: sheets.client_email.clone(),
                    private_key_pem: sheets.private_key.clone(),
                    token_url: sheets.token_url.clone(),
                    api_base_url: sheets.api_base_url.clone(),
                })))
            }
        }
    }
}

fn missing_values(pairs: &[(&'static str, &String)]) -> Vec<&'static str> {
    pairs
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect()
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
