use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use tracing::warn;

mod keys;
mod presign;

pub use keys::{extension_for, key_matches_slot, object_key, sanitize_owner_name, KeyError};
pub use presign::{PresignError, Presigner, S3Config};

/// The object store as seen by the backend: it never moves bytes itself,
/// it only hands out write URLs and answers questions about stored keys.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn presign_put(&self, key: &str, content_type: &str) -> Result<String>;
    fn public_url(&self, key: &str) -> String;
    async fn object_exists(&self, key: &str) -> Result<bool>;
}

pub struct S3ObjectStore {
    presigner: Presigner,
    http: Client,
}

impl S3ObjectStore {
    pub fn new(cfg: S3Config) -> Result<Self, PresignError> {
        Ok(Self {
            presigner: Presigner::new(cfg)?,
            http: Client::new(),
        })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn presign_put(&self, key: &str, content_type: &str) -> Result<String> {
        Ok(self.presigner.presign_put(key, content_type, Utc::now())?)
    }

    fn public_url(&self, key: &str) -> String {
        self.presigner.public_url(key)
    }

    async fn object_exists(&self, key: &str) -> Result<bool> {
        let url = self.presigner.presign_head(key, Utc::now())?;
        let response = self
            .http
            .head(url)
            .send()
            .await
            .with_context(|| format!("failed to probe object {key}"))?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                warn!(%key, %status, "unexpected status probing object");
                Err(anyhow!("object store answered {status} for {key}"))
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
