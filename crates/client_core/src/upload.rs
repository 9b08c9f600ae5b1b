use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::future::try_join_all;
use reqwest::{header::CONTENT_TYPE, Client};
use shared::{
    domain::FileSlot,
    protocol::{UploadTarget, UploadTargetRequest},
};
use thiserror::Error;
use tracing::{info, warn};

use crate::backend::SurveyBackend;

/// A file chosen for a slot but not yet transferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PendingFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads `path`, guessing the content type from its extension.
    pub async fn from_path(path: &Path) -> Result<Self, UploadError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| UploadError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{slot}: file {file_name:?} is empty")]
    Empty { slot: FileSlot, file_name: String },
    #[error("{slot}: file {file_name:?} is {size} bytes, the limit is {limit}")]
    TooLarge {
        slot: FileSlot,
        file_name: String,
        size: u64,
        limit: u64,
    },
    #[error("{slot}: could not obtain an upload url: {source}")]
    Target {
        slot: FileSlot,
        source: anyhow::Error,
    },
    #[error("{slot}: transfer failed: {source}")]
    Transfer {
        slot: FileSlot,
        source: reqwest::Error,
    },
    #[error("{slot}: object store answered {status}")]
    Rejected { slot: FileSlot, status: u16 },
}

impl UploadError {
    pub fn slot(&self) -> Option<FileSlot> {
        match self {
            UploadError::Read { .. } => None,
            UploadError::Empty { slot, .. }
            | UploadError::TooLarge { slot, .. }
            | UploadError::Target { slot, .. }
            | UploadError::Transfer { slot, .. }
            | UploadError::Rejected { slot, .. } => Some(*slot),
        }
    }
}

/// Gets write URLs from the backend and transfers bytes straight to the
/// object store.
#[derive(Clone)]
pub struct UploadClient {
    backend: Arc<dyn SurveyBackend>,
    http: Client,
}

impl UploadClient {
    pub fn new(backend: Arc<dyn SurveyBackend>) -> Self {
        Self {
            backend,
            http: Client::new(),
        }
    }

    pub fn check_size(slot: FileSlot, file: &PendingFile) -> Result<(), UploadError> {
        if file.is_empty() {
            return Err(UploadError::Empty {
                slot,
                file_name: file.file_name.clone(),
            });
        }
        let limit = slot.max_bytes();
        if file.len() > limit {
            return Err(UploadError::TooLarge {
                slot,
                file_name: file.file_name.clone(),
                size: file.len(),
                limit,
            });
        }
        Ok(())
    }

    pub async fn request_upload_target(
        &self,
        slot: FileSlot,
        owner_name: &str,
        content_type: &str,
    ) -> Result<UploadTarget, UploadError> {
        self.backend
            .request_upload_target(&UploadTargetRequest {
                slot,
                owner_name: owner_name.to_string(),
                content_type: content_type.to_string(),
            })
            .await
            .map_err(|source| UploadError::Target { slot, source })
    }

    pub async fn put_object(
        &self,
        slot: FileSlot,
        upload_url: &str,
        file: &PendingFile,
    ) -> Result<(), UploadError> {
        let response = self
            .http
            .put(upload_url)
            .header(CONTENT_TYPE, file.content_type.as_str())
            .body(file.bytes.clone())
            .send()
            .await
            .map_err(|source| UploadError::Transfer { slot, source })?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            warn!(%slot, %status, "object store refused upload");
            return Err(UploadError::Rejected {
                slot,
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    /// Uploads one file and returns the key it was stored under.
    pub async fn upload(
        &self,
        owner_name: &str,
        slot: FileSlot,
        file: &PendingFile,
    ) -> Result<String, UploadError> {
        Self::check_size(slot, file)?;
        let target = self
            .request_upload_target(slot, owner_name, &file.content_type)
            .await?;
        self.put_object(slot, &target.upload_url, file).await?;
        info!(%slot, key = %target.key, bytes = file.len(), "uploaded file");
        Ok(target.key)
    }

    /// Uploads every file concurrently. Either all keys come back or none do.
    pub async fn upload_all(
        &self,
        owner_name: &str,
        files: &BTreeMap<FileSlot, PendingFile>,
    ) -> Result<BTreeMap<FileSlot, String>, UploadError> {
        for (slot, file) in files {
            Self::check_size(*slot, file)?;
        }
        let uploads = files.iter().map(|(slot, file)| async move {
            let key = self.upload(owner_name, *slot, file).await?;
            Ok::<_, UploadError>((*slot, key))
        });
        let keys = try_join_all(uploads).await?;
        Ok(keys.into_iter().collect())
    }
}

#[cfg(test)]
#[path = "tests/upload_tests.rs"]
mod tests;
