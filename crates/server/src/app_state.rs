use std::sync::Arc;

use anyhow::Context;
use object_storage::S3ObjectStore;
use server_api::ApiContext;

use crate::config::Settings;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) api: ApiContext,
    pub(crate) max_body_bytes: usize,
}

impl AppState {
    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let objects = S3ObjectStore::new(settings.s3_config()?)
            .context("invalid object storage settings")?;
        let api = ApiContext {
            objects: Arc::new(objects),
            sheet: settings.sheet_backend()?,
            submission: settings.submission_config()?,
        };
        Ok(Self {
            api,
            max_body_bytes: settings.max_body_bytes,
        })
    }
}
