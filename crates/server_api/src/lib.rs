use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use object_storage::{key_matches_slot, object_key, ObjectStore};
use sheets::{GridSize, SheetBackend};
use shared::{
    answers::{answer_cells, QUESTIONS},
    error::{ApiError, ErrorCode},
    protocol::{UploadTarget, UploadTargetRequest},
    record::SurveyRecord,
};
use tracing::{info, warn};

/// Header of the trailing column holding the submission time.
pub const TIMESTAMP_HEADER: &str = "送信日時";
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";
pub const DEFAULT_UTC_OFFSET_SECONDS: i32 = 9 * 3600;
pub const DEFAULT_MIN_ROWS: u32 = 1000;

#[derive(Debug, Clone)]
pub struct SubmissionConfig {
    /// Zone the timestamp column is written in.
    pub business_offset: FixedOffset,
    /// Probe the object store for every referenced key before writing.
    pub verify_uploads: bool,
    /// Row count kept when the sheet has to be widened.
    pub min_rows: u32,
}

#[derive(Clone)]
pub struct ApiContext {
    pub objects: Arc<dyn ObjectStore>,
    pub sheet: Arc<dyn SheetBackend>,
    pub submission: SubmissionConfig,
}

pub async fn request_upload_target(
    ctx: &ApiContext,
    request: &UploadTargetRequest,
) -> Result<UploadTarget, ApiError> {
    let key = object_key(&request.owner_name, request.slot, &request.content_type)
        .map_err(|e| ApiError::validation(e.to_string()))?;
    let upload_url = ctx
        .objects
        .presign_put(&key, &request.content_type)
        .map_err(internal)?;
    info!(slot = %request.slot, %key, "issued upload target");
    Ok(UploadTarget { upload_url, key })
}

/// Appends `record` as one row of the sheet, widening the sheet and
/// rewriting its header first when needed.
pub async fn submit_survey(ctx: &ApiContext, record: &SurveyRecord) -> Result<(), ApiError> {
    record
        .check_complete()
        .map_err(|e| ApiError::validation(e.to_string()))?;
    verify_uploads(ctx, record).await?;
    ensure_layout(ctx).await?;

    let submitted_at = Utc::now().with_timezone(&ctx.submission.business_offset);
    let row = build_row(record, ctx.objects.as_ref(), submitted_at);
    ctx.sheet.append_row(&row).await.map_err(|e| {
        warn!(error = %e, "failed to append survey row");
        upstream(e)
    })?;

    info!(
        store = record.owner_name().unwrap_or_default(),
        "survey appended"
    );
    Ok(())
}

pub fn header_row() -> Vec<String> {
    QUESTIONS
        .iter()
        .copied()
        .chain([TIMESTAMP_HEADER])
        .map(str::to_string)
        .collect()
}

/// One cell per [`header_row`] column.
pub fn build_row(
    record: &SurveyRecord,
    objects: &dyn ObjectStore,
    submitted_at: DateTime<FixedOffset>,
) -> Vec<String> {
    let mut row = answer_cells(record, &|key| objects.public_url(key));
    row.push(submitted_at.format(TIMESTAMP_FORMAT).to_string());
    row
}

async fn verify_uploads(ctx: &ApiContext, record: &SurveyRecord) -> Result<(), ApiError> {
    let owner = record.owner_name().unwrap_or_default();
    for (slot, key) in record.stored_keys() {
        if !key_matches_slot(key, owner, slot) {
            return Err(ApiError::validation(format!(
                "key {key:?} does not belong to slot {slot} of this store"
            )));
        }
        if let Some(document) = slot.document() {
            if !record.required_documents.contains(&document) {
                return Err(ApiError::validation(format!(
                    "document {slot} was uploaded but not listed as required"
                )));
            }
        }
    }

    if !ctx.submission.verify_uploads {
        return Ok(());
    }
    for (slot, key) in record.stored_keys() {
        let exists = ctx.objects.object_exists(key).await.map_err(|e| {
            warn!(%slot, %key, error = %e, "object probe failed");
            ApiError::upstream(format!("could not verify upload for {slot}: {e}"))
        })?;
        if !exists {
            return Err(ApiError::validation(format!(
                "no object was uploaded for {slot}"
            )));
        }
    }
    Ok(())
}

async fn ensure_layout(ctx: &ApiContext) -> Result<(), ApiError> {
    let headers = header_row();
    let needed = headers.len() as u32;

    let grid = ctx.sheet.grid_size().await.map_err(upstream)?;
    if grid.columns < needed {
        info!(from = grid.columns, to = needed, "widening sheet");
        ctx.sheet
            .resize(GridSize {
                rows: grid.rows.max(ctx.submission.min_rows),
                columns: needed,
            })
            .await
            .map_err(upstream)?;
    }

    let rewrite = match ctx.sheet.header_row().await {
        Ok(existing) => existing.len() < headers.len(),
        Err(e) => {
            warn!(error = %e, "could not read header row, rewriting it");
            true
        }
    };
    if rewrite {
        ctx.sheet.set_header_row(&headers).await.map_err(upstream)?;
        info!(columns = needed, "wrote header row");
    }
    Ok(())
}

fn upstream(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Upstream, format!("failed to save data: {err}"))
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
