use super::*;
use std::{collections::HashSet, sync::Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeZone};
use sheets::InMemorySheet;
use shared::{
    answers::EMPTY_CELL,
    domain::FileSlot,
    fixtures::{full_record, minimal_record},
};

#[derive(Default)]
struct FakeObjects {
    stored: Mutex<HashSet<String>>,
    probe_fails: bool,
}

impl FakeObjects {
    fn holding(record: &SurveyRecord) -> Self {
        let stored = record
            .stored_keys()
            .into_iter()
            .map(|(_, key)| key.to_string())
            .collect();
        Self {
            stored: Mutex::new(stored),
            probe_fails: false,
        }
    }
}

#[async_trait]
impl ObjectStore for FakeObjects {
    fn presign_put(&self, key: &str, content_type: &str) -> anyhow::Result<String> {
        Ok(format!("https://bucket.test/{key}?signed&ct={content_type}"))
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://bucket.test/{key}")
    }

    async fn object_exists(&self, key: &str) -> anyhow::Result<bool> {
        if self.probe_fails {
            return Err(anyhow!("bucket unreachable"));
        }
        Ok(self.stored.lock().expect("lock").contains(key))
    }
}

fn context(objects: FakeObjects, sheet: Arc<InMemorySheet>, verify_uploads: bool) -> ApiContext {
    ApiContext {
        objects: Arc::new(objects),
        sheet,
        submission: SubmissionConfig {
            business_offset: FixedOffset::east_opt(DEFAULT_UTC_OFFSET_SECONDS).expect("offset"),
            verify_uploads,
            min_rows: DEFAULT_MIN_ROWS,
        },
    }
}

#[tokio::test]
async fn upload_target_key_uses_owner_prefix_and_slot_label() {
    let ctx = context(FakeObjects::default(), Arc::new(InMemorySheet::new()), false);
    let target = request_upload_target(
        &ctx,
        &UploadTargetRequest {
            slot: FileSlot::Front,
            owner_name: "ACME".into(),
            content_type: "image/png".into(),
        },
    )
    .await
    .expect("target");

    assert_eq!(target.key, "ACME/店舗外観_正面.png");
    assert!(target.upload_url.starts_with("https://bucket.test/ACME/"));
}

#[tokio::test]
async fn upload_target_rejects_documents_in_photo_slots() {
    let ctx = context(FakeObjects::default(), Arc::new(InMemorySheet::new()), false);
    let err = request_upload_target(
        &ctx,
        &UploadTargetRequest {
            slot: FileSlot::Left,
            owner_name: "ACME".into(),
            content_type: "application/pdf".into(),
        },
    )
    .await
    .expect_err("pdf is not a photo");
    assert_eq!(err.code, ErrorCode::Validation);
}

#[tokio::test]
async fn first_submission_writes_header_then_row() {
    let sheet = Arc::new(InMemorySheet::new());
    let record = full_record("ACME");
    let ctx = context(FakeObjects::holding(&record), sheet.clone(), true);

    submit_survey(&ctx, &record).await.expect("submitted");

    let rows = sheet.rows().await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], header_row());
    assert_eq!(&rows[0][..QUESTIONS.len()], &QUESTIONS.map(String::from)[..]);

    let row = &rows[1];
    assert_eq!(row.len(), QUESTIONS.len() + 1);
    assert_eq!(row[0], "ACME");
    assert_eq!(row[2], "はい");
    assert_eq!(row[3], "山田太郎");
    assert_eq!(row[5], "https://bucket.test/ACME/店舗外観_正面.png");
    assert_eq!(
        row[21],
        "工事作業申請書: https://bucket.test/ACME/工事作業申請書.pdf"
    );
    assert!(NaiveDateTime::parse_from_str(&row[QUESTIONS.len()], TIMESTAMP_FORMAT).is_ok());
}

#[tokio::test]
async fn absent_optional_answers_become_placeholders() {
    let sheet = Arc::new(InMemorySheet::new());
    let record = minimal_record("ACME");
    let ctx = context(FakeObjects::holding(&record), sheet.clone(), true);

    submit_survey(&ctx, &record).await.expect("submitted");

    let row = &sheet.rows().await[1];
    for column in [3, 4, 13, 17, 18, 19, 21, 24, 26, 28, 30, 33] {
        assert_eq!(row[column], EMPTY_CELL, "column {}", QUESTIONS[column]);
    }
}

#[tokio::test]
async fn narrow_sheet_is_widened_and_keeps_at_least_min_rows() {
    let sheet = Arc::new(InMemorySheet::with_grid(GridSize {
        rows: 10,
        columns: 26,
    }));
    let record = minimal_record("ACME");
    let ctx = context(FakeObjects::holding(&record), sheet.clone(), false);

    submit_survey(&ctx, &record).await.expect("submitted");

    let grid = sheet.grid_size().await.expect("grid");
    assert_eq!(grid.columns as usize, QUESTIONS.len() + 1);
    assert_eq!(grid.rows, DEFAULT_MIN_ROWS);
}

#[tokio::test]
async fn short_header_is_rewritten_and_complete_header_kept() {
    let sheet = Arc::new(InMemorySheet::with_grid(GridSize {
        rows: 1000,
        columns: 40,
    }));
    sheet
        .set_header_row(&["店舗名".to_string()])
        .await
        .expect("header");
    let record = minimal_record("ACME");
    let ctx = context(FakeObjects::holding(&record), sheet.clone(), false);

    submit_survey(&ctx, &record).await.expect("first");
    submit_survey(&ctx, &record).await.expect("second");

    let rows = sheet.rows().await;
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], header_row());
}

#[tokio::test]
async fn incomplete_record_never_reaches_the_sheet() {
    let sheet = Arc::new(InMemorySheet::new());
    let mut record = minimal_record("ACME");
    record.photos.remove(&FileSlot::Ceiling);
    let ctx = context(FakeObjects::holding(&record), sheet.clone(), true);

    let err = submit_survey(&ctx, &record).await.expect_err("incomplete");
    assert_eq!(err.code, ErrorCode::Validation);
    assert!(sheet.rows().await.is_empty());
}

#[tokio::test]
async fn keys_outside_the_store_prefix_are_rejected() {
    let sheet = Arc::new(InMemorySheet::new());
    let mut record = minimal_record("ACME");
    record
        .photos
        .insert(FileSlot::Front, "OTHER/店舗外観_正面.png".into());
    let ctx = context(FakeObjects::holding(&record), sheet.clone(), false);

    let err = submit_survey(&ctx, &record).await.expect_err("foreign key");
    assert_eq!(err.code, ErrorCode::Validation);
}

#[tokio::test]
async fn documents_must_be_listed_as_required() {
    let sheet = Arc::new(InMemorySheet::new());
    let mut record = full_record("ACME");
    record
        .construction_documents
        .insert(FileSlot::OtherDocument, "ACME/その他書類.pdf".into());
    let ctx = context(FakeObjects::holding(&record), sheet, false);

    let err = submit_survey(&ctx, &record).await.expect_err("unlisted document");
    assert_eq!(err.code, ErrorCode::Validation);
}

#[tokio::test]
async fn missing_objects_are_rejected_when_verifying() {
    let sheet = Arc::new(InMemorySheet::new());
    let record = minimal_record("ACME");
    let ctx = context(FakeObjects::default(), sheet.clone(), true);

    let err = submit_survey(&ctx, &record).await.expect_err("nothing uploaded");
    assert_eq!(err.code, ErrorCode::Validation);
    assert!(sheet.rows().await.is_empty());
}

#[tokio::test]
async fn unreachable_store_is_an_upstream_failure() {
    let record = minimal_record("ACME");
    let objects = FakeObjects {
        probe_fails: true,
        ..FakeObjects::holding(&record)
    };
    let ctx = context(objects, Arc::new(InMemorySheet::new()), true);

    let err = submit_survey(&ctx, &record).await.expect_err("probe fails");
    assert_eq!(err.code, ErrorCode::Upstream);
}

#[tokio::test]
async fn append_failure_is_reported_without_partial_rows() {
    let sheet = Arc::new(InMemorySheet::new());
    sheet.set_fail_appends(true).await;
    let record = minimal_record("ACME");
    let ctx = context(FakeObjects::holding(&record), sheet.clone(), true);

    let err = submit_survey(&ctx, &record).await.expect_err("append fails");
    assert_eq!(err.code, ErrorCode::Upstream);
    assert!(err.message.starts_with("failed to save data"));
    assert_eq!(sheet.rows().await, vec![header_row()]);
}

#[test]
fn timestamp_is_rendered_in_business_zone() {
    let offset = FixedOffset::east_opt(DEFAULT_UTC_OFFSET_SECONDS).expect("offset");
    let at = Utc
        .with_ymd_and_hms(2024, 3, 31, 15, 30, 0)
        .single()
        .expect("time")
        .with_timezone(&offset);
    let row = build_row(&minimal_record("ACME"), &FakeObjects::default(), at);
    assert_eq!(row.last().map(String::as_str), Some("2024/04/01 00:30:00"));
}
