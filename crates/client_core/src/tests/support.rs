//! In-process survey server used by the client tests: answers upload
//! target requests, accepts object writes and records submissions.

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    routing::{post, put},
    Json, Router,
};
use shared::{
    domain::FileSlot,
    error::ApiError,
    protocol::{SubmitSurveyResponse, UploadTarget, UploadTargetRequest},
    record::SurveyRecord,
};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoredObject {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Default)]
pub(crate) struct ServerLog {
    pub objects: BTreeMap<String, StoredObject>,
    pub target_requests: u32,
    pub submissions: Vec<SurveyRecord>,
    /// Object writes for this slot are answered with 503.
    pub fail_slot: Option<FileSlot>,
    /// Submissions are answered with 502 and this message.
    pub reject_with: Option<String>,
}

#[derive(Clone)]
pub(crate) struct ServerState {
    pub log: Arc<Mutex<ServerLog>>,
    base: String,
}

async fn upload_target(
    State(state): State<ServerState>,
    Json(req): Json<UploadTargetRequest>,
) -> Result<Json<UploadTarget>, (StatusCode, Json<ApiError>)> {
    let mut log = state.log.lock().await;
    log.target_requests += 1;
    if req.owner_name.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::validation("owner name is empty")),
        ));
    }
    let extension = match req.content_type.as_str() {
        "application/pdf" => ".pdf",
        "image/jpeg" => ".jpg",
        _ => ".png",
    };
    let key = format!("{}/{}{extension}", req.owner_name.trim(), req.slot.label());
    let prefix = if log.fail_slot == Some(req.slot) {
        "broken-bucket"
    } else {
        "bucket"
    };
    Ok(Json(UploadTarget {
        upload_url: format!("{}/{prefix}/{key}", state.base),
        key,
    }))
}

async fn put_object(
    State(state): State<ServerState>,
    Path(key): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state.log.lock().await.objects.insert(
        key,
        StoredObject {
            content_type,
            bytes: body.to_vec(),
        },
    );
    StatusCode::OK
}

async fn broken_bucket() -> StatusCode {
    StatusCode::SERVICE_UNAVAILABLE
}

async fn submit(
    State(state): State<ServerState>,
    Json(record): Json<SurveyRecord>,
) -> (StatusCode, Json<SubmitSurveyResponse>) {
    let mut log = state.log.lock().await;
    if let Some(message) = log.reject_with.clone() {
        return (
            StatusCode::BAD_GATEWAY,
            Json(SubmitSurveyResponse::failed(message)),
        );
    }
    log.submissions.push(record);
    (StatusCode::OK, Json(SubmitSurveyResponse::ok()))
}

pub(crate) async fn spawn_survey_server() -> (String, ServerState) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let base = format!("http://{}", listener.local_addr().expect("addr"));
    let state = ServerState {
        log: Arc::new(Mutex::new(ServerLog::default())),
        base: base.clone(),
    };
    let app = Router::new()
        .route("/uploads/target", post(upload_target))
        .route("/surveys", post(submit))
        .route("/bucket/*key", put(put_object))
        .route("/broken-bucket/*key", put(broken_bucket))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (base, state)
}

pub(crate) fn png(name: &str) -> crate::upload::PendingFile {
    crate::upload::PendingFile::new(name, "image/png", b"\x89PNG\r\n\x1a\nfake".to_vec())
}

pub(crate) fn photo_files() -> BTreeMap<FileSlot, crate::upload::PendingFile> {
    FileSlot::PHOTOS
        .iter()
        .map(|slot| (*slot, png(&format!("{}.png", slot.id()))))
        .collect()
}
