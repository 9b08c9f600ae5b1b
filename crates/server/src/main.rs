use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use server_api::{request_upload_target, submit_survey};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{
        survey_route, upload_target_route, SubmitSurveyResponse, UploadTarget,
        UploadTargetRequest,
    },
    record::SurveyRecord,
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};

mod app_state;
mod config;

use app_state::AppState;
use config::load_settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings()?;
    let state = AppState::from_settings(&settings).map_err(|error| {
        error!(%error, "failed to initialise backends; check storage and sheets settings");
        error
    })?;
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, bucket = %settings.storage.bucket, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    let limit = state.max_body_bytes;
    Router::new()
        .route("/healthz", get(healthz))
        .route(upload_target_route(), post(http_upload_target))
        .route(survey_route(), post(http_submit_survey))
        .layer(RequestBodyLimitLayer::new(limit))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Upstream => StatusCode::BAD_GATEWAY,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn http_upload_target(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UploadTargetRequest>,
) -> Result<Json<UploadTarget>, (StatusCode, Json<ApiError>)> {
    let target = request_upload_target(&state.api, &req).await.map_err(|e| {
        warn!(slot = %req.slot, error = %e.message, "upload target refused");
        (status_for(e.code), Json(e))
    })?;
    Ok(Json(target))
}

async fn http_submit_survey(
    State(state): State<Arc<AppState>>,
    Json(record): Json<SurveyRecord>,
) -> Result<Json<SubmitSurveyResponse>, (StatusCode, Json<SubmitSurveyResponse>)> {
    submit_survey(&state.api, &record).await.map_err(|e| {
        error!(code = ?e.code, error = %e.message, "survey submission failed");
        (
            status_for(e.code),
            Json(SubmitSurveyResponse::failed(e.message)),
        )
    })?;
    Ok(Json(SubmitSurveyResponse::ok()))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
