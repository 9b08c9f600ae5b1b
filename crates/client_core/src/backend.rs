use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use shared::{
    error::ApiError,
    protocol::{
        survey_route, upload_target_route, SubmitSurveyResponse, UploadTarget,
        UploadTargetRequest,
    },
    record::SurveyRecord,
};

/// The two calls the survey makes to its backend.
#[async_trait]
pub trait SurveyBackend: Send + Sync {
    async fn request_upload_target(&self, request: &UploadTargetRequest) -> Result<UploadTarget>;
    async fn submit_survey(&self, record: &SurveyRecord) -> Result<SubmitSurveyResponse>;
}

pub struct HttpSurveyBackend {
    http: Client,
    server_url: String,
}

impl HttpSurveyBackend {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            server_url: server_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }
}

#[async_trait]
impl SurveyBackend for HttpSurveyBackend {
    async fn request_upload_target(&self, request: &UploadTargetRequest) -> Result<UploadTarget> {
        let response = self
            .http
            .post(format!("{}{}", self.server_url, upload_target_route()))
            .json(request)
            .send()
            .await
            .context("failed to reach survey server")?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        let body = response.bytes().await?;
        match serde_json::from_slice::<ApiError>(&body) {
            Ok(error) => Err(anyhow!(error.message)),
            Err(_) => Err(anyhow!("survey server answered {status}")),
        }
    }

    async fn submit_survey(&self, record: &SurveyRecord) -> Result<SubmitSurveyResponse> {
        let response = self
            .http
            .post(format!("{}{}", self.server_url, survey_route()))
            .json(record)
            .send()
            .await
            .context("failed to reach survey server")?;
        let status = response.status();
        let body = response.bytes().await?;
        // Failures still carry a `{success, error}` body.
        match serde_json::from_slice::<SubmitSurveyResponse>(&body) {
            Ok(reply) => Ok(reply),
            Err(_) if status.is_success() => Err(anyhow!("unexpected reply from survey server")),
            Err(_) => Ok(SubmitSurveyResponse::failed(format!(
                "survey server answered {status}"
            ))),
        }
    }
}

#[cfg(test)]
#[path = "tests/backend_tests.rs"]
mod tests;
