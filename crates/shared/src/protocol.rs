use serde::{Deserialize, Serialize};

use crate::domain::FileSlot;

pub fn upload_target_route() -> &'static str {
    "/uploads/target"
}

pub fn survey_route() -> &'static str {
    "/surveys"
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTargetRequest {
    pub slot: FileSlot,
    pub owner_name: String,
    pub content_type: String,
}

/// A single-use write endpoint and the key the written object will have.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTarget {
    pub upload_url: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitSurveyResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmitSurveyResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
        }
    }
}
