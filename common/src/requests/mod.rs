use crate::model::admin::{ErrorSeverity, FeedbackType};
use crate::model::settings::MapSettingsPatch;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Optional `json` part of the upload form.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadOptions {
    pub name: Option<String>,
    pub settings: Option<MapSettingsPatch>,
    pub session_id: Option<String>,
}

/// Returned once an upload has been parsed and the enrichment job queued.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadAccepted {
    pub job_id: String,
    pub member_count: usize,
}

/// Field-level map update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateMapRequest {
    pub name: Option<String>,
    pub settings: Option<MapSettingsPatch>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeocodeQuery {
    pub location: String,
}

/// Wire shape of the geocoding collaborator: coordinates come as strings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GeocodeResponse {
    pub location: String,
    pub latitude: String,
    pub longitude: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateLeadRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedbackRequest {
    #[serde(default)]
    pub map_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    pub feedback_type: FeedbackType,
    pub rating: i64,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreated {
    pub session_id: String,
    pub expires_at: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub session_id: String,
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEventRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub event_name: String,
    #[serde(default)]
    pub event_data: HashMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportErrorRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub category: String,
    pub severity: ErrorSeverity,
    pub message: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}
