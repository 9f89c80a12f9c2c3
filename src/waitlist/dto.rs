use serde::{Deserialize, Serialize};

/// Request body for `POST /join-waitlist`. Required fields are checked by the
/// handler so a missing one gets our 400 body instead of an extractor rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    // Loosely typed: null or a stringly "true" must not reject the signup.
    pub beta_tester: Option<serde_json::Value>,
    pub ambassador: Option<serde_json::Value>,
}

/// Envelope shared by the waitlist and admin endpoints.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}
