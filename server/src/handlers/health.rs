use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::collections::HashMap;

use crate::error::{api_success, ApiError, ApiResponse};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub checks: HashMap<String, String>,
}

pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<HealthResponse>>, ApiError> {
    let mut checks = HashMap::new();
    checks.insert("store".to_string(), "healthy".to_string());
    checks.insert(
        "signing_key".to_string(),
        format!("kid={}", state.keys.kid()),
    );

    let response = HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks,
    };

    Ok(Json(api_success(response)))
}
