//! The authenticated self-service surface of §6: `/api/me` and personal API
//! key CRUD. Every handler here accepts any of the three principal kinds
//! (§4.5's precedence order), since sessions and bearer tokens are equally
//! valid ways to prove "this is user X".

use axum::extract::{ConnectInfo, Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use uuid::Uuid;

use auth_gateway::Principal;

use crate::error::{api_success, ApiError, ApiResponse};
use crate::middleware::RouteClass;
use crate::state::AppState;
use crate::validation::RequestValidation;
use crate::{validate_field, validate_required};

fn require_user_id(principal: &Principal) -> Result<Uuid, ApiError> {
    principal.user_id().ok_or(ApiError::Unauthorized)
}

fn client_key(addr: Option<ConnectInfo<SocketAddr>>) -> String {
    addr.map(|ConnectInfo(a)| a.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[derive(Debug, Serialize)]
struct MeView {
    id: String,
    email: String,
    email_verified: bool,
    is_admin: bool,
}

pub async fn me(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<ApiResponse<MeView>>, ApiError> {
    let user_id = require_user_id(&principal)?;
    let user = state.accounts.find_user(user_id).await?;
    Ok(Json(api_success(MeView {
        id: user.id.to_string(),
        email: user.email,
        email_verified: user.email_verified,
        is_admin: user.is_admin,
    })))
}

#[derive(Debug, Serialize)]
struct ApiKeyView {
    id: String,
    name: String,
    prefix: String,
    expires_at: Option<DateTime<Utc>>,
    last_used_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<store::UserApiKey> for ApiKeyView {
    fn from(key: store::UserApiKey) -> Self {
        Self {
            id: key.id.to_string(),
            name: key.name,
            prefix: key.prefix,
            expires_at: key.expires_at,
            last_used_at: key.last_used_at,
            created_at: key.created_at,
        }
    }
}

pub async fn list_api_keys(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<ApiResponse<Vec<ApiKeyView>>>, ApiError> {
    let user_id = require_user_id(&principal)?;
    let keys = state.accounts.list_api_keys(user_id).await?;
    Ok(Json(api_success(
        keys.into_iter().map(ApiKeyView::from).collect(),
    )))
}

#[derive(Debug, Deserialize)]
pub struct CreateApiKeyRequest {
    pub name: String,
}

impl RequestValidation for CreateApiKeyRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_required!(self.name, "Name is required");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct IssuedApiKeyDetails {
    key: String,
    #[serde(flatten)]
    view: ApiKeyView,
}

#[derive(Debug, Serialize)]
struct IssuedApiKeyView {
    api_key: IssuedApiKeyDetails,
}

pub async fn create_api_key(
    State(state): State<AppState>,
    principal: Principal,
    addr: Option<ConnectInfo<SocketAddr>>,
    Json(req): Json<CreateApiKeyRequest>,
) -> Result<(StatusCode, Json<ApiResponse<IssuedApiKeyView>>), ApiError> {
    let user_id = require_user_id(&principal)?;
    state
        .rate_limiter
        .check(RouteClass::ApiKeyCrud, &client_key(addr))?;
    req.validate()?;

    let issued = state.accounts.create_api_key(user_id, &req.name).await?;
    Ok((
        StatusCode::CREATED,
        Json(api_success(IssuedApiKeyView {
            api_key: IssuedApiKeyDetails {
                key: issued.raw_key,
                view: ApiKeyView::from(issued.record),
            },
        })),
    ))
}

pub async fn delete_api_key(
    State(state): State<AppState>,
    principal: Principal,
    addr: Option<ConnectInfo<SocketAddr>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user_id = require_user_id(&principal)?;
    state
        .rate_limiter
        .check(RouteClass::ApiKeyCrud, &client_key(addr))?;

    let owns_key = state
        .accounts
        .list_api_keys(user_id)
        .await?
        .into_iter()
        .any(|key| key.id == id);
    if !owns_key {
        return Err(ApiError::Forbidden);
    }

    state.accounts.revoke_api_key(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
