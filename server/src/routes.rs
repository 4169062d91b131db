use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pokedex_core::{ApiError, CatalogEntryDetail, CatalogEntrySummary, ListQuery, PagedResult};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;
use tracing::{info, warn};

use crate::{error::AppError, session, state::AppState};

#[derive(Deserialize, Default)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UserInfo {
    pub username: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct AuthResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserInfo>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ListParams {
    pub offset: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    #[serde(alias = "sortBy")]
    pub sort_by: Option<String>,
}

#[tracing::instrument(skip_all)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let request = payload.map(|Json(body)| body).unwrap_or_else(|rejection| {
        warn!("Malformed login payload: {rejection}");
        LoginRequest::default()
    });

    let expected = &state.config.credentials;
    let accepted = match (&request.username, &request.password) {
        (Some(username), Some(password)) => {
            *username == expected.username && *password == expected.password
        }
        _ => false,
    };

    if !accepted {
        warn!(username = ?request.username, "Login rejected");
        return (
            StatusCode::UNAUTHORIZED,
            Json(AuthResponse {
                success: false,
                message: None,
                error: Some("Invalid credentials".to_string()),
                user: None,
            }),
        )
            .into_response();
    }

    let username = expected.username.clone();
    session::start(&state, &cookies, &username);
    info!(%username, "Login successful");

    Json(AuthResponse {
        success: true,
        message: Some("Login successful".to_string()),
        error: None,
        user: Some(UserInfo { username }),
    })
    .into_response()
}

/// Always succeeds, with or without a session.
#[tracing::instrument(skip_all)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
) -> Json<AuthResponse> {
    session::end(&state, &cookies);

    Json(AuthResponse {
        success: true,
        message: Some("Logged out successfully".to_string()),
        error: None,
        user: None,
    })
}

#[tracing::instrument(skip(state))]
pub async fn list_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<PagedResult<CatalogEntrySummary>>, AppError> {
    let Query(params) = params
        .map_err(|rejection| AppError::List(ApiError::InvalidParameter(rejection.body_text())))?;
    let query = ListQuery::from_params(
        params.offset.as_deref(),
        params.limit.as_deref(),
        params.search.as_deref(),
        params.sort_by.as_deref(),
    )
    .map_err(AppError::List)?;

    let request = state
        .catalog
        .build_list_pokemon(&query)
        .map_err(AppError::List)?;
    let response = state
        .upstream
        .execute(request)
        .await
        .map_err(AppError::List)?;
    let page = state
        .catalog
        .parse_list_pokemon(&query, response)
        .map_err(AppError::List)?;

    info!(
        returned = page.items.len(),
        count = page.total_count,
        "List served"
    );
    Ok(Json(page))
}

#[tracing::instrument(skip(state))]
pub async fn detail_handler(
    State(state): State<Arc<AppState>>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<CatalogEntryDetail>, AppError> {
    let Path(id) = id
        .map_err(|rejection| AppError::Detail(ApiError::InvalidParameter(rejection.body_text())))?;
    let request = state
        .catalog
        .build_get_pokemon(&id)
        .map_err(AppError::Detail)?;
    let response = state
        .upstream
        .execute(request)
        .await
        .map_err(AppError::Detail)?;
    let detail = state
        .catalog
        .parse_get_pokemon(response)
        .map_err(AppError::Detail)?;

    Ok(Json(detail))
}

pub async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
