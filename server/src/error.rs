use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pokedex_core::ApiError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::config::ConfigError;

pub const LIST_FETCH_FAILED: &str = "Failed to fetch pokemons from PokeAPI";
pub const DETAIL_FETCH_FAILED: &str = "Failed to fetch pokemon from PokeAPI";

/// Request-path failures. `Display` is the log line; the response body
/// carries `client_message`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("list request failed: {0}")]
    List(ApiError),

    #[error("detail request failed: {0}")]
    Detail(ApiError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        let api = match self {
            AppError::Unauthorized => return StatusCode::UNAUTHORIZED,
            AppError::List(e) | AppError::Detail(e) => e,
        };
        match api {
            ApiError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            e if e.is_upstream_failure() => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// What the browser sees. Upstream internals stay in the logs, except a
    /// GraphQL error message, which is the upstream's own wording.
    pub fn client_message(&self) -> String {
        let (api, fetch_failed) = match self {
            AppError::Unauthorized => return self.to_string(),
            AppError::List(e) => (e, LIST_FETCH_FAILED),
            AppError::Detail(e) => (e, DETAIL_FETCH_FAILED),
        };
        match api {
            ApiError::NotFound | ApiError::InvalidParameter(_) | ApiError::Query(_) => {
                api.to_string()
            }
            ApiError::SerializationError(_) => "Internal error".to_string(),
            ApiError::HttpError { .. } | ApiError::Transport(_) | ApiError::DeserializationError(_) => {
                fetch_failed.to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(%status, "{self}");
        } else {
            warn!(%status, "{self}");
        }

        (status, Json(json!({ "error": self.client_message() }))).into_response()
    }
}

/// Startup failures; request handling never produces these.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build upstream HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("invalid session key: {0}")]
    SessionKey(String),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(std::io::Error),
}
