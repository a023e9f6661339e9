use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use mlgate::{CoreError, HandlerError};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Errors surfaced by any route, translated to HTTP in one place
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error(transparent)]
    Json(#[from] JsonRejection),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<HandlerError> for ApiError {
    fn from(err: HandlerError) -> Self {
        Self::Core(CoreError::Handler(err))
    }
}

/// JSON body for validation and generic handler failures
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `"ERROR"`
    pub status: String,
    pub error: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            status: "ERROR".to_string(),
            error: error.into(),
        }
    }
}

fn json_error(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => {
                tracing::debug!("Responding 401");
                (
                    StatusCode::UNAUTHORIZED,
                    [(header::WWW_AUTHENTICATE, "Basic realm=\"Login required\"")],
                    "Unauthorized",
                )
                    .into_response()
            }
            ApiError::Forbidden => {
                tracing::warn!("Responding 403");
                (StatusCode::FORBIDDEN, "Forbidden").into_response()
            }
            ApiError::Json(rejection) => {
                tracing::warn!("Malformed request body: {}", rejection.body_text());
                json_error(rejection.status(), rejection.body_text())
            }
            ApiError::Core(CoreError::Validation(message)) => {
                tracing::warn!("Invalid request: {}", message);
                json_error(StatusCode::BAD_REQUEST, message)
            }
            ApiError::Core(CoreError::Handler(err)) => match err {
                HandlerError::NotFound(message) => {
                    tracing::warn!("Not found: {}", message);
                    (StatusCode::NOT_FOUND, message).into_response()
                }
                HandlerError::Invariant(message) => {
                    tracing::error!("Handler invariant violated: {}", message);
                    (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
                }
                HandlerError::Index(message) => {
                    tracing::error!("Handler index error: {}", message);
                    (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
                }
                HandlerError::Failed(message) => {
                    tracing::error!("Handler failed: {}", message);
                    json_error(StatusCode::INTERNAL_SERVER_ERROR, message)
                }
            },
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
