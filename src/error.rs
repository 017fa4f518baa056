use axum::{
    body::Body,
    extract::{rejection::JsonRejection, multipart::MultipartError, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::state::AppState;

pub const GENERIC_SERVER_ERROR: &str =
    "Something went wrong on our end. Please give us time to fix the problem.";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    InvalidCredentials(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    RateLimited(String),
    /// A server-side failure with a message that is safe to show.
    #[error("{0}")]
    Server(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub message: String,
}

/// Full error chain of an `Internal` error, attached to the response so the
/// development-only middleware can expose it.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) | AppError::InvalidCredentials(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Server(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validationError",
            AppError::Server(_) | AppError::Internal(_) => "serverError",
            _ => "clientError",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        match self {
            AppError::Internal(err) => {
                tracing::error!(error = ?err, "internal server error");
                let mut res = (
                    status,
                    Json(ErrorBody {
                        kind,
                        message: GENERIC_SERVER_ERROR.to_string(),
                    }),
                )
                    .into_response();
                res.extensions_mut().insert(ErrorDetail(format!("{err:#}")));
                res
            }
            other => {
                if status.is_server_error() {
                    tracing::error!(error = %other, "server error");
                }
                (
                    status,
                    Json(ErrorBody {
                        kind,
                        message: other.to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::BadRequest(err.body_text())
    }
}

/// Replaces the generic server-error message with the real error chain
/// outside production.
pub async fn expose_error_details(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let res = next.run(req).await;
    if state.config.env.is_production() {
        return res;
    }
    let Some(ErrorDetail(detail)) = res.extensions().get::<ErrorDetail>().cloned() else {
        return res;
    };
    let (mut parts, _) = res.into_parts();
    let body = ErrorBody {
        kind: "serverError",
        message: detail,
    };
    match serde_json::to_vec(&body) {
        Ok(bytes) => {
            parts.headers.remove(axum::http::header::CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(_) => Response::from_parts(parts, Body::empty()),
    }
}

pub async fn not_found() -> AppError {
    AppError::NotFound("Not Found".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn response_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn maps_domain_errors_to_status_and_body() {
        let cases = [
            (AppError::Validation("bad".into()), StatusCode::BAD_REQUEST, "validationError"),
            (AppError::Unauthenticated("nope".into()), StatusCode::UNAUTHORIZED, "clientError"),
            (AppError::Forbidden("denied".into()), StatusCode::FORBIDDEN, "clientError"),
            (AppError::Conflict("dup".into()), StatusCode::CONFLICT, "clientError"),
            (AppError::RateLimited("slow".into()), StatusCode::TOO_MANY_REQUESTS, "clientError"),
            (AppError::Server("mail".into()), StatusCode::INTERNAL_SERVER_ERROR, "serverError"),
        ];
        for (err, status, kind) in cases {
            let message = err.to_string();
            let response = err.into_response();
            assert_eq!(response.status(), status);
            let json = response_json(response).await;
            assert_eq!(json["type"], kind);
            assert_eq!(json["message"], message);
        }
    }

    #[tokio::test]
    async fn internal_error_hides_detail_but_attaches_it() {
        let err = AppError::Internal(anyhow::anyhow!("db exploded").context("load user"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let detail = response.extensions().get::<ErrorDetail>().cloned().unwrap();
        assert!(detail.0.contains("db exploded"));
        let json = response_json(response).await;
        assert_eq!(json["message"], GENERIC_SERVER_ERROR);
    }
}
