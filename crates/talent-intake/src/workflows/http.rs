//! Response helpers shared by the workflow routers.

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::warn;

use crate::access::AccessError;
use crate::error::{error_response, RepositoryError};
use crate::identity::{resolve_caller, Identity, IdentityProvider};
use crate::workflows::intake::validation::ValidationReport;

/// Caller behind the bearer token, or the response to send when the identity service fails.
pub(crate) async fn caller(
    provider: &dyn IdentityProvider,
    headers: &HeaderMap,
) -> Result<Option<Identity>, Response> {
    resolve_caller(provider, headers).await.map_err(|err| {
        warn!(error = %err, "session lookup failed");
        error_response(StatusCode::BAD_GATEWAY, err.user_message())
    })
}

pub(crate) fn access_response(err: &AccessError) -> Response {
    let status = match err {
        AccessError::Unauthenticated => StatusCode::UNAUTHORIZED,
        AccessError::Forbidden => StatusCode::FORBIDDEN,
    };
    error_response(status, err.to_string())
}

pub(crate) fn validation_response(report: &ValidationReport) -> Response {
    let body = Json(json!({
        "error": "validation failed",
        "errors": report.errors,
    }));
    (StatusCode::UNPROCESSABLE_ENTITY, body).into_response()
}

pub(crate) fn store_response(err: &RepositoryError) -> Response {
    let status = match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict => StatusCode::CONFLICT,
        RepositoryError::Forbidden => StatusCode::FORBIDDEN,
        RepositoryError::Unavailable(_) => StatusCode::BAD_GATEWAY,
    };
    error_response(status, err.to_string())
}
