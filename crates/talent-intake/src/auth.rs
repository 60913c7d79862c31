//! HTTP front for the identity port: the sign-in modal's calls plus session lookup.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::error::error_response;
use crate::identity::{bearer_token, check_new_password, AuthError, IdentityProvider};

pub fn auth_router(identity: Arc<dyn IdentityProvider>) -> Router {
    Router::new()
        .route("/api/v1/auth/sign-up", post(sign_up_handler))
        .route("/api/v1/auth/sign-in", post(sign_in_handler))
        .route("/api/v1/auth/sign-out", post(sign_out_handler))
        .route("/api/v1/auth/reset-password", post(reset_password_handler))
        .route(
            "/api/v1/auth/resend-confirmation",
            post(resend_confirmation_handler),
        )
        .route("/api/v1/auth/session", get(session_handler))
        .with_state(identity)
}

pub(crate) fn auth_error_response(err: &AuthError) -> Response {
    let status = match err {
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::AlreadyRegistered => StatusCode::CONFLICT,
        AuthError::WeakPassword | AuthError::PasswordMismatch => StatusCode::UNPROCESSABLE_ENTITY,
        AuthError::Service(_) => StatusCode::BAD_GATEWAY,
    };
    if let AuthError::Service(detail) = err {
        warn!(%detail, "identity service call failed");
    }
    error_response(status, err.user_message())
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignUpRequest {
    email: String,
    password: String,
    #[serde(default)]
    password_confirmation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Credentials {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmailOnly {
    email: String,
}

pub(crate) async fn sign_up_handler(
    State(identity): State<Arc<dyn IdentityProvider>>,
    Json(request): Json<SignUpRequest>,
) -> Response {
    if let Err(err) = check_new_password(&request.password, request.password_confirmation.as_deref())
    {
        return auth_error_response(&err);
    }
    match identity.sign_up(request.email.trim(), &request.password).await {
        Ok(created) => {
            info!(identity_id = %created.id, "identity signed up");
            let payload = json!({
                "identity": created,
                "confirmation_required": !created.is_email_confirmed(),
            });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(err) => auth_error_response(&err),
    }
}

pub(crate) async fn sign_in_handler(
    State(identity): State<Arc<dyn IdentityProvider>>,
    Json(request): Json<Credentials>,
) -> Response {
    match identity.sign_in(request.email.trim(), &request.password).await {
        Ok(session) => (StatusCode::OK, Json(session)).into_response(),
        Err(err) => auth_error_response(&err),
    }
}

pub(crate) async fn sign_out_handler(
    State(identity): State<Arc<dyn IdentityProvider>>,
    headers: HeaderMap,
) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return error_response(StatusCode::UNAUTHORIZED, "authentication required");
    };
    match identity.sign_out(&token).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => auth_error_response(&err),
    }
}

pub(crate) async fn reset_password_handler(
    State(identity): State<Arc<dyn IdentityProvider>>,
    Json(request): Json<EmailOnly>,
) -> Response {
    match identity.reset_password(request.email.trim()).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(err) => auth_error_response(&err),
    }
}

pub(crate) async fn resend_confirmation_handler(
    State(identity): State<Arc<dyn IdentityProvider>>,
    Json(request): Json<EmailOnly>,
) -> Response {
    match identity.resend_confirmation(request.email.trim()).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(err) => auth_error_response(&err),
    }
}

pub(crate) async fn session_handler(
    State(identity): State<Arc<dyn IdentityProvider>>,
    headers: HeaderMap,
) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return error_response(StatusCode::UNAUTHORIZED, "authentication required");
    };
    match identity.get_session(&token).await {
        Ok(Some(current)) => (StatusCode::OK, Json(current)).into_response(),
        Ok(None) => error_response(StatusCode::UNAUTHORIZED, "session expired"),
        Err(err) => auth_error_response(&err),
    }
}
