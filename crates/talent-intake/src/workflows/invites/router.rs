use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use tracing::warn;

use super::domain::InviteStore;
use super::service::{InviteError, InviteService};
use crate::auth::auth_error_response;
use crate::error::error_response;
use crate::identity::{AuthError, IdentityProvider};
use crate::workflows::http::{access_response, caller, store_response};

pub struct InviteApi<I> {
    pub service: Arc<InviteService<I>>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl<I> Clone for InviteApi<I> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            identity: Arc::clone(&self.identity),
        }
    }
}

/// The admin-only user-management functions.
pub fn invite_router<I>(api: InviteApi<I>) -> Router
where
    I: InviteStore + 'static,
{
    Router::new()
        .route("/api/v1/functions/invite-user", post(invite_handler::<I>))
        .route("/api/v1/functions/confirm-user", post(confirm_handler::<I>))
        .with_state(api)
}

pub(crate) fn invite_error_response(err: &InviteError) -> Response {
    match err {
        InviteError::Access(inner) => access_response(inner),
        InviteError::EmailRequired | InviteError::InvalidEmail | InviteError::AlreadyPending => {
            error_response(StatusCode::BAD_REQUEST, err.to_string())
        }
        InviteError::UserNotFound(_) => error_response(StatusCode::NOT_FOUND, err.to_string()),
        InviteError::Identity(inner @ (AuthError::WeakPassword | AuthError::PasswordMismatch)) => {
            auth_error_response(inner)
        }
        InviteError::Identity(inner) => {
            warn!(error = %inner, "user management call failed");
            error_response(StatusCode::BAD_GATEWAY, inner.to_string())
        }
        InviteError::Store(inner) => store_response(inner),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct InviteRequest {
    #[serde(default)]
    email: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConfirmRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: Option<String>,
}

pub(crate) async fn invite_handler<I>(
    State(api): State<InviteApi<I>>,
    headers: HeaderMap,
    Json(request): Json<InviteRequest>,
) -> Response
where
    I: InviteStore + 'static,
{
    let actor = match caller(api.identity.as_ref(), &headers).await {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match api.service.invite(actor.as_ref(), &request.email).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => invite_error_response(&err),
    }
}

pub(crate) async fn confirm_handler<I>(
    State(api): State<InviteApi<I>>,
    headers: HeaderMap,
    Json(request): Json<ConfirmRequest>,
) -> Response
where
    I: InviteStore + 'static,
{
    let actor = match caller(api.identity.as_ref(), &headers).await {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match api
        .service
        .confirm_user(actor.as_ref(), &request.email, request.password.as_deref())
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => invite_error_response(&err),
    }
}
