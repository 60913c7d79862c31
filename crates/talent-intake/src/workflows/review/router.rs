use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;

use super::service::{ReviewError, ReviewQuery, ReviewService};
use crate::error::error_response;
use crate::identity::IdentityProvider;
use crate::workflows::http::{access_response, caller, store_response};
use crate::workflows::intake::domain::{ApplicationId, ApplicationStatus};
use crate::workflows::intake::repository::ApplicationStore;

pub struct ReviewApi<S> {
    pub service: Arc<ReviewService<S>>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl<S> Clone for ReviewApi<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            identity: Arc::clone(&self.identity),
        }
    }
}

/// Admin dashboard endpoints.
pub fn review_router<S>(api: ReviewApi<S>) -> Router
where
    S: ApplicationStore + 'static,
{
    Router::new()
        .route("/api/v1/admin/applications", get(list_handler::<S>))
        .route(
            "/api/v1/admin/applications/export",
            get(export_handler::<S>),
        )
        .route(
            "/api/v1/admin/applications/:application_id/status",
            patch(status_handler::<S>),
        )
        .with_state(api)
}

fn review_error_response(err: &ReviewError) -> Response {
    match err {
        ReviewError::Access(access) => access_response(access),
        ReviewError::NotFound => error_response(StatusCode::NOT_FOUND, err.to_string()),
        ReviewError::Store(store) => store_response(store),
        ReviewError::Export(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

pub(crate) async fn list_handler<S>(
    State(api): State<ReviewApi<S>>,
    headers: HeaderMap,
    Query(query): Query<ReviewQuery>,
) -> Response
where
    S: ApplicationStore + 'static,
{
    let actor = match caller(api.identity.as_ref(), &headers).await {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match api.service.list(actor.as_ref(), &query).await {
        Ok(listing) => (StatusCode::OK, Json(listing)).into_response(),
        Err(err) => review_error_response(&err),
    }
}

pub(crate) async fn export_handler<S>(
    State(api): State<ReviewApi<S>>,
    headers: HeaderMap,
    Query(query): Query<ReviewQuery>,
) -> Response
where
    S: ApplicationStore + 'static,
{
    let actor = match caller(api.identity.as_ref(), &headers).await {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let export = match api
        .service
        .export(actor.as_ref(), &query, Utc::now().date_naive())
        .await
    {
        Ok(export) => export,
        Err(err) => return review_error_response(&err),
    };

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        export.file_name
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    (
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/csv; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.body,
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusChange {
    status: ApplicationStatus,
}

pub(crate) async fn status_handler<S>(
    State(api): State<ReviewApi<S>>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
    Json(change): Json<StatusChange>,
) -> Response
where
    S: ApplicationStore + 'static,
{
    let actor = match caller(api.identity.as_ref(), &headers).await {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let id = ApplicationId(application_id);
    match api
        .service
        .update_status(actor.as_ref(), &id, change.status)
        .await
    {
        Ok(updated) => (StatusCode::OK, Json(updated)).into_response(),
        Err(err) => review_error_response(&err),
    }
}
