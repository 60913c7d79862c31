use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;

use super::domain::{OpportunityForm, OpportunityId};
use super::repository::OpportunityStore;
use super::service::{OpportunityError, OpportunityService};
use crate::error::error_response;
use crate::identity::IdentityProvider;
use crate::workflows::http::{access_response, caller, store_response, validation_response};
use crate::workflows::intake::repository::ApplicationStore;

pub struct OpportunityApi<O, S> {
    pub service: Arc<OpportunityService<O, S>>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl<O, S> Clone for OpportunityApi<O, S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            identity: Arc::clone(&self.identity),
        }
    }
}

/// Public listing plus the admin management endpoints.
pub fn opportunity_router<O, S>(api: OpportunityApi<O, S>) -> Router
where
    O: OpportunityStore + 'static,
    S: ApplicationStore + 'static,
{
    Router::new()
        .route("/api/v1/opportunities", get(open_handler::<O, S>))
        .route(
            "/api/v1/admin/opportunities",
            get(list_handler::<O, S>).post(create_handler::<O, S>),
        )
        .route(
            "/api/v1/admin/opportunities/:opportunity_id",
            put(update_handler::<O, S>).delete(delete_handler::<O, S>),
        )
        .route(
            "/api/v1/admin/opportunities/:opportunity_id/toggle",
            post(toggle_handler::<O, S>),
        )
        .with_state(api)
}

pub(crate) fn opportunity_error_response(err: &OpportunityError) -> Response {
    match err {
        OpportunityError::Invalid(report) => validation_response(report),
        OpportunityError::Access(access) => access_response(access),
        OpportunityError::NotFound => error_response(StatusCode::NOT_FOUND, err.user_message()),
        OpportunityError::Closed | OpportunityError::Full => {
            error_response(StatusCode::CONFLICT, err.user_message())
        }
        OpportunityError::Store(store) => store_response(store),
    }
}

pub(crate) async fn open_handler<O, S>(State(api): State<OpportunityApi<O, S>>) -> Response
where
    O: OpportunityStore + 'static,
    S: ApplicationStore + 'static,
{
    match api.service.list_open(Utc::now().date_naive()).await {
        Ok(listed) => (StatusCode::OK, Json(listed)).into_response(),
        Err(err) => opportunity_error_response(&err),
    }
}

pub(crate) async fn list_handler<O, S>(
    State(api): State<OpportunityApi<O, S>>,
    headers: HeaderMap,
) -> Response
where
    O: OpportunityStore + 'static,
    S: ApplicationStore + 'static,
{
    let actor = match caller(api.identity.as_ref(), &headers).await {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match api.service.list_all(actor.as_ref()).await {
        Ok(listed) => (StatusCode::OK, Json(listed)).into_response(),
        Err(err) => opportunity_error_response(&err),
    }
}

pub(crate) async fn create_handler<O, S>(
    State(api): State<OpportunityApi<O, S>>,
    headers: HeaderMap,
    Json(form): Json<OpportunityForm>,
) -> Response
where
    O: OpportunityStore + 'static,
    S: ApplicationStore + 'static,
{
    let actor = match caller(api.identity.as_ref(), &headers).await {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match api.service.create(actor.as_ref(), form).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(err) => opportunity_error_response(&err),
    }
}

pub(crate) async fn update_handler<O, S>(
    State(api): State<OpportunityApi<O, S>>,
    Path(opportunity_id): Path<String>,
    headers: HeaderMap,
    Json(form): Json<OpportunityForm>,
) -> Response
where
    O: OpportunityStore + 'static,
    S: ApplicationStore + 'static,
{
    let actor = match caller(api.identity.as_ref(), &headers).await {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let id = OpportunityId(opportunity_id);
    match api.service.update(actor.as_ref(), &id, form).await {
        Ok(updated) => (StatusCode::OK, Json(updated)).into_response(),
        Err(err) => opportunity_error_response(&err),
    }
}

pub(crate) async fn toggle_handler<O, S>(
    State(api): State<OpportunityApi<O, S>>,
    Path(opportunity_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    O: OpportunityStore + 'static,
    S: ApplicationStore + 'static,
{
    let actor = match caller(api.identity.as_ref(), &headers).await {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let id = OpportunityId(opportunity_id);
    match api.service.toggle(actor.as_ref(), &id).await {
        Ok(toggled) => (StatusCode::OK, Json(toggled)).into_response(),
        Err(err) => opportunity_error_response(&err),
    }
}

pub(crate) async fn delete_handler<O, S>(
    State(api): State<OpportunityApi<O, S>>,
    Path(opportunity_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    O: OpportunityStore + 'static,
    S: ApplicationStore + 'static,
{
    let actor = match caller(api.identity.as_ref(), &headers).await {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let id = OpportunityId(opportunity_id);
    match api.service.delete(actor.as_ref(), &id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => opportunity_error_response(&err),
    }
}
