use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::domain::ApplicationFormData;
use super::repository::ApplicationStore;
use super::sessions::{IntakeError, IntakeService, SessionId};
use super::steps::Step;
use super::validation::validate_step_in;
use super::wizard::WizardError;
use crate::error::error_response;
use crate::identity::IdentityProvider;
use crate::storage::{BlobStore, CvUploader, UploadError};
use crate::workflows::http::{caller, store_response, validation_response};
use crate::workflows::opportunities::router::opportunity_error_response;
use crate::workflows::opportunities::{OpportunityId, OpportunityStore};

/// Headroom over the CV limit so oversize uploads reach the uploader and get its message.
const BODY_LIMIT_SLACK: usize = 1024 * 1024;

pub struct IntakeApi<S, O, B> {
    pub service: Arc<IntakeService<S, O>>,
    pub identity: Arc<dyn IdentityProvider>,
    pub uploads: Arc<CvUploader<B>>,
}

impl<S, O, B> Clone for IntakeApi<S, O, B> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            identity: Arc::clone(&self.identity),
            uploads: Arc::clone(&self.uploads),
        }
    }
}

/// Wizard sessions, per-step validation and CV upload.
pub fn intake_router<S, O, B>(api: IntakeApi<S, O, B>) -> Router
where
    S: ApplicationStore + 'static,
    O: OpportunityStore + 'static,
    B: BlobStore + 'static,
{
    let body_limit = usize::try_from(api.uploads.max_bytes())
        .unwrap_or(usize::MAX)
        .saturating_add(BODY_LIMIT_SLACK);

    Router::new()
        .route("/api/v1/intake/sessions", post(open_handler::<S, O, B>))
        .route(
            "/api/v1/intake/sessions/:session_id",
            get(view_handler::<S, O, B>).delete(close_handler::<S, O, B>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/form",
            patch(patch_handler::<S, O, B>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/advance",
            post(advance_handler::<S, O, B>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/retreat",
            post(retreat_handler::<S, O, B>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/reset",
            post(reset_handler::<S, O, B>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/opportunity",
            post(opportunity_handler::<S, O, B>),
        )
        .route(
            "/api/v1/intake/validate/:step",
            post(validate_handler::<S, O, B>),
        )
        .route(
            "/api/v1/intake/cv",
            post(upload_handler::<S, O, B>).delete(remove_cv_handler::<S, O, B>),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(api)
}

pub(crate) fn intake_error_response(err: &IntakeError) -> Response {
    match err {
        IntakeError::SessionNotFound => error_response(StatusCode::NOT_FOUND, err.to_string()),
        IntakeError::Forbidden => error_response(StatusCode::FORBIDDEN, err.to_string()),
        IntakeError::Wizard(WizardError::Invalid(report)) => validation_response(report),
        IntakeError::Wizard(WizardError::SubmissionInFlight | WizardError::Finished) => {
            error_response(StatusCode::CONFLICT, err.to_string())
        }
        IntakeError::Wizard(WizardError::SubmissionFailed { reason }) => {
            error_response(StatusCode::BAD_GATEWAY, reason.clone())
        }
        IntakeError::Wizard(WizardError::InvalidPatch(_)) => {
            error_response(StatusCode::BAD_REQUEST, err.to_string())
        }
        IntakeError::Opportunity(inner) => opportunity_error_response(inner),
        IntakeError::Store(inner) => store_response(inner),
    }
}

fn upload_error_response(err: &UploadError) -> Response {
    let status = match err {
        UploadError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        UploadError::NotPdf => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        UploadError::NotOwner => StatusCode::FORBIDDEN,
        UploadError::Transient(_) => StatusCode::BAD_GATEWAY,
    };
    error_response(status, err.user_message())
}

fn view_response<T: serde::Serialize>(status: StatusCode, result: Result<T, IntakeError>) -> Response {
    match result {
        Ok(view) => (status, Json(view)).into_response(),
        Err(err) => intake_error_response(&err),
    }
}

pub(crate) async fn open_handler<S, O, B>(
    State(api): State<IntakeApi<S, O, B>>,
    headers: HeaderMap,
) -> Response
where
    S: ApplicationStore + 'static,
    O: OpportunityStore + 'static,
    B: BlobStore + 'static,
{
    let actor = match caller(api.identity.as_ref(), &headers).await {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    view_response(
        StatusCode::CREATED,
        api.service.open_session(actor.as_ref()).await,
    )
}

pub(crate) async fn view_handler<S, O, B>(
    State(api): State<IntakeApi<S, O, B>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: ApplicationStore + 'static,
    O: OpportunityStore + 'static,
    B: BlobStore + 'static,
{
    let actor = match caller(api.identity.as_ref(), &headers).await {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    view_response(
        StatusCode::OK,
        api.service.view(&SessionId(session_id), actor.as_ref()),
    )
}

pub(crate) async fn close_handler<S, O, B>(
    State(api): State<IntakeApi<S, O, B>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: ApplicationStore + 'static,
    O: OpportunityStore + 'static,
    B: BlobStore + 'static,
{
    let actor = match caller(api.identity.as_ref(), &headers).await {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match api.service.close(&SessionId(session_id), actor.as_ref()) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => intake_error_response(&err),
    }
}

pub(crate) async fn patch_handler<S, O, B>(
    State(api): State<IntakeApi<S, O, B>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Json(fields): Json<Map<String, Value>>,
) -> Response
where
    S: ApplicationStore + 'static,
    O: OpportunityStore + 'static,
    B: BlobStore + 'static,
{
    let actor = match caller(api.identity.as_ref(), &headers).await {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    view_response(
        StatusCode::OK,
        api.service
            .patch(&SessionId(session_id), actor.as_ref(), &fields),
    )
}

pub(crate) async fn advance_handler<S, O, B>(
    State(api): State<IntakeApi<S, O, B>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: ApplicationStore + 'static,
    O: OpportunityStore + 'static,
    B: BlobStore + 'static,
{
    let actor = match caller(api.identity.as_ref(), &headers).await {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    view_response(
        StatusCode::OK,
        api.service
            .advance(&SessionId(session_id), actor.as_ref())
            .await,
    )
}

pub(crate) async fn retreat_handler<S, O, B>(
    State(api): State<IntakeApi<S, O, B>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: ApplicationStore + 'static,
    O: OpportunityStore + 'static,
    B: BlobStore + 'static,
{
    let actor = match caller(api.identity.as_ref(), &headers).await {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    view_response(
        StatusCode::OK,
        api.service.retreat(&SessionId(session_id), actor.as_ref()),
    )
}

pub(crate) async fn reset_handler<S, O, B>(
    State(api): State<IntakeApi<S, O, B>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: ApplicationStore + 'static,
    O: OpportunityStore + 'static,
    B: BlobStore + 'static,
{
    let actor = match caller(api.identity.as_ref(), &headers).await {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    view_response(
        StatusCode::OK,
        api.service.reset(&SessionId(session_id), actor.as_ref()),
    )
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OpportunitySelection {
    #[serde(default)]
    opportunity_id: Option<String>,
}

pub(crate) async fn opportunity_handler<S, O, B>(
    State(api): State<IntakeApi<S, O, B>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Json(selection): Json<OpportunitySelection>,
) -> Response
where
    S: ApplicationStore + 'static,
    O: OpportunityStore + 'static,
    B: BlobStore + 'static,
{
    let actor = match caller(api.identity.as_ref(), &headers).await {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let opportunity = selection
        .opportunity_id
        .filter(|id| !id.trim().is_empty())
        .map(OpportunityId);
    view_response(
        StatusCode::OK,
        api.service
            .select_opportunity(
                &SessionId(session_id),
                actor.as_ref(),
                opportunity,
                Utc::now().date_naive(),
            )
            .await,
    )
}

pub(crate) async fn validate_handler<S, O, B>(
    State(api): State<IntakeApi<S, O, B>>,
    Path(step): Path<String>,
    Json(form): Json<ApplicationFormData>,
) -> Response
where
    S: ApplicationStore + 'static,
    O: OpportunityStore + 'static,
    B: BlobStore + 'static,
{
    let step = match step.parse::<Step>() {
        Ok(step) => step,
        Err(err) => return error_response(StatusCode::NOT_FOUND, err.to_string()),
    };
    let report = validate_step_in(&api.service.registry(), step, &form);
    (StatusCode::OK, Json(report)).into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadQuery {
    file_name: String,
}

pub(crate) async fn upload_handler<S, O, B>(
    State(api): State<IntakeApi<S, O, B>>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    S: ApplicationStore + 'static,
    O: OpportunityStore + 'static,
    B: BlobStore + 'static,
{
    let actor = match caller(api.identity.as_ref(), &headers).await {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());

    match api
        .uploads
        .upload(
            actor.as_ref().map(|identity| &identity.id),
            &query.file_name,
            content_type,
            body.to_vec(),
        )
        .await
    {
        Ok(stored) => (StatusCode::CREATED, Json(stored)).into_response(),
        Err(err) => upload_error_response(&err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RemoveCv {
    cv_url: String,
}

pub(crate) async fn remove_cv_handler<S, O, B>(
    State(api): State<IntakeApi<S, O, B>>,
    headers: HeaderMap,
    Json(request): Json<RemoveCv>,
) -> Response
where
    S: ApplicationStore + 'static,
    O: OpportunityStore + 'static,
    B: BlobStore + 'static,
{
    let actor = match caller(api.identity.as_ref(), &headers).await {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match api
        .uploads
        .remove(actor.as_ref().map(|identity| &identity.id), &request.cv_url)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => upload_error_response(&err),
    }
}
