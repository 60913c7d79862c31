use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::json;
use talent_intake::access::AdminPolicy;
use talent_intake::auth::auth_router;
use talent_intake::config::IntakeConfig;
use talent_intake::identity::{IdentityAdmin, IdentityProvider};
use talent_intake::storage::CvUploader;
use talent_intake::workflows::intake::{intake_router, IntakeApi, IntakeService, SubmissionAdapter};
use talent_intake::workflows::invites::{invite_router, InviteApi, InviteService};
use talent_intake::workflows::opportunities::{
    opportunity_router, OpportunityApi, OpportunityService,
};
use talent_intake::workflows::review::{review_router, ReviewApi, ReviewService};

use crate::infra::{
    AppState, InMemoryApplicationStore, InMemoryBlobStore, InMemoryIdentity, InMemoryInviteStore,
    InMemoryOpportunityStore,
};

/// Adapters behind every port, shared by the routers.
#[derive(Clone, Default)]
pub(crate) struct Backend {
    pub(crate) identity: InMemoryIdentity,
    pub(crate) applications: InMemoryApplicationStore,
    pub(crate) opportunities: InMemoryOpportunityStore,
    pub(crate) invites: InMemoryInviteStore,
    pub(crate) blobs: InMemoryBlobStore,
}

pub(crate) fn with_intake_routes(
    backend: Backend,
    policy: Arc<AdminPolicy>,
    intake: &IntakeConfig,
) -> Router {
    let identity: Arc<dyn IdentityProvider> = Arc::new(backend.identity.clone());
    let users: Arc<dyn IdentityAdmin> = Arc::new(backend.identity);
    let applications = Arc::new(backend.applications);

    let opportunities = Arc::new(OpportunityService::new(
        Arc::new(backend.opportunities),
        Arc::clone(&applications),
        Arc::clone(&policy),
    ));
    let adapter = SubmissionAdapter::new(Arc::clone(&applications), Arc::clone(&policy));
    let intake_service = Arc::new(IntakeService::new(adapter, Arc::clone(&opportunities)));
    let uploads = Arc::new(CvUploader::new(Arc::new(backend.blobs), intake));
    let review = Arc::new(ReviewService::new(applications, Arc::clone(&policy)));
    let invites = Arc::new(InviteService::new(
        Arc::new(backend.invites),
        users,
        policy,
    ));

    auth_router(Arc::clone(&identity))
        .merge(intake_router(IntakeApi {
            service: intake_service,
            identity: Arc::clone(&identity),
            uploads,
        }))
        .merge(opportunity_router(OpportunityApi {
            service: opportunities,
            identity: Arc::clone(&identity),
        }))
        .merge(review_router(ReviewApi {
            service: review,
            identity: Arc::clone(&identity),
        }))
        .merge(invite_router(InviteApi {
            service: invites,
            identity,
        }))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
