use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryIdentity};
use crate::routes::{with_intake_routes, Backend};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use talent_intake::access::AdminPolicy;
use talent_intake::config::AppConfig;
use talent_intake::error::AppError;
use talent_intake::telemetry;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let policy = AdminPolicy::load(&config.admin_policy)?;
    if policy.is_empty() {
        warn!("admin allowlist is empty; admin endpoints will refuse every caller");
    }

    let mut identity = InMemoryIdentity::default();
    if let Some(password) = args.admin_password.take() {
        for email in policy.emails() {
            identity = identity.with_confirmed_account(email, &password);
        }
        info!(admins = policy.len(), "development admin accounts registered");
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let backend = Backend {
        identity,
        ..Backend::default()
    };
    let app = with_intake_routes(backend, Arc::new(policy), &config.intake)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "talent intake service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
