use crate::cli::ServeArgs;
use crate::infra::{
    seed_demo_staff, AppState, EnvPolicySource, InMemoryLeaveRepository, InMemoryStaffRepository,
    LoggingMailer,
};
use crate::routes::with_leave_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

use leavehub::config::AppConfig;
use leavehub::error::AppError;
use leavehub::telemetry;
use leavehub::workflows::leave::{LeavePolicy, LeaveService};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let policy_source = EnvPolicySource;
    let policy = LeavePolicy::from_source(&policy_source);
    let allocations = LeavePolicy::default_allocations(&policy_source);

    let requests = Arc::new(InMemoryLeaveRepository::default());
    let staff = Arc::new(InMemoryStaffRepository::default());
    seed_demo_staff(&staff, allocations);

    let leave_service = Arc::new(LeaveService::new(
        requests,
        staff,
        Arc::new(LoggingMailer),
        policy,
        config.organization.clone(),
    ));

    let app = with_leave_routes(leave_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "leave management service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
