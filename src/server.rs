use crate::error::FeederError;
use crate::status::{DebugReport, HealthReport, StatusReporter};
use axum::{extract::State, response::Json, routing::get, Router};
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// GET /healthz
async fn healthz(State(reporter): State<StatusReporter>) -> Json<HealthReport> {
    Json(reporter.healthz().await)
}

/// GET /debug - follow set dump, only routed in debug mode
async fn debug(State(reporter): State<StatusReporter>) -> Json<DebugReport> {
    Json(reporter.debug_report().await)
}

/// Status routes; `/debug` is only mounted when `debug_enabled`
pub fn create_router(reporter: StatusReporter, debug_enabled: bool) -> Router {
    let mut router = Router::new().route("/healthz", get(healthz));
    if debug_enabled {
        router = router.route("/debug", get(debug));
    }

    router
        .with_state(reporter)
        .layer(TraceLayer::new_for_http())
}

/// Serve `router` on `addr` until `shutdown` resolves
pub async fn serve<F>(addr: SocketAddr, router: Router, shutdown: F) -> Result<(), FeederError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    info!("Status server listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Status server stopped");
    Ok(())
}
