use axum::{routing::get, Router};
use migration_core::telemetry::gather_text;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

async fn metrics_handler() -> String {
    gather_text()
}

pub fn metrics_router() -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
}

/// Start metrics HTTP server
pub async fn serve_metrics(listener: TcpListener) -> anyhow::Result<()> {
    tracing::info!("📊 Prometheus metrics server listening on {}", listener.local_addr()?);
    axum::serve(listener, metrics_router()).await?;
    Ok(())
}
