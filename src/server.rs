//! Service shell — opens the store and serves the empresa routes.

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{DatabaseTarget, ServerConfig};
use crate::empresas::empresa_routes;
use crate::error::Result;
use crate::store::{Database, LibSqlBackend};

/// Open the configured database and build the full application router.
pub async fn build_app(config: &ServerConfig) -> Result<axum::Router> {
    let db: Arc<dyn Database> = Arc::new(LibSqlBackend::open(&config.database).await?);
    match &config.database {
        DatabaseTarget::File(path) => info!(path = %path.display(), "Using database file"),
        DatabaseTarget::Memory => warn!("Using in-memory database; data is lost on exit"),
    }
    Ok(empresa_routes(db).layer(TraceLayer::new_for_http()))
}

/// Serve until `shutdown` resolves.
pub async fn run(
    config: ServerConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = build_app(&config).await?;

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, version = env!("CARGO_PKG_VERSION"), "Empresa API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Shut down cleanly");
    Ok(())
}
