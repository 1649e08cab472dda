use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;
use users_backend::{
    config::{get_config, init_config, LogFormat, StoreKind},
    database::{
        pool::{create_pool, run_migrations},
        InMemoryUserGateway, PgUserGateway, UserGateway,
    },
    middleware::cors::cors_layer,
    routes, AppState,
};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = ?e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = ?e, "failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config()?;
    init_tracing(config.log_format);

    let pool = match config.store {
        StoreKind::Postgres => {
            let pool = create_pool(config).await?;
            run_migrations(&pool).await?;
            info!(
                max_connections = config.db_max_connections,
                "Connected to Postgres"
            );
            Some(pool)
        }
        StoreKind::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on exit");
            None
        }
    };

    let gateway: Arc<dyn UserGateway> = match &pool {
        Some(pool) => Arc::new(PgUserGateway::new(pool.clone())),
        None => Arc::new(InMemoryUserGateway::new()),
    };

    let app_state = AppState::new(gateway)?;
    for procedure in app_state.registry.manifest() {
        info!("Registered {} {}", procedure.kind, procedure.name);
    }

    let cors = cors_layer(config.cors_allowed_origin.as_deref())?;
    let app = routes::build_router(app_state, cors);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = pool {
        pool.close().await;
        info!("Database pool closed");
    }

    Ok(())
}
