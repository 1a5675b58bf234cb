pub mod services;

use shared::{
    services::{amqp::Amqp, database::Database, kubernetes::Kubernetes},
    utilities::{config::Config, errors::AppError},
};
use time::macros::format_description;
use tokio::{signal, task::JoinSet};
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, fmt::time::LocalTime, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::services::consumer::start_consumer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install crypto provider
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load .env file
    match dotenvy::dotenv() {
        Ok(path) => {
            println!("Loaded .env file from {}", path.display());
        }
        Err(dotenvy::Error::Io(ref err)) if err.kind() == std::io::ErrorKind::NotFound => {
            println!(".env file not found, continuing without it");
        }
        Err(e) => {
            println!("Couldn't load .env file: {}", e);
        }
    }

    // Initialize config
    let config = Config::init()?;

    // Initialize tracing
    let filter = EnvFilter::new("deploy_worker=debug,shared=debug,tower_http=warn,hyper=warn");
    let timer = LocalTime::new(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_file(true)
                .with_line_number(true)
                .with_timer(timer),
        )
        .init();

    info!("🚀 Starting deploy-worker");

    // Initialize services
    let database = Database::new(&config).await?;
    let kubernetes = Kubernetes::new().await?;
    let amqp = Amqp::new(&config).await?;

    let mut set = JoinSet::new();

    // Spawn background tasks
    set.spawn(start_consumer(
        amqp,
        database.pool,
        kubernetes.client,
        config,
    ));
    set.spawn(start_health_server());

    info!("✅ All background tasks started");

    // Unified shutdown logic
    tokio::select! {
        _ = shutdown_signal() => {
            info!("🛑 Shutdown signal received");
            set.shutdown().await;
        }
        // If ANY task exits (crashes or finishes), this branch runs
        Some(result) = set.join_next() => {
            match result {
                Ok(Ok(())) => error!("A background task exited unexpectedly!"),
                Ok(Err(e)) => error!("Task failed: {}", e),
                Err(e) => error!("Task panic: {}", e),
            }
            set.shutdown().await;
        }
    }

    info!("👋 deploy-worker shutting down");

    Ok(())
}

/// Start a simple HTTP server for health checks
async fn start_health_server() -> Result<(), AppError> {
    use axum::{Json, Router, routing::get};
    use serde_json::json;

    let app = Router::new()
        .route(
            "/health",
            get(|| async {
                Json(json!({
                    "status": "healthy",
                    "service": "deploy-worker"
                }))
            }),
        )
        .route(
            "/ready",
            get(|| async {
                Json(json!({
                    "status": "ready",
                    "service": "deploy-worker"
                }))
            }),
        );

    let addr = "0.0.0.0:8002";
    info!("🏥 Health check server running on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
