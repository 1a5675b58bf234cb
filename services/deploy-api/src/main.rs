pub mod features;
pub mod utilities;

use std::net::SocketAddr;

use axum::{Json, Router, http, routing::get};
use serde_json::json;
use shared::{services::amqp::Amqp, utilities::config::Config};
use time::macros::format_description;
use tokio::signal;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, fmt::time::LocalTime, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::utilities::app_state::AppState;

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
    let filter = EnvFilter::new("deploy_api=debug,shared=debug,tower_http=warn,hyper=warn");
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

    info!("🚀 Starting deploy-api");

    let state = AppState::init(&config).await?;

    // Declare the bus topology up front so a trigger never races worker startup
    let channel = state.amqp.channel().await?;
    Amqp::declare_topology(&channel).await?;

    let tracing_layer = TraceLayer::new_for_http()
        .on_request(|request: &http::Request<_>, _span: &tracing::Span| {
            let method = request.method();
            let matched_path = request
                .extensions()
                .get::<axum::extract::MatchedPath>()
                .map(|p| p.as_str())
                .unwrap_or("<unknown>");

            info!("{} {}", method, matched_path);
        })
        .on_response(DefaultOnResponse::new().level(tracing::Level::INFO));

    let health_route = Router::new().route(
        "/health",
        get(|| async {
            Json(json!({
                "status": "healthy",
                "service": "deploy-api"
            }))
        }),
    );

    let app = Router::new()
        .merge(features::get_routes())
        .merge(health_route)
        .layer(tracing_layer)
        .with_state(state);

    info!("🌐 deploy-api listening on {}", config.server_address);

    let listener = tokio::net::TcpListener::bind(config.server_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("👋 deploy-api shutting down");

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
