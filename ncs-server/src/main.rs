//! NCS image server entry point.

use std::env;
use std::sync::Arc;

use ncs_server::config::{self, ConfigParams, Settings, PARAMS_TABLE};
use ncs_server::engine::RemoteEngineFactory;
use ncs_server::image::FileImageLoader;
use ncs_server::{api, gateway, AppState};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    println!("ncs-image-server {}", VERSION);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle --version / -V and --config <path>
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--version" || a == "-V") {
        print_version();
        return Ok(());
    }
    let config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .cloned();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let raw = config::load(config_path.as_deref())
        .map_err(|e| format!("Failed to load configuration: {}", e))?;
    let settings = Settings::from_raw(&raw)?;
    let params = ConfigParams::new(raw, PARAMS_TABLE);

    // Validate parameters and construct the engine
    let factory = RemoteEngineFactory::new(&settings.engine.base_url);
    let gateway = gateway::start(&params, &factory, Arc::new(FileImageLoader))
        .await
        .map_err(|e| {
            tracing::error!("Startup failed: {}", e);
            e
        })?;
    tracing::info!(
        "Serving {} with {} model",
        gateway.operation(),
        gateway.config().model_kind()
    );

    let app = api::app(Arc::new(AppState::new(gateway)));

    // Start server
    let addr = format!("{}:{}", settings.api.host, settings.api.port);
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
