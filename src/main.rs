use forgejo_buildkite_bridge::api::status::VERSION;
use forgejo_buildkite_bridge::config::BridgeConfig;
use forgejo_buildkite_bridge::logging::{FileLogger, setup_logging};
use forgejo_buildkite_bridge::{AppState, router};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // A missing .env file is fine, the process environment is used as-is
    dotenv::dotenv().ok();

    let config = match BridgeConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("Get a token from: https://buildkite.com/user/api-access-tokens");
            std::process::exit(1);
        }
    };

    let file_logger = std::env::var("LOG_DIR")
        .ok()
        .filter(|dir| !dir.is_empty())
        .map(|dir| FileLogger::new(PathBuf::from(dir)));
    let _log_guard = setup_logging(config.verbose, file_logger.as_ref());

    let bind_address = config.bind_address();
    let port = config.listen_port.clone();

    info!("Forgejo-Buildkite Webhook Bridge v{}", VERSION);
    info!("Listening on port {}", port);
    info!("Buildkite organization: {}", config.org_slug);
    info!("Verbose logging: {}", config.verbose);
    info!(
        "Configure the Forgejo webhook to: http://your-host:{}/webhook/<pipeline-slug>",
        port
    );

    let state = match AppState::new(config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(&bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", bind_address, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Signal received, starting graceful shutdown");
}
