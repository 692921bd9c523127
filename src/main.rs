use std::path::PathBuf;
use std::sync::Arc;

use catalog::config::{Cli, Config, default_config_dir, default_config_path};
use catalog::db::Database;
use catalog::handler::AppState;
use catalog::routes::routes;
use clap::Parser;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    tracing::info!("catalog.svc starting");

    // An explicit --config also decides where the database lives: next to it.
    let (config_path, data_dir, explicit) = match args.config_path {
        Some(path) => {
            let path = PathBuf::from(path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."));
            (path, dir, true)
        }
        None => (default_config_path(), default_config_dir(), false),
    };

    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(error = %e, path = ?data_dir, "failed to create data directory");
        std::process::exit(1);
    }

    let cfg = if explicit || config_path.exists() {
        Config::new(&config_path.to_string_lossy()).unwrap_or_else(|e| {
            tracing::error!(error = %e, path = ?config_path, "failed to load config file");
            std::process::exit(1);
        })
    } else {
        tracing::warn!(path = ?config_path, "no config file found, using defaults");
        Config::default()
    };

    let db = Arc::new(Database::new(&cfg, &data_dir).await.unwrap_or_else(|e| {
        tracing::error!(error = %catalog::unpack_error(&e), "failed to setup database");
        std::process::exit(1);
    }));

    let address = cfg.app.get_address();
    let app = routes().layer(TraceLayer::new_for_http()).with_state(AppState { db });

    let listener = tokio::net::TcpListener::bind(&address).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup tcp listener");
        std::process::exit(1);
    });

    tracing::info!("catalog.svc running on {}", &address);
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl+c");
            }
            tracing::info!("ctrl+c signal received, preparing to shutdown");
        })
        .await;

    if let Err(err) = result {
        tracing::error!(error = %err, "server exited with an error");
        std::process::exit(1);
    }

    tracing::info!("catalog.svc going off, graceful shutdown complete");
}
