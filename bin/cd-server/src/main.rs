//! CertDash Server
//!
//! Serves the dashboard REST API:
//! - `/api/auth` login and current admin
//! - `/api/data` collection gateway
//! - `/api/audit-logs`, `/api/developers`, `/api/billing`, `/api/datasets`, `/api/campaigns`
//! - `/health`, Swagger UI at `/swagger-ui`
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CERTDASH_CONFIG` | - | Path to a TOML config file |
//! | `CERTDASH_HTTP_PORT` | `8080` | HTTP port |
//! | `CERTDASH_HTTP_HOST` | `0.0.0.0` | Bind address |
//! | `CERTDASH_CORS_ORIGINS` | `http://localhost:3000` | Comma-separated allowed origins, `*` for any |
//! | `CERTDASH_STORAGE_BACKEND` | `sqlite` | `sqlite` or `memory` |
//! | `CERTDASH_DATABASE_URL` | - | SQLite URL (required for `sqlite`) |
//! | `CERTDASH_STORAGE_QUOTA_BYTES` | `0` | Memory backend quota, 0 for none |
//! | `CERTDASH_JWT_SECRET` | - | HS256 signing secret (required) |
//! | `CERTDASH_TOKEN_EXPIRY_HOURS` | `8` | Token lifetime, 1 to 24 |
//! | `CERTDASH_DEV_MODE` | `false` | Seed a default admin roster |
//! | `RUST_LOG` | `info` | Log level |
//! | `LOG_FORMAT` | `text` | `json` for structured output |

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use tokio::{net::TcpListener, signal};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use cd_config::{AppConfig, ConfigLoader};
use cd_platform::{Platform, Storage};

#[tokio::main]
async fn main() -> Result<()> {
    cd_common::logging::init_logging("cd-server");

    info!("Starting CertDash Server");

    let config = ConfigLoader::new().load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let storage = Storage::connect(&config.storage)
        .await
        .context("Failed to open storage")?;

    let platform = Platform::new(storage, &config)?;
    info!(backend = platform.storage.backend_name(), "Platform services initialized");

    if config.dev_mode {
        if let Err(e) = platform.seed_dev_data().await {
            warn!("Dev data seeding skipped: {}", e);
        }
    }

    let app = platform
        .router()
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config));

    let addr = format!("{}:{}", config.http.host, config.http.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("API server listening on http://{}", addr);
    info!("Swagger UI at http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("CertDash Server shutdown complete");
    Ok(())
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins = &config.http.cors_origins;
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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
    info!("Shutdown signal received...");
}
