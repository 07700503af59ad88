//! Certificate backend server
//!
//! Wires the batch renderer behind an axum HTTP API. Configuration
//! comes from the environment, spreadsheet access strategy is picked
//! once at startup based on whether an API key is present.

mod config;
mod routes;
mod sheets;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::routes::AppState;
use crate::sheets::{FetchStrategy, SheetsClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "certkit_server=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env();

    let strategy = match &config.google_api_key {
        Some(key) => {
            tracing::info!("using Google Sheets API for spreadsheet access");
            FetchStrategy::ApiKey(key.clone())
        }
        None => {
            tracing::info!(
                "GOOGLE_API_KEY not set, using public CSV export for spreadsheet access"
            );
            FetchStrategy::PublicCsv
        }
    };
    let state = Arc::new(AppState {
        sheets: SheetsClient::new(strategy),
    });

    let cors = match &config.cors_origins {
        Some(origins) => CorsLayer::new()
            .allow_origin(
                origins
                    .iter()
                    .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                    .collect::<Vec<_>>(),
            )
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true),
        None => CorsLayer::permissive(),
    };

    let app = Router::new()
        .route("/", get(routes::health))
        .route("/api/sheets/tabs", post(routes::sheet_tabs))
        .route("/api/sheets/preview", post(routes::sheet_preview))
        .route("/api/generate", post(routes::generate))
        .layer(DefaultBodyLimit::max(25 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!(%addr, "certificate backend listening");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
