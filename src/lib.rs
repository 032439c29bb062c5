pub mod api;
pub mod app_state;
pub mod config;
pub mod job;
pub mod token_bucket;
pub mod trim;
pub mod validate;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Extension};
use axum::routing::{get, post};
use ffmpeg_next::{self as ffmpeg};
use std::path::PathBuf;
use std::str::FromStr;
use tokio::net::TcpListener;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tracing::info;

//
// Re-export
//
pub use app_state::AppState;
pub use config::Config;
pub use job::{JobRegistry, JobSnapshot, TrimJob};
pub use validate::UploadRejection;

pub async fn run(config: Config) {
    ffmpeg::init().expect("Failed to initialize ffmpeg");

    let workspace_path =
        PathBuf::from_str(&config.workspace).expect("Failed to parse workspace dir");

    let state = AppState::new(config.token_rate, config.permits, &workspace_path)
        .await
        .expect("Failed to create app state");

    // CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(api::index))
        .route("/upload", post(api::upload))
        .route("/jobs/{id}", get(api::job_status))
        .route("/media/{folder}/{filename}", get(api::serve_media))
        .layer(axum::middleware::from_fn(api::log_request_errors))
        .layer(cors)
        .layer(DefaultBodyLimit::max(
            (config.max_upload_mb as usize) * 1024 * 1024,
        ))
        .layer(Extension(state));

    let addr = format!("0.0.0.0:{}", config.listen_on_port);
    info!("Listening on {addr}");
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Failed to bind listen address");

    axum::serve(listener, app).await.expect("Server error");
}
