pub mod flash;
pub mod pages;
pub mod routes;

pub use routes::{index, job_status, serve_media, upload};

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tracing::{error, warn};

/// Log request outcomes: 4xx as warnings, 5xx as errors.
pub async fn log_request_errors(req: Request<Body>, next: Next) -> Response {
    let uri = req.uri().clone();
    let method = req.method().clone();

    let response = next.run(req).await;
    let status = response.status();
    if status.is_client_error() {
        warn!(method = %method, uri = %uri, status = %status, "Client error");
    } else if status.is_server_error() {
        error!(method = %method, uri = %uri, status = %status, "Server error");
    }

    response
}
