use crate::AppState;
use crate::api::flash::{set_flash, take_flash};
use crate::api::pages::render_index;
use crate::job::TrimJob;
use crate::token_bucket::TokenBucket;
use crate::validate::{self, UploadRejection};

use axum::body::Body;
use axum::extract::multipart::Field;
use axum::extract::{Extension, Multipart, Path as AxumPath, Query};
use axum::http::{Request, Response, StatusCode, header};
use axum::response::{Html, IntoResponse, Json, Redirect};
use axum_extra::extract::cookie::CookieJar;
use bytes::Bytes;
use futures::TryStreamExt;
use mime_guess::from_path;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use std::convert::Infallible;
use std::io::Error as IoError;
use std::sync::Arc;
use tokio::io::AsyncSeekExt;
use tokio::sync::Mutex as TokioMutex;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info, warn};

#[derive(Deserialize, Default)]
pub(crate) struct IndexParams {
    original: Option<String>,
    processed: Option<String>,
    job: Option<String>,
}

/// `GET /` — the form, a pending one-shot message, and players for the
/// filenames carried in the query string.
pub(crate) async fn index(
    jar: CookieJar,
    Query(params): Query<IndexParams>,
) -> (CookieJar, Html<String>) {
    let (jar, flash) = take_flash(jar);
    let page = render_index(
        flash.as_deref(),
        params.original.as_deref(),
        params.processed.as_deref(),
        params.job.as_deref(),
    );
    (jar, Html(page))
}

/// `GET /jobs/{id}` — job status as JSON.
pub(crate) async fn job_status(
    Extension(state): Extension<AppState>,
    AxumPath(id): AxumPath<String>,
) -> axum::response::Response {
    match state.jobs.get(&id).await {
        Some(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "unknown job" })),
        )
            .into_response(),
    }
}

/// `POST /upload` — multipart fields `file`, `start`, `end`. Every failure
/// queues a one-shot message and redirects back to the form; success
/// enqueues a trim job and redirects with both filenames and the job id.
pub(crate) async fn upload(
    Extension(state): Extension<AppState>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> (CookieJar, Redirect) {
    let mut saved: Option<String> = None;
    let mut rejection: Option<UploadRejection> = None;
    let mut start_raw: Option<String> = None;
    let mut end_raw: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(error) => {
                warn!(%error, "Malformed multipart body");
                rejection.get_or_insert(UploadRejection::MalformedBody);
                break;
            }
        };
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        match name.as_str() {
            "file" => {
                if saved.is_some() || rejection.is_some() {
                    continue;
                }
                match save_upload(&state, field).await {
                    Ok(filename) => saved = Some(filename),
                    Err(rej) => rejection = Some(rej),
                }
            }
            "start" => start_raw = field.text().await.ok(),
            "end" => end_raw = field.text().await.ok(),
            _ => {}
        }
    }

    if let Some(rejection) = rejection {
        return reject(jar, rejection);
    }
    let Some(source) = saved else {
        return reject(jar, UploadRejection::NoFile);
    };
    // The upload is already on disk at this point; window failures leave it
    // there, only the trim step is skipped.
    let (start, end) = match validate::parse_window(start_raw.as_deref(), end_raw.as_deref()) {
        Ok(window) => window,
        Err(rejection) => return reject(jar, rejection),
    };

    let output = validate::trimmed_name(&source, chrono::Utc::now());
    let job = TrimJob::new(source.clone(), output.clone(), start, end);
    let job_id = job.id().to_string();

    state.jobs.insert(&job).await;
    if state.job_tx.unbounded_send(job).is_err() {
        error!(%job_id, "Trim queue is closed");
        return reject(jar, UploadRejection::Storage);
    }
    info!(%job_id, %source, %output, start, end, "Trim queued");

    let location = format!(
        "/?original={}&processed={}&job={}",
        utf8_percent_encode(&source, NON_ALPHANUMERIC),
        utf8_percent_encode(&output, NON_ALPHANUMERIC),
        utf8_percent_encode(&job_id, NON_ALPHANUMERIC),
    );
    (
        set_flash(jar, "Trimming started, the clip appears below once ready"),
        Redirect::to(&location),
    )
}

fn reject(jar: CookieJar, rejection: UploadRejection) -> (CookieJar, Redirect) {
    debug!(%rejection, "Upload rejected");
    (set_flash(jar, &rejection.to_string()), Redirect::to("/"))
}

/// Validate the file field's name, then stream its contents into the
/// uploads directory. Disallowed names are rejected before anything is
/// written.
async fn save_upload(state: &AppState, mut field: Field<'_>) -> Result<String, UploadRejection> {
    let raw = field.file_name().unwrap_or_default().to_owned();
    if raw.is_empty() {
        return Err(UploadRejection::NoFile);
    }
    let filename = validate::sanitize_upload_name(&raw).ok_or(UploadRejection::NoFile)?;
    if !validate::allowed_extension(&filename) {
        return Err(UploadRejection::DisallowedExtension);
    }

    let path = state.uploads_dir().join(&filename);
    let mut file = match tokio::fs::File::create(&path).await {
        Ok(file) => file,
        Err(error) => {
            error!(%filename, %error, "Failed to create upload file");
            return Err(UploadRejection::Storage);
        }
    };

    use tokio::io::AsyncWriteExt as _;
    let mut size: u64 = 0;
    loop {
        match field.chunk().await {
            Ok(Some(chunk)) => {
                size += chunk.len() as u64;
                if let Err(error) = file.write_all(&chunk).await {
                    error!(%filename, %error, "Failed to write upload file");
                    let _ = tokio::fs::remove_file(&path).await;
                    return Err(UploadRejection::Storage);
                }
            }
            Ok(None) => break,
            Err(error) => {
                warn!(%filename, %error, "Upload stream broke off");
                let _ = tokio::fs::remove_file(&path).await;
                return Err(UploadRejection::MalformedBody);
            }
        }
    }
    if file.flush().await.is_err() {
        let _ = tokio::fs::remove_file(&path).await;
        return Err(UploadRejection::Storage);
    }

    if size == 0 {
        let _ = tokio::fs::remove_file(&path).await;
        return Err(UploadRejection::NoFile);
    }

    info!(%filename, size, "Upload saved");
    Ok(filename)
}

/// `GET /media/{folder}/{filename}` — inline file serving with byte-range
/// support, restricted to the two known folders.
pub(crate) async fn serve_media(
    Extension(state): Extension<AppState>,
    AxumPath((folder, filename)): AxumPath<(String, String)>,
    req: Request<Body>,
) -> Result<Response<Body>, Infallible> {
    let dir = match folder.as_str() {
        "uploads" => state.uploads_dir(),
        "processed" => state.processed_dir(),
        _ => {
            warn!(%folder, "Media folder not in allow-list");
            return Ok(file_not_found());
        }
    };

    // The router never matches a slash into {filename}, but an encoded one
    // decodes into it; refuse anything that smells like a path.
    if filename.is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename == "."
        || filename == ".."
    {
        warn!(%filename, "Rejecting suspicious media name");
        return Ok(file_not_found());
    }

    let path = dir.join(&filename);
    debug!(%folder, %filename, ?path, "Media request");

    let Ok(mut fh) = tokio::fs::File::open(&path).await else {
        return Ok(file_not_found());
    };
    let Ok(metadata) = fh.metadata().await else {
        return Ok(file_not_found());
    };

    let size = metadata.len();
    if size == 0 {
        let mut res = Response::new(Body::empty());
        res.headers_mut()
            .insert(header::CONTENT_LENGTH, "0".parse().unwrap());
        return Ok(res);
    }

    let (status, start, end) = parse_range(&req, size);
    if fh.seek(std::io::SeekFrom::Start(start)).await.is_err() {
        return Ok(file_not_found());
    }
    let len = end - start + 1;

    let bucket = Arc::new(TokioMutex::new(TokenBucket::new(
        state.token_rate,
        state.token_rate,
    )));

    use futures::StreamExt as _;
    use tokio::io::AsyncReadExt as _;
    let stream = ReaderStream::new(fh.take(len))
        .map_err(|e| IoError::new(e.kind(), e.to_string()))
        .then(move |res| {
            let bucket = bucket.clone();
            async move {
                match res {
                    Ok(chunk) => {
                        bucket.lock().await.consume(chunk.len()).await;
                        Ok::<Bytes, IoError>(chunk)
                    }
                    Err(e) => Err(e),
                }
            }
        });

    let mut res = Response::new(Body::from_stream(stream));
    *res.status_mut() = status;
    let headers = res.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        from_path(&path)
            .first_or_octet_stream()
            .to_string()
            .parse()
            .unwrap(),
    );
    headers.insert(header::ACCEPT_RANGES, "bytes".parse().unwrap());
    headers.insert(
        header::CACHE_CONTROL,
        "public,max-age=3600".parse().unwrap(),
    );
    headers.insert(header::CONTENT_LENGTH, len.to_string().parse().unwrap());
    if status == StatusCode::PARTIAL_CONTENT {
        headers.insert(
            header::CONTENT_RANGE,
            format!("bytes {start}-{end}/{size}").parse().unwrap(),
        );
    }
    Ok(res)
}

fn file_not_found() -> Response<Body> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .body(Body::from("File not found"))
        .unwrap()
}

fn parse_range(req: &Request<Body>, file_size: u64) -> (StatusCode, u64, u64) {
    if let Some(rh) = req.headers().get(header::RANGE)
        && let Ok(s) = rh.to_str()
        && let Some(stripped) = s.strip_prefix("bytes=")
        && let parts = stripped.split('-').collect::<Vec<_>>()
        && let Ok(start) = parts[0].parse::<u64>()
        && start < file_size
    {
        let end = parts
            .get(1)
            .and_then(|e| e.parse::<u64>().ok())
            .unwrap_or(file_size - 1)
            .min(file_size - 1);
        if end >= start {
            return (StatusCode::PARTIAL_CONTENT, start, end);
        }
    }

    (StatusCode::OK, 0, file_size - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_range(range: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/media/uploads/clip.mp4");
        if let Some(range) = range {
            builder = builder.header(header::RANGE, range);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn no_range_serves_the_whole_file() {
        let (status, start, end) = parse_range(&request_with_range(None), 100);
        assert_eq!(status, StatusCode::OK);
        assert_eq!((start, end), (0, 99));
    }

    #[test]
    fn bounded_range_is_honored() {
        let (status, start, end) = parse_range(&request_with_range(Some("bytes=10-19")), 100);
        assert_eq!(status, StatusCode::PARTIAL_CONTENT);
        assert_eq!((start, end), (10, 19));
    }

    #[test]
    fn open_ended_range_runs_to_the_last_byte() {
        let (status, start, end) = parse_range(&request_with_range(Some("bytes=90-")), 100);
        assert_eq!(status, StatusCode::PARTIAL_CONTENT);
        assert_eq!((start, end), (90, 99));
    }

    #[test]
    fn range_end_is_clamped_to_the_file() {
        let (_, _, end) = parse_range(&request_with_range(Some("bytes=0-5000")), 100);
        assert_eq!(end, 99);
    }

    #[test]
    fn range_past_the_end_falls_back_to_full_file() {
        let (status, start, end) = parse_range(&request_with_range(Some("bytes=500-")), 100);
        assert_eq!(status, StatusCode::OK);
        assert_eq!((start, end), (0, 99));
    }

    #[test]
    fn reversed_range_falls_back_to_full_file() {
        let (status, start, end) = parse_range(&request_with_range(Some("bytes=5-2")), 100);
        assert_eq!(status, StatusCode::OK);
        assert_eq!((start, end), (0, 99));
    }
}
