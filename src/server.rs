//! HTTP surface: list formats, convert an upload, download the result.
//!
//! ```text
//! GET  /formats              registry + capability flags
//! POST /convert              multipart: pdf_file, output_format
//! GET  /download/:filename   produced file as an attachment
//! ```
//!
//! Errors are returned as `{"error": "..."}` with a status derived from the
//! [`ConvertError`] variant. Internal errors are logged and replaced by a
//! generic message so that no server path reaches the client.

use crate::capabilities::Capabilities;
use crate::convert::Converter;
use crate::error::{ConvertError, ValidationError};
use crate::registry::SupportedFormat;
use crate::upload::UploadedFile;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::Serialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Room for multipart boundaries, part headers and the format field on top
/// of the upload cap.
pub const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Multipart field carrying the PDF.
pub const FILE_FIELD: &str = "pdf_file";
/// Multipart field carrying the format key.
pub const FORMAT_FIELD: &str = "output_format";

// ── Errors ───────────────────────────────────────────────────────────────

/// A [`ConvertError`] on its way to becoming an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub ConvertError);

impl From<ConvertError> for ApiError {
    fn from(e: ConvertError) -> Self {
        Self(e)
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self(ConvertError::Validation(e))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ConvertError::Validation(ValidationError::PayloadTooLarge { .. }) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            ConvertError::Validation(_) => StatusCode::BAD_REQUEST,
            ConvertError::NotFound { .. } => StatusCode::NOT_FOUND,
            ConvertError::ConversionFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = ?self.0, "Internal server error");
            "Internal server error".to_string()
        } else {
            self.0.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

// ── Router ───────────────────────────────────────────────────────────────

/// All routes, with the body limit and request tracing applied.
pub fn router(converter: Arc<Converter>) -> Router {
    let body_limit = converter
        .config()
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/formats", get(list_formats))
        .route("/convert", post(convert_upload))
        .route("/download/:filename", get(download))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(converter)
}

/// Serve [`router`] on `addr` until Ctrl+C.
pub async fn serve(converter: Arc<Converter>, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(converter))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Could not install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Shutting down");
        })
        .await
}

// ── Handlers ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct FormatsBody {
    formats: Vec<SupportedFormat>,
    capabilities: Capabilities,
}

async fn list_formats(State(converter): State<Arc<Converter>>) -> Json<FormatsBody> {
    let registry = converter.registry();
    Json(FormatsBody {
        formats: registry.iter().cloned().collect(),
        capabilities: registry.capabilities(),
    })
}

#[derive(Debug, Serialize)]
struct ConvertBody {
    file_name: String,
    download_url: String,
    bytes: u64,
}

async fn convert_upload(
    State(converter): State<Arc<Converter>>,
    mut multipart: Multipart,
) -> Result<Json<ConvertBody>, ApiError> {
    let limit = converter.config().max_upload_bytes;
    let rejected = |e| multipart_error(e, limit);
    let mut upload: Option<UploadedFile> = None;
    let mut format_key = String::new();

    while let Some(field) = multipart.next_field().await.map_err(rejected)? {
        match field.name() {
            Some(FILE_FIELD) => {
                let filename = field.file_name().map(str::to_string);
                let bytes: Bytes = field.bytes().await.map_err(rejected)?;
                upload = Some(UploadedFile { filename, bytes });
            }
            Some(FORMAT_FIELD) => {
                format_key = field.text().await.map_err(rejected)?.trim().to_string();
            }
            _ => {}
        }
    }

    let upload = upload.ok_or(ValidationError::NoFileSelected)?;
    let output = converter.convert_upload(&upload, &format_key).await?;

    Ok(Json(ConvertBody {
        download_url: format!("/download/{}", output.file_name),
        file_name: output.file_name,
        bytes: output.bytes,
    }))
}

async fn download(
    State(converter): State<Arc<Converter>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let path = converter.download_resolver().resolve(&filename).await?;
    let body = tokio::fs::read(&path)
        .await
        .map_err(|source| ConvertError::Storage { path, source })?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response())
}

/// Body-limit overruns become 413; anything else is a malformed request (400).
///
/// The body is cut off at the limit, so the reported size is the number of
/// bytes accepted before the cut.
fn multipart_error(e: axum::extract::multipart::MultipartError, limit: usize) -> ApiError {
    let text = e.body_text();
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE || text.contains("length limit exceeded") {
        ValidationError::PayloadTooLarge {
            size: limit.saturating_add(MULTIPART_OVERHEAD),
            limit,
        }
        .into()
    } else {
        warn!("Malformed multipart request: {}", text);
        ValidationError::MalformedRequest.into()
    }
}
