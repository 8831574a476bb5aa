//! HTTP server for the dwsgen API.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                          |
//! |--------|-------------------|--------------------------------------|
//! | GET    | `/health`         | Health check                         |
//! | GET    | `/api/opcodes`    | Known opcodes and their fields       |
//! | POST   | `/api/convert`    | Convert CSV upload(s) to a DWS file  |
//! | GET    | `/api/logs`       | SSE stream for real-time logs        |
//!
//! `POST /api/convert` takes multipart form data: one or more `file`
//! fields, converted in upload order, and optional `startIndex`,
//! `methodName` and `comment` fields overriding the server's options.

use axum::{
    extract::{Multipart, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_info, LOG_BROADCASTER};
use super::types::{error_response, ConvertResponse, OpcodeInfo};
use crate::config::ConversionOptions;
use crate::error::{PipelineError, ServerError, ServerResult};
use crate::transform::opcodes::all_specs;
use crate::transform::pipeline::{convert_bytes, ConversionResult};

type ApiError = (StatusCode, Json<Value>);

/// Build the router with `options` as the base for every conversion.
pub fn router(options: ConversionOptions) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/opcodes", get(opcodes))
        .route("/api/convert", post(convert_upload))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(Arc::new(options))
}

/// Start the HTTP server
pub async fn start_server(port: u16, options: ConversionOptions) -> ServerResult<()> {
    options.validate().map_err(|e| ServerError::Pipeline(e.into()))?;
    let app = router(options);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 dwsgen server running on http://localhost:{}", port);
    println!("   POST /api/convert - Convert CSV file(s)");
    println!("   GET  /api/opcodes - Opcode table");
    println!("   GET  /api/logs    - SSE log stream");
    println!("   GET  /health      - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "dwsgen",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "convert": "POST /api/convert",
            "opcodes": "GET /api/opcodes",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

async fn opcodes() -> Json<Vec<OpcodeInfo>> {
    Json(all_specs().iter().map(OpcodeInfo::from).collect())
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Convert endpoint
async fn convert_upload(
    State(base): State<Arc<ConversionOptions>>,
    mut multipart: Multipart,
) -> Result<Json<ConvertResponse>, ApiError> {
    let mut options = (*base).clone();
    let mut uploads: Vec<(String, Vec<u8>)> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("upload-{}.csv", uploads.len() + 1));
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(format!("Read error: {}", e)))?;
                uploads.push((file_name, bytes.to_vec()));
            }
            "startIndex" | "methodName" | "comment" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("Read error: {}", e)))?;
                apply_form_field(&mut options, &name, text).map_err(|e| bad_request(e.to_string()))?;
            }
            _ => {}
        }
    }

    if uploads.is_empty() {
        return Err(bad_request("No file provided".to_string()));
    }

    log_info(format!("📄 New upload: {} file(s)", uploads.len()));

    let result = convert_off_runtime(uploads, options).await?;
    Ok(Json(ConvertResponse::from(&result)))
}

/// Run the conversion on the blocking pool.
async fn convert_off_runtime(
    uploads: Vec<(String, Vec<u8>)>,
    options: ConversionOptions,
) -> Result<ConversionResult, ApiError> {
    let outcome = tokio::task::spawn_blocking(move || convert_bytes(&uploads, &options))
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(error_response(&format!("Conversion task failed: {}", e))),
            )
        })?;

    outcome.map_err(|e| {
        let status = match e {
            PipelineError::Csv(_) | PipelineError::Config(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(error_response(&e.to_string())))
    })
}

/// Apply one option field of the upload form.
fn apply_form_field(options: &mut ConversionOptions, name: &str, value: String) -> ServerResult<()> {
    match name {
        "startIndex" => {
            options.start_index = value
                .trim()
                .parse()
                .map_err(|_| ServerError::BadRequest(format!("Invalid startIndex '{}'", value)))?;
        }
        "methodName" => options.method_name = value,
        "comment" => options.method_comment = value,
        _ => return Err(ServerError::BadRequest(format!("Unknown field '{}'", name))),
    }
    Ok(())
}

fn bad_request(message: String) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(error_response(&message)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_form_fields() {
        let mut options = ConversionOptions::default();
        apply_form_field(&mut options, "startIndex", " 3 ".into()).unwrap();
        apply_form_field(&mut options, "methodName", "qPCR".into()).unwrap();
        apply_form_field(&mut options, "comment", "plate 2".into()).unwrap();

        assert_eq!(options.start_index, 3);
        assert_eq!(options.method_name, "qPCR");
        assert_eq!(options.method_comment, "plate 2");
    }

    #[test]
    fn test_apply_form_field_rejects_bad_index() {
        let mut options = ConversionOptions::default();
        let err = apply_form_field(&mut options, "startIndex", "first".into()).unwrap_err();
        assert!(matches!(err, ServerError::BadRequest(_)));
        assert_eq!(options.start_index, 1);
    }

    #[tokio::test]
    async fn test_convert_runs_on_blocking_pool() {
        let uploads = vec![("s.csv".to_string(), b"Opcode,OpcodeStr\n113,Comment\n".to_vec())];
        let result = convert_off_runtime(uploads, ConversionOptions::default())
            .await
            .unwrap();
        assert_eq!(result.accepted, 1);
        assert_eq!(result.sections().len(), 3);
    }

    #[tokio::test]
    async fn test_convert_bad_sheet_is_bad_request() {
        let uploads = vec![("s.csv".to_string(), b"Bezeichner\nhello\n".to_vec())];
        let (status, body) = convert_off_runtime(uploads, ConversionOptions::default())
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.0["status"], "error");
    }

    #[test]
    fn test_router_builds() {
        let _ = router(ConversionOptions::default());
    }
}
