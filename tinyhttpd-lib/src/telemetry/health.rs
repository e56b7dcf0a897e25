use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::body::Bytes;
use hyper::Response;
use hyper::StatusCode;
use serde_json::json;

use crate::error::{Result, ServerError};

type RespBody = BoxBody<Bytes, hyper::Error>;

/// Health check response: 200 while the process runs, 503 once stopping
pub fn health_check_response(stopping: bool) -> Result<Response<RespBody>> {
    let (status, body) = if stopping {
        (StatusCode::SERVICE_UNAVAILABLE, json!({"status": "stopping"}))
    } else {
        (StatusCode::OK, json!({"status": "healthy"}))
    };
    let body_bytes = serde_json::to_vec(&body).map_err(|e| {
        ServerError::Telemetry(format!("Failed to serialize health response: {e}"))
    })?;

    let body = Full::new(Bytes::from(body_bytes))
        .map_err(|never| match never {})
        .boxed();

    Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body)
        .map_err(|e| ServerError::Telemetry(format!("Failed to build health response: {e}")))
}
