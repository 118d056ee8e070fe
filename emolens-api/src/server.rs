use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use emolens_img::analyzer::{Analysis, Analyzer, FaceResult};
use emolens_img::decode::decode_base64_image;
use serde::Serialize;
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, warn};

pub type SharedAnalyzer = Arc<Mutex<Analyzer>>;

#[derive(Clone)]
struct AppState {
    analyzer: SharedAnalyzer,
}

pub fn router(analyzer: SharedAnalyzer) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health))
        .route("/api/analyze-emotion", post(analyze_emotion))
        .route("/api/test", post(test_echo))
        .layer(cors)
        .with_state(AppState { analyzer })
}

#[derive(Debug, Serialize)]
struct AnalysisResponse {
    status: &'static str,
    message: String,
    emotions: Vec<FaceResult>,
    face_count: usize,
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "success",
        "message": "Emotion Detection API is running!",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "analyze_emotion": "/api/analyze-emotion (POST)",
            "health": "/ (GET)",
        },
    }))
}

async fn analyze_emotion(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // last-resort catch: anything unexpected becomes a 500 envelope
    match try_analyze(&state, &headers, &body) {
        Ok(response) => response,
        Err(e) => {
            error!("unhandled API error: {e:?}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(error_body(format!("Internal server error: {e}"))),
            )
                .into_response()
        }
    }
}

fn try_analyze(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<Response> {
    if !is_json(headers) {
        return Ok(bad_request("Request must be JSON format"));
    }

    let data: Value = match serde_json::from_slice(body) {
        Ok(data) => data,
        Err(_) => return Ok(bad_request("Request must be JSON format")),
    };

    let Some(encoded) = data.get("image").and_then(Value::as_str) else {
        return Ok(bad_request(
            "No image data provided. Send base64 encoded image in \"image\" field.",
        ));
    };

    let Some(image) = decode_base64_image(encoded) else {
        return Ok(bad_request(
            "Invalid image format. Please send valid base64 encoded image.",
        ));
    };

    let analysis = state
        .analyzer
        .lock()
        .map_err(|_| anyhow!("analyzer lock poisoned"))?
        .analyze(&image);

    let emotions = match analysis {
        Analysis::Detected(faces) => faces,
        Analysis::Failed(reason) => {
            // the wire contract reports an unusable frame as zero faces
            warn!("analysis failed, reporting zero faces: {reason}");
            Vec::new()
        }
    };

    let message = if emotions.is_empty() {
        "No faces detected in the image"
    } else {
        "Emotion analysis completed successfully"
    };

    let face_count = emotions.len();
    Ok(Json(AnalysisResponse {
        status: "success",
        message: message.to_string(),
        emotions,
        face_count,
    })
    .into_response())
}

async fn test_echo(body: Bytes) -> Response {
    match serde_json::from_slice::<Value>(&body) {
        Ok(data) => Json(json!({
            "status": "success",
            "message": "Test successful",
            "received_data": data,
        }))
        .into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(error_body(format!("Test failed: {e}"))),
        )
            .into_response(),
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false)
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(error_body(message))).into_response()
}

fn error_body(message: impl Into<String>) -> Value {
    json!({ "status": "error", "message": message.into() })
}
