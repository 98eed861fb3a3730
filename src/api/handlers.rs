//! HTTP request handlers.

use axum::{
    extract::{Extension, Multipart, State},
    http::{HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};

use super::server::{AppState, RequestId};
use super::types::{AnalyzeSpeakersRequest, GenerateRequest, SummarizeRequest, TaskResponse};
use crate::error::Error;
use crate::router::TaskRequest;

/// Response header: provider name that handled the request.
pub const PROVIDER_HEADER: &str = "x-ai-adapter-provider";
/// Response header: cost of the call in USD (6 decimals).
pub const COST_USD_HEADER: &str = "x-ai-adapter-cost-usd";
/// Response header: wall-clock latency in milliseconds (integer).
pub const LATENCY_MS_HEADER: &str = "x-ai-adapter-latency-ms";

/// Multipart field carrying the audio upload.
const AUDIO_FIELD: &str = "audio";

/// Attach routing metadata headers to a response.
///
/// Latency is always set; provider and cost only when known.
fn attach_metadata_headers(
    response: &mut Response,
    latency_ms: u64,
    provider: Option<&str>,
    cost_usd: Option<f64>,
) {
    let headers = response.headers_mut();

    headers.insert(
        HeaderName::from_static(LATENCY_MS_HEADER),
        HeaderValue::from(latency_ms),
    );

    if let Some(value) = provider.and_then(|p| HeaderValue::from_str(p).ok()) {
        headers.insert(HeaderName::from_static(PROVIDER_HEADER), value);
    }

    if let Some(value) = cost_usd.and_then(|c| HeaderValue::from_str(&format!("{:.6}", c)).ok()) {
        headers.insert(HeaderName::from_static(COST_USD_HEADER), value);
    }
}

/// Run a task through the router and turn the outcome into a response.
async fn run_task(state: &AppState, request_id: RequestId, request: TaskRequest) -> Response {
    let start = std::time::Instant::now();
    let task = request.task_type();

    let result = state.router.request(request).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(response) => {
            let provider = response.provider.clone();
            let cost = response.usage.cost_usd;
            let mut http_response = Json(TaskResponse::from(response)).into_response();
            attach_metadata_headers(&mut http_response, latency_ms, Some(&provider), Some(cost));
            http_response
        }
        Err(e) => {
            tracing::warn!(
                request_id = %request_id.0,
                task = %task,
                kind = e.kind(),
                error = %e,
                "Request failed"
            );
            let provider = e.provider().map(str::to_string);
            let mut http_response = e.into_response();
            attach_metadata_headers(&mut http_response, latency_ms, provider.as_deref(), None);
            http_response
        }
    }
}

fn require_text(field: &str, value: &str) -> Result<(), Error> {
    if value.trim().is_empty() {
        return Err(Error::BadRequest(format!("'{}' must not be empty", field)));
    }
    Ok(())
}

/// Handle POST /generate
pub async fn generate(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<GenerateRequest>,
) -> Result<Response, Error> {
    require_text("prompt", &request.prompt)?;
    if !(0.0..=2.0).contains(&request.temperature) {
        return Err(Error::BadRequest(format!(
            "'temperature' must be between 0 and 2, got {}",
            request.temperature
        )));
    }

    tracing::info!(
        request_id = %request_id.0,
        prompt_chars = request.prompt.len(),
        max_tokens = ?request.max_tokens,
        "Received generate request"
    );

    let task = TaskRequest::Generate {
        prompt: request.prompt,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
    };
    Ok(run_task(&state, request_id, task).await)
}

/// Handle POST /summarize
pub async fn summarize(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<SummarizeRequest>,
) -> Result<Response, Error> {
    require_text("text", &request.text)?;

    tracing::info!(
        request_id = %request_id.0,
        text_chars = request.text.len(),
        max_length = ?request.max_length,
        "Received summarize request"
    );

    let task = TaskRequest::Summarize {
        text: request.text,
        max_length: request.max_length,
    };
    Ok(run_task(&state, request_id, task).await)
}

/// Handle POST /analyze-speakers
pub async fn analyze_speakers(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<AnalyzeSpeakersRequest>,
) -> Result<Response, Error> {
    require_text("text", &request.text)?;

    tracing::info!(
        request_id = %request_id.0,
        transcript_chars = request.text.len(),
        "Received speaker analysis request"
    );

    let task = TaskRequest::AnalyzeSpeakers {
        transcript: request.text,
    };
    Ok(run_task(&state, request_id, task).await)
}

/// Handle POST /transcribe (multipart upload, field `audio`)
pub async fn transcribe(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    mut multipart: Multipart,
) -> Result<Response, Error> {
    let mut audio = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some(AUDIO_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| Error::BadRequest(format!("Failed to read audio: {}", e)))?;
            audio = Some(bytes);
            break;
        }
    }

    let audio = audio
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| Error::BadRequest(format!("Missing or empty '{}' field", AUDIO_FIELD)))?;

    tracing::info!(
        request_id = %request_id.0,
        bytes = audio.len(),
        "Received transcription request"
    );

    Ok(run_task(&state, request_id, TaskRequest::Transcribe { audio }).await)
}

/// Handle GET /usage
pub async fn usage(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.router.usage_stats())
}

/// Handle POST /reset-usage
pub async fn reset_usage(State(state): State<AppState>) -> impl IntoResponse {
    state.router.reset_daily_usage();
    Json(serde_json::json!({
        "message": "Daily usage counters reset"
    }))
}

/// Handle GET /health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "ai-adapter",
        "available_providers": state.router.registry().names(),
    }))
}
