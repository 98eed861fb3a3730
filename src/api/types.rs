//! Request and response bodies of the HTTP API.

use serde::{Deserialize, Serialize};

use crate::provider::AiResponse;
use crate::router::DEFAULT_TEMPERATURE;

/// POST /generate
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

/// POST /summarize
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SummarizeRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
}

/// POST /analyze-speakers
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalyzeSpeakersRequest {
    #[serde(alias = "transcript")]
    pub text: String,
}

/// Body returned by every task endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaskResponse {
    pub content: String,
    pub token_usage: TokenUsageBody,
    pub model: String,
    pub provider: String,
}

/// Usage figures as exposed on the wire.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenUsageBody {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub cost_usd: f64,
}

impl From<AiResponse> for TaskResponse {
    fn from(response: AiResponse) -> Self {
        Self {
            token_usage: TokenUsageBody {
                input_tokens: response.usage.input_units,
                output_tokens: response.usage.output_units,
                total_tokens: response.usage.total_units,
                cost_usd: response.usage.cost_usd,
            },
            content: response.content,
            model: response.model,
            provider: response.provider,
        }
    }
}
