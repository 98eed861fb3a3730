//! Provider capability interface and the data it produces.
//!
//! A provider is a backend implementing one or more AI tasks. Each provider
//! declares its capabilities up front so the routing policy can check
//! membership instead of attempting a call and catching the failure.

pub mod gemini;
pub mod pricing;
mod prompts;
pub mod registry;
pub mod whisper;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use gemini::GeminiProvider;
pub use pricing::PriceTable;
pub use registry::{ProviderRegistry, Registration};
pub use whisper::WhisperProvider;

/// The kinds of work a caller can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Generate,
    Summarize,
    AnalyzeSpeakers,
    Transcribe,
}

impl TaskType {
    pub const ALL: [TaskType; 4] = [
        TaskType::Generate,
        TaskType::Summarize,
        TaskType::AnalyzeSpeakers,
        TaskType::Transcribe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Generate => "generate",
            TaskType::Summarize => "summarize",
            TaskType::AnalyzeSpeakers => "analyze_speakers",
            TaskType::Transcribe => "transcribe",
        }
    }

    const fn bit(self) -> u8 {
        match self {
            TaskType::Generate => 1,
            TaskType::Summarize => 1 << 1,
            TaskType::AnalyzeSpeakers => 1 << 2,
            TaskType::Transcribe => 1 << 3,
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of tasks a provider implements.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    pub const fn of(tasks: &[TaskType]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < tasks.len() {
            bits |= tasks[i].bit();
            i += 1;
        }
        Self(bits)
    }

    pub fn contains(&self, task: TaskType) -> bool {
        self.0 & task.bit() != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = TaskType> + '_ {
        TaskType::ALL.into_iter().filter(|t| self.contains(*t))
    }
}

impl std::fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Consumed capacity and cost of a single provider call.
///
/// `total_units` is always `input_units + output_units`; construct through
/// [`TokenUsage::new`] to keep it that way.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TokenUsage {
    pub input_units: u64,
    pub output_units: u64,
    pub total_units: u64,
    pub cost_usd: f64,
}

impl TokenUsage {
    pub fn new(input_units: u64, output_units: u64, cost_usd: f64) -> Self {
        let cost_usd = if cost_usd.is_finite() && cost_usd > 0.0 {
            cost_usd
        } else {
            0.0
        };
        Self {
            input_units,
            output_units,
            total_units: input_units.saturating_add(output_units),
            cost_usd,
        }
    }
}

/// Normalized result of any provider task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AiResponse {
    pub content: String,
    pub usage: TokenUsage,
    pub model: String,
    pub provider: String,
}

/// Provider-level failures, before the router attaches task context.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("operation '{0}' is not supported by this provider")]
    Unsupported(TaskType),

    #[error("request failed: {0}")]
    Request(String),

    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        ProviderError::Request(e.to_string())
    }
}

/// A capability-typed AI backend.
///
/// `summarize` and `analyze_speakers` default to a templated prompt delegated
/// to `generate`; providers without generation override them with their own
/// rule-based fallbacks.
#[async_trait]
pub trait Provider: Send + Sync + std::fmt::Debug {
    /// Stable identifier, used as the usage ledger key.
    fn name(&self) -> &str;

    /// Model identifier reported in responses.
    fn model(&self) -> &str;

    fn capabilities(&self) -> CapabilitySet;

    /// Static per-unit prices used for usage statistics.
    fn price_table(&self) -> PriceTable;

    /// Predict the cost of running `task` over `input`.
    ///
    /// Side-effect free and never touches the network.
    fn estimate_cost(&self, input: &str, task: TaskType) -> f64;

    async fn generate(
        &self,
        prompt: &str,
        max_output_units: Option<u32>,
        temperature: f32,
    ) -> Result<AiResponse, ProviderError>;

    async fn summarize(
        &self,
        text: &str,
        max_length: Option<u32>,
    ) -> Result<AiResponse, ProviderError> {
        let (prompt, max_units) = prompts::summary(text, max_length);
        self.generate(&prompt, Some(max_units), prompts::DEFAULT_TEMPERATURE)
            .await
    }

    async fn analyze_speakers(&self, transcript: &str) -> Result<AiResponse, ProviderError> {
        let (prompt, max_units) = prompts::speaker_analysis(transcript);
        self.generate(&prompt, Some(max_units), prompts::DEFAULT_TEMPERATURE)
            .await
    }

    async fn transcribe_audio(&self, _audio: &[u8]) -> Result<AiResponse, ProviderError> {
        Err(ProviderError::Unsupported(TaskType::Transcribe))
    }
}
