//! Router facade: select, invoke, account.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;

use super::ledger::UsageLedger;
use super::selector::{self, Selection};
use crate::config::RoutingConfig;
use crate::error::{Error, Result};
use crate::provider::{AiResponse, Provider, ProviderError, ProviderRegistry, TaskType};

/// Default sampling temperature for `generate`.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// A single unit of work submitted to the router.
#[derive(Debug, Clone)]
pub enum TaskRequest {
    Generate {
        prompt: String,
        max_tokens: Option<u32>,
        temperature: f32,
    },
    Summarize {
        text: String,
        max_length: Option<u32>,
    },
    AnalyzeSpeakers {
        transcript: String,
    },
    Transcribe {
        audio: Bytes,
    },
}

impl TaskRequest {
    pub fn task_type(&self) -> TaskType {
        match self {
            TaskRequest::Generate { .. } => TaskType::Generate,
            TaskRequest::Summarize { .. } => TaskType::Summarize,
            TaskRequest::AnalyzeSpeakers { .. } => TaskType::AnalyzeSpeakers,
            TaskRequest::Transcribe { .. } => TaskType::Transcribe,
        }
    }

    /// Text the routing policy estimates cost from. Empty for audio.
    pub fn routing_input(&self) -> &str {
        match self {
            TaskRequest::Generate { prompt, .. } => prompt,
            TaskRequest::Summarize { text, .. } => text,
            TaskRequest::AnalyzeSpeakers { transcript } => transcript,
            TaskRequest::Transcribe { .. } => "",
        }
    }

    async fn invoke(&self, provider: &dyn Provider) -> std::result::Result<AiResponse, ProviderError> {
        match self {
            TaskRequest::Generate {
                prompt,
                max_tokens,
                temperature,
            } => provider.generate(prompt, *max_tokens, *temperature).await,
            TaskRequest::Summarize { text, max_length } => {
                provider.summarize(text, *max_length).await
            }
            TaskRequest::AnalyzeSpeakers { transcript } => {
                provider.analyze_speakers(transcript).await
            }
            TaskRequest::Transcribe { audio } => provider.transcribe_audio(audio).await,
        }
    }
}

/// Read-only view of today's usage.
#[derive(Debug, Clone, Serialize)]
pub struct UsageStats {
    pub daily_usage: BTreeMap<String, u64>,
    pub estimated_daily_cost_usd: f64,
    pub available_providers: Vec<String>,
    pub config: RoutingSummary,
}

/// Routing settings echoed in usage statistics.
#[derive(Debug, Clone, Serialize)]
pub struct RoutingSummary {
    pub cost_optimization_enabled: bool,
    pub max_units_per_day: u64,
    pub fallback_enabled: bool,
    pub cost_threshold_usd: f64,
}

/// Public entry point: routes task requests to providers and keeps the ledger.
///
/// Cheap to clone; all state is shared behind `Arc`s.
#[derive(Debug, Clone)]
pub struct Router {
    registry: Arc<ProviderRegistry>,
    ledger: Arc<UsageLedger>,
    config: Arc<RoutingConfig>,
    timeout: Duration,
}

impl Router {
    /// Create a router with a fresh ledger seeded from the registry.
    pub fn new(registry: ProviderRegistry, config: RoutingConfig) -> Self {
        let ledger = UsageLedger::new(&registry.names());
        Self {
            timeout: config.request_timeout(),
            registry: Arc::new(registry),
            ledger: Arc::new(ledger),
            config: Arc::new(config),
        }
    }

    /// Override the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &Arc<UsageLedger> {
        &self.ledger
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Run the routing policy without invoking anything.
    pub fn select(&self, task: TaskType, input: &str) -> Result<Selection> {
        selector::select_provider(task, input, &self.registry, &self.ledger, &self.config)
    }

    /// Route and execute a task.
    ///
    /// Usage is recorded only when the provider call succeeds. Failures and
    /// timeouts leave the ledger untouched and carry provider and task context.
    /// No retries are attempted.
    pub async fn request(&self, request: TaskRequest) -> Result<AiResponse> {
        let task = request.task_type();
        let selection = self.select(task, request.routing_input())?;
        let provider = selection.provider;
        let provider_name = provider.name();

        tracing::info!(
            task = %task,
            provider = %provider_name,
            route = selection.route.as_str(),
            "Selected provider"
        );

        let outcome = tokio::time::timeout(self.timeout, request.invoke(provider.as_ref())).await;

        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::warn!(task = %task, provider = %provider_name, error = %e, "Provider call failed");
                return Err(Error::from_provider(provider_name, task, e));
            }
            Err(_) => {
                tracing::warn!(
                    task = %task,
                    provider = %provider_name,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Provider call timed out"
                );
                return Err(Error::ProviderCallFailed {
                    provider: provider_name.to_string(),
                    task,
                    message: format!("timed out after {:?}", self.timeout),
                });
            }
        };

        let daily_total = self.ledger.record(provider_name, response.usage.total_units);

        tracing::info!(
            task = %task,
            provider = %provider_name,
            units = response.usage.total_units,
            cost_usd = response.usage.cost_usd,
            daily_total,
            "Provider call completed"
        );

        Ok(response)
    }

    pub async fn generate(
        &self,
        prompt: impl Into<String>,
        max_tokens: Option<u32>,
        temperature: f32,
    ) -> Result<AiResponse> {
        self.request(TaskRequest::Generate {
            prompt: prompt.into(),
            max_tokens,
            temperature,
        })
        .await
    }

    pub async fn summarize(&self, text: impl Into<String>, max_length: Option<u32>) -> Result<AiResponse> {
        self.request(TaskRequest::Summarize {
            text: text.into(),
            max_length,
        })
        .await
    }

    pub async fn analyze_speakers(&self, transcript: impl Into<String>) -> Result<AiResponse> {
        self.request(TaskRequest::AnalyzeSpeakers {
            transcript: transcript.into(),
        })
        .await
    }

    pub async fn transcribe_audio(&self, audio: impl Into<Bytes>) -> Result<AiResponse> {
        self.request(TaskRequest::Transcribe {
            audio: audio.into(),
        })
        .await
    }

    /// Snapshot of today's usage with cost recomputed from each provider's prices.
    pub fn usage_stats(&self) -> UsageStats {
        let daily_usage = self.ledger.snapshot();

        let estimated_daily_cost_usd = daily_usage
            .iter()
            .filter_map(|(name, units)| {
                self.registry
                    .get(name)
                    .map(|p| p.price_table().ledger_cost(*units))
            })
            .sum();

        UsageStats {
            daily_usage,
            estimated_daily_cost_usd,
            available_providers: self.registry.names(),
            config: RoutingSummary {
                cost_optimization_enabled: self.config.enable_cost_optimization,
                max_units_per_day: self.config.max_units_per_day,
                fallback_enabled: self.config.fallback_to_local,
                cost_threshold_usd: self.config.cost_threshold_usd,
            },
        }
    }

    /// Zero the ledger. Safe to call at any time.
    pub fn reset_daily_usage(&self) {
        self.ledger.reset();
    }
}
