//! Shared fixtures for integration tests.
//!
//! `MockProvider` stands in for both the cloud and the local backend so the
//! routing policy and ledger can be exercised without any network.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Barrier;

use ai_adapter::config::RoutingConfig;
use ai_adapter::provider::{
    AiResponse, CapabilitySet, PriceTable, Provider, ProviderError, ProviderRegistry, TaskType,
    TokenUsage,
};
use ai_adapter::Router;

pub const CLOUD_CAPABILITIES: CapabilitySet = CapabilitySet::of(&[
    TaskType::Generate,
    TaskType::Summarize,
    TaskType::AnalyzeSpeakers,
]);

pub const LOCAL_CAPABILITIES: CapabilitySet = CapabilitySet::of(&[
    TaskType::Summarize,
    TaskType::AnalyzeSpeakers,
    TaskType::Transcribe,
]);

/// Configurable in-memory provider.
#[derive(Debug)]
pub struct MockProvider {
    name: String,
    capabilities: CapabilitySet,
    estimate_usd: f64,
    input_units: u64,
    output_units: u64,
    fail: bool,
    delay: Option<Duration>,
    barrier: Option<Arc<Barrier>>,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(name: &str, capabilities: CapabilitySet) -> Self {
        Self {
            name: name.to_string(),
            capabilities,
            estimate_usd: 0.0001,
            input_units: 100,
            output_units: 50,
            fail: false,
            delay: None,
            barrier: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Text provider named "cloud".
    pub fn cloud() -> Self {
        Self::new("cloud", CLOUD_CAPABILITIES)
    }

    /// Audio-capable provider named "local".
    pub fn local() -> Self {
        Self::new("local", LOCAL_CAPABILITIES)
    }

    pub fn with_estimate(mut self, estimate_usd: f64) -> Self {
        self.estimate_usd = estimate_usd;
        self
    }

    pub fn with_units(mut self, input_units: u64, output_units: u64) -> Self {
        self.input_units = input_units;
        self.output_units = output_units;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Hold every call until `barrier` releases, keeping requests in flight together.
    pub fn with_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn respond(&self, task: TaskType) -> Result<AiResponse, ProviderError> {
        if !self.capabilities.contains(task) {
            return Err(ProviderError::Unsupported(task));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(ProviderError::Status {
                status: 500,
                body: "mock failure".to_string(),
            });
        }

        Ok(AiResponse {
            content: format!("{} by {}", task, self.name),
            usage: TokenUsage::new(self.input_units, self.output_units, 0.000135),
            model: "mock-model".to_string(),
            provider: self.name.clone(),
        })
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    fn price_table(&self) -> PriceTable {
        PriceTable {
            input_per_million: 1.0,
            output_per_million: 2.0,
        }
    }

    fn estimate_cost(&self, _input: &str, _task: TaskType) -> f64 {
        self.estimate_usd
    }

    async fn generate(
        &self,
        _prompt: &str,
        _max_output_units: Option<u32>,
        _temperature: f32,
    ) -> Result<AiResponse, ProviderError> {
        self.respond(TaskType::Generate).await
    }

    async fn summarize(
        &self,
        _text: &str,
        _max_length: Option<u32>,
    ) -> Result<AiResponse, ProviderError> {
        self.respond(TaskType::Summarize).await
    }

    async fn analyze_speakers(&self, _transcript: &str) -> Result<AiResponse, ProviderError> {
        self.respond(TaskType::AnalyzeSpeakers).await
    }

    async fn transcribe_audio(&self, _audio: &[u8]) -> Result<AiResponse, ProviderError> {
        self.respond(TaskType::Transcribe).await
    }
}

/// Build a router over the given providers, in registration order.
pub fn router_with(providers: Vec<Arc<MockProvider>>, config: RoutingConfig) -> Router {
    let providers = providers
        .into_iter()
        .map(|p| p as Arc<dyn Provider>)
        .collect();
    Router::new(ProviderRegistry::new(providers), config)
}
