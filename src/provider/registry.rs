//! Provider registry built once at startup.
//!
//! Providers whose preconditions fail (missing credentials, bad endpoint) are
//! left out of the registry entirely and reported as [`Registration::Unavailable`].

use std::sync::Arc;

use reqwest::Client;

use super::{CapabilitySet, GeminiProvider, Provider, TaskType, WhisperProvider};
use crate::config::{self, ConfigError, KeySource, ProvidersConfig};

/// Outcome of registering one configured provider slot.
#[derive(Debug)]
pub enum Registration {
    Registered {
        name: String,
        capabilities: CapabilitySet,
        /// Where the credential came from, for providers that need one.
        key_source: Option<KeySource>,
    },
    Disabled {
        name: String,
    },
    Unavailable {
        name: String,
        error: ConfigError,
    },
}

impl Registration {
    pub fn name(&self) -> &str {
        match self {
            Registration::Registered { name, .. }
            | Registration::Disabled { name }
            | Registration::Unavailable { name, .. } => name,
        }
    }

    pub fn is_registered(&self) -> bool {
        matches!(self, Registration::Registered { .. })
    }
}

/// Name-addressable set of providers, in registration order.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// Build a registry from ready providers. Later duplicates of a name are dropped.
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        let mut registry = Self::default();
        for provider in providers {
            registry.insert(provider);
        }
        registry
    }

    fn insert(&mut self, provider: Arc<dyn Provider>) -> bool {
        if self.get(provider.name()).is_some() {
            tracing::warn!(provider = %provider.name(), "Duplicate provider name ignored");
            return false;
        }
        self.providers.push(provider);
        true
    }

    /// Build the registry from configuration, reading the process environment.
    pub fn from_config(config: &ProvidersConfig, client: &Client) -> (Self, Vec<Registration>) {
        Self::from_config_with(config, client, |name| std::env::var(name).ok())
    }

    /// Build the registry from configuration using a custom env lookup.
    pub fn from_config_with<F>(
        config: &ProvidersConfig,
        client: &Client,
        lookup: F,
    ) -> (Self, Vec<Registration>)
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut registry = Self::default();
        let mut registrations = Vec::with_capacity(2);

        let cloud = &config.cloud;
        let outcome = if !cloud.enabled {
            Registration::Disabled {
                name: cloud.name.clone(),
            }
        } else {
            match config::resolve_api_key_with(&cloud.name, cloud.api_key.as_ref(), &lookup) {
                Ok((api_key, source)) => {
                    let provider = GeminiProvider::new(
                        client.clone(),
                        cloud.name.clone(),
                        cloud.model.clone(),
                        cloud.base_url.clone(),
                        api_key,
                    );
                    registry.register(Arc::new(provider), Some(source))
                }
                Err(error) => Registration::Unavailable {
                    name: cloud.name.clone(),
                    error,
                },
            }
        };
        registrations.push(outcome);

        let local = &config.local;
        let outcome = if !local.enabled {
            Registration::Disabled {
                name: local.name.clone(),
            }
        } else {
            let url = config::resolve_local_url_with(local.url.as_deref(), &lookup);
            match reqwest::Url::parse(&url) {
                Ok(_) => {
                    let provider = WhisperProvider::new(client.clone(), local.name.clone(), url);
                    registry.register(Arc::new(provider), None)
                }
                Err(e) => Registration::Unavailable {
                    name: local.name.clone(),
                    error: ConfigError::InvalidEndpoint {
                        provider: local.name.clone(),
                        url,
                        message: e.to_string(),
                    },
                },
            }
        };
        registrations.push(outcome);

        for registration in &registrations {
            match registration {
                Registration::Registered {
                    name,
                    capabilities,
                    key_source,
                } => tracing::info!(
                    provider = %name,
                    capabilities = ?capabilities,
                    key_source = ?key_source,
                    "Provider registered"
                ),
                Registration::Disabled { name } => {
                    tracing::info!(provider = %name, "Provider disabled in config")
                }
                Registration::Unavailable { name, error } => {
                    tracing::warn!(provider = %name, error = %error, "Provider unavailable")
                }
            }
        }

        (registry, registrations)
    }

    fn register(&mut self, provider: Arc<dyn Provider>, key_source: Option<KeySource>) -> Registration {
        let name = provider.name().to_string();
        let capabilities = provider.capabilities();
        if self.insert(provider) {
            Registration::Registered {
                name,
                capabilities,
                key_source,
            }
        } else {
            Registration::Unavailable {
                error: ConfigError::Validation(format!("Provider name '{}' already registered", name)),
                name,
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Provider>> {
        self.providers.iter().find(|p| p.name() == name)
    }

    /// The primary text provider: the first one able to generate free-form text.
    pub fn primary_text(&self) -> Option<&Arc<dyn Provider>> {
        self.first_capable(TaskType::Generate, None)
    }

    /// The first audio-capable provider.
    pub fn transcriber(&self) -> Option<&Arc<dyn Provider>> {
        self.first_capable(TaskType::Transcribe, None)
    }

    /// The first provider other than `excluding` that implements `task`.
    pub fn fallback_for(&self, task: TaskType, excluding: Option<&str>) -> Option<&Arc<dyn Provider>> {
        self.first_capable(task, excluding)
    }

    fn first_capable(&self, task: TaskType, excluding: Option<&str>) -> Option<&Arc<dyn Provider>> {
        self.providers
            .iter()
            .filter(|p| Some(p.name()) != excluding)
            .find(|p| p.capabilities().contains(task))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Provider>> {
        self.providers.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
