//! Provider selection logic.
//!
//! [`select_provider`] is evaluated fresh for every request and reads the
//! ledger without mutating anything, so identical inputs always produce the
//! same decision.

use std::sync::Arc;

use super::ledger::UsageLedger;
use crate::config::RoutingConfig;
use crate::error::{Error, Result};
use crate::provider::{Provider, ProviderRegistry, TaskType};

/// Which rule of the policy produced a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Audio task sent to the audio-capable provider.
    Transcription,
    /// The primary text provider.
    Primary,
    /// Rule-based speaker extraction standing in for the primary provider.
    SpeakerFallback,
    /// Last-resort provider allowed by `fallback_to_local`.
    LocalFallback,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Transcription => "transcription",
            Route::Primary => "primary",
            Route::SpeakerFallback => "speaker_fallback",
            Route::LocalFallback => "local_fallback",
        }
    }
}

/// A provider chosen for one request.
#[derive(Debug, Clone)]
pub struct Selection {
    pub provider: Arc<dyn Provider>,
    pub route: Route,
}

impl Selection {
    fn new(provider: &Arc<dyn Provider>, route: Route) -> Self {
        Self {
            provider: provider.clone(),
            route,
        }
    }
}

/// Why the primary provider was not used.
#[derive(Debug)]
enum Exclusion {
    Absent,
    OverCap { used: u64, cap: u64 },
    OverThreshold { estimate: f64, threshold: f64 },
}

impl std::fmt::Display for Exclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Exclusion::Absent => write!(f, "no primary text provider registered"),
            Exclusion::OverCap { used, cap } => {
                write!(f, "primary provider at daily cap ({}/{} units)", used, cap)
            }
            Exclusion::OverThreshold {
                estimate,
                threshold,
            } => write!(
                f,
                "estimated cost ${:.6} exceeds threshold ${:.6}",
                estimate, threshold
            ),
        }
    }
}

/// Select the provider for `task`.
///
/// - Transcription always goes to the audio-capable provider.
/// - Text tasks prefer the primary text provider. With cost optimization on,
///   it is skipped once its ledger counter reaches the daily cap or when its
///   cost estimate for `input` exceeds the threshold.
/// - Otherwise speaker analysis uses the transcriber's rule-based extraction,
///   and any other task may use the first capable non-primary provider when
///   `fallback_to_local` is set.
///
/// The cap check reads the ledger before the call is made, so concurrent
/// requests that both observe `used < cap` may push the counter past the cap
/// by up to one in-flight request's units.
pub fn select_provider(
    task: TaskType,
    input: &str,
    registry: &ProviderRegistry,
    usage: &UsageLedger,
    config: &RoutingConfig,
) -> Result<Selection> {
    if task == TaskType::Transcribe {
        return registry
            .transcriber()
            .map(|p| Selection::new(p, Route::Transcription))
            .ok_or_else(|| Error::NoProviderAvailable {
                task,
                reason: "no audio-capable provider registered".to_string(),
            });
    }

    let primary = registry.primary_text();
    let exclusion = match primary {
        None => Exclusion::Absent,
        Some(provider) => match primary_exclusion(provider.as_ref(), task, input, usage, config) {
            None => return Ok(Selection::new(provider, Route::Primary)),
            Some(exclusion) => exclusion,
        },
    };

    tracing::debug!(task = %task, reason = %exclusion, "Primary provider excluded");

    let primary_name = primary.map(|p| p.name());

    if task == TaskType::AnalyzeSpeakers {
        if let Some(transcriber) = registry.transcriber().filter(|p| {
            Some(p.name()) != primary_name && p.capabilities().contains(TaskType::AnalyzeSpeakers)
        }) {
            return Ok(Selection::new(transcriber, Route::SpeakerFallback));
        }
    }

    if config.fallback_to_local {
        if let Some(fallback) = registry.fallback_for(task, primary_name) {
            return Ok(Selection::new(fallback, Route::LocalFallback));
        }
    }

    let reason = if config.fallback_to_local {
        format!("{}; no fallback provider supports {}", exclusion, task)
    } else {
        format!("{}; local fallback disabled", exclusion)
    };
    Err(Error::NoProviderAvailable { task, reason })
}

/// Decide whether the primary provider must be skipped for this request.
fn primary_exclusion(
    provider: &dyn Provider,
    task: TaskType,
    input: &str,
    usage: &UsageLedger,
    config: &RoutingConfig,
) -> Option<Exclusion> {
    if !config.enable_cost_optimization {
        return None;
    }

    let used = usage.units(provider.name());
    if used >= config.max_units_per_day {
        return Some(Exclusion::OverCap {
            used,
            cap: config.max_units_per_day,
        });
    }

    let estimate = provider.estimate_cost(input, task);
    if estimate > config.cost_threshold_usd {
        return Some(Exclusion::OverThreshold {
            estimate,
            threshold: config.cost_threshold_usd,
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiKey;
    use crate::provider::{GeminiProvider, WhisperProvider};

    fn cloud() -> Arc<dyn Provider> {
        Arc::new(GeminiProvider::new(
            reqwest::Client::new(),
            "cloud",
            "gemini-1.5-flash",
            "https://example.test",
            ApiKey::from("k"),
        ))
    }

    fn local() -> Arc<dyn Provider> {
        Arc::new(WhisperProvider::new(
            reqwest::Client::new(),
            "local",
            "http://127.0.0.1:9090",
        ))
    }

    fn both() -> ProviderRegistry {
        ProviderRegistry::new(vec![cloud(), local()])
    }

    fn ledger(registry: &ProviderRegistry) -> UsageLedger {
        UsageLedger::new(&registry.names())
    }

    #[test]
    fn test_transcribe_ignores_cost_optimization() {
        let registry = both();
        let usage = ledger(&registry);
        for enabled in [true, false] {
            let config = RoutingConfig {
                enable_cost_optimization: enabled,
                ..Default::default()
            };
            let selection =
                select_provider(TaskType::Transcribe, "", &registry, &usage, &config).unwrap();
            assert_eq!(selection.provider.name(), "local");
            assert_eq!(selection.route, Route::Transcription);
        }
    }

    #[test]
    fn test_transcribe_without_audio_provider() {
        let registry = ProviderRegistry::new(vec![cloud()]);
        let usage = ledger(&registry);
        let err = select_provider(
            TaskType::Transcribe,
            "",
            &registry,
            &usage,
            &RoutingConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::NoProviderAvailable { .. }));
    }

    #[test]
    fn test_primary_preferred_for_text() {
        let registry = both();
        let usage = ledger(&registry);
        for task in [TaskType::Generate, TaskType::Summarize, TaskType::AnalyzeSpeakers] {
            let selection =
                select_provider(task, "short text", &registry, &usage, &RoutingConfig::default())
                    .unwrap();
            assert_eq!(selection.provider.name(), "cloud");
            assert_eq!(selection.route, Route::Primary);
        }
    }

    #[test]
    fn test_cap_excludes_primary() {
        let registry = both();
        let usage = ledger(&registry);
        usage.record("cloud", 100);
        let config = RoutingConfig {
            max_units_per_day: 100,
            ..Default::default()
        };

        let selection =
            select_provider(TaskType::Summarize, "text", &registry, &usage, &config).unwrap();
        assert_eq!(selection.provider.name(), "local");
        assert_eq!(selection.route, Route::LocalFallback);
    }

    #[test]
    fn test_cap_ignored_without_cost_optimization() {
        let registry = both();
        let usage = ledger(&registry);
        usage.record("cloud", 1_000_000);
        let config = RoutingConfig {
            enable_cost_optimization: false,
            max_units_per_day: 100,
            cost_threshold_usd: 0.0,
            ..Default::default()
        };

        let selection =
            select_provider(TaskType::Generate, "text", &registry, &usage, &config).unwrap();
        assert_eq!(selection.provider.name(), "cloud");
    }

    #[test]
    fn test_threshold_sends_speakers_to_rule_based_fallback() {
        let registry = both();
        let usage = ledger(&registry);
        let config = RoutingConfig {
            cost_threshold_usd: 0.000001,
            fallback_to_local: false,
            ..Default::default()
        };
        let transcript = "Alice: hello there\n".repeat(100);

        let selection =
            select_provider(TaskType::AnalyzeSpeakers, &transcript, &registry, &usage, &config)
                .unwrap();
        assert_eq!(selection.provider.name(), "local");
        assert_eq!(selection.route, Route::SpeakerFallback);
    }

    #[test]
    fn test_generate_has_no_local_fallback() {
        let registry = both();
        let usage = ledger(&registry);
        usage.record("cloud", 10_000);

        let err = select_provider(
            TaskType::Generate,
            "text",
            &registry,
            &usage,
            &RoutingConfig::default(),
        )
        .unwrap_err();
        match err {
            Error::NoProviderAvailable { task, reason } => {
                assert_eq!(task, TaskType::Generate);
                assert!(reason.contains("daily cap"), "{}", reason);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_fallback_disabled_without_primary() {
        let registry = ProviderRegistry::new(vec![local()]);
        let usage = ledger(&registry);
        let config = RoutingConfig {
            fallback_to_local: false,
            ..Default::default()
        };

        let err = select_provider(TaskType::Summarize, "short text", &registry, &usage, &config)
            .unwrap_err();
        assert!(err.to_string().contains("local fallback disabled"));
    }

    #[test]
    fn test_empty_registry() {
        let registry = ProviderRegistry::default();
        let usage = ledger(&registry);
        for task in TaskType::ALL {
            let result = select_provider(task, "x", &registry, &usage, &RoutingConfig::default());
            assert!(matches!(result, Err(Error::NoProviderAvailable { .. })));
        }
    }

    #[test]
    fn test_selection_is_deterministic() {
        let registry = both();
        let usage = ledger(&registry);
        usage.record("cloud", 9_999);
        let config = RoutingConfig::default();
        let text = "some meeting notes ".repeat(50);

        let first = select_provider(TaskType::Summarize, &text, &registry, &usage, &config).unwrap();
        for _ in 0..10 {
            let again =
                select_provider(TaskType::Summarize, &text, &registry, &usage, &config).unwrap();
            assert!(Arc::ptr_eq(&first.provider, &again.provider));
            assert_eq!(first.route, again.route);
        }
        assert_eq!(usage.units("cloud"), 9_999);
    }
}
