//! Per-provider usage ledger for the current accounting day.
//!
//! Backed by [`DashMap`] so increments on one provider never contend with
//! another. The ledger is in-memory only; a restart starts a fresh day.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct UsageLedger {
    counters: DashMap<String, u64>,
}

impl UsageLedger {
    /// Create a ledger with a zeroed counter for each provider name.
    pub fn new(provider_names: &[String]) -> Self {
        let counters = DashMap::with_capacity(provider_names.len());
        for name in provider_names {
            counters.insert(name.clone(), 0);
        }
        Self { counters }
    }

    /// Atomically add `units` to `provider`'s counter, returning the new total.
    pub fn record(&self, provider: &str, units: u64) -> u64 {
        let mut entry = self.counters.entry(provider.to_string()).or_insert(0);
        *entry = entry.saturating_add(units);
        *entry
    }

    /// Units consumed today by `provider` (zero if never recorded).
    pub fn units(&self, provider: &str) -> u64 {
        self.counters.get(provider).map(|v| *v).unwrap_or(0)
    }

    /// Point-in-time copy of all counters, sorted by provider name.
    ///
    /// Shards are read one at a time, so a snapshot taken during concurrent
    /// writes may mix slightly older and newer values.
    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.counters
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    /// Zero every counter, keeping the provider keys.
    pub fn reset(&self) {
        for mut entry in self.counters.iter_mut() {
            *entry.value_mut() = 0;
        }
        tracing::info!("Daily usage counters reset");
    }
}

/// Time remaining until the next UTC midnight after `now`.
pub fn until_next_utc_midnight(now: DateTime<Utc>) -> Duration {
    let next_midnight = (now.date_naive() + chrono::Days::new(1))
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc());

    next_midnight
        .and_then(|midnight| (midnight - now).to_std().ok())
        .unwrap_or(Duration::from_secs(24 * 60 * 60))
}

/// Spawn a task that resets the ledger at every UTC midnight.
pub fn spawn_daily_reset(ledger: Arc<UsageLedger>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let wait = until_next_utc_midnight(Utc::now());
            tracing::debug!(seconds = wait.as_secs(), "Next scheduled usage reset");
            tokio::time::sleep(wait).await;
            ledger.reset();
        }
    })
}
