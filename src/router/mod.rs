//! Router module for provider selection and usage accounting.
//!
//! This module handles:
//! - Selecting a provider by task type, budget and configuration
//! - Invoking it under a per-call timeout
//! - Recording successful usage in the daily ledger

mod dispatch;
pub mod ledger;
mod selector;

pub use dispatch::{Router, RoutingSummary, TaskRequest, UsageStats, DEFAULT_TEMPERATURE};
pub use ledger::{spawn_daily_reset, UsageLedger};
pub use selector::{select_provider, Route, Selection};
