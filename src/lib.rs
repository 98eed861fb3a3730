//! ai-adapter - cost-aware routing between AI providers
//!
//! This library coordinates a metered cloud text model and a local
//! speech-to-text engine behind one interface: provider selection by task
//! and budget, per-provider daily usage accounting, and an HTTP surface.

pub mod api;
pub mod config;
pub mod error;
pub mod provider;
pub mod router;

pub use config::Config;
pub use error::{Error, Result};
pub use provider::{AiResponse, Provider, TaskType, TokenUsage};
pub use router::Router;
