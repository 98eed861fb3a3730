//! HTTP API module.
//!
//! Exposes the router's task operations, usage statistics and the daily
//! reset over HTTP.

pub mod handlers;
mod server;
pub mod types;

pub use server::{build_state, create_router, run_server, AppState, RequestId, REQUEST_ID_HEADER};
pub use types::{AnalyzeSpeakersRequest, GenerateRequest, SummarizeRequest, TaskResponse};
