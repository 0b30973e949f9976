//! GenAI semantic convention span helpers for model calls.
//!
//! Uses OpenTelemetry GenAI semantic conventions:
//! - `gen_ai.operation.name`
//! - `gen_ai.request.model`
//! - `gen_ai.provider.name`
//!
//! `triage.purpose` says which capability made the call.

use tracing::Span;

/// Start a span for a chat/completion call.
pub fn start_chat_span(model: &str, provider: &str, purpose: &str) -> Span {
    tracing::info_span!(
        "gen_ai.chat",
        "gen_ai.operation.name" = "chat",
        "gen_ai.request.model" = model,
        "gen_ai.provider.name" = provider,
        "triage.purpose" = purpose,
    )
}
