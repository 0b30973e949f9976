//! Duplicate grouping over a set of same-category items.

use async_trait::async_trait;
use opentelemetry::KeyValue;
use rig::agent::Agent;
use rig::client::CompletionClient;
use rig::completion::{CompletionModel, Prompt};
use tracing::{Instrument, debug};

use super::PROVIDER;
use crate::error::{Error, Result};
use crate::telemetry::{genai, metrics};

/// A fully built grouping prompt for one category.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupingRequest {
    pub category: String,
    pub prompt: String,
}

/// Asks the model which items are duplicates. Returns the raw reply; the
/// caller owns parsing and validation.
#[async_trait]
pub trait GroupingService: Send + Sync {
    async fn find_duplicate_groups(&self, request: &GroupingRequest) -> Result<String>;
}

const PREAMBLE: &str = "You find duplicate tasks in a personal task list. You answer with JSON only.";

/// Grouping service backed by a rig-core agent.
pub struct LlmGroupingService<M: CompletionModel> {
    agent: Agent<M>,
    model: String,
}

impl<M: CompletionModel + 'static> LlmGroupingService<M> {
    pub fn new<C>(client: &C, model: &str) -> Self
    where
        C: CompletionClient<CompletionModel = M>,
    {
        let agent = client
            .agent(model)
            .preamble(PREAMBLE)
            .temperature(0.0)
            .max_tokens(2048)
            .build();
        Self {
            agent,
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl<M: CompletionModel + 'static> GroupingService for LlmGroupingService<M> {
    async fn find_duplicate_groups(&self, request: &GroupingRequest) -> Result<String> {
        let span = genai::start_chat_span(&self.model, PROVIDER, "find_duplicates");
        let result = async {
            let raw = self
                .agent
                .prompt(request.prompt.as_str())
                .await
                .map_err(|e| Error::GroupingService(e.to_string()))?;
            debug!(category = %request.category, chars = raw.len(), "grouping model replied");
            Ok(raw)
        }
        .instrument(span)
        .await;

        metrics::llm_calls().add(
            1,
            &[
                KeyValue::new("purpose", "find_duplicates"),
                KeyValue::new("result", if result.is_ok() { "ok" } else { "error" }),
            ],
        );
        result
    }
}
