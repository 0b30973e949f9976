//! Per-item classification.

use async_trait::async_trait;
use opentelemetry::KeyValue;
use rig::agent::Agent;
use rig::client::CompletionClient;
use rig::completion::{CompletionModel, Prompt};
use tracing::{Instrument, debug};

use super::{PROVIDER, response};
use crate::error::{Error, Result};
use crate::model::Classification;
use crate::taxonomy::Taxonomy;
use crate::telemetry::{genai, metrics};

/// Classifies one item's content. Timeouts and retries are the
/// implementation's business; any failure is reported as `Error::Classifier`.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, content: &str, context: Option<&str>) -> Result<Classification>;
}

const PREAMBLE: &str = "You triage a user's inbox. Classify the email you are given into exactly one \
of the categories listed below. Reply with a single JSON object and nothing else:\n\
{\"category\": string, \"confidence\": number between 0 and 1, \
\"summary\": one-line summary of what the email asks or says, \"reasoning\": short string}";

/// Classifier backed by a rig-core agent.
pub struct LlmClassifier<M: CompletionModel> {
    agent: Agent<M>,
    model: String,
    taxonomy: Taxonomy,
}

impl<M: CompletionModel + 'static> LlmClassifier<M> {
    pub fn new<C>(client: &C, model: &str, taxonomy: Taxonomy) -> Self
    where
        C: CompletionClient<CompletionModel = M>,
    {
        let preamble = format!("{PREAMBLE}\n\nCategories:\n{}", taxonomy.prompt_lines());
        let agent = client
            .agent(model)
            .preamble(&preamble)
            .temperature(0.0)
            .max_tokens(512)
            .build();
        Self {
            agent,
            model: model.to_string(),
            taxonomy,
        }
    }

    fn interpret(&self, raw: &str) -> Result<Classification> {
        let mut classification: Classification = response::parse_json(raw)
            .map_err(|e| Error::Classifier(e.to_string()))?;

        let category = self
            .taxonomy
            .resolve(&classification.category)
            .ok_or_else(|| {
                Error::Classifier(format!(
                    "model returned unknown category {:?}",
                    classification.category
                ))
            })?;
        classification.category = category.to_string();
        classification.confidence = classification.confidence.map(|c| c.clamp(0.0, 1.0));
        Ok(classification)
    }
}

#[async_trait]
impl<M: CompletionModel + 'static> Classifier for LlmClassifier<M> {
    async fn classify(&self, content: &str, context: Option<&str>) -> Result<Classification> {
        let prompt = match context {
            Some(ctx) => format!("User context: {ctx}\n\nEmail:\n{content}"),
            None => format!("Email:\n{content}"),
        };

        let span = genai::start_chat_span(&self.model, PROVIDER, "classify");
        let result = async {
            let raw = self
                .agent
                .prompt(prompt.as_str())
                .await
                .map_err(|e| Error::Classifier(e.to_string()))?;
            debug!(chars = raw.len(), "classifier replied");
            self.interpret(&raw)
        }
        .instrument(span)
        .await;

        metrics::llm_calls().add(
            1,
            &[
                KeyValue::new("purpose", "classify"),
                KeyValue::new("result", if result.is_ok() { "ok" } else { "error" }),
            ],
        );
        result
    }
}
