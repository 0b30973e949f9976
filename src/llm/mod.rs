//! AI capabilities: classification and duplicate grouping.
//!
//! The engine depends only on the [`Classifier`] and [`GroupingService`]
//! traits. The `Llm*` implementations drive rig-core agents; the helper
//! below creates the Anthropic [`Client`] they are built from.
//!
//! # Example
//! ```no_run
//! use triage_rs::llm::{anthropic_client, LlmClassifier};
//! use triage_rs::taxonomy::Taxonomy;
//! use secrecy::SecretString;
//!
//! let key = SecretString::from("sk-ant-...");
//! let client = anthropic_client(&key).expect("failed to create Anthropic client");
//! let classifier = LlmClassifier::new(&client, "claude-sonnet-4-20250514", Taxonomy::default());
//! ```
//!
//! [`Client`]: rig::providers::anthropic::Client

pub mod classifier;
pub mod grouping;
pub mod response;

pub use classifier::{Classifier, LlmClassifier};
pub use grouping::{GroupingRequest, GroupingService, LlmGroupingService};

use secrecy::{ExposeSecret, SecretString};

/// Provider name reported on `gen_ai.*` spans.
pub const PROVIDER: &str = "anthropic";

/// Create an Anthropic client from a secret API key.
///
/// # Errors
/// Returns an error if the underlying HTTP client cannot be constructed.
pub fn anthropic_client(
    api_key: &SecretString,
) -> Result<rig::providers::anthropic::Client, rig::http_client::Error> {
    rig::providers::anthropic::Client::new(api_key.expose_secret())
}
