//! Batch coordinator: drives one operation over an ordered list of items.
//!
//! Items run strictly one after another. Each item is its own failure
//! boundary: an error (or panic) in the operation becomes that item's failed
//! result and the batch moves on. Events go to a [`ProgressSink`] as they
//! happen; if the sink's consumer disconnects, no further items are started.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::FutureExt as _;
use opentelemetry::KeyValue;
use tracing::{Instrument, debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{BatchOperationResult, BatchRequest, ItemId, PerItemResult, ProgressEvent};
use crate::progress::{CollectingSink, ProgressSink};
use crate::telemetry::batch::{record_batch_outcome, start_batch_span};
use crate::telemetry::metrics;

/// The per-item work a batch performs.
#[async_trait]
pub trait ItemOperation: Send + Sync {
    /// Short name for logs and metrics (e.g. "classify").
    fn name(&self) -> &str;

    /// Process one item. The returned value becomes the item's `data`.
    async fn apply(&self, id: &ItemId, context: Option<&str>) -> Result<serde_json::Value>;
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Lifecycle of one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPhase {
    Idle,
    /// Items attempted so far.
    Processing(usize),
    Done,
    Cancelled,
}

impl BatchPhase {
    /// Can transition from self to `to` in a batch of `total` items?
    pub fn can_transition_to(self, to: BatchPhase, total: usize) -> bool {
        use BatchPhase::*;
        match (self, to) {
            (Idle, Processing(0)) => true,
            (Processing(done), Processing(next)) => next == done + 1 && next <= total,
            (Processing(done), Done) => done == total,
            (Processing(_), Cancelled) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BatchPhase::Done | BatchPhase::Cancelled)
    }
}

/// Outcome of a coordinator run.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// Every item was attempted and the final event was produced.
    Completed(BatchOperationResult),
    /// The consumer went away; only the attempted items are present.
    Cancelled(BatchOperationResult),
}

impl BatchOutcome {
    pub fn result(&self) -> &BatchOperationResult {
        match self {
            BatchOutcome::Completed(r) | BatchOutcome::Cancelled(r) => r,
        }
    }

    pub fn into_result(self) -> BatchOperationResult {
        match self {
            BatchOutcome::Completed(r) | BatchOutcome::Cancelled(r) => r,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, BatchOutcome::Cancelled(_))
    }
}

// ---------------------------------------------------------------------------
// Run state
// ---------------------------------------------------------------------------

/// Owns the phase and the accumulated results. Every event the coordinator
/// emits is produced by a transition here.
struct BatchRun {
    phase: BatchPhase,
    total: usize,
    results: Vec<PerItemResult>,
}

impl BatchRun {
    fn new(total: usize) -> Self {
        Self {
            phase: BatchPhase::Idle,
            total,
            results: Vec::with_capacity(total),
        }
    }

    fn transition(&mut self, to: BatchPhase) -> Result<()> {
        if !self.phase.can_transition_to(to, self.total) {
            return Err(Error::Other(format!(
                "invalid batch transition: {:?} -> {to:?}",
                self.phase
            )));
        }
        self.phase = to;
        Ok(())
    }

    fn start(&mut self) -> Result<ProgressEvent> {
        self.transition(BatchPhase::Processing(0))?;
        Ok(ProgressEvent::started(self.total))
    }

    fn all_attempted(&self) -> bool {
        self.results.len() == self.total
    }

    fn begin_item(&self, id: &ItemId) -> ProgressEvent {
        ProgressEvent::processing(self.results.len() + 1, self.total, id)
    }

    fn finish_item(&mut self, id: &ItemId, outcome: Result<serde_json::Value>) -> Result<ProgressEvent> {
        let current = self.results.len() + 1;
        self.transition(BatchPhase::Processing(current))?;
        let event = match outcome {
            Ok(data) => {
                self.results.push(PerItemResult::ok(id.clone(), data.clone()));
                ProgressEvent::item_completed(current, self.total, id, data)
            }
            Err(e) => {
                let message = e.to_string();
                self.results.push(PerItemResult::failed(id.clone(), message.clone()));
                ProgressEvent::item_failed(current, self.total, id, message)
            }
        };
        Ok(event)
    }

    fn finish(&mut self) -> Result<(ProgressEvent, BatchOperationResult)> {
        self.transition(BatchPhase::Done)?;
        let result = BatchOperationResult::from_results(std::mem::take(&mut self.results));
        let data = serde_json::to_value(&result).unwrap_or_default();
        let event = ProgressEvent::finished(result.total, result.successful, result.failed, data);
        Ok((event, result))
    }

    fn cancel(&mut self) -> Result<BatchOperationResult> {
        self.transition(BatchPhase::Cancelled)?;
        Ok(BatchOperationResult::from_results(std::mem::take(
            &mut self.results,
        )))
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Runs an [`ItemOperation`] over a batch. Cheap to clone; distinct runs may
/// execute concurrently.
#[derive(Clone)]
pub struct BatchCoordinator {
    operation: Arc<dyn ItemOperation>,
}

impl BatchCoordinator {
    pub fn new(operation: Arc<dyn ItemOperation>) -> Self {
        Self { operation }
    }

    pub fn operation_name(&self) -> &str {
        self.operation.name()
    }

    /// Run without streaming and return the aggregate.
    pub async fn run_collected(&self, request: &BatchRequest) -> Result<BatchOperationResult> {
        let mut sink = CollectingSink::new();
        match self.run(request, &mut sink).await? {
            BatchOutcome::Completed(result) => Ok(result),
            BatchOutcome::Cancelled(_) => Err(Error::Cancelled),
        }
    }

    /// Run the batch, pushing every event into `sink`.
    ///
    /// # Errors
    ///
    /// Only `Validation` for an empty or blank-ID request. Item failures are
    /// reported inside the result.
    pub async fn run(&self, request: &BatchRequest, sink: &mut dyn ProgressSink) -> Result<BatchOutcome> {
        request.validate()?;

        let batch_id = Uuid::new_v4();
        let total = request.item_ids.len();
        let span = start_batch_span(self.operation.name(), &batch_id, total);

        let outcome = self
            .drive(request, sink)
            .instrument(span.clone())
            .await?;

        match &outcome {
            BatchOutcome::Completed(result) => {
                record_batch_outcome(&span, "completed");
                span.in_scope(|| {
                    info!(
                        total = result.total,
                        successful = result.successful,
                        failed = result.failed,
                        "batch completed"
                    );
                });
            }
            BatchOutcome::Cancelled(partial) => {
                record_batch_outcome(&span, "cancelled");
                metrics::batch_cancelled()
                    .add(1, &[KeyValue::new("operation", self.operation.name().to_string())]);
                span.in_scope(|| {
                    warn!(attempted = partial.total, total, "batch cancelled by consumer");
                });
            }
        }
        Ok(outcome)
    }

    async fn drive(&self, request: &BatchRequest, sink: &mut dyn ProgressSink) -> Result<BatchOutcome> {
        let context = request.shared_context();
        let mut run = BatchRun::new(request.item_ids.len());

        if sink.emit(run.start()?).await.is_err() {
            return Ok(BatchOutcome::Cancelled(run.cancel()?));
        }

        for id in &request.item_ids {
            if sink.is_closed() || sink.emit(run.begin_item(id)).await.is_err() {
                return Ok(BatchOutcome::Cancelled(run.cancel()?));
            }

            let outcome = self.apply_isolated(id, context).await;
            let event = run.finish_item(id, outcome)?;
            if sink.emit(event).await.is_err() && !run.all_attempted() {
                return Ok(BatchOutcome::Cancelled(run.cancel()?));
            }
        }

        let (event, result) = run.finish()?;
        if sink.emit(event).await.is_err() {
            debug!("consumer left before the final event; all items were attempted");
        }
        Ok(BatchOutcome::Completed(result))
    }

    /// Apply the operation to one item, turning a panic into an item error.
    async fn apply_isolated(&self, id: &ItemId, context: Option<&str>) -> Result<serde_json::Value> {
        let name = self.operation.name().to_string();
        let start = Instant::now();

        let outcome = AssertUnwindSafe(self.operation.apply(id, context))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(Error::Other(format!("{name} panicked on item {id}"))));

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        metrics::operation_duration_ms().record(elapsed_ms, &[KeyValue::new("operation", name.clone())]);
        metrics::batch_items().add(
            1,
            &[
                KeyValue::new("operation", name),
                KeyValue::new("result", if outcome.is_ok() { "ok" } else { "error" }),
            ],
        );

        if let Err(ref e) = outcome {
            warn!(item_id = %id, error = %e, "item failed");
        } else {
            debug!(item_id = %id, elapsed_ms, "item completed");
        }
        outcome
    }
}
