//! Progress delivery for batch runs.
//!
//! The coordinator hands each event to a [`ProgressSink`] as soon as it is
//! produced. [`CollectingSink`] keeps them for a non-streaming response;
//! [`ChannelSink`] pushes them live to a transport.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::model::ProgressEvent;

/// The consumer of a sink went away. The batch must stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkClosed;

#[async_trait]
pub trait ProgressSink: Send {
    /// Deliver one event. Returns once the event is handed over.
    async fn emit(&mut self, event: ProgressEvent) -> Result<(), SinkClosed>;

    /// Whether the consumer is known to be gone.
    fn is_closed(&self) -> bool {
        false
    }
}

/// Accumulates events in memory. Never closes.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Vec<ProgressEvent>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[ProgressEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<ProgressEvent> {
        self.events
    }
}

#[async_trait]
impl ProgressSink for CollectingSink {
    async fn emit(&mut self, event: ProgressEvent) -> Result<(), SinkClosed> {
        self.events.push(event);
        Ok(())
    }
}

/// Pushes events through a bounded channel. The receiver side is the
/// transport; dropping it is how a disconnect reaches the coordinator.
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::Sender<ProgressEvent>,
}

impl ChannelSink {
    /// Create a sink and its receiver. Capacity 1: at most the current event
    /// waits on the consumer.
    pub fn channel() -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(1);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ProgressSink for ChannelSink {
    async fn emit(&mut self, event: ProgressEvent) -> Result<(), SinkClosed> {
        self.tx.send(event).await.map_err(|_| SinkClosed)
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_sink_reports_dropped_receiver() {
        let (mut sink, rx) = ChannelSink::channel();
        assert!(!sink.is_closed());
        drop(rx);
        assert!(sink.is_closed());
        assert_eq!(sink.emit(ProgressEvent::started(1)).await, Err(SinkClosed));
    }

    #[tokio::test]
    async fn channel_sink_delivers_in_order() {
        let (mut sink, mut rx) = ChannelSink::channel();
        let producer = tokio::spawn(async move {
            for total in 1..=3 {
                sink.emit(ProgressEvent::started(total)).await.unwrap();
            }
        });
        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            seen.push(event.total);
        }
        producer.await.unwrap();
        assert_eq!(seen, vec![1, 2, 3]);
    }
}
