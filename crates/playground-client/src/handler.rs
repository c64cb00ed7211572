//! Progress callbacks for a running generation.
//!
//! The generator reports through [`GenerationHandler`]; the channel-backed
//! implementations turn those callbacks into a stream of
//! [`GenerationEvent`]s for a UI or an HTTP response.

use async_trait::async_trait;
use playground_core::{Usage, Version};
use tokio::sync::mpsc;
use tracing::trace;

use crate::error::{ClientError, ErrorDetails};

/// Callbacks invoked while a generation streams.
///
/// Every callback defaults to doing nothing.
#[async_trait]
pub trait GenerationHandler: Send + Sync {
    /// Called after every chunk with the answer version as it stands.
    async fn on_chunk(&self, _answer: &Version) -> Result<(), ClientError> {
        Ok(())
    }

    /// Called once at the end when the endpoint reported usage.
    async fn on_complete(&self, _usage: &Usage) -> Result<(), ClientError> {
        Ok(())
    }

    /// Called by the owner of a generation that failed.
    ///
    /// The generator returns its errors instead of reporting them here, so
    /// the caller decides whether a failure is worth surfacing.
    async fn on_error(&self, _error: &ClientError) -> Result<(), ClientError> {
        Ok(())
    }
}

/// Something a generation reported.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    /// Snapshot of the answer after a chunk.
    Chunk(Version),
    /// Final token usage.
    Complete(Usage),
    /// The generation failed.
    Error(ErrorDetails),
}

/// A handler that ignores all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

impl GenerationHandler for NoopHandler {}

/// A handler that forwards events to an unbounded channel.
///
/// Events are dropped silently once the receiver is gone.
pub struct ChannelHandler {
    event_tx: mpsc::UnboundedSender<GenerationEvent>,
}

impl ChannelHandler {
    /// Create a handler and the receiver for its events.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<GenerationEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { event_tx: tx }, rx)
    }

    /// Create a handler with a bounded channel.
    ///
    /// Slow receivers apply backpressure to the stream, and a dropped
    /// receiver stops the generation.
    pub fn with_capacity(
        capacity: usize,
    ) -> (BoundedChannelHandler, mpsc::Receiver<GenerationEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (BoundedChannelHandler { event_tx: tx }, rx)
    }
}

#[async_trait]
impl GenerationHandler for ChannelHandler {
    async fn on_chunk(&self, answer: &Version) -> Result<(), ClientError> {
        self.event_tx.send(GenerationEvent::Chunk(answer.clone())).ok();
        Ok(())
    }

    async fn on_complete(&self, usage: &Usage) -> Result<(), ClientError> {
        trace!(total_tokens = usage.total_tokens, "Forwarding usage");
        self.event_tx.send(GenerationEvent::Complete(*usage)).ok();
        Ok(())
    }

    async fn on_error(&self, error: &ClientError) -> Result<(), ClientError> {
        self.event_tx.send(GenerationEvent::Error(error.details())).ok();
        Ok(())
    }
}

/// A bounded variant of [`ChannelHandler`].
pub struct BoundedChannelHandler {
    event_tx: mpsc::Sender<GenerationEvent>,
}

#[async_trait]
impl GenerationHandler for BoundedChannelHandler {
    async fn on_chunk(&self, answer: &Version) -> Result<(), ClientError> {
        self.event_tx
            .send(GenerationEvent::Chunk(answer.clone()))
            .await
            .map_err(|_| ClientError::ChannelClosed)
    }

    async fn on_complete(&self, usage: &Usage) -> Result<(), ClientError> {
        self.event_tx
            .send(GenerationEvent::Complete(*usage))
            .await
            .map_err(|_| ClientError::ChannelClosed)
    }

    async fn on_error(&self, error: &ClientError) -> Result<(), ClientError> {
        self.event_tx
            .send(GenerationEvent::Error(error.details()))
            .await
            .map_err(|_| ClientError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_handler_forwards_events() {
        let (handler, mut rx) = ChannelHandler::new();

        handler.on_chunk(&Version::text("He")).await.unwrap();
        handler.on_complete(&Usage::new(1, 2, 3)).await.unwrap();

        assert_eq!(rx.try_recv().unwrap(), GenerationEvent::Chunk(Version::text("He")));
        assert_eq!(
            rx.try_recv().unwrap(),
            GenerationEvent::Complete(Usage::new(1, 2, 3))
        );
    }

    #[tokio::test]
    async fn test_channel_handler_forwards_errors() {
        let (handler, mut rx) = ChannelHandler::new();
        let error = ClientError::Stream("connection reset".into());

        handler.on_error(&error).await.unwrap();

        assert_eq!(rx.try_recv().unwrap(), GenerationEvent::Error(error.details()));
    }

    #[tokio::test]
    async fn test_bounded_handler_forwards_errors() {
        let (handler, mut rx) = ChannelHandler::with_capacity(1);

        handler.on_error(&ClientError::MissingApiKey).await.unwrap();

        match rx.recv().await.unwrap() {
            GenerationEvent::Error(details) => {
                assert_eq!(details.text, "Failed to generate: Missing API key");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_default_callbacks_do_nothing() {
        struct Silent;
        impl GenerationHandler for Silent {}

        let handler = Silent;
        assert!(handler.on_chunk(&Version::text("x")).await.is_ok());
        assert!(handler.on_complete(&Usage::new(1, 1, 2)).await.is_ok());
        assert!(handler.on_error(&ClientError::Cancelled).await.is_ok());
    }

    #[tokio::test]
    async fn test_unbounded_handler_ignores_dropped_receiver() {
        let (handler, rx) = ChannelHandler::new();
        drop(rx);
        assert!(handler.on_chunk(&Version::text("x")).await.is_ok());
    }

    #[tokio::test]
    async fn test_bounded_handler_reports_closed_channel() {
        let (handler, rx) = ChannelHandler::with_capacity(1);
        drop(rx);
        let result = handler.on_chunk(&Version::text("x")).await;
        assert!(matches!(result, Err(ClientError::ChannelClosed)));
    }
}
