//! Streaming chat completion handler.
//!
//! The endpoint's first chunk is awaited before the response starts, so
//! credential and request errors come back as a JSON error instead of a
//! stream that dies immediately.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures_util::stream::{self, Stream, StreamExt};
use playground_client::{
    build_request, ChunkStream, ClientError, CompletionChunk, DeltaContent, WireMessage,
};
use playground_core::Usage;
use serde::Serialize;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::http::responses::{CompletionRequest, ErrorResponse, InputMessage};
use crate::state::AppState;

/// Type alias for boxed SSE stream.
pub(super) type SseEventStream = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

/// POST /api/chat/completions - Relay a streaming completion.
///
/// Emits `delta` events carrying each delta's content, then one `usage`
/// event with throughput when the endpoint reported usage. A failure after
/// the stream started is sent as an `error` event.
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CompletionRequest>, JsonRejection>,
) -> Result<Sse<SseEventStream>, ApiError> {
    let Json(req) = body.map_err(ApiError::from_rejection)?;

    let options = req.options.unwrap_or_default().into_chat_options();
    let messages: Vec<WireMessage> = req
        .messages
        .into_iter()
        .map(InputMessage::into_wire)
        .collect();

    info!(
        model = %options.model,
        messages = messages.len(),
        "Received chat completion request"
    );

    let backend = state.connect(&req.api_key, req.endpoint.as_deref());
    let request = build_request(&options, messages);
    let cancel = CancellationToken::new();
    let started = Instant::now();

    let chunks = backend.stream_chat(request, cancel.clone()).await?;
    relay_stream(chunks, cancel, started).await
}

/// Wait for the first chunk, then relay the rest as SSE events.
///
/// Shared by every streaming endpoint: a failure before the first chunk is
/// returned as a JSON error.
pub(super) async fn relay_stream(
    mut chunks: ChunkStream,
    cancel: CancellationToken,
    started: Instant,
) -> Result<Sse<SseEventStream>, ApiError> {
    let first = match chunks.next().await {
        Some(Ok(chunk)) => chunk,
        Some(Err(e)) => {
            warn!(error = %e, "Completion failed before the first chunk");
            return Err(e.into());
        }
        None => {
            return Err(ClientError::Stream("Empty completion stream".to_string()).into());
        }
    };

    let events: SseEventStream = Box::pin(relay_events(first, chunks, cancel, started));
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// Relay state for unfold.
struct Relay {
    first: Option<CompletionChunk>,
    chunks: ChunkStream,
    usage: Option<Usage>,
    started: Instant,
    finished: bool,
    /// Cancels the upstream request when the browser goes away.
    _cancel_on_drop: DropGuard,
}

fn relay_events(
    first: CompletionChunk,
    chunks: ChunkStream,
    cancel: CancellationToken,
    started: Instant,
) -> impl Stream<Item = Result<Event, Infallible>> + Send {
    let relay = Relay {
        first: Some(first),
        chunks,
        usage: None,
        started,
        finished: false,
        _cancel_on_drop: cancel.drop_guard(),
    };

    stream::unfold(relay, |mut relay| async move {
        loop {
            if relay.finished {
                return None;
            }

            let next = match relay.first.take() {
                Some(chunk) => Some(Ok(chunk)),
                None => relay.chunks.next().await,
            };

            match next {
                Some(Ok(chunk)) => {
                    if let Some(info) = chunk.usage {
                        relay.usage = Some(info.into());
                    }
                    match chunk.delta().and_then(|delta| delta.content.as_ref()) {
                        Some(DeltaContent::Text(text)) if text.is_empty() => {}
                        Some(content) => return Some((Ok(json_event("delta", content)), relay)),
                        None => {}
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Completion stream failed");
                    relay.finished = true;
                    let body = ErrorResponse::from_client(&e);
                    return Some((Ok(json_event("error", &body)), relay));
                }
                None => {
                    relay.finished = true;
                    let usage = relay.usage.take()?.with_tps(relay.started.elapsed());
                    info!(
                        total_tokens = usage.total_tokens,
                        tps = ?usage.tps,
                        "Completion finished"
                    );
                    return Some((Ok(json_event("usage", &usage)), relay));
                }
            }
        }
    })
}

fn json_event<T: Serialize>(name: &str, data: &T) -> Event {
    match Event::default().event(name).json_data(data) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, event = name, "Failed to encode event");
            Event::default().comment("encoding failed")
        }
    }
}
