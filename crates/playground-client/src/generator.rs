//! Streaming one assistant answer into a conversation.
//!
//! # Example
//!
//! ```rust,no_run
//! use playground_client::{generate_chat_message, ChatClient, ClientConfig, NoopHandler};
//! use playground_core::{ChatOptions, Conversation, Message, ModelInfo};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn run() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ChatClient::new(ClientConfig::from_env()?);
//!     let options = ChatOptions::new("mistral-small-latest");
//!     let model = ModelInfo::infer(&options.model);
//!
//!     let mut conversation = Conversation::from_messages(vec![Message::user("Hello!")]);
//!     let (history, answer) = conversation.begin_answer();
//!
//!     let usage = generate_chat_message(
//!         &client,
//!         history,
//!         answer,
//!         &options,
//!         &model,
//!         &CancellationToken::new(),
//!         &NoopHandler,
//!     )
//!     .await?;
//!
//!     println!("{}", answer.active().text_content());
//!     println!("{:?}", usage);
//!     Ok(())
//! }
//! ```

use std::time::Instant;

use futures_util::StreamExt;
use playground_core::{ChatOptions, ContentChunk, Message, ModelInfo, Usage, Version};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::CompletionBackend;
use crate::error::ClientError;
use crate::handler::GenerationHandler;
use crate::reasoning::ReasoningState;
use crate::reducer::process_chunk;
use crate::request::{build_request, prepare_messages};
use crate::types::{CompletionChunk, DeltaContent};

/// Stream a completion into the active version of `answer`.
///
/// `history` is everything before the answer; it is only mutated when
/// prior reasoning has to be inlined for the legacy model. `handler` sees
/// the answer after every chunk, and usage once at the end if the endpoint
/// reported it.
///
/// Cancelling `cancel` stops reading at the next chunk boundary and returns
/// `Ok` with whatever usage was already seen; the partial answer is kept
/// but JSON mode formatting is skipped. Errors leave the partial answer in
/// place as well. Either way, text the `<think>` parser was still holding
/// is flushed into the answer first.
pub async fn generate_chat_message<B, H>(
    backend: &B,
    history: &mut [Message],
    answer: &mut Message,
    options: &ChatOptions,
    model: &ModelInfo,
    cancel: &CancellationToken,
    handler: &H,
) -> Result<Option<Usage>, ClientError>
where
    B: CompletionBackend + ?Sized,
    H: GenerationHandler + ?Sized,
{
    let messages = prepare_messages(history, options.system_prompt(), model);
    let request = build_request(options, messages);

    info!(
        model = %request.model,
        messages = request.messages.len(),
        reasoning = ?model.reasoning_mode(),
        "Starting generation"
    );

    let started = Instant::now();
    let mut stream = match backend.stream_chat(request, cancel.clone()).await {
        Ok(stream) => stream,
        Err(ClientError::Cancelled) => {
            info!("Generation cancelled before the stream opened");
            return Ok(None);
        }
        Err(e) => {
            warn!(error = %e, "Failed to open completion stream");
            return Err(e);
        }
    };

    let version = answer.active_mut();
    if model.is_reasoning() {
        version.thinking = Some(String::new());
    }
    let mut reasoning = ReasoningState::for_model(model);
    let mut usage: Option<Usage> = None;
    let mut chunks = 0usize;

    let mut failure: Option<ClientError> = None;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = stream.next() => next,
        };
        let Some(chunk) = next else {
            break;
        };
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                failure = Some(e);
                break;
            }
        };
        chunks += 1;

        apply_delta(&chunk, version, &mut reasoning);
        if let Some(info) = chunk.usage {
            usage = Some(info.into());
        }
        if let Err(e) = handler.on_chunk(version).await {
            failure = Some(e);
            break;
        }
    }
    drop(stream);

    // Text held back by the tag parser is part of the answer however the
    // stream ended.
    let flushed = reasoning.finish(version);

    if let Some(e) = failure {
        warn!(error = %e, chunks, "Generation failed, keeping partial answer");
        if flushed {
            handler.on_chunk(version).await.ok();
        }
        return Err(e);
    }

    let aborted = cancel.is_cancelled();
    if aborted {
        info!(chunks, "Generation aborted, keeping partial answer");
    }
    let formatted = !aborted && options.json && format_json_response(version);
    if flushed || formatted {
        handler.on_chunk(version).await?;
    }

    let usage = usage.map(|u| u.with_tps(started.elapsed()));
    if let Some(usage) = &usage {
        handler.on_complete(usage).await?;
    }

    info!(
        chunks,
        elapsed_ms = started.elapsed().as_millis() as u64,
        total_tokens = ?usage.map(|u| u.total_tokens),
        "Generation finished"
    );
    Ok(usage)
}

fn apply_delta(chunk: &CompletionChunk, answer: &mut Version, reasoning: &mut ReasoningState) {
    let Some(content) = chunk.delta().and_then(|delta| delta.content.as_ref()) else {
        return;
    };
    match content {
        DeltaContent::Chunks(parts) => {
            for (index, part) in parts.iter().enumerate() {
                process_chunk(part, answer, index);
            }
        }
        DeltaContent::Text(text) => reasoning.consume(text, answer),
    }
}

/// Rewrite a JSON-mode answer as a fenced, 4-space indented block.
///
/// Only the first content chunk is considered. Returns whether the answer
/// was rewritten; text that does not parse is left untouched.
pub fn format_json_response(answer: &mut Version) -> bool {
    let Some(ContentChunk::Text { text }) = answer.content.first_mut() else {
        return false;
    };
    match serde_json::from_str::<Value>(text) {
        Ok(value) => {
            *text = format!("```json\n{}\n```", pretty_json(&value));
            true
        }
        Err(e) => {
            debug!(error = %e, "Answer is not valid JSON, leaving it as-is");
            false
        }
    }
}

fn pretty_json(value: &Value) -> String {
    let mut out = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    match value.serialize(&mut serializer) {
        Ok(()) => String::from_utf8(out).unwrap_or_else(|_| value.to_string()),
        Err(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use futures_util::stream;
    use playground_core::{Conversation, Role, LEGACY_THINK_TAG_MODEL};
    use serde_json::json;

    use crate::client::ChunkStream;
    use crate::handler::{ChannelHandler, GenerationEvent, NoopHandler};
    use crate::types::{ChatCompletionRequest, WireContent, WireMessage};

    /// Replays a fixed chunk sequence, optionally never ending afterwards.
    struct ScriptedBackend {
        chunks: Mutex<Vec<Result<CompletionChunk, ClientError>>>,
        hang: bool,
        open_error: Mutex<Option<ClientError>>,
        requests: Mutex<Vec<ChatCompletionRequest>>,
    }

    impl ScriptedBackend {
        fn new(chunks: Vec<CompletionChunk>) -> Self {
            Self::with_results(chunks.into_iter().map(Ok).collect())
        }

        fn with_results(chunks: Vec<Result<CompletionChunk, ClientError>>) -> Self {
            Self {
                chunks: Mutex::new(chunks),
                hang: false,
                open_error: Mutex::new(None),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn hanging(chunks: Vec<CompletionChunk>) -> Self {
            Self {
                hang: true,
                ..Self::new(chunks)
            }
        }

        fn failing(error: ClientError) -> Self {
            let backend = Self::new(Vec::new());
            *backend.open_error.lock().unwrap() = Some(error);
            backend
        }

        fn last_request(&self) -> ChatCompletionRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn stream_chat(
            &self,
            request: ChatCompletionRequest,
            _cancel: CancellationToken,
        ) -> Result<ChunkStream, ClientError> {
            self.requests.lock().unwrap().push(request);
            if let Some(error) = self.open_error.lock().unwrap().take() {
                return Err(error);
            }
            let chunks = std::mem::take(&mut *self.chunks.lock().unwrap());
            let scripted = stream::iter(chunks);
            if self.hang {
                Ok(Box::pin(scripted.chain(stream::pending())))
            } else {
                Ok(Box::pin(scripted))
            }
        }

        async fn list_models(&self) -> Result<Vec<crate::types::ModelCard>, ClientError> {
            Ok(Vec::new())
        }
    }

    /// Cancels the generation as soon as the first chunk is reported.
    struct CancelOnChunk(CancellationToken);

    #[async_trait]
    impl GenerationHandler for CancelOnChunk {
        async fn on_chunk(&self, _answer: &Version) -> Result<(), ClientError> {
            self.0.cancel();
            Ok(())
        }

        async fn on_complete(&self, _usage: &Usage) -> Result<(), ClientError> {
            Ok(())
        }
    }

    fn text(delta: &str) -> CompletionChunk {
        serde_json::from_value(json!({"choices": [{"delta": {"content": delta}}]})).unwrap()
    }

    fn parts(content: Value) -> CompletionChunk {
        serde_json::from_value(json!({"choices": [{"delta": {"content": content}}]})).unwrap()
    }

    fn usage(prompt: u32, completion: u32) -> CompletionChunk {
        serde_json::from_value(json!({
            "choices": [{"delta": {"content": ""}, "finish_reason": "stop"}],
            "usage": {
                "prompt_tokens": prompt,
                "completion_tokens": completion,
                "total_tokens": prompt + completion
            }
        }))
        .unwrap()
    }

    async fn generate(
        backend: &ScriptedBackend,
        options: &ChatOptions,
    ) -> (Conversation, Result<Option<Usage>, ClientError>) {
        let mut conversation = Conversation::from_messages(vec![Message::user("hi")]);
        let model = ModelInfo::infer(&options.model);
        let (history, answer) = conversation.begin_answer();
        let result = generate_chat_message(
            backend,
            history,
            answer,
            options,
            &model,
            &CancellationToken::new(),
            &NoopHandler,
        )
        .await;
        (conversation, result)
    }

    fn answer_of(conversation: &Conversation) -> &Version {
        conversation.messages().last().unwrap().active()
    }

    #[tokio::test]
    async fn test_plain_text_stream() {
        let backend = ScriptedBackend::new(vec![text("Hel"), text("lo"), usage(3, 2)]);
        let options = ChatOptions::new("mistral-small-latest");
        let model = ModelInfo::infer(&options.model);
        let (handler, mut rx) = ChannelHandler::new();

        let mut conversation = Conversation::from_messages(vec![Message::user("hi")]);
        let (history, answer) = conversation.begin_answer();
        let result = generate_chat_message(
            &backend,
            history,
            answer,
            &options,
            &model,
            &CancellationToken::new(),
            &handler,
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(answer_of(&conversation).text_content(), "Hello");
        assert_eq!(answer_of(&conversation).thinking, None);
        assert_eq!(result.total_tokens, 5);
        assert_eq!(result.completion_tokens, 2);

        let mut snapshots = Vec::new();
        let mut completed = None;
        while let Ok(event) = rx.try_recv() {
            match event {
                GenerationEvent::Chunk(version) => snapshots.push(version.text_content()),
                GenerationEvent::Complete(usage) => completed = Some(usage),
                GenerationEvent::Error(details) => panic!("unexpected error: {details:?}"),
            }
        }
        assert_eq!(snapshots, vec!["Hel", "Hello", "Hello"]);
        assert_eq!(completed, Some(result));
    }

    #[tokio::test]
    async fn test_request_carries_system_prompt_and_options() {
        let backend = ScriptedBackend::new(vec![text("ok")]);
        let mut options = ChatOptions::new("mistral-small-latest").with_system_prompt("S");
        options.seed = Some(11);

        let (_, result) = generate(&backend, &options).await;
        assert_eq!(result.unwrap(), None);

        let request = backend.last_request();
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0], WireMessage::system("S"));
        assert_eq!(request.messages[1].role, Role::User);
        assert!(matches!(request.messages[1].content, WireContent::Chunks(_)));
        assert_eq!(request.random_seed, Some(11));
        assert!(request.stream);
    }

    #[tokio::test]
    async fn test_structured_reasoning_across_deltas() {
        let backend = ScriptedBackend::new(vec![
            parts(json!([{"type": "thinking", "thinking": [{"type": "text", "text": "Let me "}]}])),
            parts(json!([{"type": "thinking", "thinking": [{"type": "text", "text": "think."}]}])),
            parts(json!([{"type": "text", "text": "Answer"}])),
        ]);
        let options = ChatOptions::new("magistral-small-latest");

        let (conversation, result) = generate(&backend, &options).await;
        assert!(result.is_ok());

        let answer = answer_of(&conversation);
        assert_eq!(answer.thinking.as_deref(), Some("Let me think."));
        assert_eq!(answer.text_content(), "Answer");
    }

    #[tokio::test]
    async fn test_structured_reasoning_in_one_delta() {
        let backend = ScriptedBackend::new(vec![parts(json!([
            {"type": "thinking", "thinking": [{"type": "text", "text": "R"}]},
            {"type": "text", "text": "A"}
        ]))]);
        let options = ChatOptions::new("magistral-medium-latest");

        let (conversation, _) = generate(&backend, &options).await;

        let answer = answer_of(&conversation);
        assert_eq!(answer.thinking.as_deref(), Some("R"));
        assert_eq!(answer.text_content(), "A");
    }

    #[tokio::test]
    async fn test_legacy_think_tags_split_across_deltas() {
        let backend = ScriptedBackend::new(vec![
            text("<thi"),
            text("nk>why</th"),
            text("ink>\n"),
            text("answer"),
        ]);
        let options = ChatOptions::new(LEGACY_THINK_TAG_MODEL);

        let (conversation, _) = generate(&backend, &options).await;

        let answer = answer_of(&conversation);
        assert_eq!(answer.thinking.as_deref(), Some("why"));
        assert_eq!(answer.text_content(), "answer");
    }

    #[tokio::test]
    async fn test_json_mode_formats_answer() {
        let backend = ScriptedBackend::new(vec![text("{\"a\":"), text("1}")]);
        let options = ChatOptions::new("mistral-small-latest").with_json(true);

        let (conversation, _) = generate(&backend, &options).await;

        assert_eq!(
            answer_of(&conversation).text_content(),
            "```json\n{\n    \"a\": 1\n}\n```"
        );
    }

    #[tokio::test]
    async fn test_json_mode_keeps_invalid_json() {
        let backend = ScriptedBackend::new(vec![text("not json")]);
        let options = ChatOptions::new("mistral-small-latest").with_json(true);

        let (conversation, _) = generate(&backend, &options).await;

        assert_eq!(answer_of(&conversation).text_content(), "not json");
    }

    #[tokio::test]
    async fn test_last_usage_wins() {
        let backend = ScriptedBackend::new(vec![text("x"), usage(1, 1), usage(4, 6)]);
        let options = ChatOptions::new("mistral-small-latest");

        let (_, result) = generate(&backend, &options).await;

        let usage = result.unwrap().unwrap();
        assert_eq!(usage.prompt_tokens, 4);
        assert_eq!(usage.total_tokens, 10);
    }

    #[tokio::test]
    async fn test_cancel_keeps_partial_answer() {
        let backend = ScriptedBackend::hanging(vec![text("{\"partial\"")]);
        let options = ChatOptions::new("mistral-small-latest").with_json(true);
        let model = ModelInfo::infer(&options.model);
        let cancel = CancellationToken::new();
        let handler = CancelOnChunk(cancel.clone());

        let mut conversation = Conversation::from_messages(vec![Message::user("hi")]);
        let (history, answer) = conversation.begin_answer();
        let result =
            generate_chat_message(&backend, history, answer, &options, &model, &cancel, &handler)
                .await;

        assert_eq!(result.unwrap(), None);
        assert!(cancel.is_cancelled());
        assert_eq!(answer_of(&conversation).text_content(), "{\"partial\"");
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let backend = ScriptedBackend::hanging(vec![text("never")]);
        let options = ChatOptions::new("mistral-small-latest");
        let model = ModelInfo::infer(&options.model);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut conversation = Conversation::from_messages(vec![Message::user("hi")]);
        let (history, answer) = conversation.begin_answer();
        let result =
            generate_chat_message(&backend, history, answer, &options, &model, &cancel, &NoopHandler)
                .await;

        assert_eq!(result.unwrap(), None);
        assert_eq!(answer_of(&conversation).text_content(), "");
    }

    #[tokio::test]
    async fn test_stream_error_keeps_partial_answer() {
        let backend = ScriptedBackend::with_results(vec![
            Ok(text("He")),
            Err(ClientError::Stream("connection reset".into())),
            Ok(text("llo")),
        ]);
        let options = ChatOptions::new("mistral-small-latest");

        let (conversation, result) = generate(&backend, &options).await;

        assert!(matches!(result, Err(ClientError::Stream(_))));
        assert_eq!(answer_of(&conversation).text_content(), "He");
    }

    async fn generate_cancelled(
        backend: &ScriptedBackend,
        options: &ChatOptions,
    ) -> (Conversation, Result<Option<Usage>, ClientError>) {
        let model = ModelInfo::infer(&options.model);
        let cancel = CancellationToken::new();
        let handler = CancelOnChunk(cancel.clone());

        let mut conversation = Conversation::from_messages(vec![Message::user("hi")]);
        let (history, answer) = conversation.begin_answer();
        let result =
            generate_chat_message(backend, history, answer, options, &model, &cancel, &handler)
                .await;
        (conversation, result)
    }

    #[tokio::test]
    async fn test_cancel_skips_json_formatting() {
        let backend = ScriptedBackend::hanging(vec![text("{\"a\":1}")]);
        let options = ChatOptions::new("mistral-small-latest").with_json(true);

        let (conversation, result) = generate_cancelled(&backend, &options).await;

        assert_eq!(result.unwrap(), None);
        assert_eq!(answer_of(&conversation).text_content(), "{\"a\":1}");
    }

    #[tokio::test]
    async fn test_cancel_flushes_untagged_legacy_text() {
        let backend = ScriptedBackend::hanging(vec![text("Hello world")]);
        let options = ChatOptions::new(LEGACY_THINK_TAG_MODEL);

        let (conversation, result) = generate_cancelled(&backend, &options).await;

        assert_eq!(result.unwrap(), None);
        assert_eq!(answer_of(&conversation).text_content(), "Hello world");
    }

    #[tokio::test]
    async fn test_cancel_flushes_held_legacy_reasoning() {
        let backend = ScriptedBackend::hanging(vec![text("<think>why<")]);
        let options = ChatOptions::new(LEGACY_THINK_TAG_MODEL);

        let (conversation, result) = generate_cancelled(&backend, &options).await;

        assert_eq!(result.unwrap(), None);
        assert_eq!(answer_of(&conversation).thinking.as_deref(), Some("why<"));
    }

    #[tokio::test]
    async fn test_stream_error_flushes_untagged_legacy_text() {
        let backend = ScriptedBackend::with_results(vec![
            Ok(text("Hello world")),
            Err(ClientError::Stream("connection reset".into())),
        ]);
        let options = ChatOptions::new(LEGACY_THINK_TAG_MODEL);

        let (conversation, result) = generate(&backend, &options).await;

        assert!(matches!(result, Err(ClientError::Stream(_))));
        assert_eq!(answer_of(&conversation).text_content(), "Hello world");
    }

    #[tokio::test]
    async fn test_stream_error_reports_flushed_text() {
        let backend = ScriptedBackend::with_results(vec![
            Ok(text("Hello world")),
            Err(ClientError::Stream("connection reset".into())),
        ]);
        let options = ChatOptions::new(LEGACY_THINK_TAG_MODEL);
        let model = ModelInfo::infer(&options.model);
        let (handler, mut rx) = ChannelHandler::new();

        let mut conversation = Conversation::from_messages(vec![Message::user("hi")]);
        let (history, answer) = conversation.begin_answer();
        let result = generate_chat_message(
            &backend,
            history,
            answer,
            &options,
            &model,
            &CancellationToken::new(),
            &handler,
        )
        .await;

        assert!(result.is_err());
        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            if let GenerationEvent::Chunk(version) = event {
                last = Some(version.text_content());
            }
        }
        assert_eq!(last.as_deref(), Some("Hello world"));
    }

    #[tokio::test]
    async fn test_open_error_is_returned() {
        let backend = ScriptedBackend::failing(ClientError::Api {
            status: 401,
            message: "Unauthorized".into(),
        });
        let options = ChatOptions::new("mistral-small-latest");

        let (_, result) = generate(&backend, &options).await;

        let error = result.unwrap_err();
        assert_eq!(error.code(), crate::error::ErrorCode::ApiKey);
    }

    #[tokio::test]
    async fn test_regeneration_replays_prior_reasoning() {
        let backend = ScriptedBackend::new(vec![text("again")]);
        let options = ChatOptions::new("magistral-small-latest");
        let model = ModelInfo::infer(&options.model);

        let mut first = Message::assistant("A");
        first.active_mut().thinking = Some("R".into());
        let mut conversation = Conversation::from_messages(vec![
            Message::user("q1"),
            first,
            Message::user("q2"),
            Message::assistant("old"),
        ]);
        let id = conversation.messages()[3].id().clone();
        let (history, answer) = conversation.begin_regeneration(&id).unwrap();

        generate_chat_message(
            &backend,
            history,
            answer,
            &options,
            &model,
            &CancellationToken::new(),
            &NoopHandler,
        )
        .await
        .unwrap();

        let request = backend.last_request();
        assert_eq!(request.messages.len(), 3);
        let replayed = request.messages[1].content.clone().into_chunks();
        assert_eq!(replayed[0], crate::types::WireChunk::thinking("R"));

        let regenerated = &conversation.messages()[3];
        assert_eq!(regenerated.len(), 2);
        assert_eq!(regenerated.index(), 1);
        assert_eq!(regenerated.active().text_content(), "again");
        assert_eq!(regenerated.versions()[0].text_content(), "old");
    }
}
