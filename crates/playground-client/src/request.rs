//! Building the outbound completion request from a conversation.

use playground_core::{ChatOptions, Message, ModelInfo, ReasoningMode, Role};
use tracing::debug;

use crate::types::{ChatCompletionRequest, ResponseFormat, WireChunk, WireMessage};

/// Opening tag of an inline reasoning block.
pub const THINK_OPEN: &str = "<think>";

/// Closing tag of an inline reasoning block.
pub const THINK_CLOSE: &str = "</think>";

/// Convert history to wire messages, prefixing the system prompt.
///
/// Prior assistant reasoning is replayed in the form the model expects:
/// a leading thinking chunk for structured reasoning models, or an inline
/// `<think>` block for the legacy model. The legacy form is written into the
/// stored version's first text chunk, so `messages` is mutated in that case.
pub fn prepare_messages(
    messages: &mut [Message],
    system_prompt: Option<&str>,
    model: &ModelInfo,
) -> Vec<WireMessage> {
    let mut wire = Vec::with_capacity(messages.len() + 1);
    if let Some(prompt) = system_prompt.filter(|p| !p.is_empty()) {
        wire.push(WireMessage::system(prompt));
    }

    let mode = model.reasoning_mode();
    for message in messages.iter_mut() {
        let role = message.role();
        let version = message.active_mut();
        let replay = role == Role::Assistant && version.has_thinking();
        let thinking = version.thinking.clone().unwrap_or_default();

        let mut chunks = Vec::with_capacity(version.content.len() + 1);
        match mode {
            ReasoningMode::Structured if replay => {
                chunks.push(WireChunk::thinking(thinking));
            }
            ReasoningMode::LegacyTags if replay => {
                if let Some(text) = version.first_text_mut() {
                    *text = format!("{THINK_OPEN}{thinking}{THINK_CLOSE}\n{text}");
                }
            }
            _ => {}
        }
        chunks.extend(version.content.iter().map(WireChunk::from));

        wire.push(WireMessage::chunks(role, chunks));
    }

    debug!(count = wire.len(), model = %model.id, "Prepared wire messages");
    wire
}

/// Assemble the request body for a streaming completion.
pub fn build_request(options: &ChatOptions, messages: Vec<WireMessage>) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: options.model.clone(),
        messages,
        stream: true,
        temperature: Some(options.temperature),
        top_p: Some(options.top_p),
        max_tokens: options.max_tokens,
        random_seed: options.seed,
        frequency_penalty: options.frequency_penalty,
        presence_penalty: options.presence_penalty,
        safe_prompt: options.safe_prompt.then_some(true),
        response_format: options.json.then_some(ResponseFormat::JsonObject),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WireContent;
    use playground_core::{ContentChunk, Version};

    fn answered(thinking: &str, text: &str) -> Message {
        let mut message = Message::assistant(text);
        message.active_mut().thinking = Some(thinking.into());
        message
    }

    #[test]
    fn test_system_prompt_is_prefixed() {
        let mut messages = vec![Message::user("hi"), Message::assistant("hello")];
        let model = ModelInfo::infer("mistral-small-latest");

        let wire = prepare_messages(&mut messages, Some("S"), &model);

        assert_eq!(wire.len(), 3);
        assert_eq!(wire[0], WireMessage::system("S"));
        assert_eq!(wire[1].role, Role::User);
        assert_eq!(
            wire[1].content,
            WireContent::Chunks(vec![WireChunk::Text { text: "hi".into() }])
        );
        assert_eq!(wire[2].role, Role::Assistant);
    }

    #[test]
    fn test_empty_system_prompt_is_skipped() {
        let mut messages = vec![Message::user("hi")];
        let wire = prepare_messages(&mut messages, Some(""), &ModelInfo::infer("mistral-small-latest"));
        assert_eq!(wire.len(), 1);
    }

    #[test]
    fn test_structured_reasoning_replays_thinking_chunk() {
        let mut messages = vec![Message::user("q"), answered("R", "A")];
        let model = ModelInfo::infer("magistral-small-latest");

        let wire = prepare_messages(&mut messages, None, &model);

        let chunks = wire[1].content.clone().into_chunks();
        assert_eq!(chunks[0], WireChunk::thinking("R"));
        assert_eq!(chunks[1], WireChunk::Text { text: "A".into() });
        // Stored content is untouched.
        assert_eq!(messages[1].active().content, vec![ContentChunk::text("A")]);
    }

    #[test]
    fn test_legacy_reasoning_inlines_think_block() {
        let mut messages = vec![Message::user("q"), answered("R", "A")];
        let model = ModelInfo::infer(playground_core::LEGACY_THINK_TAG_MODEL);

        let wire = prepare_messages(&mut messages, None, &model);

        let chunks = wire[1].content.clone().into_chunks();
        assert_eq!(chunks.len(), 1);
        assert_eq!(
            chunks[0],
            WireChunk::Text {
                text: "<think>R</think>\nA".into()
            }
        );
        assert_eq!(
            messages[1].active().content[0].as_text(),
            Some("<think>R</think>\nA")
        );
    }

    #[test]
    fn test_non_reasoning_model_drops_thinking() {
        let mut messages = vec![answered("R", "A")];
        let wire = prepare_messages(&mut messages, None, &ModelInfo::infer("mistral-large-latest"));
        assert_eq!(
            wire[0].content.clone().into_chunks(),
            vec![WireChunk::Text { text: "A".into() }]
        );
    }

    #[test]
    fn test_user_media_chunks_pass_through() {
        let mut messages = vec![Message::new(
            Role::User,
            Version::new(vec![
                ContentChunk::text("describe"),
                ContentChunk::image_url("https://example.com/cat.png"),
            ]),
        )];
        let wire = prepare_messages(&mut messages, None, &ModelInfo::infer("pixtral-large-latest"));

        let chunks = wire[0].content.clone().into_chunks();
        assert_eq!(
            chunks[1],
            WireChunk::ImageUrl {
                image_url: "https://example.com/cat.png".into()
            }
        );
    }

    #[test]
    fn test_build_request_maps_options() {
        let mut options = ChatOptions::new("mistral-small-latest").with_json(true);
        options.seed = Some(42);
        options.max_tokens = Some(64);

        let request = build_request(&options, vec![WireMessage::system("S")]);

        assert!(request.stream);
        assert_eq!(request.random_seed, Some(42));
        assert_eq!(request.max_tokens, Some(64));
        assert_eq!(request.response_format, Some(ResponseFormat::JsonObject));
        assert_eq!(request.safe_prompt, None);
    }
}
