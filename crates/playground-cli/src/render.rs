//! Terminal rendering of chats and live generations.

use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;
use playground_client::{ClientError, GenerationHandler};
use playground_core::{ChatState, ContentChunk, Message, Usage, Version};

/// How the current text relates to what was already written.
#[derive(Debug, PartialEq, Eq)]
enum Update<'a> {
    Unchanged,
    Append(&'a str),
    /// The text changed in place (e.g. JSON formatting); write it again.
    Rewrite(&'a str),
}

fn diff<'a>(printed: &str, current: &'a str) -> Update<'a> {
    if current == printed {
        Update::Unchanged
    } else if let Some(rest) = current.strip_prefix(printed) {
        Update::Append(rest)
    } else {
        Update::Rewrite(current)
    }
}

struct PrinterState<O, A> {
    out: O,
    aside: A,
    text: String,
    thinking: String,
}

/// Streams the answer to `out` and reasoning plus usage to `aside`.
///
/// The binary wires `out` to stdout and `aside` to stderr so piping a chat
/// captures only the answer.
pub struct StreamPrinter<O, A> {
    state: Mutex<PrinterState<O, A>>,
}

impl<O: Write + Send, A: Write + Send> StreamPrinter<O, A> {
    pub fn new(out: O, aside: A) -> Self {
        Self {
            state: Mutex::new(PrinterState {
                out,
                aside,
                text: String::new(),
                thinking: String::new(),
            }),
        }
    }

    /// Terminate the answer line if anything was written.
    pub fn finish(&self) -> std::io::Result<()> {
        let mut state = self.lock();
        if !state.text.is_empty() {
            writeln!(state.out)?;
        }
        state.out.flush()
    }

    #[cfg(test)]
    fn into_parts(self) -> (O, A) {
        let state = match self.state.into_inner() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        (state.out, state.aside)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PrinterState<O, A>> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn render(&self, answer: &Version) -> std::io::Result<()> {
        let mut state = self.lock();
        let state = &mut *state;

        let thinking = answer.thinking.as_deref().unwrap_or_default();
        match diff(&state.thinking, thinking) {
            Update::Unchanged => {}
            Update::Append(rest) => {
                if state.thinking.is_empty() {
                    write!(state.aside, "[thinking] ")?;
                }
                write!(state.aside, "{rest}")?;
                state.aside.flush()?;
                state.thinking = thinking.to_string();
            }
            Update::Rewrite(all) => {
                write!(state.aside, "\n[thinking] {all}")?;
                state.aside.flush()?;
                state.thinking = all.to_string();
            }
        }

        let text = answer.text_content();
        match diff(&state.text, &text) {
            Update::Unchanged => {}
            Update::Append(rest) => {
                if state.text.is_empty() && !state.thinking.is_empty() {
                    writeln!(state.aside)?;
                    state.aside.flush()?;
                }
                write!(state.out, "{rest}")?;
                state.out.flush()?;
                state.text = text;
            }
            Update::Rewrite(all) => {
                write!(state.out, "\n{all}")?;
                state.out.flush()?;
                state.text = text;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<O: Write + Send, A: Write + Send> GenerationHandler for StreamPrinter<O, A> {
    async fn on_chunk(&self, answer: &Version) -> Result<(), ClientError> {
        self.render(answer)
            .map_err(|e| ClientError::Stream(format!("Failed to write output: {e}")))
    }

    async fn on_complete(&self, usage: &Usage) -> Result<(), ClientError> {
        let mut state = self.lock();
        writeln!(state.aside, "{}", format_usage(usage))
            .map_err(|e| ClientError::Stream(format!("Failed to write output: {e}")))
    }
}

pub fn format_usage(usage: &Usage) -> String {
    let mut line = format!(
        "[{} prompt + {} completion = {} tokens",
        usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
    );
    if let Some(tps) = usage.tps {
        line.push_str(&format!(", {tps} tok/s"));
    }
    line.push(']');
    line
}

/// One line per chunk for attachments; text verbatim.
fn chunk_line(chunk: &ContentChunk) -> String {
    match chunk {
        ContentChunk::Text { text } => text.clone(),
        ContentChunk::ImageUrl { .. } => "[image]".to_string(),
        ContentChunk::InputAudio { .. } => "[audio]".to_string(),
        ContentChunk::DocumentUrl {
            document_url,
            document_name,
        } => format!(
            "[document: {}]",
            document_name.as_deref().unwrap_or(document_url)
        ),
        ContentChunk::File { file_id } => format!("[file: {file_id}]"),
    }
}

pub fn format_message(message: &Message) -> String {
    let mut header = format!("## {}", message.role().as_str());
    if message.len() > 1 {
        header.push_str(&format!(" ({}/{})", message.index() + 1, message.len()));
    }

    let version = message.active();
    let mut lines = vec![header];
    if let Some(thinking) = version.thinking.as_deref().filter(|t| !t.is_empty()) {
        lines.push(format!("[thinking] {thinking}"));
    }
    lines.extend(version.content.iter().map(chunk_line));
    lines.join("\n")
}

pub fn format_chat(chat: &ChatState) -> String {
    let mut sections = Vec::new();
    if let Some(prompt) = chat.options.system_prompt() {
        sections.push(format!("## system\n{prompt}"));
    }
    sections.extend(chat.messages.iter().map(format_message));
    if let Some(usage) = &chat.usage {
        sections.push(format_usage(usage));
    }
    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn printer() -> StreamPrinter<Vec<u8>, Vec<u8>> {
        StreamPrinter::new(Vec::new(), Vec::new())
    }

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_diff() {
        assert_eq!(diff("He", "He"), Update::Unchanged);
        assert_eq!(diff("He", "Hello"), Update::Append("llo"));
        assert_eq!(diff("{}", "```json\n{}\n```"), Update::Rewrite("```json\n{}\n```"));
    }

    #[tokio::test]
    async fn test_printer_streams_increments() {
        let printer = printer();
        printer.on_chunk(&Version::text("He")).await.unwrap();
        printer.on_chunk(&Version::text("Hello")).await.unwrap();
        printer.on_chunk(&Version::text("Hello")).await.unwrap();
        printer.finish().unwrap();

        let (out, aside) = printer.into_parts();
        assert_eq!(text(out), "Hello\n");
        assert!(aside.is_empty());
    }

    #[tokio::test]
    async fn test_printer_sends_thinking_aside() {
        let printer = printer();
        let mut version = Version::empty_answer();
        version.thinking = Some("let me".into());
        printer.on_chunk(&version).await.unwrap();
        version.thinking = Some("let me see".into());
        version.append_text("42");
        printer.on_chunk(&version).await.unwrap();
        printer.on_complete(&Usage::new(1, 2, 3)).await.unwrap();

        let (out, aside) = printer.into_parts();
        assert_eq!(text(out), "42");
        assert_eq!(
            text(aside),
            "[thinking] let me see\n[1 prompt + 2 completion = 3 tokens]\n"
        );
    }

    #[tokio::test]
    async fn test_printer_rewrites_changed_text() {
        let printer = printer();
        printer.on_chunk(&Version::text("{\"a\":1}")).await.unwrap();
        printer
            .on_chunk(&Version::text("```json\n{\n    \"a\": 1\n}\n```"))
            .await
            .unwrap();

        let (out, _) = printer.into_parts();
        assert_eq!(text(out), "{\"a\":1}\n```json\n{\n    \"a\": 1\n}\n```");
    }

    #[test]
    fn test_format_message_shows_version_cursor() {
        let mut message = Message::assistant("first");
        message.push_version(Version::text("second"));

        assert_eq!(format_message(&message), "## assistant (2/2)\nsecond");
    }

    #[test]
    fn test_format_usage_with_tps() {
        let usage = Usage {
            tps: Some(25),
            ..Usage::new(10, 50, 60)
        };
        assert_eq!(
            format_usage(&usage),
            "[10 prompt + 50 completion = 60 tokens, 25 tok/s]"
        );
    }
}
