//! Incremental parser for inline `<think>...</think>` reasoning.
//!
//! The legacy reasoning model streams plain text where the reasoning is
//! wrapped in tags. Deltas can split anywhere, including inside a tag, so the
//! parser buffers and only commits text it knows cannot be part of a tag.
//! For any split of the same text the resulting answer is identical.

use playground_core::{ModelInfo, Version};
use tracing::{debug, trace};

use crate::request::{THINK_CLOSE, THINK_OPEN};

/// Where the parser is in the stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReasoningStep {
    /// Waiting for `<think>`; text before it is discarded.
    #[default]
    SearchingOpen,
    /// Inside the reasoning block, waiting for `</think>`.
    InsideThinking,
    /// Tags resolved (or never expected); text goes straight to the answer.
    Resolved,
}

/// Parser state carried across the deltas of one generation.
#[derive(Debug, Clone, Default)]
pub struct ReasoningState {
    step: ReasoningStep,
    buffer: String,
    /// Set when the block closed at a delta boundary; the answer's leading
    /// whitespace is still to come.
    trim_answer_start: bool,
}

impl ReasoningState {
    pub fn new(step: ReasoningStep) -> Self {
        Self {
            step,
            buffer: String::new(),
            trim_answer_start: false,
        }
    }

    /// Initial state for a model: only the legacy model needs tag parsing.
    pub fn for_model(model: &ModelInfo) -> Self {
        if model.is_reasoning() && model.uses_legacy_tags() {
            Self::new(ReasoningStep::SearchingOpen)
        } else {
            Self::new(ReasoningStep::Resolved)
        }
    }

    pub fn step(&self) -> ReasoningStep {
        self.step
    }

    pub fn is_resolved(&self) -> bool {
        self.step == ReasoningStep::Resolved
    }

    /// Text received but not yet committed.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// Consume one text delta. Once resolved, deltas go to the answer.
    pub fn consume(&mut self, delta: &str, answer: &mut Version) {
        if delta.is_empty() {
            return;
        }
        if self.is_resolved() {
            self.push_answer(delta, answer);
            return;
        }
        self.buffer.push_str(delta);

        if self.step == ReasoningStep::SearchingOpen {
            let Some(start) = self.buffer.find(THINK_OPEN) else {
                return;
            };
            if start > 0 {
                trace!(dropped = start, "Discarding text before reasoning block");
            }
            self.buffer = self.buffer[start + THINK_OPEN.len()..]
                .trim_start()
                .to_string();
            self.step = ReasoningStep::InsideThinking;
            answer.thinking = Some(String::new());
        }

        let thinking = answer.thinking.get_or_insert_with(String::new);
        match self.buffer.find(THINK_CLOSE) {
            Some(end) => {
                commit(thinking, &self.buffer[..end]);
                *thinking = thinking.trim().to_string();

                let remainder = self.buffer[end + THINK_CLOSE.len()..]
                    .trim_start()
                    .to_string();
                self.buffer.clear();
                self.step = ReasoningStep::Resolved;
                self.trim_answer_start = remainder.is_empty();
                debug!(thinking_len = thinking.len(), "Reasoning block closed");

                answer.append_text(&remainder);
            }
            None => {
                let held = partial_tag_suffix(&self.buffer, THINK_CLOSE);
                let commit_len = self.buffer.len() - held;
                commit(thinking, &self.buffer[..commit_len]);
                self.buffer.drain(..commit_len);
            }
        }
    }

    /// End of stream: flush whatever is still buffered. Returns whether the
    /// answer changed.
    ///
    /// If no `<think>` ever arrived the buffered text is the answer. If the
    /// block never closed, any held partial tag is reasoning text after all.
    pub fn finish(&mut self, answer: &mut Version) -> bool {
        let buffered = std::mem::take(&mut self.buffer);
        let step = std::mem::replace(&mut self.step, ReasoningStep::Resolved);
        if buffered.is_empty() {
            return false;
        }
        match step {
            ReasoningStep::SearchingOpen => {
                debug!("No reasoning block in response, keeping text as answer");
                answer.append_text(&buffered);
            }
            ReasoningStep::InsideThinking => {
                let thinking = answer.thinking.get_or_insert_with(String::new);
                commit(thinking, &buffered);
                *thinking = thinking.trim().to_string();
            }
            ReasoningStep::Resolved => {}
        }
        true
    }

    fn push_answer(&mut self, delta: &str, answer: &mut Version) {
        let delta = if self.trim_answer_start {
            delta.trim_start()
        } else {
            delta
        };
        if !delta.is_empty() {
            self.trim_answer_start = false;
            answer.append_text(delta);
        }
    }
}

fn commit(thinking: &mut String, text: &str) {
    if thinking.is_empty() {
        thinking.push_str(text.trim_start());
    } else {
        thinking.push_str(text);
    }
}

/// Length of the longest suffix of `text` that is a proper prefix of `tag`.
fn partial_tag_suffix(text: &str, tag: &str) -> usize {
    (1..tag.len())
        .rev()
        .find(|&len| text.ends_with(&tag[..len]))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(deltas: &[&str]) -> Version {
        let mut answer = Version::empty_answer();
        let mut state = ReasoningState::new(ReasoningStep::SearchingOpen);
        for delta in deltas {
            state.consume(delta, &mut answer);
        }
        state.finish(&mut answer);
        answer
    }

    #[test]
    fn test_single_delta() {
        let answer = run(&["<think>why</think>answer"]);
        assert_eq!(answer.thinking.as_deref(), Some("why"));
        assert_eq!(answer.text_content(), "answer");
    }

    #[test]
    fn test_every_split_point_gives_same_result() {
        let text = "prefix<think>  step one\nstep two </think>\nFinal answer.";
        let expected = run(&[text]);
        assert_eq!(expected.thinking.as_deref(), Some("step one\nstep two"));
        assert_eq!(expected.text_content(), "Final answer.");

        for i in 1..text.len() {
            let parts = [&text[..i], &text[i..]];
            assert_eq!(run(&parts), expected, "split at {i}");
        }
    }

    #[test]
    fn test_every_three_way_split_gives_same_result() {
        let text = "prefix<think>reasoning text</think>final answer";

        for i in 1..text.len() {
            for j in i + 1..text.len() {
                let answer = run(&[&text[..i], &text[i..j], &text[j..]]);
                assert_eq!(
                    answer.thinking.as_deref(),
                    Some("reasoning text"),
                    "split at {i}/{j}"
                );
                assert_eq!(answer.text_content(), "final answer", "split at {i}/{j}");
            }
        }
    }

    #[test]
    fn test_empty_delta_changes_nothing() {
        let mut answer = Version::empty_answer();
        let mut state = ReasoningState::new(ReasoningStep::SearchingOpen);
        state.consume("<think>ab</th", &mut answer);

        let step = state.step();
        let buffered = state.buffered().to_string();
        let before = answer.clone();

        state.consume("", &mut answer);

        assert_eq!(state.step(), step);
        assert_eq!(state.buffered(), buffered);
        assert_eq!(answer, before);
        assert_eq!(answer.thinking.as_deref(), Some("ab"));
        assert_eq!(state.buffered(), "</th");
    }

    #[test]
    fn test_empty_delta_before_open_tag_changes_nothing() {
        let mut answer = Version::empty_answer();
        let mut state = ReasoningState::new(ReasoningStep::SearchingOpen);
        state.consume("pre", &mut answer);
        let before = answer.clone();

        state.consume("", &mut answer);

        assert_eq!(state.step(), ReasoningStep::SearchingOpen);
        assert_eq!(state.buffered(), "pre");
        assert_eq!(answer, before);
    }

    #[test]
    fn test_character_by_character() {
        let text = "<think>a</think>b";
        let chars: Vec<String> = text.chars().map(String::from).collect();
        let deltas: Vec<&str> = chars.iter().map(String::as_str).collect();

        let answer = run(&deltas);
        assert_eq!(answer.thinking.as_deref(), Some("a"));
        assert_eq!(answer.text_content(), "b");
    }

    #[test]
    fn test_open_and_close_across_three_deltas() {
        let answer = run(&["<thi", "nk>reasoning</th", "ink>done"]);
        assert_eq!(answer.thinking.as_deref(), Some("reasoning"));
        assert_eq!(answer.text_content(), "done");
    }

    #[test]
    fn test_thinking_visible_while_streaming() {
        let mut answer = Version::empty_answer();
        let mut state = ReasoningState::new(ReasoningStep::SearchingOpen);

        state.consume("<think>partial thought</", &mut answer);
        assert_eq!(state.step(), ReasoningStep::InsideThinking);
        assert_eq!(answer.thinking.as_deref(), Some("partial thought"));
        assert_eq!(state.buffered(), "</");
    }

    #[test]
    fn test_text_without_tags_is_kept() {
        let answer = run(&["no reasoning ", "here"]);
        assert_eq!(answer.thinking, None);
        assert_eq!(answer.text_content(), "no reasoning here");
    }

    #[test]
    fn test_unclosed_block_flushes_held_suffix() {
        let answer = run(&["<think>cut off <"]);
        assert_eq!(answer.thinking.as_deref(), Some("cut off <"));
        assert_eq!(answer.text_content(), "");
    }

    #[test]
    fn test_resolved_state_appends_directly() {
        let mut answer = Version::empty_answer();
        let mut state = ReasoningState::new(ReasoningStep::Resolved);
        state.consume("  plain", &mut answer);
        assert_eq!(answer.text_content(), "  plain");
        assert_eq!(answer.thinking, None);
    }

    #[test]
    fn test_for_model() {
        let legacy = ModelInfo::infer(playground_core::LEGACY_THINK_TAG_MODEL);
        assert_eq!(
            ReasoningState::for_model(&legacy).step(),
            ReasoningStep::SearchingOpen
        );
        let structured = ModelInfo::infer("magistral-small-latest");
        assert!(ReasoningState::for_model(&structured).is_resolved());
    }
}
