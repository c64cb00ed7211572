//! Token accounting for one generation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Token usage reported by the endpoint, plus derived throughput.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,

    /// Completion tokens per second; never reported by the endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tps: Option<u32>,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32, total_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens,
            tps: None,
        }
    }

    /// Derive tokens/sec from the wall-clock time of the whole request.
    ///
    /// The clock starts when the request is sent, not at the first byte, so
    /// time-to-first-token is included in the figure.
    pub fn with_tps(mut self, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        self.tps = (secs > 0.0).then(|| (f64::from(self.completion_tokens) / secs).round() as u32);
        self
    }
}
