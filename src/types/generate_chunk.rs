use serde::{Deserialize, Serialize};

/// One record of a streamed generate response.
///
/// The backend emits exactly one JSON object per body chunk.  Intermediate
/// chunks carry a `response` fragment; the final chunk has `done: true`, the
/// new continuation `context`, and timing statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateChunk {
    /// Model that produced the chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Backend timestamp, kept verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Text fragment to append to the turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    /// True on the last chunk of the generation.
    #[serde(default)]
    pub done: bool,

    /// Continuation state, present on the last chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<i64>>,

    /// Why generation stopped, e.g. `"stop"` or `"length"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,

    /// Wall time of the whole request, in nanoseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<u64>,

    /// Time spent loading the model, in nanoseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_duration: Option<u64>,

    /// Number of prompt tokens evaluated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,

    /// Time spent evaluating the prompt, in nanoseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_duration: Option<u64>,

    /// Number of tokens generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,

    /// Time spent generating, in nanoseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_duration: Option<u64>,

    /// In-band error reported by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerateChunk {
    /// The text fragment, if present and non-empty.
    pub fn fragment(&self) -> Option<&str> {
        self.response.as_deref().filter(|text| !text.is_empty())
    }
}

/// Statistics reported on the final chunk of a generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Model that produced the response.
    pub model: Option<String>,
    /// Why generation stopped.
    pub done_reason: Option<String>,
    /// Wall time of the whole request, in nanoseconds.
    pub total_duration: Option<u64>,
    /// Time spent loading the model, in nanoseconds.
    pub load_duration: Option<u64>,
    /// Number of prompt tokens evaluated.
    pub prompt_eval_count: Option<u64>,
    /// Number of tokens generated.
    pub eval_count: Option<u64>,
    /// Time spent generating, in nanoseconds.
    pub eval_duration: Option<u64>,
}

impl GenerationStats {
    /// Extract statistics from a chunk.  Returns `None` if it carries none.
    pub fn from_chunk(chunk: &GenerateChunk) -> Option<Self> {
        let stats = Self {
            model: chunk.model.clone(),
            done_reason: chunk.done_reason.clone(),
            total_duration: chunk.total_duration,
            load_duration: chunk.load_duration,
            prompt_eval_count: chunk.prompt_eval_count,
            eval_count: chunk.eval_count,
            eval_duration: chunk.eval_duration,
        };
        if stats == Self::default() {
            None
        } else {
            Some(stats)
        }
    }

    /// Generated tokens per second, when the backend reported enough to compute it.
    pub fn tokens_per_second(&self) -> Option<f64> {
        match (self.eval_count, self.eval_duration) {
            (Some(count), Some(nanos)) if nanos > 0 => {
                Some(count as f64 / (nanos as f64 / 1_000_000_000.0))
            }
            _ => None,
        }
    }
}
