use serde::{Deserialize, Serialize};

/// Opaque continuation state returned by the backend.
///
/// The backend hands this back on the final chunk of every generation; sending
/// it with the next request continues the same conversation without resending
/// earlier turns.  The client never interprets the values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context(Vec<i64>);

impl Context {
    /// Create a new `Context` from backend tokens.
    pub fn new(tokens: Vec<i64>) -> Self {
        Self(tokens)
    }

    /// The raw tokens.
    pub fn tokens(&self) -> &[i64] {
        &self.0
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the backend returned no tokens.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<i64>> for Context {
    fn from(tokens: Vec<i64>) -> Self {
        Self::new(tokens)
    }
}

impl From<Context> for Vec<i64> {
    fn from(context: Context) -> Self {
        context.0
    }
}
