use serde::{Deserialize, Serialize};

/// A user's judgement of a server turn.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackMark {
    /// No feedback given.
    #[default]
    None,

    /// Thumbs up.
    Up,

    /// Thumbs down.  Marking a turn down opens it for revision.
    Down,
}

impl std::str::FromStr for FeedbackMark {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(FeedbackMark::None),
            "up" => Ok(FeedbackMark::Up),
            "down" => Ok(FeedbackMark::Down),
            _ => Err(format!(
                "Invalid feedback mark: {s}. Valid options: none, up, down"
            )),
        }
    }
}

impl std::fmt::Display for FeedbackMark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedbackMark::None => write!(f, "none"),
            FeedbackMark::Up => write!(f, "up"),
            FeedbackMark::Down => write!(f, "down"),
        }
    }
}
