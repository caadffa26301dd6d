use serde::{Deserialize, Serialize};

/// A locally installed model, as listed by `GET /tags`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTag {
    /// Tag to pass as the `model` of a generate request, e.g. `llama2:latest`.
    pub name: String,

    /// Last modification time, kept verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,

    /// Size on disk in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// Content digest of the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl ModelTag {
    /// Create a new `ModelTag` with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modified_at: None,
            size: None,
            digest: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn name_only() {
        let tag: ModelTag = serde_json::from_value(json!({"name": "mistral:7b"})).unwrap();
        assert_eq!(tag, ModelTag::new("mistral:7b"));
        assert_eq!(
            serde_json::to_value(&tag).unwrap(),
            json!({"name": "mistral:7b"})
        );
    }
}
