use serde::{Deserialize, Serialize};

use crate::types::ModelTag;

/// Response from the model catalog endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelListResponse {
    /// Installed models.
    #[serde(default)]
    pub models: Vec<ModelTag>,
}

impl ModelListResponse {
    /// Create a new `ModelListResponse`.
    pub fn new(models: Vec<ModelTag>) -> Self {
        Self { models }
    }

    /// Get the list of models.
    pub fn models(&self) -> &[ModelTag] {
        &self.models
    }

    /// Names of the listed models, in catalog order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|m| m.name.as_str())
    }

    /// The first listed model, which a fresh session selects by default.
    pub fn first_name(&self) -> Option<&str> {
        self.names().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_list_response_deserialization() {
        let json = serde_json::json!({
            "models": [
                {
                    "name": "llama2:latest",
                    "modified_at": "2023-08-02T17:02:23.713454393-07:00",
                    "size": 3791730596u64,
                    "digest": "fe938a131f40"
                },
                {"name": "codellama:13b"}
            ]
        });
        let response: ModelListResponse = serde_json::from_value(json).unwrap();

        assert_eq!(response.models().len(), 2);
        assert_eq!(
            response.names().collect::<Vec<_>>(),
            vec!["llama2:latest", "codellama:13b"]
        );
        assert_eq!(response.first_name(), Some("llama2:latest"));
        assert_eq!(response.models[0].size, Some(3791730596));
    }

    #[test]
    fn test_empty_catalog() {
        let response: ModelListResponse = serde_json::from_str("{}").unwrap();
        assert!(response.models().is_empty());
        assert_eq!(response.first_name(), None);
    }
}
