//! The structured terminal output of a run.

use serde::{Deserialize, Serialize};

/// The kind of record an id points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Product,
    Order,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Order => "order",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference to a record the UI renders as a card next to the answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embedding {
    #[serde(rename = "type")]
    pub kind: ResourceType,
    pub id: String,
}

/// What the user eventually sees: a direct answer, or a request to pick
/// between several candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StructuredResponse {
    Answer {
        response: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        embeddings: Vec<Embedding>,
    },
    Ambiguity {
        response: String,
        id_array: Vec<String>,
        #[serde(rename = "resourceType")]
        resource_type: ResourceType,
    },
}

impl StructuredResponse {
    /// A plain answer without embeddings.
    pub fn answer(response: impl Into<String>) -> Self {
        Self::Answer {
            response: response.into(),
            embeddings: Vec::new(),
        }
    }

    /// The user-facing text.
    pub fn text(&self) -> &str {
        match self {
            Self::Answer { response, .. } | Self::Ambiguity { response, .. } => response,
        }
    }

    /// The discriminant as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Answer { .. } => "answer",
            Self::Ambiguity { .. } => "ambiguity",
        }
    }

    /// Serialize to the wire form that the UI and conversation store keep.
    pub fn to_json(&self) -> String {
        // A tagged enum of strings cannot fail to serialize
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_wire_shape() {
        let r = StructuredResponse::Answer {
            response: "Shipped".into(),
            embeddings: vec![Embedding { kind: ResourceType::Order, id: "o1".into() }],
        };
        let v: serde_json::Value = serde_json::from_str(&r.to_json()).unwrap();
        assert_eq!(v["type"], "answer");
        assert_eq!(v["embeddings"][0]["type"], "order");
        assert_eq!(v["embeddings"][0]["id"], "o1");
    }

    #[test]
    fn ambiguity_uses_camel_case_resource_type() {
        let r = StructuredResponse::Ambiguity {
            response: "Which one?".into(),
            id_array: vec!["a".into(), "b".into()],
            resource_type: ResourceType::Product,
        };
        let v: serde_json::Value = serde_json::from_str(&r.to_json()).unwrap();
        assert_eq!(v["type"], "ambiguity");
        assert_eq!(v["resourceType"], "product");
        assert_eq!(v["id_array"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn answer_without_embeddings_omits_field() {
        let json = StructuredResponse::answer("hi").to_json();
        assert!(!json.contains("embeddings"));
    }
}
