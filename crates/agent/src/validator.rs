//! Output validation for the model's final turn.
//!
//! The model is asked for a single JSON object. Its text is untrusted, so
//! it is parsed into a loose `Value` first and checked field by field
//! before it becomes a [`StructuredResponse`].

use hydra_core::response::{Embedding, ResourceType, StructuredResponse};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::EngineLimits;

/// Why a final turn was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("response is not valid JSON: {0}")]
    NotJson(String),

    #[error("response is not a JSON object")]
    NotAnObject,

    #[error("field `{0}` is missing or has the wrong type")]
    MissingField(&'static str),

    #[error("unknown response type `{0}`")]
    UnknownType(String),

    #[error("ambiguity lists no candidates")]
    NoCandidates,

    #[error("ambiguity lists {count} candidates, at most {max} allowed")]
    TooManyCandidates { count: usize, max: usize },

    #[error("candidate {index} is not a non-empty string")]
    InvalidCandidate { index: usize },

    #[error("invalid resource type `{0}`")]
    InvalidResourceType(String),

    #[error("embedding {index} is invalid: {reason}")]
    InvalidEmbedding { index: usize, reason: String },
}

/// Validate the raw text of a final turn.
pub fn validate(raw: &str, limits: &EngineLimits) -> Result<StructuredResponse, ValidationError> {
    let value: Value = serde_json::from_str(raw.trim()).map_err(|e| ValidationError::NotJson(e.to_string()))?;
    let Value::Object(obj) = value else {
        return Err(ValidationError::NotAnObject);
    };

    let kind = string_field(&obj, "type")?;
    match kind {
        "answer" => validate_answer(&obj, limits),
        "ambiguity" => validate_ambiguity(&obj, limits),
        other => Err(ValidationError::UnknownType(other.to_string())),
    }
}

fn string_field<'a>(obj: &'a Map<String, Value>, field: &'static str) -> Result<&'a str, ValidationError> {
    obj.get(field)
        .and_then(Value::as_str)
        .ok_or(ValidationError::MissingField(field))
}

fn resource_type(value: &str) -> Option<ResourceType> {
    match value {
        "product" => Some(ResourceType::Product),
        "order" => Some(ResourceType::Order),
        _ => None,
    }
}

fn validate_answer(obj: &Map<String, Value>, limits: &EngineLimits) -> Result<StructuredResponse, ValidationError> {
    let response = string_field(obj, "response")?.to_string();

    let entries: &[Value] = match obj.get("embeddings") {
        None | Some(Value::Null) => &[],
        Some(Value::Array(items)) => items,
        Some(_) => return Err(ValidationError::MissingField("embeddings")),
    };

    // Truncate first: entries past the cap never reach the user.
    let kept = &entries[..entries.len().min(limits.max_embeddings)];
    let embeddings = kept
        .iter()
        .enumerate()
        .map(|(index, entry)| parse_embedding(index, entry))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(StructuredResponse::Answer { response, embeddings })
}

fn parse_embedding(index: usize, entry: &Value) -> Result<Embedding, ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidEmbedding {
        index,
        reason: reason.to_string(),
    };

    let obj = entry.as_object().ok_or_else(|| invalid("not an object"))?;
    let kind = obj.get("type").and_then(Value::as_str).ok_or_else(|| invalid("missing type"))?;
    let kind = resource_type(kind).ok_or_else(|| invalid("type must be product or order"))?;
    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| invalid("missing id"))?;

    Ok(Embedding { kind, id: id.to_string() })
}

fn validate_ambiguity(obj: &Map<String, Value>, limits: &EngineLimits) -> Result<StructuredResponse, ValidationError> {
    let response = string_field(obj, "response")?.to_string();

    let candidates = obj
        .get("id_array")
        .and_then(Value::as_array)
        .ok_or(ValidationError::MissingField("id_array"))?;
    if candidates.is_empty() {
        return Err(ValidationError::NoCandidates);
    }
    if candidates.len() > limits.max_ambiguity_candidates {
        return Err(ValidationError::TooManyCandidates {
            count: candidates.len(),
            max: limits.max_ambiguity_candidates,
        });
    }
    let id_array = candidates
        .iter()
        .enumerate()
        .map(|(index, c)| {
            c.as_str()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .ok_or(ValidationError::InvalidCandidate { index })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let raw_type = string_field(obj, "resourceType")?;
    let resource_type = resource_type(raw_type).ok_or_else(|| ValidationError::InvalidResourceType(raw_type.to_string()))?;

    Ok(StructuredResponse::Ambiguity {
        response,
        id_array,
        resource_type,
    })
}
