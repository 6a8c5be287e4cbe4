use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DocmindError, Result};

/// Payload key holding the tenant that owns a point.
pub const OWNER_ID_FIELD: &str = "ownerId";
/// Payload key holding the source document of a point.
pub const DOCUMENT_ID_FIELD: &str = "documentId";
/// Payload key holding the chunk index within the document.
pub const PART_INDEX_FIELD: &str = "partIndex";
/// Payload key holding the chunk text.
pub const TEXT_FIELD: &str = "text";

// =============================================================================
// Identifiers
// =============================================================================

/// Authenticated tenant identifier. Never empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DocmindError::invalid("owner id cannot be empty"));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of an ingested document. Never empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DocmindError::invalid("document id cannot be empty"));
        }
        Ok(Self(value))
    }

    /// Fresh random identifier for a newly uploaded document.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! string_newtype_conversions {
    ($name:ident) => {
        impl TryFrom<String> for $name {
            type Error = DocmindError;

            fn try_from(value: String) -> Result<Self> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> String {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_newtype_conversions!(OwnerId);
string_newtype_conversions!(DocumentId);

// =============================================================================
// Pipeline values
// =============================================================================

/// An ordered window of a document's text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// 0-based position of the chunk within its document.
    pub index: usize,
    pub text: String,
}

/// Vector for a single piece of text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub vector_length: usize,
}

/// One element of a batched embedding, re-associated with its source text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResult {
    /// Index of the source text in the request batch.
    pub index: usize,
    pub vector: Vec<f32>,
    pub vector_length: usize,
    pub original_text: String,
}

/// Metadata stored alongside every vector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointPayload {
    pub owner_id: OwnerId,
    pub document_id: DocumentId,
    pub part_index: usize,
    pub text: String,
}

/// A vector plus payload ready to be written to the index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: PointPayload,
}

/// Raw nearest-neighbor hit as returned by the vector database.
///
/// Search requests only the owner, document and text fields, so the payload
/// is kept as the subset the database actually returned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: HitPayload,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitPayload {
    pub owner_id: String,
    pub document_id: String,
    pub text: String,
}

/// Projection of a stored point returned to callers of search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub document_id: String,
    pub point_id: String,
    pub text: String,
}

impl From<ScoredPoint> for SearchHit {
    fn from(point: ScoredPoint) -> Self {
        Self {
            document_id: point.payload.document_id,
            point_id: point.id,
            text: point.payload.text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_id_rejects_blank() {
        assert!(OwnerId::new("").is_err());
        assert!(OwnerId::new("   ").is_err());
        assert_eq!(OwnerId::new("u1").unwrap().as_str(), "u1");
    }

    #[test]
    fn test_document_id_generate_is_uuid() {
        let id = DocumentId::generate();
        assert!(Uuid::parse_str(id.as_str()).is_ok());
        assert_ne!(id, DocumentId::generate());
    }

    #[test]
    fn test_owner_id_deserialize_rejects_empty() {
        let err = serde_json::from_str::<OwnerId>("\"\"");
        assert!(err.is_err());
        let ok: OwnerId = serde_json::from_str("\"u2\"").unwrap();
        assert_eq!(ok.to_string(), "u2");
    }

    #[test]
    fn test_point_payload_uses_camel_case_keys() {
        let payload = PointPayload {
            owner_id: OwnerId::new("u1").unwrap(),
            document_id: DocumentId::new("d1").unwrap(),
            part_index: 0,
            text: "hello world".to_string(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "ownerId": "u1",
                "documentId": "d1",
                "partIndex": 0,
                "text": "hello world"
            })
        );
    }

    #[test]
    fn test_search_hit_from_scored_point() {
        let point = ScoredPoint {
            id: "p-1".to_string(),
            score: 0.9,
            payload: HitPayload {
                owner_id: "u1".to_string(),
                document_id: "d1".to_string(),
                text: "chunk".to_string(),
            },
        };
        let hit = SearchHit::from(point);
        assert_eq!(hit.point_id, "p-1");
        assert_eq!(hit.document_id, "d1");
        let json = serde_json::to_value(&hit).unwrap();
        assert!(json.get("pointId").is_some());
        assert!(json.get("ownerId").is_none());
    }
}
