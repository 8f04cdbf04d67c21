//! Knowledge system type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A fault-knowledge entry, as held by the system of record.
///
/// Identity is immutable: an id is never reassigned. The `symptoms` text is
/// the field embedded for retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    /// Unique entry identifier
    pub id: i64,

    /// Category name (e.g. "network", "database")
    pub category: String,

    /// Short title for the fault
    pub title: String,

    /// Symptom description; this is what gets embedded
    pub symptoms: String,

    /// Remediation text
    pub solution: String,

    /// When this entry was created
    pub created_at: DateTime<Utc>,

    /// When this entry was last updated
    pub updated_at: DateTime<Utc>,
}

/// One row of the vector index.
///
/// `id` is the stringified knowledge id; exactly one live record exists per
/// knowledge entry. The symptoms text is stored alongside the embedding so
/// search results carry it without a round trip to the knowledge store.
#[derive(Debug, Clone)]
pub struct IndexedRecord {
    /// Index key (stringified knowledge id)
    pub id: String,

    /// Knowledge entry id
    pub knowledge_id: i64,

    /// Category name
    pub category: String,

    /// Entry title
    pub title: String,

    /// Remediation text
    pub solution: String,

    /// Symptoms text (the embedded document)
    pub symptoms: String,

    /// Embedding vector of the symptoms text
    pub embedding: Vec<f32>,
}

impl IndexedRecord {
    /// Build an index record from a knowledge entry and its embedding.
    pub fn from_entry(entry: &KnowledgeEntry, embedding: Vec<f32>) -> Self {
        Self {
            id: entry.id.to_string(),
            knowledge_id: entry.id,
            category: entry.category.clone(),
            title: entry.title.clone(),
            solution: entry.solution.clone(),
            symptoms: entry.symptoms.clone(),
            embedding,
        }
    }
}

/// A raw search hit from the vector index: record fields plus the engine's
/// cosine distance. Hits arrive in the engine's nearest-first order.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub knowledge_id: i64,
    pub category: String,
    pub title: String,
    pub solution: String,
    pub symptoms: String,
    pub distance: f32,
}

/// A retrieval match with a derived similarity score.
///
/// The score is a percentage: 100 means identical, 0 means orthogonal, and
/// values below zero are possible for distances above 1. It is computed
/// fresh per query and never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedMatch {
    pub id: i64,
    pub category: String,
    pub title: String,
    pub symptoms: String,
    pub solution: String,
    pub score: f32,
}

/// Map a cosine distance to the similarity percentage used throughout the
/// diagnosis pipeline.
pub fn distance_to_score(distance: f32) -> f32 {
    (1.0 - distance) * 100.0
}

impl RankedMatch {
    /// Build a ranked match from a raw index hit.
    pub fn from_hit(hit: SearchHit) -> Self {
        Self {
            id: hit.knowledge_id,
            category: hit.category,
            title: hit.title,
            symptoms: hit.symptoms,
            solution: hit.solution,
            score: distance_to_score(hit.distance),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to_score_endpoints() {
        assert_eq!(distance_to_score(0.0), 100.0);
        assert_eq!(distance_to_score(1.0), 0.0);
        // Distances beyond 1 produce negative scores
        assert!(distance_to_score(1.2) < 0.0);
    }

    #[test]
    fn test_distance_to_score_monotonic() {
        let distances = [0.0_f32, 0.1, 0.25, 0.5, 0.9, 1.0, 1.5];
        let scores: Vec<f32> = distances.iter().map(|d| distance_to_score(*d)).collect();
        for pair in scores.windows(2) {
            assert!(pair[0] > pair[1], "score must decrease as distance grows");
        }
    }

    #[test]
    fn test_record_from_entry() {
        let entry = KnowledgeEntry {
            id: 42,
            category: "network".to_string(),
            title: "Switch port flapping".to_string(),
            symptoms: "intermittent packet loss on uplink".to_string(),
            solution: "replace the SFP module".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let record = IndexedRecord::from_entry(&entry, vec![0.1, 0.2]);
        assert_eq!(record.id, "42");
        assert_eq!(record.knowledge_id, 42);
        assert_eq!(record.symptoms, entry.symptoms);
        assert_eq!(record.embedding.len(), 2);
    }
}
