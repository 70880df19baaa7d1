use semantic::EmbeddingVector;
use serde::Serialize;

use crate::catalog::FALLBACK_SPECIALTY;
use crate::error::IndexError;
use crate::similarity::cosine_similarity;

/// Specialty name -> embedding, kept in catalog order.
///
/// Every entry shares one dimension; insertion enforces it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogVectorIndex {
    entries: Vec<(String, EmbeddingVector)>,
}

impl CatalogVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Builds an index from `(name, vector)` pairs, preserving their order.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, IndexError>
    where
        I: IntoIterator<Item = (S, EmbeddingVector)>,
        S: Into<String>,
    {
        let mut index = Self::new();
        for (name, vector) in entries {
            index.insert(name, vector)?;
        }
        Ok(index)
    }

    /// Appends one specialty vector.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        vector: EmbeddingVector,
    ) -> Result<(), IndexError> {
        let name = name.into();
        if vector.is_empty() {
            return Err(IndexError::EmptyVector(name));
        }
        if let Some(expected) = self.dimension() {
            if vector.len() != expected {
                return Err(IndexError::DimensionMismatch {
                    specialty: name,
                    expected,
                    got: vector.len(),
                });
            }
        }
        if self.get(&name).is_some() {
            return Err(IndexError::Duplicate(name));
        }
        self.entries.push((name, vector));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&[f32]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// Shared vector dimension, `None` while empty.
    pub fn dimension(&self) -> Option<usize> {
        self.entries.first().map(|(_, v)| v.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f32])> {
        self.entries
            .iter()
            .map(|(name, vector)| (name.as_str(), vector.as_slice()))
    }
}

/// Best-scoring specialty for a query.
///
/// `score` is `None` only when there were no candidates and the fallback name
/// was returned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankOutcome {
    pub specialty: String,
    pub score: Option<f32>,
}

impl RankOutcome {
    pub fn is_fallback(&self) -> bool {
        self.score.is_none()
    }
}

/// Scores every candidate in order and keeps the first strictly-greater one.
///
/// Ties resolve to the earliest specialty. The first candidate always takes
/// the slot, whatever its score.
pub fn rank(query: &[f32], candidates: &CatalogVectorIndex) -> RankOutcome {
    let mut best: Option<(&str, f32)> = None;

    for (name, vector) in candidates.iter() {
        let score = cosine_similarity(query, vector);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((name, score)),
        }
    }

    match best {
        Some((name, score)) => RankOutcome {
            specialty: name.to_string(),
            score: Some(score),
        },
        None => RankOutcome {
            specialty: FALLBACK_SPECIALTY.to_string(),
            score: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ab_index() -> CatalogVectorIndex {
        CatalogVectorIndex::from_entries([("A", vec![1.0, 0.0]), ("B", vec![0.0, 1.0])]).unwrap()
    }

    #[test]
    fn exact_match_scores_one() {
        let outcome = rank(&[1.0, 0.0], &ab_index());
        assert_eq!(outcome.specialty, "A");
        assert!((outcome.score.unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn nearest_wins() {
        assert_eq!(rank(&[0.9, 0.1], &ab_index()).specialty, "A");
        assert_eq!(rank(&[0.1, 0.9], &ab_index()).specialty, "B");
    }

    #[test]
    fn tie_goes_to_earliest() {
        let outcome = rank(&[0.5, 0.5], &ab_index());
        assert_eq!(outcome.specialty, "A");

        let reversed =
            CatalogVectorIndex::from_entries([("B", vec![0.0, 1.0]), ("A", vec![1.0, 0.0])])
                .unwrap();
        assert_eq!(rank(&[0.5, 0.5], &reversed).specialty, "B");
    }

    #[test]
    fn first_candidate_wins_even_when_opposite() {
        let index = CatalogVectorIndex::from_entries([("Only", vec![-1.0, 0.0])]).unwrap();
        let outcome = rank(&[1.0, 0.0], &index);
        assert_eq!(outcome.specialty, "Only");
        assert!((outcome.score.unwrap() + 1.0).abs() < 1e-6);
    }

    #[test]
    fn empty_candidates_fall_back() {
        let outcome = rank(&[1.0, 0.0], &CatalogVectorIndex::new());
        assert_eq!(outcome.specialty, FALLBACK_SPECIALTY);
        assert!(outcome.is_fallback());
    }

    #[test]
    fn index_rejects_mismatched_dimension() {
        let err = CatalogVectorIndex::from_entries([("A", vec![1.0, 0.0]), ("B", vec![1.0])])
            .unwrap_err();
        assert_eq!(
            err,
            IndexError::DimensionMismatch {
                specialty: "B".into(),
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn index_rejects_duplicates_and_empty() {
        let mut index = ab_index();
        assert_eq!(
            index.insert("A", vec![0.5, 0.5]),
            Err(IndexError::Duplicate("A".into()))
        );
        assert_eq!(
            index.insert("C", Vec::new()),
            Err(IndexError::EmptyVector("C".into()))
        );
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn index_preserves_order() {
        let index = ab_index();
        let names: Vec<&str> = index.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["A", "B"]);
        assert_eq!(ab_index().dimension(), Some(2));
    }
}
