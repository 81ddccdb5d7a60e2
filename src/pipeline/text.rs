//! Text Vectorizer
//!
//! Deterministic mapping from free text to a fixed-length token-id
//! sequence using the fitted training vocabulary. Follows the training
//! tokenizer's conventions: lowercase, strip punctuation, split on
//! whitespace, out-of-vocabulary words map to a reserved id, sequences
//! are right-truncated / right-padded to [`SEQUENCE_LENGTH`]. Id 0 is
//! reserved for padding and never produced by the vocabulary.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Fixed model text-input length
pub const SEQUENCE_LENGTH: usize = 50;

/// Punctuation stripped before splitting, matching the fitted tokenizer
const FILTERS: &str = "!\"#$%&()*+,-./:;<=>?@[\\]^_`{|}~\t\n";

/// Serialized vocabulary artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabArtifact {
    /// word -> token id (ids start at 1)
    pub word_index: HashMap<String, i64>,
    /// Reserved id for out-of-vocabulary words
    pub oov_index: i64,
}

#[derive(Debug, Clone)]
pub struct TextVectorizer {
    word_index: HashMap<String, i64>,
    oov_index: i64,
}

impl TextVectorizer {
    /// Build from a deserialized artifact, validating the padding-id
    /// reservation.
    pub fn from_artifact(artifact: VocabArtifact) -> Result<Self, PipelineError> {
        if artifact.oov_index == 0 {
            return Err(PipelineError::Vocabulary(
                "oov_index 0 collides with the padding id".to_string(),
            ));
        }
        if artifact.word_index.values().any(|&id| id <= 0) {
            return Err(PipelineError::Vocabulary(
                "vocabulary contains a non-positive token id".to_string(),
            ));
        }

        Ok(Self {
            word_index: artifact.word_index,
            oov_index: artifact.oov_index,
        })
    }

    /// Load the vocabulary from a JSON artifact
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading vocabulary artifact {}", path.display()))?;
        let artifact: VocabArtifact = serde_json::from_str(&raw)
            .with_context(|| format!("parsing vocabulary artifact {}", path.display()))?;
        Ok(Self::from_artifact(artifact)?)
    }

    /// Number of known words
    pub fn vocab_size(&self) -> usize {
        self.word_index.len()
    }

    /// Encode text to exactly [`SEQUENCE_LENGTH`] token ids.
    /// Empty text yields the all-zero (all-padding) sequence.
    pub fn vectorize(&self, text: &str) -> [i64; SEQUENCE_LENGTH] {
        let mut sequence = [0i64; SEQUENCE_LENGTH];

        let cleaned: String = text
            .to_lowercase()
            .chars()
            .map(|c| if FILTERS.contains(c) { ' ' } else { c })
            .collect();

        for (i, token) in cleaned
            .split_whitespace()
            .take(SEQUENCE_LENGTH)
            .enumerate()
        {
            sequence[i] = self
                .word_index
                .get(token)
                .copied()
                .unwrap_or(self.oov_index);
        }

        sequence
    }

    /// The frozen text input used during attribution: all padding
    pub fn neutral_sequence() -> [i64; SEQUENCE_LENGTH] {
        [0i64; SEQUENCE_LENGTH]
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_vectorizer() -> TextVectorizer {
        let word_index = [
            ("debt", 2i64),
            ("consolidation", 3),
            ("credit", 4),
            ("card", 5),
            ("loan", 6),
        ]
        .into_iter()
        .map(|(w, i)| (w.to_string(), i))
        .collect();

        TextVectorizer::from_artifact(VocabArtifact {
            word_index,
            oov_index: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_output_length_is_fixed() {
        let v = test_vectorizer();
        assert_eq!(v.vectorize("debt consolidation").len(), SEQUENCE_LENGTH);
        assert_eq!(v.vectorize("").len(), SEQUENCE_LENGTH);
    }

    #[test]
    fn test_empty_text_is_all_zero() {
        let v = test_vectorizer();
        assert_eq!(v.vectorize(""), [0i64; SEQUENCE_LENGTH]);
        assert_eq!(v.vectorize("   "), [0i64; SEQUENCE_LENGTH]);
    }

    #[test]
    fn test_known_tokens_and_padding() {
        let v = test_vectorizer();
        let seq = v.vectorize("Debt consolidation");
        assert_eq!(seq[0], 2);
        assert_eq!(seq[1], 3);
        assert!(seq[2..].iter().all(|&id| id == 0));
    }

    #[test]
    fn test_oov_maps_to_reserved_id() {
        let v = test_vectorizer();
        let seq = v.vectorize("zebra loan");
        assert_eq!(seq[0], 1);
        assert_eq!(seq[1], 6);
    }

    #[test]
    fn test_punctuation_is_stripped() {
        let v = test_vectorizer();
        let seq = v.vectorize("debt_consolidation, credit-card!");
        assert_eq!(&seq[..4], &[2, 3, 4, 5]);
    }

    #[test]
    fn test_long_input_truncates_never_fails() {
        let v = test_vectorizer();
        let long = "loan ".repeat(500);
        let seq = v.vectorize(&long);
        assert_eq!(seq.len(), SEQUENCE_LENGTH);
        assert!(seq.iter().all(|&id| id == 6));
    }

    #[test]
    fn test_no_interior_padding_gaps() {
        let v = test_vectorizer();
        let seq = v.vectorize("debt card zebra");
        let first_pad = seq.iter().position(|&id| id == 0).unwrap();
        assert!(seq[first_pad..].iter().all(|&id| id == 0));
    }

    #[test]
    fn test_zero_oov_index_rejected() {
        let err = TextVectorizer::from_artifact(VocabArtifact {
            word_index: HashMap::new(),
            oov_index: 0,
        })
        .unwrap_err();
        assert!(matches!(err, PipelineError::Vocabulary(_)));
    }
}
