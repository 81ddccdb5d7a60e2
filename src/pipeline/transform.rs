//! Feature Transformer
//!
//! Deterministic mapping from a raw record to the encoded static feature
//! vector, consistent with the training-time column transform: standard
//! scaling for numerical columns, one-hot encoding for categorical
//! columns. Selection order comes from the fitted schema, never from the
//! request. Pure function of the fitted parameters.

use crate::error::PipelineError;
use crate::models::Record;

use super::schema::PreprocessorSchema;

/// Category value used when building the neutral background point.
/// Deliberately outside every fitted vocabulary so it encodes to an
/// all-zero one-hot block.
pub const NEUTRAL_CATEGORY: &str = "missing";

#[derive(Debug, Clone)]
pub struct FeatureTransformer {
    schema: PreprocessorSchema,
}

impl FeatureTransformer {
    pub fn new(schema: PreprocessorSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &PreprocessorSchema {
        &self.schema
    }

    /// Width of the encoded vector
    pub fn output_width(&self) -> usize {
        self.schema.output_width()
    }

    /// Post-encoding column names, aligned to `transform` output
    pub fn output_names(&self) -> Vec<String> {
        self.schema.output_names()
    }

    /// Encode one record. Fails with a schema error if any fitted column
    /// is missing or malformed; extra request fields are ignored.
    ///
    /// Unseen categories encode to an all-zero one-hot block rather than
    /// failing, matching the fitted encoder's ignore policy.
    pub fn transform(&self, record: &Record) -> Result<Vec<f32>, PipelineError> {
        let mut out = Vec::with_capacity(self.output_width());

        for col in &self.schema.numerical {
            let raw = record.number(&col.name)?;
            out.push(self.scale(raw, col.mean, col.scale));
        }

        for col in &self.schema.categorical {
            let value = record.category(&col.name)?;
            for cat in &col.categories {
                out.push(if cat == value { 1.0 } else { 0.0 });
            }
        }

        Ok(out)
    }

    /// The neutral static point: all numericals at raw zero, all
    /// categoricals at an out-of-vocabulary placeholder. Used as the
    /// fallback background distribution.
    pub fn neutral_vector(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.output_width());
        for col in &self.schema.numerical {
            out.push(self.scale(0.0, col.mean, col.scale));
        }
        for col in &self.schema.categorical {
            for cat in &col.categories {
                out.push(if cat == NEUTRAL_CATEGORY { 1.0 } else { 0.0 });
            }
        }
        out
    }

    fn scale(&self, raw: f32, mean: f32, scale: f32) -> f32 {
        let denom = if scale.abs() < 1e-8 { 1.0 } else { scale };
        (raw - mean) / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::schema::tests::test_schema;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    fn transformer() -> FeatureTransformer {
        FeatureTransformer::new(test_schema())
    }

    #[test]
    fn test_transform_width_matches_schema() {
        let t = transformer();
        let rec = record(json!({
            "loan_amnt": 24000.0, "dti": 22.0, "home_ownership": "RENT"
        }));
        let vec = t.transform(&rec).unwrap();
        assert_eq!(vec.len(), t.output_width());
    }

    #[test]
    fn test_transform_is_deterministic() {
        let t = transformer();
        let rec = record(json!({
            "loan_amnt": 24000.0, "dti": 22.0, "home_ownership": "RENT"
        }));
        assert_eq!(t.transform(&rec).unwrap(), t.transform(&rec).unwrap());
    }

    #[test]
    fn test_scaling_and_one_hot() {
        let t = transformer();
        let rec = record(json!({
            "loan_amnt": 24000.0, "dti": 18.0, "home_ownership": "OWN"
        }));
        let vec = t.transform(&rec).unwrap();
        assert!((vec[0] - 1.0).abs() < 1e-6); // (24000 - 15000) / 9000
        assert!((vec[1] - 0.0).abs() < 1e-6); // (18 - 18) / 8
        assert_eq!(&vec[2..], &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_unseen_category_encodes_to_zeros() {
        let t = transformer();
        let rec = record(json!({
            "loan_amnt": 0.0, "dti": 0.0, "home_ownership": "HOUSEBOAT"
        }));
        let vec = t.transform(&rec).unwrap();
        assert_eq!(&vec[2..], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_missing_numerical_is_schema_error() {
        let t = transformer();
        let rec = record(json!({ "dti": 1.0, "home_ownership": "RENT" }));
        let err = t.transform(&rec).unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));
    }

    #[test]
    fn test_extra_fields_ignored() {
        let t = transformer();
        let rec = record(json!({
            "loan_amnt": 0.0, "dti": 0.0, "home_ownership": "RENT",
            "unexpected": "whatever"
        }));
        assert!(t.transform(&rec).is_ok());
    }

    #[test]
    fn test_neutral_vector() {
        let t = transformer();
        let neutral = t.neutral_vector();
        assert_eq!(neutral.len(), t.output_width());
        // "missing" is outside the fitted vocabulary, so the one-hot
        // block is all zero
        assert_eq!(&neutral[2..], &[0.0, 0.0, 0.0]);
        assert!((neutral[0] - (-15000.0 / 9000.0)).abs() < 1e-6);
    }
}
