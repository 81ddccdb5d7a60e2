//! Inference request record
//!
//! A record is one applicant's raw fields. The set of required fields is
//! defined by the fitted preprocessor schema, not at compile time, so the
//! record keeps the raw JSON map and exposes typed accessors; the feature
//! transformer enforces the schema when it selects columns.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::PipelineError;

/// One applicant request: field name -> raw JSON value.
///
/// Unknown extra fields are ignored; missing expected fields surface as
/// `PipelineError::Schema` from the typed accessors.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Free-text field. Missing or non-string values are treated as empty
    /// text rather than a hard failure.
    pub fn text(&self, field: &str) -> &str {
        self.fields
            .get(field)
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    /// The model's text input: title and purpose joined with a space,
    /// missing title falling back to empty.
    pub fn combined_text(&self) -> String {
        format!("{} {}", self.text("title"), self.text("purpose"))
    }

    /// Required numerical field
    pub fn number(&self, field: &str) -> Result<f32, PipelineError> {
        let value = self
            .fields
            .get(field)
            .ok_or_else(|| PipelineError::Schema(format!("missing numerical field '{field}'")))?;

        value
            .as_f64()
            .map(|v| v as f32)
            .ok_or_else(|| PipelineError::Schema(format!("field '{field}' is not a number")))
    }

    /// Required categorical field
    pub fn category(&self, field: &str) -> Result<&str, PipelineError> {
        let value = self
            .fields
            .get(field)
            .ok_or_else(|| PipelineError::Schema(format!("missing categorical field '{field}'")))?;

        value
            .as_str()
            .ok_or_else(|| PipelineError::Schema(format!("field '{field}' is not a string")))
    }
}
