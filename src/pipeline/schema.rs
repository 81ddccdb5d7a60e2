//! Fitted preprocessor schema
//!
//! **This schema controls the static feature layout.**
//!
//! The column order here is the single source of truth for the static
//! feature vector: every consumer (transformer, background distribution,
//! attribution labels) derives its ordering from it. It is fitted at
//! training time and loaded as a read-only artifact; the service never
//! mutates it.
//!
//! Output layout: all scaled numerical columns first, in schema order,
//! then one column per (categorical column, category) pair, in schema
//! order. Output names carry the encoder namespace (`num__`, `cat__`)
//! exactly as the training pipeline emitted them.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// A numerical column with its fitted standard-scaling parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericalColumn {
    pub name: String,
    pub mean: f32,
    pub scale: f32,
}

/// A categorical column with its fitted category vocabulary (one-hot)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoricalColumn {
    pub name: String,
    pub categories: Vec<String>,
}

/// The fitted column transform, deserialized from the preprocessor artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessorSchema {
    pub numerical: Vec<NumericalColumn>,
    pub categorical: Vec<CategoricalColumn>,
}

impl PreprocessorSchema {
    /// Load the schema from a JSON artifact
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading preprocessor artifact {}", path.display()))?;
        let schema: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing preprocessor artifact {}", path.display()))?;

        if schema.numerical.is_empty() && schema.categorical.is_empty() {
            anyhow::bail!("preprocessor artifact defines no columns");
        }
        Ok(schema)
    }

    /// Width of the encoded static feature vector
    pub fn output_width(&self) -> usize {
        self.numerical.len()
            + self
                .categorical
                .iter()
                .map(|c| c.categories.len())
                .sum::<usize>()
    }

    /// Post-encoding output column names, in vector order
    pub fn output_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.output_width());
        for col in &self.numerical {
            names.push(format!("num__{}", col.name));
        }
        for col in &self.categorical {
            for cat in &col.categories {
                names.push(format!("cat__{}_{}", col.name, cat));
            }
        }
        names
    }
}
