//! Background Distribution
//!
//! The "absent feature" baseline for attribution: a small weighted set of
//! static feature vectors, built once at startup and shared read-only.
//!
//! Two constructions exist. The neutral single point (raw-zero numericals,
//! out-of-vocabulary categoricals) needs no data but can make attributions
//! misleading for features whose training distribution sits far from zero.
//! The summarized form compresses real records into a few weighted k-means
//! centroids and is the preferred production wiring; it keeps explanation
//! cost proportional to the centroid count rather than the dataset size.

use std::path::Path;

use anyhow::Context;
use ndarray::Array2;
use rand::prelude::SliceRandom;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::models::Record;
use crate::pipeline::transform::FeatureTransformer;

const KMEANS_ITERATIONS: usize = 25;

/// Weighted reference rows for the attribution engine
#[derive(Debug, Clone)]
pub struct Background {
    /// (rows, feature width)
    data: Array2<f32>,
    /// Per-row weights, summing to 1
    weights: Vec<f64>,
}

impl Background {
    /// Single neutral reference point
    pub fn neutral(transformer: &FeatureTransformer) -> Self {
        let neutral = transformer.neutral_vector();
        let width = neutral.len();
        Self {
            data: Array2::from_shape_vec((1, width), neutral)
                .expect("neutral vector length matches its own width"),
            weights: vec![1.0],
        }
    }

    /// Summarize raw records from a JSON artifact into `clusters` weighted
    /// centroids
    pub fn from_records_file(
        path: impl AsRef<Path>,
        transformer: &FeatureTransformer,
        clusters: usize,
        seed: u64,
    ) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading background data {}", path.display()))?;
        let records: Vec<Record> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing background data {}", path.display()))?;

        if records.is_empty() {
            anyhow::bail!("background data {} is empty", path.display());
        }

        let mut rows = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let vector = transformer
                .transform(record)
                .with_context(|| format!("background record {i} does not match the schema"))?;
            rows.push(vector);
        }

        Ok(Self::summarize(rows, clusters, seed))
    }

    /// Weighted k-means summary of transformed rows. With fewer rows than
    /// clusters the rows are used as-is, uniformly weighted.
    pub fn summarize(rows: Vec<Vec<f32>>, clusters: usize, seed: u64) -> Self {
        assert!(!rows.is_empty(), "background rows cannot be empty");
        let n = rows.len();
        let width = rows[0].len();
        let k = clusters.max(1).min(n);

        if k == n {
            let weights = vec![1.0 / n as f64; n];
            let flat: Vec<f32> = rows.into_iter().flatten().collect();
            return Self {
                data: Array2::from_shape_vec((n, width), flat)
                    .expect("row lengths are uniform"),
                weights,
            };
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(&mut rng);
        let mut centroids: Vec<Vec<f32>> =
            indices[..k].iter().map(|&i| rows[i].clone()).collect();

        let mut assignment = vec![0usize; n];
        for _ in 0..KMEANS_ITERATIONS {
            // Assign
            for (i, row) in rows.iter().enumerate() {
                assignment[i] = centroids
                    .iter()
                    .enumerate()
                    .map(|(c, centroid)| (c, squared_distance(row, centroid)))
                    .min_by(|a, b| a.1.total_cmp(&b.1))
                    .map(|(c, _)| c)
                    .unwrap_or(0);
            }

            // Update; empty clusters keep their previous centroid
            let mut sums = vec![vec![0.0f32; width]; k];
            let mut counts = vec![0usize; k];
            for (i, row) in rows.iter().enumerate() {
                let c = assignment[i];
                counts[c] += 1;
                for (s, v) in sums[c].iter_mut().zip(row) {
                    *s += v;
                }
            }
            for c in 0..k {
                if counts[c] > 0 {
                    for (j, s) in sums[c].iter().enumerate() {
                        centroids[c][j] = s / counts[c] as f32;
                    }
                }
            }
        }

        let mut counts = vec![0usize; k];
        for &c in &assignment {
            counts[c] += 1;
        }
        let weights: Vec<f64> = counts.iter().map(|&c| c as f64 / n as f64).collect();

        let flat: Vec<f32> = centroids.into_iter().flatten().collect();
        Self {
            data: Array2::from_shape_vec((k, width), flat).expect("centroid lengths are uniform"),
            weights,
        }
    }

    pub fn rows(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
