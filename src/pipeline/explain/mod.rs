//! Attribution Engine - Kernel SHAP
//!
//! Produces one signed contribution per static feature column, explaining
//! how the request's static vector shifts the predicted probability
//! relative to the background distribution. Text input is frozen to the
//! all-padding neutral sequence throughout; only static features are
//! attributed.
//!
//! The predictor is treated as a black box: coalitions of "present"
//! (request value) vs "absent" (background value) features are evaluated
//! through it, and a weighted least-squares fit with the efficiency
//! constraint substituted out recovers the contributions, so
//! `sum(phi) = f(x) - E[f(background)]` holds exactly.
//!
//! Cost is `coalitions x background rows` predictor evaluations per
//! request and dominates pipeline latency. Coalitions are enumerated
//! exhaustively when `2^M - 2` fits inside the sample budget (the fit is
//! then exact Kernel SHAP); otherwise they are sampled proportionally to
//! the Shapley kernel with a fixed seed, trading fidelity for a bounded
//! number of model calls. `SHAP_SAMPLES` and `BACKGROUND_CLUSTERS` are
//! the two knobs.

pub mod background;
mod solve;

pub use background::Background;

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::PipelineError;

use super::predict::Predictor;
use super::text::SEQUENCE_LENGTH;

/// Rows per predictor call when evaluating coalition batches
const MAX_EVAL_BATCH: usize = 256;

/// Exhaustive enumeration cutoff: beyond this many features the
/// `2^M - 2` coalition space cannot fit any reasonable budget
const MAX_EXACT_FEATURES: usize = 24;

pub struct KernelExplainer {
    background: Background,
    n_samples: usize,
    seed: u64,
}

impl KernelExplainer {
    pub fn new(background: Background, n_samples: usize, seed: u64) -> Self {
        Self {
            background,
            n_samples,
            seed,
        }
    }

    pub fn background(&self) -> &Background {
        &self.background
    }

    /// Contributions aligned to the static feature columns.
    ///
    /// Fail-fast: any predictor failure during sampling fails the whole
    /// explanation; no partial result is produced.
    pub fn explain(
        &self,
        predictor: &dyn Predictor,
        x: &[f32],
    ) -> Result<Vec<f64>, PipelineError> {
        let m = x.len();
        if m == 0 {
            return Err(PipelineError::Explanation(
                "empty static feature vector".to_string(),
            ));
        }
        if m != self.background.width() {
            return Err(PipelineError::Explanation(format!(
                "feature width {} does not match background width {}",
                m,
                self.background.width()
            )));
        }

        // f(x) and E[f(background)], both under the frozen neutral text
        let fx = self
            .eval_rows(predictor, &[x.to_vec()])?
            .first()
            .copied()
            .ok_or_else(|| {
                PipelineError::Explanation("predictor returned no output for the request".into())
            })? as f64;
        let base_preds = self.eval_background(predictor)?;
        let phi0: f64 = base_preds
            .iter()
            .zip(self.background.weights())
            .map(|(&p, &w)| p as f64 * w)
            .sum();
        let eff = fx - phi0;

        if m == 1 {
            return Ok(vec![eff]);
        }

        let (masks, weights) = self.coalitions(m)?;

        // One averaged model output per coalition
        let mut y = Vec::with_capacity(masks.len());
        for mask in &masks {
            let preds = self.eval_hybrids(predictor, x, mask)?;
            let avg: f64 = preds
                .iter()
                .zip(self.background.weights())
                .map(|(&p, &w)| p as f64 * w)
                .sum();
            y.push(avg);
        }

        // Efficiency constraint substituted out: the last feature's phi is
        // eff minus the rest, which folds the constraint into the design
        // matrix (column j becomes z_j - z_last, target loses z_last*eff).
        let cols = m - 1;
        let mut a = Array2::<f64>::zeros((masks.len(), cols));
        let mut y_adj = Vec::with_capacity(masks.len());
        for (i, mask) in masks.iter().enumerate() {
            let z_last = if mask[m - 1] { 1.0 } else { 0.0 };
            for j in 0..cols {
                let z_j = if mask[j] { 1.0 } else { 0.0 };
                a[[i, j]] = z_j - z_last;
            }
            y_adj.push(y[i] - phi0 - z_last * eff);
        }

        let head = solve::weighted_least_squares(&a, &y_adj, &weights)?;

        let mut phi = Vec::with_capacity(m);
        let mut head_sum = 0.0;
        for v in head {
            if !v.is_finite() {
                return Err(PipelineError::Explanation(
                    "attribution did not converge".to_string(),
                ));
            }
            head_sum += v;
            phi.push(v);
        }
        phi.push(eff - head_sum);

        Ok(phi)
    }

    /// Coalition masks and their fit weights. Exhaustive enumeration uses
    /// explicit Shapley-kernel weights; sampling draws coalition sizes
    /// proportionally to the kernel mass per size, so sampled coalitions
    /// carry uniform weight.
    fn coalitions(&self, m: usize) -> Result<(Vec<Vec<bool>>, Vec<f64>), PipelineError> {
        let exact = m <= MAX_EXACT_FEATURES && (1usize << m) - 2 <= self.n_samples;

        if exact {
            let mut masks = Vec::with_capacity((1usize << m) - 2);
            let mut weights = Vec::with_capacity(masks.capacity());
            for bits in 1..((1usize << m) - 1) {
                let mask: Vec<bool> = (0..m).map(|j| bits & (1 << j) != 0).collect();
                let size = bits.count_ones() as usize;
                masks.push(mask);
                weights.push(shapley_kernel_weight(m, size));
            }
            return Ok((masks, weights));
        }

        if self.n_samples < m.saturating_sub(1) {
            return Err(PipelineError::Explanation(format!(
                "sample budget {} is below the {} coalitions needed for {} features",
                self.n_samples,
                m - 1,
                m
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);

        // Kernel mass per coalition size, up to a shared constant
        let size_mass: Vec<f64> = (1..m)
            .map(|s| (m - 1) as f64 / (s * (m - s)) as f64)
            .collect();
        let total_mass: f64 = size_mass.iter().sum();

        let mut indices: Vec<usize> = (0..m).collect();
        let mut masks = Vec::with_capacity(self.n_samples);
        for _ in 0..self.n_samples {
            let mut draw = rng.gen::<f64>() * total_mass;
            let mut size = m - 1;
            for (s, &mass) in size_mass.iter().enumerate() {
                if draw < mass {
                    size = s + 1;
                    break;
                }
                draw -= mass;
            }

            indices.shuffle(&mut rng);
            let mut mask = vec![false; m];
            for &idx in &indices[..size] {
                mask[idx] = true;
            }
            masks.push(mask);
        }

        let weights = vec![1.0; masks.len()];
        Ok((masks, weights))
    }

    /// Evaluate every background row with the coalition's features
    /// replaced by the request values
    fn eval_hybrids(
        &self,
        predictor: &dyn Predictor,
        x: &[f32],
        mask: &[bool],
    ) -> Result<Vec<f32>, PipelineError> {
        let rows: Vec<Vec<f32>> = self
            .background
            .rows()
            .outer_iter()
            .map(|bg_row| {
                mask.iter()
                    .enumerate()
                    .map(|(j, &present)| if present { x[j] } else { bg_row[j] })
                    .collect()
            })
            .collect();
        self.eval_rows(predictor, &rows)
    }

    fn eval_background(&self, predictor: &dyn Predictor) -> Result<Vec<f32>, PipelineError> {
        let rows: Vec<Vec<f32>> = self
            .background
            .rows()
            .outer_iter()
            .map(|r| r.to_vec())
            .collect();
        self.eval_rows(predictor, &rows)
    }

    /// Batched predictor evaluation under the frozen neutral text input
    fn eval_rows(
        &self,
        predictor: &dyn Predictor,
        rows: &[Vec<f32>],
    ) -> Result<Vec<f32>, PipelineError> {
        let width = self.background.width();
        let mut out = Vec::with_capacity(rows.len());

        for chunk in rows.chunks(MAX_EVAL_BATCH) {
            let flat: Vec<f32> = chunk.iter().flatten().copied().collect();
            let static_batch = Array2::from_shape_vec((chunk.len(), width), flat)
                .map_err(|e| PipelineError::Explanation(format!("batch shape: {e}")))?;
            let text_batch = Array2::<i64>::zeros((chunk.len(), SEQUENCE_LENGTH));

            out.extend(predictor.predict(&text_batch, &static_batch)?);
        }

        Ok(out)
    }
}

/// Shapley kernel weight for one coalition of `size` out of `m` features
fn shapley_kernel_weight(m: usize, size: usize) -> f64 {
    (m - 1) as f64 / (binomial(m, size) * (size * (m - size)) as f64)
}

fn binomial(n: usize, k: usize) -> f64 {
    let k = k.min(n - k);
    let mut result = 1.0f64;
    for i in 0..k {
        result *= (n - i) as f64 / (i + 1) as f64;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::predict::tests::{FailingPredictor, LinearMockPredictor};
    use crate::pipeline::predict::Predictor;

    /// Additive model without a squashing head; Shapley values for it are
    /// known in closed form: phi_j = w_j * (x_j - E[bg_j]).
    struct AdditiveMock {
        weights: Vec<f32>,
    }

    impl Predictor for AdditiveMock {
        fn predict(
            &self,
            _text: &Array2<i64>,
            static_batch: &Array2<f32>,
        ) -> Result<Vec<f32>, PipelineError> {
            Ok(static_batch
                .outer_iter()
                .map(|row| {
                    0.5 + row
                        .iter()
                        .zip(&self.weights)
                        .map(|(x, w)| x * w)
                        .sum::<f32>()
                })
                .collect())
        }
    }

    fn single_background(row: Vec<f32>) -> Background {
        Background::summarize(vec![row], 1, 0)
    }

    #[test]
    fn test_efficiency_property_exact_path() {
        let model = LinearMockPredictor {
            weights: vec![0.8, -0.5, 0.3, 0.1, -0.2],
            bias: -0.4,
        };
        let bg = Background::summarize(
            vec![
                vec![0.0, 0.0, 0.0, 0.0, 0.0],
                vec![1.0, -1.0, 0.5, 0.0, 2.0],
                vec![-0.5, 0.5, 1.0, 1.0, -1.0],
            ],
            3,
            0,
        );
        let explainer = KernelExplainer::new(bg, 2048, 42);

        let x = vec![1.5, 2.0, -1.0, 0.5, 0.25];
        let phi = explainer.explain(&model, &x).unwrap();
        assert_eq!(phi.len(), 5);

        let fx = explainer.eval_rows(&model, &[x.clone()]).unwrap()[0] as f64;
        let base = explainer.eval_background(&model).unwrap();
        let phi0: f64 = base
            .iter()
            .zip(explainer.background().weights())
            .map(|(&p, &w)| p as f64 * w)
            .sum();

        let sum: f64 = phi.iter().sum();
        assert!((sum - (fx - phi0)).abs() < 1e-3);
    }

    #[test]
    fn test_efficiency_property_sampled_path() {
        // 8 features, budget 64 < 2^8 - 2 forces the sampled path
        let model = LinearMockPredictor {
            weights: vec![0.4, -0.3, 0.2, 0.1, -0.6, 0.5, -0.1, 0.7],
            bias: 0.2,
        };
        let bg = single_background(vec![0.0; 8]);
        let explainer = KernelExplainer::new(bg, 64, 7);

        let x = vec![1.0, -2.0, 0.5, 3.0, -0.5, 1.5, 0.0, -1.0];
        let phi = explainer.explain(&model, &x).unwrap();
        assert_eq!(phi.len(), 8);

        let fx = explainer.eval_rows(&model, &[x.clone()]).unwrap()[0] as f64;
        let phi0 = explainer.eval_background(&model).unwrap()[0] as f64;
        let sum: f64 = phi.iter().sum();
        assert!((sum - (fx - phi0)).abs() < 1e-3);
    }

    #[test]
    fn test_additive_model_recovers_per_feature_effects() {
        let weights = vec![0.05, -0.03, 0.02, 0.01];
        let model = AdditiveMock {
            weights: weights.clone(),
        };
        let bg_row = vec![0.5, -1.0, 2.0, 0.0];
        let explainer = KernelExplainer::new(single_background(bg_row.clone()), 2048, 42);

        let x = vec![2.0, 1.0, -1.0, 3.0];
        let phi = explainer.explain(&model, &x).unwrap();

        for j in 0..4 {
            let expected = weights[j] as f64 * (x[j] - bg_row[j]) as f64;
            assert!(
                (phi[j] - expected).abs() < 1e-4,
                "phi[{j}] = {}, expected {expected}",
                phi[j]
            );
        }
    }

    #[test]
    fn test_deterministic_across_calls() {
        let model = LinearMockPredictor {
            weights: vec![0.4, -0.3, 0.2, 0.1, -0.6, 0.5, -0.1, 0.7],
            bias: 0.0,
        };
        let bg = single_background(vec![0.0; 8]);
        let explainer = KernelExplainer::new(bg, 128, 9);

        let x = vec![1.0, -2.0, 0.5, 3.0, -0.5, 1.5, 0.0, -1.0];
        let a = explainer.explain(&model, &x).unwrap();
        let b = explainer.explain(&model, &x).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_predictor_failure_fails_whole_explanation() {
        let bg = single_background(vec![0.0; 3]);
        let explainer = KernelExplainer::new(bg, 128, 1);
        let result = explainer.explain(&FailingPredictor, &[1.0, 2.0, 3.0]);
        assert!(matches!(result, Err(PipelineError::Inference(_))));
    }

    #[test]
    fn test_width_mismatch_is_explanation_error() {
        let bg = single_background(vec![0.0; 3]);
        let explainer = KernelExplainer::new(bg, 128, 1);
        let model = LinearMockPredictor {
            weights: vec![1.0, 1.0],
            bias: 0.0,
        };
        let result = explainer.explain(&model, &[1.0, 2.0]);
        assert!(matches!(result, Err(PipelineError::Explanation(_))));
    }

    #[test]
    fn test_single_feature_gets_full_difference() {
        let model = AdditiveMock {
            weights: vec![0.1],
        };
        let explainer = KernelExplainer::new(single_background(vec![0.0]), 128, 1);
        let phi = explainer.explain(&model, &[2.0]).unwrap();
        assert_eq!(phi.len(), 1);
        assert!((phi[0] - 0.2).abs() < 1e-5);
    }
}
