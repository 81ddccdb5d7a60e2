//! Dual-Input Predictor - ONNX Runtime Integration
//!
//! Runs the trained dual-input model: a text-sequence tensor and a
//! static-feature tensor with the same leading batch dimension, one
//! default probability per row. The session is behind a trait so the
//! attribution engine and tests can treat the model as a black box.

use std::path::Path;

use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;

use crate::error::PipelineError;

/// Model text-input tensor name
pub const TEXT_INPUT: &str = "text_input";
/// Model static-input tensor name
pub const STATIC_INPUT: &str = "static_input";

/// Black-box estimator seam.
///
/// Implementations never mutate their inputs and must be safe to call
/// from multiple requests at once.
pub trait Predictor: Send + Sync {
    /// One probability in [0,1] per aligned row of the two batches
    fn predict(
        &self,
        text_batch: &Array2<i64>,
        static_batch: &Array2<f32>,
    ) -> Result<Vec<f32>, PipelineError>;
}

/// ONNX Runtime implementation.
///
/// `Session::run` needs exclusive access, so calls are serialized through
/// a single evaluation lock; weights themselves are read-only.
pub struct OnnxPredictor {
    session: Mutex<Session>,
    output_name: String,
}

impl OnnxPredictor {
    /// Load the model from an ONNX file
    pub fn load(model_path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let model_path = model_path.as_ref();
        tracing::info!("Loading ONNX model from: {}", model_path.display());

        if !model_path.exists() {
            return Err(PipelineError::Inference(format!(
                "model not found: {}",
                model_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e| PipelineError::Inference(format!("session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| PipelineError::Inference(format!("optimization level: {e}")))?
            .commit_from_file(model_path)
            .map_err(|e| PipelineError::Inference(format!("model load: {e}")))?;

        for name in [TEXT_INPUT, STATIC_INPUT] {
            if !session.inputs.iter().any(|i| i.name == name) {
                return Err(PipelineError::Inference(format!(
                    "model is missing expected input '{name}'"
                )));
            }
        }

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| PipelineError::Inference("model defines no output".to_string()))?;

        tracing::info!("ONNX model loaded successfully");

        Ok(Self {
            session: Mutex::new(session),
            output_name,
        })
    }
}

impl Predictor for OnnxPredictor {
    fn predict(
        &self,
        text_batch: &Array2<i64>,
        static_batch: &Array2<f32>,
    ) -> Result<Vec<f32>, PipelineError> {
        let rows = static_batch.nrows();
        if text_batch.nrows() != rows {
            return Err(PipelineError::Inference(format!(
                "batch mismatch: {} text rows vs {} static rows",
                text_batch.nrows(),
                rows
            )));
        }

        let text_tensor = Value::from_array(text_batch.clone())
            .map_err(|e| PipelineError::Inference(format!("text tensor: {e}")))?;
        let static_tensor = Value::from_array(static_batch.clone())
            .map_err(|e| PipelineError::Inference(format!("static tensor: {e}")))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![
                TEXT_INPUT => text_tensor,
                STATIC_INPUT => static_tensor,
            ])
            .map_err(|e| PipelineError::Inference(format!("inference failed: {e}")))?;

        let output = outputs
            .get(&self.output_name)
            .ok_or_else(|| PipelineError::Inference("model produced no output".to_string()))?;

        let (_, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| PipelineError::Inference(format!("output extract: {e}")))?;

        if data.len() < rows {
            return Err(PipelineError::Inference(format!(
                "model returned {} values for {} rows",
                data.len(),
                rows
            )));
        }

        Ok(data[..rows]
            .iter()
            .map(|p| p.clamp(0.0, 1.0))
            .collect())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ndarray::Axis;

    /// Deterministic stand-in for the trained model: a linear function of
    /// the static features squashed through a sigmoid, ignoring text.
    /// Linear-in-features makes attribution results checkable in closed
    /// form.
    pub(crate) struct LinearMockPredictor {
        pub weights: Vec<f32>,
        pub bias: f32,
    }

    impl Predictor for LinearMockPredictor {
        fn predict(
            &self,
            text_batch: &Array2<i64>,
            static_batch: &Array2<f32>,
        ) -> Result<Vec<f32>, PipelineError> {
            assert_eq!(text_batch.nrows(), static_batch.nrows());
            Ok(static_batch
                .axis_iter(Axis(0))
                .map(|row| {
                    let z: f32 = row
                        .iter()
                        .zip(&self.weights)
                        .map(|(x, w)| x * w)
                        .sum::<f32>()
                        + self.bias;
                    1.0 / (1.0 + (-z).exp())
                })
                .collect())
        }
    }

    /// Mock that always fails, for fail-fast paths
    pub(crate) struct FailingPredictor;

    impl Predictor for FailingPredictor {
        fn predict(
            &self,
            _text_batch: &Array2<i64>,
            _static_batch: &Array2<f32>,
        ) -> Result<Vec<f32>, PipelineError> {
            Err(PipelineError::Inference("mock failure".to_string()))
        }
    }

    #[test]
    fn test_mock_probabilities_in_range() {
        let model = LinearMockPredictor {
            weights: vec![2.0, -1.0],
            bias: 0.5,
        };
        let text = Array2::<i64>::zeros((3, 4));
        let stat =
            Array2::from_shape_vec((3, 2), vec![0.0, 0.0, 10.0, -10.0, -10.0, 10.0]).unwrap();
        let probs = model.predict(&text, &stat).unwrap();
        assert_eq!(probs.len(), 3);
        assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
    }
}
