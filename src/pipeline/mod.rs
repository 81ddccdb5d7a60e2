//! Inference pipeline
//!
//! Per-request flow: validate/transform the record into a static feature
//! vector and a text sequence, run the dual-input model for the
//! probability, run the attribution engine against the background
//! distribution, rank the contributions. Any stage failure short-circuits
//! the request; nothing is retried and there is no prediction-without-
//! explanation fallback.
//!
//! All fitted artifacts live in [`ServiceContext`], built once at startup
//! and shared read-only across requests.

pub mod explain;
pub mod format;
pub mod predict;
pub mod schema;
pub mod text;
pub mod transform;

use ndarray::Array2;

use crate::config::Config;
use crate::error::PipelineError;
use crate::models::{PredictResponse, Record};

use explain::{Background, KernelExplainer};
use predict::{OnnxPredictor, Predictor};
use schema::PreprocessorSchema;
use text::{TextVectorizer, SEQUENCE_LENGTH};
use transform::FeatureTransformer;

/// Immutable bundle of fitted artifacts and policy knobs.
///
/// Constructed once in `main` and never mutated afterwards; request
/// handlers only borrow it.
pub struct ServiceContext {
    pub transformer: FeatureTransformer,
    pub vectorizer: TextVectorizer,
    pub predictor: Box<dyn Predictor>,
    pub explainer: KernelExplainer,
    /// Post-encoding column names, aligned to transformer output
    pub output_names: Vec<String>,
    pub top_k: usize,
}

impl ServiceContext {
    pub fn new(
        transformer: FeatureTransformer,
        vectorizer: TextVectorizer,
        predictor: Box<dyn Predictor>,
        explainer: KernelExplainer,
        top_k: usize,
    ) -> Self {
        let output_names = transformer.output_names();
        Self {
            transformer,
            vectorizer,
            predictor,
            explainer,
            output_names,
            top_k,
        }
    }

    /// Load every artifact named in the configuration
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let schema = PreprocessorSchema::from_file(&config.preprocessor_path)?;
        tracing::info!(
            "Preprocessor loaded: {} numerical + {} categorical columns, width {}",
            schema.numerical.len(),
            schema.categorical.len(),
            schema.output_width()
        );
        let transformer = FeatureTransformer::new(schema);

        let vectorizer = TextVectorizer::from_file(&config.vocab_path)?;
        tracing::info!("Vocabulary loaded: {} words", vectorizer.vocab_size());

        let predictor = OnnxPredictor::load(&config.model_path)?;

        let background = match &config.background_data_path {
            Some(path) => {
                let bg = Background::from_records_file(
                    path,
                    &transformer,
                    config.background_clusters,
                    config.shap_seed,
                )?;
                tracing::info!(
                    "Background: {} weighted centroids summarized from {}",
                    bg.len(),
                    path
                );
                bg
            }
            None => {
                tracing::info!("Background: single neutral point (no background data configured)");
                Background::neutral(&transformer)
            }
        };

        let explainer = KernelExplainer::new(background, config.shap_samples, config.shap_seed);

        Ok(Self::new(
            transformer,
            vectorizer,
            Box::new(predictor),
            explainer,
            config.top_k,
        ))
    }
}

/// Run one record through the full pipeline
pub fn run(ctx: &ServiceContext, record: &Record) -> Result<PredictResponse, PipelineError> {
    let static_vec = ctx.transformer.transform(record)?;
    tracing::debug!("Transformed record to {} static features", static_vec.len());

    let sequence = ctx.vectorizer.vectorize(&record.combined_text());

    let text_batch = Array2::from_shape_vec((1, SEQUENCE_LENGTH), sequence.to_vec())
        .map_err(|e| PipelineError::Inference(format!("text batch shape: {e}")))?;
    let static_batch = Array2::from_shape_vec((1, static_vec.len()), static_vec.clone())
        .map_err(|e| PipelineError::Inference(format!("static batch shape: {e}")))?;

    let probability = ctx
        .predictor
        .predict(&text_batch, &static_batch)?
        .first()
        .copied()
        .ok_or_else(|| PipelineError::Inference("model returned no probability".to_string()))?;
    tracing::debug!("Predicted default probability {:.4}", probability);

    let contributions = ctx.explainer.explain(ctx.predictor.as_ref(), &static_vec)?;
    tracing::debug!("Computed {} contributions", contributions.len());

    let explanation = format::top_k(&ctx.output_names, &contributions, ctx.top_k);

    Ok(PredictResponse {
        default_probability: probability,
        explanation,
    })
}
