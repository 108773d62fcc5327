use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::ensemble::RandomForest;
use super::error::{ArtifactError, EncodeError};
use super::features::FeaturePipeline;
use super::persistence::{load_artifacts, ArtifactPaths};
use crate::types::{Record, NUM_FEATURES};

/// Probability at or above which a record is labeled fraud.
pub const LABEL_THRESHOLD: f64 = 0.5;

/// Reason tier for a fraud probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReasonTier {
    Severe,
    High,
    Moderate,
}

impl ReasonTier {
    /// Strict lower bounds: above 0.8, above 0.6, above 0.4.
    pub fn from_probability(p: f64) -> Option<Self> {
        if p > 0.8 {
            Some(ReasonTier::Severe)
        } else if p > 0.6 {
            Some(ReasonTier::High)
        } else if p > 0.4 {
            Some(ReasonTier::Moderate)
        } else {
            None
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ReasonTier::Severe => "Severe anomaly detected",
            ReasonTier::High => "High deviation from normal behavior",
            ReasonTier::Moderate => "Moderate anomaly detected",
        }
    }
}

/// Response body of `/predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub fraud_probability: f64,
    pub label: u8,
    pub model_version: String,
    pub reasons: Vec<String>,
}

impl Prediction {
    pub fn from_probability(fraud_probability: f64, model_version: impl Into<String>) -> Self {
        Self {
            fraud_probability,
            label: u8::from(fraud_probability >= LABEL_THRESHOLD),
            model_version: model_version.into(),
            reasons: ReasonTier::from_probability(fraud_probability)
                .map(|tier| vec![tier.message().to_string()])
                .unwrap_or_default(),
        }
    }
}

/// Model plus the frozen feature transform, loaded once and shared read-only.
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    model: RandomForest,
    pipeline: FeaturePipeline,
    model_version: String,
}

impl ModelArtifacts {
    pub fn new(
        model: RandomForest,
        pipeline: FeaturePipeline,
        model_version: impl Into<String>,
    ) -> Result<Self, ArtifactError> {
        model.validate(NUM_FEATURES).map_err(ArtifactError::Mismatch)?;
        Ok(Self {
            model,
            pipeline,
            model_version: model_version.into(),
        })
    }

    /// Load from disk; the model path doubles as the version string.
    pub fn load(paths: &ArtifactPaths) -> Result<Self, ArtifactError> {
        let (model, pipeline) = load_artifacts(paths)?;
        let artifacts = Self::new(model, pipeline, paths.model.display().to_string())?;
        info!(
            "Loaded model {} ({} trees, {} features)",
            artifacts.model_version(),
            artifacts.model.n_trees(),
            artifacts.model.n_features()
        );
        Ok(artifacts)
    }

    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    pub fn predict(&self, record: &Record) -> Result<Prediction, EncodeError> {
        if record.is_empty() {
            debug!("Scoring an empty record, every feature takes its default");
        }
        let features = self.pipeline.encode(record)?;
        let probability = self.model.predict_proba(features.view())?;
        debug!(probability, fields = record.len(), "Scored record");
        Ok(Prediction::from_probability(probability, self.model_version.clone()))
    }
}
