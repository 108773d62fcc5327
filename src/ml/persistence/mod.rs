use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

use super::encoder::EncoderSet;
use super::ensemble::RandomForest;
use super::error::ArtifactError;
use super::features::FeaturePipeline;
use super::scaler::StandardScaler;
use super::trainer::{TrainingOutcome, TrainingReport};

pub const DEFAULT_MODEL_PATH: &str = "rf_model.json";
pub const DEFAULT_SCALER_PATH: &str = "scaler.json";
pub const DEFAULT_ENCODERS_PATH: &str = "encoders.json";
pub const DEFAULT_REPORT_PATH: &str = "training_report.json";

/// Locations of the three artifacts a predictor needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub scaler: PathBuf,
    pub encoders: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            model: PathBuf::from(DEFAULT_MODEL_PATH),
            scaler: PathBuf::from(DEFAULT_SCALER_PATH),
            encoders: PathBuf::from(DEFAULT_ENCODERS_PATH),
        }
    }
}

#[cfg(test)]
impl ArtifactPaths {
    /// The default file names inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            model: dir.join(DEFAULT_MODEL_PATH),
            scaler: dir.join(DEFAULT_SCALER_PATH),
            encoders: dir.join(DEFAULT_ENCODERS_PATH),
        }
    }
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ArtifactError> {
    let json = serde_json::to_string_pretty(value).map_err(|source| ArtifactError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ArtifactError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, json).map_err(|source| ArtifactError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let text = std::fs::read_to_string(path).map_err(|source| ArtifactError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_encoders(path: &Path, encoders: &EncoderSet) -> Result<(), ArtifactError> {
    let json = encoders.to_json().map_err(|source| ArtifactError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    write_json(path, &json)
}

pub fn load_encoders(path: &Path) -> Result<EncoderSet, ArtifactError> {
    let value: Value = read_json(path)?;
    EncoderSet::from_json(&value).map_err(|source| ArtifactError::Encoders {
        path: path.to_path_buf(),
        source,
    })
}

/// Persist the model, scaler and encoders of a training run.
pub fn save_outcome(paths: &ArtifactPaths, outcome: &TrainingOutcome) -> Result<(), ArtifactError> {
    write_json(&paths.model, &outcome.model)?;
    write_json(&paths.scaler, outcome.pipeline.scaler())?;
    save_encoders(&paths.encoders, outcome.pipeline.encoders())?;
    info!(
        "Saved model to {}, scaler to {}, encoders to {}",
        paths.model.display(),
        paths.scaler.display(),
        paths.encoders.display()
    );
    Ok(())
}

pub fn save_report(path: &Path, report: &TrainingReport) -> Result<(), ArtifactError> {
    write_json(path, report)?;
    info!("Saved training report to {}", path.display());
    Ok(())
}

/// Read all three artifacts and pair the encoders with the scaler.
pub fn load_artifacts(paths: &ArtifactPaths) -> Result<(RandomForest, FeaturePipeline), ArtifactError> {
    let model: RandomForest = read_json(&paths.model)?;
    let scaler: StandardScaler = read_json(&paths.scaler)?;
    let encoders = load_encoders(&paths.encoders)?;

    let pipeline = FeaturePipeline::new(encoders, scaler)?;
    Ok((model, pipeline))
}
