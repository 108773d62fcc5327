pub mod dataset;
pub mod encoder;
pub mod ensemble;
pub mod error;
pub mod features;
pub mod metrics;
pub mod persistence;
pub mod predictor;
pub mod scaler;
pub mod split;
pub mod trainer;

pub use predictor::ModelArtifacts;
pub use trainer::{Trainer, TrainingConfig};
