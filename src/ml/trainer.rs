use chrono::{DateTime, Utc};
use linfa::traits::Fit;
use linfa::Dataset;
use ndarray::{Array1, Axis};
use serde::Serialize;
use tracing::{info, warn};

use super::dataset::LabeledData;
use super::ensemble::{ForestParams, RandomForest};
use super::error::TrainingError;
use super::features::FeaturePipeline;
use super::metrics::EvaluationOutcome;
use super::split::train_test_split;
use crate::types::NUM_FEATURES;

/// Training run settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingConfig {
    pub test_fraction: f64,
    pub split_seed: u64,
    pub forest: ForestParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            split_seed: 42,
            forest: ForestParams::default(),
        }
    }
}

/// Summary written next to the model after each run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub trained_at: DateTime<Utc>,
    pub total_rows: usize,
    pub dropped_rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub positives: usize,
    pub negatives: usize,
    pub stratified: bool,
    pub n_features: usize,
    pub evaluation: EvaluationOutcome,
    pub config: TrainingConfig,
}

impl TrainingReport {
    pub fn print_summary(&self) {
        println!("\n{}", "=".repeat(60));
        println!("                    TRAINING RESULTS");
        println!("{}", "=".repeat(60));
        println!("Trained At:         {}", self.trained_at.format("%Y-%m-%d %H:%M:%S UTC"));
        println!("Labeled Rows:       {} ({} dropped)", self.total_rows, self.dropped_rows);
        println!("Class Balance:      {} fraud / {} legit", self.positives, self.negatives);
        println!(
            "Split:              {} train / {} test{}",
            self.train_rows,
            self.test_rows,
            if self.stratified { " (stratified)" } else { "" }
        );
        println!("{}", "-".repeat(60));
        println!("TEST METRICS");
        if let EvaluationOutcome::Failed { reason, .. } = &self.evaluation {
            println!("  Evaluation failed:  {}", reason);
        }
        println!("  Accuracy:           {:.4}", self.evaluation.accuracy());
        println!("  Precision:          {:.4}", self.evaluation.precision());
        println!("  Recall:             {:.4}", self.evaluation.recall());
        println!("  F1:                 {:.4}", self.evaluation.f1());
        println!("{}", "-".repeat(60));
        println!("MODEL");
        println!("  Trees:              {}", self.config.forest.n_trees);
        println!("  Max Depth:          {}", self.config.forest.max_depth);
        println!("  Features:           {}", self.n_features);
        println!("{}", "=".repeat(60));
    }
}

/// Everything a training run produces.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: RandomForest,
    pub pipeline: FeaturePipeline,
    pub report: TrainingReport,
}

pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// Fit encoders and scaler on all labeled rows, split, fit the forest on
    /// the training part and evaluate on the held-out part.
    ///
    /// A failed evaluation is logged and reported with zeros for whatever
    /// could not be computed; the model is still returned.
    pub fn train(&self, data: &LabeledData) -> Result<TrainingOutcome, TrainingError> {
        if data.is_empty() {
            return Err(TrainingError::NoRows);
        }
        self.config.forest.validate()?;

        let (pipeline, features) = FeaturePipeline::fit(&data.records)?;
        for (column, encoder) in pipeline.encoders().iter() {
            info!("Encoded '{}' with {} classes", column, encoder.classes().len());
        }

        let split = train_test_split(&data.labels, self.config.test_fraction, self.config.split_seed)?;
        let targets = Array1::from(data.labels.clone());

        let train_set = Dataset::new(
            features.select(Axis(0), &split.train),
            targets.select(Axis(0), &split.train),
        );
        let test_x = features.select(Axis(0), &split.test);
        let test_y: Vec<usize> = split.test.iter().map(|&i| data.labels[i]).collect();

        info!(
            "Training random forest on {} rows, holding out {}",
            split.train.len(),
            split.test.len()
        );
        let model = self.config.forest.fit(&train_set)?;

        let predictions = model
            .predict(&test_x)
            .map_err(|source| TrainingError::Encode { row: 0, source })?;
        let evaluation = EvaluationOutcome::from_predictions(&predictions.to_vec(), &test_y);
        match &evaluation {
            EvaluationOutcome::Evaluated(e) => info!(
                "Test accuracy {:.4}, precision {}, recall {}, f1 {}",
                e.accuracy, e.precision, e.recall, e.f1
            ),
            EvaluationOutcome::Failed { reason, .. } => {
                warn!("Metric computation failed, reporting zeros: {}", reason)
            }
        }

        let positives = data.positives();
        let report = TrainingReport {
            trained_at: Utc::now(),
            total_rows: data.len(),
            dropped_rows: data.dropped,
            train_rows: split.train.len(),
            test_rows: split.test.len(),
            positives,
            negatives: data.len() - positives,
            stratified: split.stratified,
            n_features: NUM_FEATURES,
            evaluation,
            config: self.config.clone(),
        };

        Ok(TrainingOutcome {
            model,
            pipeline,
            report,
        })
    }
}
