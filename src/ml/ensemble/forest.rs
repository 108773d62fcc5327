use linfa::dataset::DatasetBase;
use linfa::traits::Fit;
use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::tree::{DecisionTree, TreeLimits};
use crate::ml::error::{EncodeError, TrainingError};

/// How training samples are weighted by class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassWeight {
    Uniform,
    /// `n_samples / (n_classes * count(class))`
    Balanced,
}

/// Random forest hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub class_weight: ClassWeight,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_depth: 12,
            min_samples_split: 2,
            class_weight: ClassWeight::Balanced,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl ForestParams {
    pub fn n_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), TrainingError> {
        if self.n_trees == 0 {
            return Err(TrainingError::InvalidParams("n_trees must be > 0".to_string()));
        }
        if self.max_depth == 0 {
            return Err(TrainingError::InvalidParams("max_depth must be > 0".to_string()));
        }
        if self.min_samples_split < 2 {
            return Err(TrainingError::InvalidParams(
                "min_samples_split must be >= 2".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-sample class weights for binary targets.
pub fn class_weights(targets: &[usize], mode: ClassWeight) -> Vec<f64> {
    match mode {
        ClassWeight::Uniform => vec![1.0; targets.len()],
        ClassWeight::Balanced => {
            let n = targets.len() as f64;
            let positives = targets.iter().filter(|&&t| t == 1).count() as f64;
            let negatives = n - positives;
            let n_classes = [negatives, positives].iter().filter(|&&c| c > 0.0).count() as f64;
            targets
                .iter()
                .map(|&t| {
                    let count = if t == 1 { positives } else { negatives };
                    n / (n_classes * count)
                })
                .collect()
        }
    }
}

/// Bagged ensemble of CART trees; class-1 probability is the mean leaf value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl Fit<Array2<f64>, Array1<usize>, TrainingError> for ForestParams {
    type Object = RandomForest;

    /// Dataset weights, if any, multiply the class weights.
    fn fit(&self, dataset: &DatasetBase<Array2<f64>, Array1<usize>>) -> Result<RandomForest, TrainingError> {
        self.validate()?;

        let x = dataset.records();
        let targets = dataset.targets();
        let n = x.nrows();
        if n == 0 {
            return Err(TrainingError::NoRows);
        }
        if targets.len() != n {
            return Err(TrainingError::InvalidParams(format!(
                "{} records but {} targets",
                n,
                targets.len()
            )));
        }
        if let Some(bad) = targets.iter().find(|&&t| t > 1) {
            return Err(TrainingError::InvalidParams(format!("target {} is not binary", bad)));
        }

        let y = targets.to_vec();
        let base_weights: Vec<f64> = class_weights(&y, self.class_weight)
            .into_iter()
            .enumerate()
            .map(|(i, w)| w * dataset.weight_for(i) as f64)
            .collect();

        let n_features = x.ncols();
        let limits = TreeLimits {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            max_features: ((n_features as f64).sqrt().floor() as usize).max(1),
        };

        let mut master = StdRng::seed_from_u64(self.seed);
        let mut trees = Vec::with_capacity(self.n_trees);
        let mut sample_weights = vec![0.0; n];

        for t in 0..self.n_trees {
            let mut rng = StdRng::seed_from_u64(master.gen());
            if self.bootstrap {
                let mut counts = vec![0u32; n];
                for _ in 0..n {
                    counts[rng.gen_range(0..n)] += 1;
                }
                for i in 0..n {
                    sample_weights[i] = base_weights[i] * counts[i] as f64;
                }
            } else {
                sample_weights.copy_from_slice(&base_weights);
            }

            let tree = DecisionTree::grow(x, &y, &sample_weights, limits, &mut rng);
            debug!(tree = t, nodes = tree.node_count(), depth = tree.depth(), "Grew tree");
            trees.push(tree);
        }

        let avg_nodes = trees.iter().map(DecisionTree::node_count).sum::<usize>() as f64 / trees.len() as f64;
        info!(
            "Random forest fitted: {} trees on {} samples x {} features (max_features={}, avg {:.1} nodes/tree)",
            trees.len(),
            n,
            n_features,
            limits.max_features,
            avg_nodes
        );

        Ok(RandomForest {
            params: self.clone(),
            n_features,
            trees,
        })
    }
}

impl RandomForest {
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Probability of class 1 for one feature row.
    pub fn predict_proba(&self, row: ArrayView1<f64>) -> Result<f64, EncodeError> {
        if row.len() != self.n_features {
            return Err(EncodeError::Width {
                expected: self.n_features,
                actual: row.len(),
            });
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict_proba(row)).sum();
        Ok(sum / self.trees.len() as f64)
    }

    pub fn predict_proba_batch(&self, x: &Array2<f64>) -> Result<Array1<f64>, EncodeError> {
        x.rows()
            .into_iter()
            .map(|row| self.predict_proba(row))
            .collect::<Result<Vec<_>, _>>()
            .map(Array1::from)
    }

    /// Hard labels as argmax over the two class probabilities; an exact tie
    /// goes to class 0.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>, EncodeError> {
        Ok(self.predict_proba_batch(x)?.mapv(|p| usize::from(p > 0.5)))
    }

    /// Check a deserialized forest before it serves traffic.
    pub fn validate(&self, expected_features: usize) -> Result<(), String> {
        if self.n_features != expected_features {
            return Err(format!(
                "model expects {} features, pipeline produces {}",
                self.n_features, expected_features
            ));
        }
        if self.trees.is_empty() {
            return Err("model has no trees".to_string());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|e| format!("tree {}: {}", i, e))?;
        }
        Ok(())
    }
}
