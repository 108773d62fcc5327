use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Flat node storage; children are indices into `DecisionTree::nodes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        /// Weighted share of class 1 among the training samples in this leaf
        probability: f64,
    },
}

/// Binary CART tree over weighted samples, Gini impurity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy)]
pub struct TreeLimits {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub max_features: usize,
}

struct Grower<'a> {
    x: &'a Array2<f64>,
    y: &'a [usize],
    weights: &'a [f64],
    limits: TreeLimits,
    rng: &'a mut StdRng,
    nodes: Vec<Node>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl DecisionTree {
    /// Grow a tree on the samples with non-zero weight.
    ///
    /// `weights` already folds in class weighting and bootstrap multiplicity.
    pub fn grow(
        x: &Array2<f64>,
        y: &[usize],
        weights: &[f64],
        limits: TreeLimits,
        rng: &mut StdRng,
    ) -> Self {
        let indices: Vec<usize> = (0..x.nrows()).filter(|&i| weights[i] > 0.0).collect();
        let mut grower = Grower {
            x,
            y,
            weights,
            limits,
            rng,
            nodes: Vec::new(),
        };
        grower.build(indices, 0);
        Self {
            nodes: grower.nodes,
        }
    }

    /// Class-1 probability of the leaf `row` falls into.
    pub fn predict_proba(&self, row: ArrayView1<f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { probability } => return *probability,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn depth_at(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => {
                    1 + depth_at(nodes, *left).max(depth_at(nodes, *right))
                }
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            depth_at(&self.nodes, 0)
        }
    }

    /// Structural check for deserialized trees: children in range and
    /// pointing forward, features within `n_features`.
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!("node {} splits on feature {}", idx, feature));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {} has a NaN threshold", idx));
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!("node {} has invalid child {}", idx, child));
                        }
                    }
                }
                Node::Leaf { probability } => {
                    if !(0.0..=1.0).contains(probability) {
                        return Err(format!("leaf {} has probability {}", idx, probability));
                    }
                }
            }
        }
        Ok(())
    }
}

impl Grower<'_> {
    fn build(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let (total, positive) = indices.iter().fold((0.0, 0.0), |(t, p), &i| {
            let w = self.weights[i];
            (t + w, if self.y[i] == 1 { p + w } else { p })
        });
        let probability = if total > 0.0 { (positive / total).clamp(0.0, 1.0) } else { 0.0 };

        let pure = positive <= 0.0 || positive >= total;
        if pure || depth >= self.limits.max_depth || indices.len() < self.limits.min_samples_split {
            return self.push(Node::Leaf { probability });
        }

        let best = match self.best_split(&indices) {
            Some(best) => best,
            None => return self.push(Node::Leaf { probability }),
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.x[[i, best.feature]] <= best.threshold);

        // Reserve the split slot before the children so they index forward.
        let slot = self.push(Node::Leaf { probability });
        let left = self.build(left_idx, depth + 1);
        let right = self.build(right_idx, depth + 1);
        self.nodes[slot] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        slot
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Scan features in random order until `max_features` non-constant ones
    /// have been tried; keep the split with the lowest weighted child Gini.
    fn best_split(&mut self, indices: &[usize]) -> Option<BestSplit> {
        let mut features: Vec<usize> = (0..self.x.ncols()).collect();
        features.shuffle(&mut *self.rng);

        let mut best: Option<BestSplit> = None;
        let mut tried = 0;
        let mut column: Vec<(f64, usize, f64)> = Vec::with_capacity(indices.len());

        for feature in features {
            if tried >= self.limits.max_features {
                break;
            }
            column.clear();
            column.extend(
                indices
                    .iter()
                    .map(|&i| (self.x[[i, feature]], self.y[i], self.weights[i])),
            );
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let (lo, hi) = (column[0].0, column[column.len() - 1].0);
            if hi <= lo {
                continue;
            }
            tried += 1;

            if let Some(candidate) = scan_column(&column, feature) {
                if best.as_ref().map_or(true, |b| candidate.impurity < b.impurity) {
                    best = Some(candidate);
                }
            }
        }
        best
    }
}

fn gini(positive: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    let p = positive / total;
    2.0 * p * (1.0 - p)
}

/// Best threshold on one sorted column, by weighted child impurity.
fn scan_column(column: &[(f64, usize, f64)], feature: usize) -> Option<BestSplit> {
    let (total, positive) = column.iter().fold((0.0, 0.0), |(t, p), &(_, y, w)| {
        (t + w, if y == 1 { p + w } else { p })
    });

    let mut best: Option<BestSplit> = None;
    let mut left_total = 0.0;
    let mut left_positive = 0.0;

    for i in 0..column.len() - 1 {
        let (value, y, w) = column[i];
        left_total += w;
        if y == 1 {
            left_positive += w;
        }

        let next = column[i + 1].0;
        if next <= value {
            continue;
        }

        let right_total = total - left_total;
        let right_positive = positive - left_positive;
        let impurity = left_total * gini(left_positive, left_total)
            + right_total * gini(right_positive, right_total);

        if best.as_ref().map_or(true, |b| impurity < b.impurity) {
            let mut threshold = value + (next - value) / 2.0;
            // midpoint can round up to `next` for adjacent floats
            if threshold >= next {
                threshold = value;
            }
            best = Some(BestSplit {
                feature,
                threshold,
                impurity,
            });
        }
    }
    best
}
