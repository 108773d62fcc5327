use serde::{Serialize, Serializer};
use std::fmt;

use super::error::MetricError;

/// A ratio metric that may have a zero denominator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    Defined(f64),
    /// No predicted positives (precision) or no actual positives (recall).
    Undefined,
}

impl Metric {
    fn ratio(numerator: usize, denominator: usize) -> Self {
        if denominator == 0 {
            Metric::Undefined
        } else {
            Metric::Defined(numerator as f64 / denominator as f64)
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Metric::Defined(v) => Some(*v),
            Metric::Undefined => None,
        }
    }

    /// Value for display, with undefined shown as 0.
    pub fn or_zero(&self) -> f64 {
        self.value().unwrap_or(0.0)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Defined(v) => write!(f, "{:.4}", v),
            Metric::Undefined => write!(f, "0.0000 (undefined)"),
        }
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.or_zero())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionCounts {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

impl ConfusionCounts {
    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }
}

/// Binary classification metrics over a held-out set; class 1 is positive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub accuracy: f64,
    pub precision: Metric,
    pub recall: Metric,
    pub f1: Metric,
    pub confusion: ConfusionCounts,
}

/// Share of matching labels, `None` when there is nothing to compare.
///
/// Unlike [`evaluate`] this does not care whether the labels are binary.
pub fn accuracy(predictions: &[usize], targets: &[usize]) -> Option<f64> {
    if predictions.len() != targets.len() || targets.is_empty() {
        return None;
    }
    let correct = predictions.iter().zip(targets).filter(|(p, t)| p == t).count();
    Some(correct as f64 / targets.len() as f64)
}

pub fn evaluate(predictions: &[usize], targets: &[usize]) -> Result<Evaluation, MetricError> {
    if predictions.len() != targets.len() {
        return Err(MetricError::LengthMismatch {
            predictions: predictions.len(),
            targets: targets.len(),
        });
    }
    if targets.is_empty() {
        return Err(MetricError::Empty);
    }

    let mut confusion = ConfusionCounts::default();
    for (&p, &t) in predictions.iter().zip(targets) {
        match (p, t) {
            (1, 1) => confusion.true_positive += 1,
            (1, 0) => confusion.false_positive += 1,
            (0, 0) => confusion.true_negative += 1,
            (0, 1) => confusion.false_negative += 1,
            _ => return Err(MetricError::NonBinaryLabel(if p > 1 { p } else { t })),
        }
    }

    let accuracy =
        (confusion.true_positive + confusion.true_negative) as f64 / confusion.total() as f64;
    let precision = Metric::ratio(
        confusion.true_positive,
        confusion.true_positive + confusion.false_positive,
    );
    let recall = Metric::ratio(
        confusion.true_positive,
        confusion.true_positive + confusion.false_negative,
    );
    let f1 = match (precision, recall) {
        (Metric::Defined(p), Metric::Defined(r)) if p + r > 0.0 => {
            Metric::Defined(2.0 * p * r / (p + r))
        }
        (Metric::Defined(_), Metric::Defined(_)) => Metric::Defined(0.0),
        _ => Metric::Undefined,
    };

    Ok(Evaluation {
        accuracy,
        precision,
        recall,
        f1,
        confusion,
    })
}

/// What ends up in the training report: metrics, or the reason there are none.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EvaluationOutcome {
    Evaluated(Evaluation),
    /// Accuracy survives a failure whenever the two label lists still line up.
    Failed {
        reason: String,
        accuracy: Option<f64>,
    },
}

impl EvaluationOutcome {
    /// Evaluate held-out predictions, keeping what can still be computed on error.
    pub fn from_predictions(predictions: &[usize], targets: &[usize]) -> Self {
        match evaluate(predictions, targets) {
            Ok(e) => EvaluationOutcome::Evaluated(e),
            Err(e) => EvaluationOutcome::Failed {
                reason: e.to_string(),
                accuracy: accuracy(predictions, targets),
            },
        }
    }

    pub fn accuracy(&self) -> f64 {
        match self {
            EvaluationOutcome::Evaluated(e) => e.accuracy,
            EvaluationOutcome::Failed { accuracy, .. } => accuracy.unwrap_or(0.0),
        }
    }

    pub fn precision(&self) -> f64 {
        match self {
            EvaluationOutcome::Evaluated(e) => e.precision.or_zero(),
            EvaluationOutcome::Failed { .. } => 0.0,
        }
    }

    pub fn recall(&self) -> f64 {
        match self {
            EvaluationOutcome::Evaluated(e) => e.recall.or_zero(),
            EvaluationOutcome::Failed { .. } => 0.0,
        }
    }

    pub fn f1(&self) -> f64 {
        match self {
            EvaluationOutcome::Evaluated(e) => e.f1.or_zero(),
            EvaluationOutcome::Failed { .. } => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_metrics() {
        let pred = [1, 1, 0, 0, 1];
        let truth = [1, 0, 0, 1, 1];
        let eval = evaluate(&pred, &truth).unwrap();
        assert_eq!(eval.confusion.true_positive, 2);
        assert_eq!(eval.confusion.false_positive, 1);
        assert_eq!(eval.confusion.false_negative, 1);
        assert!((eval.accuracy - 0.6).abs() < 1e-12);
        assert_eq!(eval.precision, Metric::Defined(2.0 / 3.0));
        assert_eq!(eval.recall, Metric::Defined(2.0 / 3.0));
        assert!((eval.f1.or_zero() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_predicted_positives_is_undefined_precision() {
        let eval = evaluate(&[0, 0, 0], &[0, 1, 0]).unwrap();
        assert_eq!(eval.precision, Metric::Undefined);
        assert_eq!(eval.recall, Metric::Defined(0.0));
        assert_eq!(eval.f1, Metric::Undefined);
        assert_eq!(eval.precision.or_zero(), 0.0);
    }

    #[test]
    fn test_no_actual_positives_is_undefined_recall() {
        let eval = evaluate(&[0, 0], &[0, 0]).unwrap();
        assert_eq!(eval.accuracy, 1.0);
        assert_eq!(eval.recall, Metric::Undefined);
    }

    #[test]
    fn test_errors_are_distinct_from_undefined() {
        assert_eq!(evaluate(&[], &[]), Err(MetricError::Empty));
        assert_eq!(
            evaluate(&[1], &[1, 0]),
            Err(MetricError::LengthMismatch {
                predictions: 1,
                targets: 2
            })
        );
        assert_eq!(evaluate(&[2], &[1]), Err(MetricError::NonBinaryLabel(2)));
    }

    #[test]
    fn test_failed_outcome_reports_zeros() {
        let outcome = EvaluationOutcome::from_predictions(&[], &[]);
        assert_eq!(outcome.accuracy(), 0.0);
        assert_eq!(outcome.f1(), 0.0);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert!(json["accuracy"].is_null());
    }

    #[test]
    fn test_failed_outcome_keeps_computable_accuracy() {
        let outcome = EvaluationOutcome::from_predictions(&[2, 1, 0, 0], &[2, 1, 1, 0]);
        assert!(matches!(
            outcome,
            EvaluationOutcome::Failed { accuracy: Some(_), .. }
        ));
        assert!((outcome.accuracy() - 0.75).abs() < 1e-12);
        assert_eq!(outcome.precision(), 0.0);

        let mismatched = EvaluationOutcome::from_predictions(&[1], &[1, 0]);
        assert!(matches!(
            mismatched,
            EvaluationOutcome::Failed { accuracy: None, .. }
        ));
    }

    #[test]
    fn test_undefined_serializes_as_zero() {
        let eval = evaluate(&[0], &[0]).unwrap();
        let json = serde_json::to_value(EvaluationOutcome::Evaluated(eval)).unwrap();
        assert_eq!(json["status"], "evaluated");
        assert_eq!(json["precision"], 0.0);
        assert_eq!(json["accuracy"], 1.0);
    }
}
