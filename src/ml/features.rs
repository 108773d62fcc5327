//! Feature encoding shared by training and serving.
//!
//! A record becomes an 18-wide vector: the 15 numeric columns, z-scored with
//! the frozen scaler, followed by the 3 categorical codes. Training and
//! serving go through the same coercion helpers so the two can't drift.

use ndarray::{Array1, Array2};
use serde_json::Value;

use super::encoder::{CategoryEncoder, EncoderSet};
use super::error::{ArtifactError, EncodeError, TrainingError};
use super::scaler::StandardScaler;
use crate::types::{
    kind_of, Record, CATEGORICAL_COLUMNS, NUMERIC_COLUMNS, NUM_CATEGORICAL, NUM_FEATURES,
    NUM_NUMERIC,
};

/// Numeric value of `column`, with 0 for missing, null or blank values.
pub fn numeric_value(record: &Record, column: &'static str) -> Result<f64, EncodeError> {
    let value = match record.present(column) {
        Some(v) => v,
        None => return Ok(0.0),
    };
    let not_numeric = || EncodeError::NotNumeric {
        column,
        kind: kind_of(value),
        value: value.to_string(),
    };

    match value {
        Value::Number(n) => n.as_f64().ok_or_else(not_numeric),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                Ok(0.0)
            } else {
                s.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(not_numeric)
            }
        }
        _ => Err(not_numeric()),
    }
}

/// Raw (unscaled) numeric block of a record.
pub fn raw_numeric(record: &Record) -> Result<[f64; NUM_NUMERIC], EncodeError> {
    let mut out = [0.0; NUM_NUMERIC];
    for (slot, column) in out.iter_mut().zip(NUMERIC_COLUMNS) {
        *slot = numeric_value(record, column)?;
    }
    Ok(out)
}

/// String form of a categorical value as the encoders store it.
///
/// Booleans become `True`/`False` and `null` becomes `None`, so values
/// exported by the data tooling line up with the fitted classes.
pub fn category_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}

/// Training-time key of a categorical field, `None` when absent or null.
pub fn category_key(record: &Record, column: &str) -> Option<String> {
    record.present(column).map(category_string)
}

/// Frozen encoders and scaler: the whole record-to-vector transform.
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturePipeline {
    encoders: EncoderSet,
    scaler: StandardScaler,
}

impl FeaturePipeline {
    /// Pair a loaded encoder set with a loaded scaler, checking column layout.
    pub fn new(encoders: EncoderSet, scaler: StandardScaler) -> Result<Self, ArtifactError> {
        scaler.check_columns(&NUMERIC_COLUMNS)?;
        Ok(Self { encoders, scaler })
    }

    /// Fit encoders and scaler on labeled training records.
    ///
    /// Returns the pipeline together with the encoded design matrix. Missing
    /// categorical cells are treated as the empty string here, the same
    /// cleaning the exported datasets get.
    pub fn fit(records: &[Record]) -> Result<(Self, Array2<f64>), TrainingError> {
        if records.is_empty() {
            return Err(TrainingError::NoRows);
        }
        let n = records.len();

        let mut numeric = Array2::<f64>::zeros((n, NUM_NUMERIC));
        for (i, record) in records.iter().enumerate() {
            let raw = raw_numeric(record).map_err(|source| TrainingError::Encode { row: i, source })?;
            for (j, v) in raw.iter().enumerate() {
                numeric[[i, j]] = *v;
            }
        }

        let keys: Vec<[String; NUM_CATEGORICAL]> = records
            .iter()
            .map(|r| CATEGORICAL_COLUMNS.map(|c| category_key(r, c).unwrap_or_default()))
            .collect();
        let encoders = EncoderSet::new(std::array::from_fn(|j| {
            CategoryEncoder::fit(keys.iter().map(|k| k[j].as_str()))
        }));

        let scaler = StandardScaler::fit(&NUMERIC_COLUMNS, &numeric).ok_or(TrainingError::NoRows)?;
        scaler.transform(&mut numeric);

        let mut features = Array2::<f64>::zeros((n, NUM_FEATURES));
        for i in 0..n {
            for j in 0..NUM_NUMERIC {
                features[[i, j]] = numeric[[i, j]];
            }
            for (j, key) in keys[i].iter().enumerate() {
                features[[i, NUM_NUMERIC + j]] = encoders.get(j).encode(key) as f64;
            }
        }

        Ok((Self { encoders, scaler }, features))
    }

    pub fn encoders(&self) -> &EncoderSet {
        &self.encoders
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// Integer codes for the categorical block.
    ///
    /// An absent field takes code 0, the first known class. A present value,
    /// `null` included, goes through the encoder, so anything unseen takes
    /// the unknown sentinel. Callers relying on "missing means unknown" will
    /// be surprised.
    pub fn categorical_codes(&self, record: &Record) -> [usize; NUM_CATEGORICAL] {
        std::array::from_fn(|j| {
            record
                .get(CATEGORICAL_COLUMNS[j])
                .map(|value| self.encoders.get(j).encode(&category_string(value)))
                .unwrap_or(0)
        })
    }

    /// Encode one record into the model's feature order.
    pub fn encode(&self, record: &Record) -> Result<Array1<f64>, EncodeError> {
        let raw = raw_numeric(record)?;
        let mut features = Array1::<f64>::zeros(NUM_FEATURES);
        for (j, v) in raw.iter().enumerate() {
            features[j] = self.scaler.transform_value(j, *v);
        }
        for (j, code) in self.categorical_codes(record).iter().enumerate() {
            features[NUM_NUMERIC + j] = *code as f64;
        }
        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn training_records() -> Vec<Record> {
        vec![
            Record::new()
                .with("qty", 10)
                .with("price", 100.0)
                .with("trade_amount", 1000.0)
                .with("symbol", "MSFT")
                .with("alerts_last_7d", 0)
                .with("last_alert_severity", "low"),
            Record::new()
                .with("qty", 20)
                .with("price", 50.0)
                .with("trade_amount", 1000.0)
                .with("symbol", "AAPL")
                .with("alerts_last_7d", 2)
                .with("last_alert_severity", "high"),
            Record::new()
                .with("qty", "30")
                .with("price", 150.0)
                .with("trade_amount", 4500.0)
                .with("symbol", "TSLA")
                .with("alerts_last_7d", "1"),
        ]
    }

    fn pipeline() -> FeaturePipeline {
        FeaturePipeline::fit(&training_records()).unwrap().0
    }

    #[test]
    fn test_numeric_coercion() {
        let record = Record::new()
            .with("qty", json!(3))
            .with("price", "2.5")
            .with("trade_amount", "")
            .with("ip_change_detected", true)
            .with("geo_distance_km", Value::Null);
        assert_eq!(numeric_value(&record, "qty").unwrap(), 3.0);
        assert_eq!(numeric_value(&record, "price").unwrap(), 2.5);
        assert_eq!(numeric_value(&record, "trade_amount").unwrap(), 0.0);
        assert_eq!(numeric_value(&record, "ip_change_detected").unwrap(), 1.0);
        assert_eq!(numeric_value(&record, "geo_distance_km").unwrap(), 0.0);
        assert_eq!(numeric_value(&record, "anomaly_count").unwrap(), 0.0);
    }

    #[test]
    fn test_numeric_rejects_garbage() {
        let record = Record::new().with("qty", "lots").with("price", json!([1]));
        assert!(matches!(
            numeric_value(&record, "qty"),
            Err(EncodeError::NotNumeric { column: "qty", .. })
        ));
        assert!(numeric_value(&record, "price").is_err());
    }

    #[test]
    fn test_category_key_stringifies() {
        let record = Record::new()
            .with("symbol", "AAPL")
            .with("alerts_last_7d", 3)
            .with("last_alert_severity", Value::Null);
        assert_eq!(category_key(&record, "symbol").as_deref(), Some("AAPL"));
        assert_eq!(category_key(&record, "alerts_last_7d").as_deref(), Some("3"));
        assert_eq!(category_key(&record, "last_alert_severity"), None);
        assert_eq!(category_string(&Value::Null), "None");
    }

    #[test]
    fn test_bool_category_uses_capitalized_names() {
        let record = Record::new().with("symbol", true).with("last_alert_severity", false);
        assert_eq!(category_key(&record, "symbol").as_deref(), Some("True"));
        assert_eq!(category_key(&record, "last_alert_severity").as_deref(), Some("False"));

        let training = vec![
            Record::new().with("symbol", true),
            Record::new().with("symbol", false),
        ];
        let (pipeline, _) = FeaturePipeline::fit(&training).unwrap();
        assert_eq!(pipeline.encoders().get(0).classes(), &["False", "True"]);
        let served = pipeline.categorical_codes(&Record::new().with("symbol", "True"));
        assert_eq!(served[0], 1);
    }

    #[test]
    fn test_fit_learns_classes_from_training_rows() {
        let pipeline = pipeline();
        let encoders = pipeline.encoders();
        assert_eq!(encoders.get(0).classes(), &["AAPL", "MSFT", "TSLA"]);
        assert_eq!(encoders.get(1).classes(), &["0", "1", "2"]);
        // third row has no severity, cleaned to ""
        assert_eq!(encoders.get(2).classes(), &["", "high", "low"]);
    }

    #[test]
    fn test_fit_matrix_matches_serving_encode() {
        let records = training_records();
        let (pipeline, matrix) = FeaturePipeline::fit(&records).unwrap();
        assert_eq!(matrix.dim(), (3, NUM_FEATURES));
        for (i, record) in records.iter().take(2).enumerate() {
            let served = pipeline.encode(record).unwrap();
            for j in 0..NUM_FEATURES {
                assert!((matrix[[i, j]] - served[j]).abs() < 1e-12, "row {} col {}", i, j);
            }
        }
    }

    #[test]
    fn test_seen_category_encodes_to_training_position() {
        let pipeline = pipeline();
        let record = Record::new().with("symbol", "TSLA").with("alerts_last_7d", 2);
        let encoded = pipeline.encode(&record).unwrap();
        assert_eq!(encoded[NUM_NUMERIC], 2.0);
        assert_eq!(encoded[NUM_NUMERIC + 1], 2.0);
    }

    #[test]
    fn test_unseen_category_encodes_to_sentinel() {
        let pipeline = pipeline();
        let record = Record::new()
            .with("symbol", "NVDA")
            .with("alerts_last_7d", 9)
            .with("last_alert_severity", "critical");
        assert_eq!(pipeline.categorical_codes(&record), [3, 3, 3]);
    }

    #[test]
    fn test_missing_category_takes_first_class() {
        let pipeline = pipeline();
        assert_eq!(pipeline.categorical_codes(&Record::new()), [0, 0, 0]);
    }

    #[test]
    fn test_null_category_is_unknown() {
        let pipeline = pipeline();
        let record = Record::new()
            .with("symbol", Value::Null)
            .with("alerts_last_7d", Value::Null)
            .with("last_alert_severity", Value::Null);
        assert_eq!(pipeline.categorical_codes(&record), [3, 3, 3]);

        let partial = Record::new().with("symbol", Value::Null);
        assert_eq!(pipeline.categorical_codes(&partial), [3, 0, 0]);
    }

    #[test]
    fn test_empty_record_scales_to_neg_mean_over_std() {
        let pipeline = pipeline();
        let encoded = pipeline.encode(&Record::new()).unwrap();
        let scaler = pipeline.scaler();
        for j in 0..NUM_NUMERIC {
            let expected = -scaler.means()[j] / scaler.stds()[j];
            assert!((encoded[j] - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_encode_is_idempotent() {
        let pipeline = pipeline();
        let record = Record::new()
            .with("qty", 7)
            .with("symbol", "MSFT")
            .with("last_alert_severity", "unknown");
        assert_eq!(pipeline.encode(&record).unwrap(), pipeline.encode(&record).unwrap());
    }

    #[test]
    fn test_fit_rejects_empty_and_bad_rows() {
        assert!(matches!(FeaturePipeline::fit(&[]), Err(TrainingError::NoRows)));
        let bad = vec![Record::new().with("price", "n/a")];
        assert!(matches!(
            FeaturePipeline::fit(&bad),
            Err(TrainingError::Encode { row: 0, .. })
        ));
    }

    #[test]
    fn test_new_rejects_scaler_with_wrong_columns() {
        let pipeline = pipeline();
        let wrong = StandardScaler::fit(&["qty"], &ndarray::array![[1.0], [2.0]]).unwrap();
        assert!(FeaturePipeline::new(pipeline.encoders().clone(), wrong).is_err());
        assert!(FeaturePipeline::new(pipeline.encoders().clone(), pipeline.scaler().clone()).is_ok());
    }
}
