use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::error::EncoderError;
use crate::types::{kind_of, CATEGORICAL_COLUMNS, NUM_CATEGORICAL};

/// Label encoder for one categorical column.
///
/// Codes are positions in `classes`. `classes.len()` is reserved for any value
/// not seen at fit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryEncoder {
    classes: Vec<String>,
}

impl CategoryEncoder {
    /// Learn the sorted set of distinct values.
    pub fn fit<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let distinct: BTreeSet<String> = values
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .collect();
        Self {
            classes: distinct.into_iter().collect(),
        }
    }

    /// Build from an already ordered class list, rejecting duplicates.
    pub fn from_classes(column: &str, classes: Vec<String>) -> Result<Self, EncoderError> {
        let mut seen = HashSet::with_capacity(classes.len());
        for class in &classes {
            if !seen.insert(class.as_str()) {
                return Err(EncoderError::DuplicateClass {
                    column: column.to_string(),
                    class: class.clone(),
                });
            }
        }
        Ok(Self { classes })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn unknown_code(&self) -> usize {
        self.classes.len()
    }

    pub fn encode(&self, value: &str) -> usize {
        self.classes
            .iter()
            .position(|c| c == value)
            .unwrap_or_else(|| self.unknown_code())
    }
}

/// One encoder per categorical column, aligned with `CATEGORICAL_COLUMNS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderSet {
    encoders: Vec<CategoryEncoder>,
}

impl EncoderSet {
    pub fn new(encoders: [CategoryEncoder; NUM_CATEGORICAL]) -> Self {
        Self {
            encoders: encoders.into(),
        }
    }

    /// Encoder at position `idx` of `CATEGORICAL_COLUMNS`.
    pub fn get(&self, idx: usize) -> &CategoryEncoder {
        &self.encoders[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &CategoryEncoder)> {
        CATEGORICAL_COLUMNS.iter().copied().zip(self.encoders.iter())
    }

    /// Serialize in the indexed form: `{"symbol": {"0": "AAPL", ...}, ...}`.
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        let stored: BTreeMap<&str, BTreeMap<usize, &str>> = self
            .iter()
            .map(|(column, enc)| {
                let indexed = enc
                    .classes()
                    .iter()
                    .enumerate()
                    .map(|(i, c)| (i, c.as_str()))
                    .collect();
                (column, indexed)
            })
            .collect();
        serde_json::to_value(stored)
    }

    /// Parse either stored form, collapsing it to an ordered class list.
    ///
    /// Columns other than the categorical feature columns are ignored.
    pub fn from_json(value: &Value) -> Result<Self, EncoderError> {
        let root = value
            .as_object()
            .ok_or_else(|| EncoderError::NotAnObject(kind_of(value)))?;

        let mut encoders = Vec::with_capacity(NUM_CATEGORICAL);
        for column in CATEGORICAL_COLUMNS {
            let stored = root
                .get(column)
                .ok_or_else(|| EncoderError::MissingColumn(column.to_string()))?;
            let classes = stored_classes(column, stored)?;
            encoders.push(CategoryEncoder::from_classes(column, classes)?);
        }
        Ok(Self { encoders })
    }
}

fn stored_classes(column: &str, stored: &Value) -> Result<Vec<String>, EncoderError> {
    match stored {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| class_string(column, index, item))
            .collect(),
        Value::Object(map) => {
            let mut indexed = BTreeMap::new();
            for (key, item) in map {
                let index: usize = key.trim().parse().map_err(|_| EncoderError::BadIndex {
                    column: column.to_string(),
                    key: key.clone(),
                })?;
                indexed.insert(index, class_string(column, index, item)?);
            }
            // Keys must be exactly 0..n.
            for (expected, &index) in indexed.keys().enumerate() {
                if index != expected {
                    return Err(EncoderError::MissingIndex {
                        column: column.to_string(),
                        index: expected,
                    });
                }
            }
            Ok(indexed.into_values().collect())
        }
        other => Err(EncoderError::Malformed {
            column: column.to_string(),
            kind: kind_of(other),
        }),
    }
}

fn class_string(column: &str, index: usize, item: &Value) -> Result<String, EncoderError> {
    item.as_str()
        .map(str::to_string)
        .ok_or_else(|| EncoderError::NonStringClass {
            column: column.to_string(),
            index,
            kind: kind_of(item),
        })
}
