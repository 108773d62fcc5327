//! Loading labeled training data from CSV or JSON.

use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

use super::error::DatasetError;
use crate::types::{feature_columns, Record, LABEL_COLUMN};

/// Labeled rows ready for the feature pipeline.
#[derive(Debug, Clone, Default)]
pub struct LabeledData {
    pub records: Vec<Record>,
    pub labels: Vec<usize>,
    /// Rows skipped because the label was missing or empty.
    pub dropped: usize,
}

impl LabeledData {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&l| l == 1).count()
    }
}

/// Read records from `path`; `.json` files are parsed as an array of
/// objects, anything else as CSV with a header row.
pub fn load_records(path: &Path) -> Result<Vec<Record>, DatasetError> {
    let text = std::fs::read_to_string(path).map_err(|source| DatasetError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("json"));

    let records = if is_json {
        let value: Value = serde_json::from_str(&text).map_err(|source| DatasetError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        records_from_json(value)?
    } else {
        parse_csv(&text)?
    };
    info!("Loaded {} rows from {}", records.len(), path.display());
    Ok(records)
}

fn records_from_json(value: Value) -> Result<Vec<Record>, DatasetError> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(map) => Ok(Record::from(map)),
                _ => Err(DatasetError::NotAnObject(i)),
            })
            .collect(),
        _ => Err(DatasetError::NotAnObject(0)),
    }
}

/// Parse CSV text. Empty cells are left out of the record so they read as
/// missing; every feature column and the label must be in the header.
pub fn parse_csv(text: &str) -> Result<Vec<Record>, DatasetError> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty());

    let (_, header_line) = lines.next().ok_or(DatasetError::MissingHeader)?;
    let header: Vec<String> = split_csv_line(header_line)
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();

    for required in feature_columns().into_iter().chain([LABEL_COLUMN]) {
        if !header.iter().any(|h| h == required) {
            return Err(DatasetError::MissingColumn(required.to_string()));
        }
    }

    let mut records = Vec::new();
    for (idx, line) in lines {
        let cells = split_csv_line(line);
        if cells.len() != header.len() {
            return Err(DatasetError::RaggedRow {
                line: idx + 1,
                expected: header.len(),
                actual: cells.len(),
            });
        }
        let mut record = Record::new();
        for (column, cell) in header.iter().zip(cells) {
            if !cell.is_empty() {
                record.insert(column.clone(), cell);
            }
        }
        records.push(record);
    }
    Ok(records)
}

/// Split one CSV line, honouring double-quoted cells and `""` escapes.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut quoted = false;
    let mut chars = line.trim_end_matches('\r').chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                cell.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => cells.push(std::mem::take(&mut cell)),
            _ => cell.push(c),
        }
    }
    cells.push(cell);
    cells
}

/// Split off the label column. Rows with a missing, null or blank label are
/// dropped; any other value must be 0 or 1.
pub fn extract_labels(records: Vec<Record>) -> Result<LabeledData, DatasetError> {
    let mut data = LabeledData::default();
    for (row, record) in records.into_iter().enumerate() {
        let label = match record.present(LABEL_COLUMN) {
            None => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(value) => Some(parse_label(row, value)?),
        };
        match label {
            Some(label) => {
                data.records.push(record);
                data.labels.push(label);
            }
            None => data.dropped += 1,
        }
    }
    if data.dropped > 0 {
        warn!("Dropped {} rows without a label", data.dropped);
    }
    Ok(data)
}

fn parse_label(row: usize, value: &Value) -> Result<usize, DatasetError> {
    let numeric = match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match numeric {
        Some(v) if v == 0.0 => Ok(0),
        Some(v) if v == 1.0 => Ok(1),
        _ => Err(DatasetError::BadLabel {
            row,
            value: match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn header() -> String {
        let mut cols = vec!["txn_id".to_string()];
        cols.extend(feature_columns().iter().map(|c| c.to_string()));
        cols.push(LABEL_COLUMN.to_string());
        cols.join(",")
    }

    fn row(symbol: &str, label: &str) -> String {
        let mut cells = vec!["t1".to_string()];
        cells.extend((0..15).map(|i| i.to_string()));
        cells.push(symbol.to_string());
        cells.push("2".to_string());
        cells.push(String::new());
        cells.push(label.to_string());
        cells.join(",")
    }

    #[test]
    fn test_split_csv_line_quotes() {
        assert_eq!(split_csv_line("a,b,,c"), vec!["a", "b", "", "c"]);
        assert_eq!(
            split_csv_line(r#""x, y","say ""hi""",z"#),
            vec!["x, y", r#"say "hi""#, "z"]
        );
        assert_eq!(split_csv_line("a,b\r"), vec!["a", "b"]);
    }

    #[test]
    fn test_parse_csv_skips_empty_cells() {
        let text = format!("{}\n{}\n", header(), row("AAPL", "1"));
        let records = parse_csv(&text).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.get("symbol"), Some(&json!("AAPL")));
        assert_eq!(r.get("qty"), Some(&json!("0")));
        assert_eq!(r.get("last_alert_severity"), None);
    }

    #[test]
    fn test_parse_csv_missing_column() {
        let text = "qty,price,label\n1,2,0\n";
        assert!(matches!(parse_csv(text), Err(DatasetError::MissingColumn(_))));
        assert!(matches!(parse_csv(""), Err(DatasetError::MissingHeader)));
    }

    #[test]
    fn test_parse_csv_ragged_row() {
        let text = format!("{}\n1,2,3\n", header());
        assert!(matches!(
            parse_csv(&text),
            Err(DatasetError::RaggedRow { line: 2, actual: 3, .. })
        ));
    }

    #[test]
    fn test_extract_labels_drops_missing() {
        let records = vec![
            Record::new().with("label", 1),
            Record::new().with("label", "0"),
            Record::new(),
            Record::new().with("label", ""),
            Record::new().with("label", Value::Null),
            Record::new().with("label", "1.0"),
        ];
        let data = extract_labels(records).unwrap();
        assert_eq!(data.labels, vec![1, 0, 1]);
        assert_eq!(data.dropped, 3);
        assert_eq!(data.positives(), 2);
    }

    #[test]
    fn test_extract_labels_rejects_non_binary() {
        let records = vec![Record::new().with("label", 0), Record::new().with("label", "fraud")];
        assert!(matches!(
            extract_labels(records),
            Err(DatasetError::BadLabel { row: 1, .. })
        ));
    }

    #[test]
    fn test_load_json_and_csv_files() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("rows.json");
        std::fs::write(&json_path, r#"[{"qty": 1, "label": 0}, {"symbol": "X", "label": 1}]"#).unwrap();
        let records = load_records(&json_path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("symbol"), Some(&json!("X")));

        let csv_path = dir.path().join("rows.csv");
        let mut file = std::fs::File::create(&csv_path).unwrap();
        writeln!(file, "{}", header()).unwrap();
        writeln!(file, "{}", row("MSFT", "0")).unwrap();
        drop(file);
        assert_eq!(load_records(&csv_path).unwrap().len(), 1);

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "[1, 2]").unwrap();
        assert!(matches!(load_records(&bad), Err(DatasetError::NotAnObject(0))));
        assert!(matches!(
            load_records(&dir.path().join("missing.csv")),
            Err(DatasetError::Read { .. })
        ));
    }
}
