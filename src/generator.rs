use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Write;
use std::path::Path;

use crate::types::{Record, CATEGORICAL_COLUMNS, ID_COLUMNS, LABEL_COLUMN, NUMERIC_COLUMNS};

pub const SYMBOLS: &[(&str, f64)] = &[
    ("AAPL", 190.0),
    ("GOOGL", 140.0),
    ("MSFT", 420.0),
    ("AMZN", 185.0),
    ("TSLA", 250.0),
];

const SEVERITIES: &[&str] = &["low", "medium", "high"];

/// Deterministic labeled transaction generator.
///
/// Suspicious rows carry an outsized `trade_amount` and are labeled fraud
/// 90% of the time; regular rows are labeled fraud 2% of the time.
pub struct SyntheticGenerator {
    rng: StdRng,
    seq: u64,
    pub fraud_rate: f64,
}

impl SyntheticGenerator {
    pub fn new(fraud_rate: f64, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seq: 0,
            fraud_rate: fraud_rate.clamp(0.0, 1.0),
        }
    }

    pub fn generate(&mut self, rows: usize) -> Vec<Record> {
        (0..rows).map(|_| self.next_record()).collect()
    }

    pub fn next_record(&mut self) -> Record {
        self.seq += 1;
        let rng = &mut self.rng;

        let suspicious = rng.gen_bool(self.fraud_rate);
        let (symbol, base_price) = SYMBOLS[rng.gen_range(0..SYMBOLS.len())];
        let price = base_price * rng.gen_range(0.95..1.05);

        let (qty, trade_amount) = if suspicious {
            let amount = rng.gen_range(50_000.0..250_000.0);
            ((amount / price).round(), amount)
        } else {
            let qty: f64 = rng.gen_range(1..40) as f64;
            (qty, qty * price)
        };

        let label = if suspicious {
            rng.gen_bool(0.9)
        } else {
            rng.gen_bool(0.02)
        };

        let alerts = rng.gen_range(0..4u32);
        let mut record = Record::new()
            .with("txn_id", format!("TXN-{:06}", self.seq))
            .with("user_id", format!("USER-{:03}", rng.gen_range(1..50)))
            .with("portfolio_id", format!("PF-{:03}", rng.gen_range(1..60)))
            .with("holding_id", format!("H-{:04}", rng.gen_range(1..500)))
            .with("qty", qty)
            .with("price", round2(price))
            .with("trade_amount", round2(trade_amount))
            .with("holding_age_days", rng.gen_range(0..720))
            .with("account_age_days", rng.gen_range(1..3000))
            .with("portfolio_value", round2(rng.gen_range(5_000.0..500_000.0)))
            .with("avg_user_trade_size", round2(rng.gen_range(500.0..8_000.0)))
            .with("trade_velocity_5m", rng.gen_range(0..6))
            .with("abnormal_volume_ratio", round2(rng.gen_range(0.5..2.0)))
            .with("ip_change_detected", u8::from(rng.gen_bool(0.1)))
            .with("ua_change_detected", u8::from(rng.gen_bool(0.1)))
            .with("geo_distance_km", round2(rng.gen_range(0.0..300.0)))
            .with("country_mismatch", u8::from(rng.gen_bool(0.05)))
            .with("previous_fraud_score", round2(rng.gen_range(0.0..0.3)))
            .with("anomaly_count", rng.gen_range(0..3))
            .with("symbol", symbol)
            .with("alerts_last_7d", alerts)
            .with(LABEL_COLUMN, u8::from(label));

        if alerts > 0 {
            record.insert(
                "last_alert_severity",
                SEVERITIES[rng.gen_range(0..SEVERITIES.len())],
            );
        }
        record
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Write records as CSV with the ID, feature and label columns.
pub fn write_csv(path: &Path, records: &[Record]) -> std::io::Result<()> {
    let columns: Vec<&str> = ID_COLUMNS
        .iter()
        .chain(NUMERIC_COLUMNS.iter())
        .chain(CATEGORICAL_COLUMNS.iter())
        .chain(std::iter::once(&LABEL_COLUMN))
        .copied()
        .collect();

    let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
    writeln!(out, "{}", columns.join(","))?;
    for record in records {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| match record.present(c) {
                Some(serde_json::Value::String(s)) => csv_cell(s),
                Some(other) => other.to_string(),
                None => String::new(),
            })
            .collect();
        writeln!(out, "{}", cells.join(","))?;
    }
    out.flush()
}

fn csv_cell(s: &str) -> String {
    if s.contains(',') || s.contains('"') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
