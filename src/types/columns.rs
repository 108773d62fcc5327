/// Numeric feature columns, in the order the scaler is fitted on.
pub const NUMERIC_COLUMNS: [&str; 15] = [
    "qty",
    "price",
    "trade_amount",
    "holding_age_days",
    "account_age_days",
    "portfolio_value",
    "avg_user_trade_size",
    "trade_velocity_5m",
    "abnormal_volume_ratio",
    "ip_change_detected",
    "ua_change_detected",
    "geo_distance_km",
    "country_mismatch",
    "previous_fraud_score",
    "anomaly_count",
];

/// Categorical feature columns, appended after the numeric block.
pub const CATEGORICAL_COLUMNS: [&str; 3] = ["symbol", "alerts_last_7d", "last_alert_severity"];

pub const LABEL_COLUMN: &str = "label";

/// Identifier columns present in exported datasets; never used as features.
pub const ID_COLUMNS: [&str; 4] = ["txn_id", "user_id", "portfolio_id", "holding_id"];

pub const NUM_NUMERIC: usize = NUMERIC_COLUMNS.len();
pub const NUM_CATEGORICAL: usize = CATEGORICAL_COLUMNS.len();
pub const NUM_FEATURES: usize = NUM_NUMERIC + NUM_CATEGORICAL;

/// Full feature order: numeric columns followed by categorical columns.
pub fn feature_columns() -> Vec<&'static str> {
    NUMERIC_COLUMNS
        .iter()
        .chain(CATEGORICAL_COLUMNS.iter())
        .copied()
        .collect()
}
