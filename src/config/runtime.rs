use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::ml::persistence::{
    ArtifactPaths, DEFAULT_ENCODERS_PATH, DEFAULT_MODEL_PATH, DEFAULT_REPORT_PATH,
    DEFAULT_SCALER_PATH,
};

pub const DEFAULT_INPUT_FILE: &str = "fraud.csv";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5001;

/// Prediction server settings, read from `MODEL_IN`, `SCALER_IN`, `ENC_IN`,
/// `HOST` and `PORT`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServeConfig {
    pub model_in: PathBuf,
    pub scaler_in: PathBuf,
    pub enc_in: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            model_in: PathBuf::from(DEFAULT_MODEL_PATH),
            scaler_in: PathBuf::from(DEFAULT_SCALER_PATH),
            enc_in: PathBuf::from(DEFAULT_ENCODERS_PATH),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(None)
    }

    /// Build from an explicit variable map instead of the process environment.
    pub fn from_source(vars: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Config::builder()
            .set_default("model_in", defaults.model_in.display().to_string())?
            .set_default("scaler_in", defaults.scaler_in.display().to_string())?
            .set_default("enc_in", defaults.enc_in.display().to_string())?
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .add_source(Environment::default().try_parsing(true).source(vars))
            .build()?
            .try_deserialize()
    }

    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            model: self.model_in.clone(),
            scaler: self.scaler_in.clone(),
            encoders: self.enc_in.clone(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (name, path) in [
            ("MODEL_IN", &self.model_in),
            ("SCALER_IN", &self.scaler_in),
            ("ENC_IN", &self.enc_in),
        ] {
            if path.as_os_str().is_empty() {
                errors.push(format!("{} must not be empty", name));
            }
        }
        if self.host.trim().is_empty() {
            errors.push("HOST must not be empty".to_string());
        }
        if self.port == 0 {
            errors.push("PORT must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Training job settings, read from `INPUT_FILE`, `MODEL_OUT`, `SCALER_OUT`,
/// `ENC_OUT` and `REPORT_OUT`; CLI flags take precedence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub input_file: PathBuf,
    pub model_out: PathBuf,
    pub scaler_out: PathBuf,
    pub enc_out: PathBuf,
    pub report_out: PathBuf,
    pub test_fraction: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            input_file: PathBuf::from(DEFAULT_INPUT_FILE),
            model_out: PathBuf::from(DEFAULT_MODEL_PATH),
            scaler_out: PathBuf::from(DEFAULT_SCALER_PATH),
            enc_out: PathBuf::from(DEFAULT_ENCODERS_PATH),
            report_out: PathBuf::from(DEFAULT_REPORT_PATH),
            test_fraction: 0.2,
        }
    }
}

impl TrainConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(None)
    }

    pub fn from_source(vars: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Config::builder()
            .set_default("input_file", defaults.input_file.display().to_string())?
            .set_default("model_out", defaults.model_out.display().to_string())?
            .set_default("scaler_out", defaults.scaler_out.display().to_string())?
            .set_default("enc_out", defaults.enc_out.display().to_string())?
            .set_default("report_out", defaults.report_out.display().to_string())?
            .set_default("test_fraction", defaults.test_fraction)?
            .add_source(Environment::default().try_parsing(true).source(vars))
            .build()?
            .try_deserialize()
    }

    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            model: self.model_out.clone(),
            scaler: self.scaler_out.clone(),
            encoders: self.enc_out.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.input_file.as_os_str().is_empty() {
            errors.push("INPUT_FILE must not be empty".to_string());
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            errors.push("test_fraction must be between 0 and 1".to_string());
        }
        let outputs = [&self.model_out, &self.scaler_out, &self.enc_out, &self.report_out];
        for (i, a) in outputs.iter().enumerate() {
            if outputs[i + 1..].contains(a) {
                errors.push(format!("output path {} is used twice", a.display()));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_serve_defaults() {
        let config = ServeConfig::from_source(vars(&[])).unwrap();
        assert_eq!(config, ServeConfig::default());
        assert_eq!(config.bind_addr(), "0.0.0.0:5001");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serve_env_overrides() {
        let config = ServeConfig::from_source(vars(&[
            ("MODEL_IN", "/models/rf_v2.json"),
            ("ENC_IN", "enc.json"),
            ("PORT", "8080"),
        ]))
        .unwrap();
        assert_eq!(config.model_in, PathBuf::from("/models/rf_v2.json"));
        assert_eq!(config.enc_in, PathBuf::from("enc.json"));
        assert_eq!(config.scaler_in, PathBuf::from(DEFAULT_SCALER_PATH));
        assert_eq!(config.port, 8080);
        assert_eq!(config.artifact_paths().model, PathBuf::from("/models/rf_v2.json"));
    }

    #[test]
    fn test_serve_validation() {
        let config = ServeConfig {
            port: 0,
            host: " ".to_string(),
            ..ServeConfig::default()
        };
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_train_defaults_and_overrides() {
        let config = TrainConfig::from_source(vars(&[])).unwrap();
        assert_eq!(config.input_file, PathBuf::from("fraud.csv"));
        assert!(config.validate().is_ok());

        let config = TrainConfig::from_source(vars(&[("INPUT_FILE", "data/history.json")])).unwrap();
        assert_eq!(config.input_file, PathBuf::from("data/history.json"));
    }

    #[test]
    fn test_train_rejects_clashing_outputs() {
        let config = TrainConfig {
            scaler_out: PathBuf::from(DEFAULT_MODEL_PATH),
            ..TrainConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
