use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::classify::BACKEND_NAMES;
use crate::error::PipelineError;
use crate::frame::{InputGeometry, DEFAULT_INPUT_HEIGHT, DEFAULT_INPUT_WIDTH};
use crate::pipeline::PipelineSettings;
use crate::sampler::DEFAULT_CADENCE;

const DEFAULT_DB_PATH: &str = "accident_history.db";
const DEFAULT_BACKEND: &str = "stub";
pub const DEFAULT_LOCATION: &str = "Unknown Location";

#[derive(Debug, Deserialize, Default)]
struct AppConfigFile {
    db_path: Option<String>,
    location: Option<String>,
    sampling: Option<SamplingConfigFile>,
    classifier: Option<ClassifierConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct SamplingConfigFile {
    cadence: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ClassifierConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    input_width: Option<u32>,
    input_height: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: String,
    pub location: String,
    pub cadence: u32,
    pub geometry: InputGeometry,
    pub classifier: ClassifierSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierSettings {
    pub backend: String,
    pub model_path: Option<PathBuf>,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_string(),
            model_path: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            location: DEFAULT_LOCATION.to_string(),
            cadence: DEFAULT_CADENCE,
            geometry: InputGeometry::default(),
            classifier: ClassifierSettings::default(),
        }
    }
}

impl AppConfig {
    /// File named by `ACCIDENT_CONFIG` (JSON, or TOML for `.toml`), then env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("ACCIDENT_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AppConfigFile) -> Self {
        let defaults = Self::default();
        let classifier = file.classifier.unwrap_or_default();
        Self {
            db_path: file.db_path.unwrap_or(defaults.db_path),
            location: file.location.unwrap_or(defaults.location),
            cadence: file
                .sampling
                .and_then(|sampling| sampling.cadence)
                .unwrap_or(defaults.cadence),
            geometry: InputGeometry {
                width: classifier.input_width.unwrap_or(DEFAULT_INPUT_WIDTH),
                height: classifier.input_height.unwrap_or(DEFAULT_INPUT_HEIGHT),
            },
            classifier: ClassifierSettings {
                backend: classifier.backend.unwrap_or(defaults.classifier.backend),
                model_path: classifier.model_path,
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("ACCIDENT_DB_PATH") {
            if !path.trim().is_empty() {
                self.db_path = path;
            }
        }
        if let Ok(location) = std::env::var("ACCIDENT_LOCATION") {
            if !location.trim().is_empty() {
                self.location = location;
            }
        }
        if let Ok(backend) = std::env::var("ACCIDENT_BACKEND") {
            if !backend.trim().is_empty() {
                self.classifier.backend = backend.trim().to_lowercase();
            }
        }
        if let Ok(path) = std::env::var("ACCIDENT_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.classifier.model_path = Some(PathBuf::from(path));
            }
        }
        if let Some(cadence) = env_u32("ACCIDENT_CADENCE")? {
            self.cadence = cadence;
        }
        if let Some(width) = env_u32("ACCIDENT_INPUT_WIDTH")? {
            self.geometry.width = width;
        }
        if let Some(height) = env_u32("ACCIDENT_INPUT_HEIGHT")? {
            self.geometry.height = height;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.pipeline_settings()?;
        if !BACKEND_NAMES.contains(&self.classifier.backend.as_str()) {
            return Err(PipelineError::config(format!(
                "unknown classifier backend '{}' (expected one of {:?})",
                self.classifier.backend, BACKEND_NAMES
            ))
            .into());
        }
        if self.classifier.backend == "tract" && self.classifier.model_path.is_none() {
            return Err(PipelineError::config(
                "the tract backend requires classifier.model_path or ACCIDENT_MODEL_PATH",
            )
            .into());
        }
        if self.db_path.trim().is_empty() {
            return Err(PipelineError::config("db_path must not be empty").into());
        }
        Ok(())
    }

    pub fn pipeline_settings(&self) -> Result<PipelineSettings> {
        PipelineSettings::new(self.cadence, self.geometry)
    }
}

fn read_config_file(path: &Path) -> Result<AppConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn env_u32(key: &str) -> Result<Option<u32>> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value.trim().parse().map(Some).map_err(|_| {
            PipelineError::config(format!("{} must be a non-negative integer", key)).into()
        }),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = AppConfig::from_file(AppConfigFile::default());
        assert_eq!(cfg.db_path, "accident_history.db");
        assert_eq!(cfg.location, "Unknown Location");
        assert_eq!(cfg.cadence, 5);
        assert_eq!(cfg.geometry, InputGeometry::new(224, 224).unwrap());
        assert_eq!(cfg.classifier.backend, "stub");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn tract_without_model_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.classifier.backend = "tract".to_string();
        assert!(cfg.validate().is_err());
        cfg.classifier.model_path = Some(PathBuf::from("accident_model.onnx"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn toml_sections_parse() {
        let raw = r#"
            db_path = "history.db"

            [sampling]
            cadence = 3

            [classifier]
            backend = "tract"
            model_path = "models/accident.onnx"
            input_width = 160
        "#;
        let file: AppConfigFile = toml::from_str(raw).unwrap();
        let cfg = AppConfig::from_file(file);
        assert_eq!(cfg.db_path, "history.db");
        assert_eq!(cfg.cadence, 3);
        assert_eq!(cfg.geometry.width, 160);
        assert_eq!(cfg.geometry.height, 224);
        assert_eq!(
            cfg.classifier.model_path,
            Some(PathBuf::from("models/accident.onnx"))
        );
    }
}
