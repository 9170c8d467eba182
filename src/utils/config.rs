use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::converter::ConversionMode;
use crate::core::{DEFAULT_STEP_KM, EARTH_RADIUS_KM};

/// Parameters for a transport run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Length of the theta/phi displacement (km)
    pub step_km: f64,
    /// Radius subtracted from the sample radius to get conversion height (km)
    pub earth_radius_km: f64,
    /// Extra converter flags; the direction is always geographic to AACGM
    pub mode: ConversionMode,
    /// Spread samples over a thread pool
    pub parallel: bool,
    /// Size of a dedicated pool; `None` uses the global rayon pool
    pub worker_threads: Option<usize>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            step_km: DEFAULT_STEP_KM,
            earth_radius_km: EARTH_RADIUS_KM,
            mode: ConversionMode::G2A,
            parallel: false,
            worker_threads: None,
        }
    }
}

impl TransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step_km(mut self, step_km: f64) -> Self {
        self.step_km = step_km;
        self
    }

    pub fn with_mode(mut self, mode: ConversionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid {parameter} = {value}: {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },
    #[error("config I/O error: {message}")]
    IoError { message: String },
    #[error("config serialization error: {message}")]
    SerializationError { message: String },
}

/// Outcome of validating a configuration
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ConfigError>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    fn into_result(self) -> Result<Vec<String>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(error),
            None => Ok(self.warnings),
        }
    }
}

/// Check a configuration without applying it
pub fn validate_config(config: &TransportConfig) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if !config.step_km.is_finite() || config.step_km <= 0.0 {
        errors.push(ConfigError::InvalidParameter {
            parameter: "step_km".to_string(),
            value: config.step_km.to_string(),
            reason: "Perturbation step must be a positive length".to_string(),
        });
    } else if config.step_km > 100.0 {
        warnings.push("Large perturbation step gives a coarse finite difference".to_string());
    } else if config.step_km < 1e-3 {
        warnings.push("Very small perturbation step loses precision to cancellation".to_string());
    }

    if !config.earth_radius_km.is_finite() || config.earth_radius_km <= 0.0 {
        errors.push(ConfigError::InvalidParameter {
            parameter: "earth_radius_km".to_string(),
            value: config.earth_radius_km.to_string(),
            reason: "Earth radius must be positive".to_string(),
        });
    } else if !(6350.0..=6390.0).contains(&config.earth_radius_km) {
        warnings.push(format!(
            "Earth radius {} km is far from the usual {} km",
            config.earth_radius_km, EARTH_RADIUS_KM
        ));
    }

    if config.mode.is_inverse() {
        errors.push(ConfigError::InvalidParameter {
            parameter: "mode".to_string(),
            value: config.mode.to_string(),
            reason: "Vector transport always converts geographic to AACGM".to_string(),
        });
    }

    if config.worker_threads == Some(0) {
        errors.push(ConfigError::InvalidParameter {
            parameter: "worker_threads".to_string(),
            value: "0".to_string(),
            reason: "Worker pool needs at least one thread".to_string(),
        });
    }

    if config.worker_threads.is_some() && !config.parallel {
        warnings.push("worker_threads is ignored unless parallel is enabled".to_string());
    }

    ValidationResult {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}

/// Loads, validates and persists a [`TransportConfig`]
pub struct ConfigurationManager {
    config: TransportConfig,
    config_file_path: Option<String>,
    is_modified: bool,
}

impl Default for ConfigurationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationManager {
    pub fn new() -> Self {
        Self {
            config: TransportConfig::default(),
            config_file_path: None,
            is_modified: false,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut manager = Self::new();
        manager.load_from_file(path)?;
        Ok(manager)
    }

    pub fn get_config(&self) -> &TransportConfig {
        &self.config
    }

    /// Replace the configuration, returning validation warnings
    pub fn update_config(&mut self, config: TransportConfig) -> Result<Vec<String>, ConfigError> {
        let warnings = validate_config(&config).into_result()?;
        self.config = config;
        self.is_modified = true;
        Ok(warnings)
    }

    /// Update the perturbation step, returning the previous value
    pub fn set_step_km(&mut self, step_km: f64) -> Result<f64, ConfigError> {
        let old_value = self.config.step_km;
        let candidate = self.config.clone().with_step_km(step_km);
        validate_config(&candidate).into_result()?;

        self.config.step_km = step_km;
        self.is_modified = true;
        Ok(old_value)
    }

    /// Toggle parallel execution, returning the previous value
    pub fn set_parallel(&mut self, parallel: bool) -> bool {
        let old_value = self.config.parallel;
        self.config.parallel = parallel;
        self.is_modified = true;
        old_value
    }

    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            message: format!("Failed to read config file '{}': {}", path_str, e),
        })?;

        let config: TransportConfig = serde_json::from_str(&content).map_err(|e| ConfigError::SerializationError {
            message: format!("Failed to parse config file '{}': {}", path_str, e),
        })?;

        for warning in validate_config(&config).into_result()? {
            tracing::warn!(path = %path_str, "{}", warning);
        }

        self.config = config;
        self.config_file_path = Some(path_str);
        self.is_modified = false;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = serde_json::to_string_pretty(&self.config).map_err(|e| ConfigError::SerializationError {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(&path, content).map_err(|e| ConfigError::IoError {
            message: format!("Failed to write config file '{}': {}", path_str, e),
        })?;

        self.config_file_path = Some(path_str);
        self.is_modified = false;
        Ok(())
    }

    /// Save to the path the configuration was last loaded from or saved to
    pub fn save(&mut self) -> Result<(), ConfigError> {
        match self.config_file_path.clone() {
            Some(path) => self.save_to_file(path),
            None => Err(ConfigError::IoError {
                message: "No file path set for saving configuration".to_string(),
            }),
        }
    }

    pub fn is_modified(&self) -> bool {
        self.is_modified
    }
}
