//! Configuration management for the head pose solver

use crate::{
    constants::{DEFAULT_IMAGE_HEIGHT, DEFAULT_IMAGE_WIDTH, DEFAULT_OUTPUT_PRECISION},
    pnp::SolverParams,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera / image configuration
    pub camera: CameraConfig,

    /// Levenberg-Marquardt settings
    pub solver: SolverParams,

    /// Output formatting
    pub output: OutputConfig,
}

/// Image size from which the intrinsics are assumed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Image width in pixels
    pub image_width: u32,

    /// Image height in pixels
    pub image_height: u32,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Emit rotation/translation vectors and solver diagnostics
    pub diagnostics: bool,

    /// Decimal places of printed values
    pub precision: usize,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            image_width: DEFAULT_IMAGE_WIDTH,
            image_height: DEFAULT_IMAGE_HEIGHT,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            diagnostics: false,
            precision: DEFAULT_OUTPUT_PRECISION,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns a [`Error::ConfigError`] naming the first invalid setting
    pub fn validate(&self) -> Result<()> {
        // Validate image size
        if self.camera.image_width == 0 || self.camera.image_height == 0 {
            return Err(Error::ConfigError(
                "Image width and height must be greater than 0".to_string(),
            ));
        }

        // Validate solver parameters
        let solver = &self.solver;
        if solver.max_iterations == 0 {
            return Err(Error::ConfigError(
                "Max iterations must be greater than 0".to_string(),
            ));
        }
        for (name, value) in [
            ("Initial damping", solver.initial_damping),
            ("Damping decrease", solver.damping_decrease),
            ("Damping increase", solver.damping_increase),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(Error::ConfigError(format!("{name} must be positive, got {value}")));
            }
        }
        for (name, value) in [
            ("Error change tolerance", solver.error_change_tolerance),
            ("Error threshold", solver.error_threshold),
            ("Max step norm", solver.max_step_norm),
        ] {
            if !(value >= 0.0) {
                return Err(Error::ConfigError(format!("{name} must not be negative, got {value}")));
            }
        }
        if !(solver.clamped_step_norm > 0.0) {
            return Err(Error::ConfigError(format!(
                "Clamped step norm must be positive, got {}",
                solver.clamped_step_norm
            )));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r"# Head Pose PnP Configuration

# Image size; intrinsics are assumed as fx = fy = width, principal point at the center
camera:
  image_width: 640
  image_height: 480

# Levenberg-Marquardt refinement
solver:
  max_iterations: 30
  initial_damping: 0.001
  damping_decrease: 0.1
  damping_increase: 10.0
  error_change_tolerance: 1.0e-8
  error_threshold: 0.01
  max_step_norm: 1.0
  clamped_step_norm: 0.5
  rejected_steps: keep    # keep | roll_back

# Output
output:
  diagnostics: false
  precision: 2
";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pnp::RejectedStepPolicy;

    #[test]
    fn test_example_config_matches_defaults() {
        let config = Config::from_yaml(EXAMPLE_CONFIG).unwrap();
        assert_eq!(config, Config::default());
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::from_yaml("solver:\n  rejected_steps: roll_back\n").unwrap();
        assert_eq!(config.solver.rejected_steps, RejectedStepPolicy::RollBack);
        assert_eq!(config.solver.max_iterations, 30);
        assert_eq!(config.camera.image_width, 640);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = Config::default();
        config.camera.image_width = 1920;
        config.camera.image_height = 1080;
        config.output.diagnostics = true;
        config.to_file(&path).unwrap();

        assert_eq!(Config::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_validation_failures() {
        let mut config = Config::default();
        config.camera.image_height = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.solver.max_iterations = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.solver.damping_increase = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.solver.error_threshold = -1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.solver.clamped_step_norm = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_yaml() {
        let result = Config::from_yaml("camera: [unclosed");
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_file("/nonexistent/config.yaml");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
