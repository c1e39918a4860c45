//! Analysis Configuration - operator-tunable TOML values
//!
//! Each struct implements `Default` with the values in [`super::defaults`],
//! so an absent or empty config file yields the documented behaviour.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "DASKIT_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "das_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one DAS survey.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DasConfig {
    /// Survey identification and acquisition constants
    #[serde(default)]
    pub survey: SurveyInfo,

    /// Bad-channel detection
    #[serde(default)]
    pub quality: QualityConfig,

    /// Robust polynomial fitting
    #[serde(default)]
    pub fitting: FittingConfig,

    /// Channel location interpolation
    #[serde(default)]
    pub geometry: GeometryConfig,

    /// Turning point detection
    #[serde(default)]
    pub turning: TurningConfig,
}

impl DasConfig {
    /// Load configuration using the standard search order:
    /// 1. `$DASKIT_CONFIG`
    /// 2. `./das_config.toml`
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), survey = %config.survey.name, "Loaded DAS config from DASKIT_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from DASKIT_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "DASKIT_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(survey = %config.survey.name, "Loaded DAS config from ./das_config.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./das_config.toml, using defaults");
                }
            }
        }

        info!("No das_config.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, err) => ConfigError::Parse(path.to_path_buf(), err),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Unknown keys are reported as warnings and never fail the load.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Save config to a file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "DAS config saved");
        Ok(())
    }

    /// Check parameter ranges. All violations are reported together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = super::validation::validate_ranges(self);

        if self.quality.toleration > 2 * self.quality.adjacent + 1 {
            errors.push(format!(
                "quality.toleration ({}) exceeds the neighbourhood size 2*adjacent+1 ({}), every channel would move",
                self.quality.toleration,
                2 * self.quality.adjacent + 1
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, std::io::Error),

    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(toml::ser::Error),

    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Survey Info
// ============================================================================

/// Survey identification and acquisition constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyInfo {
    /// Survey name, used in log lines only
    #[serde(default = "default_survey_name")]
    pub name: String,

    /// Channel interval along the fiber (m)
    #[serde(default = "default_channel_interval")]
    pub channel_interval_m: f64,

    /// Sampling rate (Hz)
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate_hz: f64,

    /// Gauge length (m)
    #[serde(default = "default_gauge_length")]
    pub gauge_length_m: f64,
}

fn default_survey_name() -> String {
    "unnamed".to_string()
}
fn default_channel_interval() -> f64 { 1.0 }
fn default_sampling_rate() -> f64 { 1000.0 }
fn default_gauge_length() -> f64 { 10.0 }

impl Default for SurveyInfo {
    fn default() -> Self {
        Self {
            name: default_survey_name(),
            channel_interval_m: default_channel_interval(),
            sampling_rate_hz: default_sampling_rate(),
            gauge_length_m: default_gauge_length(),
        }
    }
}

// ============================================================================
// Channel Quality
// ============================================================================

/// Bad-channel detection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Degree of the energy trend polynomial.
    #[serde(default = "default_degree")]
    pub degree: usize,

    /// MAD multiple below the trend that marks a bad channel.
    #[serde(default = "default_quality_thresh")]
    pub thresh: f64,

    /// Run the continuity passes.
    #[serde(default = "default_continuity")]
    pub continuity: bool,

    /// Continuity neighbourhood half-width (channels).
    #[serde(default = "default_adjacent")]
    pub adjacent: usize,

    /// Disagreeing neighbours tolerated per neighbourhood.
    #[serde(default = "default_toleration")]
    pub toleration: usize,
}

fn default_degree() -> usize { defaults::QUALITY_DEGREE }
fn default_quality_thresh() -> f64 { defaults::QUALITY_THRESH }
fn default_continuity() -> bool { defaults::QUALITY_CONTINUITY }
fn default_adjacent() -> usize { defaults::QUALITY_ADJACENT }
fn default_toleration() -> usize { defaults::QUALITY_TOLERATION }

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            degree: default_degree(),
            thresh: default_quality_thresh(),
            continuity: default_continuity(),
            adjacent: default_adjacent(),
            toleration: default_toleration(),
        }
    }
}

// ============================================================================
// Robust Fitting
// ============================================================================

/// Iteration control for the robust polynomial fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittingConfig {
    /// Stop once the maximum relative change of the fit drops below this.
    #[serde(default = "default_convergence_tolerance")]
    pub convergence_tolerance: f64,

    /// Upper bound on reweighting iterations.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

fn default_convergence_tolerance() -> f64 { defaults::FIT_CONVERGENCE_TOLERANCE }
fn default_max_iterations() -> usize { defaults::FIT_MAX_ITERATIONS }

impl Default for FittingConfig {
    fn default() -> Self {
        Self {
            convergence_tolerance: default_convergence_tolerance(),
            max_iterations: default_max_iterations(),
        }
    }
}

// ============================================================================
// Track Geometry
// ============================================================================

/// Channel location interpolation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryConfig {
    /// Known points farther than this from every track vertex are dropped (m).
    /// `None` accepts every known point.
    #[serde(default)]
    pub max_anchor_distance_m: Option<f64>,

    /// Relative tolerance for snapping to integral channels.
    #[serde(default = "default_snap_tolerance")]
    pub snap_tolerance: f64,
}

fn default_snap_tolerance() -> f64 { defaults::GEOMETRY_SNAP_TOLERANCE }

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            max_anchor_distance_m: None,
            snap_tolerance: default_snap_tolerance(),
        }
    }
}

// ============================================================================
// Turning Points
// ============================================================================

/// Turning point detection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurningConfig {
    /// Angle threshold (degrees) or MAD multiple (waveform mode).
    #[serde(default = "default_turning_thresh")]
    pub thresh: f64,

    /// Neighbour offset for angle measurement (channels).
    ///
    /// Roughly half the ratio of gauge length to channel interval.
    #[serde(default = "default_channel_gap")]
    pub channel_gap: usize,
}

fn default_turning_thresh() -> f64 { defaults::TURNING_THRESH }
fn default_channel_gap() -> usize { defaults::TURNING_CHANNEL_GAP }

impl Default for TurningConfig {
    fn default() -> Self {
        Self {
            thresh: default_turning_thresh(),
            channel_gap: default_channel_gap(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
