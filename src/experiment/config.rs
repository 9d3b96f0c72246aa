//! Experiment configuration.
//!
//! One TOML file describes how to embed and which attack parameter to
//! sweep. Every section has defaults, so an empty file is a valid plain
//! mode Gaussian-noise sweep.

use crate::attack::{AttackError, AttackSpec, CropRect, NoiseKind};
use crate::embedding::Mode;
use crate::texture::AdaptiveParams;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// `[embed]` values out of range.
    #[error("invalid embed settings: {0}")]
    InvalidEmbed(String),
    /// `[sweep]` values out of range.
    #[error("invalid sweep settings: {0}")]
    InvalidSweep(String),
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The file is not valid TOML for this format.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Site selection policy by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    /// One bit per sample in raster order.
    #[default]
    Plain,
    /// Texture-weighted depths from `[embed]`.
    Adaptive,
}

/// How payloads are embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    /// Plain or adaptive.
    pub mode: ModeKind,
    /// Texture threshold on the 0..=255 gradient scale.
    pub threshold: f32,
    /// Bits per textured site.
    pub textured_bits: u8,
    /// Bits per flat site.
    pub flat_bits: u8,
    /// Lower the threshold until the payload fits.
    pub auto_fit: bool,
    /// Threshold decrement used by `auto_fit`.
    pub fit_step: f32,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        let params = AdaptiveParams::default();
        Self {
            mode: ModeKind::Plain,
            threshold: params.threshold,
            textured_bits: params.textured_bits,
            flat_bits: params.flat_bits,
            auto_fit: true,
            fit_step: 5.0,
        }
    }
}

impl EmbedConfig {
    /// Adaptive parameters named by this section.
    pub fn params(&self) -> AdaptiveParams {
        AdaptiveParams {
            threshold: self.threshold,
            textured_bits: self.textured_bits,
            flat_bits: self.flat_bits,
        }
    }

    /// The embedding mode, before any threshold fitting.
    pub fn mode(&self) -> Mode {
        match self.mode {
            ModeKind::Plain => Mode::Plain,
            ModeKind::Adaptive => Mode::Adaptive(self.params()),
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mode == ModeKind::Adaptive {
            self.params()
                .validate()
                .map_err(|e| ConfigError::InvalidEmbed(e.to_string()))?;
        }
        if !(self.fit_step > 0.0 && self.fit_step.is_finite()) {
            return Err(ConfigError::InvalidEmbed(format!(
                "fit_step must be positive, got {}",
                self.fit_step
            )));
        }
        Ok(())
    }
}

/// Attack family swept by an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackKind {
    /// Swept value is the quality.
    Compress,
    /// Swept value is the kernel size.
    Blur,
    /// Swept value is the kept ratio of a centered crop.
    Crop,
    /// Swept value is the noise intensity.
    #[default]
    Noise,
}

/// How cropped images are read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropExtraction {
    /// Translate sites by the crop offset; lost body bits become erasures.
    #[default]
    Remapped,
    /// Read sites at their original coordinates and fail on the first miss.
    Strict,
}

/// The attack parameter sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Attack family.
    pub attack: AttackKind,
    /// Noise distribution when `attack = "noise"`.
    pub noise_kind: NoiseKind,
    /// Swept parameter values, in order.
    pub values: Vec<f64>,
    /// Noise seed; `None` uses the library default.
    pub seed: Option<u64>,
    /// Offset of Gaussian noise draws.
    pub noise_mean: f64,
    /// Blur sigma; `<= 0` derives it from the kernel size.
    pub blur_sigma: f64,
    /// Read-back policy for crop sweeps.
    pub crop_extraction: CropExtraction,
    /// Scale crops back to the carrier size; extraction then reads the
    /// resized image in place and `crop_extraction` does not apply.
    pub crop_restore_size: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            attack: AttackKind::Noise,
            noise_kind: NoiseKind::Gaussian,
            values: vec![0.0, 1.0, 2.0, 5.0, 10.0, 20.0],
            seed: None,
            noise_mean: 0.0,
            blur_sigma: 0.0,
            crop_extraction: CropExtraction::Remapped,
            crop_restore_size: false,
        }
    }
}

impl SweepConfig {
    /// Builds the attack for one swept `value` on a `width`×`height` image.
    pub fn spec_for(&self, value: f64, width: u32, height: u32) -> Result<AttackSpec, AttackError> {
        match self.attack {
            AttackKind::Compress => Ok(AttackSpec::Compress {
                quality: value.round().clamp(0.0, u8::MAX as f64) as u8,
            }),
            AttackKind::Blur => Ok(AttackSpec::Blur {
                kernel_size: value.round().max(0.0) as u32,
                sigma: self.blur_sigma,
            }),
            AttackKind::Crop => Ok(AttackSpec::Crop {
                rect: CropRect::centered(width, height, value)?,
                restore_size: self.crop_restore_size,
            }),
            AttackKind::Noise => Ok(AttackSpec::Noise {
                kind: self.noise_kind,
                intensity: value,
                mean: self.noise_mean,
                seed: self.seed,
            }),
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.values.is_empty() {
            return Err(ConfigError::InvalidSweep("values must not be empty".into()));
        }
        for &value in &self.values {
            let ok = match self.attack {
                AttackKind::Compress => value.is_finite() && (1.0..=100.0).contains(&value.round()),
                AttackKind::Blur => {
                    value.fract() == 0.0 && value >= 3.0 && (value as u64) % 2 == 1
                }
                AttackKind::Crop => value > 0.0 && value <= 1.0,
                AttackKind::Noise => match self.noise_kind {
                    NoiseKind::Gaussian => value.is_finite() && value >= 0.0,
                    NoiseKind::SaltPepper => (0.0..=1.0).contains(&value),
                },
            };
            if !ok {
                return Err(ConfigError::InvalidSweep(format!(
                    "value {value} is out of range for {:?}",
                    self.attack
                )));
            }
        }
        if !self.blur_sigma.is_finite() {
            return Err(ConfigError::InvalidSweep("blur_sigma must be finite".into()));
        }
        if !self.noise_mean.is_finite() {
            return Err(ConfigError::InvalidSweep("noise_mean must be finite".into()));
        }
        Ok(())
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Print per-point reports as JSON.
    pub report_json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { report_json: true }
    }
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExperimentConfig {
    /// Embedding settings.
    #[serde(default)]
    pub embed: EmbedConfig,
    /// Attack sweep settings.
    #[serde(default)]
    pub sweep: SweepConfig,
    /// Report output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

impl ExperimentConfig {
    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ExperimentConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.embed.validate()?;
        self.sweep.validate()
    }
}
