//! Attack simulation.
//!
//! Each attack is a pure transform from an image to a degraded image.
//! Out-of-range parameters are clamped where a nearest valid value exists
//! and rejected otherwise; the parameters that were actually used come
//! back with the result.

mod blur;
mod compress;
mod crop;
mod noise;

pub use blur::default_sigma;
pub use compress::{MAX_QUALITY, MIN_QUALITY};
pub use crop::CropRect;
pub use noise::{NoiseKind, DEFAULT_NOISE_SEED};

use crate::raster::Image;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by attack parameter validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttackError {
    /// A parameter has no valid nearest value.
    #[error("invalid {name} = {value}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Rejected value.
        value: f64,
        /// What the value must satisfy.
        reason: String,
    },
}

/// A single attack and its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "attack", rename_all = "snake_case")]
pub enum AttackSpec {
    /// Lossy block-DCT compression at `quality` (1..=100).
    Compress {
        /// JPEG-style quality factor.
        quality: u8,
    },
    /// Gaussian blur with an odd `kernel_size`; `sigma <= 0` derives one.
    Blur {
        /// Odd kernel width, at least 3.
        kernel_size: u32,
        /// Gaussian standard deviation.
        sigma: f64,
    },
    /// Keep only `rect`, optionally scaled back to the source size.
    ///
    /// A restored crop keeps the carrier's dimensions but moves every
    /// surviving pixel, so neither strict nor remapped site lookup lines up
    /// with it; extraction reads it as an ordinary same-size image.
    Crop {
        /// Region kept, in carrier coordinates.
        rect: CropRect,
        /// Resize the kept region back to the source dimensions.
        #[serde(default)]
        restore_size: bool,
    },
    /// Additive noise; `seed = None` uses [`DEFAULT_NOISE_SEED`].
    Noise {
        /// Noise distribution.
        kind: NoiseKind,
        /// Standard deviation or corruption probability, per `kind`.
        intensity: f64,
        /// Offset added to every Gaussian draw; ignored by salt-and-pepper.
        #[serde(default)]
        mean: f64,
        /// RNG seed.
        #[serde(default)]
        seed: Option<u64>,
    },
}

impl AttackSpec {
    /// Short attack name.
    pub fn name(&self) -> &'static str {
        match self {
            AttackSpec::Compress { .. } => "compress",
            AttackSpec::Blur { .. } => "blur",
            AttackSpec::Crop { .. } => "crop",
            AttackSpec::Noise { .. } => "noise",
        }
    }

    /// The scalar usually swept for this attack: quality, kernel size,
    /// kept width or noise intensity.
    pub fn parameter(&self) -> f64 {
        match *self {
            AttackSpec::Compress { quality } => quality as f64,
            AttackSpec::Blur { kernel_size, .. } => kernel_size as f64,
            AttackSpec::Crop { rect, .. } => rect.width as f64,
            AttackSpec::Noise { intensity, .. } => intensity,
        }
    }
}

impl std::fmt::Display for AttackSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttackSpec::Compress { quality } => write!(f, "compress(quality={quality})"),
            AttackSpec::Blur { kernel_size, sigma } => {
                write!(f, "blur(kernel={kernel_size}, sigma={sigma:.3})")
            }
            AttackSpec::Crop { rect, restore_size } => {
                write!(f, "crop({}x{} at {},{}", rect.width, rect.height, rect.x, rect.y)?;
                if *restore_size {
                    f.write_str(", restored")?;
                }
                f.write_str(")")
            }
            AttackSpec::Noise {
                kind,
                intensity,
                mean,
                seed,
            } => {
                write!(f, "noise({kind}, intensity={intensity}")?;
                if *mean != 0.0 {
                    write!(f, ", mean={mean}")?;
                }
                if let Some(seed) = seed {
                    write!(f, ", seed={seed}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// A degraded image and the parameters that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct AttackOutcome {
    /// The attacked image.
    pub image: Image,
    /// Parameters after clamping and defaulting.
    pub applied: AttackSpec,
}

/// Applies `spec` to `image`.
pub fn attack(image: &Image, spec: &AttackSpec) -> Result<AttackOutcome, AttackError> {
    let outcome = match *spec {
        AttackSpec::Compress { quality } => compress::apply(image, quality),
        AttackSpec::Blur { kernel_size, sigma } => blur::apply(image, kernel_size, sigma)?,
        AttackSpec::Crop { rect, restore_size } => crop::apply(image, rect, restore_size)?,
        AttackSpec::Noise {
            kind,
            intensity,
            mean,
            seed,
        } => noise::apply(image, kind, intensity, mean, seed)?,
    };

    tracing::debug!(attack = %outcome.applied, "Attack applied");
    Ok(outcome)
}
