//! Additive noise.
//!
//! Every sample consumes exactly two uniform draws from a seeded
//! ChaCha8 stream, whatever the noise kind or intensity. Two runs with the
//! same seed therefore see the same draws, so raising the salt-and-pepper
//! probability only ever adds corrupted samples.

use super::{AttackError, AttackOutcome, AttackSpec};
use crate::raster::Image;
use rand_chacha::ChaCha8Rng;
use rand_core::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

/// Seed used when a noise attack does not name one.
pub const DEFAULT_NOISE_SEED: u64 = 0x5EED_2024;

/// Noise distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseKind {
    /// Gaussian; intensity is the standard deviation.
    #[default]
    Gaussian,
    /// Impulse noise; intensity is the per-sample corruption probability.
    SaltPepper,
}

impl std::fmt::Display for NoiseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoiseKind::Gaussian => write!(f, "gaussian"),
            NoiseKind::SaltPepper => write!(f, "salt_pepper"),
        }
    }
}

/// Uniform draw in `[0, 1)` from the top 53 bits.
#[inline]
fn uniform(rng: &mut ChaCha8Rng) -> f64 {
    (rng.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
}

/// Adds noise of `kind` at `intensity`, seeded by `seed` or [`DEFAULT_NOISE_SEED`].
///
/// `mean` shifts Gaussian draws and is ignored by salt-and-pepper.
pub fn apply(
    image: &Image,
    kind: NoiseKind,
    intensity: f64,
    mean: f64,
    seed: Option<u64>,
) -> Result<AttackOutcome, AttackError> {
    if !mean.is_finite() {
        return Err(AttackError::InvalidParameter {
            name: "mean",
            value: mean,
            reason: "must be finite".into(),
        });
    }
    let valid = match kind {
        NoiseKind::Gaussian => intensity.is_finite() && intensity >= 0.0,
        NoiseKind::SaltPepper => (0.0..=1.0).contains(&intensity),
    };
    if !valid {
        return Err(AttackError::InvalidParameter {
            name: "intensity",
            value: intensity,
            reason: match kind {
                NoiseKind::Gaussian => "standard deviation must be finite and non-negative".into(),
                NoiseKind::SaltPepper => "probability must lie in [0, 1]".into(),
            },
        });
    }

    let seed = seed.unwrap_or(DEFAULT_NOISE_SEED);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let samples: Vec<u8> = image
        .samples()
        .iter()
        .map(|&s| {
            let u1 = uniform(&mut rng);
            let u2 = uniform(&mut rng);
            match kind {
                NoiseKind::Gaussian => {
                    // Box-Muller; 1 - u1 lies in (0, 1].
                    let z = (-2.0 * (1.0 - u1).ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
                    (s as f64 + mean + intensity * z).round().clamp(0.0, 255.0) as u8
                }
                NoiseKind::SaltPepper => {
                    if u1 < intensity {
                        if u2 < 0.5 {
                            0
                        } else {
                            255
                        }
                    } else {
                        s
                    }
                }
            }
        })
        .collect();

    tracing::debug!(%kind, intensity, mean, seed, "Applied noise");

    Ok(AttackOutcome {
        image: image.with_samples(samples),
        applied: AttackSpec::Noise {
            kind,
            intensity,
            mean,
            seed: Some(seed),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Channels;

    fn ramp() -> Image {
        Image::from_fn(16, 16, Channels::Rgb, |r, c, ch| (r * 12 + c + ch as u32 * 7) as u8).unwrap()
    }

    #[test]
    fn test_zero_intensity_is_identity() {
        let image = ramp();
        for kind in [NoiseKind::Gaussian, NoiseKind::SaltPepper] {
            assert_eq!(apply(&image, kind, 0.0, 0.0, None).unwrap().image, image);
        }
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let image = ramp();
        let a = apply(&image, NoiseKind::Gaussian, 10.0, 0.0, Some(7)).unwrap();
        let b = apply(&image, NoiseKind::Gaussian, 10.0, 0.0, Some(7)).unwrap();
        let c = apply(&image, NoiseKind::Gaussian, 10.0, 0.0, Some(8)).unwrap();

        assert_eq!(a.image, b.image);
        assert_ne!(a.image, c.image);
    }

    #[test]
    fn test_default_seed_reported() {
        let out = apply(&ramp(), NoiseKind::Gaussian, 3.0, 0.0, None).unwrap();
        assert_eq!(
            out.applied,
            AttackSpec::Noise {
                kind: NoiseKind::Gaussian,
                intensity: 3.0,
                mean: 0.0,
                seed: Some(DEFAULT_NOISE_SEED)
            }
        );
    }

    #[test]
    fn test_full_salt_pepper_saturates() {
        let out = apply(&ramp(), NoiseKind::SaltPepper, 1.0, 0.0, Some(1)).unwrap().image;
        assert!(out.samples().iter().all(|&s| s == 0 || s == 255));
    }

    #[test]
    fn test_salt_pepper_corruption_is_nested() {
        let image = Image::filled(32, 32, Channels::Gray, 128).unwrap();
        let low = apply(&image, NoiseKind::SaltPepper, 0.1, 0.0, Some(3)).unwrap().image;
        let high = apply(&image, NoiseKind::SaltPepper, 0.4, 0.0, Some(3)).unwrap().image;

        for (l, h) in low.samples().iter().zip(high.samples()) {
            if *l != 128 {
                assert_eq!(l, h);
            }
        }
        let count = |img: &Image| img.samples().iter().filter(|&&s| s != 128).count();
        assert!(count(&high) > count(&low));
    }

    #[test]
    fn test_gaussian_spread_tracks_sigma() {
        let image = Image::filled(64, 64, Channels::Gray, 128).unwrap();
        let out = apply(&image, NoiseKind::Gaussian, 10.0, 0.0, None).unwrap().image;

        let n = out.samples().len() as f64;
        let mean = out.samples().iter().map(|&s| s as f64).sum::<f64>() / n;
        let var = out.samples().iter().map(|&s| (s as f64 - mean).powi(2)).sum::<f64>() / n;
        assert!((mean - 128.0).abs() < 1.0, "mean {mean}");
        assert!((var.sqrt() - 10.0).abs() < 1.0, "std {}", var.sqrt());
    }

    #[test]
    fn test_gaussian_mean_shifts_samples() {
        let image = Image::filled(64, 64, Channels::Gray, 100).unwrap();
        let shifted = apply(&image, NoiseKind::Gaussian, 0.0, 12.0, None).unwrap().image;
        assert!(shifted.samples().iter().all(|&s| s == 112));

        let out = apply(&image, NoiseKind::Gaussian, 5.0, -20.0, Some(4)).unwrap().image;
        let n = out.samples().len() as f64;
        let avg = out.samples().iter().map(|&s| s as f64).sum::<f64>() / n;
        assert!((avg - 80.0).abs() < 1.0, "mean {avg}");

        let salt = apply(&image, NoiseKind::SaltPepper, 0.0, 50.0, None).unwrap().image;
        assert_eq!(salt, image);
        assert!(apply(&image, NoiseKind::Gaussian, 1.0, f64::NAN, None).is_err());
    }

    #[test]
    fn test_invalid_intensity_rejected() {
        let image = ramp();
        assert!(apply(&image, NoiseKind::Gaussian, -1.0, 0.0, None).is_err());
        assert!(apply(&image, NoiseKind::Gaussian, f64::INFINITY, 0.0, None).is_err());
        assert!(apply(&image, NoiseKind::SaltPepper, 1.5, 0.0, None).is_err());
        assert!(apply(&image, NoiseKind::SaltPepper, f64::NAN, 0.0, None).is_err());
    }
}
