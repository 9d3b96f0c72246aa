//! Separable Gaussian blur.

use super::{AttackError, AttackOutcome, AttackSpec};
use crate::raster::Image;

/// Sigma derived from the kernel size when none is given.
pub fn default_sigma(kernel_size: u32) -> f64 {
    0.3 * ((kernel_size as f64 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalized 1-D Gaussian weights of length `size`.
fn kernel(size: u32, sigma: f64) -> Vec<f64> {
    let center = (size / 2) as f64;
    let denom = 2.0 * sigma * sigma;
    let mut weights: Vec<f64> = (0..size)
        .map(|i| {
            let d = i as f64 - center;
            (-(d * d) / denom).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

/// Blurs every channel independently with edge replication at the borders.
///
/// `kernel_size` must be odd and at least 3. A `sigma` that is not
/// strictly positive is replaced by [`default_sigma`].
pub fn apply(image: &Image, kernel_size: u32, sigma: f64) -> Result<AttackOutcome, AttackError> {
    if kernel_size < 3 || kernel_size % 2 == 0 {
        return Err(AttackError::InvalidParameter {
            name: "kernel_size",
            value: kernel_size as f64,
            reason: "must be odd and at least 3".into(),
        });
    }
    let applied_sigma = if sigma > 0.0 && sigma.is_finite() {
        sigma
    } else {
        let derived = default_sigma(kernel_size);
        tracing::warn!(requested = sigma, applied = derived, "Blur sigma derived from kernel size");
        derived
    };

    let weights = kernel(kernel_size, applied_sigma);
    let radius = (kernel_size / 2) as isize;
    let (w, h) = (image.width() as isize, image.height() as isize);
    let channels = image.channels().count();
    let src = image.samples();
    let at = |row: isize, col: isize, ch: usize| -> usize {
        (row as usize * w as usize + col as usize) * channels + ch
    };

    let mut horizontal = vec![0.0f64; src.len()];
    for row in 0..h {
        for col in 0..w {
            for ch in 0..channels {
                let mut acc = 0.0;
                for (k, weight) in weights.iter().enumerate() {
                    let c = (col + k as isize - radius).clamp(0, w - 1);
                    acc += weight * src[at(row, c, ch)] as f64;
                }
                horizontal[at(row, col, ch)] = acc;
            }
        }
    }

    let mut out = vec![0u8; src.len()];
    for row in 0..h {
        for col in 0..w {
            for ch in 0..channels {
                let mut acc = 0.0;
                for (k, weight) in weights.iter().enumerate() {
                    let r = (row + k as isize - radius).clamp(0, h - 1);
                    acc += weight * horizontal[at(r, col, ch)];
                }
                out[at(row, col, ch)] = acc.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    Ok(AttackOutcome {
        image: image.with_samples(out),
        applied: AttackSpec::Blur {
            kernel_size,
            sigma: applied_sigma,
        },
    })
}
