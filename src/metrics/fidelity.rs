//! Image fidelity metrics.
//!
//! PSNR compares raw samples across all channels. SSIM works on the
//! luminance plane with a Gaussian window and only evaluates windows that
//! fit entirely inside the image.

use super::MetricsError;
use crate::raster::{Image, LumaPlane};

/// Peak sample value.
const PEAK: f64 = 255.0;
/// SSIM window side length.
const SSIM_WINDOW: usize = 11;
/// SSIM window standard deviation.
const SSIM_SIGMA: f64 = 1.5;
const C1: f64 = (0.01 * PEAK) * (0.01 * PEAK);
const C2: f64 = (0.03 * PEAK) * (0.03 * PEAK);

fn check_shape(a: &Image, b: &Image) -> Result<(), MetricsError> {
    if a.same_shape(b) {
        Ok(())
    } else {
        Err(MetricsError::ShapeMismatch {
            left: (a.width(), a.height(), a.channels().count()),
            right: (b.width(), b.height(), b.channels().count()),
        })
    }
}

/// Mean squared error over every sample.
pub fn mse(a: &Image, b: &Image) -> Result<f64, MetricsError> {
    check_shape(a, b)?;

    let sum: f64 = a
        .samples()
        .iter()
        .zip(b.samples())
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum();

    Ok(sum / a.samples().len() as f64)
}

/// Peak signal-to-noise ratio in dB; `+∞` for identical images.
pub fn psnr(a: &Image, b: &Image) -> Result<f64, MetricsError> {
    let mse = mse(a, b)?;
    if mse == 0.0 {
        return Ok(f64::INFINITY);
    }
    Ok(10.0 * (PEAK * PEAK / mse).log10())
}

/// Normalized 2-D Gaussian window, row-major.
fn gaussian_window(size: usize) -> Vec<f64> {
    let center = (size / 2) as f64;
    let mut weights = Vec::with_capacity(size * size);
    for y in 0..size {
        for x in 0..size {
            let (dy, dx) = (y as f64 - center, x as f64 - center);
            weights.push((-(dx * dx + dy * dy) / (2.0 * SSIM_SIGMA * SSIM_SIGMA)).exp());
        }
    }
    let sum: f64 = weights.iter().sum();
    weights.iter_mut().for_each(|w| *w /= sum);
    weights
}

/// Structural similarity of the luminance planes, in `[-1, 1]`.
///
/// Images smaller than the 11×11 window use the largest odd window that fits.
pub fn ssim(a: &Image, b: &Image) -> Result<f64, MetricsError> {
    check_shape(a, b)?;

    let la = LumaPlane::from_image(a);
    let lb = LumaPlane::from_image(b);
    let (w, h) = (la.width(), la.height());

    let mut size = SSIM_WINDOW.min(w).min(h);
    if size % 2 == 0 {
        size -= 1;
    }
    let window = gaussian_window(size);

    let mut total = 0.0;
    let mut count = 0usize;
    for top in 0..=(h - size) {
        for left in 0..=(w - size) {
            let (mut mu_a, mut mu_b) = (0.0, 0.0);
            let (mut aa, mut bb, mut ab) = (0.0, 0.0, 0.0);
            for y in 0..size {
                for x in 0..size {
                    let weight = window[y * size + x];
                    let va = la.at(top + y, left + x);
                    let vb = lb.at(top + y, left + x);
                    mu_a += weight * va;
                    mu_b += weight * vb;
                    aa += weight * va * va;
                    bb += weight * vb * vb;
                    ab += weight * va * vb;
                }
            }
            let var_a = aa - mu_a * mu_a;
            let var_b = bb - mu_b * mu_b;
            let cov = ab - mu_a * mu_b;

            let numerator = (2.0 * mu_a * mu_b + C1) * (2.0 * cov + C2);
            let denominator = (mu_a * mu_a + mu_b * mu_b + C1) * (var_a + var_b + C2);
            total += numerator / denominator;
            count += 1;
        }
    }

    Ok(total / count as f64)
}
