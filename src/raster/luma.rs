//! Luminance plane extraction.
//!
//! Gradient scoring and SSIM both operate on a single luminance plane.
//! RGB images are reduced with the BT.601 weights; grayscale images are
//! used as-is.

use super::{Channels, Image};

/// BT.601 luma weights for (R, G, B).
pub const LUMA_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

/// A floating-point luminance plane with the spatial size of its source.
#[derive(Debug, Clone, PartialEq)]
pub struct LumaPlane {
    values: Vec<f64>,
    width: usize,
    height: usize,
}

impl LumaPlane {
    /// Converts an image to its luminance plane.
    pub fn from_image(image: &Image) -> Self {
        let values = match image.channels() {
            Channels::Gray => image.samples().iter().map(|&s| s as f64).collect(),
            Channels::Rgb => image
                .samples()
                .chunks_exact(3)
                .map(|px| {
                    LUMA_WEIGHTS[0] * px[0] as f64
                        + LUMA_WEIGHTS[1] * px[1] as f64
                        + LUMA_WEIGHTS[2] * px[2] as f64
                })
                .collect(),
        };

        Self {
            values,
            width: image.width() as usize,
            height: image.height() as usize,
        }
    }

    /// Plane width.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Plane height.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major luminance values.
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Luminance at `(row, col)`; panics outside the plane.
    #[inline]
    pub fn at(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.width + col]
    }

    /// Reads a value with edge replication for out-of-range coordinates.
    #[inline]
    pub fn at_clamped(&self, row: isize, col: isize) -> f64 {
        let r = row.clamp(0, self.height as isize - 1) as usize;
        let c = col.clamp(0, self.width as isize - 1) as usize;
        self.at(r, c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gray_passthrough() {
        let image = Image::from_fn(3, 2, Channels::Gray, |r, c, _| (r * 3 + c) as u8).unwrap();
        let luma = LumaPlane::from_image(&image);

        assert_eq!(luma.values(), &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_rgb_weights() {
        let image = Image::new(vec![255, 0, 0, 0, 255, 0, 0, 0, 255], 3, 1, Channels::Rgb).unwrap();
        let luma = LumaPlane::from_image(&image);

        assert!((luma.at(0, 0) - 76.245).abs() < 1e-9);
        assert!((luma.at(0, 1) - 149.685).abs() < 1e-9);
        assert!((luma.at(0, 2) - 29.07).abs() < 1e-9);
    }

    #[test]
    fn test_clamped_reads_replicate_edges() {
        let image = Image::from_fn(2, 2, Channels::Gray, |r, c, _| (r * 2 + c) as u8 * 10).unwrap();
        let luma = LumaPlane::from_image(&image);

        assert_eq!(luma.at_clamped(-1, -1), 0.0);
        assert_eq!(luma.at_clamped(5, 5), 30.0);
        assert_eq!(luma.at_clamped(0, 9), 10.0);
    }
}
