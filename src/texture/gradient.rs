//! Sobel gradient magnitude as a texture score.
//!
//! Scores are computed on the luminance plane with edge replication at
//! the borders, then min-max normalized onto a 0..=255 scale so that
//! thresholds are comparable across images. A perfectly flat image
//! scores zero everywhere.

use crate::raster::{Image, LumaPlane};

/// Horizontal Sobel kernel (responds to vertical edges).
const SOBEL_X: [[f64; 3]; 3] = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];

/// Vertical Sobel kernel (responds to horizontal edges).
const SOBEL_Y: [[f64; 3]; 3] = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

/// Upper bound of the normalized score scale.
pub const MAX_SCORE: f32 = 255.0;

/// Per-pixel texture intensity of a carrier image.
///
/// Higher scores mean more local intensity change, where LSB
/// perturbation is less perceptible.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientMap {
    scores: Vec<f32>,
    width: u32,
    height: u32,
}

impl GradientMap {
    /// Computes the normalized Sobel magnitude of `image`.
    pub fn compute(image: &Image) -> Self {
        let luma = LumaPlane::from_image(image);
        let (w, h) = (luma.width(), luma.height());

        let mut raw = Vec::with_capacity(w * h);
        for row in 0..h as isize {
            for col in 0..w as isize {
                let mut gx = 0.0;
                let mut gy = 0.0;
                for (ky, dy) in (-1isize..=1).enumerate() {
                    for (kx, dx) in (-1isize..=1).enumerate() {
                        let v = luma.at_clamped(row + dy, col + dx);
                        gx += SOBEL_X[ky][kx] * v;
                        gy += SOBEL_Y[ky][kx] * v;
                    }
                }
                raw.push((gx * gx + gy * gy).sqrt());
            }
        }

        let max = raw.iter().copied().fold(0.0f64, f64::max);
        let min = raw.iter().copied().fold(f64::INFINITY, f64::min);
        let span = max - min;

        let scores = if span > 0.0 {
            raw.iter()
                .map(|&m| ((m - min) / span * MAX_SCORE as f64) as f32)
                .collect()
        } else {
            vec![0.0; raw.len()]
        };

        tracing::trace!(width = w, height = h, raw_max = max, "Computed gradient map");

        Self {
            scores,
            width: image.width(),
            height: image.height(),
        }
    }

    /// Map width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Map height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the score of the pixel at `(row, col)`.
    #[inline]
    pub fn score(&self, row: u32, col: u32) -> f32 {
        self.scores[row as usize * self.width as usize + col as usize]
    }

    /// Returns all scores in raster order.
    #[inline]
    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    /// Returns the highest score in the map.
    pub fn max_score(&self) -> f32 {
        self.scores.iter().copied().fold(0.0, f32::max)
    }

    /// Counts pixels whose score is at least `threshold`.
    pub fn count_at_least(&self, threshold: f32) -> usize {
        self.scores.iter().filter(|&&s| s >= threshold).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Channels;

    #[test]
    fn test_flat_image_scores_zero() {
        let image = Image::filled(8, 8, Channels::Gray, 128).unwrap();
        let map = GradientMap::compute(&image);

        assert_eq!(map.scores().len(), 64);
        assert!(map.scores().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_vertical_edge_detected() {
        // Left half black, right half white.
        let image = Image::from_fn(8, 8, Channels::Gray, |_, c, _| if c < 4 { 0 } else { 255 }).unwrap();
        let map = GradientMap::compute(&image);

        assert_eq!(map.score(4, 3), MAX_SCORE);
        assert_eq!(map.score(4, 4), MAX_SCORE);
        assert_eq!(map.score(4, 0), 0.0);
        assert_eq!(map.score(4, 7), 0.0);
    }

    #[test]
    fn test_edge_replication_at_borders() {
        // A horizontal ramp: replicated borders see half the interior response.
        let image = Image::from_fn(5, 3, Channels::Gray, |_, c, _| (c * 10) as u8).unwrap();
        let map = GradientMap::compute(&image);

        assert!(map.score(1, 0) < map.score(1, 2));
        assert_eq!(map.score(1, 0), map.score(1, 4));
    }

    #[test]
    fn test_rgb_independent_of_channel_count() {
        let gray = Image::from_fn(6, 6, Channels::Gray, |r, c, _| ((r * 37 + c * 11) % 256) as u8).unwrap();
        let rgb = Image::from_fn(6, 6, Channels::Rgb, |r, c, _| ((r * 37 + c * 11) % 256) as u8).unwrap();

        let g = GradientMap::compute(&gray);
        let c = GradientMap::compute(&rgb);

        assert_eq!(g.scores().len(), c.scores().len());
        for (a, b) in g.scores().iter().zip(c.scores()) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_count_at_least() {
        let image = Image::from_fn(8, 8, Channels::Gray, |_, c, _| if c < 4 { 0 } else { 255 }).unwrap();
        let map = GradientMap::compute(&image);

        assert_eq!(map.count_at_least(0.0), 64);
        assert_eq!(map.count_at_least(MAX_SCORE), 16);
        assert_eq!(map.max_score(), MAX_SCORE);
    }
}
