//! Site classification, ordering and capacity queries.
//!
//! A site is one writable sample plus the number of low-order bits it may
//! carry. The order of the site list is the only thing encoder and decoder
//! share, so it must be a pure function of the gradient map and the
//! planning parameters: descending score, ties broken by raster position
//! `(row, col, channel)`.

use super::gradient::{GradientMap, MAX_SCORE};
use crate::raster::{Channels, Image};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while planning sites.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    /// A planning parameter is outside its domain.
    #[error("invalid planner parameter: {0}")]
    InvalidParameter(String),
    /// Even threshold 0 cannot hold the requested bits.
    #[error("no threshold on the ladder fits {required} bits (capacity at threshold 0 is {available})")]
    CapacityExceeded {
        /// Bits requested.
        required: usize,
        /// Capacity at the bottom of the ladder.
        available: usize,
    },
}

/// One writable sample location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Site {
    /// Pixel row.
    pub row: u32,
    /// Pixel column.
    pub col: u32,
    /// Channel index within the pixel.
    pub channel: u8,
    /// Number of low-order bits available for payload, 1..=8.
    pub depth: u8,
}

/// Parameters of the texture-adaptive policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveParams {
    /// Minimum normalized gradient score (0..=255) for a textured pixel.
    pub threshold: f32,
    /// Bits carried by each textured sample.
    pub textured_bits: u8,
    /// Bits carried by each flat sample; 0 skips flat regions.
    pub flat_bits: u8,
}

impl Default for AdaptiveParams {
    fn default() -> Self {
        Self {
            threshold: 30.0,
            textured_bits: 2,
            flat_bits: 0,
        }
    }
}

impl AdaptiveParams {
    /// Creates parameters with the given threshold and default depths.
    pub fn with_threshold(threshold: f32) -> Self {
        Self {
            threshold,
            ..Default::default()
        }
    }

    /// Validates the parameter domain.
    pub fn validate(&self) -> Result<(), PlanError> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(PlanError::InvalidParameter(format!(
                "threshold must be finite and non-negative, got {}",
                self.threshold
            )));
        }
        if self.textured_bits > 8 || self.flat_bits > 8 {
            return Err(PlanError::InvalidParameter(format!(
                "bit depths must be at most 8, got textured={} flat={}",
                self.textured_bits, self.flat_bits
            )));
        }
        if self.textured_bits == 0 {
            return Err(PlanError::InvalidParameter(
                "textured_bits must be non-zero".into(),
            ));
        }
        // Capacity only grows as the threshold falls when textured sites are
        // at least as deep as flat ones.
        if self.flat_bits > self.textured_bits {
            return Err(PlanError::InvalidParameter(format!(
                "flat_bits ({}) must not exceed textured_bits ({})",
                self.flat_bits, self.textured_bits
            )));
        }
        Ok(())
    }

    /// Deepest bit plane any site may touch.
    #[inline]
    pub fn max_depth(&self) -> u8 {
        self.textured_bits.max(self.flat_bits)
    }
}

/// An ordered list of sites with its total capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePlan {
    sites: Vec<Site>,
    capacity: usize,
}

impl SitePlan {
    /// Wraps an already ordered site list.
    pub fn from_sites(sites: Vec<Site>) -> Self {
        let capacity = sites.iter().map(|s| s.depth as usize).sum();
        Self { sites, capacity }
    }

    /// Total number of embeddable bits.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sites in embedding order.
    #[inline]
    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    /// Number of sites.
    #[inline]
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// True when no site can carry payload.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

/// Longest threshold ladder `fit_threshold` will walk inside the score range.
const MAX_LADDER_RUNGS: u32 = 1 << 16;

/// Builds site lists for the plain and adaptive policies.
pub struct CapacityPlanner;

impl CapacityPlanner {
    /// Degenerate plain-LSB plan: every sample is a 1-bit site in raster order.
    pub fn plain(image: &Image) -> SitePlan {
        let channels = image.channels().count() as u8;
        let mut sites = Vec::with_capacity(image.samples().len());
        for row in 0..image.height() {
            for col in 0..image.width() {
                for channel in 0..channels {
                    sites.push(Site {
                        row,
                        col,
                        channel,
                        depth: 1,
                    });
                }
            }
        }
        SitePlan::from_sites(sites)
    }

    /// Classifies and orders every pixel/channel of the mapped image.
    pub fn plan(
        map: &GradientMap,
        channels: Channels,
        params: &AdaptiveParams,
    ) -> Result<SitePlan, PlanError> {
        params.validate()?;

        let mut pixels: Vec<(u32, u32, f32)> = Vec::with_capacity(map.scores().len());
        for row in 0..map.height() {
            for col in 0..map.width() {
                pixels.push((row, col, map.score(row, col)));
            }
        }
        // Stable sort keeps raster order among equal scores.
        pixels.sort_by(|a, b| b.2.total_cmp(&a.2));

        let mut sites = Vec::with_capacity(pixels.len() * channels.count());
        for (row, col, score) in pixels {
            let depth = if score >= params.threshold {
                params.textured_bits
            } else {
                params.flat_bits
            };
            if depth == 0 {
                continue;
            }
            for channel in 0..channels.count() as u8 {
                sites.push(Site {
                    row,
                    col,
                    channel,
                    depth,
                });
            }
        }

        let plan = SitePlan::from_sites(sites);
        tracing::debug!(
            threshold = params.threshold,
            sites = plan.len(),
            capacity = plan.capacity(),
            "Planned adaptive sites"
        );
        Ok(plan)
    }

    /// Total capacity of the adaptive plan without materializing sites.
    pub fn capacity(map: &GradientMap, channels: Channels, params: &AdaptiveParams) -> Result<usize, PlanError> {
        params.validate()?;
        let textured = map.count_at_least(params.threshold);
        let flat = map.scores().len() - textured;
        Ok(channels.count()
            * (textured * params.textured_bits as usize + flat * params.flat_bits as usize))
    }

    /// Finds the highest threshold on a descending ladder whose plan fits
    /// `required_bits`.
    ///
    /// The ladder is `params.threshold, params.threshold - step, ...`,
    /// clamped at zero. Rungs above [`MAX_SCORE`] classify every pixel as
    /// flat, so after the first rung the walk continues from the first rung
    /// inside the score range. Callers must use the returned threshold on
    /// both the embedding and the extracting side.
    pub fn fit_threshold(
        map: &GradientMap,
        channels: Channels,
        params: &AdaptiveParams,
        required_bits: usize,
        step: f32,
    ) -> Result<f32, PlanError> {
        if !(step.is_finite() && step > 0.0) {
            return Err(PlanError::InvalidParameter(format!(
                "threshold step must be positive, got {step}"
            )));
        }
        params.validate()?;

        let start = f64::from(params.threshold);
        let step = f64::from(step);
        let top = f64::from(MAX_SCORE);
        let base = if start > top {
            top - (top - start).rem_euclid(step)
        } else {
            start
        };
        if (base / step).ceil() > f64::from(MAX_LADDER_RUNGS) {
            return Err(PlanError::InvalidParameter(format!(
                "threshold step {step} is too small for a ladder from {base}"
            )));
        }

        let mut threshold = params.threshold;
        let mut next_rung: u32 = if start > top { 0 } else { 1 };
        loop {
            let candidate = AdaptiveParams { threshold, ..*params };
            let available = Self::capacity(map, channels, &candidate)?;
            if available >= required_bits {
                if threshold < params.threshold {
                    tracing::debug!(
                        from = params.threshold,
                        to = threshold,
                        required_bits,
                        "Relaxed threshold to fit payload"
                    );
                }
                return Ok(threshold);
            }
            if threshold <= 0.0 {
                return Err(PlanError::CapacityExceeded {
                    required: required_bits,
                    available,
                });
            }
            threshold = (base - f64::from(next_rung) * step).max(0.0) as f32;
            next_rung += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn half_edge_image() -> Image {
        Image::from_fn(8, 8, Channels::Gray, |_, c, _| if c < 4 { 0 } else { 255 }).unwrap()
    }

    #[test]
    fn test_plain_plan_raster_order() {
        let image = Image::filled(2, 2, Channels::Rgb, 0).unwrap();
        let plan = CapacityPlanner::plain(&image);

        assert_eq!(plan.capacity(), 12);
        assert_eq!(plan.sites()[0], Site { row: 0, col: 0, channel: 0, depth: 1 });
        assert_eq!(plan.sites()[3], Site { row: 0, col: 1, channel: 0, depth: 1 });
        assert_eq!(plan.sites()[11], Site { row: 1, col: 1, channel: 2, depth: 1 });
    }

    #[test]
    fn test_textured_sites_come_first() {
        let image = half_edge_image();
        let map = GradientMap::compute(&image);
        let params = AdaptiveParams {
            threshold: 100.0,
            textured_bits: 2,
            flat_bits: 1,
        };
        let plan = CapacityPlanner::plan(&map, Channels::Gray, &params).unwrap();

        // Columns 3 and 4 are textured, in raster order.
        assert_eq!(plan.sites()[0], Site { row: 0, col: 3, channel: 0, depth: 2 });
        assert_eq!(plan.sites()[1], Site { row: 0, col: 4, channel: 0, depth: 2 });
        assert_eq!(plan.sites()[2], Site { row: 1, col: 3, channel: 0, depth: 2 });
        assert_eq!(plan.sites()[16], Site { row: 0, col: 0, channel: 0, depth: 1 });
        assert_eq!(plan.capacity(), 16 * 2 + 48);
    }

    #[test]
    fn test_flat_sites_skipped_with_zero_depth() {
        let map = GradientMap::compute(&half_edge_image());
        let plan = CapacityPlanner::plan(&map, Channels::Gray, &AdaptiveParams::with_threshold(100.0)).unwrap();

        assert_eq!(plan.len(), 16);
        assert_eq!(plan.capacity(), 32);
    }

    #[test]
    fn test_capacity_query_matches_plan() {
        let image = Image::from_fn(9, 7, Channels::Rgb, |r, c, ch| ((r * 31 + c * 17 + ch as u32 * 5) % 256) as u8).unwrap();
        let map = GradientMap::compute(&image);
        for threshold in [0.0, 10.0, 64.0, 200.0, 255.0] {
            let params = AdaptiveParams {
                threshold,
                textured_bits: 3,
                flat_bits: 1,
            };
            let plan = CapacityPlanner::plan(&map, Channels::Rgb, &params).unwrap();
            assert_eq!(
                CapacityPlanner::capacity(&map, Channels::Rgb, &params).unwrap(),
                plan.capacity()
            );
        }
    }

    #[test]
    fn test_capacity_monotonic_in_threshold() {
        let image = Image::from_fn(16, 16, Channels::Gray, |r, c, _| ((r * c * 7) % 256) as u8).unwrap();
        let map = GradientMap::compute(&image);

        let mut previous = 0;
        for t in (0..=255).rev().step_by(5) {
            let cap = CapacityPlanner::capacity(&map, Channels::Gray, &AdaptiveParams::with_threshold(t as f32)).unwrap();
            assert!(cap >= previous, "capacity dropped at threshold {t}");
            previous = cap;
        }
    }

    #[test]
    fn test_invalid_params_rejected() {
        let map = GradientMap::compute(&half_edge_image());
        let zero = AdaptiveParams {
            threshold: 10.0,
            textured_bits: 0,
            flat_bits: 0,
        };
        let deep = AdaptiveParams {
            threshold: 10.0,
            textured_bits: 9,
            flat_bits: 0,
        };

        assert!(matches!(
            CapacityPlanner::plan(&map, Channels::Gray, &zero),
            Err(PlanError::InvalidParameter(_))
        ));
        assert!(matches!(
            CapacityPlanner::plan(&map, Channels::Gray, &deep),
            Err(PlanError::InvalidParameter(_))
        ));
        assert!(AdaptiveParams::with_threshold(f32::NAN).validate().is_err());
    }

    #[test]
    fn test_flat_deeper_than_textured_rejected() {
        let inverted = AdaptiveParams {
            threshold: 10.0,
            textured_bits: 1,
            flat_bits: 4,
        };
        let flat_only = AdaptiveParams {
            threshold: 10.0,
            textured_bits: 0,
            flat_bits: 1,
        };

        assert!(matches!(inverted.validate(), Err(PlanError::InvalidParameter(_))));
        assert!(matches!(flat_only.validate(), Err(PlanError::InvalidParameter(_))));
        assert!(AdaptiveParams { textured_bits: 4, ..inverted }.validate().is_ok());
    }

    #[test]
    fn test_fit_threshold_from_huge_start() {
        let map = GradientMap::compute(&half_edge_image());
        let params = AdaptiveParams::with_threshold(1e9);

        // Nothing is textured at the starting rung, so the walk lands on 255.
        assert_eq!(
            CapacityPlanner::fit_threshold(&map, Channels::Gray, &params, 32, 5.0).unwrap(),
            255.0
        );
        assert_eq!(
            CapacityPlanner::fit_threshold(&map, Channels::Gray, &params, 33, 5.0).unwrap(),
            0.0
        );
        assert!(matches!(
            CapacityPlanner::fit_threshold(&map, Channels::Gray, &params, 129, 5.0),
            Err(PlanError::CapacityExceeded { required: 129, available: 128 })
        ));

        let largest = AdaptiveParams::with_threshold(f32::MAX);
        assert_eq!(
            CapacityPlanner::fit_threshold(&map, Channels::Gray, &largest, 33, 5.0).unwrap(),
            0.0
        );
    }

    #[test]
    fn test_fit_threshold_rejects_tiny_step() {
        let map = GradientMap::compute(&half_edge_image());
        assert!(matches!(
            CapacityPlanner::fit_threshold(&map, Channels::Gray, &AdaptiveParams::with_threshold(255.0), 33, 1e-6),
            Err(PlanError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_fit_threshold_relaxes_until_fit() {
        let map = GradientMap::compute(&half_edge_image());
        let params = AdaptiveParams::with_threshold(255.0);

        // 16 textured pixels x 2 bits = 32 bits at the top of the ladder.
        assert_eq!(
            CapacityPlanner::fit_threshold(&map, Channels::Gray, &params, 32, 5.0).unwrap(),
            255.0
        );
        // Everything else is flat (score 0), so only threshold 0 adds capacity.
        assert_eq!(
            CapacityPlanner::fit_threshold(&map, Channels::Gray, &params, 33, 5.0).unwrap(),
            0.0
        );
        assert!(matches!(
            CapacityPlanner::fit_threshold(&map, Channels::Gray, &params, 129, 5.0),
            Err(PlanError::CapacityExceeded { required: 129, available: 128 })
        ));
    }
}
