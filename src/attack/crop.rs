//! Rectangular cropping, optionally restored to the source size.

use super::{AttackError, AttackOutcome, AttackSpec};
use crate::embedding::SiteOffset;
use crate::raster::{Channels, Image};
use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};

/// Region kept by a crop, in pixel coordinates of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    /// Left column.
    pub x: u32,
    /// Top row.
    pub y: u32,
    /// Kept width.
    pub width: u32,
    /// Kept height.
    pub height: u32,
}

impl CropRect {
    /// Creates a rectangle from its top-left corner and size.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Centered rectangle keeping `keep_ratio` of each dimension.
    ///
    /// `keep_ratio` must lie in `(0, 1]`. Kept sizes are truncated and
    /// never drop below one pixel.
    pub fn centered(width: u32, height: u32, keep_ratio: f64) -> Result<Self, AttackError> {
        if !(keep_ratio > 0.0 && keep_ratio <= 1.0) {
            return Err(AttackError::InvalidParameter {
                name: "keep_ratio",
                value: keep_ratio,
                reason: "must lie in (0, 1]".into(),
            });
        }
        let kept_w = ((width as f64 * keep_ratio) as u32).max(1);
        let kept_h = ((height as f64 * keep_ratio) as u32).max(1);
        Ok(Self {
            x: (width.saturating_sub(kept_w)) / 2,
            y: (height.saturating_sub(kept_h)) / 2,
            width: kept_w,
            height: kept_h,
        })
    }

    /// Translation that maps carrier coordinates into the cropped image.
    pub fn offset(&self) -> SiteOffset {
        SiteOffset {
            rows: self.y,
            cols: self.x,
        }
    }

    /// Intersection with a `width`×`height` image, or `None` if empty.
    pub fn clip(&self, width: u32, height: u32) -> Option<Self> {
        let x0 = self.x.min(width);
        let y0 = self.y.min(height);
        let x1 = self.x.saturating_add(self.width).min(width);
        let y1 = self.y.saturating_add(self.height).min(height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Self {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }

    /// Fraction of a `width`×`height` image this rectangle keeps.
    pub fn kept_fraction(&self, width: u32, height: u32) -> f64 {
        match self.clip(width, height) {
            Some(rect) if width > 0 && height > 0 => {
                (rect.width as f64 * rect.height as f64) / (width as f64 * height as f64)
            }
            _ => 0.0,
        }
    }
}

/// Crops `image` to `rect`, clipped to the image bounds. With
/// `restore_size` the kept region is scaled back to the source dimensions
/// with a bilinear filter.
pub fn apply(image: &Image, rect: CropRect, restore_size: bool) -> Result<AttackOutcome, AttackError> {
    let clipped = rect
        .clip(image.width(), image.height())
        .ok_or_else(|| AttackError::InvalidParameter {
            name: "rect",
            value: 0.0,
            reason: format!(
                "{}x{} at ({}, {}) does not intersect a {}x{} image",
                rect.width,
                rect.height,
                rect.x,
                rect.y,
                image.width(),
                image.height()
            ),
        })?;
    if clipped != rect {
        tracing::warn!(
            requested = ?rect,
            applied = ?clipped,
            "Crop rectangle clipped to image bounds"
        );
    }

    let channels = image.channels();
    let cropped = Image::from_fn(clipped.width, clipped.height, channels, |row, col, ch| {
        image.sample(row + clipped.y, col + clipped.x, ch)
    })
    .map_err(|e| AttackError::InvalidParameter {
        name: "rect",
        value: 0.0,
        reason: e.to_string(),
    })?;

    let image = if restore_size && !cropped.same_shape(image) {
        resize(cropped, image.width(), image.height())?
    } else {
        cropped
    };

    Ok(AttackOutcome {
        image,
        applied: AttackSpec::Crop {
            rect: clipped,
            restore_size,
        },
    })
}

fn resize(source: Image, width: u32, height: u32) -> Result<Image, AttackError> {
    let channels = source.channels();
    let (src_w, src_h) = (source.width(), source.height());
    let samples = source.into_samples();

    let resized = match channels {
        Channels::Gray => image::GrayImage::from_raw(src_w, src_h, samples)
            .map(|buf| imageops::resize(&buf, width, height, FilterType::Triangle).into_raw()),
        Channels::Rgb => image::RgbImage::from_raw(src_w, src_h, samples)
            .map(|buf| imageops::resize(&buf, width, height, FilterType::Triangle).into_raw()),
    };
    let invalid = |reason: String| AttackError::InvalidParameter {
        name: "restore_size",
        value: 1.0,
        reason,
    };

    let resized = resized.ok_or_else(|| invalid(format!("buffer does not match {src_w}x{src_h}")))?;
    Image::new(resized, width, height, channels).map_err(|e| invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Channels;

    fn numbered(width: u32, height: u32) -> Image {
        Image::from_fn(width, height, Channels::Gray, |r, c, _| (r * width + c) as u8).unwrap()
    }

    #[test]
    fn test_crop_copies_region() {
        let image = numbered(6, 5);
        let out = apply(&image, CropRect::new(2, 1, 3, 2), false).unwrap();

        assert_eq!(out.image.width(), 3);
        assert_eq!(out.image.height(), 2);
        assert_eq!(out.image.samples(), &[8, 9, 10, 14, 15, 16]);
        assert_eq!(
            out.applied,
            AttackSpec::Crop {
                rect: CropRect::new(2, 1, 3, 2),
                restore_size: false
            }
        );
    }

    #[test]
    fn test_crop_clipped_and_reported() {
        let image = numbered(6, 5);
        let out = apply(&image, CropRect::new(4, 3, 10, 10), false).unwrap();

        assert_eq!(
            out.applied,
            AttackSpec::Crop {
                rect: CropRect::new(4, 3, 2, 2),
                restore_size: false
            }
        );
        assert_eq!(out.image.samples(), &[22, 23, 28, 29]);
    }

    #[test]
    fn test_empty_crop_rejected() {
        let image = numbered(6, 5);

        assert!(apply(&image, CropRect::new(6, 0, 2, 2), false).is_err());
        assert!(apply(&image, CropRect::new(0, 0, 0, 3), true).is_err());
    }

    #[test]
    fn test_restored_crop_keeps_source_size() {
        let flat = Image::filled(20, 16, Channels::Rgb, 77).unwrap();
        let out = apply(&flat, CropRect::centered(20, 16, 0.5).unwrap(), true).unwrap();

        assert!(out.image.same_shape(&flat));
        assert!(out.image.samples().iter().all(|&s| s == 77));
        assert!(matches!(out.applied, AttackSpec::Crop { restore_size: true, .. }));
    }

    #[test]
    fn test_restored_crop_stretches_region() {
        // Left half dark, right half bright; keeping the right half fills the frame.
        let image = Image::from_fn(16, 8, Channels::Gray, |_, c, _| if c < 8 { 10 } else { 240 }).unwrap();
        let out = apply(&image, CropRect::new(8, 0, 8, 8), true).unwrap();

        assert_eq!((out.image.width(), out.image.height()), (16, 8));
        assert!(out.image.samples().iter().all(|&s| s == 240));
    }

    #[test]
    fn test_full_frame_restore_is_identity() {
        let image = numbered(6, 5);
        let out = apply(&image, CropRect::new(0, 0, 6, 5), true).unwrap();
        assert_eq!(out.image, image);
    }

    #[test]
    fn test_centered_rect() {
        let rect = CropRect::centered(100, 60, 0.5).unwrap();
        assert_eq!(rect, CropRect::new(25, 15, 50, 30));
        assert_eq!(rect.offset(), SiteOffset { rows: 15, cols: 25 });

        assert_eq!(CropRect::centered(10, 10, 1.0).unwrap(), CropRect::new(0, 0, 10, 10));
        assert!(CropRect::centered(10, 10, 0.0).is_err());
        assert!(CropRect::centered(10, 10, 1.5).is_err());
        assert!(CropRect::centered(10, 10, f64::NAN).is_err());
    }

    #[test]
    fn test_kept_fraction() {
        let rect = CropRect::centered(100, 100, 0.5).unwrap();
        assert!((rect.kept_fraction(100, 100) - 0.25).abs() < 1e-12);
        assert_eq!(CropRect::new(200, 0, 5, 5).kept_fraction(100, 100), 0.0);
    }
}
