//! Raster image value type shared by every pipeline stage.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when constructing an [`Image`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    /// Width or height is zero.
    #[error("image dimensions must be non-zero")]
    ZeroDimension,
    /// Buffer length disagrees with the dimensions.
    #[error("sample buffer holds {actual} bytes, expected {expected}")]
    BufferSize {
        /// `width * height * channels`.
        expected: usize,
        /// Length of the supplied buffer.
        actual: usize,
    },
    /// Only gray and RGB layouts are supported.
    #[error("unsupported channel count {0} (expected 1 or 3)")]
    UnsupportedChannels(usize),
}

/// Channel layout of an 8-bit raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channels {
    /// Single luminance channel.
    Gray,
    /// Interleaved red, green, blue.
    Rgb,
}

impl Channels {
    /// Number of samples per pixel.
    #[inline]
    pub fn count(self) -> usize {
        match self {
            Channels::Gray => 1,
            Channels::Rgb => 3,
        }
    }

    /// Maps a raw channel count onto a layout.
    pub fn from_count(count: usize) -> Result<Self, ImageError> {
        match count {
            1 => Ok(Channels::Gray),
            3 => Ok(Channels::Rgb),
            other => Err(ImageError::UnsupportedChannels(other)),
        }
    }
}

/// An immutable 8-bit-per-channel raster.
///
/// Samples are stored interleaved in row-major order and addressed by
/// `(row, col, channel)`. Dimensions never change after construction;
/// every transformation in this crate returns a fresh `Image`.
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    /// Interleaved sample data.
    samples: Vec<u8>,
    /// Width in pixels.
    width: u32,
    /// Height in pixels.
    height: u32,
    /// Channel layout.
    channels: Channels,
}

impl Image {
    /// Creates an image from an interleaved sample buffer.
    pub fn new(
        samples: Vec<u8>,
        width: u32,
        height: u32,
        channels: Channels,
    ) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::ZeroDimension);
        }
        let expected = width as usize * height as usize * channels.count();
        if samples.len() != expected {
            return Err(ImageError::BufferSize {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            samples,
            width,
            height,
            channels,
        })
    }

    /// Creates an image with every sample set to `value`.
    pub fn filled(width: u32, height: u32, channels: Channels, value: u8) -> Result<Self, ImageError> {
        let len = width as usize * height as usize * channels.count();
        Self::new(vec![value; len], width, height, channels)
    }

    /// Creates an image by evaluating `f(row, col, channel)` for every sample.
    pub fn from_fn<F>(width: u32, height: u32, channels: Channels, mut f: F) -> Result<Self, ImageError>
    where
        F: FnMut(u32, u32, usize) -> u8,
    {
        let mut samples = Vec::with_capacity(width as usize * height as usize * channels.count());
        for row in 0..height {
            for col in 0..width {
                for ch in 0..channels.count() {
                    samples.push(f(row, col, ch));
                }
            }
        }
        Self::new(samples, width, height, channels)
    }

    /// Returns the interleaved sample buffer.
    #[inline]
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// Consumes the image and returns its sample buffer.
    pub fn into_samples(self) -> Vec<u8> {
        self.samples
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Channel layout.
    #[inline]
    pub fn channels(&self) -> Channels {
        self.channels
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Returns true if `(row, col, channel)` addresses a sample of this image.
    #[inline]
    pub fn contains(&self, row: u32, col: u32, channel: usize) -> bool {
        row < self.height && col < self.width && channel < self.channels.count()
    }

    /// Flat buffer index of a sample. The coordinate must be in bounds.
    #[inline]
    pub fn index(&self, row: u32, col: u32, channel: usize) -> usize {
        (row as usize * self.width as usize + col as usize) * self.channels.count() + channel
    }

    /// Reads one sample, or `None` when the coordinate is out of bounds.
    #[inline]
    pub fn get(&self, row: u32, col: u32, channel: usize) -> Option<u8> {
        if self.contains(row, col, channel) {
            Some(self.samples[self.index(row, col, channel)])
        } else {
            None
        }
    }

    /// Reads one sample. Panics when the coordinate is out of bounds.
    #[inline]
    pub fn sample(&self, row: u32, col: u32, channel: usize) -> u8 {
        self.samples[self.index(row, col, channel)]
    }

    /// Returns true if both images have identical dimensions and layout.
    pub fn same_shape(&self, other: &Image) -> bool {
        self.width == other.width && self.height == other.height && self.channels == other.channels
    }

    /// Returns a new image with `f` applied to every sample.
    pub fn map_samples<F>(&self, f: F) -> Image
    where
        F: FnMut(&u8) -> u8,
    {
        Image {
            samples: self.samples.iter().map(f).collect(),
            width: self.width,
            height: self.height,
            channels: self.channels,
        }
    }

    /// Returns a copy with the `bits` lowest bits of every sample zeroed.
    pub fn with_low_bits_cleared(&self, bits: u8) -> Image {
        let mask = if bits >= 8 { 0 } else { 0xFFu8 << bits };
        self.map_samples(|&s| s & mask)
    }

    /// Builds an image of the same shape from a replacement buffer.
    ///
    /// Used by stages that compute a whole new buffer at once.
    pub(crate) fn with_samples(&self, samples: Vec<u8>) -> Image {
        debug_assert_eq!(samples.len(), self.samples.len());
        Image {
            samples,
            width: self.width,
            height: self.height,
            channels: self.channels,
        }
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .field("sample_bytes", &self.samples.len())
            .finish()
    }
}
