//! Low-order bit-plane access for single samples.
//!
//! These are the only functions that touch sample bits directly; the
//! engine composes them over a site list.

use crate::raster::{Channels, Image, LumaPlane};

/// Replaces the `bit_count` least-significant bits of `sample` with the
/// low `bit_count` bits of `bits`. Higher-order bits are untouched.
///
/// `bit_count` must be in `0..=8`.
#[inline]
pub fn write_bits(sample: u8, bit_count: u8, bits: u8) -> u8 {
    debug_assert!(bit_count <= 8, "bit_count out of range: {bit_count}");
    let mask = low_mask(bit_count);
    (sample & !mask) | (bits & mask)
}

/// Reads the `bit_count` least-significant bits of `sample`.
#[inline]
pub fn read_bits(sample: u8, bit_count: u8) -> u8 {
    debug_assert!(bit_count <= 8, "bit_count out of range: {bit_count}");
    sample & low_mask(bit_count)
}

#[inline]
fn low_mask(bit_count: u8) -> u8 {
    match bit_count {
        0 => 0,
        n if n >= 8 => 0xFF,
        n => (1u8 << n) - 1,
    }
}

/// Renders one bit plane of an image's luminance as a 0/255 grayscale image.
///
/// Position 0 is the least-significant plane. RGB images are reduced to
/// rounded luminance first. Returns `None` for positions above 7.
pub fn bit_plane(image: &Image, position: u8) -> Option<Image> {
    if position > 7 {
        return None;
    }

    let gray: Vec<u8> = match image.channels() {
        Channels::Gray => image.samples().to_vec(),
        Channels::Rgb => LumaPlane::from_image(image)
            .values()
            .iter()
            .map(|&v| v.round().clamp(0.0, 255.0) as u8)
            .collect(),
    };

    let plane = gray
        .into_iter()
        .map(|s| if (s >> position) & 1 == 1 { 255 } else { 0 })
        .collect();

    Image::new(plane, image.width(), image.height(), Channels::Gray).ok()
}
