//! Payload embedding and extraction.
//!
//! This module turns a carrier image and a payload into a stego image and
//! back. The site list is never stored: both sides regenerate it from the
//! carrier and the [`Mode`].
//!
//! Adaptive mode scores texture on the carrier with its low
//! `max(textured_bits, flat_bits)` bits cleared. Embedding only touches
//! those bits, so the stego image regenerates exactly the same site list
//! and can stand in for the carrier during extraction.

pub mod bitplane;
mod engine;
mod error;
mod payload;

pub use engine::{EmbeddingEngine, Extraction, SiteOffset};
pub use error::StegoError;
pub use payload::{Payload, PayloadKind, HEADER_BITS};

use crate::raster::Image;
use crate::texture::{AdaptiveParams, CapacityPlanner, GradientMap, SitePlan};
use serde::{Deserialize, Serialize};

/// Site-selection policy shared by encoder and decoder.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Mode {
    /// Every sample carries one bit, raster order.
    #[default]
    Plain,
    /// Gradient-ordered sites with texture-dependent depth.
    Adaptive(AdaptiveParams),
}

impl Mode {
    /// Regenerates the site plan for `carrier`.
    pub fn plan(&self, carrier: &Image) -> Result<SitePlan, StegoError> {
        match self {
            Mode::Plain => Ok(CapacityPlanner::plain(carrier)),
            Mode::Adaptive(params) => {
                params.validate()?;
                let map = texture_map(carrier, params);
                Ok(CapacityPlanner::plan(&map, carrier.channels(), params)?)
            }
        }
    }

    /// Largest payload, in bits, that fits in `carrier` under this mode.
    pub fn payload_capacity(&self, carrier: &Image) -> Result<usize, StegoError> {
        let total = match self {
            Mode::Plain => carrier.samples().len(),
            Mode::Adaptive(params) => {
                let map = texture_map(carrier, params);
                CapacityPlanner::capacity(&map, carrier.channels(), params)?
            }
        };
        Ok(total.saturating_sub(HEADER_BITS))
    }
}

fn texture_map(carrier: &Image, params: &AdaptiveParams) -> GradientMap {
    GradientMap::compute(&carrier.with_low_bits_cleared(params.max_depth()))
}

/// Hides `payload` in a copy of `carrier`.
pub fn embed(carrier: &Image, payload: &Payload, mode: &Mode) -> Result<Image, StegoError> {
    let plan = mode.plan(carrier)?;
    EmbeddingEngine::encode(carrier, payload, &plan)
}

/// Recovers a payload from `image`, regenerating sites from `carrier`.
///
/// `carrier` may be the original cover or the stego image itself.
pub fn extract(image: &Image, mode: &Mode, carrier: &Image) -> Result<Payload, StegoError> {
    let plan = mode.plan(carrier)?;
    EmbeddingEngine::decode(image, &plan)
}

/// Recovers a payload from an image cropped at `offset`.
///
/// Sites are translated into the cropped coordinate space; body sites
/// lost to the crop are reported as erasures instead of failing.
pub fn extract_remapped(
    image: &Image,
    mode: &Mode,
    carrier: &Image,
    offset: SiteOffset,
) -> Result<Extraction, StegoError> {
    let plan = mode.plan(carrier)?;
    EmbeddingEngine::decode_remapped(image, &plan, offset)
}

/// Builds an adaptive mode whose threshold is relaxed, in steps of `step`,
/// until `payload` fits in `carrier`.
pub fn fit_adaptive(
    carrier: &Image,
    payload: &Payload,
    params: &AdaptiveParams,
    step: f32,
) -> Result<Mode, StegoError> {
    params.validate()?;
    let map = texture_map(carrier, params);
    let threshold =
        CapacityPlanner::fit_threshold(&map, carrier.channels(), params, payload.framed_len(), step)?;
    Ok(Mode::Adaptive(AdaptiveParams {
        threshold,
        ..*params
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Channels;

    fn textured_carrier() -> Image {
        Image::from_fn(32, 32, Channels::Rgb, |r, c, ch| {
            let base = if (r / 4 + c / 4) % 2 == 0 { 40 } else { 200 };
            (base + ((r * 7 + c * 13 + ch as u32 * 3) % 23)) as u8
        })
        .unwrap()
    }

    #[test]
    fn test_plain_roundtrip() {
        let carrier = textured_carrier();
        let payload = Payload::from_text("plain mode");

        let stego = embed(&carrier, &payload, &Mode::Plain).unwrap();
        assert_eq!(extract(&stego, &Mode::Plain, &carrier).unwrap(), payload);
    }

    #[test]
    fn test_adaptive_roundtrip_with_carrier() {
        let carrier = textured_carrier();
        let payload = Payload::from_bytes((0..40u8).collect());
        let mode = Mode::Adaptive(AdaptiveParams::default());

        let stego = embed(&carrier, &payload, &mode).unwrap();
        assert_eq!(extract(&stego, &mode, &carrier).unwrap(), payload);
    }

    #[test]
    fn test_adaptive_blind_extraction_from_stego() {
        let carrier = textured_carrier();
        let payload = Payload::from_text("no carrier needed");
        let mode = Mode::Adaptive(AdaptiveParams {
            threshold: 50.0,
            textured_bits: 2,
            flat_bits: 1,
        });

        let stego = embed(&carrier, &payload, &mode).unwrap();
        assert_eq!(mode.plan(&stego).unwrap(), mode.plan(&carrier).unwrap());
        assert_eq!(extract(&stego, &mode, &stego).unwrap(), payload);
    }

    #[test]
    fn test_adaptive_leaves_flat_regions_untouched() {
        // Flat left half, noisy right half.
        let carrier = Image::from_fn(16, 16, Channels::Gray, |r, c, _| {
            if c < 8 { 90 } else { ((r * 53 + c * 97) % 256) as u8 }
        })
        .unwrap();
        let mode = Mode::Adaptive(AdaptiveParams::with_threshold(1.0));

        let stego = embed(&carrier, &Payload::from_bits(vec![true; 8]), &mode).unwrap();
        for r in 0..16 {
            for c in 0..6 {
                assert_eq!(stego.sample(r, c, 0), 90);
            }
        }
    }

    #[test]
    fn test_payload_capacity_reserves_header() {
        let carrier = Image::filled(8, 8, Channels::Gray, 0).unwrap();
        assert_eq!(Mode::Plain.payload_capacity(&carrier).unwrap(), 32);

        let tiny = Image::filled(4, 4, Channels::Gray, 0).unwrap();
        assert_eq!(Mode::Plain.payload_capacity(&tiny).unwrap(), 0);
    }

    #[test]
    fn test_fit_adaptive_relaxes_threshold() {
        let carrier = textured_carrier();
        let payload = Payload::from_bytes(vec![0xA5; 500]);
        let params = AdaptiveParams {
            threshold: 250.0,
            textured_bits: 2,
            flat_bits: 1,
        };

        assert!(matches!(
            embed(&carrier, &payload, &Mode::Adaptive(params)),
            Err(StegoError::CapacityExceeded { .. })
        ));

        let mode = fit_adaptive(&carrier, &payload, &params, 5.0).unwrap();
        let stego = embed(&carrier, &payload, &mode).unwrap();
        assert_eq!(extract(&stego, &mode, &carrier).unwrap(), payload);
    }

    #[test]
    fn test_fit_adaptive_from_huge_threshold() {
        let carrier = textured_carrier();
        let payload = Payload::from_text("hi");
        let params = AdaptiveParams {
            threshold: 1e9,
            textured_bits: 2,
            flat_bits: 0,
        };

        let mode = fit_adaptive(&carrier, &payload, &params, 5.0).unwrap();
        match mode {
            Mode::Adaptive(fitted) => assert!(fitted.threshold <= crate::texture::MAX_SCORE),
            Mode::Plain => panic!("expected adaptive mode"),
        }
        let stego = embed(&carrier, &payload, &mode).unwrap();
        assert_eq!(extract(&stego, &mode, &carrier).unwrap(), payload);
    }

    #[test]
    fn test_mode_serde_tagged() {
        let mode: Mode = serde_json::from_str(
            r#"{"mode":"adaptive","threshold":12.5,"textured_bits":3,"flat_bits":1}"#,
        )
        .unwrap();
        assert_eq!(
            mode,
            Mode::Adaptive(AdaptiveParams {
                threshold: 12.5,
                textured_bits: 3,
                flat_bits: 1
            })
        );
        let plain: Mode = serde_json::from_str(r#"{"mode":"plain"}"#).unwrap();
        assert_eq!(plain, Mode::Plain);
    }
}
