//! Property tests for the codec, the embedding round trip and the planner.

use proptest::prelude::*;
use texture_stego::embedding::bitplane::{read_bits, write_bits};
use texture_stego::{
    embed, extract, AdaptiveParams, CapacityPlanner, Channels, GradientMap, Image, Mode, Payload,
};

fn image_strategy() -> impl Strategy<Value = Image> {
    (8u32..24, 8u32..24, any::<bool>()).prop_flat_map(|(width, height, rgb)| {
        let channels = if rgb { Channels::Rgb } else { Channels::Gray };
        prop::collection::vec(any::<u8>(), (width * height) as usize * channels.count())
            .prop_map(move |samples| Image::new(samples, width, height, channels).unwrap())
    })
}

/// Textured depth in 1..=`max`, flat depth in `min_flat`..=textured.
fn depth_strategy(min_flat: u8, max: u8) -> impl Strategy<Value = (u8, u8)> {
    (min_flat.max(1)..=max).prop_flat_map(move |textured_bits| (Just(textured_bits), min_flat..=textured_bits))
}

fn mode_strategy() -> impl Strategy<Value = Mode> {
    prop_oneof![
        Just(Mode::Plain),
        (0.0f32..255.0, depth_strategy(1, 4)).prop_map(|(threshold, (textured_bits, flat_bits))| {
            Mode::Adaptive(AdaptiveParams {
                threshold,
                textured_bits,
                flat_bits,
            })
        }),
    ]
}

proptest! {
    #[test]
    fn codec_read_inverts_write(sample in any::<u8>(), count in 0u8..=8, bits in any::<u8>()) {
        let written = write_bits(sample, count, bits);
        let mask = if count == 8 { 0xFF } else { (1u8 << count) - 1 };

        prop_assert_eq!(read_bits(written, count), bits & mask);
        prop_assert_eq!(written & !mask, sample & !mask);
    }

    #[test]
    fn embed_extract_roundtrip(
        carrier in image_strategy(),
        mode in mode_strategy(),
        data in prop::collection::vec(any::<u8>(), 0..48),
    ) {
        let payload = Payload::from_bytes(data);
        let capacity = mode.payload_capacity(&carrier).unwrap();
        prop_assume!(payload.bit_len() <= capacity);

        let stego = embed(&carrier, &payload, &mode).unwrap();
        prop_assert_eq!(extract(&stego, &mode, &carrier).unwrap(), payload.clone());
        prop_assert_eq!(extract(&stego, &mode, &stego).unwrap(), payload);
    }

    #[test]
    fn lowering_threshold_never_reduces_capacity(
        carrier in image_strategy(),
        a in 0.0f32..=255.0,
        b in 0.0f32..=255.0,
        (textured_bits, flat_bits) in depth_strategy(0, 8),
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let map = GradientMap::compute(&carrier);
        let params = |threshold| AdaptiveParams { threshold, textured_bits, flat_bits };

        let low_capacity = CapacityPlanner::capacity(&map, carrier.channels(), &params(low)).unwrap();
        let high_capacity = CapacityPlanner::capacity(&map, carrier.channels(), &params(high)).unwrap();
        prop_assert!(low_capacity >= high_capacity);
    }

    #[test]
    fn plan_capacity_matches_site_depths(carrier in image_strategy(), threshold in 0.0f32..=255.0) {
        let params = AdaptiveParams { threshold, textured_bits: 3, flat_bits: 1 };
        let map = GradientMap::compute(&carrier);
        let plan = CapacityPlanner::plan(&map, carrier.channels(), &params).unwrap();

        let summed: usize = plan.sites().iter().map(|s| s.depth as usize).sum();
        prop_assert_eq!(plan.capacity(), summed);
        prop_assert!(plan.sites().iter().all(|s| carrier.contains(s.row, s.col, s.channel as usize)));
    }
}
