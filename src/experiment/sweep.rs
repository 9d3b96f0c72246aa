//! Parameter sweeps.
//!
//! Trials are independent, so each sweep point runs on the rayon pool and
//! results come back in the order the values were given.

use super::config::{ExperimentConfig, SweepConfig};
use super::trial::{run_trial, Trial, TrialOutcome};
use super::ExperimentError;
use crate::attack::AttackSpec;
use crate::embedding::{fit_adaptive, Mode, Payload, StegoError, HEADER_BITS};
use crate::raster::Image;
use crate::texture::{AdaptiveParams, CapacityPlanner, GradientMap};
use rayon::prelude::*;
use serde::Serialize;
use std::fmt::Write as _;

/// One point of a BER curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurvePoint {
    /// Swept value as configured.
    pub parameter: f64,
    /// Trial outcome at this value.
    pub outcome: TrialOutcome,
}

/// One point of a capacity curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CapacityPoint {
    /// Texture threshold.
    pub threshold: f32,
    /// Payload bits available after the length header.
    pub payload_bits: usize,
}

/// Result of a configured sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepRun {
    /// Mode actually used, after threshold fitting.
    pub mode: Mode,
    /// Curve points in configured order.
    pub points: Vec<CurvePoint>,
}

/// Runs one trial per configured value of `sweep`.
pub fn ber_curve(
    carrier: &Image,
    payload: &Payload,
    mode: &Mode,
    sweep: &SweepConfig,
) -> Result<Vec<CurvePoint>, ExperimentError> {
    let specs: Vec<(f64, AttackSpec)> = sweep
        .values
        .iter()
        .map(|&value| -> Result<_, ExperimentError> {
            Ok((value, sweep.spec_for(value, carrier.width(), carrier.height())?))
        })
        .collect::<Result<_, _>>()?;

    let points = specs
        .into_par_iter()
        .map(|(parameter, spec)| {
            let trial = Trial::attacked(*mode, spec).with_crop_extraction(sweep.crop_extraction);
            run_trial(carrier, payload, &trial).map(|outcome| CurvePoint { parameter, outcome })
        })
        .collect::<Result<Vec<_>, ExperimentError>>()?;

    tracing::debug!(
        attack = ?sweep.attack,
        points = points.len(),
        "BER curve computed"
    );
    Ok(points)
}

/// Payload capacity of `carrier` at each threshold, other parameters fixed.
pub fn capacity_curve(
    carrier: &Image,
    params: &AdaptiveParams,
    thresholds: &[f32],
) -> Result<Vec<CapacityPoint>, StegoError> {
    params.validate()?;
    let map = GradientMap::compute(&carrier.with_low_bits_cleared(params.max_depth()));
    let channels = carrier.channels();

    thresholds
        .par_iter()
        .map(|&threshold| -> Result<CapacityPoint, StegoError> {
            let params = AdaptiveParams { threshold, ..*params };
            let total = CapacityPlanner::capacity(&map, channels, &params)?;
            Ok(CapacityPoint {
                threshold,
                payload_bits: total.saturating_sub(HEADER_BITS),
            })
        })
        .collect()
}

/// Runs the sweep described by `config`.
///
/// In adaptive mode with `auto_fit`, the threshold is first relaxed until
/// the payload fits; the fitted mode is used for every point.
pub fn run_sweep(carrier: &Image, payload: &Payload, config: &ExperimentConfig) -> Result<SweepRun, ExperimentError> {
    config.validate()?;

    let mode = match config.embed.mode() {
        Mode::Adaptive(params) if config.embed.auto_fit => {
            let fitted = fit_adaptive(carrier, payload, &params, config.embed.fit_step)?;
            if fitted != Mode::Adaptive(params) {
                tracing::info!(requested = params.threshold, fitted = ?fitted, "Threshold relaxed to fit payload");
            }
            fitted
        }
        mode => mode,
    };

    let points = ber_curve(carrier, payload, &mode, &config.sweep)?;
    Ok(SweepRun { mode, points })
}

/// Renders curve points as CSV with a header row.
pub fn to_csv(points: &[CurvePoint]) -> String {
    let mut out = String::from("parameter,ber,status,compared_bits,bit_errors,erased_bits,psnr,ssim,attack_psnr\n");
    for point in points {
        let report = &point.outcome.report;
        let attack_psnr = report.attack_psnr.map(|v| v.to_string()).unwrap_or_default();
        // Writing to a String cannot fail.
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{}",
            point.parameter,
            report.ber,
            report.status,
            report.compared_bits,
            report.bit_errors,
            point.outcome.erased_bits,
            report.psnr,
            report.ssim,
            attack_psnr
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attack::NoiseKind;
    use crate::experiment::config::AttackKind;
    use crate::metrics::RecoveryStatus;
    use crate::raster::Channels;

    fn carrier() -> Image {
        Image::from_fn(48, 48, Channels::Rgb, |r, c, ch| {
            let base = if (r / 6 + c / 6) % 2 == 0 { 30 } else { 210 };
            (base + (r * 3 + c * 5 + ch as u32 * 7) % 17) as u8
        })
        .unwrap()
    }

    fn salt_pepper(values: Vec<f64>) -> SweepConfig {
        SweepConfig {
            attack: AttackKind::Noise,
            noise_kind: NoiseKind::SaltPepper,
            values,
            seed: Some(99),
            ..Default::default()
        }
    }

    #[test]
    fn test_ber_curve_preserves_order() {
        let payload = Payload::from_text("ordered sweep");
        let values = vec![0.3, 0.0, 0.1];
        let points = ber_curve(&carrier(), &payload, &Mode::Plain, &salt_pepper(values.clone())).unwrap();

        let params: Vec<f64> = points.iter().map(|p| p.parameter).collect();
        assert_eq!(params, values);
        assert_eq!(points[1].outcome.report.status, RecoveryStatus::Recovered);
    }

    #[test]
    fn test_salt_pepper_ber_non_decreasing() {
        let payload = Payload::from_text("noisy channel under test");
        let values = vec![0.0, 0.002, 0.005, 0.01, 0.02, 0.05, 0.1, 0.3, 0.6, 1.0];

        for mode in [Mode::Plain, Mode::Adaptive(AdaptiveParams::default())] {
            let points = ber_curve(&carrier(), &payload, &mode, &salt_pepper(values.clone())).unwrap();
            let bers: Vec<f64> = points.iter().map(|p| p.outcome.report.ber).collect();

            assert_eq!(bers[0], 0.0, "{mode:?}");
            for pair in bers.windows(2) {
                assert!(pair[1] >= pair[0], "{mode:?}: {bers:?}");
            }
            assert!(bers[bers.len() - 1] > 0.3, "{mode:?}: {bers:?}");
        }
    }

    #[test]
    fn test_capacity_curve_monotone() {
        let params = AdaptiveParams {
            threshold: 0.0,
            textured_bits: 2,
            flat_bits: 1,
        };
        let thresholds = [0.0, 20.0, 60.0, 120.0, 255.0];
        let curve = capacity_curve(&carrier(), &params, &thresholds).unwrap();

        assert_eq!(curve.len(), thresholds.len());
        for pair in curve.windows(2) {
            assert!(pair[0].payload_bits >= pair[1].payload_bits);
        }
        assert_eq!(curve[0].payload_bits, 48 * 48 * 3 * 2 - HEADER_BITS);
    }

    #[test]
    fn test_run_sweep_fits_threshold() {
        let payload = Payload::from_bytes(vec![0x3C; 1600]);
        let mut config = ExperimentConfig::default();
        config.embed.mode = crate::experiment::config::ModeKind::Adaptive;
        config.embed.threshold = 255.0;
        config.embed.flat_bits = 1;
        config.sweep = salt_pepper(vec![0.0]);

        let run = run_sweep(&carrier(), &payload, &config).unwrap();
        match run.mode {
            Mode::Adaptive(params) => assert!(params.threshold < 255.0),
            Mode::Plain => panic!("expected adaptive mode"),
        }
        assert!(run.points[0].outcome.report.is_recovered());
    }

    #[test]
    fn test_csv_rows() {
        let payload = Payload::from_text("csv");
        let points = ber_curve(&carrier(), &payload, &Mode::Plain, &salt_pepper(vec![0.0, 0.5])).unwrap();
        let csv = to_csv(&points);

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("parameter,ber,status"));
        assert!(lines[1].starts_with("0,0,recovered,"));
    }
}
