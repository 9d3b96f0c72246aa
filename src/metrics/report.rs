//! Combined robustness report for one embed/attack/extract run.

use super::ber::{ber, BitErrorRate, RecoveryStatus};
use super::fidelity::{psnr, ssim};
use super::MetricsError;
use crate::attack::AttackSpec;
use crate::embedding::Payload;
use crate::raster::Image;
use serde::Serialize;

/// Imperceptibility and robustness figures for one run.
///
/// Non-finite values (PSNR of identical images) serialize to JSON `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsReport {
    /// Carrier vs stego, dB.
    pub psnr: f64,
    /// Carrier vs stego.
    pub ssim: f64,
    /// Body bit error rate after the attack.
    pub ber: f64,
    /// Recovery classification.
    pub status: RecoveryStatus,
    /// Attack as actually applied.
    pub attack: Option<AttackSpec>,
    /// Stego vs degraded, dB; `None` when the attack changed the shape.
    pub attack_psnr: Option<f64>,
    /// Payload bits compared.
    pub compared_bits: usize,
    /// Payload bits that differ.
    pub bit_errors: usize,
}

impl MetricsReport {
    /// Returns true if the payload came back bit-exact.
    pub fn is_recovered(&self) -> bool {
        self.status == RecoveryStatus::Recovered
    }
}

/// Builds a report.
///
/// `recovered` is `None` when extraction failed, which is reported as
/// [`RecoveryStatus::Lost`] with BER 1.0.
pub fn evaluate(
    original: &Image,
    stego: &Image,
    degraded: &Image,
    payload: &Payload,
    recovered: Option<&Payload>,
    applied: Option<&AttackSpec>,
) -> Result<MetricsReport, MetricsError> {
    let psnr_value = psnr(original, stego)?;
    let ssim_value = ssim(original, stego)?;
    let attack_psnr = if stego.same_shape(degraded) {
        Some(psnr(stego, degraded)?)
    } else {
        None
    };

    let errors = match recovered {
        Some(recovered) => ber(payload, recovered),
        None => BitErrorRate::lost(),
    };

    tracing::trace!(
        psnr = psnr_value,
        ssim = ssim_value,
        ber = errors.rate,
        status = %errors.status,
        "Evaluated run"
    );

    Ok(MetricsReport {
        psnr: psnr_value,
        ssim: ssim_value,
        ber: errors.rate,
        status: errors.status,
        attack: applied.copied(),
        attack_psnr,
        compared_bits: errors.compared_bits,
        bit_errors: errors.bit_errors,
    })
}
