//! One embed → attack → extract → evaluate run.

use super::config::CropExtraction;
use super::ExperimentError;
use crate::attack::{attack, AttackSpec};
use crate::embedding::{embed, extract, extract_remapped, Mode, Payload, StegoError};
use crate::metrics::{evaluate, MetricsReport};
use crate::raster::Image;
use serde::Serialize;

/// Parameters of a single pipeline run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trial {
    /// Embedding mode; sites are regenerated from the carrier.
    pub mode: Mode,
    /// Attack applied to the stego image, if any.
    pub attack: Option<AttackSpec>,
    /// Read-back policy when the attack is a crop.
    pub crop_extraction: CropExtraction,
}

impl Trial {
    /// A trial with no attack.
    pub fn clean(mode: Mode) -> Self {
        Self {
            mode,
            attack: None,
            crop_extraction: CropExtraction::default(),
        }
    }

    /// A trial with `attack` applied after embedding.
    pub fn attacked(mode: Mode, attack: AttackSpec) -> Self {
        Self {
            mode,
            attack: Some(attack),
            crop_extraction: CropExtraction::default(),
        }
    }

    /// Sets the crop read-back policy.
    pub fn with_crop_extraction(mut self, policy: CropExtraction) -> Self {
        self.crop_extraction = policy;
        self
    }
}

/// Outcome of a trial.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialOutcome {
    /// Metrics for the run.
    pub report: MetricsReport,
    /// Body bits lost to a crop during remapped extraction.
    pub erased_bits: usize,
    /// Why extraction failed, when it did.
    #[serde(serialize_with = "serialize_failure")]
    pub failure: Option<StegoError>,
}

fn serialize_failure<S>(failure: &Option<StegoError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match failure {
        Some(err) => serializer.serialize_some(&err.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Runs one trial.
///
/// Embedding and attack errors abort the trial. Extraction errors are part
/// of the measurement and come back as a [`RecoveryStatus::Lost`] report.
///
/// [`RecoveryStatus::Lost`]: crate::metrics::RecoveryStatus::Lost
pub fn run_trial(carrier: &Image, payload: &Payload, trial: &Trial) -> Result<TrialOutcome, ExperimentError> {
    let stego = embed(carrier, payload, &trial.mode)?;

    let (degraded, applied) = match &trial.attack {
        Some(spec) => {
            let outcome = attack(&stego, spec)?;
            (outcome.image, Some(outcome.applied))
        }
        None => (stego.clone(), None),
    };

    let recovered = match (applied, trial.crop_extraction) {
        (
            Some(AttackSpec::Crop {
                rect,
                restore_size: false,
            }),
            CropExtraction::Remapped,
        ) => {
            extract_remapped(&degraded, &trial.mode, carrier, rect.offset())
                .map(|extraction| (extraction.payload, extraction.erased_bits))
        }
        _ => extract(&degraded, &trial.mode, carrier).map(|payload| (payload, 0)),
    };

    let (recovered, erased_bits, failure) = match recovered {
        Ok((payload, erased)) => (Some(payload), erased, None),
        Err(err) => {
            tracing::trace!(error = %err, "Extraction failed");
            (None, 0, Some(err))
        }
    };

    let report = evaluate(
        carrier,
        &stego,
        &degraded,
        payload,
        recovered.as_ref(),
        applied.as_ref(),
    )?;

    tracing::trace!(
        attack = ?applied,
        ber = report.ber,
        status = %report.status,
        erased_bits,
        "Trial finished"
    );

    Ok(TrialOutcome {
        report,
        erased_bits,
        failure,
    })
}
