//! Bit error rate between an embedded and a recovered payload.

use crate::embedding::Payload;
use serde::{Deserialize, Serialize};

/// How a recovered payload relates to the original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStatus {
    /// Same length and every bit matches.
    Recovered,
    /// Fewer bits came back than were embedded.
    Truncated,
    /// Bit errors, or more bits than were embedded.
    Garbled,
    /// Extraction failed outright.
    Lost,
}

impl std::fmt::Display for RecoveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RecoveryStatus::Recovered => "recovered",
            RecoveryStatus::Truncated => "truncated",
            RecoveryStatus::Garbled => "garbled",
            RecoveryStatus::Lost => "lost",
        };
        f.write_str(s)
    }
}

/// Bit error rate of a recovered bit sequence.
///
/// A recovered sequence of the wrong length means the length header was
/// damaged, and every embedded bit counts as an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BitErrorRate {
    /// `bit_errors / compared_bits`; 1.0 whenever the lengths differ.
    pub rate: f64,
    /// Bits compared (the embedded length).
    pub compared_bits: usize,
    /// Embedded bits that were not recovered.
    pub bit_errors: usize,
    /// Recovery classification.
    pub status: RecoveryStatus,
}

impl BitErrorRate {
    /// Compares two raw bit sequences.
    pub fn between(original: &[bool], recovered: &[bool]) -> Self {
        let compared_bits = original.len();
        let bit_errors = if recovered.len() == original.len() {
            original.iter().zip(recovered).filter(|(a, b)| a != b).count()
        } else {
            original.len()
        };

        let rate = if recovered.len() != original.len() {
            1.0
        } else if original.is_empty() {
            0.0
        } else {
            bit_errors as f64 / compared_bits as f64
        };

        let status = if recovered.len() == original.len() && bit_errors == 0 {
            RecoveryStatus::Recovered
        } else if recovered.len() < original.len() {
            RecoveryStatus::Truncated
        } else {
            RecoveryStatus::Garbled
        };

        Self {
            rate,
            compared_bits,
            bit_errors,
            status,
        }
    }

    /// Result for an extraction that produced nothing.
    pub fn lost() -> Self {
        Self {
            rate: 1.0,
            compared_bits: 0,
            bit_errors: 0,
            status: RecoveryStatus::Lost,
        }
    }
}

/// Bit error rate of `recovered` against `original`.
pub fn ber(original: &Payload, recovered: &Payload) -> BitErrorRate {
    let a: Vec<bool> = original.bits().collect();
    let b: Vec<bool> = recovered.bits().collect();
    BitErrorRate::between(&a, &b)
}
