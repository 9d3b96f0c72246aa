//! Error types for embedding and extraction.

use crate::texture::PlanError;
use thiserror::Error;

/// Errors that can occur while embedding or extracting a payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StegoError {
    /// The framed payload does not fit in the site plan.
    #[error("payload needs {required} bits but only {available} are available")]
    CapacityExceeded {
        /// Framed bits needed.
        required: usize,
        /// Bits the plan offers.
        available: usize,
    },

    /// A site does not exist in the image being read or written.
    #[error("site (row {row}, col {col}, channel {channel}) lies outside the image")]
    SiteOutOfBounds {
        /// Site row.
        row: u32,
        /// Site column.
        col: u32,
        /// Site channel.
        channel: u8,
    },

    /// The decoded length header cannot be satisfied by the remaining sites.
    #[error("length header declares {declared} bits but only {available} remain")]
    HeaderCorrupt {
        /// Body length read from the header.
        declared: usize,
        /// Bits left after the header.
        available: usize,
    },

    /// The payload is longer than the 32-bit length header can express.
    #[error("payload of {bits} bits exceeds the length header range")]
    PayloadTooLarge {
        /// Payload length in bits.
        bits: usize,
    },

    /// A mode parameter is outside its documented domain.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl From<PlanError> for StegoError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::InvalidParameter(msg) => StegoError::InvalidParameter(msg),
            PlanError::CapacityExceeded { required, available } => {
                StegoError::CapacityExceeded { required, available }
            }
        }
    }
}
