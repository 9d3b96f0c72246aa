//! Imperceptibility and robustness metrics.
//!
//! PSNR and SSIM measure how visible the embedding is; BER and the
//! recovery status measure how much of the payload survived an attack.

mod ber;
mod fidelity;
mod report;

pub use ber::{ber, BitErrorRate, RecoveryStatus};
pub use fidelity::{mse, psnr, ssim};
pub use report::{evaluate, MetricsReport};

use thiserror::Error;

/// Errors from metric computation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricsError {
    /// The two images differ in width, height or channel count.
    #[error("image shapes differ: {left:?} vs {right:?} (width, height, channels)")]
    ShapeMismatch {
        /// Shape of the first image.
        left: (u32, u32, usize),
        /// Shape of the second image.
        right: (u32, u32, usize),
    },
}
