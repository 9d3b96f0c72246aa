//! Texture-Adaptive LSB Steganography Library
//!
//! Hides a payload in the least-significant bits of an 8-bit raster image,
//! concentrating the changes in textured regions where they are hardest to
//! see, and measures how well the payload survives common image attacks.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! carrier → texture (gradient, sites) → embedding → stego
//!     stego → attack → degraded → embedding (extract) → payload
//!                 ↓
//!             metrics (PSNR, SSIM, BER)
//! ```
//!
//! # Design Principles
//!
//! - **Shared site order**: the site list is never transmitted; both sides
//!   regenerate it from the carrier and the [`Mode`]
//! - **Blind adaptive extraction**: texture is scored with the embeddable
//!   bits cleared, so the stego image regenerates its own site list
//! - **Value semantics**: every operation returns a new image or payload
//! - **No secrecy claims**: payloads are not encrypted
//!
//! # Example
//!
//! ```
//! use texture_stego::{
//!     attack, embed, evaluate, extract, AdaptiveParams, AttackSpec, Channels, Image, Mode,
//!     NoiseKind, Payload,
//! };
//!
//! let carrier = Image::from_fn(64, 64, Channels::Rgb, |row, col, ch| {
//!     ((row * 37 + col * 11 + ch as u32 * 5) % 251) as u8
//! })
//! .unwrap();
//! let payload = Payload::from_text("meet at dawn");
//! let mode = Mode::Adaptive(AdaptiveParams::default());
//!
//! let stego = embed(&carrier, &payload, &mode).unwrap();
//! assert_eq!(extract(&stego, &mode, &carrier).unwrap(), payload);
//!
//! let spec = AttackSpec::Noise { kind: NoiseKind::SaltPepper, intensity: 0.01, mean: 0.0, seed: None };
//! let degraded = attack(&stego, &spec).unwrap();
//! let recovered = extract(&degraded.image, &mode, &carrier).ok();
//!
//! let report = evaluate(
//!     &carrier,
//!     &stego,
//!     &degraded.image,
//!     &payload,
//!     recovered.as_ref(),
//!     Some(&degraded.applied),
//! )
//! .unwrap();
//! assert!(report.psnr > 40.0);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod attack;
pub mod embedding;
pub mod experiment;
pub mod metrics;
pub mod raster;
pub mod telemetry;
pub mod texture;

// Re-export commonly used types at crate root
pub use attack::{attack, AttackError, AttackOutcome, AttackSpec, CropRect, NoiseKind};
pub use embedding::{
    embed, extract, extract_remapped, fit_adaptive, Extraction, Mode, Payload, PayloadKind, SiteOffset,
    StegoError,
};
pub use experiment::{ber_curve, capacity_curve, run_trial, CurvePoint, ExperimentConfig, Trial};
pub use metrics::{ber, evaluate, psnr, ssim, MetricsError, MetricsReport, RecoveryStatus};
pub use raster::{Channels, Image, ImageError};
pub use texture::{AdaptiveParams, CapacityPlanner, GradientMap, Site, SitePlan};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
