//! Prometheus telemetry for experiment runs.
//!
//! Sweep results are summarized into a snapshot and loaded into a
//! registry, which renders the Prometheus text format. The CLI writes it
//! to a file for a textfile collector to pick up.
//!
//! # Metrics Exposed
//!
//! ## Trials
//! - `texture_stego_trials_total` - Total pipeline trials run
//! - `texture_stego_trials_by_status_total{status}` - Trials per recovery status
//! - `texture_stego_erased_bits_total` - Payload bits lost to cropping
//!
//! ## Robustness
//! - `texture_stego_last_ber` - BER of the most recent trial
//! - `texture_stego_mean_ber` - Mean BER over the last sweep
//!
//! ## Imperceptibility
//! - `texture_stego_embed_psnr_db` - Carrier vs stego PSNR
//! - `texture_stego_embed_ssim` - Carrier vs stego SSIM
//!
//! ## Capacity
//! - `texture_stego_payload_bits` - Embedded payload size
//! - `texture_stego_capacity_bits` - Carrier payload capacity
//!
//! # Example
//!
//! ```
//! use texture_stego::telemetry::{TelemetryRegistry, TelemetrySnapshot};
//!
//! let registry = TelemetryRegistry::new().unwrap();
//! registry.update(&TelemetrySnapshot {
//!     trials: 3,
//!     recovered: 3,
//!     mean_ber: Some(0.0),
//!     ..Default::default()
//! });
//!
//! assert!(registry.encode().unwrap().contains("texture_stego_trials_total 3"));
//! ```

mod collector;

pub use collector::{TelemetryError, TelemetryRegistry, TelemetrySnapshot};
