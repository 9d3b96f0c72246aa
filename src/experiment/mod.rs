//! Batch experiments.
//!
//! A trial runs embed, attack, extract and evaluate once. Sweeps run one
//! trial per attack parameter in parallel and collect BER curves; capacity
//! curves report how much payload each texture threshold allows.

mod config;
mod sweep;
mod trial;

pub use config::{
    AttackKind, ConfigError, CropExtraction, EmbedConfig, ExperimentConfig, ModeKind, OutputConfig,
    SweepConfig,
};
pub use sweep::{ber_curve, capacity_curve, run_sweep, to_csv, CapacityPoint, CurvePoint, SweepRun};
pub use trial::{run_trial, Trial, TrialOutcome};

use crate::attack::AttackError;
use crate::embedding::StegoError;
use crate::metrics::MetricsError;
use thiserror::Error;

/// Errors that abort an experiment.
#[derive(Debug, Error)]
pub enum ExperimentError {
    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Embedding failed.
    #[error("embedding error: {0}")]
    Stego(#[from] StegoError),

    /// An attack was rejected.
    #[error("attack error: {0}")]
    Attack(#[from] AttackError),

    /// Metrics could not be computed.
    #[error("metrics error: {0}")]
    Metrics(#[from] MetricsError),
}
