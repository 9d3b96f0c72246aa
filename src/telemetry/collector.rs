//! Sweep telemetry collection and registry.

use crate::experiment::SweepRun;
use crate::metrics::RecoveryStatus;
use prometheus::{Encoder, Gauge, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during telemetry operations.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Metric registration or encoding failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A summary of experiment state for a registry update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    /// Total trials run.
    pub trials: u64,
    /// Trials that recovered the payload bit-exact.
    pub recovered: u64,
    /// Trials that recovered fewer bits than embedded.
    pub truncated: u64,
    /// Trials with bit errors.
    pub garbled: u64,
    /// Trials whose extraction failed.
    pub lost: u64,
    /// BER of the most recent trial.
    pub last_ber: Option<f64>,
    /// Mean BER over all trials in the sweep.
    pub mean_ber: Option<f64>,
    /// Carrier vs stego PSNR; `None` when infinite.
    pub embed_psnr: Option<f64>,
    /// Carrier vs stego SSIM.
    pub embed_ssim: Option<f64>,
    /// Payload bits lost to crops across all trials.
    pub erased_bits: u64,
    /// Embedded payload size in bits.
    pub payload_bits: usize,
    /// Payload capacity of the carrier in bits.
    pub capacity_bits: usize,
}

impl TelemetrySnapshot {
    /// Summarizes a finished sweep.
    pub fn from_sweep(run: &SweepRun, payload_bits: usize, capacity_bits: usize) -> Self {
        let mut snapshot = Self {
            payload_bits,
            capacity_bits,
            ..Default::default()
        };

        let mut ber_sum = 0.0;
        for point in &run.points {
            let report = &point.outcome.report;
            snapshot.trials += 1;
            match report.status {
                RecoveryStatus::Recovered => snapshot.recovered += 1,
                RecoveryStatus::Truncated => snapshot.truncated += 1,
                RecoveryStatus::Garbled => snapshot.garbled += 1,
                RecoveryStatus::Lost => snapshot.lost += 1,
            }
            ber_sum += report.ber;
            snapshot.erased_bits += point.outcome.erased_bits as u64;
            snapshot.last_ber = Some(report.ber);
            snapshot.embed_psnr = Some(report.psnr).filter(|p| p.is_finite());
            snapshot.embed_ssim = Some(report.ssim);
        }
        if snapshot.trials > 0 {
            snapshot.mean_ber = Some(ber_sum / snapshot.trials as f64);
        }
        snapshot
    }
}

/// Prometheus registry for experiment telemetry.
pub struct TelemetryRegistry {
    registry: Registry,

    // Trial counters
    trials_total: IntCounter,
    trials_by_status: IntCounterVec,
    erased_bits_total: IntCounter,

    // Robustness
    last_ber: Gauge,
    mean_ber: Gauge,

    // Imperceptibility
    embed_psnr: Gauge,
    embed_ssim: Gauge,

    // Capacity
    payload_bits: IntGauge,
    capacity_bits: IntGauge,
}

impl TelemetryRegistry {
    /// Creates a new registry with all experiment metrics registered.
    pub fn new() -> Result<Self, TelemetryError> {
        let registry = Registry::new();

        let trials_total = IntCounter::new("texture_stego_trials_total", "Total pipeline trials run")?;
        let trials_by_status = IntCounterVec::new(
            Opts::new(
                "texture_stego_trials_by_status_total",
                "Pipeline trials by payload recovery status",
            ),
            &["status"],
        )?;
        let erased_bits_total = IntCounter::new(
            "texture_stego_erased_bits_total",
            "Payload bits lost to cropping during remapped extraction",
        )?;

        let last_ber = Gauge::new("texture_stego_last_ber", "Bit error rate of the most recent trial")?;
        let mean_ber = Gauge::new("texture_stego_mean_ber", "Mean bit error rate over the last sweep")?;

        let embed_psnr = Gauge::new("texture_stego_embed_psnr_db", "Carrier vs stego PSNR in dB")?;
        let embed_ssim = Gauge::new("texture_stego_embed_ssim", "Carrier vs stego SSIM")?;

        let payload_bits = IntGauge::new("texture_stego_payload_bits", "Embedded payload size in bits")?;
        let capacity_bits = IntGauge::new(
            "texture_stego_capacity_bits",
            "Payload capacity of the carrier in bits",
        )?;

        registry.register(Box::new(trials_total.clone()))?;
        registry.register(Box::new(trials_by_status.clone()))?;
        registry.register(Box::new(erased_bits_total.clone()))?;
        registry.register(Box::new(last_ber.clone()))?;
        registry.register(Box::new(mean_ber.clone()))?;
        registry.register(Box::new(embed_psnr.clone()))?;
        registry.register(Box::new(embed_ssim.clone()))?;
        registry.register(Box::new(payload_bits.clone()))?;
        registry.register(Box::new(capacity_bits.clone()))?;

        Ok(Self {
            registry,
            trials_total,
            trials_by_status,
            erased_bits_total,
            last_ber,
            mean_ber,
            embed_psnr,
            embed_ssim,
            payload_bits,
            capacity_bits,
        })
    }

    /// Updates all metrics from a snapshot.
    ///
    /// Counters only move forward: they are raised to the snapshot value
    /// when it is larger.
    pub fn update(&self, snapshot: &TelemetrySnapshot) {
        raise(&self.trials_total, snapshot.trials);
        for (status, count) in [
            (RecoveryStatus::Recovered, snapshot.recovered),
            (RecoveryStatus::Truncated, snapshot.truncated),
            (RecoveryStatus::Garbled, snapshot.garbled),
            (RecoveryStatus::Lost, snapshot.lost),
        ] {
            let label = status.to_string();
            raise(&self.trials_by_status.with_label_values(&[label.as_str()]), count);
        }
        raise(&self.erased_bits_total, snapshot.erased_bits);

        if let Some(ber) = snapshot.last_ber {
            self.last_ber.set(ber);
        }
        if let Some(ber) = snapshot.mean_ber {
            self.mean_ber.set(ber);
        }
        if let Some(psnr) = snapshot.embed_psnr {
            self.embed_psnr.set(psnr);
        }
        if let Some(ssim) = snapshot.embed_ssim {
            self.embed_ssim.set(ssim);
        }

        self.payload_bits.set(snapshot.payload_bits as i64);
        self.capacity_bits.set(snapshot.capacity_bits as i64);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, TelemetryError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn raise(counter: &IntCounter, target: u64) {
    let current = counter.get();
    if target > current {
        counter.inc_by(target - current);
    }
}
