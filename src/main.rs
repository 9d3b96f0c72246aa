//! Texture Stego CLI
//!
//! Command-line interface for embedding, extracting, attacking and
//! evaluating payloads in image files, and for running parameter sweeps.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};
use texture_stego::{
    attack,
    embedding::{bitplane::bit_plane, extract_remapped, fit_adaptive},
    evaluate,
    experiment::{capacity_curve, run_sweep, to_csv, ConfigError, ExperimentConfig, ExperimentError},
    extract,
    telemetry::{TelemetryError, TelemetryRegistry, TelemetrySnapshot},
    AdaptiveParams, AttackError, AttackSpec, Channels, CropRect, Image, MetricsError, Mode, NoiseKind,
    Payload, SiteOffset, StegoError,
};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "texture-stego", version, about = "Texture-adaptive LSB steganography toolkit")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Hide a message or file in a carrier image.
    Embed {
        #[arg(long)]
        carrier: PathBuf,
        #[command(flatten)]
        payload: PayloadArgs,
        /// Output path, always written as PNG.
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        mode: ModeArgs,
        /// Relax the threshold in steps of this size until the payload fits.
        #[arg(long)]
        fit_step: Option<f32>,
    },
    /// Recover a payload from a stego image.
    Extract {
        #[arg(long)]
        image: PathBuf,
        /// Carrier used to regenerate sites; defaults to the image itself.
        #[arg(long)]
        carrier: Option<PathBuf>,
        #[command(flatten)]
        mode: ModeArgs,
        /// Write the payload here instead of printing it.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Apply an attack to an image.
    Attack {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[command(subcommand)]
        attack: AttackCommand,
    },
    /// Print a JSON metrics report for a carrier, stego and degraded image.
    Evaluate {
        #[arg(long)]
        carrier: PathBuf,
        #[arg(long)]
        stego: PathBuf,
        #[arg(long)]
        degraded: PathBuf,
        #[command(flatten)]
        payload: PayloadArgs,
        #[command(flatten)]
        mode: ModeArgs,
        /// Left column of the crop that produced the degraded image.
        #[arg(long)]
        crop_x: Option<u32>,
        /// Top row of the crop that produced the degraded image.
        #[arg(long)]
        crop_y: Option<u32>,
    },
    /// Run a BER sweep described by a TOML file.
    Sweep {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        carrier: PathBuf,
        #[command(flatten)]
        payload: PayloadArgs,
        /// Write Prometheus telemetry to this file.
        #[arg(long)]
        telemetry: Option<PathBuf>,
        /// Write the curve as CSV to this file.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Render one bit plane of an image as black and white.
    BitPlane {
        #[arg(long)]
        image: PathBuf,
        /// Bit position, 0 for the least-significant plane.
        #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=7))]
        position: u8,
        /// Output path, always written as PNG.
        #[arg(long)]
        out: PathBuf,
    },
    /// Print payload capacity for a range of thresholds.
    Capacity {
        #[arg(long)]
        carrier: PathBuf,
        #[arg(long, default_value_t = 2)]
        textured_bits: u8,
        #[arg(long, default_value_t = 0)]
        flat_bits: u8,
        /// Thresholds to evaluate.
        #[arg(long, value_delimiter = ',', default_values_t = vec![0.0, 10.0, 20.0, 30.0, 50.0, 80.0, 120.0])]
        thresholds: Vec<f32>,
    },
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct PayloadArgs {
    /// Text message.
    #[arg(long)]
    message: Option<String>,
    /// File whose bytes are the payload.
    #[arg(long)]
    file: Option<PathBuf>,
}

impl PayloadArgs {
    fn load(&self) -> Result<Payload, CliError> {
        match (&self.message, &self.file) {
            (Some(message), _) => Ok(Payload::from_text(message)),
            (None, Some(path)) => Ok(Payload::from_bytes(std::fs::read(path)?)),
            (None, None) => Err(CliError::Usage("either --message or --file is required".into())),
        }
    }
}

#[derive(Debug, Args)]
struct ModeArgs {
    /// Use texture-adaptive site selection.
    #[arg(long)]
    adaptive: bool,
    /// Texture threshold on the 0-255 gradient scale.
    #[arg(long, default_value_t = 30.0)]
    threshold: f32,
    /// Bits per textured sample.
    #[arg(long, default_value_t = 2)]
    textured_bits: u8,
    /// Bits per flat sample.
    #[arg(long, default_value_t = 0)]
    flat_bits: u8,
}

impl ModeArgs {
    fn params(&self) -> AdaptiveParams {
        AdaptiveParams {
            threshold: self.threshold,
            textured_bits: self.textured_bits,
            flat_bits: self.flat_bits,
        }
    }

    fn mode(&self) -> Mode {
        if self.adaptive {
            Mode::Adaptive(self.params())
        } else {
            Mode::Plain
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum NoiseArg {
    Gaussian,
    SaltPepper,
}

#[derive(Debug, Subcommand)]
enum AttackCommand {
    /// Lossy block-DCT compression.
    Compress {
        #[arg(long, default_value_t = 75)]
        quality: u8,
    },
    /// Gaussian blur.
    Blur {
        #[arg(long, default_value_t = 3)]
        kernel_size: u32,
        /// Non-positive values derive sigma from the kernel size.
        #[arg(long, default_value_t = 1.0)]
        sigma: f64,
    },
    /// Centered crop by ratio, or an explicit rectangle.
    Crop {
        #[arg(long, default_value_t = 0.9)]
        ratio: f64,
        #[arg(long, requires = "height")]
        width: Option<u32>,
        #[arg(long, requires = "width")]
        height: Option<u32>,
        #[arg(long, default_value_t = 0)]
        x: u32,
        #[arg(long, default_value_t = 0)]
        y: u32,
        /// Scale the kept region back to the original size.
        #[arg(long)]
        restore_size: bool,
    },
    /// Additive noise.
    Noise {
        #[arg(long, value_enum, default_value_t = NoiseArg::Gaussian)]
        kind: NoiseArg,
        /// Standard deviation (gaussian) or corruption probability (salt-pepper).
        #[arg(long, default_value_t = 10.0)]
        intensity: f64,
        /// Offset added to gaussian draws.
        #[arg(long, default_value_t = 0.0)]
        mean: f64,
        #[arg(long)]
        seed: Option<u64>,
    },
}

impl AttackCommand {
    fn spec(&self, image: &Image) -> Result<AttackSpec, CliError> {
        Ok(match *self {
            AttackCommand::Compress { quality } => AttackSpec::Compress { quality },
            AttackCommand::Blur { kernel_size, sigma } => AttackSpec::Blur { kernel_size, sigma },
            AttackCommand::Crop {
                ratio,
                width,
                height,
                x,
                y,
                restore_size,
            } => {
                let rect = match (width, height) {
                    (Some(width), Some(height)) => CropRect::new(x, y, width, height),
                    _ => CropRect::centered(image.width(), image.height(), ratio)?,
                };
                AttackSpec::Crop { rect, restore_size }
            }
            AttackCommand::Noise {
                kind,
                intensity,
                mean,
                seed,
            } => AttackSpec::Noise {
                kind: match kind {
                    NoiseArg::Gaussian => NoiseKind::Gaussian,
                    NoiseArg::SaltPepper => NoiseKind::SaltPepper,
                },
                intensity,
                mean,
                seed,
            },
        })
    }
}

/// Errors surfaced by the CLI.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image file error: {0}")]
    Codec(#[from] image::ImageError),
    #[error("invalid image: {0}")]
    Raster(#[from] texture_stego::ImageError),
    #[error(transparent)]
    Stego(#[from] StegoError),
    #[error(transparent)]
    Attack(#[from] AttackError),
    #[error(transparent)]
    Metrics(#[from] MetricsError),
    #[error(transparent)]
    Experiment(#[from] ExperimentError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Usage(String),
}

/// Decodes an image file; alpha is dropped and 16-bit samples are reduced to 8 bits.
fn load_image(path: &Path) -> Result<Image, CliError> {
    let decoded = image::open(path)?;
    let image = if decoded.color().has_color() {
        let rgb = decoded.to_rgb8();
        let (width, height) = rgb.dimensions();
        Image::new(rgb.into_raw(), width, height, Channels::Rgb)?
    } else {
        let gray = decoded.to_luma8();
        let (width, height) = gray.dimensions();
        Image::new(gray.into_raw(), width, height, Channels::Gray)?
    };
    info!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        channels = image.channels().count(),
        "Loaded image"
    );
    Ok(image)
}

/// Writes an image as PNG.
fn save_png(image: &Image, path: &Path) -> Result<(), CliError> {
    let (width, height) = (image.width(), image.height());
    let samples = image.samples().to_vec();
    let mismatch = || CliError::Usage(format!("buffer does not match {width}x{height}"));
    match image.channels() {
        Channels::Gray => image::GrayImage::from_raw(width, height, samples)
            .ok_or_else(mismatch)?
            .save_with_format(path, image::ImageFormat::Png)?,
        Channels::Rgb => image::RgbImage::from_raw(width, height, samples)
            .ok_or_else(mismatch)?
            .save_with_format(path, image::ImageFormat::Png)?,
    }
    info!(path = %path.display(), "Wrote image");
    Ok(())
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Embed {
            carrier,
            payload,
            out,
            mode,
            fit_step,
        } => {
            let carrier = load_image(&carrier)?;
            let payload = payload.load()?;
            let mode = match (mode.mode(), fit_step) {
                (Mode::Adaptive(params), Some(step)) => fit_adaptive(&carrier, &payload, &params, step)?,
                (mode, _) => mode,
            };
            if let Mode::Adaptive(params) = mode {
                info!(threshold = params.threshold, "Extract with this threshold");
            }

            let stego = texture_stego::embed(&carrier, &payload, &mode)?;
            info!(
                payload_bits = payload.bit_len(),
                capacity_bits = mode.payload_capacity(&carrier)?,
                psnr = texture_stego::psnr(&carrier, &stego)?,
                "Embedded payload"
            );
            save_png(&stego, &out)
        }

        Command::Extract {
            image,
            carrier,
            mode,
            out,
        } => {
            let image = load_image(&image)?;
            let carrier = match carrier {
                Some(path) => load_image(&path)?,
                None => image.clone(),
            };
            let payload = extract(&image, &mode.mode(), &carrier)?;
            info!(payload_bits = payload.bit_len(), "Extracted payload");

            match out {
                Some(path) => std::fs::write(path, payload.as_bytes())?,
                None => match std::str::from_utf8(payload.as_bytes()) {
                    Ok(text) => println!("{text}"),
                    Err(_) => std::io::stdout().write_all(payload.as_bytes())?,
                },
            }
            Ok(())
        }

        Command::Attack { image, out, attack: command } => {
            let image = load_image(&image)?;
            let spec = command.spec(&image)?;
            let outcome = attack(&image, &spec)?;
            info!(applied = %outcome.applied, "Attack applied");
            println!("{}", serde_json::to_string(&outcome.applied)?);
            save_png(&outcome.image, &out)
        }

        Command::Evaluate {
            carrier,
            stego,
            degraded,
            payload,
            mode,
            crop_x,
            crop_y,
        } => {
            let carrier = load_image(&carrier)?;
            let stego = load_image(&stego)?;
            let degraded = load_image(&degraded)?;
            let payload = payload.load()?;
            let mode = mode.mode();

            let recovered = if crop_x.is_some() || crop_y.is_some() {
                let offset = SiteOffset {
                    rows: crop_y.unwrap_or(0),
                    cols: crop_x.unwrap_or(0),
                };
                extract_remapped(&degraded, &mode, &carrier, offset).map(|e| e.payload)
            } else {
                extract(&degraded, &mode, &carrier)
            };
            if let Err(e) = &recovered {
                info!(error = %e, "Extraction failed");
            }

            let report = evaluate(&carrier, &stego, &degraded, &payload, recovered.as_ref().ok(), None)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }

        Command::Sweep {
            config,
            carrier,
            payload,
            telemetry,
            csv,
        } => {
            let config = ExperimentConfig::from_file(&config)?;
            let carrier = load_image(&carrier)?;
            let payload = payload.load()?;

            info!(attack = ?config.sweep.attack, points = config.sweep.values.len(), "Running sweep");
            let run = run_sweep(&carrier, &payload, &config)?;

            if config.output.report_json {
                println!("{}", serde_json::to_string_pretty(&run)?);
            } else {
                for point in &run.points {
                    println!(
                        "{:>10} ber={:.4} status={}",
                        point.parameter, point.outcome.report.ber, point.outcome.report.status
                    );
                }
            }

            if let Some(path) = csv {
                std::fs::write(&path, to_csv(&run.points))?;
                info!(path = %path.display(), "Wrote CSV");
            }

            if let Some(path) = telemetry {
                let registry = TelemetryRegistry::new()?;
                let capacity = run.mode.payload_capacity(&carrier)?;
                registry.update(&TelemetrySnapshot::from_sweep(&run, payload.bit_len(), capacity));
                std::fs::write(&path, registry.encode()?)?;
                info!(path = %path.display(), "Wrote telemetry");
            }
            Ok(())
        }

        Command::BitPlane { image, position, out } => {
            let image = load_image(&image)?;
            let plane = bit_plane(&image, position)
                .ok_or_else(|| CliError::Usage(format!("bit position {position} is outside 0..=7")))?;
            info!(position, "Rendered bit plane");
            save_png(&plane, &out)
        }

        Command::Capacity {
            carrier,
            textured_bits,
            flat_bits,
            thresholds,
        } => {
            let carrier = load_image(&carrier)?;
            let params = AdaptiveParams {
                threshold: 0.0,
                textured_bits,
                flat_bits,
            };
            for point in capacity_curve(&carrier, &params, &thresholds)? {
                println!("{:>8.1} {:>10} bits", point.threshold, point.payload_bits);
            }
            Ok(())
        }
    }
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Texture Stego v{}", texture_stego::VERSION);

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
