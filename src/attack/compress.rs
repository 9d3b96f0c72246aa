//! Lossy block-transform compression artifacts.
//!
//! Simulates a baseline JPEG round trip without touching any file format:
//! color conversion to YCbCr, 8×8 forward DCT, quantization with the
//! standard tables scaled by quality, dequantization, inverse DCT and
//! conversion back. Partial edge blocks are padded by edge replication.

use super::{AttackOutcome, AttackSpec};
use crate::raster::{Channels, Image};
use std::sync::OnceLock;

/// Lowest accepted quality.
pub const MIN_QUALITY: u8 = 1;
/// Highest accepted quality.
pub const MAX_QUALITY: u8 = 100;

const BLOCK: usize = 8;

/// Standard luminance quantization table (natural order).
const LUMA_QUANT: [u16; 64] = [
    16, 11, 10, 16, 24, 40, 51, 61, //
    12, 12, 14, 19, 26, 58, 60, 55, //
    14, 13, 16, 24, 40, 57, 69, 56, //
    14, 17, 22, 29, 51, 87, 80, 62, //
    18, 22, 37, 56, 68, 109, 103, 77, //
    24, 35, 55, 64, 81, 104, 113, 92, //
    49, 64, 78, 87, 103, 121, 120, 101, //
    72, 92, 95, 98, 112, 100, 103, 99,
];

/// Standard chrominance quantization table (natural order).
const CHROMA_QUANT: [u16; 64] = [
    17, 18, 24, 47, 99, 99, 99, 99, //
    18, 21, 26, 66, 99, 99, 99, 99, //
    24, 26, 56, 99, 99, 99, 99, 99, //
    47, 66, 99, 99, 99, 99, 99, 99, //
    99, 99, 99, 99, 99, 99, 99, 99, //
    99, 99, 99, 99, 99, 99, 99, 99, //
    99, 99, 99, 99, 99, 99, 99, 99, //
    99, 99, 99, 99, 99, 99, 99, 99,
];

/// `COSINE[u][x] = cos((2x + 1) uπ / 16)`
static COSINE: OnceLock<[[f64; BLOCK]; BLOCK]> = OnceLock::new();

fn cosine_table() -> &'static [[f64; BLOCK]; BLOCK] {
    COSINE.get_or_init(|| {
        let mut table = [[0.0f64; BLOCK]; BLOCK];
        for (u, row) in table.iter_mut().enumerate() {
            for (x, value) in row.iter_mut().enumerate() {
                *value = ((2 * x + 1) as f64 * u as f64 * std::f64::consts::PI / 16.0).cos();
            }
        }
        table
    })
}

#[inline]
fn norm(u: usize) -> f64 {
    if u == 0 {
        1.0 / (8.0f64).sqrt()
    } else {
        0.5
    }
}

/// Scales a base table with the IJG quality formula.
fn scaled_table(base: &[u16; 64], quality: u8) -> [f64; 64] {
    let q = quality.clamp(MIN_QUALITY, MAX_QUALITY) as u32;
    let scale = if q < 50 { 5000 / q } else { 200 - 2 * q };
    let mut table = [0.0f64; 64];
    for (out, &b) in table.iter_mut().zip(base.iter()) {
        *out = ((b as u32 * scale + 50) / 100).clamp(1, 255) as f64;
    }
    table
}

/// Forward DCT, quantize, dequantize, inverse DCT for one block in place.
fn requantize_block(block: &mut [f64; 64], table: &[f64; 64]) {
    let cos = cosine_table();

    // Rows.
    let mut temp = [0.0f64; 64];
    for row in 0..BLOCK {
        for u in 0..BLOCK {
            let mut sum = 0.0;
            for x in 0..BLOCK {
                sum += (block[row * BLOCK + x] - 128.0) * cos[u][x];
            }
            temp[row * BLOCK + u] = norm(u) * sum;
        }
    }
    // Columns, then quantize.
    let mut coeffs = [0.0f64; 64];
    for col in 0..BLOCK {
        for v in 0..BLOCK {
            let mut sum = 0.0;
            for y in 0..BLOCK {
                sum += temp[y * BLOCK + col] * cos[v][y];
            }
            let i = v * BLOCK + col;
            coeffs[i] = (norm(v) * sum / table[i]).round() * table[i];
        }
    }

    // Inverse: columns, then rows.
    for col in 0..BLOCK {
        for y in 0..BLOCK {
            let mut sum = 0.0;
            for v in 0..BLOCK {
                sum += norm(v) * coeffs[v * BLOCK + col] * cos[v][y];
            }
            temp[y * BLOCK + col] = sum;
        }
    }
    for row in 0..BLOCK {
        for x in 0..BLOCK {
            let mut sum = 0.0;
            for u in 0..BLOCK {
                sum += norm(u) * temp[row * BLOCK + u] * cos[u][x];
            }
            block[row * BLOCK + x] = sum + 128.0;
        }
    }
}

/// Requantizes a whole plane block by block.
fn requantize_plane(plane: &[f64], width: usize, height: usize, table: &[f64; 64]) -> Vec<f64> {
    let mut out = vec![0.0f64; plane.len()];
    for by in (0..height).step_by(BLOCK) {
        for bx in (0..width).step_by(BLOCK) {
            let mut block = [0.0f64; 64];
            for y in 0..BLOCK {
                let sy = (by + y).min(height - 1);
                for x in 0..BLOCK {
                    let sx = (bx + x).min(width - 1);
                    block[y * BLOCK + x] = plane[sy * width + sx];
                }
            }

            requantize_block(&mut block, table);

            for y in 0..BLOCK.min(height - by) {
                for x in 0..BLOCK.min(width - bx) {
                    out[(by + y) * width + bx + x] = block[y * BLOCK + x];
                }
            }
        }
    }
    out
}

#[inline]
fn saturate(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Applies the compression round trip; `quality` is clamped to 1..=100.
pub fn apply(image: &Image, quality: u8) -> AttackOutcome {
    let applied = quality.clamp(MIN_QUALITY, MAX_QUALITY);
    if applied != quality {
        tracing::warn!(requested = quality, applied, "Compression quality clamped");
    }

    let (w, h) = (image.width() as usize, image.height() as usize);
    let luma_table = scaled_table(&LUMA_QUANT, applied);

    let samples = match image.channels() {
        Channels::Gray => {
            let plane: Vec<f64> = image.samples().iter().map(|&s| s as f64).collect();
            requantize_plane(&plane, w, h, &luma_table)
                .into_iter()
                .map(saturate)
                .collect()
        }
        Channels::Rgb => {
            let chroma_table = scaled_table(&CHROMA_QUANT, applied);
            let n = w * h;
            let (mut y, mut cb, mut cr) = (Vec::with_capacity(n), Vec::with_capacity(n), Vec::with_capacity(n));
            for px in image.samples().chunks_exact(3) {
                let (r, g, b) = (px[0] as f64, px[1] as f64, px[2] as f64);
                y.push(0.299 * r + 0.587 * g + 0.114 * b);
                cb.push(-0.168736 * r - 0.331264 * g + 0.5 * b + 128.0);
                cr.push(0.5 * r - 0.418688 * g - 0.081312 * b + 128.0);
            }

            let y = requantize_plane(&y, w, h, &luma_table);
            let cb = requantize_plane(&cb, w, h, &chroma_table);
            let cr = requantize_plane(&cr, w, h, &chroma_table);

            let mut out = Vec::with_capacity(n * 3);
            for i in 0..n {
                let (yy, cbb, crr) = (y[i], cb[i] - 128.0, cr[i] - 128.0);
                out.push(saturate(yy + 1.402 * crr));
                out.push(saturate(yy - 0.344136 * cbb - 0.714136 * crr));
                out.push(saturate(yy + 1.772 * cbb));
            }
            out
        }
    };

    AttackOutcome {
        image: image.with_samples(samples),
        applied: AttackSpec::Compress { quality: applied },
    }
}
