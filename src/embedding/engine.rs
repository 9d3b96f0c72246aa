//! Writes and reads bitstreams over an ordered site list.
//!
//! Each site receives consecutive stream bits MSB-first. When the stream
//! ends inside a site, the remaining bits occupy the top of that site's
//! field and its lower bits keep the carrier's values.

use super::bitplane::{read_bits, write_bits};
use super::error::StegoError;
use super::payload::{Payload, HEADER_BITS};
use crate::raster::Image;
use crate::texture::{Site, SitePlan};
use std::collections::VecDeque;

/// Translation applied to site coordinates when reading a cropped image.
///
/// A site at `(row, col)` in the carrier is looked up at
/// `(row - rows, col - cols)` in the cropped image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SiteOffset {
    /// Rows removed above the kept region.
    pub rows: u32,
    /// Columns removed left of the kept region.
    pub cols: u32,
}

/// Result of a remapped extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Recovered payload, with erased bits read as 0.
    pub payload: Payload,
    /// Number of payload bits whose sites were cropped away.
    pub erased_bits: usize,
}

/// Stateless encoder/decoder over a [`SitePlan`].
pub struct EmbeddingEngine;

impl EmbeddingEngine {
    /// Embeds `payload`, framed with its length header, into a copy of `carrier`.
    pub fn encode(carrier: &Image, payload: &Payload, plan: &SitePlan) -> Result<Image, StegoError> {
        if payload.bit_len() > u32::MAX as usize {
            return Err(StegoError::PayloadTooLarge {
                bits: payload.bit_len(),
            });
        }
        let framed: Vec<bool> = payload.framed_bits().collect();
        let stego = Self::write_stream(carrier, &framed, plan)?;

        tracing::debug!(
            payload_bits = payload.bit_len(),
            capacity = plan.capacity(),
            "Encoded payload"
        );
        Ok(stego)
    }

    /// Writes a raw bitstream (no header) into a copy of `carrier`.
    pub fn write_stream(carrier: &Image, bits: &[bool], plan: &SitePlan) -> Result<Image, StegoError> {
        if bits.len() > plan.capacity() {
            return Err(StegoError::CapacityExceeded {
                required: bits.len(),
                available: plan.capacity(),
            });
        }

        let mut samples = carrier.samples().to_vec();
        let mut cursor = 0;
        for site in plan.sites() {
            if cursor >= bits.len() {
                break;
            }
            if !carrier.contains(site.row, site.col, site.channel as usize) {
                return Err(out_of_bounds(site));
            }

            let take = (site.depth as usize).min(bits.len() - cursor);
            let value = bits[cursor..cursor + take]
                .iter()
                .fold(0u8, |acc, &b| (acc << 1) | b as u8);
            let shift = site.depth as usize - take;

            let idx = carrier.index(site.row, site.col, site.channel as usize);
            let kept = read_bits(samples[idx], site.depth) & ((1u8 << shift) - 1);
            samples[idx] = write_bits(samples[idx], site.depth, (value << shift) | kept);
            cursor += take;
        }

        Ok(carrier.with_samples(samples))
    }

    /// Reads a raw bitstream of `bit_count` bits.
    pub fn read_stream(image: &Image, plan: &SitePlan, bit_count: usize) -> Result<Vec<bool>, StegoError> {
        if bit_count > plan.capacity() {
            return Err(StegoError::CapacityExceeded {
                required: bit_count,
                available: plan.capacity(),
            });
        }
        let mut reader = SiteReader::new(image, plan, None);
        Ok(reader.take(bit_count, false)?.into_iter().map(|(b, _)| b).collect())
    }

    /// Extracts a framed payload. Every consulted site must exist in `image`.
    pub fn decode(image: &Image, plan: &SitePlan) -> Result<Payload, StegoError> {
        Self::decode_with(image, plan, None).map(|extraction| extraction.payload)
    }

    /// Extracts a framed payload from a cropped image.
    ///
    /// Header sites must survive the crop. Body sites that fall outside
    /// the cropped image are erasures and read as 0.
    pub fn decode_remapped(
        image: &Image,
        plan: &SitePlan,
        offset: SiteOffset,
    ) -> Result<Extraction, StegoError> {
        let extraction = Self::decode_with(image, plan, Some(offset))?;
        if extraction.erased_bits > 0 {
            tracing::warn!(
                erased = extraction.erased_bits,
                payload_bits = extraction.payload.bit_len(),
                "Payload bits lost to cropping"
            );
        }
        Ok(extraction)
    }

    fn decode_with(
        image: &Image,
        plan: &SitePlan,
        offset: Option<SiteOffset>,
    ) -> Result<Extraction, StegoError> {
        if plan.capacity() < HEADER_BITS {
            return Err(StegoError::CapacityExceeded {
                required: HEADER_BITS,
                available: plan.capacity(),
            });
        }

        let mut reader = SiteReader::new(image, plan, offset);
        let declared = reader
            .take(HEADER_BITS, false)?
            .into_iter()
            .fold(0usize, |acc, (b, _)| (acc << 1) | b as usize);

        let available = plan.capacity() - HEADER_BITS;
        if declared > available {
            return Err(StegoError::HeaderCorrupt { declared, available });
        }

        let body = reader.take(declared, offset.is_some())?;
        let erased_bits = body.iter().filter(|(_, erased)| *erased).count();
        let payload = Payload::from_bits(body.into_iter().map(|(b, _)| b));

        tracing::trace!(declared, erased_bits, "Decoded payload");
        Ok(Extraction {
            payload,
            erased_bits,
        })
    }
}

fn out_of_bounds(site: &Site) -> StegoError {
    StegoError::SiteOutOfBounds {
        row: site.row,
        col: site.col,
        channel: site.channel,
    }
}

/// Sequential bit reader over a site list.
struct SiteReader<'a> {
    image: &'a Image,
    sites: std::slice::Iter<'a, Site>,
    offset: Option<SiteOffset>,
    /// Bits of a partially consumed site, with their erasure flag.
    pending: VecDeque<(bool, bool)>,
}

impl<'a> SiteReader<'a> {
    fn new(image: &'a Image, plan: &'a SitePlan, offset: Option<SiteOffset>) -> Self {
        Self {
            image,
            sites: plan.sites().iter(),
            offset,
            pending: VecDeque::new(),
        }
    }

    /// Reads the next `count` bits, each paired with its erasure flag.
    ///
    /// Missing sites are erasures when `allow_erasure` is set and
    /// `SiteOutOfBounds` otherwise. Callers check capacity beforehand.
    fn take(&mut self, count: usize, allow_erasure: bool) -> Result<Vec<(bool, bool)>, StegoError> {
        let mut out = Vec::with_capacity(count);
        while out.len() < count {
            if let Some(bit) = self.pending.pop_front() {
                out.push(bit);
                continue;
            }
            let Some(site) = self.sites.next() else {
                break;
            };
            match self.lookup(site) {
                Some(sample) => {
                    let field = read_bits(sample, site.depth);
                    for i in (0..site.depth).rev() {
                        self.pending.push_back(((field >> i) & 1 == 1, false));
                    }
                }
                None if allow_erasure => {
                    for _ in 0..site.depth {
                        self.pending.push_back((false, true));
                    }
                }
                None => return Err(out_of_bounds(site)),
            }
        }
        Ok(out)
    }

    fn lookup(&self, site: &Site) -> Option<u8> {
        let (row, col) = match self.offset {
            None => (site.row, site.col),
            Some(offset) => (
                site.row.checked_sub(offset.rows)?,
                site.col.checked_sub(offset.cols)?,
            ),
        };
        self.image.get(row, col, site.channel as usize)
    }
}
