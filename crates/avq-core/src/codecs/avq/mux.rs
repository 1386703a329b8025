//! Bitstream multiplexing of AVQ indices
//!
//! Each subvector is sent as a unary codebook number (`nq − 1` ones and a
//! stop zero, or a single zero for the zero codebook) followed by its index
//! fields: `4·nq` base-index bits for `nq ≤ 4`, otherwise `4·nq_base`
//! base-index bits and eight `r`-bit Voronoi components. A coded subvector
//! therefore costs `5·nq` bits.
//!
//! When the stop bit would be the last bit of the budget after a complete
//! codeword, i.e. when exactly `5·nq − 1` bits remain, it is not sent. The
//! demultiplexer infers it from the same condition.

use super::lattice::decode_base_index;
use super::tables::DIM;
use super::voronoi::{re8_decode, re8_encode, split_codebook_number, LatticeIndex};
use super::{Point, MAX_SUBVECTORS};
use crate::bitstream::{SoftBitReader, SoftBitWriter};

/// Whether the stop bit of codebook `nq` is implied with `remaining` bits left
#[inline]
pub fn stop_bit_is_implicit(remaining: usize, nq: u8) -> bool {
    nq >= 2 && remaining == 5 * usize::from(nq) - 1
}

/// Exact number of bits needed to pack a codebook assignment
///
/// Returns `None` when the assignment does not fit `budget`.
pub fn packed_bits(nq: &[u8], budget: usize) -> Option<usize> {
    let mut remaining = budget;
    for &q in nq {
        if q == 0 {
            remaining = remaining.saturating_sub(1);
            continue;
        }
        let cost = 5 * usize::from(q);
        if remaining >= cost {
            remaining -= cost;
        } else if stop_bit_is_implicit(remaining, q) {
            remaining = 0;
        } else {
            return None;
        }
    }
    Some(budget - remaining)
}

/// Multiplexed or demultiplexed AVQ subvectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvqFrame {
    /// Codebook number per subvector
    pub nq: [u8; MAX_SUBVECTORS],
    /// Lattice point per subvector (zero when `nq == 0`)
    pub points: [Point; MAX_SUBVECTORS],
    /// Number of subvectors in use
    pub len: usize,
    /// Bits carrying indices; the rest of the budget is padding
    pub bits_used: usize,
}

impl AvqFrame {
    fn empty(len: usize) -> Self {
        Self {
            nq: [0; MAX_SUBVECTORS],
            points: [[0; DIM]; MAX_SUBVECTORS],
            len: len.min(MAX_SUBVECTORS),
            bits_used: 0,
        }
    }

    /// Codebook numbers of the subvectors in use
    pub fn nq(&self) -> &[u8] {
        &self.nq[..self.len]
    }

    /// Lattice points of the subvectors in use
    pub fn points(&self) -> &[Point] {
        &self.points[..self.len]
    }

    /// Number of subvectors coded with a non-zero codebook
    pub fn coded_count(&self) -> usize {
        self.nq().iter().filter(|&&q| q != 0).count()
    }
}

/// Pack lattice points into exactly `budget` bits
///
/// Subvectors are admitted in descending order of their bit estimate (ties
/// to the lower index). A subvector whose codeword would not fit is forced
/// to the zero codebook. The fields are then written in subvector order and
/// the rest of the budget is zero padded; the returned frame holds the
/// admitted points and the number of bits before the padding.
pub fn mux(
    writer: &mut SoftBitWriter<'_>,
    points: &[Point],
    estimates: &[i32],
    budget: usize,
) -> AvqFrame {
    let n = points.len().min(MAX_SUBVECTORS);
    let mut frame = AvqFrame::empty(n);
    let mut indices = [LatticeIndex::ZERO; MAX_SUBVECTORS];

    let mut order = [0usize; MAX_SUBVECTORS];
    for (i, slot) in order.iter_mut().enumerate() {
        *slot = i;
    }
    let estimate = |i: usize| estimates.get(i).copied().unwrap_or(0);
    order[..n].sort_by(|&a, &b| estimate(b).cmp(&estimate(a)).then(a.cmp(&b)));

    for &i in &order[..n] {
        let index = re8_encode(&points[i]);
        if index.nq == 0 {
            continue;
        }

        let mut trial = frame.nq;
        trial[i] = index.nq;
        if packed_bits(&trial[..n], budget).is_some() {
            frame.nq[i] = index.nq;
            indices[i] = index;
            frame.points[i] = points[i];
        } else {
            tracing::debug!(
                "Subvector {} (nq={}) exceeds the {}-bit budget, forced to zero",
                i,
                index.nq,
                budget
            );
        }
    }

    let start = writer.position();
    for i in 0..n {
        let written = writer.position() - start;
        let remaining = budget - written;
        if remaining == 0 {
            break;
        }

        let q = frame.nq[i];
        if q == 0 {
            writer.write_bit(0);
            continue;
        }

        let implicit = stop_bit_is_implicit(remaining, q);
        writer.write_ones(usize::from(q) - 1);
        if !implicit {
            writer.write_bit(0);
        }

        let index = &indices[i];
        let (nq_base, r) = split_codebook_number(q);
        writer.write_bits(index.base_index, 4 * usize::from(nq_base));
        if r > 0 {
            for &k in &index.voronoi {
                writer.write_bits(k as u32, r as usize);
            }
        }

        tracing::trace!(
            "Subvector {}: nq={} index={} implicit_stop={}",
            i,
            q,
            index.base_index,
            implicit
        );
    }

    frame.bits_used = writer.position() - start;
    writer.pad_to(start + budget);
    frame
}

/// Unpack `n` subvectors from exactly `budget` bits
///
/// The reader always advances by `budget`. A codeword whose fields would run
/// past the budget (only possible on a corrupt stream) zeroes the rest of the
/// frame.
pub fn demux(reader: &mut SoftBitReader<'_>, n: usize, budget: usize) -> AvqFrame {
    let mut frame = AvqFrame::empty(n);
    let start = reader.position();

    for i in 0..frame.len {
        let consumed = reader.position() - start;
        let remaining = budget - consumed;
        if remaining == 0 {
            break;
        }

        let mut ones = 0usize;
        let q = loop {
            if ones >= 1 && stop_bit_is_implicit(remaining, (ones + 1) as u8) {
                break ones + 1;
            }
            if reader.position() - start >= budget {
                break 0;
            }
            if reader.read_bit() == 0 {
                break if ones == 0 { 0 } else { ones + 1 };
            }
            ones += 1;
        };

        if q == 0 {
            continue;
        }

        let (nq_base, r) = split_codebook_number(q.min(usize::from(u8::MAX)) as u8);
        let field_bits = 4 * usize::from(nq_base) + if r > 0 { DIM * r as usize } else { 0 };
        let left = budget - (reader.position() - start);
        if field_bits > left {
            tracing::warn!(
                "Corrupt AVQ codeword at subvector {}: nq={} needs {} bits, {} left",
                i,
                q,
                field_bits,
                left
            );
            reader.seek(start + budget);
            break;
        }

        let base_index = reader.read_bits(4 * usize::from(nq_base));
        let mut voronoi = [0i32; DIM];
        if r > 0 {
            for k in &mut voronoi {
                *k = reader.read_bits(r as usize) as i32;
            }
        }

        let index = LatticeIndex {
            nq: q as u8,
            base_index,
            voronoi,
        };
        frame.nq[i] = index.nq;
        frame.points[i] = if r == 0 {
            decode_base_index(nq_base, base_index)
        } else {
            re8_decode(&index)
        };
    }

    frame.bits_used = reader.position() - start;
    reader.seek(start + budget);
    frame
}
