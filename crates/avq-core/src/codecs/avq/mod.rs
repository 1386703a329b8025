//! Algebraic Vector Quantiser over the RE8 lattice
//!
//! This module implements multi-rate lattice vector quantisation of 8-dimensional
//! subvectors with Voronoi extension, together with the bitstream packing used by
//! the layered super-wideband coder.
//!
//! # Architecture
//!
//! - `tables`: absolute leaders of the base codebooks Q2, Q3 and Q4
//! - `lattice`: nearest-point search and base-index encode/decode
//! - `voronoi`: Voronoi extension for points outside the base codebooks
//! - `split_vq`: global gain search and per-subvector projection
//! - `mux`: unary + fixed-field packing under a bit budget
//!
//! The lattice and multiplexer never fail. Out-of-range indices are clamped
//! and codewords that do not fit the budget are replaced by the zero codebook.

pub mod lattice;
pub mod mux;
pub mod split_vq;
pub mod tables;
pub mod voronoi;

#[cfg(test)]
mod tests;

use crate::bitstream::{SoftBitReader, SoftBitWriter};

pub use lattice::{decode_base_index, nearest_re8};
pub use mux::{demux, mux, packed_bits, stop_bit_is_implicit, AvqFrame};
pub use split_vq::{split_vq, SplitVqResult};
pub use tables::{init_tables, DIM};
pub use voronoi::{re8_decode, re8_encode, LatticeIndex};

/// An RE8 lattice point
pub type Point = [i32; DIM];

/// Largest number of subvectors in one multiplexed block
pub const MAX_SUBVECTORS: usize = 8;

/// Quantise and pack subvectors into exactly `budget` bits
///
/// Runs the split quantiser and the multiplexer back to back. The returned
/// frame holds the locally decoded lattice points.
pub fn encode_subvectors(
    writer: &mut SoftBitWriter<'_>,
    subvectors: &[[f32; DIM]],
    budget: usize,
) -> AvqFrame {
    let quantised = split_vq(subvectors, budget);
    mux(writer, quantised.points(), quantised.estimates(), budget)
}

/// Unpack `n` subvectors from exactly `budget` bits
pub fn decode_subvectors(reader: &mut SoftBitReader<'_>, n: usize, budget: usize) -> AvqFrame {
    demux(reader, n, budget)
}
