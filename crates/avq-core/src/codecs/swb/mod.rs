//! Layered super-wideband coder
//!
//! Codes a 64-coefficient block as 8 perceptually ranked subbands in two
//! refinement layers on top of the AVQ core.
//!
//! # Frame layout
//!
//! ```text
//! Layer 1: [path flag (Mode A only)] [fine gain:3] [fill inhibit:1] [AVQ] [leftover]
//! Layer 2: [fill on:1 cand:2 gain:2 (fills enabled only)] [AVQ] [leftover]
//! ```
//!
//! The layer 1 fine gain scales both layers. Leftover bits of each layer
//! carry residual-path sign bits, then gradient refinement codes for the
//! coded bands, then fill fields for further zero bands.
//!
//! # Architecture
//!
//! - `tables`: field sizes, gain tables, gradient curves and heuristics constants
//! - `state`: persistent encoder and decoder memory
//! - `bands`: ranking, normalisation and band-level decisions
//! - `postproc`: sign recovery, fill blending and smoothing
//! - `encoder` / `decoder`: the frame orchestration

pub mod bands;
pub mod decoder;
pub mod encoder;
pub mod postproc;
pub mod state;
pub mod tables;

#[cfg(test)]
mod tests;

pub use decoder::SwbAvqDecoder;
pub use encoder::SwbAvqEncoder;
pub use state::{DecoderState, EncoderState};
