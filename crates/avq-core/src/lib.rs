//! # AVQ-Core: Lattice Vector Quantisation for Super-Wideband Coding
//!
//! This library implements the algebraic vector quantiser (AVQ) over the RE8
//! lattice with Voronoi extension, and the layered super-wideband coder that
//! refines a 64-coefficient transform block in two embedded layers.
//!
//! ## Features
//!
//! - **RE8 lattice indexing**: absolute leaders, base codebooks Q2/Q3/Q4 and
//!   Voronoi extension to any rate
//! - **Split VQ**: one global gain searched by bisection against a bit budget
//! - **Bit-exact packing**: unary codebook numbers and fixed index fields in
//!   G.192 soft bits, padded to the layer budget
//! - **Layered coding**: perceptual band ranking, embedded gain refinement,
//!   sign and gradient refinement in leftover bits, zero-band filling
//!
//! ## Usage
//!
//! ```rust
//! use avq_core::{BweMode, SideInfo, SwbAvqConfig, SwbAvqDecoder, SwbAvqEncoder};
//!
//! let config = SwbAvqConfig::new();
//! let mut encoder = SwbAvqEncoder::new(config)?;
//! let mut decoder = SwbAvqDecoder::new(config)?;
//!
//! let side = SideInfo::new([2.0; 8], BweMode::Normal, 4);
//! let coefs: Vec<f32> = (0..64).map(|i| ((i as f32) * 0.3).sin() * 8.0).collect();
//!
//! let mut bits = vec![0u16; config.max_frame_bits()];
//! let report = encoder.encode_frame(&coefs, &side, &mut bits)?;
//!
//! let mut output = [0.0f32; 64];
//! let band_types = decoder.decode_frame(&bits[..report.bits_written], &side, &mut output)?;
//! assert_eq!(band_types, report.band_types);
//! # Ok::<(), avq_core::AvqError>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bitstream;
pub mod codecs;
pub mod error;
pub mod types;
pub mod utils;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use codecs::swb::{SwbAvqDecoder, SwbAvqEncoder};
pub use error::{AvqError, ErrorCategory, Result};
pub use types::{
    BandType, BweMode, CodingPath, FrameReport, LayerProfile, SideInfo, SwbAvqConfig,
};

/// Version information for the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Layer profiles supported out of the box
pub const SUPPORTED_PROFILES: &[&str] = &["layer1-36", "layer2-40", "low-rate-15"];

/// Initialize the library
///
/// Installs a `tracing` subscriber if none is set and builds the lattice
/// leader tables. It's safe to call multiple times.
///
/// # Errors
///
/// Currently always succeeds; the signature leaves room for fallible setup.
pub fn init() -> Result<()> {
    // Initialize logging if not already done
    let _ = tracing_subscriber::fmt::try_init();

    codecs::avq::init_tables();

    tracing::info!("AVQ-Core v{} initialized", VERSION);
    tracing::info!("Supported profiles: {:?}", SUPPORTED_PROFILES);

    Ok(())
}

/// Get library information
pub fn info() -> LibraryInfo {
    LibraryInfo {
        version: VERSION,
        supported_profiles: SUPPORTED_PROFILES.to_vec(),
        max_frame_bits: SwbAvqConfig::new().max_frame_bits(),
    }
}

/// Library information structure
#[derive(Debug, Clone)]
pub struct LibraryInfo {
    /// Library version
    pub version: &'static str,
    /// Names of the built-in layer profiles
    pub supported_profiles: Vec<&'static str>,
    /// Frame size in bits of the default two-layer configuration
    pub max_frame_bits: usize,
}
