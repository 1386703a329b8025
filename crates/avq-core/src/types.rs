//! Core types for the AVQ coding core
//!
//! This module defines the configuration, the per-frame side information
//! supplied by the surrounding codec, and the band classification shared by
//! the encoder and decoder.

use crate::codecs::swb::tables::{LAYER1_HEADER_BITS, LAYER2_HEADER_BITS, MAX_LAYER_FILLS};
use crate::error::{AvqError, Result};
use std::fmt;

/// Number of subbands in a super-wideband block
pub const NB_SUBBANDS: usize = 8;

/// Coefficients per subband (one lattice subvector)
pub const SUBBAND_LEN: usize = 8;

/// Transform coefficients per block
pub const SWB_COEFS: usize = NB_SUBBANDS * SUBBAND_LEN;

/// Number of coarse global gain levels (5-bit index)
pub const GLOBAL_GAIN_LEVELS: u8 = 32;

/// Largest layer budget supported by the bit cursor
pub const MAX_LAYER_BITS: usize = 64;

/// Operating mode reported by the bandwidth-extension stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BweMode {
    /// Stationary signal
    #[default]
    Normal,
    /// Onset or decay
    Transient,
    /// Strongly tonal signal
    Harmonic,
}

impl BweMode {
    /// Get the mode name
    pub fn name(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Transient => "transient",
            Self::Harmonic => "harmonic",
        }
    }

    /// Map the numeric mode used by the core codec
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Normal),
            1 => Some(Self::Transient),
            2 => Some(Self::Harmonic),
            _ => None,
        }
    }
}

impl fmt::Display for BweMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Coding status of a subband after decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BandType {
    /// Not coded by either layer
    #[default]
    Zero,
    /// Coded by layer 1
    Layer1,
    /// Coded (or filled) by layer 2
    Layer2,
}

/// How coefficients are mapped to lattice targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodingPath {
    /// Coefficients are coded directly
    Direct,
    /// Magnitude excess over one half is coded, signs are sent separately
    Residual,
}

/// Bit budget and subvector count of one layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerProfile {
    /// Layer size in bits, header included
    pub budget_bits: usize,
    /// Number of subbands coded by the layer
    pub subvectors: usize,
}

impl LayerProfile {
    /// Create a profile
    pub const fn new(budget_bits: usize, subvectors: usize) -> Self {
        Self {
            budget_bits,
            subvectors,
        }
    }

    /// Layer 1: 36 bits, 3 subbands
    pub const fn layer1() -> Self {
        Self::new(36, 3)
    }

    /// Layer 2: 40 bits, 4 subbands
    pub const fn layer2() -> Self {
        Self::new(40, 4)
    }

    /// Constrained low-rate profile: 15 bits, 2 subvectors
    pub const fn low_rate() -> Self {
        Self::new(15, 2)
    }

    /// Bits left for the lattice indices after a header of `header_bits`
    pub fn avq_budget(&self, header_bits: usize) -> usize {
        self.budget_bits.saturating_sub(header_bits)
    }

    fn validate(&self, name: &str, header_bits: usize) -> Result<()> {
        if self.subvectors == 0 || self.subvectors > NB_SUBBANDS {
            return Err(AvqError::invalid_config(format!(
                "{} codes {} subbands, expected 1..={}",
                name, self.subvectors, NB_SUBBANDS
            )));
        }
        if self.budget_bits < header_bits + self.subvectors {
            return Err(AvqError::invalid_config(format!(
                "{} budget {} bits is below header ({}) plus one bit per subband ({})",
                name, self.budget_bits, header_bits, self.subvectors
            )));
        }
        if self.budget_bits > MAX_LAYER_BITS {
            return Err(AvqError::invalid_config(format!(
                "{} budget {} bits exceeds {}",
                name, self.budget_bits, MAX_LAYER_BITS
            )));
        }
        Ok(())
    }
}

/// Configuration of the layered coder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwbAvqConfig {
    /// Number of layers (1 or 2)
    pub layers: u8,
    /// Layer 1 profile
    pub layer1: LayerProfile,
    /// Layer 2 profile
    pub layer2: LayerProfile,
    /// Reconstruct zero bands from coded bands
    pub zero_band_fill: bool,
    /// Spend leftover bits on gradient refinement
    pub gradient_refinement: bool,
}

impl Default for SwbAvqConfig {
    fn default() -> Self {
        Self {
            layers: 2,
            layer1: LayerProfile::layer1(),
            layer2: LayerProfile::layer2(),
            zero_band_fill: true,
            gradient_refinement: true,
        }
    }
}

impl SwbAvqConfig {
    /// Two-layer configuration (36 + 40 bits)
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-layer configuration on the 15-bit low-rate profile
    pub fn low_rate() -> Self {
        Self {
            layers: 1,
            layer1: LayerProfile::low_rate(),
            ..Self::default()
        }
    }

    /// Set number of layers
    pub fn with_layers(mut self, layers: u8) -> Self {
        self.layers = layers;
        self
    }

    /// Set the layer 1 profile
    pub fn with_layer1(mut self, profile: LayerProfile) -> Self {
        self.layer1 = profile;
        self
    }

    /// Set the layer 2 profile
    pub fn with_layer2(mut self, profile: LayerProfile) -> Self {
        self.layer2 = profile;
        self
    }

    /// Enable or disable zero-band filling
    pub fn with_zero_band_fill(mut self, enabled: bool) -> Self {
        self.zero_band_fill = enabled;
        self
    }

    /// Enable or disable gradient refinement
    pub fn with_gradient_refinement(mut self, enabled: bool) -> Self {
        self.gradient_refinement = enabled;
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error for an unsupported layer count, an empty or oversized
    /// profile, a budget that cannot hold the layer header plus one bit per
    /// subband, or more coded subbands than the block holds.
    pub fn validate(&self) -> Result<()> {
        if self.layers != 1 && self.layers != 2 {
            return Err(AvqError::invalid_config(format!(
                "{} layers requested, expected 1 or 2",
                self.layers
            )));
        }

        self.layer1.validate("layer 1", LAYER1_HEADER_BITS)?;

        if self.layers == 2 {
            self.layer2.validate("layer 2", LAYER2_HEADER_BITS)?;
            if self.layer1.subvectors + self.layer2.subvectors > NB_SUBBANDS {
                return Err(AvqError::invalid_config(format!(
                    "layers code {} + {} subbands, block holds {}",
                    self.layer1.subvectors, self.layer2.subvectors, NB_SUBBANDS
                )));
            }
        }

        Ok(())
    }

    /// Number of subbands coded by layer 2 (0 for a single layer)
    pub fn layer2_subvectors(&self) -> usize {
        if self.layers == 2 {
            self.layer2.subvectors
        } else {
            0
        }
    }

    /// Frame size in bits, with or without the layer 1 path flag
    pub fn frame_bits(&self, with_flag: bool) -> usize {
        let layer1 = self.layer1.budget_bits + usize::from(with_flag);
        if self.layers == 2 {
            layer1 + self.layer2.budget_bits
        } else {
            layer1
        }
    }

    /// Largest frame size in bits
    pub fn max_frame_bits(&self) -> usize {
        self.frame_bits(true)
    }
}

/// Per-frame side information from the core codec and envelope estimator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideInfo {
    /// Normalised spectral envelope per subband
    pub envelope: [f32; NB_SUBBANDS],
    /// Operating mode of the current frame
    pub mode: BweMode,
    /// 5-bit coarse global gain index
    pub global_gain_index: u8,
}

impl SideInfo {
    /// Create side information
    pub fn new(envelope: [f32; NB_SUBBANDS], mode: BweMode, global_gain_index: u8) -> Self {
        Self {
            envelope,
            mode,
            global_gain_index,
        }
    }

    /// Validate the side information
    ///
    /// # Errors
    ///
    /// Returns an error if the gain index is not a 5-bit value or an envelope
    /// entry is negative or not finite.
    pub fn validate(&self) -> Result<()> {
        if self.global_gain_index >= GLOBAL_GAIN_LEVELS {
            return Err(AvqError::invalid_input(format!(
                "global gain index {} exceeds {}",
                self.global_gain_index,
                GLOBAL_GAIN_LEVELS - 1
            )));
        }
        if let Some((band, value)) = self
            .envelope
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(AvqError::invalid_input(format!(
                "envelope of band {} is {}",
                band, value
            )));
        }
        Ok(())
    }
}

/// Zero-band fill parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillDecision {
    /// Band that was filled
    pub band: usize,
    /// Coded band the values were copied from
    pub source: usize,
    /// Candidate index (position in the energy-sorted coded bands)
    pub candidate: usize,
    /// Index into the fill gain table
    pub gain_index: usize,
    /// Layer that carried the fill field
    pub layer: BandType,
}

/// Fills per frame across both layers
pub const MAX_FRAME_FILLS: usize = 2 * MAX_LAYER_FILLS;

/// Encoder-side summary of one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    /// Band classification after decoding
    pub band_types: [BandType; NB_SUBBANDS],
    /// Codebook number per band (0 for uncoded bands)
    pub nq: [u8; NB_SUBBANDS],
    /// Coding path of the frame
    pub path: CodingPath,
    /// Whether the layer 1 path flag was sent
    pub path_flag_sent: bool,
    /// Lattice index bits used in layer 1
    pub layer1_bits_used: usize,
    /// Lattice index bits used in layer 2
    pub layer2_bits_used: usize,
    /// Total soft bits written
    pub bits_written: usize,
    /// Zero-band fills in signalling order
    pub fills: [Option<FillDecision>; MAX_FRAME_FILLS],
    /// Whether layer 1 inhibited every fill of the frame
    pub fill_inhibited: bool,
    /// Local decoder output
    pub reconstruction: [f32; SWB_COEFS],
}

impl FrameReport {
    /// Count of (layer 1, layer 2, zero) bands
    pub fn band_counts(&self) -> (usize, usize, usize) {
        band_counts(&self.band_types)
    }

    /// Fills sent in the frame
    pub fn fills(&self) -> impl Iterator<Item = &FillDecision> + '_ {
        self.fills.iter().flatten()
    }

    /// Fill of band `b`, if it was filled
    pub fn fill_of(&self, b: usize) -> Option<&FillDecision> {
        self.fills().find(|f| f.band == b)
    }
}

/// Count of (layer 1, layer 2, zero) bands in a classification
pub fn band_counts(types: &[BandType; NB_SUBBANDS]) -> (usize, usize, usize) {
    types.iter().fold((0, 0, 0), |(l1, l2, zero), band| match band {
        BandType::Layer1 => (l1 + 1, l2, zero),
        BandType::Layer2 => (l1, l2 + 1, zero),
        BandType::Zero => (l1, l2, zero + 1),
    })
}
