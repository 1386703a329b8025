//! Persistent encoder and decoder state
//!
//! Each session owns one state block. It is created with the session, reset
//! at call start and updated once per frame.

use crate::types::{BweMode, NB_SUBBANDS, SWB_COEFS};

/// Decoder memory carried from frame to frame
///
/// The encoder keeps an identical copy through its local decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct DecoderState {
    /// Normalised output of the previous frame
    pub prev_coefs: [f32; SWB_COEFS],
    /// Bands left uncoded and unfilled in the previous frame
    pub prev_zero: [bool; NB_SUBBANDS],
    /// Operating mode of the previous frame
    pub prev_mode: BweMode,
    /// Frames processed since the last reset
    pub frame_count: u64,
}

impl DecoderState {
    /// Create a new decoder state
    pub fn new() -> Self {
        Self {
            prev_coefs: [0.0; SWB_COEFS],
            prev_zero: [true; NB_SUBBANDS],
            prev_mode: BweMode::Normal,
            frame_count: 0,
        }
    }

    /// Reset to the initial state
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for DecoderState {
    fn default() -> Self {
        Self::new()
    }
}

/// Encoder-only memory
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderState {
    /// Exponentially smoothed count of low-level coefficients
    pub low_level_smoothed: f32,
    /// Last Mode A path decision (`true` for residual)
    pub residual_flag: bool,
    /// Problematic zero-band hysteresis counters
    pub hysteresis: [u8; NB_SUBBANDS],
    /// Frames processed since the last reset
    pub frame_count: u64,
}

impl EncoderState {
    /// Create a new encoder state
    pub fn new() -> Self {
        Self {
            low_level_smoothed: 0.0,
            residual_flag: true,
            hysteresis: [0; NB_SUBBANDS],
            frame_count: 0,
        }
    }

    /// Reset to the initial state
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for EncoderState {
    fn default() -> Self {
        Self::new()
    }
}
