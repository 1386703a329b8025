//! Layered SWB coder tables and constants

use crate::types::{BweMode, SUBBAND_LEN};

/// Layer 1 path flag (sent only in Mode A)
pub const PATH_FLAG_BITS: usize = 1;

/// Embedded fine gain field (layer 1 only)
pub const FINE_GAIN_BITS: usize = 3;

/// Layer 1 flag disabling every zero-band fill of the frame
pub const FILL_INHIBIT_BITS: usize = 1;

/// Zero-band fill: enable flag
pub const FILL_ON_BITS: usize = 1;
/// Zero-band fill: candidate index
pub const FILL_CANDIDATE_BITS: usize = 2;
/// Zero-band fill: gain index
pub const FILL_GAIN_BITS: usize = 2;

/// Complete fill field: enable flag, candidate and gain
pub const FILL_FIELD_BITS: usize = FILL_ON_BITS + FILL_CANDIDATE_BITS + FILL_GAIN_BITS;

/// Layer 1 header without the path flag
pub const LAYER1_HEADER_BITS: usize = FINE_GAIN_BITS + FILL_INHIBIT_BITS;

/// Largest layer 2 header: the fill field, present unless fills are inhibited
pub const LAYER2_HEADER_BITS: usize = FILL_FIELD_BITS;

/// Zero bands a layer may fill
pub const MAX_LAYER_FILLS: usize = 2;

/// Coarse global gain, `COARSE_GAIN[k] = 2^(k/2)`; index 0 is the zero gain
pub const COARSE_GAIN: [f32; 32] = [
    0.0, 1.41421356, 2.0, 2.82842712, 4.0, 5.65685425, 8.0, 11.3137085, 16.0, 22.627417, 32.0,
    45.254834, 64.0, 90.509668, 128.0, 181.019336, 256.0, 362.038672, 512.0, 724.077344,
    1024.0, 1448.15469, 2048.0, 2896.30938, 4096.0, 5792.61875, 8192.0, 11585.2375, 16384.0,
    23170.475, 32768.0, 46340.95,
];

/// Fine gain refinement relative to a non-zero coarse gain, `2^(k/2)`
pub const FINE_GAIN_REL: [f32; 8] = [
    1.0, 1.41421356, 2.0, 2.82842712, 4.0, 5.65685425, 8.0, 11.3137085,
];

/// Fine gain used on its own when the coarse gain is zero, `4^k`
pub const FINE_GAIN_ABS: [f32; 8] = [1.0, 4.0, 16.0, 64.0, 256.0, 1024.0, 4096.0, 16384.0];

/// Zero-band fill gains
pub const FILL_GAIN: [f32; 4] = [0.25, 0.5, 0.75, 1.0];

/// Gradient correction curves: flat, rising, falling, bowl
pub const GRADIENT_CURVES: [[f32; SUBBAND_LEN]; 4] = [
    [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
    [0.8, 0.857143, 0.914286, 0.971429, 1.028571, 1.085714, 1.142857, 1.2],
    [1.2, 1.142857, 1.085714, 1.028571, 0.971429, 0.914286, 0.857143, 0.8],
    [1.15, 1.05, 0.95, 0.85, 0.85, 0.95, 1.05, 1.15],
];

/// Lattice target scale
pub const TARGET_SCALE: f32 = 4.0;

/// Magnitude floor subtracted on the residual path
pub const RESIDUAL_OFFSET: f32 = 0.5;

/// Normalised magnitude below which a coefficient counts as low level
pub const LOW_LEVEL_THRESHOLD: f32 = 0.5;

/// Top-ranked bands scanned by the low-level counter
pub const LOW_LEVEL_BANDS: usize = 4;

/// Weight of the history in the low-level counter smoothing
pub const LOW_LEVEL_SMOOTHING: f32 = 0.7;

/// Smoothed low-level count at or below which the residual path is chosen
pub const RESIDUAL_COUNT_THRESHOLD: f32 = 15.0;

/// Smoothed count below which the previous path decision is kept
pub const DIRECT_COUNT_THRESHOLD: f32 = 20.0;

/// Mean-square (relative to the band gain) above which a zero band is problematic
pub const PROBLEMATIC_ENERGY_RATIO: f32 = 4.0;

/// Peak-to-mean magnitude ratio above which a zero band is problematic
pub const PROBLEMATIC_PEAK_RATIO: f32 = 6.0;

/// Hysteresis counter increment on detection
pub const HYSTERESIS_ATTACK: u8 = 2;
/// Hysteresis counter ceiling
pub const HYSTERESIS_MAX: u8 = 6;
/// Counter value from which a band stays problematic
pub const HYSTERESIS_THRESHOLD: u8 = 3;

/// Number of fill candidates
pub const FILL_CANDIDATES: usize = 4;

/// Correlation at or below which no fill is sent
pub const FILL_MIN_CORRELATION: f32 = 0.1;

/// Neighbour smoothing taps for filled bands after a mode switch
pub const SMOOTHING_TAPS: [f32; 3] = [0.25, 0.5, 0.25];

/// Attenuation of the previous frame on a bad frame
pub const BAD_FRAME_ATTENUATION: f32 = 0.5;

/// Band gains below this are replaced by unity
pub const MIN_BAND_GAIN: f32 = 1e-6;

/// Weight of the current magnitude when blending with the previous frame
pub fn blend_weight(mode: BweMode) -> f32 {
    match mode {
        BweMode::Normal => 0.75,
        BweMode::Transient => 1.0,
        BweMode::Harmonic => 0.5,
    }
}
