//! Decoder post-processing
//!
//! Sign recovery from the previous frame, zero-band fill blending and
//! neighbour smoothing, and bad-frame attenuation.

use super::bands::{band_range, SignPlan};
use super::tables::{BAD_FRAME_ATTENUATION, SMOOTHING_TAPS};
use crate::types::SWB_COEFS;

/// Give signs to the residual magnitudes of a sign plan
///
/// The first `sent.len()` positions of the plan take the transmitted signs
/// (`true` is negative). The rest follow the previous frame: its sign, and a
/// magnitude blended as `w·m + (1 − w)·|prev|`.
pub fn apply_signs(
    values: &mut [f32; SWB_COEFS],
    plan: &SignPlan,
    sent: &[bool],
    prev: &[f32; SWB_COEFS],
    weight: f32,
) {
    for (k, &i) in plan.positions().iter().enumerate() {
        match sent.get(k) {
            Some(&negative) => {
                if negative {
                    values[i] = -values[i];
                }
            }
            None => {
                let p = prev[i];
                let magnitude = weight * values[i] + (1.0 - weight) * p.abs();
                values[i] = if p < 0.0 { -magnitude } else { magnitude };
            }
        }
    }
}

/// Blend a band with the same band of the previous frame, keeping its signs
pub fn blend_band(band: &mut [f32], prev: &[f32], weight: f32) {
    for (v, &p) in band.iter_mut().zip(prev.iter()) {
        let magnitude = weight * v.abs() + (1.0 - weight) * p.abs();
        *v = if *v < 0.0 { -magnitude } else { magnitude };
    }
}

/// Smooth band `b` with three-tap neighbour averaging
///
/// Neighbours outside the block are clamped to its first and last
/// coefficient.
pub fn smooth_band(values: &mut [f32; SWB_COEFS], b: usize) {
    let source = *values;
    let last = SWB_COEFS - 1;
    for i in band_range(b) {
        let left = source[i.saturating_sub(1)];
        let right = source[(i + 1).min(last)];
        values[i] = SMOOTHING_TAPS[0] * left + SMOOTHING_TAPS[1] * source[i] + SMOOTHING_TAPS[2] * right;
    }
}

/// Attenuated copy of the previous frame
pub fn attenuate(prev: &[f32; SWB_COEFS]) -> [f32; SWB_COEFS] {
    let mut out = *prev;
    for v in &mut out {
        *v *= BAD_FRAME_ATTENUATION;
    }
    out
}
