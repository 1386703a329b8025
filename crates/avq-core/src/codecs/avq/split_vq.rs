//! Split vector quantisation with a global gain search
//!
//! Every subvector gets a log-domain bit estimate. A single gain offset,
//! shared by all subvectors, is searched by bisection so that the estimated
//! cost fits 95% of the budget left after one bit per subvector. The scaled
//! subvectors are then rounded to their nearest RE8 points.

use super::lattice::nearest_re8;
use super::tables::DIM;
use super::voronoi::MAX_COMPONENT;
use super::{Point, MAX_SUBVECTORS};

/// Number of bisection iterations of the gain search
pub const GAIN_SEARCH_ITERATIONS: usize = 10;

/// First bisection step of the gain search
pub const INITIAL_GAIN_STEP: f32 = 128.0;

/// Share of the budget the estimate may use
pub const BUDGET_FRACTION: f32 = 0.95;

/// Scaled coefficients are clamped to this magnitude before rounding
///
/// It lies beyond [`MAX_COMPONENT`], so a clamped subvector is indexed as
/// the zero codevector.
pub const SCALED_LIMIT: f32 = 2.0 * MAX_COMPONENT as f32;

/// Estimated bit cost of one subvector: `5·log2((2 + Σx²)/2)`
#[inline]
pub fn bit_estimate(x: &[f32; DIM]) -> f32 {
    let energy: f32 = x.iter().map(|v| v * v).sum();
    5.0 * ((2.0 + energy) * 0.5).log2()
}

/// Estimated cost of all subvectors once the gain offset is applied
#[inline]
pub fn estimated_bits(estimates: &[f32], offset: f32) -> f32 {
    estimates.iter().map(|&b| (b - offset).max(0.0)).sum()
}

/// Bisection search of the global gain offset
///
/// Returns the smallest offset on the search grid whose estimated cost stays
/// within `0.95·(budget − n)` for `n` subvectors.
pub fn gain_offset(estimates: &[f32], budget: usize) -> f32 {
    let max_bits = BUDGET_FRACTION * (budget as f32 - estimates.len() as f32);

    let mut offset = 0.0f32;
    let mut step = INITIAL_GAIN_STEP;
    for _ in 0..GAIN_SEARCH_ITERATIONS {
        offset += step;
        if estimated_bits(estimates, offset) <= max_bits {
            offset -= step;
        }
        step *= 0.5;
    }

    // The bisection stops on the last infeasible grid point
    if estimated_bits(estimates, offset) > max_bits {
        offset += 2.0 * step;
    }
    offset
}

/// Output of the split quantiser
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitVqResult {
    /// Nearest RE8 point of each scaled subvector
    pub points: [Point; MAX_SUBVECTORS],
    /// Rounded bit estimate of each unscaled subvector
    pub estimates: [i32; MAX_SUBVECTORS],
    /// Chosen gain offset
    pub offset: f32,
    /// Number of subvectors in use
    pub len: usize,
}

impl SplitVqResult {
    /// Points of the subvectors in use
    pub fn points(&self) -> &[Point] {
        &self.points[..self.len]
    }

    /// Bit estimates of the subvectors in use
    pub fn estimates(&self) -> &[i32] {
        &self.estimates[..self.len]
    }

    /// Linear inverse gain applied before rounding
    pub fn gain_inv(&self) -> f32 {
        gain_inv(self.offset)
    }
}

/// Inverse gain corresponding to an offset: `2^(−offset/10)`
#[inline]
pub fn gain_inv(offset: f32) -> f32 {
    (-offset / 10.0).exp2()
}

/// Quantise up to eight subvectors under `budget` bits
///
/// Subvectors beyond [`MAX_SUBVECTORS`] are ignored.
pub fn split_vq(subvectors: &[[f32; DIM]], budget: usize) -> SplitVqResult {
    let len = subvectors.len().min(MAX_SUBVECTORS);

    let mut raw = [0.0f32; MAX_SUBVECTORS];
    for (slot, x) in raw.iter_mut().zip(&subvectors[..len]) {
        *slot = bit_estimate(x);
    }

    let offset = gain_offset(&raw[..len], budget);
    let scale = gain_inv(offset);

    let mut points = [[0i32; DIM]; MAX_SUBVECTORS];
    let mut estimates = [0i32; MAX_SUBVECTORS];
    for i in 0..len {
        let scaled = subvectors[i].map(|v| (v * scale).clamp(-SCALED_LIMIT, SCALED_LIMIT));
        points[i] = nearest_re8(&scaled);
        estimates[i] = raw[i].round() as i32;
    }

    tracing::trace!(
        "Split VQ: {} subvectors, budget {}, offset {:.2}, estimates {:?}",
        len,
        budget,
        offset,
        &estimates[..len]
    );

    SplitVqResult {
        points,
        estimates,
        offset,
        len,
    }
}
