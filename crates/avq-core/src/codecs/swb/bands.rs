//! Band-level processing shared by the encoder and the decoder
//!
//! Everything the decoder derives from the bitstream is computed here, so the
//! encoder's local reconstruction follows exactly the same arithmetic.

use std::cmp::Ordering;
use std::ops::Range;

use super::tables::*;
use crate::codecs::avq::Point;
use crate::types::{
    BandType, BweMode, CodingPath, SideInfo, SwbAvqConfig, NB_SUBBANDS, SUBBAND_LEN, SWB_COEFS,
};

/// Coefficient range of band `b`
#[inline]
pub fn band_range(b: usize) -> Range<usize> {
    b * SUBBAND_LEN..(b + 1) * SUBBAND_LEN
}

/// Perceptual band order and the split between layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandLayout {
    /// Bands by descending envelope (ties to the lower index)
    pub order: [usize; NB_SUBBANDS],
    /// Bands coded by layer 1
    pub layer1: usize,
    /// Bands coded by layer 2
    pub layer2: usize,
}

impl BandLayout {
    /// Layout of a frame under `config`
    pub fn for_frame(config: &SwbAvqConfig, side: &SideInfo) -> Self {
        Self::new(
            &side.envelope,
            config.layer1.subvectors,
            config.layer2_subvectors(),
        )
    }

    /// Rank the bands of a frame
    pub fn new(envelope: &[f32; NB_SUBBANDS], layer1: usize, layer2: usize) -> Self {
        let mut order = [0usize; NB_SUBBANDS];
        for (i, slot) in order.iter_mut().enumerate() {
            *slot = i;
        }
        order.sort_by(|&a, &b| {
            envelope[b]
                .partial_cmp(&envelope[a])
                .unwrap_or(Ordering::Equal)
                .then(a.cmp(&b))
        });

        let layer1 = layer1.min(NB_SUBBANDS);
        Self {
            order,
            layer1,
            layer2: layer2.min(NB_SUBBANDS - layer1),
        }
    }

    /// Bands assigned to layer 1, in rank order
    pub fn layer1_bands(&self) -> &[usize] {
        &self.order[..self.layer1]
    }

    /// Bands assigned to layer 2, in rank order
    pub fn layer2_bands(&self) -> &[usize] {
        &self.order[self.layer1..self.layer1 + self.layer2]
    }

    /// Bands left to no layer, in rank order
    pub fn unscheduled_bands(&self) -> &[usize] {
        &self.order[self.layer1 + self.layer2..]
    }

    /// Up to [`MAX_LAYER_FILLS`] highest-ranked zero bands outside `skip`
    pub fn fill_targets(
        &self,
        types: &[BandType; NB_SUBBANDS],
        skip: &[usize],
    ) -> [Option<usize>; MAX_LAYER_FILLS] {
        let mut targets = [None; MAX_LAYER_FILLS];
        let zero = self
            .order
            .iter()
            .copied()
            .filter(|b| types[*b] == BandType::Zero && !skip.contains(b));
        for (slot, b) in targets.iter_mut().zip(zero) {
            *slot = Some(b);
        }
        targets
    }
}

/// Normalisation gains of a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandGains {
    /// Gain per band
    pub gains: [f32; NB_SUBBANDS],
    /// Coarse gain is zero: the absolute fine gain table applies
    pub absolute: bool,
}

/// Band gains `COARSE_GAIN[index] · envelope[b]`
///
/// A zero coarse gain (index 0) leaves the bands unscaled.
pub fn band_gains(side: &SideInfo) -> BandGains {
    let coarse = COARSE_GAIN[usize::from(side.global_gain_index) % COARSE_GAIN.len()];
    let absolute = side.global_gain_index == 0;

    let mut gains = [1.0f32; NB_SUBBANDS];
    if !absolute {
        for (gain, &env) in gains.iter_mut().zip(side.envelope.iter()) {
            let g = coarse * env;
            *gain = if g > MIN_BAND_GAIN { g } else { 1.0 };
        }
    }
    BandGains { gains, absolute }
}

/// Divide each band by its gain
pub fn normalise(coefs: &[f32], gains: &BandGains) -> [f32; SWB_COEFS] {
    let mut y = [0.0f32; SWB_COEFS];
    for b in 0..NB_SUBBANDS {
        for i in band_range(b) {
            y[i] = coefs[i] / gains.gains[b];
        }
    }
    y
}

/// Multiply each band by its gain
pub fn denormalise(values: &[f32; SWB_COEFS], gains: &BandGains, output: &mut [f32]) {
    for b in 0..NB_SUBBANDS {
        for i in band_range(b) {
            output[i] = values[i] * gains.gains[b];
        }
    }
}

/// Mode A: a normal frame following a normal frame
#[inline]
pub fn is_mode_a(mode: BweMode, prev_mode: BweMode) -> bool {
    mode == BweMode::Normal && prev_mode == BweMode::Normal
}

/// Low-level coefficients in the [`LOW_LEVEL_BANDS`] top-ranked bands
pub fn low_level_count(y: &[f32; SWB_COEFS], layout: &BandLayout) -> usize {
    layout.order[..LOW_LEVEL_BANDS]
        .iter()
        .map(|&b| {
            y[band_range(b)]
                .iter()
                .filter(|v| v.abs() < LOW_LEVEL_THRESHOLD)
                .count()
        })
        .sum()
}

/// Mode A path decision from the smoothed low-level count
///
/// Returns whether the residual path is used. Between the two thresholds the
/// previous decision holds.
pub fn residual_decision(smoothed: f32, previous: bool) -> bool {
    if smoothed <= RESIDUAL_COUNT_THRESHOLD {
        true
    } else if smoothed < DIRECT_COUNT_THRESHOLD {
        previous
    } else {
        false
    }
}

/// Lattice target of one band
pub fn lattice_target(y: &[f32], path: CodingPath) -> [f32; SUBBAND_LEN] {
    let mut t = [0.0f32; SUBBAND_LEN];
    for (target, &v) in t.iter_mut().zip(y.iter()) {
        *target = match path {
            CodingPath::Direct => TARGET_SCALE * v,
            CodingPath::Residual => TARGET_SCALE * (v.abs() - RESIDUAL_OFFSET),
        };
    }
    t
}

/// Least-squares gain between targets and lattice points
pub fn fine_gain_ratio(targets: &[[f32; SUBBAND_LEN]], points: &[Point]) -> f32 {
    let mut num = 0.0f32;
    let mut den = 0.0f32;
    for (t, q) in targets.iter().zip(points.iter()) {
        for j in 0..SUBBAND_LEN {
            let qj = q[j] as f32;
            num += t[j] * qj;
            den += qj * qj;
        }
    }
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

/// Quantise a fine gain, nearest entry in the log domain
pub fn quantise_fine_gain(ratio: f32, absolute: bool) -> u32 {
    if ratio <= 0.0 || !ratio.is_finite() {
        return 0;
    }
    let steps = if absolute {
        ratio.log2() / 2.0
    } else {
        ratio.log2() * 2.0
    };
    steps.round().clamp(0.0, (FINE_GAIN_REL.len() - 1) as f32) as u32
}

/// Fine gain value of an index
pub fn fine_gain_value(index: u32, absolute: bool) -> f32 {
    let table = if absolute {
        &FINE_GAIN_ABS
    } else {
        &FINE_GAIN_REL
    };
    table[(index as usize).min(table.len() - 1)]
}

/// Normalised band values from a lattice point
///
/// On the residual path these are unsigned magnitudes; signs come later.
pub fn reconstruct_band(q: &Point, fine_gain: f32, path: CodingPath) -> [f32; SUBBAND_LEN] {
    let mut out = [0.0f32; SUBBAND_LEN];
    for (v, &qj) in out.iter_mut().zip(q.iter()) {
        let scaled = fine_gain * qj as f32 / TARGET_SCALE;
        *v = match path {
            CodingPath::Direct => scaled,
            CodingPath::Residual => (RESIDUAL_OFFSET + scaled).max(0.0),
        };
    }
    out
}

/// Coefficients awaiting a sign, by descending magnitude
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignPlan {
    positions: [usize; SWB_COEFS],
    len: usize,
}

impl SignPlan {
    /// Plan with no coefficients
    pub fn empty() -> Self {
        Self {
            positions: [0; SWB_COEFS],
            len: 0,
        }
    }

    /// Coefficient positions in sending order
    pub fn positions(&self) -> &[usize] {
        &self.positions[..self.len]
    }

    /// Number of coefficients in the plan
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the plan is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Sign order for the non-zero magnitudes of `bands`
///
/// Larger magnitudes come first; equal magnitudes keep band rank order, then
/// coefficient order.
pub fn sign_plan(values: &[f32; SWB_COEFS], bands: &[usize]) -> SignPlan {
    let mut plan = SignPlan::empty();
    for &b in bands {
        for i in band_range(b) {
            if values[i] > 0.0 {
                plan.positions[plan.len] = i;
                plan.len += 1;
            }
        }
    }
    plan.positions[..plan.len].sort_by(|&a, &b| {
        values[b]
            .partial_cmp(&values[a])
            .unwrap_or(Ordering::Equal)
    });
    plan
}

/// Split of the leftover bits into gradient codes
///
/// With at least one bit per coded band, `min(n, remaining − n)` bands get a
/// 2-bit code and the others a 1-bit code. Otherwise only the first
/// `remaining` bands get a 1-bit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradientPlan {
    two_bit: usize,
    one_bit: usize,
}

impl GradientPlan {
    /// Plan for `coded` bands and `remaining` leftover bits
    pub fn new(coded: usize, remaining: usize) -> Self {
        if remaining >= coded {
            let two_bit = coded.min(remaining - coded);
            Self {
                two_bit,
                one_bit: coded - two_bit,
            }
        } else {
            Self {
                two_bit: 0,
                one_bit: remaining,
            }
        }
    }

    /// Code width of the `k`-th coded band
    pub fn width(&self, k: usize) -> usize {
        if k < self.two_bit {
            2
        } else if k < self.two_bit + self.one_bit {
            1
        } else {
            0
        }
    }

    /// Total bits of the plan
    pub fn bits(&self) -> usize {
        2 * self.two_bit + self.one_bit
    }
}

/// Curve minimising Σ|y − curve·ŷ| among the first `n_curves`
pub fn select_gradient(y: &[f32], decoded: &[f32], n_curves: usize) -> usize {
    let mut best = 0;
    let mut best_err = f32::INFINITY;
    for (k, curve) in GRADIENT_CURVES.iter().take(n_curves).enumerate() {
        let err: f32 = (0..SUBBAND_LEN)
            .map(|j| (y[j] - curve[j] * decoded[j]).abs())
            .sum();
        if err < best_err {
            best_err = err;
            best = k;
        }
    }
    best
}

/// Scale a band by a gradient curve
pub fn apply_gradient(band: &mut [f32], curve: usize) {
    let curve = &GRADIENT_CURVES[curve.min(GRADIENT_CURVES.len() - 1)];
    for (v, &c) in band.iter_mut().zip(curve.iter()) {
        *v *= c;
    }
}

/// Whether a band is too loud or too peaky to be filled from other bands
pub fn is_problematic(y: &[f32]) -> bool {
    let energy: f32 = y.iter().map(|v| v * v).sum();
    if energy / SUBBAND_LEN as f32 > PROBLEMATIC_ENERGY_RATIO {
        return true;
    }

    let mean = y.iter().map(|v| v.abs()).sum::<f32>() / SUBBAND_LEN as f32;
    let peak = y.iter().fold(0.0f32, |p, v| p.max(v.abs()));
    mean > 0.0 && peak / mean > PROBLEMATIC_PEAK_RATIO
}

/// Update a hysteresis counter; returns whether the band counts as problematic
pub fn update_hysteresis(counter: &mut u8, detected: bool) -> bool {
    *counter = if detected {
        (*counter + HYSTERESIS_ATTACK).min(HYSTERESIS_MAX)
    } else {
        counter.saturating_sub(1)
    };
    *counter >= HYSTERESIS_THRESHOLD
}

/// Coded bands usable as fill sources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillCandidates {
    bands: [usize; FILL_CANDIDATES],
    len: usize,
}

impl FillCandidates {
    /// Candidate bands, most energetic first
    pub fn bands(&self) -> &[usize] {
        &self.bands[..self.len]
    }

    /// Band of a signalled candidate index
    pub fn get(&self, index: usize) -> Option<usize> {
        self.bands().get(index).copied()
    }
}

/// Up to four lattice-coded bands with the largest decoded energy
///
/// Filled bands carry no codevector and never serve as sources.
pub fn fill_candidates(values: &[f32; SWB_COEFS], nq: &[u8; NB_SUBBANDS]) -> FillCandidates {
    let mut energy = [0.0f32; NB_SUBBANDS];
    let mut coded = [0usize; NB_SUBBANDS];
    let mut n = 0;
    for b in 0..NB_SUBBANDS {
        if nq[b] > 0 {
            energy[b] = values[band_range(b)].iter().map(|v| v * v).sum();
            coded[n] = b;
            n += 1;
        }
    }
    coded[..n].sort_by(|&a, &b| {
        energy[b]
            .partial_cmp(&energy[a])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });

    let len = n.min(FILL_CANDIDATES);
    let mut bands = [0usize; FILL_CANDIDATES];
    bands[..len].copy_from_slice(&coded[..len]);
    FillCandidates { bands, len }
}

/// Normalised correlation ⟨y,c⟩/(‖y‖‖c‖)
pub fn correlation(y: &[f32], c: &[f32]) -> f32 {
    let dot: f32 = y.iter().zip(c.iter()).map(|(a, b)| a * b).sum();
    let ny: f32 = y.iter().map(|v| v * v).sum::<f32>().sqrt();
    let nc: f32 = c.iter().map(|v| v * v).sum::<f32>().sqrt();
    if ny > 0.0 && nc > 0.0 {
        dot / (ny * nc)
    } else {
        0.0
    }
}

/// Fill gain `min(⟨y,c⟩/⟨c,c⟩, 1)` as an index into [`FILL_GAIN`]
pub fn quantise_fill_gain(y: &[f32], c: &[f32]) -> usize {
    let dot: f32 = y.iter().zip(c.iter()).map(|(a, b)| a * b).sum();
    let energy: f32 = c.iter().map(|v| v * v).sum();
    let gain = if energy > 0.0 {
        (dot / energy).min(1.0)
    } else {
        0.0
    };

    let mut best = 0;
    for (k, &level) in FILL_GAIN.iter().enumerate() {
        if (gain - level).abs() < (gain - FILL_GAIN[best]).abs() {
            best = k;
        }
    }
    best
}
