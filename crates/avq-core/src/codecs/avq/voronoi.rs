//! Voronoi extension of the RE8 base codebooks
//!
//! A point outside Q3 ∪ Q4 is split as `y = m·c + v` with `m = 2^r`, where
//! `c` is a base codevector and `v` is the representative of `y` modulo
//! `m·RE8` inside the (shifted) Voronoi region. `v` is transmitted through its
//! Voronoi index `k`, eight components in `[0, m)`. The codebook number of the
//! extended point is `nq = nq_base + 2r`, with `nq_base ∈ {3, 4}`.

use super::lattice::{base_index, decode_base_index, find_leader, is_re8, leader_nq, nearest_re8, norm};
use super::tables::{DIM, MAX_VORONOI_ORDER};
use super::Point;

/// Largest component magnitude accepted by [`re8_encode`]
pub const MAX_COMPONENT: i32 = 1 << 14;

/// Tie-break offset applied before the nearest-point search in the
/// Voronoi reduction
const VORONOI_OFFSET: [i32; DIM] = [2, 0, 0, 0, 0, 0, 0, 0];

/// Generator matrix of RE8 used for the Voronoi coordinates
const GENERATOR: [[i32; DIM]; DIM] = [
    [4, 0, 0, 0, 0, 0, 0, 0],
    [2, 2, 0, 0, 0, 0, 0, 0],
    [2, 0, 2, 0, 0, 0, 0, 0],
    [2, 0, 0, 2, 0, 0, 0, 0],
    [2, 0, 0, 0, 2, 0, 0, 0],
    [2, 0, 0, 0, 0, 2, 0, 0],
    [2, 0, 0, 0, 0, 0, 2, 0],
    [1, 1, 1, 1, 1, 1, 1, 1],
];

/// Complete lattice index of one subvector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LatticeIndex {
    /// Codebook number (0, 2, 3, 4, 5, ...)
    pub nq: u8,
    /// Base codebook index
    pub base_index: u32,
    /// Voronoi index (all zero when `nq ≤ 4`)
    pub voronoi: [i32; DIM],
}

impl LatticeIndex {
    /// Index of the zero codevector
    pub const ZERO: Self = Self {
        nq: 0,
        base_index: 0,
        voronoi: [0; DIM],
    };

    /// Base codebook number and Voronoi order
    pub fn split(&self) -> (u8, u32) {
        split_codebook_number(self.nq)
    }
}

/// Split a codebook number into `(nq_base, r)`
///
/// Codebooks up to 4 have no extension. Above that, odd numbers extend Q3
/// and even numbers extend Q4.
pub fn split_codebook_number(nq: u8) -> (u8, u32) {
    if nq <= 4 {
        (nq, 0)
    } else {
        let base = if nq % 2 == 1 { 3 } else { 4 };
        (base, u32::from((nq - base) / 2))
    }
}

/// Voronoi index of `y` for order `r`
pub fn voronoi_index(y: &Point, r: u32) -> [i32; DIM] {
    let m = 1i32 << r;
    let k7 = y[7];

    let mut k = [0i32; DIM];
    let mut sum = 0;
    for j in 1..7 {
        k[j] = (y[j] - k7) / 2;
        sum += k[j];
    }
    k[0] = (y[0] - k7 - 2 * sum) / 4;
    k[7] = k7;

    k.map(|v| v.rem_euclid(m))
}

/// Voronoi representative `v` for index `k` and order `r`
pub fn voronoi_point(k: &[i32; DIM], r: u32) -> Point {
    let m = 1i32 << r;

    let mut yk = [0i32; DIM];
    for (row, &kr) in GENERATOR.iter().zip(k.iter()) {
        for c in 0..DIM {
            yk[c] += kr * row[c];
        }
    }

    let mut z = [0.0f32; DIM];
    for i in 0..DIM {
        z[i] = (yk[i] - VORONOI_OFFSET[i]) as f32 / m as f32;
    }
    let nearest = nearest_re8(&z);

    let mut v = [0i32; DIM];
    for i in 0..DIM {
        v[i] = yk[i] - m * nearest[i];
    }
    v
}

struct Reduction {
    codevector: Point,
    voronoi: [i32; DIM],
    nq: Option<u8>,
}

fn reduce(y: &Point, r: u32) -> Reduction {
    let m = 1i32 << r;
    let voronoi = voronoi_index(y, r);
    let v = voronoi_point(&voronoi, r);

    let mut codevector = [0i32; DIM];
    for i in 0..DIM {
        codevector[i] = (y[i] - v[i]) / m;
    }

    Reduction {
        nq: leader_nq(&codevector),
        codevector,
        voronoi,
    }
}

/// Index an RE8 point
///
/// Points in Q2, Q3 or Q4 are indexed directly. Other points get the
/// smallest Voronoi order found by the two-step refinement. Points that are
/// not on RE8, or are too large to extend, are indexed as zero.
pub fn re8_encode(y: &Point) -> LatticeIndex {
    if y.iter().any(|v| v.unsigned_abs() > MAX_COMPONENT as u32) {
        tracing::warn!("Point {:?} exceeds the component range, coding as zero", y);
        return LatticeIndex::ZERO;
    }

    match leader_nq(y) {
        Some(0) => return LatticeIndex::ZERO,
        Some(nq) => {
            return match find_leader(y) {
                Some(leader) => LatticeIndex {
                    nq,
                    base_index: base_index(y, leader),
                    voronoi: [0; DIM],
                },
                None => LatticeIndex::ZERO,
            };
        }
        None => {}
    }

    if !is_re8(y) {
        tracing::warn!("Point {:?} cannot be indexed, coding as zero", y);
        return LatticeIndex::ZERO;
    }

    let mut e = norm(y) as f64 / 32.0;
    let mut r = 1u32;
    while e > 1.0 {
        e /= 4.0;
        r += 1;
    }

    let mut best: Option<(u32, Reduction)> = None;
    for _ in 0..2 {
        let reduction = reduce(y, r);
        match reduction.nq {
            Some(_) => {
                best = Some((r, reduction));
                if r == 1 {
                    break;
                }
                r -= 1;
            }
            None => r += 1,
        }
    }

    while best.is_none() && r <= MAX_VORONOI_ORDER {
        let reduction = reduce(y, r);
        if reduction.nq.is_some() {
            best = Some((r, reduction));
        } else {
            r += 1;
        }
    }

    let Some((order, reduction)) = best else {
        tracing::warn!("No Voronoi order up to {} fits {:?}", MAX_VORONOI_ORDER, y);
        return LatticeIndex::ZERO;
    };

    let Some(leader) = find_leader(&reduction.codevector) else {
        tracing::warn!("Voronoi reduction of {:?} collapsed to the origin", y);
        return LatticeIndex::ZERO;
    };

    // Extended indices always use Q3 or Q4; Q2 is the head of Q3
    let nq_base = leader.nq.max(3);
    let nq = nq_base as u32 + 2 * order;
    tracing::trace!("RE8 point extended: nq_base={} r={} nq={}", nq_base, order, nq);

    LatticeIndex {
        nq: nq.min(u32::from(u8::MAX)) as u8,
        base_index: base_index(&reduction.codevector, leader),
        voronoi: reduction.voronoi,
    }
}

/// Reconstruct an RE8 point from its index
pub fn re8_decode(index: &LatticeIndex) -> Point {
    let (nq_base, r) = index.split();
    let codevector = decode_base_index(nq_base, index.base_index);
    if r == 0 {
        return codevector;
    }

    let m = 1i32 << r;
    let v = voronoi_point(&index.voronoi, r);
    let mut y = [0i32; DIM];
    for i in 0..DIM {
        y[i] = m * codevector[i] + v[i];
    }
    y
}
