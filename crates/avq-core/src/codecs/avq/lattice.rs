//! RE8 nearest-point search and base-codebook indexing
//!
//! A base index is `offset + pos_code · 2^sign_bits + sign_code`, where
//! `offset` locates the orbit inside its family table. `pos_code` places the
//! magnitude levels one after the other (largest first) into the slots left
//! free by the previous levels, each placement ranked in the combinatorial
//! number system. For odd leaders the last sign is implied by the RE8 parity
//! rule (Σy ≡ 0 mod 4) and is not coded.

use super::tables::{binomial, Family, LeaderInfo, DIM, LEADERS, MAX_SHELL, Q2_INDEX_COUNT};
use super::Point;

/// Nearest point of 2D8 (even coordinates, Σy ≡ 0 mod 4)
///
/// Coordinates saturate at the `i32` range.
pub fn nearest_2d8(x: &[f32; DIM]) -> Point {
    let mut y = [0i32; DIM];
    for i in 0..DIM {
        y[i] = ((x[i] * 0.5).round() as i32).saturating_mul(2);
    }

    let sum: i64 = y.iter().map(|&v| i64::from(v)).sum();
    if sum.rem_euclid(4) != 0 {
        // Move the worst-rounded coordinate to its second nearest even value
        let mut worst = 0;
        let mut worst_err = -1.0f32;
        for i in 0..DIM {
            let err = (x[i] - y[i] as f32).abs();
            if err > worst_err {
                worst_err = err;
                worst = i;
            }
        }
        if x[worst] > y[worst] as f32 {
            y[worst] = y[worst].saturating_add(2);
        } else {
            y[worst] = y[worst].saturating_sub(2);
        }
    }
    y
}

/// Nearest point of RE8 = 2D8 ∪ (2D8 + 1)
///
/// Ties go to the 2D8 candidate.
pub fn nearest_re8(x: &[f32; DIM]) -> Point {
    let even = nearest_2d8(x);

    let mut shifted = [0.0f32; DIM];
    for i in 0..DIM {
        shifted[i] = x[i] - 1.0;
    }
    let mut odd = nearest_2d8(&shifted);
    for v in &mut odd {
        *v = v.saturating_add(1);
    }

    if distance(x, &even) <= distance(x, &odd) {
        even
    } else {
        odd
    }
}

fn distance(x: &[f32; DIM], y: &Point) -> f32 {
    x.iter()
        .zip(y.iter())
        .map(|(&a, &b)| {
            let d = a - b as f32;
            d * d
        })
        .sum()
}

/// Squared norm of a lattice point
#[inline]
pub fn norm(y: &Point) -> i64 {
    y.iter().map(|&v| i64::from(v) * i64::from(v)).sum()
}

/// Whether `y` is a point of RE8
pub fn is_re8(y: &Point) -> bool {
    let all_even = y.iter().all(|v| v.rem_euclid(2) == 0);
    let all_odd = y.iter().all(|v| v.rem_euclid(2) == 1);
    (all_even || all_odd) && y.iter().map(|&v| i64::from(v)).sum::<i64>().rem_euclid(4) == 0
}

/// Identify the absolute leader of a non-zero RE8 point
///
/// Returns `None` for the origin and for outliers (shell above the table or
/// an untabulated orbit).
pub fn find_leader(y: &Point) -> Option<&'static LeaderInfo> {
    // A tabulated shell bounds every component by √(8·MAX_SHELL)
    let limit = 8 * MAX_SHELL as u64;
    if y.iter().any(|v| u64::from(v.unsigned_abs()).pow(2) > limit) {
        return None;
    }

    let energy = norm(y);
    if energy == 0 || energy % 8 != 0 {
        return None;
    }
    let shell = usize::try_from(energy / 8).ok()?;
    let quartic: i64 = y.iter().map(|&v| i64::from(v).pow(4)).sum::<i64>() / 8;
    let info = LEADERS.lookup(shell, quartic)?;

    let mut magnitudes = y.map(i32::abs);
    magnitudes.sort_unstable_by(|a, b| b.cmp(a));
    (magnitudes == info.magnitudes).then_some(info)
}

/// Codebook number of a point without Voronoi extension
///
/// 0 for the origin, 2..=4 for tabulated points, `None` for outliers.
pub fn leader_nq(y: &Point) -> Option<u8> {
    if y.iter().all(|&v| v == 0) {
        return Some(0);
    }
    find_leader(y).map(|info| info.nq)
}

/// Compute the base index of `y` inside the table of its leader
pub fn base_index(y: &Point, leader: &LeaderInfo) -> u32 {
    let mut sign_code = 0u32;
    let mut k = 0;
    for &v in y {
        if v != 0 {
            if k < leader.sign_bits && v < 0 {
                sign_code |= 1 << k;
            }
            k += 1;
        }
    }

    let mut free = [0usize; DIM];
    for (i, slot) in free.iter_mut().enumerate() {
        *slot = i;
    }
    let mut n_free = DIM;

    let mut pos_code = 0u32;
    let mut radix = 1u32;
    for &(level, count) in &leader.levels[..leader.levels.len() - 1] {
        let mut rank = 0u32;
        let mut chosen = 0;
        let mut remaining = [0usize; DIM];
        let mut n_remaining = 0;
        for c in 0..n_free {
            let slot = free[c];
            if y[slot].abs() == level {
                chosen += 1;
                rank += binomial(c, chosen);
            } else {
                remaining[n_remaining] = slot;
                n_remaining += 1;
            }
        }
        pos_code += rank * radix;
        radix *= binomial(n_free, count);
        free = remaining;
        n_free = n_remaining;
    }

    leader.offset + pos_code * leader.sign_count() + sign_code
}

/// Decode a base index of codebook `nq`
///
/// `nq < 2` yields the origin. Indices beyond the codebook are clamped to 0.
pub fn decode_base_index(nq: u8, index: u32) -> Point {
    if nq < 2 {
        return [0; DIM];
    }

    let family = if nq <= 3 { Family::Q3 } else { Family::Q4 };
    let leaders = LEADERS.family(family);
    let total = if nq == 2 {
        Q2_INDEX_COUNT
    } else {
        LEADERS.total(family)
    };

    let index = if index >= total {
        tracing::warn!(
            "Base index {} out of range for nq={} (max {}), clamping to 0",
            index,
            nq,
            total - 1
        );
        0
    } else {
        index
    };

    let Some(leader) = leaders.iter().rev().find(|info| info.offset <= index) else {
        return [0; DIM];
    };

    let rank = index - leader.offset;
    let sign_code = rank % leader.sign_count();
    let mut pos_code = rank / leader.sign_count();

    let mut y = [0i32; DIM];
    let mut free = [0usize; DIM];
    for (i, slot) in free.iter_mut().enumerate() {
        *slot = i;
    }
    let mut n_free = DIM;

    for &(level, count) in &leader.levels[..leader.levels.len() - 1] {
        let radix = binomial(n_free, count);
        let mut rank = pos_code % radix;
        pos_code /= radix;

        let mut taken = [false; DIM];
        for i in (1..=count).rev() {
            let mut c = i - 1;
            while c + 1 < n_free && binomial(c + 1, i) <= rank {
                c += 1;
            }
            rank -= binomial(c, i);
            taken[c] = true;
            y[free[c]] = level;
        }

        let mut remaining = [0usize; DIM];
        let mut n_remaining = 0;
        for c in 0..n_free {
            if !taken[c] {
                remaining[n_remaining] = free[c];
                n_remaining += 1;
            }
        }
        free = remaining;
        n_free = n_remaining;
    }

    if let Some(&(last_level, _)) = leader.levels.last() {
        for &slot in &free[..n_free] {
            y[slot] = last_level;
        }
    }

    let mut k = 0;
    for v in &mut y {
        if *v != 0 {
            if k < leader.sign_bits && (sign_code >> k) & 1 == 1 {
                *v = -*v;
            }
            k += 1;
        }
    }

    if leader.odd && y.iter().sum::<i32>().rem_euclid(4) != 0 {
        y[DIM - 1] = -y[DIM - 1];
    }

    y
}
