//! RE8 absolute-leader tables
//!
//! The base codebooks Q2, Q3 and Q4 are unions of RE8 orbits under sign
//! changes and permutations. Each orbit is identified by its absolute leader
//! (magnitudes sorted in descending order). Q2 ⊂ Q3 and both Q3 and Q4 hold
//! exactly 2^(4·nq) points, so an index fits the field written by the
//! multiplexer.
//!
//! Only the leader magnitudes are written out by hand. Shell numbers,
//! quartic signatures, orbit sizes and index offsets are derived once, on
//! first use.

use once_cell::sync::Lazy;

/// Dimension of the lattice
pub const DIM: usize = 8;

/// Largest shell number (Σy²/8) with tabulated leaders
pub const MAX_SHELL: usize = 9;

/// Largest Voronoi extension order tried before a point is dropped
pub const MAX_VORONOI_ORDER: u32 = 24;

/// Number of Q2 leaders (head of the Q3 list)
pub const Q2_LEADER_COUNT: usize = 3;

/// Index range covered by Q2 (8-bit indices)
pub const Q2_INDEX_COUNT: u32 = 1 << 8;

/// Index range covered by Q3 (12-bit indices)
pub const Q3_INDEX_COUNT: u32 = 1 << 12;

/// Index range covered by Q4 (16-bit indices)
pub const Q4_INDEX_COUNT: u32 = 1 << 16;

/// Q3 leaders; the first three form Q2
pub const Q3_LEADERS: [[i32; DIM]; 9] = [
    [1, 1, 1, 1, 1, 1, 1, 1],
    [2, 2, 0, 0, 0, 0, 0, 0],
    [4, 0, 0, 0, 0, 0, 0, 0],
    [2, 2, 2, 2, 0, 0, 0, 0],
    [3, 1, 1, 1, 1, 1, 1, 1],
    [4, 2, 2, 0, 0, 0, 0, 0],
    [4, 4, 0, 0, 0, 0, 0, 0],
    [6, 2, 0, 0, 0, 0, 0, 0],
    [8, 0, 0, 0, 0, 0, 0, 0],
];

/// Q4 leaders (disjoint from Q3)
pub const Q4_LEADERS: [[i32; DIM]; 17] = [
    [2, 2, 2, 2, 2, 2, 0, 0],
    [3, 3, 1, 1, 1, 1, 1, 1],
    [2, 2, 2, 2, 2, 2, 2, 2],
    [3, 3, 3, 1, 1, 1, 1, 1],
    [4, 2, 2, 2, 2, 0, 0, 0],
    [5, 1, 1, 1, 1, 1, 1, 1],
    [3, 3, 3, 3, 1, 1, 1, 1],
    [4, 2, 2, 2, 2, 2, 2, 0],
    [4, 4, 2, 2, 0, 0, 0, 0],
    [5, 3, 1, 1, 1, 1, 1, 1],
    [4, 4, 4, 0, 0, 0, 0, 0],
    [6, 2, 2, 2, 0, 0, 0, 0],
    [3, 3, 3, 3, 3, 3, 1, 1],
    [7, 1, 1, 1, 1, 1, 1, 1],
    [3, 3, 3, 3, 3, 3, 3, 1],
    [6, 2, 2, 2, 2, 2, 2, 2],
    [3, 3, 3, 3, 3, 3, 3, 3],
];

/// Binomial coefficients C(n, k) for n, k ≤ 8
pub const BINOMIAL: [[u32; DIM + 1]; DIM + 1] = build_binomials();

const fn build_binomials() -> [[u32; DIM + 1]; DIM + 1] {
    let mut table = [[0u32; DIM + 1]; DIM + 1];
    let mut n = 0;
    while n <= DIM {
        table[n][0] = 1;
        let mut k = 1;
        while k <= n {
            table[n][k] = table[n - 1][k - 1] + table[n - 1][k];
            k += 1;
        }
        n += 1;
    }
    table
}

/// C(n, k), zero outside the table
#[inline]
pub fn binomial(n: usize, k: usize) -> u32 {
    if n > DIM || k > n {
        0
    } else {
        BINOMIAL[n][k]
    }
}

/// Base codebook family an index table belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// Q3 table (also addresses Q2 through its first three leaders)
    Q3,
    /// Q4 table
    Q4,
}

/// Derived description of one absolute leader
#[derive(Debug, Clone)]
pub struct LeaderInfo {
    /// Magnitudes in descending order
    pub magnitudes: [i32; DIM],
    /// Smallest codebook containing the orbit (2, 3 or 4)
    pub nq: u8,
    /// Σy²/8
    pub shell: usize,
    /// Σy⁴/8
    pub quartic: i64,
    /// Distinct magnitudes (descending) with their multiplicities
    pub levels: Vec<(i32, usize)>,
    /// Number of explicitly coded sign bits
    pub sign_bits: u32,
    /// Whether the leader belongs to 2D8 + 1 (all components odd)
    pub odd: bool,
    /// Number of points in the orbit
    pub orbit_size: u32,
    /// First index of the orbit within its family table
    pub offset: u32,
    /// Table the offset refers to
    pub family: Family,
}

impl LeaderInfo {
    fn new(magnitudes: [i32; DIM], nq: u8, family: Family, offset: u32) -> Self {
        let shell = magnitudes.iter().map(|&v| v * v).sum::<i32>() as usize / 8;
        let quartic = magnitudes.iter().map(|&v| i64::from(v).pow(4)).sum::<i64>() / 8;

        let mut levels: Vec<(i32, usize)> = Vec::new();
        for &v in &magnitudes {
            match levels.last_mut() {
                Some((last, count)) if *last == v => *count += 1,
                _ => levels.push((v, 1)),
            }
        }

        let odd = magnitudes[0] % 2 == 1;
        let nonzero = magnitudes.iter().filter(|&&v| v != 0).count() as u32;
        let sign_bits = if odd { DIM as u32 - 1 } else { nonzero };

        let mut permutations: u32 = 40320;
        for &(_, count) in &levels {
            permutations /= (1..=count as u32).product::<u32>();
        }

        Self {
            magnitudes,
            nq,
            shell,
            quartic,
            levels,
            sign_bits,
            odd,
            orbit_size: permutations << sign_bits,
            offset,
            family,
        }
    }

    /// Number of sign patterns in the orbit
    #[inline]
    pub fn sign_count(&self) -> u32 {
        1 << self.sign_bits
    }
}

/// Derived leader tables and the (shell, quartic) lookup
#[derive(Debug)]
pub struct LeaderTable {
    /// Q3 leaders in index order (Q2 first)
    pub q3: Vec<LeaderInfo>,
    /// Q4 leaders in index order
    pub q4: Vec<LeaderInfo>,
    /// Per shell: (quartic, family, position) sorted by quartic
    by_shell: Vec<Vec<(i64, Family, usize)>>,
}

impl LeaderTable {
    fn build() -> Self {
        let mut q3 = Vec::with_capacity(Q3_LEADERS.len());
        let mut offset = 0;
        for (i, &leader) in Q3_LEADERS.iter().enumerate() {
            let nq = if i < Q2_LEADER_COUNT { 2 } else { 3 };
            let info = LeaderInfo::new(leader, nq, Family::Q3, offset);
            offset += info.orbit_size;
            q3.push(info);
        }

        let mut q4 = Vec::with_capacity(Q4_LEADERS.len());
        offset = 0;
        for &leader in &Q4_LEADERS {
            let info = LeaderInfo::new(leader, 4, Family::Q4, offset);
            offset += info.orbit_size;
            q4.push(info);
        }

        let mut by_shell = vec![Vec::new(); MAX_SHELL + 1];
        for (i, info) in q3.iter().enumerate() {
            by_shell[info.shell].push((info.quartic, Family::Q3, i));
        }
        for (i, info) in q4.iter().enumerate() {
            by_shell[info.shell].push((info.quartic, Family::Q4, i));
        }
        for shell in &mut by_shell {
            shell.sort_by_key(|&(quartic, _, _)| quartic);
        }

        tracing::debug!(
            "RE8 leader tables built: {} Q3 leaders, {} Q4 leaders",
            q3.len(),
            q4.len()
        );

        Self { q3, q4, by_shell }
    }

    /// Leaders of one family in index order
    pub fn family(&self, family: Family) -> &[LeaderInfo] {
        match family {
            Family::Q3 => &self.q3,
            Family::Q4 => &self.q4,
        }
    }

    /// Look up a leader by shell number and quartic signature
    pub fn lookup(&self, shell: usize, quartic: i64) -> Option<&LeaderInfo> {
        let entries = self.by_shell.get(shell)?;
        let pos = entries
            .binary_search_by_key(&quartic, |&(q, _, _)| q)
            .ok()?;
        let (_, family, index) = entries[pos];
        self.family(family).get(index)
    }

    /// Number of indices used by a family
    pub fn total(&self, family: Family) -> u32 {
        self.family(family).iter().map(|info| info.orbit_size).sum()
    }
}

/// Shared leader table
pub static LEADERS: Lazy<LeaderTable> = Lazy::new(LeaderTable::build);

/// Force construction of the leader tables
pub fn init_tables() {
    Lazy::force(&LEADERS);
}
