//! Absorption of one or more fixed-effect dimensions by alternating
//! projections.
//!
//! One dimension is removed exactly in a single demeaning pass. Two or more
//! dimensions alternate group-mean sweeps (with an Irons–Tuck Δ² step every
//! third sweep) until every group mean is below the tolerance.
//!
//! # References
//!
//! - Guimarães & Portugal (2010), "A simple feasible procedure to fit models
//!   with high-dimensional fixed effects." *Stata Journal*.
//! - Correia (2017), "Linear Models with High-Dimensional Fixed Effects."

use std::collections::HashSet;

use sa_core::{Error, Result};

/// Convergence tolerance (L∞ norm of group means).
pub const ABSORB_TOL: f64 = 1e-8;

/// Sweep budget for two or more dimensions.
pub const ABSORB_MAX_SWEEPS: usize = 10_000;

/// Fixed-effect dimensions of one estimation sample.
#[derive(Debug, Clone)]
pub struct FixedEffects {
    n: usize,
    /// `codes[d][i]` is the level of observation `i` in dimension `d`.
    codes: Vec<Vec<usize>>,
    /// `members[d][g]` lists the observations in level `g` of dimension `d`.
    members: Vec<Vec<Vec<usize>>>,
    tol: f64,
    max_sweeps: usize,
}

impl FixedEffects {
    /// Build from dense 0-based level codes, one vector per dimension.
    pub fn new(codes: Vec<Vec<usize>>) -> Result<Self> {
        let n = match codes.first() {
            Some(c) if !c.is_empty() => c.len(),
            Some(_) => return Err(Error::Validation("fixed effects need at least one observation".into())),
            None => return Err(Error::Validation("at least one fixed-effect dimension required".into())),
        };
        if let Some((d, c)) = codes.iter().enumerate().find(|(_, c)| c.len() != n) {
            return Err(Error::Validation(format!(
                "fixed-effect dimension {} has length {}, expected {}",
                d,
                c.len(),
                n
            )));
        }

        let members = codes
            .iter()
            .map(|c| {
                let levels = c.iter().copied().max().map_or(0, |m| m + 1);
                let mut idx: Vec<Vec<usize>> = vec![Vec::new(); levels];
                for (i, &g) in c.iter().enumerate() {
                    idx[g].push(i);
                }
                idx
            })
            .collect();

        Ok(Self { n, codes, members, tol: ABSORB_TOL, max_sweeps: ABSORB_MAX_SWEEPS })
    }

    /// Number of dimensions.
    pub fn n_dimensions(&self) -> usize {
        self.codes.len()
    }

    /// Non-empty levels per dimension.
    pub fn n_levels(&self) -> Vec<usize> {
        self.members.iter().map(|m| m.iter().filter(|g| !g.is_empty()).count()).collect()
    }

    /// Remove every dimension's group means from `v`.
    pub fn absorb(&self, v: &[f64]) -> Result<Vec<f64>> {
        if v.len() != self.n {
            return Err(Error::Validation(format!("vector length ({}) != n ({})", v.len(), self.n)));
        }
        let mut r = v.to_vec();
        if self.codes.len() == 1 {
            self.demean(&mut r, 0);
            return Ok(r);
        }

        let mut r0 = vec![0.0_f64; self.n];
        let mut r1 = vec![0.0_f64; self.n];
        for sweep in 0..self.max_sweeps {
            match sweep % 3 {
                0 => r0.copy_from_slice(&r),
                1 => r1.copy_from_slice(&r),
                _ => irons_tuck(&mut r, &r1, &r0),
            }
            for d in 0..self.codes.len() {
                self.demean(&mut r, d);
            }
            if self.max_abs_group_mean(&r) < self.tol {
                return Ok(r);
            }
        }
        log::warn!(
            "fixed-effect absorption did not reach tolerance {:e} after {} sweeps",
            self.tol,
            self.max_sweeps
        );
        Ok(r)
    }

    /// Degrees of freedom consumed by the absorbed effects beyond the
    /// intercept the caller keeps in its design.
    ///
    /// One dimension: `levels − 1`. Two: `levels_0 + levels_1 − components − 1`
    /// with `components` taken over the bipartite level graph. More:
    /// `Σ levels − dimensions`.
    pub fn absorbed_df(&self) -> usize {
        let total: usize = self.n_levels().iter().sum();
        let redundant = match self.codes.len() {
            1 => 1,
            2 => self.connected_components() + 1,
            d => d,
        };
        total.saturating_sub(redundant)
    }

    fn demean(&self, v: &mut [f64], d: usize) {
        for group in self.members[d].iter().filter(|g| !g.is_empty()) {
            let mean = group.iter().map(|&i| v[i]).sum::<f64>() / group.len() as f64;
            for &i in group {
                v[i] -= mean;
            }
        }
    }

    fn max_abs_group_mean(&self, v: &[f64]) -> f64 {
        self.members
            .iter()
            .flatten()
            .filter(|g| !g.is_empty())
            .map(|g| (g.iter().map(|&i| v[i]).sum::<f64>() / g.len() as f64).abs())
            .fold(0.0, f64::max)
    }

    /// Union-find over the (dimension 0, dimension 1) level graph.
    fn connected_components(&self) -> usize {
        let n0 = self.members[0].len();
        let n1 = self.members[1].len();
        let mut parent: Vec<usize> = (0..n0 + n1).collect();
        let mut rank = vec![0u8; n0 + n1];
        for i in 0..self.n {
            uf_union(&mut parent, &mut rank, self.codes[0][i], n0 + self.codes[1][i]);
        }

        let mut roots = HashSet::new();
        for i in 0..self.n {
            roots.insert(uf_find(&mut parent, self.codes[0][i]));
        }
        roots.len()
    }
}

/// Vector Δ² step `x2 − α (x2 − x1)`. Weights sum to one, so the iterate stays
/// in the affine space of the projections.
fn irons_tuck(x2: &mut [f64], x1: &[f64], x0: &[f64]) {
    let (mut num, mut den) = (0.0, 0.0);
    for i in 0..x2.len() {
        let d1 = x2[i] - x1[i];
        let d2 = x2[i] - 2.0 * x1[i] + x0[i];
        num += d1 * d2;
        den += d2 * d2;
    }
    if den <= 1e-300 {
        return;
    }
    let alpha = num / den;
    for i in 0..x2.len() {
        x2[i] -= alpha * (x2[i] - x1[i]);
    }
}

fn uf_find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

fn uf_union(parent: &mut [usize], rank: &mut [u8], a: usize, b: usize) {
    let ra = uf_find(parent, a);
    let rb = uf_find(parent, b);
    if ra == rb {
        return;
    }
    match rank[ra].cmp(&rank[rb]) {
        std::cmp::Ordering::Less => parent[ra] = rb,
        std::cmp::Ordering::Greater => parent[rb] = ra,
        std::cmp::Ordering::Equal => {
            parent[rb] = ra;
            rank[ra] += 1;
        }
    }
}
