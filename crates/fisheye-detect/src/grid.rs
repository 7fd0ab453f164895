//! Lattice growth over corner candidates.
//!
//! Starting from a seed, neighbour positions are predicted from a local basis
//! `(u, v)` estimated from already-labelled neighbours, so rows and columns may
//! bend under lens distortion. The labelled region must contain exactly one
//! complete `W × H` window (either orientation), which is then put into
//! canonical order.

use crate::{Candidate, DetectError, GridConfig};
use log::debug;
use nalgebra::Vector2;
use std::collections::{HashMap, VecDeque};

type V2 = Vector2<f32>;
type Label = (i32, i32);

const STEPS: [Label; 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
/// Neighbours considered when estimating the seed basis.
const SEED_NEIGHBOURS: usize = 8;
/// Largest `|cos|` between the two seed basis vectors.
const MAX_BASIS_COS: f32 = 0.5;

#[inline]
fn pos(c: &Candidate) -> V2 {
    V2::new(c.x, c.y)
}

/// Candidate indices keyed by integer lattice coordinates.
#[derive(Clone, Debug, Default)]
pub struct Lattice {
    pub labels: HashMap<Label, usize>,
}

impl Lattice {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Corners of the matched window in canonical row-major order.
#[derive(Clone, Debug)]
pub struct OrderedGrid {
    pub points: Vec<V2>,
    /// Distance from each corner to its nearest grid neighbour.
    pub spacing: Vec<f32>,
}

impl OrderedGrid {
    pub fn median_spacing(&self) -> f32 {
        let mut s = self.spacing.clone();
        s.sort_by(f32::total_cmp);
        s.get(s.len() / 2).copied().unwrap_or(0.0)
    }
}

/// Seed basis from the nearest neighbours of `seed`.
fn seed_basis(cands: &[Candidate], seed: usize) -> Option<(V2, V2)> {
    let p = pos(&cands[seed]);
    let mut near: Vec<(f32, V2)> = cands
        .iter()
        .enumerate()
        .filter(|(k, _)| *k != seed)
        .map(|(_, c)| {
            let d = pos(c) - p;
            (d.norm(), d)
        })
        .filter(|(n, _)| *n > 1.0)
        .collect();
    near.sort_by(|a, b| a.0.total_cmp(&b.0));
    near.truncate(SEED_NEIGHBOURS);

    let (nu, u) = *near.first()?;
    let v = near
        .iter()
        .skip(1)
        .find(|(nv, d)| (u.dot(d) / (nu * nv)).abs() < MAX_BASIS_COS)?
        .1;
    Some((u, v))
}

fn nearest(cands: &[Candidate], target: &V2) -> Option<(usize, f32)> {
    cands
        .iter()
        .enumerate()
        .map(|(k, c)| (k, (pos(c) - target).norm()))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

struct Growth<'a> {
    cands: &'a [Candidate],
    labels: HashMap<Label, usize>,
    basis: HashMap<Label, (V2, V2)>,
}

impl Growth<'_> {
    fn at(&self, l: Label) -> Option<V2> {
        self.labels.get(&l).map(|&k| pos(&self.cands[k]))
    }

    /// Finite-difference basis at `l`, falling back to the inherited one.
    fn local_basis(&self, l: Label) -> (V2, V2) {
        let (mut u, mut v) = self.basis[&l];
        let Some(p) = self.at(l) else {
            return (u, v);
        };
        let diff = |fwd: Label, back: Label| -> Option<V2> {
            match (self.at(fwd), self.at(back)) {
                (Some(f), Some(b)) => Some((f - b) * 0.5),
                (Some(f), None) => Some(f - p),
                (None, Some(b)) => Some(p - b),
                (None, None) => None,
            }
        };
        if let Some(du) = diff((l.0 + 1, l.1), (l.0 - 1, l.1)) {
            u = du;
        }
        if let Some(dv) = diff((l.0, l.1 + 1), (l.0, l.1 - 1)) {
            v = dv;
        }
        (u, v)
    }
}

/// Grow a lattice from candidate `seed`. Returns `None` if no basis can be
/// estimated at the seed.
pub fn grow_lattice(cands: &[Candidate], seed: usize, cfg: &GridConfig) -> Option<Lattice> {
    let (u0, v0) = seed_basis(cands, seed)?;
    let mut assigned = vec![false; cands.len()];
    let mut g = Growth {
        cands,
        labels: HashMap::from([((0, 0), seed)]),
        basis: HashMap::from([((0, 0), (u0, v0))]),
    };
    assigned[seed] = true;

    let mut queue = VecDeque::from([(0, 0)]);
    while let Some(l) = queue.pop_front() {
        let p = pos(&cands[g.labels[&l]]);
        let (u, v) = g.local_basis(l);
        for (di, dj) in STEPS {
            let next = (l.0 + di, l.1 + dj);
            if g.labels.contains_key(&next) {
                continue;
            }
            let step = u * di as f32 + v * dj as f32;
            let Some((k, dist)) = nearest(cands, &(p + step)) else {
                continue;
            };
            if assigned[k] || dist > cfg.tolerance * step.norm() {
                continue;
            }
            let q = pos(&cands[k]);
            let nu = if di != 0 { (q - p) * di as f32 } else { u };
            let nv = if dj != 0 { (q - p) * dj as f32 } else { v };
            assigned[k] = true;
            g.labels.insert(next, k);
            g.basis.insert(next, (nu, nv));
            queue.push_back(next);
        }
    }
    Some(Lattice { labels: g.labels })
}

/// Top-left label and `(cols, rows)` of a complete window.
type Window = (Label, (usize, usize));

/// The unique complete `w × h` (or `h × w`) window of `lattice`.
pub fn find_window(lattice: &Lattice, w: usize, h: usize) -> Result<Window, DetectError> {
    if lattice.is_empty() {
        return Err(DetectError::NotFound("empty lattice".into()));
    }
    let keys = lattice.labels.keys();
    let imin = keys.clone().map(|l| l.0).min().unwrap_or(0);
    let imax = keys.clone().map(|l| l.0).max().unwrap_or(0);
    let jmin = keys.clone().map(|l| l.1).min().unwrap_or(0);
    let jmax = keys.map(|l| l.1).max().unwrap_or(0);

    let mut shapes = vec![(w, h)];
    if w != h {
        shapes.push((h, w));
    }
    let mut found = Vec::new();
    for &(a, b) in &shapes {
        let (a_i, b_i) = (a as i32, b as i32);
        for i0 in imin..=(imax - a_i + 1) {
            for j0 in jmin..=(jmax - b_i + 1) {
                let complete = (0..b_i)
                    .all(|dj| (0..a_i).all(|di| lattice.labels.contains_key(&(i0 + di, j0 + dj))));
                if complete {
                    found.push(((i0, j0), (a, b)));
                }
            }
        }
    }

    match found.len() {
        1 => Ok(found[0]),
        0 => Err(DetectError::NotFound(format!(
            "no complete {w}x{h} window in a lattice of {} corners spanning {}x{}",
            lattice.len(),
            imax - imin + 1,
            jmax - jmin + 1
        ))),
        n => Err(DetectError::NotFound(format!(
            "ambiguous board: {n} complete {w}x{h} windows"
        ))),
    }
}

/// Put the window into row-major `w × h` order with a right-handed, rightward
/// i-direction.
pub fn order_window(
    cands: &[Candidate],
    lattice: &Lattice,
    window: Window,
    w: usize,
    h: usize,
) -> Result<OrderedGrid, DetectError> {
    let ((i0, j0), (a, b)) = window;
    let at = |ga: usize, gb: usize| -> Option<V2> {
        lattice
            .labels
            .get(&(i0 + ga as i32, j0 + gb as i32))
            .map(|&k| pos(&cands[k]))
    };

    // Maps from output (i, j) to window (a, b).
    type Sym = fn(usize, usize, usize, usize) -> (usize, usize);
    let same: [Sym; 4] = [
        |i, j, _, _| (i, j),
        |i, j, w, _| (w - 1 - i, j),
        |i, j, _, h| (i, h - 1 - j),
        |i, j, w, h| (w - 1 - i, h - 1 - j),
    ];
    let transposed: [Sym; 4] = [
        |i, j, _, _| (j, i),
        |i, j, _, h| (h - 1 - j, i),
        |i, j, w, _| (j, w - 1 - i),
        |i, j, w, h| (h - 1 - j, w - 1 - i),
    ];
    let mut syms: Vec<Sym> = Vec::new();
    if (a, b) == (w, h) {
        syms.extend(same);
    }
    if (a, b) == (h, w) {
        syms.extend(transposed);
    }

    let mut best: Option<((f32, f32), Vec<V2>)> = None;
    for sym in syms {
        let mut points = Vec::with_capacity(w * h);
        for j in 0..h {
            for i in 0..w {
                let (ga, gb) = sym(i, j, w, h);
                let p = at(ga, gb).ok_or_else(|| {
                    DetectError::NotFound("window lost a corner while ordering".into())
                })?;
                points.push(p);
            }
        }
        let idx = |i: usize, j: usize| j * w + i;
        let u: V2 = (0..h).map(|j| points[idx(w - 1, j)] - points[idx(0, j)]).sum();
        let v: V2 = (0..w).map(|i| points[idx(i, h - 1)] - points[idx(i, 0)]).sum();
        if u.x * v.y - u.y * v.x <= 0.0 {
            continue;
        }
        let score = (u.x / u.norm(), v.y / v.norm());
        let better = match &best {
            None => true,
            Some((s, _)) => {
                score.0 > s.0 + 1e-6 || ((score.0 - s.0).abs() <= 1e-6 && score.1 > s.1)
            }
        };
        if better {
            best = Some((score, points));
        }
    }

    let (_, points) =
        best.ok_or_else(|| DetectError::NotFound("degenerate grid orientation".into()))?;
    let spacing = (0..h)
        .flat_map(|j| (0..w).map(move |i| (i, j)))
        .map(|(i, j)| {
            let p = points[j * w + i];
            let mut nbrs = Vec::with_capacity(4);
            if i > 0 {
                nbrs.push(points[j * w + i - 1]);
            }
            if i + 1 < w {
                nbrs.push(points[j * w + i + 1]);
            }
            if j > 0 {
                nbrs.push(points[(j - 1) * w + i]);
            }
            if j + 1 < h {
                nbrs.push(points[(j + 1) * w + i]);
            }
            nbrs.iter()
                .map(|q| (q - p).norm())
                .fold(f32::INFINITY, f32::min)
        })
        .collect();
    Ok(OrderedGrid { points, spacing })
}

/// Candidate indices ordered by distance to the candidate centroid.
fn seeds_by_centrality(cands: &[Candidate]) -> Vec<usize> {
    let n = cands.len().max(1) as f32;
    let centroid: V2 = cands.iter().map(pos).sum::<V2>() / n;
    let mut idx: Vec<usize> = (0..cands.len()).collect();
    idx.sort_by(|&a, &b| {
        (pos(&cands[a]) - centroid)
            .norm()
            .total_cmp(&(pos(&cands[b]) - centroid).norm())
    });
    idx
}

/// Assemble and order a `w × h` grid from candidates.
pub fn assemble_grid(
    cands: &[Candidate],
    w: usize,
    h: usize,
    cfg: &GridConfig,
) -> Result<OrderedGrid, DetectError> {
    if cands.len() < w * h {
        return Err(DetectError::NotFound(format!(
            "{} candidates, {} corners expected",
            cands.len(),
            w * h
        )));
    }
    let mut last = DetectError::NotFound("no seed produced a lattice".into());
    for seed in seeds_by_centrality(cands).into_iter().take(cfg.max_seeds.max(1)) {
        let Some(lattice) = grow_lattice(cands, seed, cfg) else {
            continue;
        };
        debug!("seed {seed}: lattice of {} corners", lattice.len());
        match find_window(&lattice, w, h).and_then(|win| order_window(cands, &lattice, win, w, h)) {
            Ok(grid) => return Ok(grid),
            Err(err) => last = err,
        }
    }
    Err(last)
}
