//! Shared helpers for unit tests: a naive O(n²) reference implementation and
//! deterministic random point clouds.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::boxes::{CellKind, SimulationBox};
use crate::types::Vector;

/// Minimum image squared distance between two (wrapped) points, scanning
/// every lattice translation in `{-1, 0, 1}^N`.
fn min_image_distance2<const N: usize>(
    bx: &SimulationBox<f64, N>,
    a: Vector<f64, N>,
    b: Vector<f64, N>,
) -> f64 {
    let mut min = (b - a).norm2();
    if bx.kind() == CellKind::NonPeriodic {
        return min;
    }
    for shift in bx.image_shifts() {
        let image = bx.lattice_image(b, shift);
        min = min.min((image - a).norm2());
    }
    return min;
}

/// All pairs of `points` within the box cutoff, computed by brute force.
/// Pairs are returned with `i < j` and sorted.
pub fn naive_pairs<const N: usize>(
    points: &[Vector<f64, N>],
    bx: &SimulationBox<f64, N>,
) -> Vec<(usize, usize, f64)> {
    let cutoff2 = bx.cutoff_squared();
    let wrapped = points.iter().map(|&p| bx.wrap(p)).collect::<Vec<_>>();

    let mut pairs = Vec::new();
    for i in 0..wrapped.len() {
        for j in (i + 1)..wrapped.len() {
            let d2 = min_image_distance2(bx, wrapped[i], wrapped[j]);
            if d2 <= cutoff2 {
                pairs.push((i, j, d2.sqrt()));
            }
        }
    }
    pairs.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
    return pairs;
}

/// All cross pairs between `x` and `y` within the box cutoff, computed by
/// brute force. Pairs `(i, j)` index `x` and `y` respectively.
pub fn naive_pairs_cross<const N: usize>(
    x: &[Vector<f64, N>],
    y: &[Vector<f64, N>],
    bx: &SimulationBox<f64, N>,
) -> Vec<(usize, usize, f64)> {
    let cutoff2 = bx.cutoff_squared();
    let x = x.iter().map(|&p| bx.wrap(p)).collect::<Vec<_>>();
    let y = y.iter().map(|&p| bx.wrap(p)).collect::<Vec<_>>();

    let mut pairs = Vec::new();
    for (i, &xi) in x.iter().enumerate() {
        for (j, &yj) in y.iter().enumerate() {
            let d2 = min_image_distance2(bx, xi, yj);
            if d2 <= cutoff2 {
                pairs.push((i, j, d2.sqrt()));
            }
        }
    }
    return pairs;
}

/// Normalize same-set pairs to `i < j` and sort them, so that outputs from
/// different traversal orders can be compared.
pub fn sorted_same_set(mut pairs: Vec<(usize, usize, f64)>) -> Vec<(usize, usize, f64)> {
    for pair in pairs.iter_mut() {
        if pair.0 > pair.1 {
            *pair = (pair.1, pair.0, pair.2);
        }
    }
    pairs.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
    return pairs;
}

/// `n` points uniformly distributed in `[0, sides[i])`, deterministic in
/// `seed`.
pub fn random_points<const N: usize>(
    n: usize,
    sides: [f64; N],
    seed: u64,
) -> Vec<Vector<f64, N>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let mut point = Vector::zero();
            for i in 0..N {
                point[i] = rng.gen_range(0.0..sides[i]);
            }
            point
        })
        .collect()
}
