//! Pairwise mapping: traverse all pairs of points within the cutoff and fold
//! a user function over them.
//!
//! The traversal visits, for every cell containing real points, the cell
//! itself and a fixed stencil of neighboring cells. Candidate pairs from a
//! neighboring cell are pruned by sorting its points along the axis between
//! the two cell centers: the projected separation is a lower bound on the
//! distance, so the inner loop can stop at the first point projecting
//! further than the cutoff.

use std::sync::atomic::{AtomicUsize, Ordering};

use log::info;
use rayon::prelude::*;

use crate::boxes::{CellKind, SimulationBox};
use crate::grid::{CellGrid, PairedGrid};
use crate::grid::{CellData, ProjectedPoint};
use crate::types::{Real, Vector};

/// Options for [`CellGrid::map_pairwise`] and friends
#[derive(Debug, Clone, Copy)]
pub struct MapOptions {
    /// traverse cell batches in parallel (default `true`)
    pub parallel: bool,
    /// log the completion of every batch
    pub show_progress: bool,
    /// number of traversal batches; `0` selects the rayon worker count
    pub nbatches: usize,
}

impl Default for MapOptions {
    fn default() -> MapOptions {
        MapOptions {
            parallel: true,
            show_progress: false,
            nbatches: 0,
        }
    }
}

/// Default merge of per-worker accumulators: numeric accumulators add up,
/// coordinate vectors add elementwise, `Vec` accumulators concatenate, and
/// tuples merge component by component.
///
/// Reducers run after all workers finished and their order is unspecified,
/// so any implementation must be commutative up to floating point rounding.
pub trait Reduce {
    #[must_use]
    fn reduce(self, other: Self) -> Self;
}

macro_rules! impl_reduce_for_numbers {
    ($($ty: ty),*) => {
        $(
            impl Reduce for $ty {
                fn reduce(self, other: $ty) -> $ty {
                    self + other
                }
            }
        )*
    };
}

impl_reduce_for_numbers!(f32, f64, i32, i64, u32, u64, usize);

impl<T: Real, const N: usize> Reduce for Vector<T, N> {
    fn reduce(self, other: Vector<T, N>) -> Vector<T, N> {
        self + other
    }
}

impl<U> Reduce for Vec<U> {
    fn reduce(mut self, mut other: Vec<U>) -> Vec<U> {
        self.append(&mut other);
        return self;
    }
}

impl<A: Reduce, B: Reduce> Reduce for (A, B) {
    fn reduce(self, other: (A, B)) -> (A, B) {
        (self.0.reduce(other.0), self.1.reduce(other.1))
    }
}

impl<T: Real, const N: usize> CellGrid<T, N> {
    /// Fold `f` over every unordered pair of points within the cutoff.
    ///
    /// The function receives the coordinates of both points, their input
    /// indices, the *squared* distance, and the accumulator; it must return
    /// the new accumulator value. Per-worker accumulators start as clones of
    /// `init` (so `init` should be the neutral element of the reduction) and
    /// are merged with [`Reduce`].
    pub fn map_pairwise<A, F>(
        &self,
        f: F,
        init: A,
        bx: &SimulationBox<T, N>,
        options: MapOptions,
    ) -> A
    where
        A: Reduce + Clone + Send,
        F: Fn(Vector<T, N>, Vector<T, N>, usize, usize, T, A) -> A + Sync,
    {
        self.map_pairwise_reduce(f, init, bx, Reduce::reduce, options)
    }

    /// Same as [`CellGrid::map_pairwise`] with an explicit reducer combining
    /// two accumulators.
    #[time_graph::instrument(name = "CellGrid::map_pairwise")]
    pub fn map_pairwise_reduce<A, F, R>(
        &self,
        f: F,
        init: A,
        bx: &SimulationBox<T, N>,
        reduce: R,
        options: MapOptions,
    ) -> A
    where
        A: Clone + Send,
        F: Fn(Vector<T, N>, Vector<T, N>, usize, usize, T, A) -> A + Sync,
        R: Fn(A, A) -> A,
    {
        let nbatches = traverse_batches(options, self.real_cell_slots().len());
        if nbatches <= 1 {
            return match bx.kind() {
                CellKind::Triclinic => self.map_serial::<A, F, true>(&f, init, bx),
                _ => self.map_serial::<A, F, false>(&f, init, bx),
            };
        }

        let mut accumulators: Vec<Option<A>> =
            (0..nbatches).map(|_| Some(init.clone())).collect();
        match bx.kind() {
            CellKind::Triclinic => {
                self.map_batches::<A, F, true>(&f, &mut accumulators, bx, options);
            }
            _ => {
                self.map_batches::<A, F, false>(&f, &mut accumulators, bx, options);
            }
        }

        return accumulators
            .into_iter()
            .map(|acc| acc.expect("accumulator slot is empty"))
            .reduce(reduce)
            .unwrap_or(init);
    }

    /// Same as [`CellGrid::map_pairwise`], but folding into caller-provided
    /// per-worker accumulators instead of cloning an initial value. The
    /// number of accumulators fixes the number of batches; the caller merges
    /// them afterwards. This is the entry point to use when the accumulators
    /// own buffers that should be reused across calls.
    pub fn map_pairwise_into<A, F>(
        &self,
        f: F,
        accumulators: &mut [A],
        bx: &SimulationBox<T, N>,
        options: MapOptions,
    ) where
        A: Default + Send,
        F: Fn(Vector<T, N>, Vector<T, N>, usize, usize, T, A) -> A + Sync,
    {
        assert!(!accumulators.is_empty(), "need at least one accumulator");

        if accumulators.len() == 1 || !options.parallel {
            let acc = std::mem::take(&mut accumulators[0]);
            accumulators[0] = match bx.kind() {
                CellKind::Triclinic => self.map_serial::<A, F, true>(&f, acc, bx),
                _ => self.map_serial::<A, F, false>(&f, acc, bx),
            };
            return;
        }

        let mut slots: Vec<Option<A>> = accumulators
            .iter_mut()
            .map(|acc| Some(std::mem::take(acc)))
            .collect();
        match bx.kind() {
            CellKind::Triclinic => self.map_batches::<A, F, true>(&f, &mut slots, bx, options),
            _ => self.map_batches::<A, F, false>(&f, &mut slots, bx, options),
        }
        for (result, slot) in accumulators.iter_mut().zip(slots) {
            *result = slot.expect("accumulator slot is empty");
        }
    }

    fn map_serial<A, F, const TRICLINIC: bool>(
        &self,
        f: &F,
        mut acc: A,
        bx: &SimulationBox<T, N>,
    ) -> A
    where
        F: Fn(Vector<T, N>, Vector<T, N>, usize, usize, T, A) -> A,
    {
        let mut scratch = self.scratch();
        for &slot in self.real_cell_slots() {
            acc = map_cell::<T, A, F, N, TRICLINIC>(bx, self, self.cell(slot), &mut scratch, f, acc);
        }
        return acc;
    }

    fn map_batches<A, F, const TRICLINIC: bool>(
        &self,
        f: &F,
        accumulators: &mut [Option<A>],
        bx: &SimulationBox<T, N>,
        options: MapOptions,
    ) where
        A: Send,
        F: Fn(Vector<T, N>, Vector<T, N>, usize, usize, T, A) -> A + Sync,
    {
        let slots = self.real_cell_slots();
        let nbatches = accumulators.len();
        let completed = AtomicUsize::new(0);

        accumulators.par_iter_mut().enumerate().for_each(|(batch, slot_acc)| {
            let mut acc = slot_acc.take().expect("accumulator slot is empty");
            let (start, end) = batch_range(batch, nbatches, slots.len());
            {
                let mut scratch = self.scratch();
                for &slot in &slots[start..end] {
                    acc = map_cell::<T, A, F, N, TRICLINIC>(
                        bx, self, self.cell(slot), &mut scratch, f, acc,
                    );
                }
            }
            *slot_acc = Some(acc);

            if options.show_progress {
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                info!("pairwise map: {}/{} batches done", done, nbatches);
            }
        });
    }
}

/// Emit all pairs with the first point real and inside `cell`: first the
/// pairs internal to the cell, then the pairs with each cell of the stencil.
fn map_cell<T, A, F, const N: usize, const TRICLINIC: bool>(
    bx: &SimulationBox<T, N>,
    grid: &CellGrid<T, N>,
    cell: &CellData<T, N>,
    scratch: &mut Vec<ProjectedPoint<T, N>>,
    f: &F,
    mut acc: A,
) -> A
where
    T: Real,
    F: Fn(Vector<T, N>, Vector<T, N>, usize, usize, T, A) -> A,
{
    let cutoff = bx.cutoff();
    let cutoff2 = bx.cutoff_squared();
    let points = cell.points();

    // pairs within the current cell: each chain position pair is visited
    // once, with the first point real. In triclinic grids cells can contain
    // ghosts whose mirrored pairing appears in another cell, so only the
    // strictly index-ordered occurrence is kept.
    for i in 0..cell.n_real {
        let pi = points[i];
        for &pj in &points[(i + 1)..] {
            if TRICLINIC && pi.index >= pj.index {
                continue;
            }
            let d2 = (pj.coords - pi.coords).norm2();
            if d2 <= cutoff2 {
                acc = f(pi.coords, pj.coords, pi.index, pj.index, d2, acc);
            }
        }
    }

    // pairs with the neighboring cells. The forward half stencil visits
    // every unordered pair of cells once; the triclinic full stencil visits
    // both orders and keeps index-ordered emissions only.
    let stencil = if TRICLINIC { bx.stencil_full() } else { bx.stencil_half() };
    for offset in stencil {
        let mut neighbor = [0usize; N];
        for k in 0..N {
            let index = cell.cartesian_index[k] as isize + offset[k] as isize;
            debug_assert!(
                index >= 0 && index < bx.cells_per_dimension()[k] as isize,
                "neighbor stencil reached outside of the grid",
            );
            neighbor[k] = index as usize;
        }

        let neighbor_slot = match grid.cell_slot(bx.linear_index(neighbor)) {
            Some(slot) => slot,
            None => continue,
        };
        let neighbor_cell = grid.cell(neighbor_slot);

        // project the neighbor cell points on the axis between the two cell
        // centers and sort; distances along this axis lower-bound the full
        // distance
        let delta = neighbor_cell.center - cell.center;
        let axis = delta / delta.norm();
        scratch.clear();
        for q in neighbor_cell.points() {
            scratch.push(ProjectedPoint {
                index: q.index,
                x_proj: (q.coords - cell.center).dot(&axis),
                coords: q.coords,
            });
        }
        insertion_sort_by_projection(scratch);

        for i in 0..cell.n_real {
            let pi = points[i];
            let xi = (pi.coords - cell.center).dot(&axis);
            for q in scratch.iter() {
                if q.x_proj - xi > cutoff {
                    break;
                }
                if TRICLINIC && pi.index >= q.index {
                    continue;
                }
                let d2 = (q.coords - pi.coords).norm2();
                if d2 <= cutoff2 {
                    acc = f(pi.coords, q.coords, pi.index, q.index, d2, acc);
                }
            }
        }
    }

    return acc;
}

impl<T: Real, const N: usize> PairedGrid<T, N> {
    /// Fold `f` over every pair with the first point in the first input set
    /// and the second point in the second input set, within the cutoff. See
    /// [`CellGrid::map_pairwise`] for the accumulator conventions.
    pub fn map_pairwise<A, F>(
        &self,
        f: F,
        init: A,
        bx: &SimulationBox<T, N>,
        options: MapOptions,
    ) -> A
    where
        A: Reduce + Clone + Send,
        F: Fn(Vector<T, N>, Vector<T, N>, usize, usize, T, A) -> A + Sync,
    {
        self.map_pairwise_reduce(f, init, bx, Reduce::reduce, options)
    }

    /// Same as [`PairedGrid::map_pairwise`] with an explicit reducer.
    #[time_graph::instrument(name = "PairedGrid::map_pairwise")]
    pub fn map_pairwise_reduce<A, F, R>(
        &self,
        f: F,
        init: A,
        bx: &SimulationBox<T, N>,
        reduce: R,
        options: MapOptions,
    ) -> A
    where
        A: Clone + Send,
        F: Fn(Vector<T, N>, Vector<T, N>, usize, usize, T, A) -> A + Sync,
        R: Fn(A, A) -> A,
    {
        let n_reference = self.reference().len();
        let nbatches = traverse_batches(options, n_reference);
        if nbatches <= 1 {
            return self.map_reference_range(&f, init, bx, 0, n_reference);
        }

        let mut accumulators: Vec<Option<A>> =
            (0..nbatches).map(|_| Some(init.clone())).collect();
        self.map_reference_batches(&f, &mut accumulators, bx, options);

        return accumulators
            .into_iter()
            .map(|acc| acc.expect("accumulator slot is empty"))
            .reduce(reduce)
            .unwrap_or(init);
    }

    /// Same as [`CellGrid::map_pairwise_into`], for cross-set traversal.
    pub fn map_pairwise_into<A, F>(
        &self,
        f: F,
        accumulators: &mut [A],
        bx: &SimulationBox<T, N>,
        options: MapOptions,
    ) where
        A: Default + Send,
        F: Fn(Vector<T, N>, Vector<T, N>, usize, usize, T, A) -> A + Sync,
    {
        assert!(!accumulators.is_empty(), "need at least one accumulator");

        if accumulators.len() == 1 || !options.parallel {
            let acc = std::mem::take(&mut accumulators[0]);
            accumulators[0] = self.map_reference_range(&f, acc, bx, 0, self.reference().len());
            return;
        }

        let mut slots: Vec<Option<A>> = accumulators
            .iter_mut()
            .map(|acc| Some(std::mem::take(acc)))
            .collect();
        self.map_reference_batches(&f, &mut slots, bx, options);
        for (result, slot) in accumulators.iter_mut().zip(slots) {
            *result = slot.expect("accumulator slot is empty");
        }
    }

    fn map_reference_batches<A, F>(
        &self,
        f: &F,
        accumulators: &mut [Option<A>],
        bx: &SimulationBox<T, N>,
        options: MapOptions,
    ) where
        A: Send,
        F: Fn(Vector<T, N>, Vector<T, N>, usize, usize, T, A) -> A + Sync,
    {
        let n_reference = self.reference().len();
        let nbatches = accumulators.len();
        let completed = AtomicUsize::new(0);

        accumulators.par_iter_mut().enumerate().for_each(|(batch, slot_acc)| {
            let mut acc = slot_acc.take().expect("accumulator slot is empty");
            let (start, end) = batch_range(batch, nbatches, n_reference);
            acc = self.map_reference_range(f, acc, bx, start, end);
            *slot_acc = Some(acc);

            if options.show_progress {
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                info!("pairwise map: {}/{} batches done", done, nbatches);
            }
        });
    }

    /// Scan the cell of each reference point in `start..end` together with
    /// its full neighborhood in the target grid. The two sets are disjoint,
    /// so every point of every scanned cell is a candidate, with no ordering
    /// constraint.
    fn map_reference_range<A, F>(
        &self,
        f: &F,
        mut acc: A,
        bx: &SimulationBox<T, N>,
        start: usize,
        end: usize,
    ) -> A
    where
        F: Fn(Vector<T, N>, Vector<T, N>, usize, usize, T, A) -> A,
    {
        for i in start..end {
            let point = self.reference()[i];
            let cartesian = bx.cell_cartesian_core(&point);

            acc = self.scan_target_cell(f, acc, bx, point, i, bx.linear_index(cartesian));
            for offset in bx.stencil_full() {
                let mut neighbor = [0usize; N];
                for k in 0..N {
                    let index = cartesian[k] as isize + offset[k] as isize;
                    debug_assert!(
                        index >= 0 && index < bx.cells_per_dimension()[k] as isize,
                        "neighbor stencil reached outside of the grid",
                    );
                    neighbor[k] = index as usize;
                }
                acc = self.scan_target_cell(f, acc, bx, point, i, bx.linear_index(neighbor));
            }
        }
        return acc;
    }

    #[inline]
    fn scan_target_cell<A, F>(
        &self,
        f: &F,
        mut acc: A,
        bx: &SimulationBox<T, N>,
        point: Vector<T, N>,
        index: usize,
        linear: usize,
    ) -> A
    where
        F: Fn(Vector<T, N>, Vector<T, N>, usize, usize, T, A) -> A,
    {
        let grid = self.target_grid();
        let cutoff2 = bx.cutoff_squared();

        if let Some(slot) = grid.cell_slot(linear) {
            for q in grid.cell(slot).points() {
                let d2 = (q.coords - point).norm2();
                if d2 <= cutoff2 {
                    // with swapped roles the grid holds the first input set:
                    // emit the original argument order
                    acc = if self.swapped() {
                        f(q.coords, point, q.index, index, d2, acc)
                    } else {
                        f(point, q.coords, index, q.index, d2, acc)
                    };
                }
            }
        }
        return acc;
    }
}

fn traverse_batches(options: MapOptions, n_items: usize) -> usize {
    if !options.parallel || n_items == 0 {
        return 1;
    }
    if options.nbatches > 0 {
        return options.nbatches;
    }
    return rayon::current_num_threads();
}

/// Contiguous range of the `batch`-th of `nbatches` batches over `len` items
fn batch_range(batch: usize, nbatches: usize, len: usize) -> (usize, usize) {
    let start = batch * len / nbatches;
    let end = (batch + 1) * len / nbatches;
    return (start, end);
}

/// Sort by ascending projection. The scratch arrays are small and often
/// nearly sorted already.
fn insertion_sort_by_projection<T: Real, const N: usize>(points: &mut [ProjectedPoint<T, N>]) {
    for i in 1..points.len() {
        let mut j = i;
        while j > 0 && points[j - 1].x_proj > points[j].x_proj {
            points.swap(j - 1, j);
            j -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{naive_pairs, naive_pairs_cross, random_points, sorted_same_set};
    use crate::{Matrix, SimulationBox};
    use approx::assert_ulps_eq;

    fn collect_pairs<const N: usize>(
        grid: &CellGrid<f64, N>,
        bx: &SimulationBox<f64, N>,
        options: MapOptions,
    ) -> Vec<(usize, usize, f64)> {
        grid.map_pairwise(
            |_, _, i, j, d2, mut pairs: Vec<(usize, usize, f64)>| {
                pairs.push((i, j, d2.sqrt()));
                pairs
            },
            Vec::new(),
            bx,
            options,
        )
    }

    fn serial() -> MapOptions {
        MapOptions { parallel: false, ..Default::default() }
    }

    #[test]
    fn pair_across_periodic_boundary() {
        let bx = SimulationBox::orthorhombic([10.0, 10.0, 10.0], 2.0).unwrap();
        let points = [
            Vector::new([0.5, 5.0, 5.0]),
            Vector::new([9.5, 5.0, 5.0]),
        ];
        let grid = CellGrid::new(&points, &bx);

        let pairs = collect_pairs(&grid, &bx, serial());
        assert_eq!(pairs.len(), 1);
        let (i, j, distance) = pairs[0];
        assert_eq!((i.min(j), i.max(j)), (0, 1));
        assert_ulps_eq!(distance, 1.0);
    }

    #[test]
    fn no_pair_above_cutoff() {
        let bx = SimulationBox::orthorhombic([10.0, 10.0, 10.0], 2.0).unwrap();
        let points = [
            Vector::new([0.5, 5.0, 5.0]),
            Vector::new([4.5, 5.0, 5.0]),
        ];
        let grid = CellGrid::new(&points, &bx);
        assert!(collect_pairs(&grid, &bx, serial()).is_empty());
    }

    #[test]
    fn energy_sum_matches_naive() {
        let points = random_points(400, [10.0, 10.0, 10.0], 7);
        let bx = SimulationBox::orthorhombic([10.0, 10.0, 10.0], 2.0).unwrap();
        let grid = CellGrid::new(&points, &bx);

        // an inverse-square "energy"
        let energy = grid.map_pairwise(
            |_, _, _, _, d2, acc: f64| acc + 1.0 / d2,
            0.0,
            &bx,
            serial(),
        );

        let mut expected = 0.0;
        for &(_, _, d) in &naive_pairs(&points, &bx) {
            expected += 1.0 / (d * d);
        }
        // the two sums accumulate in different orders
        approx::assert_relative_eq!(energy, expected, max_relative = 1e-10);
    }

    #[test]
    fn parallel_matches_serial() {
        let points = random_points(600, [10.0, 10.0, 10.0], 13);
        let bx = SimulationBox::orthorhombic([10.0, 10.0, 10.0], 2.0).unwrap();
        let grid = CellGrid::new(&points, &bx);

        let serial_pairs = sorted_same_set(collect_pairs(&grid, &bx, serial()));
        let parallel_pairs = sorted_same_set(collect_pairs(&grid, &bx, MapOptions {
            parallel: true,
            nbatches: 5,
            ..Default::default()
        }));

        assert_eq!(serial_pairs.len(), parallel_pairs.len());
        for (a, b) in serial_pairs.iter().zip(&parallel_pairs) {
            assert_eq!((a.0, a.1), (b.0, b.1));
            assert_ulps_eq!(a.2, b.2);
        }
    }

    #[test]
    fn triclinic_matches_naive() {
        let matrix = Matrix::new([
            [10.0, 0.0, 0.5],
            [0.5, 10.0, 0.0],
            [0.0, 0.0, 10.0],
        ]);
        let bx = SimulationBox::triclinic(matrix, 2.0).unwrap();
        let points = random_points(300, [10.0, 10.0, 10.0], 29);
        let grid = CellGrid::new(&points, &bx);

        let pairs = sorted_same_set(collect_pairs(&grid, &bx, serial()));
        let expected = sorted_same_set(naive_pairs(&points, &bx));

        assert_eq!(pairs.len(), expected.len());
        for (a, b) in pairs.iter().zip(&expected) {
            assert_eq!((a.0, a.1), (b.0, b.1));
            assert_ulps_eq!(a.2, b.2, max_ulps = 64);
        }
    }

    #[test]
    fn two_dimensional_matches_naive() {
        let bx = SimulationBox::orthorhombic([8.0, 8.0], 1.0).unwrap();
        let points = random_points(200, [8.0, 8.0], 3);
        let grid = CellGrid::new(&points, &bx);

        let pairs = sorted_same_set(collect_pairs(&grid, &bx, serial()));
        let expected = sorted_same_set(naive_pairs(&points, &bx));

        assert_eq!(pairs.len(), expected.len());
        for (a, b) in pairs.iter().zip(&expected) {
            assert_eq!((a.0, a.1), (b.0, b.1));
        }
    }

    #[test]
    fn cross_set_matches_naive() {
        let x = random_points(120, [10.0, 10.0, 10.0], 17);
        let y = random_points(350, [10.0, 10.0, 10.0], 19);
        let bx = SimulationBox::orthorhombic([10.0, 10.0, 10.0], 1.5).unwrap();

        for autoswap in [false, true] {
            let paired = PairedGrid::new(&x, &y, &bx, autoswap);
            let mut pairs = paired.map_pairwise(
                |_, _, i, j, d2, mut acc: Vec<(usize, usize, f64)>| {
                    acc.push((i, j, d2.sqrt()));
                    acc
                },
                Vec::new(),
                &bx,
                serial(),
            );
            pairs.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

            let mut expected = naive_pairs_cross(&x, &y, &bx);
            expected.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

            assert_eq!(pairs.len(), expected.len(), "autoswap = {}", autoswap);
            for (a, b) in pairs.iter().zip(&expected) {
                assert_eq!((a.0, a.1), (b.0, b.1));
                assert_ulps_eq!(a.2, b.2, max_ulps = 64);
            }
        }
    }

    #[test]
    fn empty_input_yields_init() {
        let points: Vec<Vector<f64, 3>> = Vec::new();
        let bx = SimulationBox::non_periodic(&points, 1.0).unwrap();
        let grid = CellGrid::new(&points, &bx);

        let count = grid.map_pairwise(
            |_, _, _, _, _, acc: usize| acc + 1,
            0,
            &bx,
            MapOptions::default(),
        );
        assert_eq!(count, 0);
    }

    #[test]
    fn map_into_uses_all_workers() {
        let points = random_points(500, [10.0, 10.0, 10.0], 23);
        let bx = SimulationBox::orthorhombic([10.0, 10.0, 10.0], 2.0).unwrap();
        let grid = CellGrid::new(&points, &bx);

        let mut counts = vec![0usize; 4];
        grid.map_pairwise_into(
            |_, _, _, _, _, acc: usize| acc + 1,
            &mut counts,
            &bx,
            MapOptions { parallel: true, nbatches: 4, ..Default::default() },
        );
        let total: usize = counts.iter().sum();
        assert_eq!(total, naive_pairs(&points, &bx).len());
    }

    #[test]
    fn reduce_defaults() {
        assert_eq!(1.5_f64.reduce(2.5), 4.0);
        assert_eq!(3_usize.reduce(4), 7);
        assert_eq!(vec![1, 2].reduce(vec![3]), vec![1, 2, 3]);
        assert_eq!((1.0_f64, 2_usize).reduce((2.0, 3)), (3.0, 5));

        let a: Vector<f64, 3> = Vector::new([1.0, 2.0, 3.0]);
        let b = Vector::new([0.5, 0.5, 0.5]);
        assert_eq!(a.reduce(b), Vector::new([1.5, 2.5, 3.5]));
    }

    #[test]
    fn insertion_sort() {
        let mut points: Vec<ProjectedPoint<f64, 3>> = [3.0, -1.0, 2.0, 0.0]
            .iter()
            .enumerate()
            .map(|(index, &x_proj)| ProjectedPoint {
                index,
                x_proj,
                coords: Vector::zero(),
            })
            .collect();
        insertion_sort_by_projection(&mut points);
        let sorted = points.iter().map(|p| p.x_proj).collect::<Vec<_>>();
        assert_eq!(sorted, [-1.0, 0.0, 2.0, 3.0]);
    }
}
