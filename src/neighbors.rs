//! Neighbor lists: collect all pairs of points within a cutoff as `(i, j,
//! distance)` triples.
//!
//! [`neighborlist`] and [`neighborlist_pair`] are one-shot entry points. For
//! repeated evaluations over moving points, [`InPlaceNeighborList`] keeps the
//! box, the cell grid, the threaded build scratch and the output buffers
//! alive between calls, reaching a zero-allocation steady state once warm.

use log::warn;
use rayon::prelude::*;

use crate::boxes::{limits, CellSpec, Limits, SimulationBox};
use crate::grid::{BuildOptions, BuildScratch, CellGrid, PairedGrid};
use crate::map::MapOptions;
use crate::types::{cast, Real, Vector};
use crate::Error;

/// Options for neighbor list computations
#[derive(Debug, Clone, Copy)]
pub struct NeighborListOptions {
    /// build and traverse in parallel (default `true`)
    pub parallel: bool,
    /// log the completion of every traversal batch
    pub show_progress: bool,
    /// for two-set queries, allow putting the smaller set in the reference
    /// role regardless of the argument order (default `true`)
    pub autoswap: bool,
    /// number of (build, traverse) batches, `0` meaning automatic
    pub nbatches: (usize, usize),
}

impl Default for NeighborListOptions {
    fn default() -> NeighborListOptions {
        NeighborListOptions {
            parallel: true,
            show_progress: false,
            autoswap: true,
            nbatches: (0, 0),
        }
    }
}

enum GridState<T: Real, const N: usize> {
    Single(CellGrid<T, N>),
    Paired(PairedGrid<T, N>),
}

/// A neighbor list computation with all buffers retained across updates.
///
/// Typical use: create once, then alternate `update` with new coordinates
/// and `compute` to get the pairs. After the first few calls, updates with
/// same-sized inputs perform no heap allocation.
pub struct InPlaceNeighborList<T: Real, const N: usize> {
    bx: SimulationBox<T, N>,
    /// whether the box was created from an explicit cell; if not, it is
    /// non-periodic and follows the point coordinates on update
    explicit_cell: bool,
    state: GridState<T, N>,
    build_scratch: BuildScratch<T, N>,
    /// per-worker pair buffers, reused across calls
    worker_pairs: Vec<Vec<(usize, usize, T)>>,
    /// merged output, reused across calls
    output: Vec<(usize, usize, T)>,
    options: NeighborListOptions,
}

impl<T: Real, const N: usize> InPlaceNeighborList<T, N> {
    /// Create a neighbor list over a single set of points. Without an
    /// explicit `cell`, the box is non-periodic and derived from the point
    /// coordinates.
    pub fn new(
        points: &[Vector<T, N>],
        cutoff: T,
        cell: Option<CellSpec<T, N>>,
        options: NeighborListOptions,
    ) -> Result<InPlaceNeighborList<T, N>, Error> {
        let bx = make_box(limits(points), cutoff, cell)?;
        let mut system = InPlaceNeighborList {
            state: GridState::Single(CellGrid::empty(&bx)),
            explicit_cell: cell.is_some(),
            bx,
            build_scratch: BuildScratch::new(),
            worker_pairs: Vec::new(),
            output: Vec::new(),
            options,
        };
        system.rebuild_single(points);
        return Ok(system);
    }

    /// Create a neighbor list over the cross pairs between two sets of
    /// points.
    pub fn new_pair(
        x: &[Vector<T, N>],
        y: &[Vector<T, N>],
        cutoff: T,
        cell: Option<CellSpec<T, N>>,
        options: NeighborListOptions,
    ) -> Result<InPlaceNeighborList<T, N>, Error> {
        let bx = make_box(merged_limits(x, y), cutoff, cell)?;
        let mut system = InPlaceNeighborList {
            state: GridState::Paired(PairedGrid::empty(&bx)),
            explicit_cell: cell.is_some(),
            bx,
            build_scratch: BuildScratch::new(),
            worker_pairs: Vec::new(),
            output: Vec::new(),
            options,
        };
        system.rebuild_paired(x, y);
        return Ok(system);
    }

    /// Update the point coordinates, and optionally the cutoff and the cell,
    /// rebuilding the grid. The box is reconstructed only when a supplied
    /// parameter differs from the current one; all buffers are preserved.
    pub fn update(
        &mut self,
        points: &[Vector<T, N>],
        cutoff: Option<T>,
        cell: Option<CellSpec<T, N>>,
    ) -> Result<(), Error> {
        assert!(
            matches!(self.state, GridState::Single(_)),
            "this neighbor list was created over two sets of points, use update_pair"
        );
        self.update_box(limits(points), cutoff, cell)?;
        self.rebuild_single(points);
        return Ok(());
    }

    /// Update both point sets of a two-set neighbor list. See
    /// [`InPlaceNeighborList::update`].
    pub fn update_pair(
        &mut self,
        x: &[Vector<T, N>],
        y: &[Vector<T, N>],
        cutoff: Option<T>,
        cell: Option<CellSpec<T, N>>,
    ) -> Result<(), Error> {
        assert!(
            matches!(self.state, GridState::Paired(_)),
            "this neighbor list was created over a single set of points, use update"
        );
        self.update_box(merged_limits(x, y), cutoff, cell)?;
        self.rebuild_paired(x, y);
        return Ok(());
    }

    fn update_box(
        &mut self,
        limits: Limits<T, N>,
        cutoff: Option<T>,
        cell: Option<CellSpec<T, N>>,
    ) -> Result<(), Error> {
        if self.explicit_cell {
            let cutoff_changed = cutoff.map_or(false, |c| c != self.bx.cutoff());
            if cell.is_some() || cutoff_changed {
                self.bx = self.bx.update(cell, cutoff)?;
            }
        } else {
            if cell.is_some() {
                return Err(Error::NonPeriodicWithCellOverride);
            }
            // the non-periodic box always follows the points
            let cutoff = cutoff.unwrap_or_else(|| self.bx.cutoff());
            self.bx = SimulationBox::from_limits(limits, cutoff, self.bx.lcell())?;
        }
        return Ok(());
    }

    fn build_options(&self) -> BuildOptions {
        BuildOptions {
            parallel: self.options.parallel,
            nbatches: self.options.nbatches.0,
        }
    }

    fn rebuild_single(&mut self, points: &[Vector<T, N>]) {
        let options = self.build_options();
        match &mut self.state {
            GridState::Single(grid) => {
                grid.build(points, &self.bx, &mut self.build_scratch, options);
            }
            GridState::Paired(_) => unreachable!(),
        }
    }

    fn rebuild_paired(&mut self, x: &[Vector<T, N>], y: &[Vector<T, N>]) {
        let options = self.build_options();
        let autoswap = self.options.autoswap;
        match &mut self.state {
            GridState::Paired(paired) => {
                paired.build(x, y, &self.bx, &mut self.build_scratch, options, autoswap);
            }
            GridState::Single(_) => unreachable!(),
        }
    }

    /// The current box
    pub fn simulation_box(&self) -> &SimulationBox<T, N> {
        &self.bx
    }

    /// Compute the neighbor list for the current points, returning `(i, j,
    /// distance)` triples. For a single set, each unordered pair below the
    /// cutoff appears exactly once, in unspecified order; for two sets, `i`
    /// indexes the first set and `j` the second.
    #[time_graph::instrument(name = "InPlaceNeighborList::compute")]
    pub fn compute(&mut self) -> &[(usize, usize, T)] {
        let nbatches = if self.options.parallel {
            match self.options.nbatches.1 {
                0 => rayon::current_num_threads(),
                n => n,
            }
        } else {
            1
        };

        self.worker_pairs.resize_with(nbatches, Vec::new);
        for buffer in &mut self.worker_pairs {
            buffer.clear();
        }

        let close2 = cast::<T>(1e-3);
        let emit = move |_: Vector<T, N>, _: Vector<T, N>, i: usize, j: usize, d2: T,
                         mut pairs: Vec<(usize, usize, T)>| {
            if d2 < close2 {
                warn!("points {} and {} are very close to one another ({})", i, j, d2.sqrt());
            }
            pairs.push((i, j, d2.sqrt()));
            return pairs;
        };

        let map_options = MapOptions {
            parallel: self.options.parallel,
            show_progress: self.options.show_progress,
            nbatches,
        };
        match &self.state {
            GridState::Single(grid) => {
                grid.map_pairwise_into(emit, &mut self.worker_pairs[..nbatches], &self.bx, map_options);
            }
            GridState::Paired(paired) => {
                paired.map_pairwise_into(emit, &mut self.worker_pairs[..nbatches], &self.bx, map_options);
            }
        }

        // merge the per-worker buffers: resize once, then copy each span in
        // parallel
        let total = self.worker_pairs.iter().map(Vec::len).sum();
        self.output.clear();
        self.output.resize(total, (0, 0, T::zero()));

        let mut spans = Vec::with_capacity(self.worker_pairs.len());
        let mut rest = self.output.as_mut_slice();
        for buffer in &self.worker_pairs {
            let (span, tail) = rest.split_at_mut(buffer.len());
            spans.push(span);
            rest = tail;
        }
        spans
            .into_par_iter()
            .zip(self.worker_pairs.par_iter())
            .for_each(|(span, buffer)| span.copy_from_slice(buffer));

        return &self.output;
    }

    /// The result of the last [`InPlaceNeighborList::compute`] call
    pub fn pairs(&self) -> &[(usize, usize, T)] {
        &self.output
    }
}

fn make_box<T: Real, const N: usize>(
    limits: Limits<T, N>,
    cutoff: T,
    cell: Option<CellSpec<T, N>>,
) -> Result<SimulationBox<T, N>, Error> {
    match cell {
        Some(CellSpec::Sides(sides)) => SimulationBox::orthorhombic(sides, cutoff),
        Some(CellSpec::Matrix(matrix)) => SimulationBox::triclinic(matrix, cutoff),
        None => SimulationBox::from_limits(limits, cutoff, 1),
    }
}

fn merged_limits<T: Real, const N: usize>(
    x: &[Vector<T, N>],
    y: &[Vector<T, N>],
) -> Limits<T, N> {
    let (a, b) = (limits(x), limits(y));
    if x.is_empty() {
        return b;
    }
    if y.is_empty() {
        return a;
    }
    let mut merged = a;
    for i in 0..N {
        merged.min[i] = merged.min[i].min(b.min[i]);
        merged.max[i] = merged.max[i].max(b.max[i]);
    }
    return merged;
}

/// Compute all pairs of `points` within `cutoff` of each other, as `(i, j,
/// distance)` triples. Each unordered pair appears exactly once, in
/// unspecified order. Without a `cell` the search is non-periodic.
pub fn neighborlist<T: Real, const N: usize>(
    points: &[Vector<T, N>],
    cutoff: T,
    cell: Option<CellSpec<T, N>>,
    options: NeighborListOptions,
) -> Result<Vec<(usize, usize, T)>, Error> {
    let mut system = InPlaceNeighborList::new(points, cutoff, cell, options)?;
    system.compute();
    return Ok(std::mem::take(&mut system.output));
}

/// Compute all pairs with one point in `x` and the other in `y` within
/// `cutoff` of each other. In the returned triples, `i` indexes `x` and `j`
/// indexes `y`, regardless of which set the engine used as reference
/// internally.
pub fn neighborlist_pair<T: Real, const N: usize>(
    x: &[Vector<T, N>],
    y: &[Vector<T, N>],
    cutoff: T,
    cell: Option<CellSpec<T, N>>,
    options: NeighborListOptions,
) -> Result<Vec<(usize, usize, T)>, Error> {
    let mut system = InPlaceNeighborList::new_pair(x, y, cutoff, cell, options)?;
    system.compute();
    return Ok(std::mem::take(&mut system.output));
}
