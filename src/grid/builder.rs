//! Filling cell grids from point sets, in serial or in threaded shards that
//! are merged afterwards.

use rayon::prelude::*;

use crate::boxes::SimulationBox;
use crate::types::{Real, Vector};

use super::{replicate, CellGrid, PairedGrid};

/// Below this number of points per shard, threading the build costs more
/// than it saves.
const MIN_POINTS_PER_SHARD: usize = 500;

/// Options controlling how grids are built
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    /// build shards in parallel (default `true`)
    pub parallel: bool,
    /// number of shards; `0` selects `min(n_points / 500, worker count)`
    pub nbatches: usize,
}

impl Default for BuildOptions {
    fn default() -> BuildOptions {
        BuildOptions {
            parallel: true,
            nbatches: 0,
        }
    }
}

/// Per-shard grids used by threaded builds, retained across calls so that
/// updates allocate nothing once warm.
pub struct BuildScratch<T: Real, const N: usize> {
    shards: Vec<CellGrid<T, N>>,
}

impl<T: Real, const N: usize> BuildScratch<T, N> {
    pub fn new() -> BuildScratch<T, N> {
        BuildScratch { shards: Vec::new() }
    }
}

impl<T: Real, const N: usize> Default for BuildScratch<T, N> {
    fn default() -> BuildScratch<T, N> {
        BuildScratch::new()
    }
}

impl<T: Real, const N: usize> CellGrid<T, N> {
    /// Create a grid holding `points`, built with the default options.
    pub fn new(points: &[Vector<T, N>], bx: &SimulationBox<T, N>) -> CellGrid<T, N> {
        let mut grid = CellGrid::empty(bx);
        let mut scratch = BuildScratch::new();
        grid.build(points, bx, &mut scratch, BuildOptions::default());
        return grid;
    }

    /// Empty this grid and fill it with `points`: each point is wrapped into
    /// the box, inserted into its cell, and replicated into the halo if the
    /// box is periodic.
    ///
    /// With `options.parallel`, the point range is split into contiguous
    /// shards, each shard is built into its own grid from `scratch`, and the
    /// shard grids are merged. Shards are merged in ascending order, which
    /// keeps the real points of every cell sorted by input index.
    #[time_graph::instrument(name = "CellGrid::build")]
    pub fn build(
        &mut self,
        points: &[Vector<T, N>],
        bx: &SimulationBox<T, N>,
        scratch: &mut BuildScratch<T, N>,
        options: BuildOptions,
    ) {
        self.reset(bx);

        let n_shards = build_shards(points.len(), options);
        if n_shards <= 1 {
            fill_serial(self, points, 0, bx);
            return;
        }

        while scratch.shards.len() < n_shards {
            scratch.shards.push(CellGrid::empty(bx));
        }

        let chunk_size = (points.len() + n_shards - 1) / n_shards;
        scratch.shards[..n_shards]
            .par_iter_mut()
            .enumerate()
            .for_each(|(shard_i, shard)| {
                shard.reset(bx);
                let start = shard_i * chunk_size;
                let end = (start + chunk_size).min(points.len());
                fill_serial(shard, &points[start..end], start, bx);
            });

        for shard in &scratch.shards[..n_shards] {
            self.merge(bx, shard);
        }
    }

    /// Append all points of `other` into this grid, claiming destination
    /// cells as needed.
    fn merge(&mut self, bx: &SimulationBox<T, N>, other: &CellGrid<T, N>) {
        for cell in other.cells() {
            for &point in cell.points() {
                self.insert_in_cell(bx, cell.cartesian_index, cell.linear_index, point);
            }
        }
    }
}

impl<T: Real, const N: usize> PairedGrid<T, N> {
    /// Create a paired grid for cross-set queries between `x` and `y`.
    ///
    /// With `autoswap`, the larger set goes into the cell grid and the
    /// smaller set plays the reference role; emitted pairs are re-swapped so
    /// that the first index always refers to `x`.
    pub fn new(
        x: &[Vector<T, N>],
        y: &[Vector<T, N>],
        bx: &SimulationBox<T, N>,
        autoswap: bool,
    ) -> PairedGrid<T, N> {
        let mut paired = PairedGrid::empty(bx);
        let mut scratch = BuildScratch::new();
        paired.build(x, y, bx, &mut scratch, BuildOptions::default(), autoswap);
        return paired;
    }

    /// Empty this paired grid and fill it from the two point sets. See
    /// [`CellGrid::build`] for the threaded build, and [`PairedGrid::new`]
    /// for the `autoswap` semantics.
    pub fn build(
        &mut self,
        x: &[Vector<T, N>],
        y: &[Vector<T, N>],
        bx: &SimulationBox<T, N>,
        scratch: &mut BuildScratch<T, N>,
        options: BuildOptions,
        autoswap: bool,
    ) {
        let swap = autoswap && x.len() > y.len();
        let (reference, target) = if swap { (y, x) } else { (x, y) };

        self.set_state(swap);
        for &point in reference {
            self.push_reference(bx.wrap(point));
        }
        self.grid_mut().build(target, bx, scratch, options);
    }
}

fn build_shards(n_points: usize, options: BuildOptions) -> usize {
    if !options.parallel {
        return 1;
    }
    if options.nbatches > 0 {
        return options.nbatches;
    }
    (n_points / MIN_POINTS_PER_SHARD).clamp(1, rayon::current_num_threads())
}

fn fill_serial<T: Real, const N: usize>(
    grid: &mut CellGrid<T, N>,
    points: &[Vector<T, N>],
    index_offset: usize,
    bx: &SimulationBox<T, N>,
) {
    for (i, &point) in points.iter().enumerate() {
        let wrapped = bx.wrap(point);
        grid.insert(bx, index_offset + i, wrapped, true);
        replicate(grid, bx, index_offset + i, wrapped);
    }
}
