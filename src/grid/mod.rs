//! Cell grids: the spatial index partitioning points into grid cells.
//!
//! A [`CellGrid`] owns per-cell point arrays and the list of cells containing
//! real (non-ghost) points. All storage is arena-style: resetting the grid
//! keeps the allocations of previous builds around, so that repeated updates
//! with similar inputs reach a zero-allocation steady state.

use std::cell::{RefCell, RefMut};

use thread_local::ThreadLocal;

use crate::boxes::SimulationBox;
use crate::types::{Real, Vector};

mod builder;
pub use self::builder::{BuildOptions, BuildScratch};

mod replicate;
pub(crate) use self::replicate::replicate;

/// A point stored inside a grid cell, carrying the index it had in the input
/// array. `real = false` marks a periodic ghost image of the original point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedPoint<T, const N: usize> {
    /// index of the point in the input array
    pub index: usize,
    /// coordinates, wrapped inside the box for real points, translated by a
    /// lattice vector for ghosts
    pub coords: Vector<T, N>,
    /// whether this is an original point or a ghost image
    pub real: bool,
}

/// Scratch data for the projection sort: a point of a neighboring cell,
/// annotated with its projection on the axis between the cell centers.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ProjectedPoint<T, const N: usize> {
    pub index: usize,
    pub x_proj: T,
    pub coords: Vector<T, N>,
}

/// A single occupied grid cell.
///
/// Points are stored with all real points before all ghosts, and real points
/// in ascending input index. The traversal relies on both properties to emit
/// each pair exactly once.
#[derive(Debug, Clone)]
pub(crate) struct CellData<T, const N: usize> {
    pub(crate) linear_index: usize,
    pub(crate) cartesian_index: [usize; N],
    pub(crate) center: Vector<T, N>,
    /// number of live points; `storage` may be longer and is never shrunk
    pub(crate) n_points: usize,
    /// number of live real points, stored at the front
    pub(crate) n_real: usize,
    storage: Vec<IndexedPoint<T, N>>,
}

impl<T: Real, const N: usize> CellData<T, N> {
    fn new() -> CellData<T, N> {
        CellData {
            linear_index: 0,
            cartesian_index: [0; N],
            center: Vector::zero(),
            n_points: 0,
            n_real: 0,
            storage: Vec::new(),
        }
    }

    /// Mark this (previously unused) cell as holding points of the cell with
    /// the given indices, keeping the storage of previous builds.
    fn activate(&mut self, linear_index: usize, cartesian_index: [usize; N], center: Vector<T, N>) {
        self.linear_index = linear_index;
        self.cartesian_index = cartesian_index;
        self.center = center;
        self.n_points = 0;
        self.n_real = 0;
    }

    /// Append a point, maintaining the real-prefix invariant.
    fn push(&mut self, point: IndexedPoint<T, N>) {
        if self.n_points < self.storage.len() {
            self.storage[self.n_points] = point;
        } else {
            if self.storage.len() == self.storage.capacity() {
                // amortized growth by 1.5x
                let additional = (self.storage.len() / 2).max(1);
                self.storage.reserve_exact(additional);
            }
            self.storage.push(point);
        }
        let inserted = self.n_points;
        self.n_points += 1;

        if point.real {
            if inserted > self.n_real {
                // a ghost occupies the first non-real position, move it back
                self.storage.swap(self.n_real, inserted);
            }
            self.n_real += 1;
        }
    }

    /// The live points of this cell
    #[inline]
    pub(crate) fn points(&self) -> &[IndexedPoint<T, N>] {
        &self.storage[..self.n_points]
    }

    pub(crate) fn contains_real(&self) -> bool {
        self.n_real > 0
    }
}

/// A spatial index assigning points (and their periodic ghost images) to grid
/// cells, following the geometry of a [`SimulationBox`].
pub struct CellGrid<T: Real, const N: usize> {
    n_real_points: usize,
    n_total_points: usize,
    n_cells: usize,
    /// for every linear cell index, the slot in `cells` plus one, or zero if
    /// the cell is empty
    cell_index_of: Vec<usize>,
    /// slots of the cells containing at least one real point
    real_cell_slots: Vec<usize>,
    n_cells_with_points: usize,
    cells: Vec<CellData<T, N>>,
    /// per-thread scratch for the projection sort, kept across calls
    projection_scratch: ThreadLocal<RefCell<Vec<ProjectedPoint<T, N>>>>,
}

impl<T: Real, const N: usize> std::fmt::Debug for CellGrid<T, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellGrid")
            .field("n_real_points", &self.n_real_points)
            .field("n_total_points", &self.n_total_points)
            .field("n_cells", &self.n_cells)
            .field("n_cells_with_points", &self.n_cells_with_points)
            .field("n_cells_with_real_points", &self.real_cell_slots.len())
            .finish_non_exhaustive()
    }
}

impl<T: Real, const N: usize> CellGrid<T, N> {
    /// Create an empty grid sized for the given box.
    pub fn empty(bx: &SimulationBox<T, N>) -> CellGrid<T, N> {
        let n_cells = bx.n_cells();
        CellGrid {
            n_real_points: 0,
            n_total_points: 0,
            n_cells,
            cell_index_of: vec![0; n_cells],
            real_cell_slots: Vec::new(),
            n_cells_with_points: 0,
            cells: Vec::new(),
            projection_scratch: ThreadLocal::new(),
        }
    }

    /// Empty this grid and re-size it for `bx`, keeping all allocations.
    pub(crate) fn reset(&mut self, bx: &SimulationBox<T, N>) {
        self.n_cells = bx.n_cells();
        if self.cell_index_of.len() < self.n_cells {
            // zero-fill grow
            self.cell_index_of.resize(self.n_cells, 0);
        }
        self.cell_index_of.fill(0);
        self.real_cell_slots.clear();
        self.n_real_points = 0;
        self.n_total_points = 0;
        self.n_cells_with_points = 0;
    }

    /// Insert a point, computing its cell from its coordinates. Real points
    /// must already be wrapped inside the box.
    pub(crate) fn insert(
        &mut self,
        bx: &SimulationBox<T, N>,
        index: usize,
        coords: Vector<T, N>,
        real: bool,
    ) {
        let cartesian = if real {
            bx.cell_cartesian_core(&coords)
        } else {
            bx.cell_cartesian(&coords)
        };
        let linear = bx.linear_index(cartesian);
        self.insert_in_cell(bx, cartesian, linear, IndexedPoint { index, coords, real });
    }

    /// Insert a point into a known cell, claiming a slot for the cell if it
    /// was empty.
    pub(crate) fn insert_in_cell(
        &mut self,
        bx: &SimulationBox<T, N>,
        cartesian: [usize; N],
        linear: usize,
        point: IndexedPoint<T, N>,
    ) {
        debug_assert!(linear < self.n_cells, "cell index out of bounds");

        let slot = match self.cell_index_of[linear] {
            0 => {
                let slot = self.n_cells_with_points;
                if slot == self.cells.len() {
                    self.cells.push(CellData::new());
                }
                self.cells[slot].activate(linear, cartesian, bx.cell_center(cartesian));
                self.cell_index_of[linear] = slot + 1;
                self.n_cells_with_points += 1;
                slot
            }
            occupied => occupied - 1,
        };

        let cell = &mut self.cells[slot];
        let had_real = cell.contains_real();
        cell.push(point);

        self.n_total_points += 1;
        if point.real {
            self.n_real_points += 1;
            if !had_real {
                self.real_cell_slots.push(slot);
            }
        }
    }

    /// Number of real (input) points in the grid
    pub fn n_real_points(&self) -> usize {
        self.n_real_points
    }

    /// Number of stored points, including periodic ghost images
    pub fn n_total_points(&self) -> usize {
        self.n_total_points
    }

    /// Total number of grid cells, including empty ones
    pub fn n_cells(&self) -> usize {
        self.n_cells
    }

    /// Number of cells containing at least one point
    pub fn n_cells_with_points(&self) -> usize {
        self.n_cells_with_points
    }

    /// Number of cells containing at least one real point
    pub fn n_cells_with_real_points(&self) -> usize {
        self.real_cell_slots.len()
    }

    pub(crate) fn real_cell_slots(&self) -> &[usize] {
        &self.real_cell_slots
    }

    #[inline]
    pub(crate) fn cell(&self, slot: usize) -> &CellData<T, N> {
        &self.cells[slot]
    }

    /// Slot of the cell with the given linear index, if it holds any point
    #[inline]
    pub(crate) fn cell_slot(&self, linear: usize) -> Option<usize> {
        match self.cell_index_of[linear] {
            0 => None,
            occupied => Some(occupied - 1),
        }
    }

    pub(crate) fn cells(&self) -> &[CellData<T, N>] {
        &self.cells[..self.n_cells_with_points]
    }

    /// Per-thread projection scratch, lazily created and retained across
    /// calls
    pub(crate) fn scratch(&self) -> RefMut<'_, Vec<ProjectedPoint<T, N>>> {
        self.projection_scratch.get_or(|| RefCell::new(Vec::new())).borrow_mut()
    }
}

/// A grid for cross-set queries: all pairs between a reference set and a
/// target set. The target set lives in the cell grid, the reference set is
/// only wrapped.
pub struct PairedGrid<T: Real, const N: usize> {
    /// wrapped copies of the reference points, in input order
    reference: Vec<Vector<T, N>>,
    /// grid over the target set
    grid: CellGrid<T, N>,
    /// whether the roles of the two input sets were swapped, i.e. the grid
    /// holds the set that the caller passed first
    swap: bool,
}

impl<T: Real, const N: usize> std::fmt::Debug for PairedGrid<T, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairedGrid")
            .field("n_reference_points", &self.reference.len())
            .field("grid", &self.grid)
            .field("swap", &self.swap)
            .finish()
    }
}

impl<T: Real, const N: usize> PairedGrid<T, N> {
    /// Create an empty paired grid sized for the given box.
    pub fn empty(bx: &SimulationBox<T, N>) -> PairedGrid<T, N> {
        PairedGrid {
            reference: Vec::new(),
            grid: CellGrid::empty(bx),
            swap: false,
        }
    }

    /// Whether the two input sets were swapped so that the smaller one plays
    /// the reference role
    pub fn swapped(&self) -> bool {
        self.swap
    }

    /// The grid over the target set
    pub fn target_grid(&self) -> &CellGrid<T, N> {
        &self.grid
    }

    pub(crate) fn reference(&self) -> &[Vector<T, N>] {
        &self.reference
    }

    pub(crate) fn set_state(&mut self, swap: bool) {
        self.swap = swap;
        self.reference.clear();
    }

    pub(crate) fn push_reference(&mut self, point: Vector<T, N>) {
        self.reference.push(point);
    }

    pub(crate) fn grid_mut(&mut self) -> &mut CellGrid<T, N> {
        &mut self.grid
    }
}
