//! The `SimulationBox` type describes the region of space containing the
//! points, with some type of periodic boundary condition; and derives from it
//! the geometry of the cell grid used by the pairwise mapping: number of
//! cells in each direction (including the halo layer), cell sizes, and the
//! neighbor stencils used during traversal.

use log::warn;

use crate::types::{cast, Matrix, Real, Vector};
use crate::Error;

/// Maximal number of cells in the core grid. This prevents allocating huge
/// grids when a small cutoff is used with a large box; cells only ever get
/// larger than `cutoff / lcell`, which keeps the traversal correct.
const MAX_NUMBER_OF_CELLS: f64 = 1e5;

/// The kind of a cell determines how periodic boundary conditions are
/// applied, and which neighbor stencil the pairwise traversal uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    /// No periodic boundary conditions. The box is derived from the ranges of
    /// the input points, padded by the cutoff.
    NonPeriodic,
    /// Periodic cuboid cell, described by its side lengths
    Orthorhombic,
    /// Periodic cell with arbitrary parallelepiped shape
    Triclinic,
}

/// An explicit unit cell, as supplied by a caller.
#[derive(Debug, Clone, Copy)]
pub enum CellSpec<T, const N: usize> {
    /// Orthorhombic cell with the given side lengths
    Sides([T; N]),
    /// Full cell matrix, with the lattice vectors in the columns
    Matrix(Matrix<T, N>),
}

/// Coordinate ranges of a set of points, used to size non-periodic boxes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limits<T, const N: usize> {
    pub min: Vector<T, N>,
    pub max: Vector<T, N>,
}

/// Compute the per-axis coordinate ranges of `points`. An empty slice yields
/// a degenerate range at the origin.
pub fn limits<T: Real, const N: usize>(points: &[Vector<T, N>]) -> Limits<T, N> {
    let mut min = Vector::zero();
    let mut max = Vector::zero();
    if let Some(first) = points.first() {
        min = *first;
        max = *first;
        for point in &points[1..] {
            for i in 0..N {
                min[i] = min[i].min(point[i]);
                max[i] = max[i].max(point[i]);
            }
        }
    }
    return Limits { min, max };
}

/// A `SimulationBox` is the immutable description of the space being
/// searched: the unit cell (or the padded bounding box for non-periodic
/// data), the cutoff, and the derived cell grid geometry.
///
/// The grid covers the core region `[min_corner, max_corner)` plus a halo of
/// `lcell` cells on every side, so that the traversal can visit neighbor
/// cells without ever wrapping an index.
#[derive(Debug, Clone)]
pub struct SimulationBox<T, const N: usize> {
    kind: CellKind,
    matrix: Matrix<T, N>,
    inverse: Matrix<T, N>,
    cutoff: T,
    cutoff2: T,
    lcell: usize,
    /// cells in each direction, including `lcell` halo cells on both sides
    nc: [usize; N],
    cell_size: Vector<T, N>,
    min_corner: Vector<T, N>,
    max_corner: Vector<T, N>,
    /// input ranges, kept so that non-periodic boxes can be re-padded when
    /// only the cutoff changes
    limits: Option<Limits<T, N>>,
    /// forward half of the neighbor stencil (same-set orthorhombic paths)
    stencil_half: Vec<[i32; N]>,
    /// full neighbor stencil, without the center cell
    stencil_full: Vec<[i32; N]>,
    /// lattice shifts `{-1, 0, 1}^N \ {0}` used for ghost replication
    image_shifts: Vec<[i32; N]>,
}

impl<T: Real, const N: usize> SimulationBox<T, N> {
    /// Create a periodic orthorhombic box with the given side lengths.
    pub fn orthorhombic(sides: [T; N], cutoff: T) -> Result<SimulationBox<T, N>, Error> {
        SimulationBox::orthorhombic_with_lcell(sides, cutoff, 1)
    }

    /// Create a periodic orthorhombic box, subdividing each cutoff in
    /// `lcell` grid cells.
    pub fn orthorhombic_with_lcell(
        sides: [T; N],
        cutoff: T,
        lcell: usize,
    ) -> Result<SimulationBox<T, N>, Error> {
        SimulationBox::periodic(Matrix::diagonal(sides), cutoff, lcell)
    }

    /// Create a periodic box from a full cell matrix, with the lattice
    /// vectors in the columns of the matrix. A diagonal matrix is classified
    /// as orthorhombic and uses the corresponding fast path.
    pub fn triclinic(matrix: Matrix<T, N>, cutoff: T) -> Result<SimulationBox<T, N>, Error> {
        SimulationBox::triclinic_with_lcell(matrix, cutoff, 1)
    }

    /// Same as [`SimulationBox::triclinic`] with an explicit `lcell`.
    pub fn triclinic_with_lcell(
        matrix: Matrix<T, N>,
        cutoff: T,
        lcell: usize,
    ) -> Result<SimulationBox<T, N>, Error> {
        SimulationBox::periodic(matrix, cutoff, lcell)
    }

    /// Create a non-periodic box containing all of `points`, padded by the
    /// cutoff (at least `2 * cutoff` per side).
    pub fn non_periodic(points: &[Vector<T, N>], cutoff: T) -> Result<SimulationBox<T, N>, Error> {
        SimulationBox::non_periodic_with_lcell(points, cutoff, 1)
    }

    /// Same as [`SimulationBox::non_periodic`] with an explicit `lcell`.
    pub fn non_periodic_with_lcell(
        points: &[Vector<T, N>],
        cutoff: T,
        lcell: usize,
    ) -> Result<SimulationBox<T, N>, Error> {
        SimulationBox::from_limits(limits(points), cutoff, lcell)
    }

    /// Create a non-periodic box from pre-computed coordinate ranges.
    pub fn from_limits(
        limits: Limits<T, N>,
        cutoff: T,
        lcell: usize,
    ) -> Result<SimulationBox<T, N>, Error> {
        check_dimension::<N>();
        check_cutoff(cutoff)?;
        assert!(lcell >= 1, "lcell must be at least 1");

        let two = cast::<T>(2.0);
        let mut sides = [T::zero(); N];
        let mut min_corner = Vector::zero();
        for i in 0..N {
            let range = limits.max[i] - limits.min[i];
            sides[i] = (range + cutoff).max(two * cutoff);
            // center the points inside the padded box
            min_corner[i] = limits.min[i] - (sides[i] - range) / two;
        }

        let matrix = Matrix::diagonal(sides);
        let inverse = matrix.try_inverse().expect("padded sides are always positive");

        let mut result = SimulationBox {
            kind: CellKind::NonPeriodic,
            matrix,
            inverse,
            cutoff,
            cutoff2: cutoff * cutoff,
            lcell,
            nc: [0; N],
            cell_size: Vector::zero(),
            min_corner,
            max_corner: Vector::zero(),
            limits: Some(limits),
            stencil_half: Vec::new(),
            stencil_full: Vec::new(),
            image_shifts: Vec::new(),
        };
        result.setup_grid();
        return Ok(result);
    }

    fn periodic(
        matrix: Matrix<T, N>,
        cutoff: T,
        lcell: usize,
    ) -> Result<SimulationBox<T, N>, Error> {
        check_dimension::<N>();
        check_cutoff(cutoff)?;
        assert!(lcell >= 1, "lcell must be at least 1");

        let kind = if matrix.is_diagonal(cast(1e-10)) {
            CellKind::Orthorhombic
        } else {
            CellKind::Triclinic
        };

        if kind == CellKind::Orthorhombic {
            for i in 0..N {
                if !(matrix[i][i] > T::zero()) {
                    return Err(Error::InvalidCell(format!(
                        "cell lengths must be positive, got {}", matrix[i][i]
                    )));
                }
            }
        }

        let inverse = match matrix.try_inverse() {
            Some(inverse) => inverse,
            None => {
                return Err(Error::InvalidCell(format!(
                    "the cell matrix is not invertible: {:?}", matrix
                )));
            }
        };

        // minimum image convention: every cell height must fit two cutoffs
        let heights = cell_heights(&matrix);
        let two = cast::<T>(2.0);
        for i in 0..N {
            if two * cutoff > heights[i] {
                return Err(Error::InvalidCell(format!(
                    "cell height {} along direction {} is smaller than twice the cutoff {}",
                    heights[i], i, cutoff
                )));
            }
        }

        let mut result = SimulationBox {
            kind,
            matrix,
            inverse,
            cutoff,
            cutoff2: cutoff * cutoff,
            lcell,
            nc: [0; N],
            cell_size: Vector::zero(),
            min_corner: Vector::zero(),
            max_corner: Vector::zero(),
            limits: None,
            stencil_half: Vec::new(),
            stencil_full: Vec::new(),
            image_shifts: Vec::new(),
        };
        result.setup_grid();
        return Ok(result);
    }

    /// Create a new box from this one, overriding the unit cell and/or the
    /// cutoff. The grid geometry is recomputed whenever any grid-affecting
    /// value changed.
    ///
    /// Non-periodic boxes refuse an explicit cell with
    /// [`Error::NonPeriodicWithCellOverride`]; with a new cutoff they are
    /// re-padded from the stored coordinate ranges.
    pub fn update(
        &self,
        cell: Option<CellSpec<T, N>>,
        cutoff: Option<T>,
    ) -> Result<SimulationBox<T, N>, Error> {
        let cutoff = cutoff.unwrap_or(self.cutoff);
        if self.kind == CellKind::NonPeriodic {
            if cell.is_some() {
                return Err(Error::NonPeriodicWithCellOverride);
            }
            let limits = self.limits.expect("non-periodic boxes always store their limits");
            return SimulationBox::from_limits(limits, cutoff, self.lcell);
        }

        match cell {
            Some(CellSpec::Sides(sides)) => {
                SimulationBox::orthorhombic_with_lcell(sides, cutoff, self.lcell)
            }
            Some(CellSpec::Matrix(matrix)) => {
                SimulationBox::triclinic_with_lcell(matrix, cutoff, self.lcell)
            }
            None => SimulationBox::periodic(self.matrix, cutoff, self.lcell),
        }
    }

    /// Compute grid dimensions, cell sizes and stencils. Called once at
    /// construction, after `kind`, `matrix`, `cutoff`, `min_corner` (for
    /// non-periodic boxes) and `lcell` are set.
    fn setup_grid(&mut self) {
        let lcell_t = cast::<T>(self.lcell as f64);

        let mut n_core = [0usize; N];
        match self.kind {
            CellKind::Orthorhombic | CellKind::NonPeriodic => {
                let mut sides = [T::zero(); N];
                for i in 0..N {
                    sides[i] = self.matrix[i][i];
                    let n = (lcell_t * sides[i] / self.cutoff).floor();
                    n_core[i] = n.to_usize().unwrap_or(1).max(1);
                }
                cap_cell_count(&mut n_core);
                for i in 0..N {
                    self.cell_size[i] = sides[i] / cast(n_core[i] as f64);
                    if self.kind == CellKind::Orthorhombic {
                        self.min_corner[i] = T::zero();
                    }
                    self.max_corner[i] = self.min_corner[i] + sides[i];
                }
            }
            CellKind::Triclinic => {
                // the grid covers the bounding box of the parallelepiped;
                // for matrices without negative entries min_corner is zero
                // and max_corner is the row sum
                let mut extent = [T::zero(); N];
                for i in 0..N {
                    let mut min = T::zero();
                    let mut max = T::zero();
                    for j in 0..N {
                        min = min + self.matrix[i][j].min(T::zero());
                        max = max + self.matrix[i][j].max(T::zero());
                    }
                    self.min_corner[i] = min;
                    self.max_corner[i] = max;
                    extent[i] = max - min;
                }

                let mut cell_size = self.cutoff / lcell_t;
                for i in 0..N {
                    n_core[i] = div_ceil_to_usize(extent[i], cell_size);
                }
                let total: f64 = n_core.iter().map(|&n| n as f64).product();
                if total > MAX_NUMBER_OF_CELLS {
                    // grow the cells uniformly to keep the total in bounds
                    let factor = (total / MAX_NUMBER_OF_CELLS).powf(1.0 / N as f64);
                    cell_size = cell_size * cast(factor);
                    for i in 0..N {
                        n_core[i] = div_ceil_to_usize(extent[i], cell_size);
                    }
                    warn!(
                        "limiting the cell grid to ~{} cells, cells are now larger than cutoff/lcell",
                        MAX_NUMBER_OF_CELLS
                    );
                }
                for i in 0..N {
                    self.cell_size[i] = cell_size;
                }
            }
        }

        for i in 0..N {
            self.nc[i] = n_core[i] + 2 * self.lcell;
        }

        let lcell = self.lcell as i32;
        self.stencil_full = stencil_offsets::<N>(lcell, false);
        self.stencil_half = stencil_offsets::<N>(lcell, true);
        self.image_shifts = stencil_offsets::<N>(1, false);
    }

    /// Wrap a point into the first unit cell, i.e. into `[0, L)` fractional
    /// coordinates. For non-periodic boxes this is the identity.
    #[inline]
    pub fn wrap(&self, point: Vector<T, N>) -> Vector<T, N> {
        match self.kind {
            CellKind::NonPeriodic => point,
            CellKind::Orthorhombic => {
                let mut wrapped = point;
                for i in 0..N {
                    let side = self.matrix[i][i];
                    wrapped[i] = point[i] - side * (point[i] / side).floor();
                    // tiny negative coordinates can round up to exactly
                    // `side`; the result must stay in `[0, side)`
                    if wrapped[i] >= side {
                        wrapped[i] = T::zero();
                    }
                }
                wrapped
            }
            CellKind::Triclinic => {
                let mut fractional = self.inverse * point;
                for i in 0..N {
                    fractional[i] = fractional[i] - fractional[i].floor();
                    if fractional[i] >= T::one() {
                        fractional[i] = T::zero();
                    }
                }
                self.matrix * fractional
            }
        }
    }

    /// Cartesian grid cell of a point, including the halo offset, clamped
    /// into the grid.
    #[inline]
    pub(crate) fn cell_cartesian(&self, point: &Vector<T, N>) -> [usize; N] {
        let mut index = [0usize; N];
        for i in 0..N {
            let cell = ((point[i] - self.min_corner[i]) / self.cell_size[i]).floor();
            let cell = cell.to_isize().unwrap_or(0) + self.lcell as isize;
            index[i] = cell.clamp(0, self.nc[i] as isize - 1) as usize;
        }
        return index;
    }

    /// Cartesian grid cell of a real (wrapped) point, clamped into the core
    /// region so that neighbor lookups from it can never leave the grid.
    #[inline]
    pub(crate) fn cell_cartesian_core(&self, point: &Vector<T, N>) -> [usize; N] {
        let mut index = self.cell_cartesian(point);
        for i in 0..N {
            index[i] = index[i].clamp(self.lcell, self.nc[i] - self.lcell - 1);
        }
        return index;
    }

    /// Row-major linear index of a cartesian cell index
    #[inline]
    pub(crate) fn linear_index(&self, cell: [usize; N]) -> usize {
        let mut index = cell[0];
        for i in 1..N {
            index = index * self.nc[i] + cell[i];
        }
        return index;
    }

    /// Center of the cell with the given cartesian index
    #[inline]
    pub(crate) fn cell_center(&self, cell: [usize; N]) -> Vector<T, N> {
        let mut center = Vector::zero();
        for i in 0..N {
            let offset = cast::<T>(cell[i] as f64 - self.lcell as f64 + 0.5);
            center[i] = self.min_corner[i] + offset * self.cell_size[i];
        }
        return center;
    }

    /// Check whether a point lies inside the grid region, i.e. the core
    /// region extended by the halo on every side. Ghost images outside of
    /// this region can not interact with any real point and are discarded.
    #[inline]
    pub(crate) fn in_grid_region(&self, point: &Vector<T, N>) -> bool {
        for i in 0..N {
            let halo = cast::<T>(self.lcell as f64) * self.cell_size[i];
            if point[i] < self.min_corner[i] - halo || point[i] >= self.max_corner[i] + halo {
                return false;
            }
        }
        return true;
    }

    /// Translate `point` by the lattice vectors selected by `shift`
    #[inline]
    pub(crate) fn lattice_image(&self, point: Vector<T, N>, shift: &[i32; N]) -> Vector<T, N> {
        let mut image = point;
        for j in 0..N {
            if shift[j] != 0 {
                image += self.matrix.column(j) * cast(f64::from(shift[j]));
            }
        }
        return image;
    }

    /// The kind of this box
    pub fn kind(&self) -> CellKind {
        self.kind
    }

    /// The cutoff distance
    pub fn cutoff(&self) -> T {
        self.cutoff
    }

    /// The squared cutoff distance
    pub fn cutoff_squared(&self) -> T {
        self.cutoff2
    }

    /// Number of grid cells subdividing one cutoff length
    pub fn lcell(&self) -> usize {
        self.lcell
    }

    /// The cell matrix, with lattice vectors in the columns
    pub fn matrix(&self) -> Matrix<T, N> {
        self.matrix
    }

    /// Grid dimensions in each direction, including the halo cells
    pub fn cells_per_dimension(&self) -> [usize; N] {
        self.nc
    }

    /// Total number of grid cells, including the halo
    pub fn n_cells(&self) -> usize {
        self.nc.iter().product()
    }

    /// Size of a grid cell in each direction
    pub fn cell_size(&self) -> Vector<T, N> {
        self.cell_size
    }

    pub(crate) fn stencil_half(&self) -> &[[i32; N]] {
        &self.stencil_half
    }

    pub(crate) fn stencil_full(&self) -> &[[i32; N]] {
        &self.stencil_full
    }

    pub(crate) fn image_shifts(&self) -> &[[i32; N]] {
        &self.image_shifts
    }
}

fn check_dimension<const N: usize>() {
    assert!(N == 2 || N == 3, "only 2D and 3D boxes are supported, got N = {}", N);
}

fn check_cutoff<T: Real>(cutoff: T) -> Result<(), Error> {
    if !(cutoff > T::zero()) || !cutoff.is_finite() {
        return Err(Error::CutoffNotPositive(format!("{}", cutoff)));
    }
    return Ok(());
}

fn div_ceil_to_usize<T: Real>(value: T, divisor: T) -> usize {
    (value / divisor).ceil().to_usize().unwrap_or(1).max(1)
}

/// Distances between opposite faces of the unit cell, one per lattice
/// direction. The minimum image convention requires every one of them to be
/// at least twice the cutoff.
fn cell_heights<T: Real, const N: usize>(matrix: &Matrix<T, N>) -> Vector<T, N> {
    let determinant = matrix.determinant().abs();
    let mut heights = Vector::zero();
    match N {
        2 => {
            for i in 0..N {
                heights[i] = determinant / matrix.column(1 - i).norm();
            }
        }
        3 => {
            for i in 0..N {
                let a = matrix.column((i + 1) % 3);
                let b = matrix.column((i + 2) % 3);
                let cross = [
                    a[1] * b[2] - a[2] * b[1],
                    a[2] * b[0] - a[0] * b[2],
                    a[0] * b[1] - a[1] * b[0],
                ];
                let area = (cross[0] * cross[0] + cross[1] * cross[1] + cross[2] * cross[2]).sqrt();
                heights[i] = determinant / area;
            }
        }
        _ => unreachable!("dimension was checked at construction"),
    }
    return heights;
}

/// Cap the number of core cells at `MAX_NUMBER_OF_CELLS`, reducing the grid
/// dimensions while keeping their ratio roughly constant.
fn cap_cell_count<const N: usize>(n_core: &mut [usize; N]) {
    let total: f64 = n_core.iter().map(|&n| n as f64).product();
    if total > MAX_NUMBER_OF_CELLS {
        let factor = (total / MAX_NUMBER_OF_CELLS).powf(1.0 / N as f64);
        for n in n_core.iter_mut() {
            *n = ((*n as f64 / factor).floor() as usize).max(1);
        }
        warn!(
            "limiting the cell grid to ~{} cells, cells are now larger than cutoff/lcell",
            MAX_NUMBER_OF_CELLS
        );
    }
}

/// Enumerate the stencil offsets in `[-range, range]^N` without the zero
/// offset. With `forward_half`, keep only offsets lexicographically greater
/// than zero, i.e. whose first non-zero component is positive; this visits
/// every unordered pair of cells exactly once.
fn stencil_offsets<const N: usize>(range: i32, forward_half: bool) -> Vec<[i32; N]> {
    let mut offsets = Vec::new();
    let mut current = [-range; N];
    loop {
        let first_non_zero = current.iter().copied().find(|&c| c != 0);
        match first_non_zero {
            None => {}
            Some(first) => {
                if !forward_half || first > 0 {
                    offsets.push(current);
                }
            }
        }

        // odometer increment
        let mut axis = N;
        loop {
            if axis == 0 {
                return offsets;
            }
            axis -= 1;
            if current[axis] < range {
                current[axis] += 1;
                break;
            }
            current[axis] = -range;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_ulps_eq;

    #[test]
    fn classification() {
        let ortho = SimulationBox::orthorhombic([10.0, 12.0, 14.0], 2.0).unwrap();
        assert_eq!(ortho.kind(), CellKind::Orthorhombic);

        let diagonal = Matrix::diagonal([10.0, 12.0, 14.0]);
        let from_matrix = SimulationBox::triclinic(diagonal, 2.0).unwrap();
        assert_eq!(from_matrix.kind(), CellKind::Orthorhombic);

        let triclinic = SimulationBox::triclinic(
            Matrix::new([
                [10.0, 0.0, 1.0],
                [1.0, 12.0, 0.0],
                [0.0, 0.0, 14.0],
            ]),
            2.0,
        ).unwrap();
        assert_eq!(triclinic.kind(), CellKind::Triclinic);

        let points = [Vector::new([0.0, 0.0, 1.0]), Vector::new([0.0, 0.0, 10.0])];
        let non_periodic = SimulationBox::non_periodic(&points, 2.0).unwrap();
        assert_eq!(non_periodic.kind(), CellKind::NonPeriodic);
    }

    #[test]
    fn orthorhombic_grid_sizing() {
        let cell = SimulationBox::orthorhombic([10.0, 10.0, 10.0], 2.0).unwrap();
        // 5 core cells of size 2 per direction, plus one halo cell per side
        assert_eq!(cell.cells_per_dimension(), [7, 7, 7]);
        assert_eq!(cell.cell_size(), Vector::new([2.0, 2.0, 2.0]));
        assert_eq!(cell.n_cells(), 343);

        let cell = SimulationBox::orthorhombic_with_lcell([10.0, 10.0, 10.0], 2.0, 2).unwrap();
        assert_eq!(cell.cells_per_dimension(), [14, 14, 14]);
        assert_eq!(cell.cell_size(), Vector::new([1.0, 1.0, 1.0]));
    }

    #[test]
    fn triclinic_grid_sizing() {
        let matrix = Matrix::new([
            [250.0, 0.0, 10.0],
            [10.0, 250.0, 0.0],
            [0.0, 0.0, 250.0],
        ]);
        let cell = SimulationBox::triclinic(matrix, 10.0).unwrap();
        assert_eq!(cell.kind(), CellKind::Triclinic);
        assert_eq!(cell.cell_size(), Vector::new([10.0, 10.0, 10.0]));
        // bounding box is 260x260x250, so 26x26x25 core cells
        assert_eq!(cell.cells_per_dimension(), [28, 28, 27]);
    }

    #[test]
    fn two_dimensional_grid() {
        let cell = SimulationBox::orthorhombic([6.0, 9.0], 1.5).unwrap();
        assert_eq!(cell.cells_per_dimension(), [6, 8]);
        assert_eq!(cell.cell_size(), Vector::new([1.5, 1.5]));
    }

    #[test]
    fn non_periodic_padding() {
        let points = [Vector::new([1.0, 1.0, 1.0]), Vector::new([5.0, 1.0, 1.0])];
        let cell = SimulationBox::non_periodic(&points, 2.0).unwrap();
        // range 4 along x padded by the cutoff, degenerate ranges padded to
        // two cutoffs
        assert_ulps_eq!(cell.matrix()[0][0], 6.0);
        assert_ulps_eq!(cell.matrix()[1][1], 4.0);
        assert_ulps_eq!(cell.matrix()[2][2], 4.0);

        // wrapping is the identity
        let point = Vector::new([5.0, 1.0, 1.0]);
        assert_eq!(cell.wrap(point), point);
    }

    #[test]
    fn empty_input() {
        let points: [Vector<f64, 3>; 0] = [];
        let cell = SimulationBox::non_periodic(&points, 1.0).unwrap();
        assert_ulps_eq!(cell.matrix()[0][0], 2.0);
        assert_eq!(cell.cells_per_dimension(), [4, 4, 4]);
    }

    #[test]
    fn wrap_orthorhombic() {
        let cell = SimulationBox::orthorhombic([10.0, 10.0, 10.0], 2.0).unwrap();
        let wrapped = cell.wrap(Vector::new([9.0, 18.0, -6.0]));
        assert_ulps_eq!(wrapped[0], 9.0);
        assert_ulps_eq!(wrapped[1], 8.0);
        assert_ulps_eq!(wrapped[2], 4.0);
    }

    #[test]
    fn wrap_triclinic() {
        let matrix = Matrix::new([
            [10.0, 2.0, 0.0],
            [0.0, 10.0, 0.0],
            [0.0, 0.0, 10.0],
        ]);
        let cell = SimulationBox::triclinic(matrix, 2.0).unwrap();

        // a point already inside the cell is unchanged
        let inside = Vector::new([3.0, 4.0, 5.0]);
        let wrapped = cell.wrap(inside);
        for i in 0..3 {
            assert_ulps_eq!(wrapped[i], inside[i], max_ulps = 8);
        }

        // translating by a lattice vector wraps back to the same point
        let outside = inside + cell.matrix().column(1) * 3.0;
        let wrapped = cell.wrap(outside);
        for i in 0..3 {
            assert_ulps_eq!(wrapped[i], inside[i], max_ulps = 32);
        }
    }

    #[test]
    fn cell_indexing() {
        let cell = SimulationBox::orthorhombic([10.0, 10.0, 10.0], 2.0).unwrap();
        let index = cell.cell_cartesian(&Vector::new([0.5, 4.5, 9.5]));
        assert_eq!(index, [1, 3, 5]);

        let center = cell.cell_center(index);
        assert_ulps_eq!(center[0], 1.0);
        assert_ulps_eq!(center[1], 5.0);
        assert_ulps_eq!(center[2], 9.0);

        // linear indices are row-major and unique
        assert_eq!(cell.linear_index([0, 0, 0]), 0);
        assert_eq!(cell.linear_index([0, 0, 1]), 1);
        assert_eq!(cell.linear_index([0, 1, 0]), 7);
        assert_eq!(cell.linear_index([1, 0, 0]), 49);
    }

    #[test]
    fn stencil_sizes() {
        let cell = SimulationBox::orthorhombic([10.0, 10.0, 10.0], 2.0).unwrap();
        assert_eq!(cell.stencil_full().len(), 26);
        assert_eq!(cell.stencil_half().len(), 13);
        assert_eq!(cell.image_shifts().len(), 26);

        let cell = SimulationBox::orthorhombic([10.0, 10.0], 2.0).unwrap();
        assert_eq!(cell.stencil_full().len(), 8);
        assert_eq!(cell.stencil_half().len(), 4);
        assert_eq!(cell.image_shifts().len(), 8);

        // every full offset appears in exactly one direction in the half
        // stencil
        let cell = SimulationBox::orthorhombic_with_lcell([10.0, 10.0, 10.0], 2.0, 2).unwrap();
        assert_eq!(cell.stencil_full().len(), 124);
        assert_eq!(cell.stencil_half().len(), 62);
        for offset in cell.stencil_full() {
            let negated = [-offset[0], -offset[1], -offset[2]];
            let in_half = cell.stencil_half().contains(offset);
            let negated_in_half = cell.stencil_half().contains(&negated);
            assert!(in_half != negated_in_half);
        }
    }

    #[test]
    fn grid_region() {
        let cell = SimulationBox::orthorhombic([10.0, 10.0, 10.0], 2.0).unwrap();
        assert!(cell.in_grid_region(&Vector::new([5.0, 5.0, 5.0])));
        assert!(cell.in_grid_region(&Vector::new([-1.0, 5.0, 5.0])));
        assert!(cell.in_grid_region(&Vector::new([11.9, 5.0, 5.0])));
        assert!(!cell.in_grid_region(&Vector::new([12.5, 5.0, 5.0])));
        assert!(!cell.in_grid_region(&Vector::new([5.0, -2.5, 5.0])));
    }

    #[test]
    fn lattice_images() {
        let matrix = Matrix::new([
            [10.0, 1.0, 0.0],
            [0.0, 10.0, 0.0],
            [0.0, 0.0, 10.0],
        ]);
        let cell = SimulationBox::triclinic(matrix, 2.0).unwrap();
        let image = cell.lattice_image(Vector::new([1.0, 1.0, 1.0]), &[1, -1, 0]);
        assert_ulps_eq!(image[0], 10.0);
        assert_ulps_eq!(image[1], -9.0);
        assert_ulps_eq!(image[2], 1.0);
    }

    #[test]
    fn cell_count_cap() {
        let cell = SimulationBox::orthorhombic([1000.0, 1000.0, 1000.0], 1.0).unwrap();
        let nc = cell.cells_per_dimension();
        let core: usize = nc.iter().map(|&n| n - 2).product();
        assert!(core as f64 <= 1.05 * MAX_NUMBER_OF_CELLS);
        // cells got bigger, never smaller than the cutoff
        assert!(cell.cell_size()[0] >= 1.0);
    }

    #[test]
    fn invalid_cutoff() {
        let result = SimulationBox::orthorhombic([10.0, 10.0, 10.0], -1.5);
        assert_eq!(result.unwrap_err(), Error::CutoffNotPositive("-1.5".into()));

        let result = SimulationBox::orthorhombic([10.0, 10.0, 10.0], f64::NAN);
        assert!(matches!(result.unwrap_err(), Error::CutoffNotPositive(_)));
    }

    #[test]
    fn minimum_image_criterion() {
        // 2 * cutoff > smallest side
        let result = SimulationBox::orthorhombic([3.0, 10.0, 10.0], 2.0);
        assert!(matches!(result.unwrap_err(), Error::InvalidCell(_)));

        // equality is allowed
        assert!(SimulationBox::orthorhombic([4.0, 10.0, 10.0], 2.0).is_ok());

        // the sheared direction has a height below twice the cutoff even
        // though every side length is large enough
        let sheared = Matrix::new([
            [10.0, 9.0, 0.0],
            [0.0, 4.0, 0.0],
            [0.0, 0.0, 10.0],
        ]);
        let result = SimulationBox::triclinic(sheared, 2.1);
        assert!(matches!(result.unwrap_err(), Error::InvalidCell(_)));
        assert!(SimulationBox::triclinic(sheared, 1.9).is_ok());
    }

    #[test]
    fn update_box() {
        let cell = SimulationBox::orthorhombic([10.0, 10.0, 10.0], 2.0).unwrap();
        let updated = cell.update(None, Some(2.5)).unwrap();
        assert_eq!(updated.cells_per_dimension(), [6, 6, 6]);
        assert_ulps_eq!(updated.cutoff(), 2.5);

        let updated = cell.update(Some(CellSpec::Sides([20.0, 20.0, 20.0])), None).unwrap();
        assert_eq!(updated.cells_per_dimension(), [12, 12, 12]);

        let points = [Vector::new([0.0, 0.0, 0.0]), Vector::new([4.0, 0.0, 0.0])];
        let non_periodic = SimulationBox::non_periodic(&points, 2.0).unwrap();
        let result = non_periodic.update(Some(CellSpec::Sides([20.0, 20.0, 20.0])), None);
        assert_eq!(result.unwrap_err(), Error::NonPeriodicWithCellOverride);

        // cutoff-only updates re-pad from the stored limits
        let updated = non_periodic.update(None, Some(4.0)).unwrap();
        assert_ulps_eq!(updated.matrix()[0][0], 8.0);
        assert_ulps_eq!(updated.matrix()[1][1], 8.0);
    }
}
