//! Ghost image replication for periodic boxes.
//!
//! After replication, every point within the cutoff of a real point is
//! present in the grid with its actual (unwrapped) coordinates, so the pair
//! traversal can use plain coordinate differences and never re-wrap.

use crate::boxes::{CellKind, SimulationBox};
use crate::types::{Real, Vector};

use super::CellGrid;

/// Insert ghost images of the (already wrapped) point `coords` into the
/// grid, for every lattice translation that lands inside the halo-extended
/// grid region. A no-op for non-periodic boxes.
pub(crate) fn replicate<T: Real, const N: usize>(
    grid: &mut CellGrid<T, N>,
    bx: &SimulationBox<T, N>,
    index: usize,
    coords: Vector<T, N>,
) {
    if bx.kind() == CellKind::NonPeriodic {
        return;
    }

    for shift in bx.image_shifts() {
        let image = bx.lattice_image(coords, shift);
        if bx.in_grid_region(&image) {
            grid.insert(bx, index, image, false);
        }
    }
}
