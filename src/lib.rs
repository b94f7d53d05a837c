#![warn(clippy::all, clippy::pedantic)]

// disable some style lints
#![allow(clippy::needless_return, clippy::must_use_candidate, clippy::comparison_chain)]
#![allow(clippy::redundant_field_names, clippy::redundant_closure_for_method_calls)]
#![allow(clippy::unreadable_literal, clippy::option_if_let_else, clippy::range_plus_one)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc, clippy::module_name_repetitions)]

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap, clippy::cast_lossless, clippy::cast_sign_loss)]
#![allow(clippy::default_trait_access)]

// Tests lints
#![cfg_attr(test, allow(clippy::float_cmp))]

//! Cell lists and pairwise mapping of points within a cutoff.
//!
//! Given a set (or two sets) of points in 2D or 3D, an optional periodic
//! unit cell and a cutoff, this crate enumerates every pair of points closer
//! than the cutoff, and folds a user function over the pairs:
//!
//! ```
//! use cellmap::{CellGrid, MapOptions, SimulationBox, Vector};
//!
//! let points = vec![
//!     Vector::new([0.0, 0.0, 0.0]),
//!     Vector::new([0.0, 0.0, 1.2]),
//!     Vector::new([0.0, 9.5, 5.0]),
//! ];
//! let bx = SimulationBox::orthorhombic([10.0, 10.0, 10.0], 2.0)?;
//! let grid = CellGrid::new(&points, &bx);
//!
//! // count the pairs below the cutoff, in parallel
//! let count = grid.map_pairwise(
//!     |_, _, _i, _j, _d2, acc: usize| acc + 1,
//!     0,
//!     &bx,
//!     MapOptions::default(),
//! );
//! assert_eq!(count, 1);
//! # Ok::<(), cellmap::Error>(())
//! ```
//!
//! [`neighborlist`] and [`InPlaceNeighborList`] are ready-made entry points
//! collecting the pairs as `(i, j, distance)` triples.

pub mod types;
pub use types::{Matrix, Real, Vector};

mod errors;
pub use self::errors::Error;

pub mod boxes;
pub use boxes::{limits, CellKind, CellSpec, Limits, SimulationBox};

pub mod grid;
pub use grid::{BuildOptions, BuildScratch, CellGrid, IndexedPoint, PairedGrid};

pub mod map;
pub use map::{MapOptions, Reduce};

mod neighbors;
pub use self::neighbors::{neighborlist, neighborlist_pair};
pub use self::neighbors::{InPlaceNeighborList, NeighborListOptions};

#[cfg(test)]
pub(crate) mod test_utils;
