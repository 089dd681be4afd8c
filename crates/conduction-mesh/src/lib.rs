//! Structured grids and distributed fields for Conduction.
//!
//! A [`StructuredGrid`] covers a rectangular [`Domain`] with a regular
//! lattice of nodes and is split across ranks into contiguous [`Slab`]s
//! along axis 0. Each rank stores its owned nodes plus a one-node halo
//! copied from its neighbours; [`HaloExchange`] moves data between the two
//! representations.
//!
//! [`DistributedField`] pairs a canonical (owned) buffer with a ghosted
//! (owned + halo) buffer and makes every synchronization an explicit call.
//! [`Stencil`] holds the neighbour-offset closure and per-node neighbour
//! index table used by the finite-difference operators.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod domain;
pub mod field;
pub mod grid;
pub mod halo;
pub mod partition;
pub mod stencil;

pub use domain::Domain;
pub use field::{Assign, DistributedField};
pub use grid::StructuredGrid;
pub use halo::HaloExchange;
pub use partition::{decompose, Slab};
pub use stencil::{Offset, Stencil, OFF_GRID};
