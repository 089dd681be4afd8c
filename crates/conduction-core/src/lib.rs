//! Core types and traits for the Conduction workspace.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! [`Communicator`] abstraction every collective operation is routed
//! through, the [`Wall`] identifiers used by boundary tables, and the error
//! enums shared by the grid, linear-algebra and solver crates.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod traits;
pub mod wall;

pub use error::{CommError, ConfigError, DiffusionError, GridError, SolveError};
pub use traits::{Communicator, ReduceOp};
pub use wall::Wall;
