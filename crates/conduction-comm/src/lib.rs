//! Communicator implementations for Conduction.
//!
//! - [`SerialComm`]: a single-rank group. Collectives are no-ops.
//! - [`ThreadComm`]: `n` ranks living on threads of one process, wired
//!   together with one unbounded channel per ordered rank pair. Used for
//!   deterministic multi-rank tests and the demo driver.
//!
//! [`run_threaded`] spawns a group and runs the same closure on every rank.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod serial;
pub mod thread;

pub use serial::SerialComm;
pub use thread::{run_threaded, ThreadComm};
