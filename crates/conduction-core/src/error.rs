//! Error types for the Conduction workspace.
//!
//! Organized by subsystem: communicator, grid/field layout, linear solve,
//! solver configuration, and the time-stepping driver. Numerical edge cases
//! (zero node distances, off-grid stencil neighbours) are handled by
//! masking and never surface here.

use std::error::Error;
use std::fmt;

use crate::wall::Wall;

/// Errors from collective and point-to-point communication.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommError {
    /// A rank outside `0..size` was addressed.
    InvalidRank {
        /// The rank that was requested.
        rank: usize,
        /// Number of ranks in the group.
        size: usize,
    },
    /// The peer's end of the channel is gone (the peer exited or panicked
    /// before completing the collective).
    Disconnected {
        /// The peer rank.
        peer: usize,
    },
    /// A message arrived with a different length than the collective expects.
    LengthMismatch {
        /// The peer that sent the message.
        peer: usize,
        /// Expected payload length.
        expected: usize,
        /// Received payload length.
        got: usize,
    },
}

impl fmt::Display for CommError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRank { rank, size } => {
                write!(f, "rank {rank} is outside communicator of size {size}")
            }
            Self::Disconnected { peer } => write!(f, "peer rank {peer} disconnected"),
            Self::LengthMismatch {
                peer,
                expected,
                got,
            } => write!(
                f,
                "message from rank {peer} has length {got}, expected {expected}"
            ),
        }
    }
}

impl Error for CommError {}

/// Errors from grid construction, partitioning and field access.
#[derive(Clone, Debug, PartialEq)]
pub enum GridError {
    /// Only 1, 2 and 3 dimensional grids are supported.
    UnsupportedDimension {
        /// The requested dimension.
        dim: usize,
    },
    /// `min_coord`, `max_coord` and `resolution` disagree on the dimension.
    AxisCountMismatch {
        /// Length of `min_coord`.
        min: usize,
        /// Length of `max_coord`.
        max: usize,
        /// Length of `resolution`.
        resolution: usize,
    },
    /// An axis has fewer than two nodes.
    TooFewNodes {
        /// The offending axis.
        axis: usize,
        /// Configured node count.
        nodes: usize,
    },
    /// An axis has `max <= min` or a non-finite bound.
    InvalidExtent {
        /// The offending axis.
        axis: usize,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
    /// More ranks than nodes along the partitioned axis.
    TooManyRanks {
        /// Number of ranks.
        ranks: usize,
        /// Nodes along axis 0.
        nodes: usize,
    },
    /// A buffer handed to a field or matrix has the wrong length.
    LengthMismatch {
        /// What was being written.
        what: String,
        /// Expected length.
        expected: usize,
        /// Supplied length.
        got: usize,
    },
    /// Indexed access beyond the ghosted buffer.
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// Buffer length.
        len: usize,
    },
    /// A halo exchange or reduction failed.
    Comm(CommError),
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedDimension { dim } => {
                write!(f, "grids must have 1, 2 or 3 dimensions, got {dim}")
            }
            Self::AxisCountMismatch {
                min,
                max,
                resolution,
            } => write!(
                f,
                "axis counts disagree: min_coord has {min}, max_coord has {max}, resolution has {resolution}"
            ),
            Self::TooFewNodes { axis, nodes } => {
                write!(f, "axis {axis} needs at least 2 nodes, got {nodes}")
            }
            Self::InvalidExtent { axis, min, max } => {
                write!(f, "axis {axis} has invalid extent [{min}, {max}]")
            }
            Self::TooManyRanks { ranks, nodes } => {
                write!(f, "cannot split {nodes} nodes along axis 0 across {ranks} ranks")
            }
            Self::LengthMismatch {
                what,
                expected,
                got,
            } => write!(f, "{what}: expected length {expected}, got {got}"),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for buffer of length {len}")
            }
            Self::Comm(e) => write!(f, "communication: {e}"),
        }
    }
}

impl Error for GridError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Comm(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CommError> for GridError {
    fn from(e: CommError) -> Self {
        Self::Comm(e)
    }
}

/// Errors from distributed matrix assembly and the Krylov layer.
#[derive(Clone, Debug, PartialEq)]
pub enum SolveError {
    /// Operand sizes disagree with the matrix.
    DimensionMismatch {
        /// Which operand was checked.
        what: &'static str,
        /// Expected length.
        expected: usize,
        /// Supplied length.
        got: usize,
    },
    /// A column index points outside the ghosted layout.
    ColumnOutOfRange {
        /// Local row.
        row: usize,
        /// Offending column.
        col: usize,
        /// Number of ghosted columns.
        n_cols: usize,
    },
    /// The sparsity pattern has no diagonal entry in this row.
    MissingDiagonal {
        /// Local row.
        row: usize,
    },
    /// A halo exchange or reduction failed mid-solve.
    Comm(CommError),
    /// A field operation failed mid-solve.
    Grid(GridError),
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DimensionMismatch {
                what,
                expected,
                got,
            } => write!(f, "{what} has length {got}, expected {expected}"),
            Self::ColumnOutOfRange { row, col, n_cols } => {
                write!(f, "row {row} references column {col} of {n_cols}")
            }
            Self::MissingDiagonal { row } => write!(f, "row {row} has no diagonal entry"),
            Self::Comm(e) => write!(f, "communication: {e}"),
            Self::Grid(e) => write!(f, "grid: {e}"),
        }
    }
}

impl Error for SolveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Comm(e) => Some(e),
            Self::Grid(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CommError> for SolveError {
    fn from(e: CommError) -> Self {
        Self::Comm(e)
    }
}

impl From<GridError> for SolveError {
    fn from(e: GridError) -> Self {
        Self::Grid(e)
    }
}

/// Errors detected while validating solver configuration.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// `theta` must lie in `[0, 1]`.
    ThetaOutOfRange {
        /// The rejected value.
        theta: f64,
    },
    /// The wall does not exist for a grid of this dimension.
    UnknownWall {
        /// The requested wall.
        wall: Wall,
        /// Grid dimension.
        dim: usize,
    },
    /// Linear solver options are inconsistent.
    InvalidSolverOptions {
        /// Description of the violated constraint.
        reason: String,
    },
    /// Grid construction failed.
    Grid(GridError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ThetaOutOfRange { theta } => {
                write!(f, "theta must be in the range [0, 1], got {theta}")
            }
            Self::UnknownWall { wall, dim } => {
                write!(f, "wall {wall} does not exist on a {dim}-dimensional grid")
            }
            Self::InvalidSolverOptions { reason } => {
                write!(f, "invalid solver options: {reason}")
            }
            Self::Grid(e) => write!(f, "grid: {e}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Grid(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GridError> for ConfigError {
    fn from(e: GridError) -> Self {
        Self::Grid(e)
    }
}

/// Errors from matrix/rhs construction and time stepping.
#[derive(Clone, Debug, PartialEq)]
pub enum DiffusionError {
    /// The timestep is not finite and positive (e.g. zero diffusivity
    /// everywhere makes the stability bound infinite).
    InvalidTimestep {
        /// The rejected timestep.
        dt: f64,
    },
    /// Configuration rejected.
    Config(ConfigError),
    /// Field or grid operation failed.
    Grid(GridError),
    /// Assembly or linear solve failed.
    Solve(SolveError),
    /// A collective failed.
    Comm(CommError),
}

impl fmt::Display for DiffusionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTimestep { dt } => {
                write!(f, "timestep must be finite and positive, got {dt}")
            }
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Grid(e) => write!(f, "grid: {e}"),
            Self::Solve(e) => write!(f, "solve: {e}"),
            Self::Comm(e) => write!(f, "communication: {e}"),
        }
    }
}

impl Error for DiffusionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Grid(e) => Some(e),
            Self::Solve(e) => Some(e),
            Self::Comm(e) => Some(e),
            Self::InvalidTimestep { .. } => None,
        }
    }
}

impl From<ConfigError> for DiffusionError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<GridError> for DiffusionError {
    fn from(e: GridError) -> Self {
        Self::Grid(e)
    }
}

impl From<SolveError> for DiffusionError {
    fn from(e: SolveError) -> Self {
        Self::Solve(e)
    }
}

impl From<CommError> for DiffusionError {
    fn from(e: CommError) -> Self {
        Self::Comm(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theta_message_names_the_range() {
        let e = ConfigError::ThetaOutOfRange { theta: 1.5 };
        assert_eq!(e.to_string(), "theta must be in the range [0, 1], got 1.5");
    }

    #[test]
    fn wrapped_comm_error_is_the_source() {
        let inner = CommError::Disconnected { peer: 3 };
        let e = DiffusionError::from(GridError::from(inner.clone()));
        let grid = e.source().expect("grid source");
        let comm = grid.source().expect("comm source");
        assert_eq!(comm.to_string(), inner.to_string());
    }

    #[test]
    fn invalid_timestep_has_no_source() {
        let e = DiffusionError::InvalidTimestep { dt: f64::INFINITY };
        assert!(e.source().is_none());
        assert!(e.to_string().contains("inf"));
    }
}
