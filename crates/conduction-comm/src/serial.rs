//! Single-rank communicator.

use conduction_core::{CommError, Communicator};

/// A communicator with exactly one rank.
///
/// Reductions return their input unchanged. There are no peers, so any
/// point-to-point transfer is an addressing error.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialComm;

impl Communicator for SerialComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn send(&self, dest: usize, _payload: Vec<f64>) -> Result<(), CommError> {
        Err(CommError::InvalidRank {
            rank: dest,
            size: 1,
        })
    }

    fn recv(&self, source: usize) -> Result<Vec<f64>, CommError> {
        Err(CommError::InvalidRank {
            rank: source,
            size: 1,
        })
    }
}
