//! The [`Communicator`] trait and reduction operators.
//!
//! Every collective in the workspace (halo exchange, global reductions,
//! assembly barriers, Krylov dot products) goes through a `Communicator`
//! value that is passed in at construction time. All ranks of a group must
//! issue the same sequence of collectives; a rank that skips one leaves its
//! peers blocked.

use std::sync::Arc;

use crate::error::CommError;

/// Element-wise combination used by [`Communicator::all_reduce`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReduceOp {
    /// Global maximum.
    Max,
    /// Global minimum.
    Min,
    /// Global sum.
    Sum,
}

impl ReduceOp {
    /// Combine two partial values.
    pub fn combine(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Max => a.max(b),
            Self::Min => a.min(b),
            Self::Sum => a + b,
        }
    }
}

/// A group of cooperating ranks.
///
/// Implementors provide rank/size and ordered point-to-point transfer of
/// `f64` payloads. Messages between one ordered pair of ranks are delivered
/// in send order, and `send` must not block on the receiver. The
/// collectives are provided on top of those primitives with rank 0 as the
/// root.
pub trait Communicator: Send + Sync {
    /// This process's rank in `0..size()`.
    fn rank(&self) -> usize;

    /// Number of ranks in the group.
    fn size(&self) -> usize;

    /// Send `payload` to `dest`.
    fn send(&self, dest: usize, payload: Vec<f64>) -> Result<(), CommError>;

    /// Receive the next payload sent by `source`. Blocks.
    fn recv(&self, source: usize) -> Result<Vec<f64>, CommError>;

    /// Element-wise reduction of `values` across all ranks; every rank ends
    /// up with the combined result.
    fn all_reduce(&self, values: &mut [f64], op: ReduceOp) -> Result<(), CommError> {
        let size = self.size();
        if size <= 1 {
            return Ok(());
        }
        if self.rank() == 0 {
            for peer in 1..size {
                let part = self.recv(peer)?;
                check_len(peer, values.len(), part.len())?;
                for (v, p) in values.iter_mut().zip(&part) {
                    *v = op.combine(*v, *p);
                }
            }
            for peer in 1..size {
                self.send(peer, values.to_vec())?;
            }
        } else {
            self.send(0, values.to_vec())?;
            let reduced = self.recv(0)?;
            check_len(0, values.len(), reduced.len())?;
            values.copy_from_slice(&reduced);
        }
        Ok(())
    }

    /// Scalar convenience wrapper around [`all_reduce`](Self::all_reduce).
    fn all_reduce_scalar(&self, value: f64, op: ReduceOp) -> Result<f64, CommError> {
        let mut buf = [value];
        self.all_reduce(&mut buf, op)?;
        Ok(buf[0])
    }

    /// Block until every rank reaches the barrier.
    fn barrier(&self) -> Result<(), CommError> {
        self.all_reduce(&mut [], ReduceOp::Sum)
    }
}

/// Shared handles forward to the communicator they point at, so wrappers
/// can hold an `Arc<dyn Communicator>`.
impl<C: Communicator + ?Sized> Communicator for Arc<C> {
    fn rank(&self) -> usize {
        (**self).rank()
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    fn send(&self, dest: usize, payload: Vec<f64>) -> Result<(), CommError> {
        (**self).send(dest, payload)
    }

    fn recv(&self, source: usize) -> Result<Vec<f64>, CommError> {
        (**self).recv(source)
    }

    fn all_reduce(&self, values: &mut [f64], op: ReduceOp) -> Result<(), CommError> {
        (**self).all_reduce(values, op)
    }

    fn barrier(&self) -> Result<(), CommError> {
        (**self).barrier()
    }
}

fn check_len(peer: usize, expected: usize, got: usize) -> Result<(), CommError> {
    if expected == got {
        Ok(())
    } else {
        Err(CommError::LengthMismatch {
            peer,
            expected,
            got,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn max_is_commutative(a in -1e6f64..1e6, b in -1e6f64..1e6) {
            prop_assert_eq!(ReduceOp::Max.combine(a, b), ReduceOp::Max.combine(b, a));
        }

        #[test]
        fn min_never_exceeds_max(a in -1e6f64..1e6, b in -1e6f64..1e6) {
            prop_assert!(ReduceOp::Min.combine(a, b) <= ReduceOp::Max.combine(a, b));
        }
    }

    #[test]
    fn sum_adds() {
        assert_eq!(ReduceOp::Sum.combine(1.5, 2.0), 3.5);
    }
}
