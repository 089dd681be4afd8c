//! Test utilities and mock types for Conduction development.
//!
//! Provides a [`CountingComm`] that records the collectives routed
//! through it, an [`on_ranks`] runner that hands every rank an
//! `Arc<dyn Communicator>`, and grid fixtures in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use conduction_comm::{run_threaded, SerialComm};
use conduction_core::{CommError, Communicator, ReduceOp};

/// Snapshot of the traffic seen by a [`CountingComm`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommCounts {
    pub sends: usize,
    pub recvs: usize,
    pub reductions: usize,
    pub barriers: usize,
}

/// Wraps a communicator and counts every operation routed through it.
///
/// Reductions and barriers are counted once at this level even though the
/// inner communicator may implement them with point-to-point messages.
pub struct CountingComm<C> {
    inner: C,
    sends: AtomicUsize,
    recvs: AtomicUsize,
    reductions: AtomicUsize,
    barriers: AtomicUsize,
}

impl<C: Communicator> CountingComm<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            sends: AtomicUsize::new(0),
            recvs: AtomicUsize::new(0),
            reductions: AtomicUsize::new(0),
            barriers: AtomicUsize::new(0),
        }
    }

    /// Current counts.
    pub fn counts(&self) -> CommCounts {
        CommCounts {
            sends: self.sends.load(Ordering::SeqCst),
            recvs: self.recvs.load(Ordering::SeqCst),
            reductions: self.reductions.load(Ordering::SeqCst),
            barriers: self.barriers.load(Ordering::SeqCst),
        }
    }
}

impl<C: Communicator> Communicator for CountingComm<C> {
    fn rank(&self) -> usize {
        self.inner.rank()
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn send(&self, dest: usize, payload: Vec<f64>) -> Result<(), CommError> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        self.inner.send(dest, payload)
    }

    fn recv(&self, source: usize) -> Result<Vec<f64>, CommError> {
        self.recvs.fetch_add(1, Ordering::SeqCst);
        self.inner.recv(source)
    }

    fn all_reduce(&self, values: &mut [f64], op: ReduceOp) -> Result<(), CommError> {
        self.reductions.fetch_add(1, Ordering::SeqCst);
        self.inner.all_reduce(values, op)
    }

    fn barrier(&self) -> Result<(), CommError> {
        self.barriers.fetch_add(1, Ordering::SeqCst);
        self.inner.barrier()
    }
}

/// Run `f` on `size` ranks and collect the results in rank order.
///
/// A single rank gets a [`SerialComm`]; larger groups run on threads.
pub fn on_ranks<F, R>(size: usize, f: F) -> Vec<R>
where
    F: Fn(Arc<dyn Communicator>) -> R + Sync,
    R: Send,
{
    if size == 1 {
        return vec![f(Arc::new(SerialComm))];
    }
    run_threaded(size, |comm| f(Arc::new(comm)))
}

/// Concatenate per-rank owned buffers into global node order.
pub fn gather(parts: Vec<Vec<f64>>) -> Vec<f64> {
    parts.into_iter().flatten().collect()
}

/// Assert two buffers agree entrywise within `tol`.
#[track_caller]
pub fn assert_close(actual: &[f64], expected: &[f64], tol: f64) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() <= tol,
            "entry {i}: got {a}, expected {e} (tol {tol})"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_collectives() {
        let comm = CountingComm::new(SerialComm);
        let mut v = [1.0];
        comm.all_reduce(&mut v, ReduceOp::Sum).unwrap();
        comm.barrier().unwrap();
        assert_eq!(
            comm.counts(),
            CommCounts {
                reductions: 1,
                barriers: 1,
                ..CommCounts::default()
            }
        );
    }

    #[test]
    fn on_ranks_orders_results() {
        let ranks = on_ranks(3, |comm| comm.rank());
        assert_eq!(ranks, vec![0, 1, 2]);
        assert_eq!(on_ranks(1, |comm| comm.size()), vec![1]);
    }
}
