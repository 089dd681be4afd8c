//! Canonical ↔ ghosted transfers for one rank's slab.

use std::sync::Arc;

use conduction_core::{CommError, Communicator, GridError};

use crate::partition::Slab;

/// The layout of one rank's slab plus the communicator used to fill its
/// halo.
///
/// The canonical buffer holds `owned_len()` entries; the ghosted buffer
/// holds `ghosted_len()` entries with the owned block at
/// `owned_offset()..owned_offset() + owned_len()`. Shared (`Arc`) by the
/// grid and every field and matrix built on it; immutable for its
/// lifetime.
pub struct HaloExchange {
    comm: Arc<dyn Communicator>,
    slab: Slab,
    plane: usize,
}

impl HaloExchange {
    /// Build the exchange for `slab`, whose axis-0 planes hold `plane`
    /// nodes each.
    pub fn new(comm: Arc<dyn Communicator>, slab: Slab, plane: usize) -> Self {
        Self { comm, slab, plane }
    }

    /// The communicator shared by everything built on this layout.
    pub fn comm(&self) -> &dyn Communicator {
        self.comm.as_ref()
    }

    /// This rank's slab.
    pub fn slab(&self) -> &Slab {
        &self.slab
    }

    /// Nodes per axis-0 plane.
    pub fn plane(&self) -> usize {
        self.plane
    }

    /// Entries in the canonical buffer.
    pub fn owned_len(&self) -> usize {
        self.slab.owned_rows() * self.plane
    }

    /// Entries in the ghosted buffer.
    pub fn ghosted_len(&self) -> usize {
        self.slab.ghost_rows() * self.plane
    }

    /// Position of the first owned entry inside the ghosted buffer.
    pub fn owned_offset(&self) -> usize {
        self.slab.lower_halo() * self.plane
    }

    /// Ghosted index of owned entry `i`.
    pub fn owned_to_ghosted(&self, i: usize) -> usize {
        self.owned_offset() + i
    }

    /// `true` if ghosted index `g` is owned by this rank.
    pub fn is_owned(&self, g: usize) -> bool {
        let off = self.owned_offset();
        g >= off && g < off + self.owned_len()
    }

    /// Global flat index of ghosted entry `g`.
    pub fn ghosted_to_global(&self, g: usize) -> usize {
        self.slab.ghost_start * self.plane + g
    }

    /// Global flat index of this rank's first owned entry.
    pub fn global_offset(&self) -> usize {
        self.slab.start * self.plane
    }

    /// Refresh `ghosted` from `canonical`: copy the owned block and receive
    /// the halo planes from the neighbouring ranks.
    ///
    /// Collective over the communicator; every rank must call it.
    pub fn global_to_local(&self, canonical: &[f64], ghosted: &mut [f64]) -> Result<(), GridError> {
        self.check_lengths(canonical.len(), ghosted.len())?;
        let off = self.owned_offset();
        let owned = self.owned_len();
        ghosted[off..off + owned].copy_from_slice(canonical);

        let rank = self.slab.rank;
        let halo_len = self.slab.halo * self.plane;
        if self.slab.has_lower_neighbour() {
            self.comm.send(rank - 1, canonical[..halo_len].to_vec())?;
        }
        if self.slab.has_upper_neighbour() {
            self.comm
                .send(rank + 1, canonical[owned - halo_len..].to_vec())?;
        }

        let lower = self.slab.lower_halo() * self.plane;
        if self.slab.has_lower_neighbour() {
            let recv = self.comm.recv(rank - 1)?;
            expect_len(rank - 1, lower, recv.len())?;
            ghosted[..lower].copy_from_slice(&recv);
        }
        let upper = self.slab.upper_halo() * self.plane;
        if self.slab.has_upper_neighbour() {
            let recv = self.comm.recv(rank + 1)?;
            expect_len(rank + 1, upper, recv.len())?;
            let n = ghosted.len();
            ghosted[n - upper..].copy_from_slice(&recv);
        }
        Ok(())
    }

    /// Push the owned block of `ghosted` back into `canonical`.
    ///
    /// Insert semantics: halo entries are ignored, each owned entry has
    /// exactly one writer. Every rank calls this at the same point of the
    /// collective sequence even though no data crosses ranks.
    pub fn local_to_global(&self, ghosted: &[f64], canonical: &mut [f64]) -> Result<(), GridError> {
        self.check_lengths(canonical.len(), ghosted.len())?;
        let off = self.owned_offset();
        canonical.copy_from_slice(&ghosted[off..off + self.owned_len()]);
        Ok(())
    }

    fn check_lengths(&self, canonical: usize, ghosted: usize) -> Result<(), GridError> {
        if canonical != self.owned_len() {
            return Err(GridError::LengthMismatch {
                what: "canonical buffer".to_string(),
                expected: self.owned_len(),
                got: canonical,
            });
        }
        if ghosted != self.ghosted_len() {
            return Err(GridError::LengthMismatch {
                what: "ghosted buffer".to_string(),
                expected: self.ghosted_len(),
                got: ghosted,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for HaloExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HaloExchange")
            .field("rank", &self.comm.rank())
            .field("slab", &self.slab)
            .field("plane", &self.plane)
            .finish()
    }
}

fn expect_len(peer: usize, expected: usize, got: usize) -> Result<(), GridError> {
    if expected == got {
        Ok(())
    } else {
        Err(CommError::LengthMismatch {
            peer,
            expected,
            got,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::decompose;
    use conduction_comm::{run_threaded, SerialComm};

    #[test]
    fn serial_exchange_is_a_copy() {
        let slab = decompose(4, 1, 1).unwrap().remove(0);
        let halo = HaloExchange::new(Arc::new(SerialComm), slab, 2);
        let canonical: Vec<f64> = (0..8).map(f64::from).collect();
        let mut ghosted = vec![0.0; 8];
        halo.global_to_local(&canonical, &mut ghosted).unwrap();
        assert_eq!(ghosted, canonical);
    }

    #[test]
    fn halo_planes_come_from_neighbours() {
        // 6 rows of 2 nodes over 3 ranks: rows {0,1} {2,3} {4,5}.
        let out = run_threaded(3, |comm| {
            let rank = comm.rank();
            let slab = decompose(6, 3, 1).unwrap().remove(rank);
            let halo = HaloExchange::new(Arc::new(comm), slab, 2);
            let canonical: Vec<f64> = (0..halo.owned_len())
                .map(|i| (halo.global_offset() + i) as f64)
                .collect();
            let mut ghosted = vec![-1.0; halo.ghosted_len()];
            halo.global_to_local(&canonical, &mut ghosted).unwrap();
            ghosted
        });
        assert_eq!(out[0], vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(out[1], vec![2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(out[2], vec![6.0, 7.0, 8.0, 9.0, 10.0, 11.0]);
    }

    #[test]
    fn local_to_global_ignores_halo() {
        let out = run_threaded(2, |comm| {
            let rank = comm.rank();
            let slab = decompose(4, 2, 1).unwrap().remove(rank);
            let halo = HaloExchange::new(Arc::new(comm), slab, 1);
            let ghosted = vec![rank as f64 + 10.0; halo.ghosted_len()];
            let mut canonical = vec![0.0; halo.owned_len()];
            halo.local_to_global(&ghosted, &mut canonical).unwrap();
            canonical
        });
        assert_eq!(out[0], vec![10.0, 10.0]);
        assert_eq!(out[1], vec![11.0, 11.0]);
    }

    #[test]
    fn wrong_length_is_rejected() {
        let slab = decompose(3, 1, 1).unwrap().remove(0);
        let halo = HaloExchange::new(Arc::new(SerialComm), slab, 1);
        let err = halo.global_to_local(&[0.0; 2], &mut [0.0; 3]).unwrap_err();
        assert!(matches!(err, GridError::LengthMismatch { expected: 3, got: 2, .. }));
    }
}
