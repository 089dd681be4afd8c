//! Named quantities living on a partitioned grid.

use std::sync::Arc;

use conduction_core::{GridError, ReduceOp};

use crate::halo::HaloExchange;

/// A value accepted by [`DistributedField::write`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Assign<'a> {
    /// Broadcast one value into every canonical and ghosted entry.
    Fill(f64),
    /// A full ghosted-length buffer.
    Ghosted(&'a [f64]),
}

impl From<f64> for Assign<'_> {
    fn from(v: f64) -> Self {
        Self::Fill(v)
    }
}

impl<'a> From<&'a [f64]> for Assign<'a> {
    fn from(v: &'a [f64]) -> Self {
        Self::Ghosted(v)
    }
}

impl<'a> From<&'a Vec<f64>> for Assign<'a> {
    fn from(v: &'a Vec<f64>) -> Self {
        Self::Ghosted(v.as_slice())
    }
}

/// A named quantity with a canonical and a ghosted representation.
///
/// The canonical buffer holds this rank's owned entries and is always
/// authoritative. The ghosted buffer adds the halo and may be stale until
/// the next pull. Every accessor that touches the ghosted side names its
/// communication: [`read`](Self::read), [`array`](Self::array),
/// [`get`](Self::get) and [`local`](Self::local) pull (halo exchange);
/// [`set`](Self::set) and [`write`](Self::write) push. All of them are
/// collectives, so every rank must call them in the same order; prefer one
/// bulk `read` over per-element `get` in loops.
///
/// Dropping the field releases both buffers.
pub struct DistributedField {
    name: String,
    canonical: Vec<f64>,
    ghosted: Vec<f64>,
    halo: Arc<HaloExchange>,
}

impl DistributedField {
    /// A zero-filled field on `halo`'s layout.
    pub fn new(name: impl Into<String>, halo: Arc<HaloExchange>) -> Self {
        let name = name.into();
        log::trace!("creating field '{name}' ({} ghosted entries)", halo.ghosted_len());
        Self {
            canonical: vec![0.0; halo.owned_len()],
            ghosted: vec![0.0; halo.ghosted_len()],
            name,
            halo,
        }
    }

    /// The field's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Length of the ghosted buffer.
    pub fn size(&self) -> usize {
        self.ghosted.len()
    }

    /// Length of the canonical buffer.
    pub fn owned_len(&self) -> usize {
        self.canonical.len()
    }

    /// The layout this field lives on.
    pub fn halo(&self) -> &Arc<HaloExchange> {
        &self.halo
    }

    fn pull(&mut self) -> Result<(), GridError> {
        self.halo.global_to_local(&self.canonical, &mut self.ghosted)
    }

    fn push(&mut self) -> Result<(), GridError> {
        self.halo.local_to_global(&self.ghosted, &mut self.canonical)
    }

    fn check_pos(&self, pos: usize) -> Result<(), GridError> {
        if pos < self.ghosted.len() {
            Ok(())
        } else {
            Err(GridError::IndexOutOfRange {
                index: pos,
                len: self.ghosted.len(),
            })
        }
    }

    /// Pull, then read ghosted entry `pos`.
    pub fn get(&mut self, pos: usize) -> Result<f64, GridError> {
        self.check_pos(pos)?;
        self.pull()?;
        Ok(self.ghosted[pos])
    }

    /// Write ghosted entry `pos`, then push to canonical.
    ///
    /// Writing a halo position only changes the local copy; the owner's
    /// value wins at the next pull.
    pub fn set(&mut self, pos: usize, value: f64) -> Result<(), GridError> {
        self.check_pos(pos)?;
        self.ghosted[pos] = value;
        self.push()
    }

    /// Pull, then return the whole ghosted buffer.
    pub fn array(&mut self) -> Result<&[f64], GridError> {
        self.pull()?;
        Ok(&self.ghosted)
    }

    /// Pull, then return the ghosted buffer.
    pub fn read(&mut self) -> Result<&[f64], GridError> {
        self.array()
    }

    /// Assign the field.
    ///
    /// [`Assign::Fill`] sets canonical and ghosted identically without
    /// communication; [`Assign::Ghosted`] copies a ghosted-length buffer
    /// and pushes it to canonical.
    pub fn write<'a>(&mut self, value: impl Into<Assign<'a>>) -> Result<(), GridError> {
        match value.into() {
            Assign::Fill(v) => {
                self.canonical.fill(v);
                self.ghosted.fill(v);
                Ok(())
            }
            Assign::Ghosted(values) => {
                if values.len() != self.ghosted.len() {
                    return Err(GridError::LengthMismatch {
                        what: format!("write to field '{}'", self.name),
                        expected: self.ghosted.len(),
                        got: values.len(),
                    });
                }
                self.ghosted.copy_from_slice(values);
                self.push()
            }
        }
    }

    /// Assign the canonical buffer directly. The ghosted side is stale
    /// until the next pull.
    pub fn write_global(&mut self, values: &[f64]) -> Result<(), GridError> {
        if values.len() != self.canonical.len() {
            return Err(GridError::LengthMismatch {
                what: format!("canonical write to field '{}'", self.name),
                expected: self.canonical.len(),
                got: values.len(),
            });
        }
        self.canonical.copy_from_slice(values);
        Ok(())
    }

    /// The canonical buffer.
    pub fn global(&self) -> &[f64] {
        &self.canonical
    }

    /// Mutable canonical buffer, for collaborators that produce owned
    /// values (e.g. a linear solve). The ghosted side is stale until the
    /// next pull.
    pub fn global_mut(&mut self) -> &mut [f64] {
        &mut self.canonical
    }

    /// The synchronized ghosted buffer (same as [`read`](Self::read)).
    pub fn local(&mut self) -> Result<&[f64], GridError> {
        self.read()
    }

    /// Global maximum over every rank's canonical entries. Collective.
    pub fn global_max(&self) -> Result<f64, GridError> {
        let local = self
            .canonical
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        Ok(self.halo.comm().all_reduce_scalar(local, ReduceOp::Max)?)
    }
}

impl std::fmt::Debug for DistributedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributedField")
            .field("name", &self.name)
            .field("owned", &self.canonical.len())
            .field("ghosted", &self.ghosted.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::decompose;
    use conduction_comm::{run_threaded, SerialComm};
    use conduction_core::Communicator;

    fn serial_field(rows: usize) -> DistributedField {
        let slab = decompose(rows, 1, 1).unwrap().remove(0);
        DistributedField::new("t", Arc::new(HaloExchange::new(Arc::new(SerialComm), slab, 1)))
    }

    #[test]
    fn fill_sets_both_sides() {
        let mut f = serial_field(4);
        f.write(2.5).unwrap();
        assert_eq!(f.global(), &[2.5; 4]);
        assert_eq!(f.read().unwrap(), &[2.5; 4]);
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut f = serial_field(3);
        f.set(1, 7.0).unwrap();
        assert_eq!(f.global(), &[0.0, 7.0, 0.0]);
        assert_eq!(f.get(1).unwrap(), 7.0);
    }

    #[test]
    fn read_is_idempotent() {
        let mut f = serial_field(5);
        f.write(&vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let first = f.read().unwrap().to_vec();
        let second = f.read().unwrap().to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn write_rejects_wrong_length() {
        let mut f = serial_field(3);
        let err = f.write(&[1.0, 2.0][..]).unwrap_err();
        assert!(matches!(err, GridError::LengthMismatch { expected: 3, got: 2, .. }));
        assert!(matches!(f.get(3), Err(GridError::IndexOutOfRange { index: 3, len: 3 })));
    }

    #[test]
    fn canonical_writes_reach_ghosted_after_pull() {
        let mut f = serial_field(2);
        f.global_mut()[0] = 4.0;
        f.write_global(&[4.0, 5.0]).unwrap();
        assert_eq!(f.local().unwrap(), &[4.0, 5.0]);
    }

    #[test]
    fn halo_holds_owner_values_after_pull() {
        let out = run_threaded(2, |comm| {
            let rank = comm.rank();
            let slab = decompose(4, 2, 1).unwrap().remove(rank);
            let halo = Arc::new(HaloExchange::new(Arc::new(comm), slab, 1));
            let mut f = DistributedField::new("t", halo);
            let owned: Vec<f64> = (0..2).map(|i| (rank * 2 + i) as f64).collect();
            f.write_global(&owned).unwrap();
            let max = f.global_max().unwrap();
            (f.read().unwrap().to_vec(), max)
        });
        assert_eq!(out[0].0, vec![0.0, 1.0, 2.0]);
        assert_eq!(out[1].0, vec![1.0, 2.0, 3.0]);
        assert_eq!(out[0].1, 3.0);
        assert_eq!(out[1].1, 3.0);
    }
}
