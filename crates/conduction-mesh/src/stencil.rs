//! Neighbour-offset closure and per-node neighbour index table.

use smallvec::{smallvec, SmallVec};

use crate::domain::Domain;
use crate::halo::HaloExchange;

/// A relative per-axis offset from a node to one of its stencil neighbours.
pub type Offset = SmallVec<[i32; 3]>;

/// Index-table sentinel for a neighbour outside the domain.
pub const OFF_GRID: i64 = -1;

/// The fixed-width star stencil of a structured grid.
///
/// The closure lists `-1` and `+1` along each axis in axis order, followed
/// by the centre (all-zero) offset, which is always the last entry.
/// The index table stores, for every closure entry `k` and owned node `i`,
/// the ghosted index of the neighbour or [`OFF_GRID`].
#[derive(Clone, Debug)]
pub struct Stencil {
    closure: Vec<Offset>,
    owned: usize,
    /// `index[k * owned + i]`.
    index: Vec<i64>,
}

impl Stencil {
    /// Build the closure and index table for one rank's slab.
    pub fn new(domain: &Domain, halo: &HaloExchange) -> Self {
        let dim = domain.dim();
        let mut closure: Vec<Offset> = Vec::with_capacity(2 * dim + 1);
        for axis in 0..dim {
            for step in [-1, 1] {
                let mut o: Offset = smallvec![0; dim];
                o[axis] = step;
                closure.push(o);
            }
        }
        closure.push(smallvec![0; dim]);

        let owned = halo.owned_len();
        let ghost_base = halo.slab().ghost_start * domain.plane_len();
        let mut index = vec![OFF_GRID; closure.len() * owned];

        for i in 0..owned {
            let global = halo.global_offset() + i;
            let node = domain.unravel(global);
            'closure: for (k, offset) in closure.iter().enumerate() {
                let mut neighbour: SmallVec<[usize; 3]> = SmallVec::with_capacity(dim);
                for axis in 0..dim {
                    let n = node[axis] as i64 + offset[axis] as i64;
                    if n < 0 || n >= domain.resolution()[axis] as i64 {
                        continue 'closure;
                    }
                    neighbour.push(n as usize);
                }
                index[k * owned + i] = (domain.ravel(&neighbour) - ghost_base) as i64;
            }
        }

        Self {
            closure,
            owned,
            index,
        }
    }

    /// Number of closure entries (`2 * dim + 1`).
    pub fn width(&self) -> usize {
        self.closure.len()
    }

    /// The closure offsets, centre last.
    pub fn closure(&self) -> &[Offset] {
        &self.closure
    }

    /// Position of the centre offset in the closure.
    pub fn centre(&self) -> usize {
        self.closure.len() - 1
    }

    /// Owned nodes covered by the table.
    pub fn owned_len(&self) -> usize {
        self.owned
    }

    /// Ghosted neighbour index of every owned node for closure entry `k`.
    pub fn neighbours(&self, k: usize) -> &[i64] {
        &self.index[k * self.owned..(k + 1) * self.owned]
    }

    /// The full `width × owned` table, closure-major.
    pub fn index(&self) -> &[i64] {
        &self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::decompose;
    use conduction_comm::SerialComm;
    use std::sync::Arc;

    fn serial_stencil(min: &[f64], max: &[f64], res: &[usize]) -> Stencil {
        let domain = Domain::new(min, max, res).unwrap();
        let slab = decompose(res[0], 1, 1).unwrap().remove(0);
        let halo = HaloExchange::new(Arc::new(SerialComm), slab, domain.plane_len());
        Stencil::new(&domain, &halo)
    }

    #[test]
    fn centre_is_last() {
        let s = serial_stencil(&[0.0, 0.0], &[1.0, 1.0], &[3, 3]);
        assert_eq!(s.width(), 5);
        assert!(s.closure()[s.centre()].iter().all(|&o| o == 0));
        let centre = s.neighbours(s.centre());
        assert!(centre.iter().enumerate().all(|(i, &g)| g == i as i64));
    }

    #[test]
    fn edges_are_off_grid_in_1d() {
        let s = serial_stencil(&[0.0], &[4.0], &[5]);
        // closure: [-1], [+1], [0]
        assert_eq!(s.neighbours(0), &[OFF_GRID, 0, 1, 2, 3]);
        assert_eq!(s.neighbours(1), &[1, 2, 3, 4, OFF_GRID]);
    }

    #[test]
    fn second_axis_neighbours_in_2d() {
        // 2 x 3 grid, flat = r * 3 + c.
        let s = serial_stencil(&[0.0, 0.0], &[1.0, 2.0], &[2, 3]);
        // closure order: x-, x+, y-, y+, centre
        assert_eq!(s.neighbours(2), &[OFF_GRID, 0, 1, OFF_GRID, 3, 4]);
        assert_eq!(s.neighbours(3), &[1, 2, OFF_GRID, 4, 5, OFF_GRID]);
        assert_eq!(s.neighbours(1), &[3, 4, 5, OFF_GRID, OFF_GRID, OFF_GRID]);
    }
}
