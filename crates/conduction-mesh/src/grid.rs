//! The partitioned structured grid.

use std::sync::Arc;

use conduction_core::{Communicator, GridError, ReduceOp, Wall};

use crate::domain::{AxisVec, Domain};
use crate::field::DistributedField;
use crate::halo::HaloExchange;
use crate::partition::decompose;
use crate::stencil::Stencil;

/// Halo width of the star stencil.
const STENCIL_HALF_WIDTH: usize = 1;

/// One rank's view of a structured grid split into axis-0 slabs.
///
/// Holds the domain, this rank's [`HaloExchange`], per-axis grid
/// coordinates (axis 0 restricted to the ghosted slab), the coordinates of
/// every ghosted node, and the [`Stencil`] tables. Immutable after
/// construction.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use conduction_comm::SerialComm;
/// use conduction_mesh::{Domain, StructuredGrid};
///
/// let domain = Domain::new(&[0.0], &[4.0], &[5]).unwrap();
/// let grid = StructuredGrid::new(domain, Arc::new(SerialComm)).unwrap();
/// assert_eq!(grid.owned_len(), 5);
/// assert_eq!(grid.grid_coordinates(0), &[0.0, 1.0, 2.0, 3.0, 4.0]);
/// ```
#[derive(Debug)]
pub struct StructuredGrid {
    domain: Domain,
    halo: Arc<HaloExchange>,
    axis_coords: Vec<Vec<f64>>,
    coords: Vec<f64>,
    stencil: Stencil,
}

impl StructuredGrid {
    /// Partition `domain` over `comm` and precompute coordinates and
    /// stencil tables for this rank.
    ///
    /// # Errors
    ///
    /// [`GridError::TooManyRanks`] if axis 0 cannot give every rank at
    /// least one node.
    pub fn new(domain: Domain, comm: Arc<dyn Communicator>) -> Result<Self, GridError> {
        let slab = decompose(domain.resolution()[0], comm.size(), STENCIL_HALF_WIDTH)?
            .swap_remove(comm.rank());
        log::debug!(
            "rank {}/{}: owns axis-0 rows {}..{} (ghosted {}..{})",
            comm.rank(),
            comm.size(),
            slab.start,
            slab.end,
            slab.ghost_start,
            slab.ghost_end
        );
        let halo = Arc::new(HaloExchange::new(comm, slab, domain.plane_len()));

        let dim = domain.dim();
        let mut axis_coords: Vec<Vec<f64>> = (0..dim).map(|a| domain.axis_coordinates(a)).collect();
        let slab = halo.slab();
        axis_coords[0] = axis_coords[0][slab.ghost_start..slab.ghost_end].to_vec();

        let ghosted = halo.ghosted_len();
        let mut coords = Vec::with_capacity(ghosted * dim);
        for g in 0..ghosted {
            let node = domain.unravel(halo.ghosted_to_global(g));
            for axis in 0..dim {
                let full = if axis == 0 {
                    node[0] - slab.ghost_start
                } else {
                    node[axis]
                };
                coords.push(axis_coords[axis][full]);
            }
        }

        let stencil = Stencil::new(&domain, &halo);

        Ok(Self {
            domain,
            halo,
            axis_coords,
            coords,
            stencil,
        })
    }

    /// The global domain.
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Number of axes.
    pub fn dim(&self) -> usize {
        self.domain.dim()
    }

    /// The shared layout/communicator handle.
    pub fn halo(&self) -> &Arc<HaloExchange> {
        &self.halo
    }

    /// The communicator.
    pub fn comm(&self) -> &dyn Communicator {
        self.halo.comm()
    }

    /// This rank.
    pub fn rank(&self) -> usize {
        self.halo.comm().rank()
    }

    /// Owned nodes on this rank.
    pub fn owned_len(&self) -> usize {
        self.halo.owned_len()
    }

    /// Owned plus halo nodes on this rank.
    pub fn ghosted_len(&self) -> usize {
        self.halo.ghosted_len()
    }

    /// Nodes in the whole domain.
    pub fn global_len(&self) -> usize {
        self.domain.global_len()
    }

    /// Ordered node coordinates along `axis` visible to this rank.
    ///
    /// Axis 0 covers the ghosted slab only; other axes are complete.
    pub fn grid_coordinates(&self, axis: usize) -> &[f64] {
        &self.axis_coords[axis]
    }

    /// Coordinates of every ghosted node, `dim` values per node.
    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    /// Coordinates of ghosted node `g`.
    pub fn node_coord(&self, g: usize) -> &[f64] {
        let dim = self.dim();
        &self.coords[g * dim..(g + 1) * dim]
    }

    /// The stencil closure and neighbour index table.
    pub fn stencil(&self) -> &Stencil {
        &self.stencil
    }

    /// A new zero-filled field on this grid.
    pub fn create_field(&self, name: impl Into<String>) -> DistributedField {
        DistributedField::new(name, Arc::clone(&self.halo))
    }

    /// Ghosted-length mask of the nodes lying on `wall`.
    ///
    /// `wall` must exist for this grid's dimension.
    pub fn wall_mask(&self, wall: Wall) -> Vec<bool> {
        let axis = wall.axis();
        let target = if wall.is_upper() {
            self.domain.resolution()[axis] - 1
        } else {
            0
        };
        (0..self.ghosted_len())
            .map(|g| self.domain.unravel(self.halo.ghosted_to_global(g))[axis] == target)
            .collect()
    }

    /// Largest node spacing along each axis across all ranks. Collective.
    pub fn max_spacing(&self) -> Result<AxisVec<f64>, GridError> {
        let mut delta: AxisVec<f64> = self
            .axis_coords
            .iter()
            .map(|c| {
                c.windows(2)
                    .map(|w| w[1] - w[0])
                    .fold(0.0f64, f64::max)
            })
            .collect();
        self.comm().all_reduce(&mut delta, ReduceOp::Max)?;
        Ok(delta)
    }
}
