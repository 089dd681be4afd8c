//! Per-wall boundary conditions.

use indexmap::IndexMap;

use conduction_core::{ConfigError, Wall};
use conduction_mesh::StructuredGrid;

/// The condition on one wall.
///
/// Flux type adds `value` to the right-hand side at the wall's nodes;
/// value (Dirichlet) type pins them to `value`.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundaryCondition {
    /// Prescribed flux or temperature.
    pub value: f64,
    /// `true` for flux type, `false` for a fixed value.
    pub flux: bool,
    /// Ghosted-length selection of the wall's nodes.
    pub mask: Vec<bool>,
}

/// Boundary conditions for every wall of a grid, iterated in insertion
/// order. Every wall starts insulated (flux type, value 0).
#[derive(Clone, Debug)]
pub struct BoundaryConditions {
    dim: usize,
    walls: IndexMap<Wall, BoundaryCondition>,
}

impl BoundaryConditions {
    /// Insulated conditions on every wall of `grid`.
    pub fn insulated(grid: &StructuredGrid) -> Self {
        let walls = Wall::for_dim(grid.dim())
            .map(|wall| {
                let bc = BoundaryCondition {
                    value: 0.0,
                    flux: true,
                    mask: grid.wall_mask(wall),
                };
                (wall, bc)
            })
            .collect();
        Self {
            dim: grid.dim(),
            walls,
        }
    }

    /// Replace the condition on `wall`, keeping its position in the
    /// iteration order.
    pub fn set(&mut self, wall: Wall, value: f64, flux: bool) -> Result<(), ConfigError> {
        let bc = self.walls.get_mut(&wall).ok_or(ConfigError::UnknownWall {
            wall,
            dim: self.dim,
        })?;
        bc.value = value;
        bc.flux = flux;
        Ok(())
    }

    /// The condition on `wall`, if the grid has it.
    pub fn get(&self, wall: Wall) -> Option<&BoundaryCondition> {
        self.walls.get(&wall)
    }

    /// Walls and conditions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Wall, &BoundaryCondition)> {
        self.walls.iter().map(|(&w, bc)| (w, bc))
    }

    /// Ghosted-length union of the masks of all fixed-value walls.
    pub fn dirichlet_mask(&self, ghosted_len: usize) -> Vec<bool> {
        let mut mask = vec![false; ghosted_len];
        for bc in self.walls.values().filter(|bc| !bc.flux) {
            for (m, &on) in mask.iter_mut().zip(&bc.mask) {
                *m |= on;
            }
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduction_comm::SerialComm;
    use conduction_mesh::Domain;
    use std::sync::Arc;

    fn plate() -> StructuredGrid {
        let domain = Domain::new(&[0.0, 0.0], &[1.0, 1.0], &[3, 3]).unwrap();
        StructuredGrid::new(domain, Arc::new(SerialComm)).unwrap()
    }

    #[test]
    fn defaults_are_insulated_in_axis_order() {
        let bcs = BoundaryConditions::insulated(&plate());
        let walls: Vec<Wall> = bcs.iter().map(|(w, _)| w).collect();
        assert_eq!(walls, vec![Wall::MinX, Wall::MaxX, Wall::MinY, Wall::MaxY]);
        assert!(bcs.iter().all(|(_, bc)| bc.flux && bc.value == 0.0));
        assert!(bcs.dirichlet_mask(9).iter().all(|&m| !m));
    }

    #[test]
    fn dirichlet_mask_is_union_of_value_walls() {
        let mut bcs = BoundaryConditions::insulated(&plate());
        bcs.set(Wall::MinX, 1.0, false).unwrap();
        bcs.set(Wall::MinY, 2.0, false).unwrap();
        bcs.set(Wall::MaxY, 5.0, true).unwrap();
        let mask = bcs.dirichlet_mask(9);
        let expected = [true, true, true, true, false, false, true, false, false];
        assert_eq!(mask, expected);
    }

    #[test]
    fn missing_wall_is_rejected() {
        let mut bcs = BoundaryConditions::insulated(&plate());
        assert_eq!(
            bcs.set(Wall::MaxZ, 0.0, false),
            Err(ConfigError::UnknownWall {
                wall: Wall::MaxZ,
                dim: 2
            })
        );
    }
}
