//! Grid fixtures shared by integration tests and benchmarks.
//!
//! - [`GridSpec::rod`]: a 1-D rod with unit node spacing.
//! - [`GridSpec::plate`]: a 2-D plate with unit node spacing.
//! - [`GridSpec::block`]: a 3-D block with unit node spacing.

use conduction_core::GridError;
use conduction_mesh::Domain;

/// Bounds and resolution of a test domain.
#[derive(Clone, Debug, PartialEq)]
pub struct GridSpec {
    pub min_coord: Vec<f64>,
    pub max_coord: Vec<f64>,
    pub resolution: Vec<usize>,
}

impl GridSpec {
    fn unit_spaced(resolution: &[usize]) -> Self {
        Self {
            min_coord: vec![0.0; resolution.len()],
            max_coord: resolution.iter().map(|&n| (n - 1) as f64).collect(),
            resolution: resolution.to_vec(),
        }
    }

    /// `[0, nodes - 1]` with `nodes` nodes.
    pub fn rod(nodes: usize) -> Self {
        Self::unit_spaced(&[nodes])
    }

    /// `[0, nx - 1] x [0, ny - 1]`.
    pub fn plate(nx: usize, ny: usize) -> Self {
        Self::unit_spaced(&[nx, ny])
    }

    /// `[0, nx - 1] x [0, ny - 1] x [0, nz - 1]`.
    pub fn block(nx: usize, ny: usize, nz: usize) -> Self {
        Self::unit_spaced(&[nx, ny, nz])
    }

    /// Total node count.
    pub fn global_len(&self) -> usize {
        self.resolution.iter().product()
    }

    /// The validated domain.
    pub fn domain(&self) -> Result<Domain, GridError> {
        Domain::new(&self.min_coord, &self.max_coord, &self.resolution)
    }
}

/// Steady profile of a rod held at `lo` and `hi` at its two ends, sampled
/// at each of `nodes` evenly spaced nodes.
pub fn linear_profile(nodes: usize, lo: f64, hi: f64) -> Vec<f64> {
    let last = (nodes - 1) as f64;
    (0..nodes)
        .map(|i| lo + (hi - lo) * i as f64 / last)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rod_has_unit_spacing() {
        let rod = GridSpec::rod(5);
        assert_eq!(rod.max_coord, vec![4.0]);
        assert_eq!(rod.domain().unwrap().axis_coordinates(0), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn profile_hits_both_ends() {
        assert_eq!(linear_profile(5, 0.0, 1.0), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(GridSpec::plate(3, 4).global_len(), 12);
    }
}
