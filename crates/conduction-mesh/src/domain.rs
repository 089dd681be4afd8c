//! Rectangular domain geometry and global node numbering.

use conduction_core::GridError;
use smallvec::SmallVec;

/// Per-axis values, inline for up to three axes.
pub type AxisVec<T> = SmallVec<[T; 3]>;

/// A rectangular domain sampled by a regular lattice of nodes.
///
/// Nodes are numbered row-major with axis 0 slowest, so the nodes of one
/// axis-0 index form a contiguous "plane" of [`plane_len`](Self::plane_len)
/// entries. That is what lets a slab partition along axis 0 own a
/// contiguous range of the global numbering.
///
/// # Examples
///
/// ```
/// use conduction_mesh::Domain;
///
/// let d = Domain::new(&[0.0, 0.0], &[1.0, 2.0], &[3, 5]).unwrap();
/// assert_eq!(d.dim(), 2);
/// assert_eq!(d.global_len(), 15);
/// assert_eq!(d.plane_len(), 5);
/// assert_eq!(d.axis_coordinates(1), vec![0.0, 0.5, 1.0, 1.5, 2.0]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Domain {
    min_coord: AxisVec<f64>,
    max_coord: AxisVec<f64>,
    resolution: AxisVec<usize>,
    strides: AxisVec<usize>,
}

impl Domain {
    /// Maximum supported dimension.
    pub const MAX_DIM: usize = 3;

    /// Create a domain from its bounds and node count per axis.
    ///
    /// # Errors
    ///
    /// Rejects mismatched axis counts, dimensions outside `1..=3`, axes
    /// with fewer than two nodes, and empty or non-finite extents.
    pub fn new(
        min_coord: &[f64],
        max_coord: &[f64],
        resolution: &[usize],
    ) -> Result<Self, GridError> {
        if min_coord.len() != max_coord.len() || min_coord.len() != resolution.len() {
            return Err(GridError::AxisCountMismatch {
                min: min_coord.len(),
                max: max_coord.len(),
                resolution: resolution.len(),
            });
        }
        let dim = resolution.len();
        if dim == 0 || dim > Self::MAX_DIM {
            return Err(GridError::UnsupportedDimension { dim });
        }
        for axis in 0..dim {
            let (lo, hi) = (min_coord[axis], max_coord[axis]);
            if !lo.is_finite() || !hi.is_finite() || hi <= lo {
                return Err(GridError::InvalidExtent {
                    axis,
                    min: lo,
                    max: hi,
                });
            }
            if resolution[axis] < 2 {
                return Err(GridError::TooFewNodes {
                    axis,
                    nodes: resolution[axis],
                });
            }
        }

        let mut strides: AxisVec<usize> = SmallVec::from_elem(1, dim);
        for axis in (0..dim - 1).rev() {
            strides[axis] = strides[axis + 1] * resolution[axis + 1];
        }

        Ok(Self {
            min_coord: min_coord.iter().copied().collect(),
            max_coord: max_coord.iter().copied().collect(),
            resolution: resolution.iter().copied().collect(),
            strides,
        })
    }

    /// Number of axes.
    pub fn dim(&self) -> usize {
        self.resolution.len()
    }

    /// Lower corner.
    pub fn min_coord(&self) -> &[f64] {
        &self.min_coord
    }

    /// Upper corner.
    pub fn max_coord(&self) -> &[f64] {
        &self.max_coord
    }

    /// Nodes per axis.
    pub fn resolution(&self) -> &[usize] {
        &self.resolution
    }

    /// Flat-index stride of each axis.
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Nodes in one axis-0 plane.
    pub fn plane_len(&self) -> usize {
        self.strides[0]
    }

    /// Total number of nodes.
    pub fn global_len(&self) -> usize {
        self.resolution.iter().product()
    }

    /// Evenly spaced node coordinates along `axis`, endpoints included.
    pub fn axis_coordinates(&self, axis: usize) -> Vec<f64> {
        let n = self.resolution[axis];
        let lo = self.min_coord[axis];
        let h = (self.max_coord[axis] - lo) / (n - 1) as f64;
        (0..n).map(|i| lo + h * i as f64).collect()
    }

    /// Decompose a flat global index into per-axis indices.
    pub fn unravel(&self, mut flat: usize) -> AxisVec<usize> {
        let mut idx: AxisVec<usize> = SmallVec::from_elem(0, self.dim());
        for axis in 0..self.dim() {
            idx[axis] = flat / self.strides[axis];
            flat %= self.strides[axis];
        }
        idx
    }

    /// Flat global index of a per-axis index.
    pub fn ravel(&self, idx: &[usize]) -> usize {
        idx.iter().zip(&self.strides).map(|(i, s)| i * s).sum()
    }
}
