//! Slab decomposition along axis 0.

use conduction_core::GridError;

/// The axis-0 range owned by one rank, plus its halo.
///
/// `start..end` are the owned axis-0 indices; `ghost_start..ghost_end`
/// extends that by up to `halo` indices on each side, clipped to the
/// domain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Slab {
    /// Owning rank.
    pub rank: usize,
    /// Number of ranks in the decomposition.
    pub nranks: usize,
    /// Nodes along axis 0 in the whole domain.
    pub global_rows: usize,
    /// Halo width in axis-0 indices.
    pub halo: usize,
    /// First owned axis-0 index.
    pub start: usize,
    /// One past the last owned axis-0 index.
    pub end: usize,
    /// First axis-0 index present in the ghosted buffer.
    pub ghost_start: usize,
    /// One past the last axis-0 index present in the ghosted buffer.
    pub ghost_end: usize,
}

impl Slab {
    /// Owned axis-0 indices.
    pub fn owned_rows(&self) -> usize {
        self.end - self.start
    }

    /// Axis-0 indices in the ghosted buffer.
    pub fn ghost_rows(&self) -> usize {
        self.ghost_end - self.ghost_start
    }

    /// Halo rows received from rank `rank - 1`.
    pub fn lower_halo(&self) -> usize {
        self.start - self.ghost_start
    }

    /// Halo rows received from rank `rank + 1`.
    pub fn upper_halo(&self) -> usize {
        self.ghost_end - self.end
    }

    /// `true` if a lower neighbour rank exists.
    pub fn has_lower_neighbour(&self) -> bool {
        self.rank > 0
    }

    /// `true` if an upper neighbour rank exists.
    pub fn has_upper_neighbour(&self) -> bool {
        self.rank + 1 < self.nranks
    }
}

/// Split `rows` axis-0 indices across `nranks` ranks as evenly as possible,
/// earlier ranks taking the remainder.
///
/// # Errors
///
/// [`GridError::TooManyRanks`] if a rank would own fewer than
/// `max(halo, 1)` rows; the halo of a neighbour must come from a single
/// rank.
pub fn decompose(rows: usize, nranks: usize, halo: usize) -> Result<Vec<Slab>, GridError> {
    if nranks == 0 || rows / nranks < halo.max(1) {
        return Err(GridError::TooManyRanks {
            ranks: nranks,
            nodes: rows,
        });
    }

    let base = rows / nranks;
    let rem = rows % nranks;
    let mut out = Vec::with_capacity(nranks);
    let mut cursor = 0usize;
    for rank in 0..nranks {
        let start = cursor;
        let end = start + base + usize::from(rank < rem);
        cursor = end;
        out.push(Slab {
            rank,
            nranks,
            global_rows: rows,
            halo,
            start,
            end,
            ghost_start: start.saturating_sub(halo),
            ghost_end: (end + halo).min(rows),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn remainder_goes_to_first_ranks() {
        let slabs = decompose(10, 3, 1).unwrap();
        let owned: Vec<usize> = slabs.iter().map(Slab::owned_rows).collect();
        assert_eq!(owned, vec![4, 3, 3]);
        assert_eq!(slabs[1].ghost_start, 3);
        assert_eq!(slabs[1].ghost_end, 8);
    }

    #[test]
    fn edge_slabs_have_one_sided_halo() {
        let slabs = decompose(6, 2, 1).unwrap();
        assert_eq!(slabs[0].lower_halo(), 0);
        assert_eq!(slabs[0].upper_halo(), 1);
        assert_eq!(slabs[1].lower_halo(), 1);
        assert_eq!(slabs[1].upper_halo(), 0);
        assert!(!slabs[0].has_lower_neighbour());
        assert!(slabs[0].has_upper_neighbour());
    }

    #[test]
    fn single_rank_has_no_halo() {
        let slabs = decompose(5, 1, 1).unwrap();
        assert_eq!(slabs[0].ghost_rows(), 5);
        assert_eq!(slabs[0].owned_rows(), 5);
    }

    #[test]
    fn too_many_ranks_rejected() {
        assert_eq!(
            decompose(3, 4, 1),
            Err(GridError::TooManyRanks { ranks: 4, nodes: 3 })
        );
        assert!(decompose(3, 0, 1).is_err());
    }

    proptest! {
        #[test]
        fn slabs_tile_the_axis(rows in 2usize..200, nranks in 1usize..16) {
            prop_assume!(rows >= nranks);
            let slabs = decompose(rows, nranks, 1).unwrap();
            prop_assert_eq!(slabs[0].start, 0);
            prop_assert_eq!(slabs[nranks - 1].end, rows);
            for pair in slabs.windows(2) {
                prop_assert_eq!(pair[0].end, pair[1].start);
            }
            let max = slabs.iter().map(Slab::owned_rows).max().unwrap();
            let min = slabs.iter().map(Slab::owned_rows).min().unwrap();
            prop_assert!(max - min <= 1);
        }
    }
}
