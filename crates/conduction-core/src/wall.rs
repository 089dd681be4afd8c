//! Domain wall identifiers for boundary-condition tables.

use std::fmt;
use std::str::FromStr;

/// One face of the rectangular domain.
///
/// A grid of dimension `d` has walls on axes `0..d`; `MinX`/`MaxX` are
/// axis 0, `MinY`/`MaxY` axis 1 and `MinZ`/`MaxZ` axis 2.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Wall {
    /// Lower face of axis 0.
    MinX,
    /// Upper face of axis 0.
    MaxX,
    /// Lower face of axis 1.
    MinY,
    /// Upper face of axis 1.
    MaxY,
    /// Lower face of axis 2.
    MinZ,
    /// Upper face of axis 2.
    MaxZ,
}

impl Wall {
    /// All walls in axis order.
    pub const ALL: [Wall; 6] = [
        Wall::MinX,
        Wall::MaxX,
        Wall::MinY,
        Wall::MaxY,
        Wall::MinZ,
        Wall::MaxZ,
    ];

    /// The axis this wall is normal to.
    pub fn axis(self) -> usize {
        match self {
            Self::MinX | Self::MaxX => 0,
            Self::MinY | Self::MaxY => 1,
            Self::MinZ | Self::MaxZ => 2,
        }
    }

    /// `true` for the upper face of its axis.
    pub fn is_upper(self) -> bool {
        matches!(self, Self::MaxX | Self::MaxY | Self::MaxZ)
    }

    /// Walls that exist on a grid of dimension `dim`.
    pub fn for_dim(dim: usize) -> impl Iterator<Item = Wall> {
        Self::ALL.into_iter().filter(move |w| w.axis() < dim)
    }

    /// Short name, e.g. `"minX"`.
    pub fn name(self) -> &'static str {
        match self {
            Self::MinX => "minX",
            Self::MaxX => "maxX",
            Self::MinY => "minY",
            Self::MaxY => "maxY",
            Self::MinZ => "minZ",
            Self::MaxZ => "maxZ",
        }
    }
}

impl fmt::Display for Wall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Wall {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|w| w.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown wall '{s}'"))
    }
}
