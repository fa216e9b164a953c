//! Hierarchy levels and the grids they expose.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the four hierarchy scales, coarsest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    Universe,
    Filament,
    Sector,
    Region,
}

impl Level {
    /// All levels, coarsest to finest.
    pub const ALL: [Level; 4] = [Level::Universe, Level::Filament, Level::Sector, Level::Region];

    /// Next coarser level.
    pub fn parent(self) -> Option<Level> {
        match self {
            Level::Universe => None,
            Level::Filament => Some(Level::Universe),
            Level::Sector => Some(Level::Filament),
            Level::Region => Some(Level::Sector),
        }
    }

    /// Next finer level.
    pub fn child(self) -> Option<Level> {
        match self {
            Level::Universe => Some(Level::Filament),
            Level::Filament => Some(Level::Sector),
            Level::Sector => Some(Level::Region),
            Level::Region => None,
        }
    }

    /// Index in coarsest-first order.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Level::Universe => "Universe",
            Level::Filament => "Filament",
            Level::Sector => "Sector",
            Level::Region => "Region",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An addressable grid: a level's own positions or the chunks of that level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scale {
    /// One position per structure of the level (a Filament, a Sector, ...).
    Grid(Level),
    /// Chunks subdividing the level's internal cell grid.
    Chunk(Level),
}

impl Scale {
    /// All eight scales, coarsest level first, grid before chunk.
    pub const ALL: [Scale; 8] = [
        Scale::Grid(Level::Universe),
        Scale::Chunk(Level::Universe),
        Scale::Grid(Level::Filament),
        Scale::Chunk(Level::Filament),
        Scale::Grid(Level::Sector),
        Scale::Chunk(Level::Sector),
        Scale::Grid(Level::Region),
        Scale::Chunk(Level::Region),
    ];

    pub fn level(self) -> Level {
        match self {
            Scale::Grid(level) | Scale::Chunk(level) => level,
        }
    }

    pub fn is_chunk(self) -> bool {
        matches!(self, Scale::Chunk(_))
    }

    /// Dense index into `Scale::ALL`.
    pub fn index(self) -> usize {
        self.level().index() * 2 + usize::from(self.is_chunk())
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scale::Grid(level) => write!(f, "{}", level),
            Scale::Chunk(level) => write!(f, "{} chunk", level),
        }
    }
}
