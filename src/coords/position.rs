//! Immutable integer positions.

use std::fmt;

use glam::IVec2;

use super::level::{Level, Scale};

/// Integer 2D coordinate in one scale's grid.
///
/// Positions are immutable; two positions are equal iff both scale and
/// coordinate match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Position {
    scale: Scale,
    coord: IVec2,
}

impl Position {
    pub const fn new(scale: Scale, x: i32, y: i32) -> Self {
        Self { scale, coord: IVec2::new(x, y) }
    }

    pub const fn from_coord(scale: Scale, coord: IVec2) -> Self {
        Self { scale, coord }
    }

    pub const fn universe_cell(x: i32, y: i32) -> Self {
        Self::new(Scale::Grid(Level::Universe), x, y)
    }

    pub const fn filament(x: i32, y: i32) -> Self {
        Self::new(Scale::Grid(Level::Filament), x, y)
    }

    pub const fn filament_chunk(x: i32, y: i32) -> Self {
        Self::new(Scale::Chunk(Level::Filament), x, y)
    }

    pub const fn sector(x: i32, y: i32) -> Self {
        Self::new(Scale::Grid(Level::Sector), x, y)
    }

    pub const fn sector_chunk(x: i32, y: i32) -> Self {
        Self::new(Scale::Chunk(Level::Sector), x, y)
    }

    pub const fn region(x: i32, y: i32) -> Self {
        Self::new(Scale::Grid(Level::Region), x, y)
    }

    pub const fn region_chunk(x: i32, y: i32) -> Self {
        Self::new(Scale::Chunk(Level::Region), x, y)
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn coord(&self) -> IVec2 {
        self.coord
    }

    pub fn x(&self) -> i32 {
        self.coord.x
    }

    pub fn y(&self) -> i32 {
        self.coord.y
    }

    /// Euclidean length of the integer coordinate.
    pub fn magnitude(&self) -> f64 {
        self.coord.as_dvec2().length()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.scale, self.coord.x, self.coord.y)
    }
}
