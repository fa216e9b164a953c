//! Conversion chain between scales via world positions.

use glam::{DVec2, IVec2};

use super::level::{Level, Scale};
use super::position::Position;
use crate::generation::config::CascadeSettings;

/// Relative tolerance under which a scaled coordinate snaps to the nearest
/// integer boundary instead of flooring.
const SNAP_EPSILON: f64 = 1e-9;

/// Exact world extent of one position along an axis, `num / den` universe cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub num: i64,
    pub den: i64,
}

impl Span {
    pub const ONE: Span = Span { num: 1, den: 1 };

    pub fn as_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }

    fn times(self, cells: i64) -> Span {
        Span { num: self.num * cells, den: self.den }
    }

    fn divided_by(self, cells: i64) -> Span {
        Span { num: self.num, den: self.den * cells }
    }
}

/// Snapshot of the conversion factors derived from one `CascadeSettings`.
///
/// Projections must use a single snapshot for both legs of a conversion;
/// mixing snapshots built from different settings yields inconsistent
/// positions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateSystem {
    spans: [Span; 8],
    cell_spans: [Span; 4],
    universe_size: i32,
}

impl CoordinateSystem {
    /// Build the conversion factors for a cascade.
    pub fn new(cascade: &CascadeSettings) -> Self {
        let mut spans = [Span::ONE; 8];

        // Extent of one internal cell of each level.
        let mut cell_span = [Span::ONE; 4];
        for level in Level::ALL {
            if level != Level::Universe {
                let parent_cell = cell_span[level.index() - 1];
                cell_span[level.index()] = parent_cell.divided_by(cascade.level(level).size() as i64);
            }
        }

        for level in Level::ALL {
            let grid = match level.parent() {
                None => Span::ONE,
                Some(parent) => cell_span[parent.index()],
            };
            let chunk = cell_span[level.index()].times(cascade.level(level).chunk_size as i64);
            spans[Scale::Grid(level).index()] = grid;
            spans[Scale::Chunk(level).index()] = chunk;
        }

        Self {
            spans,
            cell_spans: cell_span,
            universe_size: cascade.universe.size() as i32,
        }
    }

    /// Extent of one position of `scale`.
    pub fn span(&self, scale: Scale) -> Span {
        self.spans[scale.index()]
    }

    /// Extent of one cell of a level's internal grid (the grid its fields cover).
    pub fn cell_span(&self, level: Level) -> Span {
        self.cell_spans[level.index()]
    }

    /// Global coordinate, in `level`'s internal cell grid, of the cell containing `world`.
    pub fn to_cell(&self, level: Level, world: DVec2) -> IVec2 {
        let span = self.cell_span(level);
        let scaled = world * span.den as f64 / span.num as f64;
        IVec2::new(floor_snapped(scaled.x), floor_snapped(scaled.y))
    }

    /// Number of universe cells along one axis.
    pub fn universe_size(&self) -> i32 {
        self.universe_size
    }

    /// World position (minimum corner) of a position.
    pub fn to_world_position(&self, position: Position) -> DVec2 {
        let span = self.span(position.scale());
        let coord = position.coord().as_dvec2();
        coord * span.num as f64 / span.den as f64
    }

    /// Position of `scale` whose cell contains `world`.
    ///
    /// Negative coordinates floor toward negative infinity.
    pub fn to_position(&self, scale: Scale, world: DVec2) -> Position {
        let span = self.span(scale);
        let scaled = world * span.den as f64 / span.num as f64;
        Position::from_coord(scale, IVec2::new(floor_snapped(scaled.x), floor_snapped(scaled.y)))
    }

    /// Project a position into another scale through its world position.
    pub fn to_other_scale(&self, position: Position, target: Scale) -> Position {
        if position.scale() == target {
            return position;
        }
        self.to_position(target, self.to_world_position(position))
    }

    /// Whether `inner`'s minimum corner lies inside `outer`.
    pub fn contains(&self, outer: Position, inner: Position) -> bool {
        self.to_other_scale(inner, outer.scale()) == outer
    }

    /// Universe cell containing a position.
    pub fn universe_cell(&self, position: Position) -> IVec2 {
        self.to_other_scale(position, Scale::Grid(Level::Universe)).coord()
    }

    /// Whether a position lies inside the bounded universe grid.
    pub fn in_universe(&self, position: Position) -> bool {
        let cell = self.universe_cell(position);
        (0..self.universe_size).contains(&cell.x) && (0..self.universe_size).contains(&cell.y)
    }
}

fn floor_snapped(value: f64) -> i32 {
    let nearest = value.round();
    if (value - nearest).abs() <= SNAP_EPSILON * nearest.abs().max(1.0) {
        nearest as i32
    } else {
        value.floor() as i32
    }
}
