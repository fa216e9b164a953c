//! Integer cell addressing per scale and the conversion chain between scales.
//!
//! Every position maps to a world position (universe-cell units, minimum
//! corner) and any world position projects back into a position at any
//! scale. Both directions read the same `CoordinateSystem` snapshot.

pub mod level;
pub mod position;
pub mod system;

pub use level::{Level, Scale};
pub use position::Position;
pub use system::{CoordinateSystem, Span};
