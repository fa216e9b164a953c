//! Cosmogen - a procedurally generated, five-level universe hierarchy
//!
//! Universe → Filament → Sector → Region, each level subdivided into chunks,
//! with density fields that cascade from each level into the next.

pub mod core;
pub mod coords;
pub mod generation;
pub mod hierarchy;
pub mod streaming;
