//! Density fields and per-level field collections.

use glam::IVec2;

use super::species::Species;
use crate::coords::Level;
use crate::core::{Error, Result};

/// Lifecycle of a field collection. Moves Generating → Generated exactly once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GenerationState {
    Generating,
    Generated,
}

/// Scalar value per cell for one species over a square block of cells.
///
/// `origin` is the global cell coordinate (in the level's cell grid) of the
/// first value; values are stored row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct DensityField {
    species: Species,
    origin: IVec2,
    size: u32,
    values: Vec<f32>,
}

impl DensityField {
    pub fn new(species: Species, origin: IVec2, size: u32, values: Vec<f32>) -> Result<Self> {
        let expected = size as usize * size as usize;
        if values.len() != expected {
            return Err(Error::Kernel(format!(
                "{} field holds {} values, expected {}",
                species,
                values.len(),
                expected
            )));
        }
        Ok(Self { species, origin, size, values })
    }

    pub fn species(&self) -> Species {
        self.species
    }

    pub fn origin(&self) -> IVec2 {
        self.origin
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Value at a cell relative to `origin`.
    pub fn get(&self, local: IVec2) -> Option<f32> {
        let size = self.size as i32;
        if local.x < 0 || local.y < 0 || local.x >= size || local.y >= size {
            return None;
        }
        self.values.get((local.y * size + local.x) as usize).copied()
    }

    /// Value at a global cell coordinate.
    pub fn get_global(&self, cell: IVec2) -> Option<f32> {
        self.get(cell - self.origin)
    }

    /// Iterate `(global cell, value)` pairs in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (IVec2, f32)> + '_ {
        let size = self.size as i32;
        self.values.iter().enumerate().map(move |(i, &v)| {
            let i = i as i32;
            (self.origin + IVec2::new(i % size, i / size), v)
        })
    }

    /// Minimum and maximum stored values.
    pub fn range(&self) -> Option<(f32, f32)> {
        if self.values.is_empty() {
            return None;
        }
        let min = self.values.iter().copied().fold(f32::INFINITY, f32::min);
        let max = self.values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        Some((min, max))
    }
}

/// The fixed species set of one level over one block of cells.
///
/// Fields become visible all at once: a collection is either Generating with
/// no fields, or Generated with every species present.
#[derive(Clone, Debug, PartialEq)]
pub struct DensityFieldCollection {
    level: Level,
    origin: IVec2,
    size: u32,
    state: GenerationState,
    fields: Vec<DensityField>,
}

impl DensityFieldCollection {
    /// Empty collection awaiting synthesis.
    pub fn generating(level: Level, origin: IVec2, size: u32) -> Self {
        Self {
            level,
            origin,
            size,
            state: GenerationState::Generating,
            fields: Vec::new(),
        }
    }

    /// Complete collection; the fields must match the level's species set in order.
    pub fn generated(level: Level, origin: IVec2, size: u32, fields: Vec<DensityField>) -> Result<Self> {
        let species = Species::for_level(level);
        if fields.len() != species.len() {
            return Err(Error::Kernel(format!(
                "{} collection needs {} fields, got {}",
                level,
                species.len(),
                fields.len()
            )));
        }
        for (field, &expected) in fields.iter().zip(species) {
            if field.species != expected || field.origin != origin || field.size != size {
                return Err(Error::Kernel(format!(
                    "{} field does not match {} collection layout",
                    field.species, level
                )));
            }
        }

        Ok(Self {
            level,
            origin,
            size,
            state: GenerationState::Generated,
            fields,
        })
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn origin(&self) -> IVec2 {
        self.origin
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn state(&self) -> GenerationState {
        self.state
    }

    pub fn is_generated(&self) -> bool {
        self.state == GenerationState::Generated
    }

    pub fn fields(&self) -> &[DensityField] {
        &self.fields
    }

    pub fn field(&self, species: Species) -> Option<&DensityField> {
        self.fields.iter().find(|f| f.species == species)
    }

    /// Number of cells covered by each field.
    pub fn cell_count(&self) -> usize {
        self.size as usize * self.size as usize
    }

    /// Mean over all species at a cell relative to `origin`.
    pub fn mean_at(&self, local: IVec2) -> Option<f32> {
        if !self.is_generated() {
            return None;
        }
        let mut sum = 0.0;
        for field in &self.fields {
            sum += field.get(local)?;
        }
        Some(sum / self.fields.len() as f32)
    }

    /// Per-species values at a global cell.
    pub fn sample_global(&self, cell: IVec2) -> Option<Vec<(Species, f32)>> {
        if !self.is_generated() {
            return None;
        }
        self.fields
            .iter()
            .map(|f| f.get_global(cell).map(|v| (f.species, v)))
            .collect()
    }

    /// Take over a freshly generated collection covering the same block.
    ///
    /// Fails if this collection already completed; the state never reverts.
    pub(crate) fn absorb(&mut self, generated: DensityFieldCollection, owner: &str) -> Result<()> {
        if self.is_generated() {
            return Err(Error::AlreadyGenerated(owner.to_string()));
        }
        if !generated.is_generated()
            || generated.level != self.level
            || generated.origin != self.origin
            || generated.size != self.size
        {
            return Err(Error::Kernel(format!(
                "result for {} does not cover the requested cells",
                owner
            )));
        }
        *self = generated;
        Ok(())
    }
}
