//! Kernel-execution collaborator: an opaque deterministic function of
//! (flat settings record, named input fields, named output shapes).

use bytemuck::{Pod, Zeroable};
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use rayon::prelude::*;

use super::buffers::FieldBuffer;
use super::config::GenerationSettings;
use crate::core::{Error, Result};

/// Name of the input buffer carrying the parent level's density.
pub const PARENT_INPUT: &str = "parent";

/// Flat settings record uploaded with every dispatch.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct KernelParams {
    pub seed: i32,
    pub size: u32,
    pub octaves: u32,
    pub species_count: u32,
    pub power: f32,
    pub frequency: f32,
    pub persistence: f32,
    pub lacunarity: f32,
    pub amplitude: f32,
    pub jitter: f32,
    pub from_min: f32,
    pub from_max: f32,
    pub to_min: f32,
    pub to_max: f32,
    pub influence: f32,
    pub _padding: f32,
}

impl KernelParams {
    /// Flatten level settings for one dispatch.
    pub fn new(settings: &GenerationSettings, seed: i32, size: u32, species_count: u32) -> Self {
        Self {
            seed,
            size,
            octaves: settings.noise.octaves,
            species_count,
            power: settings.noise.power,
            frequency: settings.noise.frequency,
            persistence: settings.noise.persistence,
            lacunarity: settings.noise.lacunarity,
            amplitude: settings.noise.amplitude,
            jitter: settings.noise.jitter.unwrap_or(0.0),
            from_min: settings.remap.from_min,
            from_max: settings.remap.from_max,
            to_min: settings.remap.to_min,
            to_max: settings.remap.to_max,
            influence: settings.influence,
            _padding: 0.0,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Executes field synthesis over pre-populated buffers.
///
/// Implementations must be deterministic: identical params and input cells
/// produce bit-identical output values.
pub trait FieldKernel: Send + Sync {
    fn name(&self) -> &'static str {
        "FieldKernel"
    }

    /// Fill every output buffer's `value`s. Cell coordinates are already set.
    fn dispatch(
        &self,
        params: &KernelParams,
        inputs: &[&FieldBuffer],
        outputs: &mut [&mut FieldBuffer],
    ) -> Result<()>;
}

/// CPU fBm kernel running each output buffer across the rayon pool.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoiseKernel;

impl NoiseKernel {
    /// Seed for the `index`-th species of a dispatch.
    fn species_seed(seed: i32, index: usize) -> u32 {
        (seed as u32).wrapping_add((index as u32).wrapping_mul(0x9E37_79B9))
    }
}

impl FieldKernel for NoiseKernel {
    fn name(&self) -> &'static str {
        "NoiseKernel"
    }

    fn dispatch(
        &self,
        params: &KernelParams,
        inputs: &[&FieldBuffer],
        outputs: &mut [&mut FieldBuffer],
    ) -> Result<()> {
        let parent = inputs.iter().find(|b| b.name == PARENT_INPUT).copied();

        for (index, output) in outputs.iter_mut().enumerate() {
            if let Some(parent) = parent {
                if parent.cells.len() != output.cells.len() {
                    return Err(Error::Kernel(format!(
                        "parent input has {} cells, output {} has {}",
                        parent.cells.len(),
                        output.name,
                        output.cells.len()
                    )));
                }
            }

            let species_seed = Self::species_seed(params.seed, index);
            let fbm = Fbm::<Perlin>::new(species_seed)
                .set_octaves(params.octaves as usize)
                .set_frequency(params.frequency as f64)
                .set_persistence(params.persistence as f64)
                .set_lacunarity(params.lacunarity as f64);

            output.cells.par_iter_mut().enumerate().for_each(|(i, cell)| {
                // Sample cell centers; Perlin is zero on the integer lattice.
                let raw = fbm.get([cell.x as f64 + 0.5, cell.y as f64 + 0.5]) as f32;
                let jitter = if params.jitter != 0.0 {
                    params.jitter * (cell_hash(cell.x, cell.y, species_seed) - 0.5)
                } else {
                    0.0
                };
                let parent_value = parent.map_or(0.0, |p| p.cells[i].value);
                cell.value = shape(params, (raw + jitter) * params.amplitude, parent_value);
            });
        }

        log::trace!(
            "{} filled {} outputs of {}x{} cells",
            self.name(),
            outputs.len(),
            params.size,
            params.size
        );
        Ok(())
    }
}

/// Remap, power curve, parent influence, clamp into the target range.
fn shape(params: &KernelParams, raw: f32, parent: f32) -> f32 {
    let t = (raw - params.from_min) / (params.from_max - params.from_min);
    let span = params.to_max - params.to_min;
    let t = t.clamp(0.0, 1.0).powf(params.power);
    let value = params.to_min + t * span + params.influence * parent;
    value.clamp(params.to_min, params.to_max)
}

/// Stateless hash of a cell into [0, 1).
fn cell_hash(x: i32, y: i32, seed: u32) -> f32 {
    let mut h = (x as u32 as u64) | ((y as u32 as u64) << 32);
    h ^= (seed as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    h = (h ^ (h >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    h = (h ^ (h >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    h ^= h >> 31;
    (h >> 40) as f32 / (1u64 << 24) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::buffers::BufferPool;
    use crate::generation::config::CascadeSettings;
    use glam::IVec2;

    fn run(params: &KernelParams, parent_value: Option<f32>, size: u32) -> Vec<Vec<f32>> {
        let pool = BufferPool::new();
        let mut parent = pool.acquire(PARENT_INPUT, IVec2::new(3, 9), size);
        for cell in parent.cells.iter_mut() {
            cell.value = parent_value.unwrap_or(0.0);
        }
        let mut a = pool.acquire("a", IVec2::new(3, 9), size);
        let mut b = pool.acquire("b", IVec2::new(3, 9), size);
        let inputs: Vec<&FieldBuffer> = if parent_value.is_some() { vec![&*parent] } else { vec![] };
        NoiseKernel.dispatch(params, &inputs, &mut [&mut *a, &mut *b]).unwrap();
        vec![
            a.cells.iter().map(|c| c.value).collect(),
            b.cells.iter().map(|c| c.value).collect(),
        ]
    }

    #[test]
    fn test_params_layout() {
        let params = KernelParams::new(&CascadeSettings::default().universe, 7, 1024, 1);
        assert_eq!(params.as_bytes().len(), 64);
        assert_eq!(params.octaves, 3);
        assert_eq!(params.jitter, 0.0);
    }

    #[test]
    fn test_deterministic() {
        let params = KernelParams::new(&CascadeSettings::default().filament, 99, 16, 2);
        assert_eq!(run(&params, Some(0.3), 16), run(&params, Some(0.3), 16));
    }

    #[test]
    fn test_species_differ() {
        let params = KernelParams::new(&CascadeSettings::default().filament, 99, 16, 2);
        let out = run(&params, None, 16);
        assert_ne!(out[0], out[1]);
    }

    #[test]
    fn test_values_within_target_range() {
        let mut settings = CascadeSettings::default().sector;
        settings.noise.jitter = Some(0.4);
        settings.noise.amplitude = 3.0;
        let params = KernelParams::new(&settings, -5, 16, 2);
        for field in run(&params, Some(1.0), 16) {
            assert!(field.iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn test_parent_influence_raises_values() {
        let mut settings = CascadeSettings::default().region;
        settings.influence = 0.25;
        let params = KernelParams::new(&settings, 1, 8, 2);
        let without = run(&params, Some(0.0), 8);
        let with = run(&params, Some(1.0), 8);
        for (lo, hi) in without[0].iter().zip(&with[0]) {
            assert!(hi >= lo);
        }
    }

    #[test]
    fn test_mismatched_parent_rejected() {
        let pool = BufferPool::new();
        let parent = pool.acquire(PARENT_INPUT, IVec2::ZERO, 2);
        let mut out = pool.acquire("out", IVec2::ZERO, 3);
        let params = KernelParams::new(&CascadeSettings::default().region, 0, 3, 1);
        let result = NoiseKernel.dispatch(&params, &[&*parent], &mut [&mut *out]);
        assert!(matches!(result, Err(Error::Kernel(_))));
    }

    #[test]
    fn test_cell_hash_range() {
        for x in -20..20 {
            let h = cell_hash(x, x * 3, 17);
            assert!((0.0..1.0).contains(&h));
        }
    }
}
