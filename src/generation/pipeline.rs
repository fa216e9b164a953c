//! Field synthesis: turns (settings, parent field, cells) into a density
//! field collection by dispatching a kernel over pooled buffers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::IVec2;

use super::buffers::{BufferLease, BufferPool, FieldBuffer};
use super::completion::{CompletionSenders, PendingResult};
use super::config::CascadeSettings;
use super::density::{DensityField, DensityFieldCollection};
use super::kernel::{FieldKernel, KernelParams, PARENT_INPUT};
use super::species::Species;
use crate::coords::Level;
use crate::core::{Error, Result};
use crate::hierarchy::FieldOwner;

/// Which parent cells feed each output cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParentCells {
    /// Every output cell reads the same parent cell (collection-local).
    Fixed(IVec2),
    /// Output cells read the parent cell with the same global coordinate.
    Aligned,
}

/// The already generated parent field a synthesis folds in.
#[derive(Clone, Copy, Debug)]
pub struct ParentSample<'a> {
    pub collection: &'a DensityFieldCollection,
    pub cells: ParentCells,
}

/// Everything one synthesis call needs besides the level settings.
#[derive(Clone, Copy, Debug)]
pub struct SynthesisRequest<'a> {
    pub owner: FieldOwner,
    pub level: Level,
    pub seed: i32,
    /// Global cell coordinate of the first output cell
    pub origin: IVec2,
    /// Cells per axis
    pub size: u32,
    pub parent: Option<ParentSample<'a>>,
}

/// Dispatches kernels for every level and routes results to completion queues.
pub struct FieldPipeline {
    cascade: Arc<CascadeSettings>,
    kernel: Arc<dyn FieldKernel>,
    pool: BufferPool,
    senders: CompletionSenders,
    dispatches: AtomicU64,
}

impl FieldPipeline {
    pub fn new(
        cascade: Arc<CascadeSettings>,
        kernel: Arc<dyn FieldKernel>,
        senders: CompletionSenders,
    ) -> Self {
        Self {
            cascade,
            kernel,
            pool: BufferPool::new(),
            senders,
            dispatches: AtomicU64::new(0),
        }
    }

    pub fn cascade(&self) -> &CascadeSettings {
        &self.cascade
    }

    pub fn buffer_pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Kernel dispatches issued so far.
    pub fn dispatch_count(&self) -> u64 {
        self.dispatches.load(Ordering::Relaxed)
    }

    /// Request covering the whole universe grid.
    pub fn universe_request(&self) -> SynthesisRequest<'static> {
        let settings = &self.cascade.universe;
        SynthesisRequest {
            owner: FieldOwner::Universe,
            level: Level::Universe,
            seed: settings.seed,
            origin: IVec2::ZERO,
            size: settings.size(),
            parent: None,
        }
    }

    /// Synthesize the universe field directly.
    pub fn generate_universe_field(&self) -> Result<DensityFieldCollection> {
        self.synthesize(&self.universe_request())
    }

    /// Run one synthesis and push the result onto the level's completion
    /// queue. The result is never applied from here.
    pub fn dispatch(&self, request: &SynthesisRequest<'_>) -> Result<()> {
        let collection = self.synthesize(request)?;
        self.senders.sender(request.level).push(PendingResult {
            owner: request.owner,
            collection,
        })
    }

    /// Run one synthesis and return the collection.
    ///
    /// Blocks until the kernel's outputs are read back. Every buffer leased
    /// for the call is released before returning, on success or failure.
    pub fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<DensityFieldCollection> {
        let settings = self.cascade.level(request.level);
        let species = Species::for_level(request.level);

        if request.level != Level::Universe && request.parent.is_none() {
            return Err(Error::ParentNotGenerated(request.owner.to_string()));
        }

        let parent = match request.parent {
            Some(sample) => Some(self.parent_buffer(request, sample)?),
            None => None,
        };

        let mut outputs: Vec<BufferLease> = species
            .iter()
            .map(|s| self.pool.acquire(s.name(), request.origin, request.size))
            .collect();

        let params = KernelParams::new(settings, request.seed, request.size, species.len() as u32);
        let inputs: Vec<&FieldBuffer> = parent.iter().map(|lease| &**lease).collect();
        let mut targets: Vec<&mut FieldBuffer> = outputs.iter_mut().map(|lease| &mut **lease).collect();

        self.dispatches.fetch_add(1, Ordering::Relaxed);
        self.kernel.dispatch(&params, &inputs, &mut targets)?;

        let fields = species
            .iter()
            .zip(&outputs)
            .map(|(&s, lease)| {
                let values = lease.cells.iter().map(|c| c.value).collect();
                DensityField::new(s, request.origin, request.size, values)
            })
            .collect::<Result<Vec<_>>>()?;

        log::debug!(
            "Synthesized {} ({} species, {}x{} cells, seed {})",
            request.owner,
            species.len(),
            request.size,
            request.size,
            request.seed
        );

        DensityFieldCollection::generated(request.level, request.origin, request.size, fields)
    }

    /// Populate the parent input buffer, one explicit entry per output cell.
    fn parent_buffer(&self, request: &SynthesisRequest<'_>, sample: ParentSample<'_>) -> Result<BufferLease> {
        if !sample.collection.is_generated() {
            return Err(Error::ParentNotGenerated(request.owner.to_string()));
        }

        let uncovered = |cell: IVec2| {
            Error::Kernel(format!(
                "{} parent field does not cover cell ({}, {}) for {}",
                sample.collection.level(),
                cell.x,
                cell.y,
                request.owner
            ))
        };

        let mut lease = self.pool.acquire(PARENT_INPUT, request.origin, request.size);
        match sample.cells {
            ParentCells::Fixed(local) => {
                let value = sample.collection.mean_at(local).ok_or_else(|| uncovered(local))?;
                for cell in lease.cells.iter_mut() {
                    cell.value = value;
                }
            }
            ParentCells::Aligned => {
                let origin = sample.collection.origin();
                for cell in lease.cells.iter_mut() {
                    let local = IVec2::new(cell.x, cell.y) - origin;
                    cell.value = sample.collection.mean_at(local).ok_or_else(|| uncovered(local))?;
                }
            }
        }
        Ok(lease)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::completion::CompletionQueues;
    use crate::generation::kernel::NoiseKernel;
    use crate::hierarchy::{NodeKey, NodeKind};
    use crate::coords::Position;

    struct FailingKernel;

    impl FieldKernel for FailingKernel {
        fn dispatch(&self, _: &KernelParams, _: &[&FieldBuffer], _: &mut [&mut FieldBuffer]) -> Result<()> {
            Err(Error::Kernel("device lost".to_string()))
        }
    }

    fn small_cascade() -> CascadeSettings {
        let mut cascade = CascadeSettings::default();
        cascade.universe.chunk_size = 8;
        cascade.universe.chunk_count = 2;
        cascade.filament.chunk_size = 4;
        cascade
    }

    fn pipeline(kernel: Arc<dyn FieldKernel>) -> (FieldPipeline, CompletionQueues) {
        let queues = CompletionQueues::new();
        let pipeline = FieldPipeline::new(Arc::new(small_cascade()), kernel, queues.senders());
        (pipeline, queues)
    }

    fn filament_request(universe: &DensityFieldCollection) -> SynthesisRequest<'_> {
        SynthesisRequest {
            owner: FieldOwner::Node(NodeKey::new(NodeKind::Filament, Position::filament(2, 3))),
            level: Level::Filament,
            seed: 11,
            origin: IVec2::new(32, 48),
            size: 16,
            parent: Some(ParentSample { collection: universe, cells: ParentCells::Fixed(IVec2::new(2, 3)) }),
        }
    }

    #[test]
    fn test_universe_field_shape() {
        let (pipeline, _queues) = pipeline(Arc::new(NoiseKernel));
        let universe = pipeline.generate_universe_field().unwrap();
        assert!(universe.is_generated());
        assert_eq!(universe.fields().len(), 1);
        assert_eq!(universe.fields()[0].len(), 16 * 16);
        assert_eq!(pipeline.buffer_pool().live(), 0);
    }

    #[test]
    fn test_dispatch_goes_through_queue() {
        let (pipeline, mut queues) = pipeline(Arc::new(NoiseKernel));
        pipeline.dispatch(&pipeline.universe_request()).unwrap();

        assert!(queues.queue_mut(Level::Filament).drain().is_empty());
        let results = queues.queue_mut(Level::Universe).drain();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].owner, FieldOwner::Universe);
        assert!(results[0].collection.is_generated());
    }

    #[test]
    fn test_child_synthesis_is_deterministic() {
        let (pipeline, _queues) = pipeline(Arc::new(NoiseKernel));
        let universe = pipeline.generate_universe_field().unwrap();
        let request = filament_request(&universe);

        let a = pipeline.synthesize(&request).unwrap();
        let b = pipeline.synthesize(&request).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.fields().len(), 6);
        assert_eq!(a.fields()[0].origin(), IVec2::new(32, 48));
    }

    #[test]
    fn test_parent_must_be_generated() {
        let (pipeline, _queues) = pipeline(Arc::new(NoiseKernel));
        let pending = DensityFieldCollection::generating(Level::Universe, IVec2::ZERO, 16);
        let result = pipeline.synthesize(&filament_request(&pending));
        assert!(matches!(result, Err(Error::ParentNotGenerated(_))));

        let mut orphan = filament_request(&pending);
        orphan.parent = None;
        assert!(matches!(pipeline.synthesize(&orphan), Err(Error::ParentNotGenerated(_))));
        assert_eq!(pipeline.buffer_pool().live(), 0);
    }

    #[test]
    fn test_buffers_released_on_kernel_failure() {
        let (pipeline, mut queues) = pipeline(Arc::new(FailingKernel));
        assert!(pipeline.dispatch(&pipeline.universe_request()).is_err());
        assert_eq!(pipeline.buffer_pool().live(), 0);
        assert!(queues.queue_mut(Level::Universe).drain().is_empty());
    }

    #[test]
    fn test_aligned_parent_must_cover_cells() {
        let (pipeline, _queues) = pipeline(Arc::new(NoiseKernel));
        let universe = pipeline.generate_universe_field().unwrap();
        let request = SynthesisRequest {
            owner: FieldOwner::Universe,
            level: Level::Filament,
            seed: 0,
            origin: IVec2::new(12, 12),
            size: 8,
            parent: Some(ParentSample { collection: &universe, cells: ParentCells::Aligned }),
        };
        assert!(matches!(pipeline.synthesize(&request), Err(Error::Kernel(_))));
        assert_eq!(pipeline.buffer_pool().live(), 0);
    }
}
