//! Cascading density field generation.
//!
//! Each level's fields are synthesized from its noise settings folded over
//! the parent level's already generated field:
//! 1. Lease zeroed cell buffers from the pool
//! 2. Dispatch a `FieldKernel` over them (parallel per cell)
//! 3. Read the buffers back into a `DensityFieldCollection`
//! 4. Push the collection onto the level's completion queue

pub mod buffers;
pub mod completion;
pub mod config;
pub mod density;
pub mod kernel;
pub mod pipeline;
pub mod species;

pub use buffers::{BufferLease, BufferPool, CellSample, FieldBuffer};
pub use completion::{CompletionQueue, CompletionQueues, CompletionSender, CompletionSenders, PendingResult};
pub use config::{CascadeSettings, GenerationSettings, NoiseShape, Remap};
pub use density::{DensityField, DensityFieldCollection, GenerationState};
pub use kernel::{FieldKernel, KernelParams, NoiseKernel};
pub use pipeline::{FieldPipeline, ParentCells, ParentSample, SynthesisRequest};
pub use species::Species;
