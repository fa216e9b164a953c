//! Dispatch buffers: pooled cell arrays leased for exactly one synthesis call.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytemuck::{Pod, Zeroable};
use glam::IVec2;

/// Free buffers kept around for reuse
const MAX_POOLED_BUFFERS: usize = 32;

/// One cell entry as seen by a kernel: explicit coordinate plus value.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct CellSample {
    pub x: i32,
    pub y: i32,
    pub value: f32,
}

/// A named block of cells handed to or returned from a kernel.
#[derive(Debug, Default)]
pub struct FieldBuffer {
    pub name: &'static str,
    pub cells: Vec<CellSample>,
}

impl FieldBuffer {
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.cells)
    }
}

#[derive(Default)]
struct PoolInner {
    free: Mutex<Vec<Vec<CellSample>>>,
    live: AtomicUsize,
    allocations: AtomicUsize,
}

/// Pool of cell buffers shared by every dispatch of a pipeline.
///
/// Leases are never shared between dispatches; each returns its storage to
/// the pool when dropped, whatever the dispatch outcome.
#[derive(Clone, Default)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl BufferPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lease a zero-initialized `size × size` buffer whose cells carry global
    /// coordinates starting at `origin`, row-major.
    pub fn acquire(&self, name: &'static str, origin: IVec2, size: u32) -> BufferLease {
        let recycled = self.inner.free.lock().ok().and_then(|mut free| free.pop());
        let mut cells = match recycled {
            Some(cells) => cells,
            None => {
                self.inner.allocations.fetch_add(1, Ordering::Relaxed);
                Vec::new()
            }
        };

        let size = size as i32;
        cells.clear();
        cells.reserve((size * size) as usize);
        for y in 0..size {
            for x in 0..size {
                cells.push(CellSample {
                    x: origin.x + x,
                    y: origin.y + y,
                    value: 0.0,
                });
            }
        }

        self.inner.live.fetch_add(1, Ordering::AcqRel);
        BufferLease {
            pool: Arc::clone(&self.inner),
            buffer: FieldBuffer { name, cells },
        }
    }

    /// Leases currently outstanding.
    pub fn live(&self) -> usize {
        self.inner.live.load(Ordering::Acquire)
    }

    /// Buffers waiting in the free list.
    pub fn pooled(&self) -> usize {
        self.inner.free.lock().map(|free| free.len()).unwrap_or(0)
    }

    /// Fresh allocations made since the pool was created.
    pub fn allocations(&self) -> usize {
        self.inner.allocations.load(Ordering::Relaxed)
    }
}

/// Scoped ownership of one pooled buffer.
pub struct BufferLease {
    pool: Arc<PoolInner>,
    buffer: FieldBuffer,
}

impl Deref for BufferLease {
    type Target = FieldBuffer;

    fn deref(&self) -> &FieldBuffer {
        &self.buffer
    }
}

impl DerefMut for BufferLease {
    fn deref_mut(&mut self) -> &mut FieldBuffer {
        &mut self.buffer
    }
}

impl Drop for BufferLease {
    fn drop(&mut self) {
        let cells = std::mem::take(&mut self.buffer.cells);
        if let Ok(mut free) = self.pool.free.lock() {
            if free.len() < MAX_POOLED_BUFFERS {
                free.push(cells);
            }
        }
        self.pool.live.fetch_sub(1, Ordering::AcqRel);
    }
}
