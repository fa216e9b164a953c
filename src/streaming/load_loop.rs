//! Cooperative processing loop for one request kind.
//!
//! A loop works through a snapshot of its queue, advancing at most one
//! constructed entry per step. Processed entries leave the live queue only
//! once the whole snapshot has been walked, so a pass iterates in a stable
//! order even while new requests arrive.

use crate::coords::Position;
use crate::core::Result;
use crate::hierarchy::NodeKind;

use super::request_queue::RequestQueue;

/// Outcome of trying to service one queued entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attempt {
    /// A node was constructed; the loop yields.
    Constructed,
    /// Nothing to build (already present); counts as processed, no yield.
    Skipped,
    /// Prerequisite unmet; the entry stays queued for a later pass.
    Deferred,
}

/// What one `step` did before suspending.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopStep {
    /// Queue empty, no pass in progress.
    Idle,
    /// One entry was constructed; the pass continues next step.
    Constructed(Position),
    /// The snapshot is exhausted and processed entries were removed.
    PassComplete { removed: usize },
}

#[derive(Debug)]
struct Pass {
    snapshot: Vec<Position>,
    cursor: usize,
    processed: Vec<Position>,
}

/// Resumable state of one kind's processing loop.
#[derive(Debug)]
pub struct LoadLoop {
    kind: NodeKind,
    pass: Option<Pass>,
    passes: u64,
}

impl LoadLoop {
    pub fn new(kind: NodeKind) -> Self {
        Self { kind, pass: None, passes: 0 }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Whether a snapshot is partially walked.
    pub fn in_pass(&self) -> bool {
        self.pass.is_some()
    }

    /// Completed passes so far.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Advance until one entry is constructed or the snapshot runs out.
    ///
    /// Entries canceled since the snapshot was taken are skipped. An error
    /// from `attempt` is returned after moving past the entry: it stays
    /// queued for the next pass and the rest of this pass still runs.
    pub fn step<F>(&mut self, queue: &mut RequestQueue<Position>, mut attempt: F) -> Result<LoopStep>
    where
        F: FnMut(Position) -> Result<Attempt>,
    {
        if self.pass.is_none() {
            if queue.is_empty() {
                return Ok(LoopStep::Idle);
            }
            self.pass = Some(Pass {
                snapshot: queue.snapshot(),
                cursor: 0,
                processed: Vec::new(),
            });
        }

        let Some(pass) = self.pass.as_mut() else {
            return Ok(LoopStep::Idle);
        };

        while pass.cursor < pass.snapshot.len() {
            let position = pass.snapshot[pass.cursor];
            if !queue.contains(position) {
                pass.cursor += 1;
                continue;
            }

            // A failed entry is passed over but not processed, so it stays
            // queued for the next pass.
            pass.cursor += 1;
            match attempt(position)? {
                Attempt::Constructed => {
                    pass.processed.push(position);
                    return Ok(LoopStep::Constructed(position));
                }
                Attempt::Skipped => {
                    pass.processed.push(position);
                }
                Attempt::Deferred => {
                    log::trace!("{} load {} deferred", self.kind, position);
                }
            }
        }

        let removed = pass
            .processed
            .iter()
            .filter(|&&position| queue.remove(position))
            .count();
        self.pass = None;
        self.passes += 1;
        Ok(LoopStep::PassComplete { removed })
    }
}
