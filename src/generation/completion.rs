//! Completion queues: kernel results waiting for the owning thread.
//!
//! Producers push from whatever context a dispatch finished in; the owning
//! thread drains once per tick and is the only consumer.

use tokio::sync::mpsc;

use super::density::DensityFieldCollection;
use crate::coords::Level;
use crate::core::{Error, Result};
use crate::hierarchy::FieldOwner;

/// A computed collection plus the node it must be applied to.
#[derive(Debug)]
pub struct PendingResult {
    pub owner: FieldOwner,
    pub collection: DensityFieldCollection,
}

/// Producer handle for one level's queue.
#[derive(Clone, Debug)]
pub struct CompletionSender {
    level: Level,
    tx: mpsc::UnboundedSender<PendingResult>,
}

impl CompletionSender {
    pub fn level(&self) -> Level {
        self.level
    }

    /// Enqueue a result. Fails only when the consumer is gone.
    pub fn push(&self, result: PendingResult) -> Result<()> {
        self.tx.send(result).map_err(|e| {
            log::warn!("Dropping {} completion: queue closed", e.0.owner);
            Error::Kernel(format!("{} completion queue is closed", self.level))
        })
    }
}

/// Multi-producer, single-consumer queue of pending results for one level.
#[derive(Debug)]
pub struct CompletionQueue {
    level: Level,
    tx: mpsc::UnboundedSender<PendingResult>,
    rx: mpsc::UnboundedReceiver<PendingResult>,
}

impl CompletionQueue {
    pub fn new(level: Level) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { level, tx, rx }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn sender(&self) -> CompletionSender {
        CompletionSender { level: self.level, tx: self.tx.clone() }
    }

    /// Take every result queued so far, in push order (non-blocking).
    pub fn drain(&mut self) -> Vec<PendingResult> {
        let mut results = Vec::new();
        while let Ok(result) = self.rx.try_recv() {
            results.push(result);
        }
        results
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// One completion queue per hierarchy level.
#[derive(Debug)]
pub struct CompletionQueues {
    queues: [CompletionQueue; 4],
}

impl CompletionQueues {
    pub fn new() -> Self {
        Self { queues: Level::ALL.map(CompletionQueue::new) }
    }

    pub fn senders(&self) -> CompletionSenders {
        CompletionSenders { senders: Level::ALL.map(|level| self.queue(level).sender()) }
    }

    pub fn queue(&self, level: Level) -> &CompletionQueue {
        &self.queues[level.index()]
    }

    pub fn queue_mut(&mut self, level: Level) -> &mut CompletionQueue {
        &mut self.queues[level.index()]
    }

    /// Results waiting across all levels.
    pub fn pending(&self) -> usize {
        self.queues.iter().map(CompletionQueue::len).sum()
    }
}

impl Default for CompletionQueues {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer handles for every level, cloned into each pipeline.
#[derive(Clone, Debug)]
pub struct CompletionSenders {
    senders: [CompletionSender; 4],
}

impl CompletionSenders {
    pub fn sender(&self, level: Level) -> &CompletionSender {
        &self.senders[level.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec2;

    fn pending(owner: FieldOwner) -> PendingResult {
        PendingResult {
            owner,
            collection: DensityFieldCollection::generating(Level::Universe, IVec2::ZERO, 1),
        }
    }

    #[test]
    fn test_drain_preserves_order() {
        let mut queue = CompletionQueue::new(Level::Universe);
        let sender = queue.sender();
        sender.push(pending(FieldOwner::Universe)).unwrap();
        sender.push(pending(FieldOwner::Universe)).unwrap();
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.drain().len(), 2);
        assert!(queue.is_empty());
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_concurrent_producers() {
        let mut queue = CompletionQueue::new(Level::Universe);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let sender = queue.sender();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        sender.push(pending(FieldOwner::Universe)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(queue.drain().len(), 400);
    }

    #[test]
    fn test_queues_are_per_level() {
        let mut queues = CompletionQueues::new();
        let senders = queues.senders();
        senders.sender(Level::Sector).push(pending(FieldOwner::Universe)).unwrap();

        assert_eq!(queues.pending(), 1);
        assert!(queues.queue_mut(Level::Filament).drain().is_empty());
        assert_eq!(queues.queue_mut(Level::Sector).drain().len(), 1);
    }
}
