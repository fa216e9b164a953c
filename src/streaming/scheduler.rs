//! Tick-driven load scheduler.
//!
//! Owns the hierarchy registry and one deduplicating request queue per node
//! kind. Each `tick` first applies every pending synthesis result, then gives
//! each kind's load loop one step. All hierarchy mutation happens inside
//! `tick`; kernel results only ever arrive through the completion queues.

use std::sync::Arc;

use glam::DVec2;

use super::load_loop::{Attempt, LoadLoop, LoopStep};
use super::request_queue::RequestQueue;
use super::store::NodeStore;
use crate::coords::{CoordinateSystem, Level, Position, Scale};
use crate::core::{Error, Result};
use crate::generation::{
    CascadeSettings, CompletionQueues, FieldKernel, FieldPipeline, NoiseKernel, ParentCells,
    ParentSample, Species, SynthesisRequest,
};
use crate::hierarchy::{FieldOwner, Node, NodeKey, NodeKind, Registry, Universe, node_seed};

/// Where a position stands with respect to one kind's load requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RequestState {
    Unrequested,
    Queued,
    /// The node has been constructed (its fields may still be generating).
    Completed,
}

/// What one tick did.
#[derive(Clone, Debug, Default)]
pub struct TickReport {
    pub tick: u64,
    /// Owners whose fields were applied this tick
    pub applied: Vec<FieldOwner>,
    /// Nodes constructed this tick
    pub constructed: Vec<NodeKey>,
    /// Load loops that finished a pass this tick
    pub passes_completed: usize,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty() && self.constructed.is_empty() && self.passes_completed == 0
    }
}

/// State touched while constructing nodes, split from the queues and loops
/// so a loop can borrow its queue while constructing through this.
struct Hierarchy {
    cascade: Arc<CascadeSettings>,
    coords: CoordinateSystem,
    registry: Registry,
    pipeline: FieldPipeline,
    store: Arc<dyn NodeStore>,
}

impl Hierarchy {
    /// Owner of the fields a node of `kind` at `position` is built on.
    fn structural_parent(&self, kind: NodeKind, position: Position) -> FieldOwner {
        match kind.parent_kind() {
            Some(parent) => {
                let parent_position = self.coords.to_other_scale(position, parent.scale());
                FieldOwner::Node(NodeKey::new(parent, parent_position))
            }
            None => FieldOwner::Universe,
        }
    }

    /// Position mixed into the seed alongside the node's own.
    fn seed_parent(&self, parent: FieldOwner, position: Position) -> Position {
        match parent {
            FieldOwner::Node(key) => key.position(),
            FieldOwner::Universe => self
                .coords
                .to_other_scale(position, Scale::Chunk(Level::Universe)),
        }
    }

    fn save(&self, owner: FieldOwner) {
        match owner {
            FieldOwner::Universe => self.store.save_universe(self.registry.universe()),
            FieldOwner::Node(key) => {
                if let Some(node) = self.registry.get(&key) {
                    self.store.save_node(node);
                }
            }
        }
    }

    /// Dispatch synthesis for one queued node, then insert and register it.
    fn try_construct(&mut self, kind: NodeKind, position: Position) -> Result<Attempt> {
        let key = NodeKey::new(kind, position);
        if self.registry.contains(&key) {
            return Ok(Attempt::Skipped);
        }

        let parent = self.structural_parent(kind, position);
        let Some(parent_fields) = self.registry.fields(parent).filter(|f| f.is_generated()) else {
            return Ok(Attempt::Deferred);
        };

        let level = kind.level();
        let settings = self.cascade.level(level);
        let world = self.coords.to_world_position(position);

        let (origin, size, cells) = if kind.is_chunk() {
            let chunk_size = settings.chunk_size;
            (position.coord() * chunk_size as i32, chunk_size, ParentCells::Aligned)
        } else {
            let parent_level = level
                .parent()
                .ok_or_else(|| Error::MissingNode(format!("parent level of {}", level)))?;
            let local = self.coords.to_cell(parent_level, world) - parent_fields.origin();
            let size = settings.size();
            (position.coord() * size as i32, size, ParentCells::Fixed(local))
        };

        let seed = node_seed(self.cascade.universe.seed, self.seed_parent(parent, position), position);

        // Results apply on a later tick; a failed dispatch leaves nothing behind.
        self.pipeline.dispatch(&SynthesisRequest {
            owner: FieldOwner::Node(key),
            level,
            seed,
            origin,
            size,
            parent: Some(ParentSample { collection: parent_fields, cells }),
        })?;

        self.registry.insert(Node::new(key, parent, seed, origin, size))?;
        self.registry.register(parent, position, world)?;
        self.save(FieldOwner::Node(key));

        log::debug!("Constructed {} (seed {}, {} cells at {:?})", key, seed, size, origin);
        Ok(Attempt::Constructed)
    }
}

/// Drives node construction and field application for the whole hierarchy.
pub struct Scheduler {
    hierarchy: Hierarchy,
    completions: CompletionQueues,
    queues: [RequestQueue<Position>; 6],
    loops: [LoadLoop; 6],
    tick: u64,
}

impl Scheduler {
    /// Validate the settings and start universe synthesis.
    ///
    /// The universe result is applied on the first tick; filament loads wait
    /// for it like any other unmet prerequisite.
    pub fn new(
        cascade: CascadeSettings,
        kernel: Arc<dyn FieldKernel>,
        store: Arc<dyn NodeStore>,
    ) -> Result<Self> {
        cascade.validate()?;
        let cascade = Arc::new(cascade);
        let coords = CoordinateSystem::new(&cascade);
        let completions = CompletionQueues::new();
        let pipeline = FieldPipeline::new(cascade.clone(), kernel.clone(), completions.senders());
        let registry = Registry::new(Universe::new(&cascade.universe));

        store.save_universe(registry.universe());
        pipeline.dispatch(&pipeline.universe_request())?;

        log::info!(
            "Scheduler started: universe {}x{} cells, kernel {}",
            coords.universe_size(),
            coords.universe_size(),
            kernel.name()
        );

        Ok(Self {
            hierarchy: Hierarchy {
                cascade,
                coords,
                registry,
                pipeline,
                store,
            },
            completions,
            queues: std::array::from_fn(|_| RequestQueue::new()),
            loops: NodeKind::ALL.map(LoadLoop::new),
            tick: 0,
        })
    }

    /// Default settings and the CPU noise kernel.
    pub fn with_defaults(store: Arc<dyn NodeStore>) -> Result<Self> {
        Self::new(CascadeSettings::default(), Arc::new(NoiseKernel), store)
    }

    pub fn cascade(&self) -> &CascadeSettings {
        &self.hierarchy.cascade
    }

    pub fn coords(&self) -> &CoordinateSystem {
        &self.hierarchy.coords
    }

    pub fn registry(&self) -> &Registry {
        &self.hierarchy.registry
    }

    pub fn pipeline(&self) -> &FieldPipeline {
        &self.hierarchy.pipeline
    }

    /// Ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.tick
    }

    /// Queue a load of `kind` at `position`.
    ///
    /// Returns `false` if it was already queued or constructed. Positions of
    /// the wrong scale or outside the universe are rejected.
    pub fn request(&mut self, kind: NodeKind, position: Position) -> Result<bool> {
        let key = NodeKey::try_new(kind, position)?;
        if !self.hierarchy.coords.in_universe(position) {
            return Err(Error::OutOfBounds(key.to_string()));
        }
        if self.hierarchy.registry.contains(&key) {
            return Ok(false);
        }
        let added = self.queues[kind.index()].push(position);
        if added {
            log::trace!("Queued {}", key);
        }
        Ok(added)
    }

    /// Queue the `kind` node containing a world position; returns its position.
    pub fn request_at(&mut self, kind: NodeKind, world: DVec2) -> Result<Position> {
        let position = self.hierarchy.coords.to_position(kind.scale(), world);
        self.request(kind, position)?;
        Ok(position)
    }

    /// Drop a queued request. No-op once the node has been constructed.
    pub fn cancel(&mut self, kind: NodeKind, position: Position) -> bool {
        let Ok(key) = NodeKey::try_new(kind, position) else {
            return false;
        };
        if self.hierarchy.registry.contains(&key) {
            return false;
        }
        self.queues[kind.index()].remove(position)
    }

    /// Drop every queued request of one kind; returns how many were dropped.
    pub fn cancel_all(&mut self, kind: NodeKind) -> usize {
        let registry = &self.hierarchy.registry;
        let queue = &mut self.queues[kind.index()];
        let unbuilt: Vec<Position> = queue
            .iter()
            .copied()
            .filter(|&p| !registry.contains(&NodeKey::new(kind, p)))
            .collect();
        unbuilt.into_iter().filter(|&p| queue.remove(p)).count()
    }

    pub fn state(&self, kind: NodeKind, position: Position) -> RequestState {
        if kind.scale() == position.scale()
            && self.hierarchy.registry.contains(&NodeKey::new(kind, position))
        {
            RequestState::Completed
        } else if self.queues[kind.index()].contains(position) {
            RequestState::Queued
        } else {
            RequestState::Unrequested
        }
    }

    /// Queued requests of one kind, in queue order.
    pub fn pending(&self, kind: NodeKind) -> Vec<Position> {
        self.queues[kind.index()].snapshot()
    }

    /// Nothing queued, no pass in progress and no result waiting.
    pub fn is_idle(&self) -> bool {
        self.queues.iter().all(RequestQueue::is_empty)
            && self.loops.iter().all(|l| !l.in_pass())
            && self.completions.pending() == 0
    }

    /// Apply pending results, then step each load loop once.
    ///
    /// Errors from individual results or constructions do not stop the rest
    /// of the tick; the first one is returned once the tick has finished.
    pub fn tick(&mut self) -> Result<TickReport> {
        self.tick += 1;
        let mut report = TickReport {
            tick: self.tick,
            ..Default::default()
        };
        let mut first_error = None;

        for level in Level::ALL {
            for result in self.completions.queue_mut(level).drain() {
                match self.hierarchy.registry.apply(result) {
                    Ok(owner) => {
                        self.hierarchy.save(owner);
                        report.applied.push(owner);
                    }
                    Err(e) => {
                        log::warn!("Dropping {} result: {}", level, e);
                        first_error.get_or_insert(e);
                    }
                }
            }
        }

        for kind in NodeKind::ALL {
            let index = kind.index();
            let hierarchy = &mut self.hierarchy;
            let step = self.loops[index].step(&mut self.queues[index], |position| {
                hierarchy.try_construct(kind, position)
            });
            match step {
                Ok(LoopStep::Constructed(position)) => {
                    report.constructed.push(NodeKey::new(kind, position));
                }
                Ok(LoopStep::PassComplete { .. }) => report.passes_completed += 1,
                Ok(LoopStep::Idle) => {}
                Err(e) => {
                    log::warn!("{} load failed: {}", kind, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        if !report.is_empty() {
            log::debug!(
                "Tick {}: {} applied, {} constructed, {} passes",
                report.tick,
                report.applied.len(),
                report.constructed.len(),
                report.passes_completed
            );
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    /// Tick until idle or `max_ticks` have run; returns the ticks run.
    ///
    /// Requests whose prerequisite is never requested keep the scheduler busy,
    /// so check `is_idle` afterwards.
    pub fn run_until_idle(&mut self, max_ticks: u64) -> Result<u64> {
        let mut ticks = 0;
        while ticks < max_ticks && !self.is_idle() {
            self.tick()?;
            ticks += 1;
        }
        Ok(ticks)
    }

    /// Per-species density of `level` at a world position, if the node
    /// covering it has been generated.
    pub fn sample(&self, level: Level, world: DVec2) -> Option<Vec<(Species, f32)>> {
        let coords = &self.hierarchy.coords;
        let cell = coords.to_cell(level, world);
        let fields = match NodeKind::from_scale(Scale::Grid(level)) {
            Some(kind) => {
                let position = coords.to_position(kind.scale(), world);
                self.hierarchy.registry.get(&NodeKey::new(kind, position))?.fields()
            }
            None => self.hierarchy.registry.universe().fields(),
        };
        fields.sample_global(cell)
    }
}
