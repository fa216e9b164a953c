//! Node kinds, keys, and the per-node state the registry owns.

use std::collections::HashMap;
use std::fmt;

use glam::{DVec2, IVec2};

use crate::coords::{Level, Position, Scale};
use crate::core::{Error, Result};
use crate::generation::config::GenerationSettings;
use crate::generation::density::{DensityFieldCollection, GenerationState};

/// Structures the scheduler can load.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Filament,
    FilamentChunk,
    Sector,
    SectorChunk,
    Region,
    RegionChunk,
}

impl NodeKind {
    pub const ALL: [NodeKind; 6] = [
        NodeKind::Filament,
        NodeKind::FilamentChunk,
        NodeKind::Sector,
        NodeKind::SectorChunk,
        NodeKind::Region,
        NodeKind::RegionChunk,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn level(self) -> Level {
        match self {
            NodeKind::Filament | NodeKind::FilamentChunk => Level::Filament,
            NodeKind::Sector | NodeKind::SectorChunk => Level::Sector,
            NodeKind::Region | NodeKind::RegionChunk => Level::Region,
        }
    }

    pub fn is_chunk(self) -> bool {
        matches!(self, NodeKind::FilamentChunk | NodeKind::SectorChunk | NodeKind::RegionChunk)
    }

    /// Grid this kind's positions live in.
    pub fn scale(self) -> Scale {
        if self.is_chunk() {
            Scale::Chunk(self.level())
        } else {
            Scale::Grid(self.level())
        }
    }

    /// Kind addressed by a scale; Universe scales have none.
    pub fn from_scale(scale: Scale) -> Option<NodeKind> {
        NodeKind::ALL.into_iter().find(|kind| kind.scale() == scale)
    }

    /// Structural parent kind; `None` means the Universe.
    pub fn parent_kind(self) -> Option<NodeKind> {
        match self {
            NodeKind::Filament => None,
            NodeKind::FilamentChunk | NodeKind::Sector => Some(NodeKind::Filament),
            NodeKind::SectorChunk | NodeKind::Region => Some(NodeKind::Sector),
            NodeKind::RegionChunk => Some(NodeKind::Region),
        }
    }

    /// Kinds a node of this kind registers as children.
    pub fn child_kinds(self) -> &'static [NodeKind] {
        match self {
            NodeKind::Filament => &[NodeKind::FilamentChunk, NodeKind::Sector],
            NodeKind::Sector => &[NodeKind::SectorChunk, NodeKind::Region],
            NodeKind::Region => &[NodeKind::RegionChunk],
            NodeKind::FilamentChunk | NodeKind::SectorChunk | NodeKind::RegionChunk => &[],
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.scale())
    }
}

/// Arena key of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeKey {
    kind: NodeKind,
    position: Position,
}

impl NodeKey {
    /// Key for a position in the kind's own grid. Only debug builds check the
    /// pairing; use `try_new` for untrusted input.
    pub fn new(kind: NodeKind, position: Position) -> Self {
        debug_assert_eq!(kind.scale(), position.scale());
        Self { kind, position }
    }

    pub fn try_new(kind: NodeKind, position: Position) -> Result<Self> {
        if kind.scale() != position.scale() {
            return Err(Error::ScaleMismatch {
                expected: kind.scale().to_string(),
                actual: position.scale().to_string(),
            });
        }
        Ok(Self { kind, position })
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn position(&self) -> Position {
        self.position
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.position)
    }
}

/// Anything that owns a density field collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldOwner {
    Universe,
    Node(NodeKey),
}

impl fmt::Display for FieldOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldOwner::Universe => f.write_str("Universe"),
            FieldOwner::Node(key) => write!(f, "{}", key),
        }
    }
}

/// What a parent remembers about a materialized child.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChildRecord {
    pub position: Position,
    pub world_position: DVec2,
}

/// Child position records, grouped by kind.
#[derive(Clone, Debug, Default)]
pub struct Children {
    allowed: &'static [NodeKind],
    records: HashMap<NodeKind, HashMap<Position, ChildRecord>>,
}

impl Children {
    pub fn new(allowed: &'static [NodeKind]) -> Self {
        Self { allowed, records: HashMap::new() }
    }

    /// Add a record; fails if the position is already registered.
    pub fn register(&mut self, owner: &str, record: ChildRecord) -> Result<()> {
        let kind = NodeKind::from_scale(record.position.scale())
            .filter(|kind| self.allowed.contains(kind))
            .ok_or_else(|| Error::ScaleMismatch {
                expected: format!("a child of {}", owner),
                actual: record.position.scale().to_string(),
            })?;

        let records = self.records.entry(kind).or_default();
        if records.contains_key(&record.position) {
            return Err(Error::DuplicateRegistration {
                parent: owner.to_string(),
                child: record.position.to_string(),
            });
        }
        records.insert(record.position, record);
        Ok(())
    }

    /// Remove a record; absent positions are ignored.
    pub fn unregister(&mut self, position: Position) -> bool {
        NodeKind::from_scale(position.scale())
            .and_then(|kind| self.records.get_mut(&kind))
            .is_some_and(|records| records.remove(&position).is_some())
    }

    pub fn contains(&self, position: Position) -> bool {
        self.get(position).is_some()
    }

    pub fn get(&self, position: Position) -> Option<&ChildRecord> {
        let kind = NodeKind::from_scale(position.scale())?;
        self.records.get(&kind)?.get(&position)
    }

    pub fn of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &ChildRecord> + '_ {
        self.records.get(&kind).into_iter().flat_map(|records| records.values())
    }

    pub fn count(&self, kind: NodeKind) -> usize {
        self.records.get(&kind).map_or(0, HashMap::len)
    }

    pub fn len(&self) -> usize {
        self.records.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Root of the hierarchy: the single universe-wide field.
#[derive(Clone, Debug)]
pub struct Universe {
    seed: i32,
    fields: DensityFieldCollection,
    children: Children,
}

impl Universe {
    pub fn new(settings: &GenerationSettings) -> Self {
        Self {
            seed: settings.seed,
            fields: DensityFieldCollection::generating(Level::Universe, IVec2::ZERO, settings.size()),
            children: Children::new(&[NodeKind::Filament]),
        }
    }

    pub fn seed(&self) -> i32 {
        self.seed
    }

    pub fn fields(&self) -> &DensityFieldCollection {
        &self.fields
    }

    pub fn is_generated(&self) -> bool {
        self.fields.is_generated()
    }

    pub fn children(&self) -> &Children {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut Children {
        &mut self.children
    }

    pub(crate) fn apply(&mut self, collection: DensityFieldCollection) -> Result<()> {
        self.fields.absorb(collection, "Universe")
    }
}

/// An instantiated Filament, Sector, Region, or chunk of one of them.
#[derive(Clone, Debug)]
pub struct Node {
    key: NodeKey,
    parent: FieldOwner,
    seed: i32,
    fields: DensityFieldCollection,
    children: Children,
}

impl Node {
    /// Node whose fields cover `size × size` cells starting at `origin`.
    pub fn new(key: NodeKey, parent: FieldOwner, seed: i32, origin: IVec2, size: u32) -> Self {
        Self {
            key,
            parent,
            seed,
            fields: DensityFieldCollection::generating(key.kind().level(), origin, size),
            children: Children::new(key.kind().child_kinds()),
        }
    }

    pub fn key(&self) -> NodeKey {
        self.key
    }

    pub fn kind(&self) -> NodeKind {
        self.key.kind()
    }

    pub fn position(&self) -> Position {
        self.key.position()
    }

    pub fn parent(&self) -> FieldOwner {
        self.parent
    }

    pub fn seed(&self) -> i32 {
        self.seed
    }

    pub fn fields(&self) -> &DensityFieldCollection {
        &self.fields
    }

    pub fn state(&self) -> GenerationState {
        self.fields.state()
    }

    pub fn is_generated(&self) -> bool {
        self.fields.is_generated()
    }

    pub fn children(&self) -> &Children {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut Children {
        &mut self.children
    }

    pub(crate) fn apply(&mut self, collection: DensityFieldCollection) -> Result<()> {
        let owner = self.key.to_string();
        self.fields.absorb(collection, &owner)
    }
}
