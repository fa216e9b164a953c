//! Arena of generated nodes indexed by (kind, position).

use std::collections::HashMap;

use glam::DVec2;

use super::node::{ChildRecord, FieldOwner, Node, NodeKey, NodeKind, Universe};
use crate::coords::Position;
use crate::core::{Error, Result};
use crate::generation::completion::PendingResult;
use crate::generation::density::DensityFieldCollection;

/// Owns the universe root and every constructed node.
///
/// Structural validation (does the parent exist, is it generated) belongs to
/// the scheduler; the registry only enforces uniqueness.
#[derive(Debug)]
pub struct Registry {
    universe: Universe,
    nodes: HashMap<NodeKey, Node>,
    counts: [usize; 6],
}

impl Registry {
    pub fn new(universe: Universe) -> Self {
        Self {
            universe,
            nodes: HashMap::new(),
            counts: [0; 6],
        }
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn get(&self, key: &NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn get_mut(&mut self, key: &NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(key)
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Add a freshly constructed node.
    pub fn insert(&mut self, node: Node) -> Result<&Node> {
        let key = node.key();
        if self.nodes.contains_key(&key) {
            return Err(Error::DuplicateRegistration {
                parent: node.parent().to_string(),
                child: key.to_string(),
            });
        }
        self.counts[key.kind().index()] += 1;
        Ok(self.nodes.entry(key).or_insert(node))
    }

    /// Record `child` under `parent`. Fails on a duplicate child position.
    pub fn register(&mut self, parent: FieldOwner, child: Position, world_position: DVec2) -> Result<()> {
        let record = ChildRecord { position: child, world_position };
        match parent {
            FieldOwner::Universe => self.universe.children_mut().register("Universe", record),
            FieldOwner::Node(key) => {
                let node = self
                    .nodes
                    .get_mut(&key)
                    .ok_or_else(|| Error::MissingNode(key.to_string()))?;
                node.children_mut().register(&key.to_string(), record)
            }
        }
    }

    /// Forget `child` under `parent`; absent parents or children are ignored.
    pub fn unregister(&mut self, parent: FieldOwner, child: Position) -> bool {
        match parent {
            FieldOwner::Universe => self.universe.children_mut().unregister(child),
            FieldOwner::Node(key) => self
                .nodes
                .get_mut(&key)
                .is_some_and(|node| node.children_mut().unregister(child)),
        }
    }

    /// Field collection of an owner, if it exists.
    pub fn fields(&self, owner: FieldOwner) -> Option<&DensityFieldCollection> {
        match owner {
            FieldOwner::Universe => Some(self.universe.fields()),
            FieldOwner::Node(key) => self.nodes.get(&key).map(Node::fields),
        }
    }

    /// Whether an owner exists and its fields are generated.
    pub fn is_generated(&self, owner: FieldOwner) -> bool {
        self.fields(owner).is_some_and(DensityFieldCollection::is_generated)
    }

    /// Apply a kernel result to its owner, flipping it to Generated.
    pub fn apply(&mut self, result: PendingResult) -> Result<FieldOwner> {
        let owner = result.owner;
        match owner {
            FieldOwner::Universe => self.universe.apply(result.collection)?,
            FieldOwner::Node(key) => self
                .nodes
                .get_mut(&key)
                .ok_or_else(|| Error::MissingNode(key.to_string()))?
                .apply(result.collection)?,
        }
        Ok(owner)
    }

    /// Nodes of one kind, in no particular order.
    pub fn nodes(&self, kind: NodeKind) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.values().filter(move |node| node.kind() == kind)
    }

    pub fn count(&self, kind: NodeKind) -> usize {
        self.counts[kind.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
