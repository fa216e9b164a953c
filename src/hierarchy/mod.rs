//! Hierarchy registry: the arena of generated structures.
//!
//! Nodes are keyed by (kind, position); parent and child links are stored as
//! keys, never as references, so the tree has no ownership cycles.

pub mod node;
pub mod registry;
pub mod seed;

pub use node::{ChildRecord, Children, FieldOwner, Node, NodeKey, NodeKind, Universe};
pub use registry::Registry;
pub use seed::node_seed;
