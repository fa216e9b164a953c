//! Persistence collaborators notified after construction and after every
//! generation state change.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::generation::{DensityFieldCollection, GenerationState};
use crate::hierarchy::{FieldOwner, Node, Universe};

/// Receives hierarchy state to persist. Calls are fire-and-forget: failures
/// are handled (and logged) by the store itself.
pub trait NodeStore: Send + Sync {
    fn save_universe(&self, universe: &Universe);
    fn save_node(&self, node: &Node);
}

/// Snapshot of what was persisted for one owner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaveRecord {
    pub owner: String,
    pub seed: i32,
    pub generated: bool,
    /// Per-species (name, min, max); empty until generated
    pub ranges: Vec<(String, f32, f32)>,
}

impl SaveRecord {
    fn new(owner: FieldOwner, seed: i32, fields: &DensityFieldCollection) -> Self {
        let ranges = fields
            .fields()
            .iter()
            .filter_map(|f| f.range().map(|(lo, hi)| (f.species().name().to_string(), lo, hi)))
            .collect();
        Self {
            owner: owner.to_string(),
            seed,
            generated: fields.state() == GenerationState::Generated,
            ranges,
        }
    }

    fn for_universe(universe: &Universe) -> Self {
        Self::new(FieldOwner::Universe, universe.seed(), universe.fields())
    }

    fn for_node(node: &Node) -> Self {
        Self::new(FieldOwner::Node(node.key()), node.seed(), node.fields())
    }
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullStore;

impl NodeStore for NullStore {
    fn save_universe(&self, _universe: &Universe) {
        log::trace!("NullStore: dropping universe save");
    }

    fn save_node(&self, node: &Node) {
        log::trace!("NullStore: dropping save for {}", node.key());
    }
}

/// Keeps every save in memory, in call order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    saves: Mutex<Vec<SaveRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SaveRecord>> {
        self.saves.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn saves(&self) -> Vec<SaveRecord> {
        self.lock().clone()
    }

    /// Saves recorded for one owner.
    pub fn count_for(&self, owner: FieldOwner) -> usize {
        let name = owner.to_string();
        self.lock().iter().filter(|r| r.owner == name).count()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl NodeStore for MemoryStore {
    fn save_universe(&self, universe: &Universe) {
        self.lock().push(SaveRecord::for_universe(universe));
    }

    fn save_node(&self, node: &Node) {
        self.lock().push(SaveRecord::for_node(node));
    }
}

/// Writes one JSON record per owner into a directory, overwriting the
/// previous save.
#[derive(Debug)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Create the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// File holding the record for `owner`.
    pub fn record_path(&self, owner: FieldOwner) -> PathBuf {
        let stem: String = owner
            .to_string()
            .chars()
            .filter_map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '-' => Some(c.to_ascii_lowercase()),
                ' ' | ',' => Some('_'),
                _ => None,
            })
            .collect();
        self.root.join(format!("{}.json", stem))
    }

    /// Read back the last record saved for `owner`.
    pub fn load(&self, owner: FieldOwner) -> crate::core::Result<Option<SaveRecord>> {
        let path = self.record_path(owner);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    fn write(&self, owner: FieldOwner, record: &SaveRecord) {
        let path = self.record_path(owner);
        let result = serde_json::to_string_pretty(record)
            .map_err(io::Error::from)
            .and_then(|json| fs::write(&path, json));
        if let Err(e) = result {
            log::warn!("Failed to save {} to {:?}: {}", owner, path, e);
        }
    }
}

impl NodeStore for DirectoryStore {
    fn save_universe(&self, universe: &Universe) {
        self.write(FieldOwner::Universe, &SaveRecord::for_universe(universe));
    }

    fn save_node(&self, node: &Node) {
        self.write(FieldOwner::Node(node.key()), &SaveRecord::for_node(node));
    }
}
