//! Deduplicated, cooperative load scheduling for hierarchy nodes.

pub mod load_loop;
pub mod request_queue;
pub mod scheduler;
pub mod store;

pub use load_loop::{Attempt, LoadLoop, LoopStep};
pub use request_queue::RequestQueue;
pub use scheduler::{RequestState, Scheduler, TickReport};
pub use store::{DirectoryStore, MemoryStore, NodeStore, NullStore, SaveRecord};
