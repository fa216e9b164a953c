//! Core types and utilities shared by every layer of the hierarchy

pub mod types;
pub mod error;
pub mod logging;

pub use types::*;
pub use error::Error;
