//! Overlay KV is a write-buffering layer in front of an ordered key-value engine.
//!
//! Reads, writes and deletes go to an in-memory overlay first and only reach the
//! persistent engine when [`BufferedStore::commit`] flushes the overlay as one
//! atomic batch.
//!
//! ## Core Components
//! - [`overlay`]: Pending values, tombstones and read-through cached values.
//! - [`store`]: The buffered store itself.
//! - [`engine`]: The persistent engine contract plus the `redb` and in-memory bindings.
//! - [`codec`]: The value transform applied on the way into and out of the engine.
//! - [`service`]: Lifecycle wrapper used by the daemon.

pub mod codec;
pub mod config;
pub mod engine;
pub mod overlay;
pub mod service;
pub mod store;

use std::path::PathBuf;
use thiserror::Error;

use crate::engine::EngineError;

pub use codec::{Codec, Identity};
pub use config::ServiceConfig;
pub use engine::{Durability, Engine, MemoryEngine, RedbEngine};
pub use service::DbService;
pub use store::{BufferedStore, StoreOptions};

/// An opaque byte key.
pub type Key = Vec<u8>;

/// An opaque byte value.
pub type Value = Vec<u8>;

/// Errors returned by the buffered store and its service wrapper.
#[derive(Error, Debug)]
pub enum Error {
    /// The storage path or service configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The persistent engine could not be opened.
    #[error("failed to open engine at {path:?}: {source}")]
    EngineOpen {
        path: PathBuf,
        #[source]
        source: EngineError,
    },
    /// The key is absent from the engine or marked deleted in the overlay.
    #[error("key not found")]
    KeyNotFound,
    /// The atomic batch write was rejected. The overlay is left as it was.
    #[error("commit failed: {0}")]
    Commit(#[source] EngineError),
    /// The engine failed while reading a key.
    #[error("read failed: {0}")]
    Read(#[source] EngineError),
    /// The value transform failed.
    #[error("codec error: {0}")]
    Codec(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A specialized Result type for overlay store operations.
pub type Result<T> = std::result::Result<T, Error>;
