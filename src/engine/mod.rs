pub mod memory;
pub mod redb;

pub use memory::MemoryEngine;
pub use self::redb::RedbEngine;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

use crate::{Key, Value};

/// Errors reported by a persistent engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Another handle holds the database lock.
    #[error("database is locked by another handle")]
    Locked,
    /// The engine refuses writes.
    #[error("engine is read-only")]
    ReadOnly,
    #[error("storage error: {0}")]
    Storage(String),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// How hard a batch write must push data to stable storage before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Durability {
    /// The engine may return before the data reaches stable storage.
    #[default]
    Async,
    /// The engine flushes to stable storage before returning.
    Sync,
}

/// Identity of an opened engine handle. Clones of a handle share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineId(u64);

static NEXT_ENGINE_ID: AtomicU64 = AtomicU64::new(1);

impl EngineId {
    pub(crate) fn next() -> Self {
        EngineId(NEXT_ENGINE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single operation inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put { key: Key, value: Value },
    Delete { key: Key },
}

/// Operations applied by [`Engine::write_batch`] as one atomic unit.
#[derive(Debug, Default, Clone)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { ops: Vec::with_capacity(capacity) }
    }

    pub fn put(&mut self, key: Key, value: Value) {
        self.ops.push(BatchOp::Put { key, value });
    }

    pub fn delete(&mut self, key: Key) {
        self.ops.push(BatchOp::Delete { key });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }
}

impl IntoIterator for WriteBatch {
    type Item = BatchOp;
    type IntoIter = std::vec::IntoIter<BatchOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

/// The ordered byte-key/byte-value storage a [`crate::BufferedStore`] buffers writes for.
pub trait Engine {
    /// Returns the stored value, or `None` if the key is absent.
    fn get(&self, key: &[u8]) -> EngineResult<Option<Value>>;

    /// Applies every operation in `batch` atomically: all of them or none.
    fn write_batch(&self, batch: WriteBatch, durability: Durability) -> EngineResult<()>;

    /// Identity of the underlying database handle.
    fn id(&self) -> EngineId;
}
