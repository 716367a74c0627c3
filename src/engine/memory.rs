use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{BatchOp, Durability, Engine, EngineError, EngineId, EngineResult, WriteBatch};
use crate::{Key, Value};

#[derive(Default)]
struct MemoryState {
    data: BTreeMap<Key, Value>,
    read_only: bool,
    batches_written: usize,
}

/// Ordered in-memory engine.
///
/// Clones share the same data and the same [`EngineId`], so a clone can write
/// to the engine behind the back of a store that owns another clone.
#[derive(Clone)]
pub struct MemoryEngine {
    state: Arc<Mutex<MemoryState>>,
    id: EngineId,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            id: EngineId::next(),
        }
    }

    /// When set, every batch write fails with [`EngineError::ReadOnly`].
    pub fn set_read_only(&self, read_only: bool) {
        self.state.lock().read_only = read_only;
    }

    /// Number of batches applied so far.
    pub fn batches_written(&self) -> usize {
        self.state.lock().batches_written
    }

    pub fn len(&self) -> usize {
        self.state.lock().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().data.is_empty()
    }

    /// Copy of every stored pair in key order.
    pub fn snapshot(&self) -> BTreeMap<Key, Value> {
        self.state.lock().data.clone()
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for MemoryEngine {
    fn get(&self, key: &[u8]) -> EngineResult<Option<Value>> {
        Ok(self.state.lock().data.get(key).cloned())
    }

    fn write_batch(&self, batch: WriteBatch, _durability: Durability) -> EngineResult<()> {
        let mut state = self.state.lock();
        if state.read_only {
            return Err(EngineError::ReadOnly);
        }
        for op in batch {
            match op {
                BatchOp::Put { key, value } => {
                    state.data.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    state.data.remove(&key);
                }
            }
        }
        state.batches_written += 1;
        Ok(())
    }

    fn id(&self) -> EngineId {
        self.id
    }
}
