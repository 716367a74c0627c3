use std::fs;
use std::path::{Path, PathBuf};

use ::redb::{Database, DatabaseError, ReadableTable, TableDefinition};
use log::info;

use super::{BatchOp, Durability, Engine, EngineError, EngineId, EngineResult, WriteBatch};
use crate::Value;

const KV_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("kv");

/// Persistent engine backed by a single `redb` database file.
///
/// Keys are stored in byte order in one table. Every batch is one redb write
/// transaction, so it lands completely or not at all.
pub struct RedbEngine {
    db: Database,
    path: PathBuf,
    id: EngineId,
}

impl RedbEngine {
    /// Opens the database at `path`, creating the file and its parent directory if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| EngineError::Storage(e.to_string()))?;
            }
        }

        let db = Database::create(&path).map_err(|e| match e {
            DatabaseError::DatabaseAlreadyOpen => EngineError::Locked,
            other => EngineError::Storage(other.to_string()),
        })?;

        // Create the table up front so reads never see a missing table.
        let txn = db.begin_write().map_err(storage)?;
        txn.open_table(KV_TABLE).map_err(storage)?;
        txn.commit().map_err(storage)?;

        info!("opened redb engine at {:?}", path);
        Ok(Self { db, path, id: EngineId::next() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn storage<E: std::fmt::Display>(e: E) -> EngineError {
    EngineError::Storage(e.to_string())
}

impl Engine for RedbEngine {
    fn get(&self, key: &[u8]) -> EngineResult<Option<Value>> {
        let txn = self.db.begin_read().map_err(storage)?;
        let table = txn.open_table(KV_TABLE).map_err(storage)?;
        let value = table.get(key).map_err(storage)?;
        Ok(value.map(|guard| guard.value().to_vec()))
    }

    fn write_batch(&self, batch: WriteBatch, durability: Durability) -> EngineResult<()> {
        let mut txn = self.db.begin_write().map_err(storage)?;
        txn.set_durability(match durability {
            Durability::Async => ::redb::Durability::Eventual,
            Durability::Sync => ::redb::Durability::Immediate,
        });
        {
            let mut table = txn.open_table(KV_TABLE).map_err(storage)?;
            for op in batch {
                match op {
                    BatchOp::Put { key, value } => {
                        table.insert(key.as_slice(), value.as_slice()).map_err(storage)?;
                    }
                    BatchOp::Delete { key } => {
                        table.remove(key.as_slice()).map_err(storage)?;
                    }
                }
            }
        }
        txn.commit().map_err(storage)
    }

    fn id(&self) -> EngineId {
        self.id
    }
}
