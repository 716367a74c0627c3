use std::fmt;
use std::path::Path;

use log::{debug, info, trace};

use crate::codec::{Codec, Identity};
use crate::engine::{Durability, Engine, RedbEngine, WriteBatch};
use crate::overlay::{Entry, Overlay};
use crate::{Error, Result, Value};

/// Construction options for a [`BufferedStore`].
pub struct StoreOptions {
    codec: Box<dyn Codec>,
    durability: Durability,
    log_target: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            codec: Box::new(Identity),
            durability: Durability::Async,
            log_target: "db".to_string(),
        }
    }
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value transform applied on commit and on engine reads.
    pub fn codec(mut self, codec: Box<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    /// Durability requested from the engine on commit.
    pub fn durability(mut self, durability: Durability) -> Self {
        self.durability = durability;
        self
    }

    /// Log target used for every record the store emits.
    pub fn log_target(mut self, target: impl Into<String>) -> Self {
        self.log_target = target.into();
        self
    }
}

/// Buffers reads, writes and deletes in an [`Overlay`] over an exclusively owned engine.
///
/// Nothing reaches the engine until [`commit`](Self::commit). A value read from the
/// engine is cached in the overlay until the next successful commit, so a store that
/// never commits keeps serving that value even if the engine is changed underneath it.
///
/// The store does no locking. Callers that share one across threads must serialize
/// access themselves.
pub struct BufferedStore<E: Engine = RedbEngine> {
    engine: E,
    overlay: Overlay,
    codec: Box<dyn Codec>,
    durability: Durability,
    log_target: String,
}

impl BufferedStore<RedbEngine> {
    /// Opens (or creates) a `redb` engine at `path` with default options.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, StoreOptions::default())
    }

    pub fn open_with<P: AsRef<Path>>(path: P, options: StoreOptions) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(Error::Configuration("storage path is empty".to_string()));
        }
        info!(target: options.log_target.as_str(), "opening store at {:?}", path);
        let engine = RedbEngine::open(path).map_err(|source| Error::EngineOpen {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::with_engine(engine, options))
    }
}

impl<E: Engine> BufferedStore<E> {
    /// Wraps an already opened engine with an empty overlay.
    pub fn with_engine(engine: E, options: StoreOptions) -> Self {
        Self {
            engine,
            overlay: Overlay::new(),
            codec: options.codec,
            durability: options.durability,
            log_target: options.log_target,
        }
    }

    fn target(&self) -> &str {
        &self.log_target
    }

    /// Returns the value for `key`, consulting the overlay before the engine.
    ///
    /// A value fetched from the engine is decompressed and cached in the overlay.
    pub fn get(&mut self, key: &[u8]) -> Result<Value> {
        self.lookup(key)?.ok_or(Error::KeyNotFound)
    }

    /// Whether `key` currently resolves to a value.
    ///
    /// Follows the same path as [`get`](Self::get), caching included. Only an absent
    /// or deleted key yields `false`; engine and codec failures are returned as errors.
    pub fn contains(&mut self, key: &[u8]) -> Result<bool> {
        Ok(self.lookup(key)?.is_some())
    }

    fn lookup(&mut self, key: &[u8]) -> Result<Option<Value>> {
        trace!(target: self.target(), "getting entry key={}", key_prefix(key));
        match self.overlay.get(key) {
            Some(Entry::Deleted) => return Ok(None),
            Some(Entry::Present(value)) => {
                trace!(target: self.target(), "from overlay");
                return Ok(Some(value.clone()));
            }
            None => {}
        }

        trace!(target: self.target(), "from engine");
        let stored = match self.engine.get(key).map_err(Error::Read)? {
            Some(stored) => stored,
            None => return Ok(None),
        };
        let value = self.codec.decompress(&stored)?;
        self.overlay.put(key.to_vec(), value.clone());
        Ok(Some(value))
    }

    /// Buffers `value` for `key`, replacing any earlier overlay state.
    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        trace!(target: self.target(), "putting entry key={} len={}", key_prefix(key), value.len());
        self.overlay.put(key.to_vec(), value.to_vec());
    }

    /// Buffers a tombstone for `key`. Deleting an absent key is not an error.
    pub fn delete(&mut self, key: &[u8]) {
        trace!(target: self.target(), "deleting entry key={}", key_prefix(key));
        self.overlay.delete(key.to_vec());
    }

    /// Writes the whole overlay to the engine as one atomic batch, then clears it.
    ///
    /// On failure the overlay is left untouched and the commit can be retried.
    /// An empty overlay commits without touching the engine.
    pub fn commit(&mut self) -> Result<()> {
        debug!(target: self.target(), "committing {:?}", self);
        if self.overlay.is_empty() {
            return Ok(());
        }

        let mut batch = WriteBatch::with_capacity(self.overlay.len());
        for (key, entry) in self.overlay.iter() {
            match entry {
                Entry::Present(value) => batch.put(key.clone(), self.codec.compress(value)?),
                Entry::Deleted => batch.delete(key.clone()),
            }
        }

        self.engine.write_batch(batch, self.durability).map_err(Error::Commit)?;
        self.overlay.clear();
        Ok(())
    }

    /// Number of overlay entries, cached reads included.
    pub fn pending(&self) -> usize {
        self.overlay.len()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

/// Stores are equal when they wrap the same engine handle, whatever their overlays hold.
impl<E: Engine> PartialEq for BufferedStore<E> {
    fn eq(&self, other: &Self) -> bool {
        self.engine.id() == other.engine.id()
    }
}

impl<E: Engine> fmt::Debug for BufferedStore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<DB at {} uncommitted={}>", self.engine.id(), self.overlay.len())
    }
}

fn key_prefix(key: &[u8]) -> String {
    hex::encode(&key[..key.len().min(4)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::VaultCodec;
    use crate::engine::{EngineError, MemoryEngine};
    use tempfile::tempdir;

    fn mem_store() -> (BufferedStore<MemoryEngine>, MemoryEngine) {
        let engine = MemoryEngine::new();
        let store = BufferedStore::with_engine(engine.clone(), StoreOptions::default());
        (store, engine)
    }

    #[test]
    fn test_put_then_get_without_commit() {
        let (mut store, engine) = mem_store();
        store.put(b"k1", b"a");
        assert_eq!(store.get(b"k1").unwrap(), b"a".to_vec());
        assert!(engine.is_empty());
    }

    #[test]
    fn test_get_missing_key() {
        let (mut store, _) = mem_store();
        assert!(matches!(store.get(b"missing"), Err(Error::KeyNotFound)));
        assert!(!store.contains(b"missing").unwrap());
        assert_eq!(store.pending(), 0);
    }

    #[test]
    fn test_delete_hides_committed_value() {
        let (mut store, engine) = mem_store();
        store.put(b"k", b"v");
        store.commit().unwrap();

        store.delete(b"k");
        assert!(!store.contains(b"k").unwrap());
        assert!(matches!(store.get(b"k"), Err(Error::KeyNotFound)));
        assert_eq!(engine.get(b"k").unwrap(), Some(b"v".to_vec()));

        store.commit().unwrap();
        assert_eq!(engine.get(b"k").unwrap(), None);
    }

    #[test]
    fn test_delete_missing_key_is_noop() {
        let (mut store, engine) = mem_store();
        store.delete(b"ghost");
        store.commit().unwrap();
        assert!(engine.is_empty());
        assert_eq!(store.pending(), 0);
    }

    #[test]
    fn test_put_after_delete_revives_key() {
        let (mut store, _) = mem_store();
        store.delete(b"k");
        store.put(b"k", b"back");
        assert_eq!(store.get(b"k").unwrap(), b"back".to_vec());
    }

    #[test]
    fn test_empty_value_is_present() {
        let (mut store, _) = mem_store();
        store.put(b"k", b"");
        assert!(store.contains(b"k").unwrap());
        assert_eq!(store.get(b"k").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_get_caches_engine_read() {
        let (mut store, engine) = mem_store();
        store.put(b"k", b"v");
        store.commit().unwrap();
        assert_eq!(store.pending(), 0);

        assert_eq!(store.get(b"k").unwrap(), b"v".to_vec());
        assert_eq!(store.pending(), 1);
        assert_eq!(engine.batches_written(), 1);
    }

    #[test]
    fn test_cached_read_is_stale_until_commit() {
        let (mut store, engine) = mem_store();
        let mut batch = WriteBatch::new();
        batch.put(b"k".to_vec(), b"old".to_vec());
        engine.write_batch(batch, Durability::Async).unwrap();

        assert_eq!(store.get(b"k").unwrap(), b"old".to_vec());

        // Another writer changes the engine directly.
        let mut batch = WriteBatch::new();
        batch.put(b"k".to_vec(), b"new".to_vec());
        engine.write_batch(batch, Durability::Async).unwrap();
        assert_eq!(store.get(b"k").unwrap(), b"old".to_vec());

        // Commit writes the cached value back, then the next read goes to the engine.
        store.commit().unwrap();
        assert_eq!(store.pending(), 0);
        assert_eq!(store.get(b"k").unwrap(), b"old".to_vec());
    }

    #[test]
    fn test_commit_clears_overlay_and_rereads_engine() {
        let (mut store, engine) = mem_store();
        store.put(b"k", b"v");
        store.commit().unwrap();
        store.get(b"k").unwrap();
        store.commit().unwrap();
        assert_eq!(store.pending(), 0);

        let mut batch = WriteBatch::new();
        batch.put(b"k".to_vec(), b"outside".to_vec());
        engine.write_batch(batch, Durability::Async).unwrap();
        assert_eq!(store.get(b"k").unwrap(), b"outside".to_vec());
    }

    #[test]
    fn test_empty_commit_skips_engine() {
        let (mut store, engine) = mem_store();
        store.commit().unwrap();
        assert_eq!(engine.batches_written(), 0);
    }

    #[test]
    fn test_failed_commit_keeps_overlay() {
        let (mut store, engine) = mem_store();
        store.put(b"a", b"1");
        store.delete(b"b");
        engine.set_read_only(true);

        let res = store.commit();
        assert!(matches!(res, Err(Error::Commit(EngineError::ReadOnly))));
        assert_eq!(store.pending(), 2);
        assert_eq!(store.get(b"a").unwrap(), b"1".to_vec());
        assert!(engine.is_empty());

        engine.set_read_only(false);
        store.commit().unwrap();
        assert_eq!(store.pending(), 0);
        assert_eq!(engine.get(b"a").unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn test_replayed_commit_gives_same_state() {
        let (mut store, engine) = mem_store();
        store.put(b"a", b"1");
        store.delete(b"b");
        store.commit().unwrap();
        let once = engine.snapshot();

        store.put(b"a", b"1");
        store.delete(b"b");
        store.commit().unwrap();
        assert_eq!(engine.snapshot(), once);
    }

    #[test]
    fn test_equality_follows_engine_identity() {
        let engine = MemoryEngine::new();
        let mut a = BufferedStore::with_engine(engine.clone(), StoreOptions::default());
        let b = BufferedStore::with_engine(engine, StoreOptions::default());
        let c = BufferedStore::with_engine(MemoryEngine::new(), StoreOptions::default());

        a.put(b"only-in-a", b"x");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_debug_repr() {
        let (mut store, engine) = mem_store();
        store.put(b"k", b"v");
        assert_eq!(format!("{:?}", store), format!("<DB at {} uncommitted=1>", engine.id()));
    }

    #[test]
    fn test_codec_applies_at_engine_boundary() {
        let engine = MemoryEngine::new();
        let key = b"thisis32byteslongsecretkey123456";
        let options = StoreOptions::new().codec(Box::new(VaultCodec::new(key).unwrap()));
        let mut store = BufferedStore::with_engine(engine.clone(), options);

        store.put(b"k", b"secret");
        store.commit().unwrap();
        let raw = engine.get(b"k").unwrap().unwrap();
        assert_ne!(raw, b"secret".to_vec());

        assert_eq!(store.get(b"k").unwrap(), b"secret".to_vec());
    }

    #[test]
    fn test_contains_propagates_codec_failure() {
        let engine = MemoryEngine::new();
        let mut batch = WriteBatch::new();
        batch.put(b"k".to_vec(), b"not encrypted".to_vec());
        engine.write_batch(batch, Durability::Async).unwrap();

        let key = b"thisis32byteslongsecretkey123456";
        let options = StoreOptions::new().codec(Box::new(VaultCodec::new(key).unwrap()));
        let mut store = BufferedStore::with_engine(engine, options);

        assert!(matches!(store.contains(b"k"), Err(Error::Codec(_))));
        assert_eq!(store.pending(), 0);
    }

    #[test]
    fn test_open_rejects_empty_path() {
        assert!(matches!(BufferedStore::open(""), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_open_engine_failure() {
        let dir = tempdir().unwrap();
        let res = BufferedStore::open(dir.path());
        assert!(matches!(res, Err(Error::EngineOpen { .. })));
    }

    #[test]
    fn test_open_with_sync_durability() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.redb");
        let options = StoreOptions::new().durability(Durability::Sync).log_target("test-db");
        let mut store = BufferedStore::open_with(&path, options).unwrap();
        store.put(b"k", b"v");
        store.commit().unwrap();
        drop(store);

        let mut store = BufferedStore::open(&path).unwrap();
        assert_eq!(store.get(b"k").unwrap(), b"v".to_vec());
    }
}
