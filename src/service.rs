use std::sync::Arc;

use log::{info, warn};
use tokio::sync::watch;

use crate::config::ServiceConfig;
use crate::engine::RedbEngine;
use crate::store::BufferedStore;
use crate::{Error, Result};

/// Signals a running [`DbService`] to stop. Cheap to clone and safe to use from any task.
#[derive(Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Lifecycle wrapper around a [`BufferedStore`].
///
/// `start` opens the store, `run` blocks until a stop is signalled and `stop`
/// closes it. Stopping never commits: uncommitted overlay entries are dropped.
pub struct DbService {
    config: ServiceConfig,
    store: Option<BufferedStore<RedbEngine>>,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

impl DbService {
    pub const NAME: &'static str = "db";

    pub fn new(config: ServiceConfig) -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            config,
            store: None,
            stop_tx: Arc::new(tx),
            stop_rx: rx,
        }
    }

    /// Opens the store under the configured data directory.
    pub fn start(&mut self) -> Result<()> {
        if self.config.data_dir.as_os_str().is_empty() {
            return Err(Error::Configuration("data_dir is not set".to_string()));
        }
        let store = BufferedStore::open_with(self.config.db_path(), self.config.store_options())?;
        info!(target: self.config.log_target.as_str(), "{} service started {:?}", Self::NAME, store);
        self.store = Some(store);
        Ok(())
    }

    /// Waits for a stop signal. Does no work of its own.
    pub async fn run(&self) {
        let mut rx = self.stop_rx.clone();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle { tx: self.stop_tx.clone() }
    }

    /// Signals shutdown and closes the store without committing.
    pub fn stop(&mut self) {
        self.stop_tx.send_replace(true);
        if let Some(store) = self.store.take() {
            if store.pending() > 0 {
                warn!(
                    target: self.config.log_target.as_str(),
                    "discarding {} uncommitted entries", store.pending()
                );
            }
            info!(target: self.config.log_target.as_str(), "closing db");
        }
    }

    pub fn store(&self) -> Option<&BufferedStore<RedbEngine>> {
        self.store.as_ref()
    }

    pub fn store_mut(&mut self) -> Option<&mut BufferedStore<RedbEngine>> {
        self.store.as_mut()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}
