//! Shared application state: one editing session per network.
//!
//! DESIGN
//! ======
//! `AppState` is cheap to clone; every field is Arc-wrapped. Sessions live
//! in a map behind a single `RwLock`, and every mutation runs inside the
//! write guard through `with_session`, so the tree algorithms never see an
//! interleaved writer. Networks are hydrated from the layout store on first
//! access and kept in memory until unloaded.
//!
//! ERROR HANDLING
//! ==============
//! Store and serialization failures surface as `StateError`. A network that
//! was never saved is `NotFound`; a saved document without a tree snapshot
//! cannot be reopened and is reported as `MissingSnapshot`.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::autosave::{AutoSaver, ErrorCallback, SaveError, save_fn};
use crate::clock::Clock;
use crate::config::{AutoSaveConfig, LayoutConfig};
use crate::parse::parse;
use crate::persist::{self, PersistError};
use crate::session::NetworkSession;
use crate::store::{LayoutStore, NetworkId, StoreError};
use crate::tree::TreeError;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("network not loaded: {0}")]
    NotLoaded(NetworkId),
    #[error("no saved layout for network {0}")]
    NotFound(NetworkId),
    #[error("saved layout for network {0} has no tree snapshot")]
    MissingSnapshot(NetworkId),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

impl crate::error::ErrorCode for StateError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotLoaded(_) => "E_NETWORK_NOT_LOADED",
            Self::NotFound(_) => "E_NETWORK_NOT_FOUND",
            Self::MissingSnapshot(_) => "E_MISSING_SNAPSHOT",
            Self::Tree(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
            Self::Persist(e) => e.error_code(),
        }
    }
}

// =============================================================================
// APP STATE
// =============================================================================

#[derive(Clone)]
pub struct AppState {
    pub networks: Arc<RwLock<HashMap<NetworkId, NetworkSession>>>,
    pub store: Arc<dyn LayoutStore>,
    pub clock: Arc<dyn Clock>,
    pub layout: LayoutConfig,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn LayoutStore>, clock: Arc<dyn Clock>, layout: LayoutConfig) -> Self {
        Self { networks: Arc::new(RwLock::new(HashMap::new())), store, clock, layout }
    }

    /// Parse a scanner report into a fresh session, replacing any session
    /// already open for `network_id`. Returns the number of devices found.
    pub async fn open_report(&self, network_id: NetworkId, raw: &str) -> usize {
        let parsed = parse(raw, self.clock.now());
        let session = NetworkSession::from_parsed(parsed, Arc::clone(&self.clock), self.layout);
        let devices = session.devices().len();
        self.networks.write().await.insert(network_id, session);
        info!(%network_id, devices, "network opened from report");
        devices
    }

    /// Make sure `network_id` is in memory, hydrating it from the store if
    /// needed. Returns `true` when the store was read.
    ///
    /// # Errors
    ///
    /// `NotFound` if nothing was saved, `MissingSnapshot` if the saved
    /// document has no tree, or the underlying store/parse error.
    pub async fn load_network(&self, network_id: NetworkId) -> Result<bool, StateError> {
        if self.networks.read().await.contains_key(&network_id) {
            return Ok(false);
        }

        let text = self.store.get(network_id).await?.ok_or(StateError::NotFound(network_id))?;
        let saved = persist::import_layout(&text)?;
        let session = NetworkSession::from_saved(&saved, Arc::clone(&self.clock), self.layout)
            .ok_or(StateError::MissingSnapshot(network_id))?;

        // A concurrent loader may have won; keep whichever session is there.
        self.networks.write().await.entry(network_id).or_insert(session);
        info!(%network_id, positions = saved.positions.len(), "network hydrated from store");
        Ok(true)
    }

    /// Export the session and write it to the store.
    ///
    /// # Errors
    ///
    /// `NotLoaded` if the network is not in memory, or the store/serialize error.
    pub async fn save_network(&self, network_id: NetworkId) -> Result<(), StateError> {
        let document = {
            let networks = self.networks.read().await;
            let session = networks.get(&network_id).ok_or(StateError::NotLoaded(network_id))?;
            persist::to_json(&session.export_layout())?
        };
        self.store.put(network_id, document).await?;
        info!(%network_id, "network saved");
        Ok(())
    }

    /// Run `f` against a loaded session while holding the write lock.
    ///
    /// # Errors
    ///
    /// `NotLoaded`, or whatever `f` returns.
    pub async fn with_session<R>(
        &self,
        network_id: NetworkId,
        f: impl FnOnce(&mut NetworkSession) -> Result<R, TreeError>,
    ) -> Result<R, StateError> {
        let mut networks = self.networks.write().await;
        let session = networks.get_mut(&network_id).ok_or(StateError::NotLoaded(network_id))?;
        Ok(f(session)?)
    }

    /// Dirty-tracking snapshot of a loaded session.
    ///
    /// # Errors
    ///
    /// `NotLoaded`, or a serialization error.
    pub async fn snapshot(&self, network_id: NetworkId) -> Result<String, StateError> {
        let networks = self.networks.read().await;
        let session = networks.get(&network_id).ok_or(StateError::NotLoaded(network_id))?;
        Ok(session.snapshot()?)
    }

    /// Drop a session from memory. Returns whether one was open.
    pub async fn unload(&self, network_id: NetworkId) -> bool {
        self.networks.write().await.remove(&network_id).is_some()
    }

    /// Auto-saver that writes snapshots of `network_id` to the store,
    /// stamped with the save time.
    #[must_use]
    pub fn autosaver(&self, network_id: NetworkId, config: AutoSaveConfig, on_error: Option<ErrorCallback>) -> AutoSaver {
        let store = Arc::clone(&self.store);
        let clock = Arc::clone(&self.clock);
        let save = save_fn(move |snapshot: String| {
            let store = Arc::clone(&store);
            let now = clock.now();
            async move {
                let mut saved = persist::import_layout(&snapshot)?;
                saved.timestamp = Some(now);
                store.put(network_id, persist::to_json(&saved)?).await?;
                Ok::<(), SaveError>(())
            }
        });
        AutoSaver::new(config, save, on_error)
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
