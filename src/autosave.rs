//! Auto-save coordinator: debounced and immediate saves around a caller's
//! save function.
//!
//! DESIGN
//! ======
//! Every `trigger` restarts a single debounce timer, so a burst of edits
//! (a drag, a run of field changes) produces one save. A save that comes due
//! while another is still executing is dropped: there is no queue. The last
//! successfully saved snapshot is remembered as a SHA-256 digest, which lets
//! the UI tell "never saved", "unchanged" and "dirty" apart.
//!
//! ERROR HANDLING
//! ==============
//! The debounced path runs on a background task and must never propagate:
//! failures are recorded in `last_error` and handed to the optional error
//! callback. `save_now` records the failure too, then returns it to the
//! caller.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::BoxFuture;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::AutoSaveConfig;
use crate::persist::PersistError;
use crate::store::StoreError;

/// Caller-supplied persistence step. Receives the serialized snapshot.
pub type SaveFn = Arc<dyn Fn(String) -> BoxFuture<'static, Result<(), SaveError>> + Send + Sync>;

/// Invoked with the error when a debounced save fails.
pub type ErrorCallback = Arc<dyn Fn(&SaveError) + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("save failed: {0}")]
    Other(String),
}

impl crate::error::ErrorCode for SaveError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Store(e) => e.error_code(),
            Self::Persist(e) => e.error_code(),
            Self::Other(_) => "E_SAVE_FAILED",
        }
    }
}

/// Whether a snapshot matches what was last persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    NeverSaved,
    Unchanged,
    Dirty,
}

/// Result of a save attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Another save was executing; this one was dropped.
    Skipped,
}

/// Wrap an async closure as a [`SaveFn`].
pub fn save_fn<F, Fut>(f: F) -> SaveFn
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), SaveError>> + Send + 'static,
{
    Arc::new(move |snapshot: String| f(snapshot).boxed())
}

#[derive(Default)]
struct SaveState {
    pending: Option<JoinHandle<()>>,
    generation: u64,
    last_saved_hash: Option<String>,
    last_saved_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

struct Inner {
    save: SaveFn,
    config: AutoSaveConfig,
    on_error: Option<ErrorCallback>,
    /// Outside `state` so `InFlightGuard` can clear it from `Drop`.
    in_flight: AtomicBool,
    state: Mutex<SaveState>,
}

/// Clears `in_flight` when the save future finishes or is dropped.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_ok().then_some(Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Debounced saver. Cheap to clone; clones share one timer and one state.
#[derive(Clone)]
pub struct AutoSaver {
    inner: Arc<Inner>,
}

impl AutoSaver {
    #[must_use]
    pub fn new(config: AutoSaveConfig, save: SaveFn, on_error: Option<ErrorCallback>) -> Self {
        let inner = Inner {
            save,
            config,
            on_error,
            in_flight: AtomicBool::new(false),
            state: Mutex::new(SaveState::default()),
        };
        Self { inner: Arc::new(inner) }
    }

    /// Schedule a save of `snapshot` after the debounce window, replacing
    /// any save still waiting.
    pub async fn trigger(&self, snapshot: String) {
        let mut state = self.inner.state.lock().await;
        if let Some(handle) = state.pending.take() {
            handle.abort();
        }
        state.generation += 1;
        let generation = state.generation;

        let inner = Arc::clone(&self.inner);
        state.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.config.debounce).await;
            {
                let mut state = inner.state.lock().await;
                if state.generation != generation {
                    return;
                }
                // Past this point the save can no longer be cancelled.
                state.pending = None;
            }
            if let Err(e) = run_save(&inner, snapshot).await {
                warn!(error = %e, "debounced layout save failed");
                if let Some(callback) = &inner.on_error {
                    callback(&e);
                }
            }
        }));
    }

    /// Cancel any pending debounced save and save `snapshot` now.
    ///
    /// If another save is still executing, `snapshot` is dropped and
    /// `SaveOutcome::Skipped` is returned; nothing was written for it.
    ///
    /// # Errors
    ///
    /// Returns the save function's error after recording it in `last_error`.
    pub async fn save_now(&self, snapshot: String) -> Result<SaveOutcome, SaveError> {
        self.cancel().await;
        run_save(&self.inner, snapshot).await.inspect_err(|e| {
            warn!(error = %e, "immediate layout save failed");
        })
    }

    /// Drop a pending debounced save. An executing save is unaffected.
    pub async fn cancel(&self) {
        let mut state = self.inner.state.lock().await;
        if let Some(handle) = state.pending.take() {
            handle.abort();
            debug!("pending layout save cancelled");
        }
        state.generation += 1;
    }

    /// Compare `snapshot` against the last successful save.
    pub async fn status(&self, snapshot: &str) -> SaveStatus {
        let state = self.inner.state.lock().await;
        match &state.last_saved_hash {
            None => SaveStatus::NeverSaved,
            Some(hash) if *hash == snapshot_hash(snapshot) => SaveStatus::Unchanged,
            Some(_) => SaveStatus::Dirty,
        }
    }

    pub async fn is_saving(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    pub async fn has_pending(&self) -> bool {
        self.inner.state.lock().await.pending.is_some()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.inner.state.lock().await.last_error.clone()
    }

    pub async fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.inner.state.lock().await.last_saved_at
    }
}

async fn run_save(inner: &Inner, snapshot: String) -> Result<SaveOutcome, SaveError> {
    let hash = snapshot_hash(&snapshot);
    let bytes = snapshot.len();
    let Some(guard) = InFlightGuard::acquire(&inner.in_flight) else {
        debug!("layout save already in flight; dropping this one");
        return Ok(SaveOutcome::Skipped);
    };

    let result = (inner.save)(snapshot).await;

    let mut state = inner.state.lock().await;
    drop(guard);
    match result {
        Ok(()) => {
            state.last_saved_hash = Some(hash);
            state.last_saved_at = Some(Utc::now());
            state.last_error = None;
            info!(bytes, "layout saved");
            Ok(SaveOutcome::Saved)
        }
        Err(e) => {
            state.last_error = Some(e.to_string());
            Err(e)
        }
    }
}

fn snapshot_hash(snapshot: &str) -> String {
    format!("{:x}", Sha256::digest(snapshot.as_bytes()))
}

#[cfg(test)]
#[path = "autosave_test.rs"]
mod tests;
