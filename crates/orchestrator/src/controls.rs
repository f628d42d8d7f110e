//! In-process worker coordination.
//!
//! The store is the durable authority for session state; these primitives
//! cover the two in-process requirements on top of it: a pause/stop signal
//! a running worker observes no later than the end of its current page
//! fetch, and the process-wide claim that keeps scrape workers exclusive.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Run,
    Pause,
    Stop,
}

/// Per-session control channels for running scrape workers.
#[derive(Clone, Default)]
pub struct ControlRegistry {
    inner: Arc<RwLock<HashMap<Uuid, watch::Sender<ControlSignal>>>>,
}

impl ControlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a worker and get its signal receiver. Replaces any stale
    /// entry left by a previous worker for the same session.
    pub fn register(&self, session_id: Uuid) -> watch::Receiver<ControlSignal> {
        let (tx, rx) = watch::channel(ControlSignal::Run);
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(session_id, tx);
        debug!(session_id = %session_id, "Worker control registered");
        rx
    }

    /// Signal a running worker. Returns false when no worker is
    /// registered for the session.
    pub fn signal(&self, session_id: Uuid, signal: ControlSignal) -> bool {
        let guard = self
            .inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match guard.get(&session_id) {
            Some(tx) => {
                tx.send_replace(signal);
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, session_id: Uuid) {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&session_id);
    }

    pub fn is_registered(&self, session_id: Uuid) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(&session_id)
    }
}

/// Process-wide exclusive claim on the single scrape worker slot.
#[derive(Clone, Default)]
pub struct WorkerSlot {
    holder: Arc<Mutex<Option<Uuid>>>,
}

impl WorkerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for a session. The returned guard releases it on
    /// drop, whatever path the worker exits through.
    pub fn try_claim(&self, session_id: Uuid) -> Option<SlotGuard> {
        let mut holder = self
            .holder
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if holder.is_some() {
            return None;
        }
        *holder = Some(session_id);
        Some(SlotGuard {
            slot: self.clone(),
            session_id,
        })
    }

    pub fn holder(&self) -> Option<Uuid> {
        *self
            .holder
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub struct SlotGuard {
    slot: WorkerSlot,
    session_id: Uuid,
}

impl SlotGuard {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let mut holder = self
            .slot
            .holder
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *holder == Some(self.session_id) {
            *holder = None;
        }
    }
}
