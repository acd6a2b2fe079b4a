//! Activation of the lifecycle reconciler by host id.
//!
//! The supervisor owns at most one running daemon. It is inert while no host
//! id is set; setting a host starts a daemon, clearing it (or dropping the
//! supervisor) cancels the daemon before anything else runs.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::domain::models::HostId;
use crate::services::lifecycle_reconciler::LifecycleReconciler;
use crate::services::reconciler_daemon::{
    DaemonConfig, ReconcilerDaemon, ReconcilerEvent, ReconcilerHandle, ReconcilerStatus,
};

/// Starts and stops the reconciler daemon as the active host changes.
pub struct ReconcilerSupervisor {
    reconciler: Arc<LifecycleReconciler>,
    config: DaemonConfig,
    active: Mutex<Option<ReconcilerHandle>>,
}

impl ReconcilerSupervisor {
    pub fn new(reconciler: Arc<LifecycleReconciler>, config: DaemonConfig) -> Self {
        Self {
            reconciler,
            config,
            active: Mutex::new(None),
        }
    }

    /// Point the reconciler at `host`, or deactivate it with `None`.
    ///
    /// Returns the event stream of a newly started daemon. Returns `None` when
    /// deactivating or when `host` is already active.
    pub async fn set_host(&self, host: Option<HostId>) -> Option<mpsc::Receiver<ReconcilerEvent>> {
        let mut active = self.active.lock().await;

        if let (Some(current), Some(requested)) = (active.as_ref(), host.as_ref()) {
            if current.host_id() == requested && !current.is_stop_requested() {
                return None;
            }
        }

        if let Some(previous) = active.take() {
            tracing::info!(host_id = %previous.host_id(), "Deactivating lifecycle reconciler");
            previous.shutdown().await;
        }

        let host = host?;
        let daemon = ReconcilerDaemon::new(Arc::clone(&self.reconciler), host, self.config.clone());
        let (handle, events) = daemon.spawn();
        *active = Some(handle);
        Some(events)
    }

    /// Activate for `host`. See [`Self::set_host`].
    pub async fn activate(&self, host: HostId) -> Option<mpsc::Receiver<ReconcilerEvent>> {
        self.set_host(Some(host)).await
    }

    /// Stop the active daemon, if any.
    pub async fn deactivate(&self) {
        self.set_host(None).await;
    }

    /// Host currently being reconciled.
    pub async fn active_host(&self) -> Option<HostId> {
        self.active.lock().await.as_ref().map(|h| h.host_id().clone())
    }

    /// Status of the active daemon.
    pub async fn status(&self) -> Option<ReconcilerStatus> {
        let active = self.active.lock().await;
        match active.as_ref() {
            Some(handle) => Some(handle.status().await),
            None => None,
        }
    }

    /// Request an immediate pass on the active daemon.
    pub async fn trigger(&self) -> bool {
        let active = self.active.lock().await;
        if let Some(handle) = active.as_ref() {
            handle.trigger();
            true
        } else {
            false
        }
    }
}
