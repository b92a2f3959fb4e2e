//! Network monitor: connectivity status with deduplicated transitions.
//!
//! Wraps whatever connectivity-change source the platform offers (the source
//! calls [`NetworkMonitor::set_status`]) behind two guarantees: a synchronous
//! current-status read, and an event stream that fires only on real
//! transitions. Subscribing alone never produces an event, and repeated
//! identical statuses are swallowed, so dependent work (queue replay) cannot
//! be triggered spuriously.

use std::sync::Arc;

use tokio::sync::watch;

/// Connectivity as last reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    Connected,
    Disconnected,
}

impl NetworkStatus {
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Shared connectivity monitor; clones observe the same status.
#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    status: Arc<watch::Sender<NetworkStatus>>,
}

impl NetworkMonitor {
    /// Create a monitor with a known initial status.
    #[must_use]
    pub fn new(initial: NetworkStatus) -> Self {
        let (status, _) = watch::channel(initial);
        Self {
            status: Arc::new(status),
        }
    }

    /// The current status, always available without awaiting.
    #[must_use]
    pub fn status(&self) -> NetworkStatus {
        *self.status.borrow()
    }

    /// Feed a status report from the platform source.
    ///
    /// Repeated identical statuses do not notify subscribers.
    pub fn set_status(&self, status: NetworkStatus) {
        self.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                tracing::debug!(?status, "network status changed");
                *current = status;
                true
            }
        });
    }

    /// Subscribe to status transitions.
    ///
    /// Only transitions after the subscription are observed; dropping the
    /// receiver unsubscribes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<NetworkStatus> {
        self.status.subscribe()
    }
}
