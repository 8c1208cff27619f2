//! Connectivity monitoring.

use tokio::sync::watch;

/// What a monitor last reported.
///
/// `regained` counts offline→online transitions. A watch channel keeps
/// only the latest value, so a receiver that misses intermediate states
/// still sees that the counter moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityState {
    /// Whether the backend is reachable right now.
    pub online: bool,
    /// Number of offline→online transitions reported so far.
    pub regained: u64,
}

/// Reports whether the device can reach the backend.
///
/// Repeated identical reports do not replace the published state, so
/// they wake nobody.
pub trait ConnectivityMonitor: Send + Sync {
    /// Returns the current state.
    fn is_online(&self) -> bool;

    /// Subscribes to state changes.
    fn subscribe(&self) -> watch::Receiver<ConnectivityState>;
}

/// A monitor driven by explicit calls, for tests and the CLI.
#[derive(Debug)]
pub struct ManualConnectivity {
    state: watch::Sender<ConnectivityState>,
}

impl ManualConnectivity {
    /// Creates a monitor in the given state.
    pub fn new(online: bool) -> Self {
        let (state, _) = watch::channel(ConnectivityState {
            online,
            regained: 0,
        });
        Self { state }
    }

    /// Reports a new state. Reporting the current state again notifies
    /// nobody.
    pub fn set_online(&self, online: bool) {
        self.state.send_if_modified(|current| {
            if current.online == online {
                return false;
            }
            current.online = online;
            if online {
                current.regained += 1;
            }
            true
        });
    }
}

impl ConnectivityMonitor for ManualConnectivity {
    fn is_online(&self) -> bool {
        self.state.borrow().online
    }

    fn subscribe(&self) -> watch::Receiver<ConnectivityState> {
        self.state.subscribe()
    }
}
