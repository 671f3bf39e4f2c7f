use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::events::{BridgeEvent, EventEmitter};

/// A device capability guarded by a platform permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    Microphone,
    Camera,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Microphone => f.write_str("microphone"),
            Self::Camera => f.write_str("camera"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionState {
    Unknown,
    Granted,
    Denied,
}

/// The platform's device permission subsystem.
///
/// `request` only starts the platform flow; its outcome comes back through
/// [`PermissionGate::on_permission_result`].
pub trait PermissionPlatform: Send + Sync {
    fn check(&self, capability: Capability) -> PermissionState;
    fn request(&self, capability: Capability);
}

#[derive(Default)]
struct GateState {
    results: HashMap<Capability, PermissionState>,
    outstanding: HashSet<Capability>,
}

/// Checks and requests device permissions before any SDK capability call.
///
/// The stored per-capability state is written only by the platform's
/// permission-result channel. Until a result has been delivered, `check`
/// falls through to the platform's synchronous query.
pub struct PermissionGate {
    platform: Arc<dyn PermissionPlatform>,
    emitter: EventEmitter,
    state: Mutex<GateState>,
}

impl PermissionGate {
    pub fn new(platform: Arc<dyn PermissionPlatform>, emitter: EventEmitter) -> Self {
        Self {
            platform,
            emitter,
            state: Mutex::new(GateState::default()),
        }
    }

    pub fn check(&self, capability: Capability) -> PermissionState {
        let stored = self
            .lock()
            .results
            .get(&capability)
            .copied()
            .unwrap_or(PermissionState::Unknown);
        match stored {
            PermissionState::Unknown => self.platform.check(capability),
            known => known,
        }
    }

    /// Ask the platform for `capability`. Returns false when a request is
    /// already outstanding and nothing new was sent.
    pub fn request(&self, capability: Capability) -> bool {
        let first = self.lock().outstanding.insert(capability);
        if first {
            tracing::info!("requesting {capability} permission");
            self.platform.request(capability);
        } else {
            tracing::debug!("{capability} permission request already outstanding");
        }
        first
    }

    /// Platform permission-result callback.
    pub fn on_permission_result(&self, capability: Capability, state: PermissionState) {
        {
            let mut gate = self.lock();
            gate.outstanding.remove(&capability);
            gate.results.insert(capability, state);
        }
        tracing::info!("{capability} permission now {state:?}");
        self.emitter
            .emit(BridgeEvent::PermissionChanged { capability, state });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
