use std::sync::{Arc, PoisonError, RwLock};

use crate::permissions::{Capability, PermissionState};

/// Events emitted by the core to UI listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    SdkStateChanged(SdkState),
    SessionStateChanged(SessionState),
    CapabilityChanged { capability: Capability, enabled: bool },
    PermissionChanged { capability: Capability, state: PermissionState },
}

/// Lifecycle of the process-wide SDK instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdkState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

/// Membership of a session controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Joining,
    Active,
    Leaving,
}

impl SessionState {
    /// A join or leave is in flight.
    pub fn is_transitioning(self) -> bool {
        matches!(self, Self::Joining | Self::Leaving)
    }
}

/// Trait for receiving events from the core.
/// Implementations must be Send + Sync (called from tokio tasks and SDK threads).
pub trait BridgeEventListener: Send + Sync {
    fn on_event(&self, event: BridgeEvent);
}

/// Registration returned by [`EventEmitter::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(ListenerId, Arc<dyn BridgeEventListener>)>,
}

/// Internal event emitter that dispatches to registered listeners.
#[derive(Clone, Default)]
pub struct EventEmitter {
    registry: Arc<RwLock<Registry>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, listener: Arc<dyn BridgeEventListener>) -> ListenerId {
        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        let id = ListenerId(registry.next_id);
        registry.next_id += 1;
        registry.listeners.push((id, listener));
        id
    }

    /// Drop a listener; unknown ids are ignored.
    pub fn remove_listener(&self, id: ListenerId) {
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .retain(|(registered, _)| *registered != id);
    }

    pub fn emit(&self, event: BridgeEvent) {
        let listeners: Vec<_> = self
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener.on_event(event.clone());
        }
    }

    #[cfg(test)]
    pub(crate) fn listener_count(&self) -> usize {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .len()
    }
}
