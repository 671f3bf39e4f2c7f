use std::sync::Arc;

use crate::errors::BridgeError;
use crate::events::{BridgeEvent, EventEmitter};
use crate::permissions::{Capability, PermissionGate, PermissionState};
use crate::session::SessionController;

/// Enables or disables one local capability (microphone or camera).
///
/// Gated by device permission first, then by session membership. The
/// requested value is always forwarded to the SDK; nothing is cached here,
/// so a resend of the current value reaches the SDK as well.
pub struct CapabilityToggle {
    capability: Capability,
    permissions: Arc<PermissionGate>,
    session: Arc<SessionController>,
    emitter: EventEmitter,
}

impl CapabilityToggle {
    pub fn new(
        capability: Capability,
        permissions: Arc<PermissionGate>,
        session: Arc<SessionController>,
        emitter: EventEmitter,
    ) -> Self {
        Self {
            capability,
            permissions,
            session,
            emitter,
        }
    }

    pub fn microphone(
        permissions: Arc<PermissionGate>,
        session: Arc<SessionController>,
        emitter: EventEmitter,
    ) -> Self {
        Self::new(Capability::Microphone, permissions, session, emitter)
    }

    pub fn camera(
        permissions: Arc<PermissionGate>,
        session: Arc<SessionController>,
        emitter: EventEmitter,
    ) -> Self {
        Self::new(Capability::Camera, permissions, session, emitter)
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// Toggle the capability on/off.
    ///
    /// Without permission this starts a permission request and fails right
    /// away; the caller retries once the platform reports the result.
    pub async fn set_enabled(&self, enabled: bool) -> Result<(), BridgeError> {
        let capability = self.capability;
        match self.permissions.check(capability) {
            PermissionState::Granted => {}
            PermissionState::Denied => {
                self.permissions.request(capability);
                return Err(BridgeError::PermissionDenied(capability));
            }
            PermissionState::Unknown => {
                self.permissions.request(capability);
                return Err(BridgeError::PermissionPending(capability));
            }
        }

        let helper = self
            .session
            .helper(capability)
            .ok_or(BridgeError::CapabilityUnavailable(capability))?;

        if let Err(e) = helper.set_enabled(enabled).await {
            tracing::warn!("{capability} toggle to {enabled} failed: {e}");
            return Err(e);
        }

        tracing::info!("{capability} enabled: {enabled}");
        self.emitter
            .emit(BridgeEvent::CapabilityChanged { capability, enabled });
        Ok(())
    }
}
