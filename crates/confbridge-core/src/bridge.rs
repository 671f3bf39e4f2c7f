use std::sync::Arc;

use crate::camera::{CameraEnumerator, CameraProbe};
use crate::controls::CapabilityToggle;
use crate::errors::BridgeError;
use crate::events::{BridgeEvent, BridgeEventListener, EventEmitter, ListenerId, SdkState, SessionState};
use crate::permissions::{Capability, PermissionGate, PermissionPlatform, PermissionState};
use crate::provider::SdkProvider;
use crate::sdk::SdkConfig;
use crate::session::{JoinRequest, SessionController, SessionInfo};

/// Everything one UI command surface talks to.
///
/// Bundles a session controller with its capability toggles, the permission
/// gate and the camera probe. The SDK provider is shared with any other
/// bridge in the process; its events are relayed into this bridge's own
/// emitter and the relay is unregistered when the bridge is dropped.
pub struct ConferenceBridge {
    emitter: EventEmitter,
    provider: Arc<SdkProvider>,
    sdk_relay: ListenerId,
    permissions: Arc<PermissionGate>,
    session: Arc<SessionController>,
    microphone: CapabilityToggle,
    camera: CapabilityToggle,
    camera_probe: CameraProbe,
}

impl ConferenceBridge {
    pub fn new(
        provider: Arc<SdkProvider>,
        sdk_config: SdkConfig,
        permissions: Arc<dyn PermissionPlatform>,
        cameras: Arc<dyn CameraEnumerator>,
    ) -> Self {
        let emitter = EventEmitter::new();
        let sdk_relay = provider.add_listener(Arc::new(SdkEventRelay {
            target: emitter.clone(),
        }));
        let permissions = Arc::new(PermissionGate::new(permissions, emitter.clone()));
        let session = Arc::new(SessionController::new(
            provider.clone(),
            sdk_config,
            emitter.clone(),
        ));
        Self {
            microphone: CapabilityToggle::microphone(
                permissions.clone(),
                session.clone(),
                emitter.clone(),
            ),
            camera: CapabilityToggle::camera(permissions.clone(), session.clone(), emitter.clone()),
            camera_probe: CameraProbe::new(permissions.clone(), cameras),
            emitter,
            provider,
            sdk_relay,
            permissions,
            session,
        }
    }

    /// Register a listener for session, capability, permission and SDK events.
    pub fn add_listener(&self, listener: Arc<dyn BridgeEventListener>) -> ListenerId {
        self.emitter.add_listener(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) {
        self.emitter.remove_listener(id);
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn sdk_state(&self) -> SdkState {
        self.provider.state()
    }

    pub fn session_info(&self) -> Option<SessionInfo> {
        self.session.session_info()
    }

    pub async fn join_session(&self, request: JoinRequest) -> Result<(), BridgeError> {
        self.session.join(request).await
    }

    pub async fn leave_session(&self, end_session: bool) -> Result<(), BridgeError> {
        self.session.leave_with(end_session).await
    }

    pub async fn toggle_mic(&self, on: bool) -> Result<(), BridgeError> {
        self.microphone.set_enabled(on).await
    }

    pub async fn toggle_cam(&self, on: bool) -> Result<(), BridgeError> {
        self.camera.set_enabled(on).await
    }

    pub fn check_camera_available(&self) -> Result<bool, BridgeError> {
        self.camera_probe.check_available()
    }

    pub fn permission(&self, capability: Capability) -> PermissionState {
        self.permissions.check(capability)
    }

    /// Platform permission-result channel.
    pub fn on_permission_result(&self, capability: Capability, state: PermissionState) {
        self.permissions.on_permission_result(capability, state);
    }

    /// Best-effort leave, then release the SDK unless another session in
    /// the process still holds it.
    pub async fn shutdown(&self) {
        self.session.shutdown().await;
        match self.provider.teardown() {
            Ok(()) => {}
            Err(BridgeError::InvalidState(reason)) => {
                tracing::debug!("SDK left in place: {reason}");
            }
            Err(e) => tracing::warn!("SDK teardown skipped: {e}"),
        }
    }
}

impl Drop for ConferenceBridge {
    fn drop(&mut self) {
        self.provider.remove_listener(self.sdk_relay);
    }
}

/// Forwards provider events to one bridge's listeners.
struct SdkEventRelay {
    target: EventEmitter,
}

impl BridgeEventListener for SdkEventRelay {
    fn on_event(&self, event: BridgeEvent) {
        self.target.emit(event);
    }
}
