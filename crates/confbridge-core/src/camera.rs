use std::sync::Arc;

use crate::errors::BridgeError;
use crate::permissions::{Capability, PermissionGate, PermissionState};

/// Device-level camera enumeration facility.
pub trait CameraEnumerator: Send + Sync {
    /// IDs of the cameras on this device, or `None` when the platform camera
    /// service cannot be reached at all.
    fn camera_ids(&self) -> Option<Vec<String>>;
}

/// Answers "is there a usable camera?" for the UI.
pub struct CameraProbe {
    permissions: Arc<PermissionGate>,
    cameras: Arc<dyn CameraEnumerator>,
}

impl CameraProbe {
    pub fn new(permissions: Arc<PermissionGate>, cameras: Arc<dyn CameraEnumerator>) -> Self {
        Self { permissions, cameras }
    }

    pub fn check_available(&self) -> Result<bool, BridgeError> {
        match self.permissions.check(Capability::Camera) {
            PermissionState::Granted => {}
            PermissionState::Denied => {
                self.permissions.request(Capability::Camera);
                return Err(BridgeError::PermissionDenied(Capability::Camera));
            }
            PermissionState::Unknown => {
                self.permissions.request(Capability::Camera);
                return Err(BridgeError::PermissionPending(Capability::Camera));
            }
        }

        let ids = self.cameras.camera_ids().ok_or(BridgeError::NoCameraHardware)?;
        tracing::debug!("{} camera(s) found", ids.len());
        Ok(!ids.is_empty())
    }
}
